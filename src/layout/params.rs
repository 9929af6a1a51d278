//! Per-node scratch records for a layout pass.
//!
//! Each layout owns one `ParamTable` of its own record type. Records are
//! created on first mutable access and addressed by node slot, so the graph's
//! node type never has to know about any algorithm's scratch state.

use std::ops::{Index, IndexMut};

use crate::graph::NodeId;

/// Slot-indexed side table of lazily created records.
#[derive(Debug, Clone)]
pub struct ParamTable<P> {
    slots: Vec<Option<P>>,
    /// Returned for reads of nodes that have no record yet.
    fallback: P,
}

impl<P: Default> ParamTable<P> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            fallback: P::default(),
        }
    }

    /// Pre-size for a graph with `bound` node slots.
    pub fn with_bound(bound: usize) -> Self {
        let mut table = Self::new();
        table.slots.resize_with(bound, || None);
        table
    }

    pub fn get(&self, n: NodeId) -> Option<&P> {
        self.slots.get(n.slot()).and_then(Option::as_ref)
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.get(n).is_some()
    }

    /// Record for `n`, created if missing.
    pub fn entry(&mut self, n: NodeId) -> &mut P {
        let slot = n.slot();
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot].get_or_insert_with(P::default)
    }

    pub fn remove(&mut self, n: NodeId) -> Option<P> {
        self.slots.get_mut(n.slot()).and_then(Option::take)
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Drop records for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId, &P) -> bool) {
        for (slot, record) in self.slots.iter_mut().enumerate() {
            if record.as_ref().is_some_and(|p| !keep(NodeId(slot as u32), p)) {
                *record = None;
            }
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl<P: Default> Default for ParamTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Index<NodeId> for ParamTable<P> {
    type Output = P;

    fn index(&self, n: NodeId) -> &P {
        self.slots
            .get(n.slot())
            .and_then(Option::as_ref)
            .unwrap_or(&self.fallback)
    }
}

impl<P: Default> IndexMut<NodeId> for ParamTable<P> {
    fn index_mut(&mut self, n: NodeId) -> &mut P {
        self.entry(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Scratch {
        value: f64,
    }

    #[test]
    fn test_lazy_creation() {
        let mut table: ParamTable<Scratch> = ParamTable::new();
        assert!(!table.contains(NodeId(5)));
        assert_eq!(table[NodeId(5)].value, 0.0);
        assert!(table.is_empty());

        table[NodeId(5)].value = 3.0;
        assert!(table.contains(NodeId(5)));
        assert_eq!(table[NodeId(5)].value, 3.0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_clear_and_retain() {
        let mut table: ParamTable<Scratch> = ParamTable::with_bound(4);
        for i in 0..4 {
            table[NodeId(i)].value = i as f64;
        }
        table.retain(|_, p| p.value >= 2.0);
        assert_eq!(table.len(), 2);
        assert!(!table.contains(NodeId(1)));

        assert_eq!(table.remove(NodeId(3)), Some(Scratch { value: 3.0 }));
        table.clear();
        assert!(table.is_empty());
    }
}
