//! Spanning tree extraction.
//!
//! Tree-shaped layouts never walk the graph directly. Each pass extracts a
//! breadth-first spanning tree from the layout root, which gives every
//! reachable node exactly one parent and a stable child order. Non-tree edges
//! are ignored and unreachable nodes are simply absent.

use std::collections::VecDeque;

use super::model::Graph;
use super::node::NodeId;

/// A rooted tree over a subset of the graph's nodes.
///
/// Side tables are indexed by node slot, so lookups are O(1).
#[derive(Debug, Clone)]
pub struct SpanningTree {
    root: NodeId,
    parent: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    /// Position of each node among its siblings.
    number: Vec<usize>,
    depth: Vec<Option<u32>>,
    /// Nodes in breadth-first order, root first.
    order: Vec<NodeId>,
    max_depth: u32,
}

impl SpanningTree {
    /// Breadth-first extraction from `root` over visible nodes.
    ///
    /// Edges are followed in both directions, in insertion order. A collapsed
    /// node is part of the tree but its neighbors are not explored through it.
    /// Returns `None` if `root` is missing or hidden.
    pub fn build(graph: &Graph, root: NodeId) -> Option<Self> {
        if !graph.is_visible(root) {
            return None;
        }

        let bound = graph.node_bound();
        let mut tree = Self {
            root,
            parent: vec![None; bound],
            children: vec![Vec::new(); bound],
            number: vec![0; bound],
            depth: vec![None; bound],
            order: Vec::new(),
            max_depth: 0,
        };

        let mut queue = VecDeque::new();
        tree.depth[root.slot()] = Some(0);
        queue.push_back(root);

        while let Some(n) = queue.pop_front() {
            tree.order.push(n);
            if !graph.is_expanded(n) {
                continue;
            }
            let d = tree.depth[n.slot()].unwrap_or(0) + 1;
            for c in graph.neighbors_ordered(n) {
                if tree.depth[c.slot()].is_some() || !graph.is_visible(c) {
                    continue;
                }
                tree.depth[c.slot()] = Some(d);
                tree.parent[c.slot()] = Some(n);
                tree.number[c.slot()] = tree.children[n.slot()].len();
                tree.children[n.slot()].push(c);
                tree.max_depth = tree.max_depth.max(d);
                queue.push_back(c);
            }
        }

        Some(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.depth.get(n.slot()).is_some_and(Option::is_some)
    }

    pub fn parent(&self, n: NodeId) -> Option<NodeId> {
        self.parent.get(n.slot()).copied().flatten()
    }

    pub fn children(&self, n: NodeId) -> &[NodeId] {
        self.children.get(n.slot()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_child(&self, n: NodeId) -> Option<NodeId> {
        self.children(n).first().copied()
    }

    pub fn last_child(&self, n: NodeId) -> Option<NodeId> {
        self.children(n).last().copied()
    }

    pub fn is_leaf(&self, n: NodeId) -> bool {
        self.children(n).is_empty()
    }

    /// Index of `n` among its siblings (0 for the root).
    pub fn number(&self, n: NodeId) -> usize {
        self.number.get(n.slot()).copied().unwrap_or(0)
    }

    pub fn previous_sibling(&self, n: NodeId) -> Option<NodeId> {
        let p = self.parent(n)?;
        let i = self.number(n);
        if i == 0 {
            None
        } else {
            self.children(p).get(i - 1).copied()
        }
    }

    pub fn depth(&self, n: NodeId) -> Option<u32> {
        self.depth.get(n.slot()).copied().flatten()
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Nodes in breadth-first order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    /// Nodes with every child before its parent.
    pub fn bottom_up(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().rev().copied()
    }

    /// Whether `ancestor` lies on the path from `n` up to the root.
    pub fn is_ancestor(&self, ancestor: NodeId, n: NodeId) -> bool {
        let mut cur = self.parent(n);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }
}
