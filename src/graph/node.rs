//! Node type and related structures.
//!
//! Nodes are the vertices in the graph. Each node has:
//! - A stable identifier (its arena slot, valid until the node is removed)
//! - State flags (visible, expanded, fixed)
//! - A scalar size weight and an extent used for its bounding box
//! - A start/current/end coordinate triple per axis for animated transitions

use std::fmt;

use crate::geom::{self, Point, Rect, Size};

/// Stable node identifier.
///
/// Wraps the node's slot in the underlying arena. The id remains valid even
/// after other nodes are removed from the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new NodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Slot index used by per-node side tables.
    #[inline]
    pub fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<u32> for NodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<NodeId> for u32 {
    #[inline]
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Node state flags packed into a single byte.
#[derive(Debug, Clone, Copy)]
pub struct NodeState {
    flags: u8,
}

impl NodeState {
    const VISIBLE: u8 = 0b0000_0001;
    const EXPANDED: u8 = 0b0000_0010;
    const FIXED: u8 = 0b0000_0100;

    /// Create a new default node state: visible, expanded, not fixed.
    #[inline]
    pub fn new() -> Self {
        Self {
            flags: Self::VISIBLE | Self::EXPANDED,
        }
    }

    #[inline]
    fn set(&mut self, flag: u8, on: bool) {
        if on {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }

    /// Check if the node is visible.
    #[inline]
    pub fn is_visible(self) -> bool {
        self.flags & Self::VISIBLE != 0
    }

    /// Set the visible state.
    #[inline]
    pub fn set_visible(&mut self, visible: bool) {
        self.set(Self::VISIBLE, visible);
    }

    /// Check if the node's children are shown.
    #[inline]
    pub fn is_expanded(self) -> bool {
        self.flags & Self::EXPANDED != 0
    }

    /// Set the expanded state.
    #[inline]
    pub fn set_expanded(&mut self, expanded: bool) {
        self.set(Self::EXPANDED, expanded);
    }

    /// Check if the node is fixed (excluded from simulation).
    #[inline]
    pub fn is_fixed(self) -> bool {
        self.flags & Self::FIXED != 0
    }

    /// Set the fixed state.
    #[inline]
    pub fn set_fixed(&mut self, fixed: bool) {
        self.set(Self::FIXED, fixed);
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}

/// One axis of an animated coordinate.
///
/// `NaN` in `current` means the node has not been placed yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub start: f64,
    pub current: f64,
    pub end: f64,
}

impl Coord {
    /// An unplaced coordinate.
    pub const UNSET: Coord = Coord {
        start: f64::NAN,
        current: f64::NAN,
        end: f64::NAN,
    };

    /// A coordinate resting at `value`.
    pub fn at(value: f64) -> Self {
        Self {
            start: value,
            current: value,
            end: value,
        }
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        !self.current.is_nan()
    }

    /// Retarget to `value`. The old current value becomes the start; if the
    /// coordinate was never placed, `seed` (or `value` itself) is used.
    pub fn retarget(&mut self, value: f64, seed: Option<f64>) {
        self.start = if self.current.is_nan() {
            seed.filter(|s| !s.is_nan()).unwrap_or(value)
        } else {
            self.current
        };
        self.current = value;
        self.end = value;
    }

    /// Value interpolated between start and end.
    pub fn lerp(&self, fraction: f64) -> f64 {
        let t = fraction.clamp(0.0, 1.0);
        self.start + (self.end - self.start) * t
    }
}

impl Default for Coord {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Per-node record stored in the graph arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub state: NodeState,
    /// Size weight (treemap area, radial share).
    pub weight: f64,
    /// Width and height of the node's bounding box.
    pub extent: Size,
    pub x: Coord,
    pub y: Coord,
}

impl NodeData {
    pub fn new() -> Self {
        Self {
            state: NodeState::new(),
            weight: 1.0,
            extent: Size::zero(),
            x: Coord::UNSET,
            y: Coord::UNSET,
        }
    }

    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x: Coord::at(x),
            y: Coord::at(y),
            ..Self::new()
        }
    }

    pub fn is_placed(&self) -> bool {
        self.x.is_set() && self.y.is_set()
    }

    /// Current position; unplaced axes read as `NaN`.
    pub fn position(&self) -> Point {
        geom::point(self.x.current, self.y.current)
    }

    /// Bounding box centred on the current position. Unplaced nodes are
    /// treated as sitting at the origin.
    pub fn bounds(&self) -> Rect {
        let p = if self.is_placed() {
            self.position()
        } else {
            Point::origin()
        };
        geom::centered_rect(p, self.extent)
    }
}

impl Default for NodeData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.slot(), 42);
        assert_eq!(format!("{}", id), "Node(42)");
    }

    #[test]
    fn test_node_id_conversion() {
        let id: NodeId = 123.into();
        let raw: u32 = id.into();
        assert_eq!(raw, 123);
    }

    #[test]
    fn test_node_state_default() {
        let state = NodeState::new();
        assert!(state.is_visible());
        assert!(state.is_expanded());
        assert!(!state.is_fixed());
    }

    #[test]
    fn test_node_state_flags_independent() {
        let mut state = NodeState::new();
        state.set_expanded(false);
        state.set_fixed(true);
        assert!(state.is_visible());
        assert!(!state.is_expanded());
        assert!(state.is_fixed());

        state.set_visible(false);
        assert!(!state.is_visible());
        assert!(state.is_fixed());
    }

    #[test]
    fn test_retarget_moves_current_to_start() {
        let mut c = Coord::at(5.0);
        c.retarget(9.0, Some(100.0));
        assert_eq!(c.start, 5.0);
        assert_eq!(c.current, 9.0);
        assert_eq!(c.end, 9.0);
    }

    #[test]
    fn test_retarget_unset_uses_seed() {
        let mut c = Coord::UNSET;
        c.retarget(9.0, Some(3.0));
        assert_eq!(c.start, 3.0);
        assert_eq!(c.current, 9.0);

        let mut c = Coord::UNSET;
        c.retarget(9.0, None);
        assert_eq!(c.start, 9.0);

        let mut c = Coord::UNSET;
        c.retarget(9.0, Some(f64::NAN));
        assert_eq!(c.start, 9.0);
    }

    #[test]
    fn test_lerp() {
        let mut c = Coord::at(0.0);
        c.retarget(10.0, None);
        assert_eq!(c.lerp(0.0), 0.0);
        assert_eq!(c.lerp(0.25), 2.5);
        assert_eq!(c.lerp(2.0), 10.0);
    }

    #[test]
    fn test_bounds_centered_on_position() {
        let mut n = NodeData::at(10.0, 10.0);
        n.extent = Size::new(4.0, 2.0);
        let b = n.bounds();
        assert_eq!(b.min_x(), 8.0);
        assert_eq!(b.max_y(), 11.0);
    }
}
