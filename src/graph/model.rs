//! Graph - the tree/graph model the layouts read and write.
//!
//! Topology lives in petgraph's StableGraph so node and edge slots stay
//! stable across removals. Node records carry the flags, weight, extent and
//! animated coordinates; layouts only ever touch the coordinates and extent.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use petgraph::{Directed, Direction};

use super::edge::{EdgeData, EdgeId};
use super::node::{NodeData, NodeId};
use super::tree::SpanningTree;
use crate::error::{LayoutError, Result};
use crate::geom::{Point, Rect, Size};
use crate::spatial::SpatialIndex;

/// The graph model.
///
/// This struct manages:
/// - Graph topology via petgraph
/// - Per-node state, weight, extent and coordinate triples
/// - The designated layout root
/// - A spatial index over node bounds for picking
pub struct Graph {
    graph: StableGraph<NodeData, EdgeData, Directed>,

    /// Explicitly designated root, if any.
    root: Option<NodeId>,

    /// Monotonic edge counter; orders children by insertion.
    next_edge_seq: u64,

    /// Spatial index for hit testing
    spatial: SpatialIndex,

    /// Whether the spatial index needs rebuilding
    spatial_dirty: bool,
}

#[inline]
fn ix(id: NodeId) -> NodeIndex {
    NodeIndex::new(id.slot())
}

#[inline]
fn id_of(index: NodeIndex) -> NodeId {
    NodeId(index.index() as u32)
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            root: None,
            next_edge_seq: 0,
            spatial: SpatialIndex::new(),
            spatial_dirty: false,
        }
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            graph: StableGraph::with_capacity(node_capacity, edge_capacity),
            ..Self::new()
        }
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Add an unplaced node.
    pub fn add_node(&mut self) -> NodeId {
        self.insert(NodeData::new())
    }

    /// Add a node resting at the specified position.
    pub fn add_node_at(&mut self, x: f64, y: f64) -> NodeId {
        self.insert(NodeData::at(x, y))
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        self.spatial_dirty = true;
        id_of(self.graph.add_node(data))
    }

    /// Remove a node and all its connected edges.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.graph.remove_node(ix(id)).is_none() {
            return false;
        }
        if self.root == Some(id) {
            self.root = None;
        }
        self.spatial_dirty = true;
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.contains_node(ix(id))
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.graph.node_weight(ix(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.spatial_dirty = true;
        self.graph.node_weight_mut(ix(id))
    }

    fn require(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.node_mut(id).ok_or(LayoutError::UnknownNode(id.0))
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Upper bound on node slots (max slot + 1). Side tables are sized by it.
    pub fn node_bound(&self) -> usize {
        self.graph.node_bound()
    }

    /// All live node ids in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(id_of)
    }

    /// Live, visible node ids in slot order.
    pub fn visible_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .node_indices()
            .filter(|&n| self.graph[n].state.is_visible())
            .map(id_of)
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.state.is_visible())
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.state.is_expanded())
    }

    pub fn is_fixed(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.state.is_fixed())
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<()> {
        self.require(id)?.state.set_visible(visible);
        Ok(())
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<()> {
        self.require(id)?.state.set_expanded(expanded);
        Ok(())
    }

    /// Pin a node so the force simulation leaves it in place.
    pub fn set_fixed(&mut self, id: NodeId, fixed: bool) -> Result<()> {
        self.require(id)?.state.set_fixed(fixed);
        Ok(())
    }

    pub fn set_weight(&mut self, id: NodeId, weight: f64) -> Result<()> {
        self.require(id)?.weight = weight;
        Ok(())
    }

    pub fn weight(&self, id: NodeId) -> f64 {
        self.node(id).map_or(0.0, |n| n.weight)
    }

    pub fn set_extent(&mut self, id: NodeId, extent: Size) -> Result<()> {
        self.require(id)?.extent = extent;
        Ok(())
    }

    pub fn extent(&self, id: NodeId) -> Size {
        self.node(id).map_or(Size::zero(), |n| n.extent)
    }

    /// Current position. Unplaced axes read as `NaN`.
    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.node(id).map(NodeData::position)
    }

    /// Current bounding box.
    pub fn node_bounds(&self, id: NodeId) -> Option<Rect> {
        self.node(id).map(NodeData::bounds)
    }

    // =========================================================================
    // Root
    // =========================================================================

    /// Designate the node tree layouts grow from.
    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        if !self.contains(id) {
            return Err(LayoutError::UnknownNode(id.0));
        }
        self.root = Some(id);
        Ok(())
    }

    /// The designated root, or the lowest live slot when none is set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
            .filter(|&r| self.contains(r))
            .or_else(|| self.graph.node_indices().next().map(id_of))
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Add an edge between two nodes.
    ///
    /// Returns the edge ID, or None if source/target don't exist.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, directed: bool) -> Option<EdgeId> {
        if !self.contains(source) || !self.contains(target) {
            return None;
        }
        let seq = self.next_edge_seq;
        self.next_edge_seq += 1;
        let index = self
            .graph
            .add_edge(ix(source), ix(target), EdgeData { seq, directed });
        Some(EdgeId(index.index() as u32))
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        self.graph
            .remove_edge(EdgeIndex::new(id.0 as usize))
            .is_some()
    }

    /// Get the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Endpoints of an edge.
    pub fn edge_endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.graph
            .edge_endpoints(EdgeIndex::new(id.0 as usize))
            .map(|(s, t)| (id_of(s), id_of(t)))
    }

    pub fn is_directed(&self, id: EdgeId) -> bool {
        self.graph
            .edge_weight(EdgeIndex::new(id.0 as usize))
            .is_some_and(|e| e.directed)
    }

    /// All edges as (id, source, target).
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, NodeId, NodeId)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                EdgeId(e.id().index() as u32),
                id_of(e.source()),
                id_of(e.target()),
            )
        })
    }

    /// Neighbors over incident edges in both directions, in edge insertion
    /// order. Self-loops are skipped; parallel edges repeat the neighbor.
    pub fn neighbors_ordered(&self, id: NodeId) -> Vec<NodeId> {
        let index = ix(id);
        if !self.graph.contains_node(index) {
            return Vec::new();
        }
        let mut incident: Vec<(u64, NodeIndex)> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .chain(self.graph.edges_directed(index, Direction::Incoming))
            .map(|e| {
                let other = if e.source() == index { e.target() } else { e.source() };
                (e.weight().seq, other)
            })
            .filter(|&(_, other)| other != index)
            .collect();
        incident.sort_unstable_by_key(|&(seq, _)| seq);
        incident.into_iter().map(|(_, n)| id_of(n)).collect()
    }

    /// Extract the spanning tree rooted at `root`. See [`SpanningTree::build`].
    pub fn spanning_tree(&self, root: NodeId) -> Option<SpanningTree> {
        SpanningTree::build(self, root)
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Rebuild the spatial index from the bounds of visible, placed nodes.
    pub fn rebuild_spatial_index(&mut self) {
        let boxes: Vec<_> = self
            .graph
            .node_indices()
            .filter_map(|n| {
                let data = &self.graph[n];
                (data.state.is_visible() && data.is_placed()).then(|| (id_of(n), data.bounds()))
            })
            .collect();
        self.spatial.rebuild(&boxes);
        self.spatial_dirty = false;
    }

    pub fn is_spatial_index_stale(&self) -> bool {
        self.spatial_dirty
    }

    /// The most specific (smallest) node whose bounds contain `p`.
    pub fn node_at(&self, p: Point) -> Option<NodeId> {
        self.spatial.smallest_containing(p)
    }

    /// All nodes whose bounds intersect `r`.
    pub fn nodes_in_rect(&self, r: &Rect) -> Vec<NodeId> {
        self.spatial.intersecting(r)
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Union of the bounds of all visible, placed nodes.
    pub fn bounds(&self) -> Option<Rect> {
        self.graph
            .node_indices()
            .map(|n| &self.graph[n])
            .filter(|d| d.state.is_visible() && d.is_placed())
            .map(NodeData::bounds)
            .reduce(|a, b| a.union(&b))
    }

    /// Clear all nodes and edges.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.root = None;
        self.next_edge_seq = 0;
        self.spatial.clear();
        self.spatial_dirty = false;
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, size};

    #[test]
    fn test_add_node() {
        let mut graph = Graph::new();
        let id = graph.add_node_at(10.0, 20.0);

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.position(id), Some(point(10.0, 20.0)));
    }

    #[test]
    fn test_unplaced_node() {
        let mut graph = Graph::new();
        let id = graph.add_node();
        assert!(!graph.node(id).unwrap().is_placed());
    }

    #[test]
    fn test_add_edge() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();

        let edge = graph.add_edge(a, b, true);
        assert!(edge.is_some());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_endpoints(edge.unwrap()), Some((a, b)));
        assert!(graph.is_directed(edge.unwrap()));
    }

    #[test]
    fn test_add_edge_missing_endpoint() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        assert!(graph.add_edge(a, NodeId(7), false).is_none());
    }

    #[test]
    fn test_neighbors_in_insertion_order() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        let d = graph.add_node();

        graph.add_edge(a, c, true);
        graph.add_edge(b, a, true);
        graph.add_edge(a, d, true);
        graph.add_edge(a, a, true);

        assert_eq!(graph.neighbors_ordered(a), vec![c, b, d]);
    }

    #[test]
    fn test_root_defaults_to_first_node() {
        let mut graph = Graph::new();
        assert_eq!(graph.root(), None);
        let a = graph.add_node();
        let b = graph.add_node();
        assert_eq!(graph.root(), Some(a));

        graph.set_root(b).unwrap();
        assert_eq!(graph.root(), Some(b));

        graph.remove_node(b);
        assert_eq!(graph.root(), Some(a));
    }

    #[test]
    fn test_set_root_unknown() {
        let mut graph = Graph::new();
        assert_eq!(graph.set_root(NodeId(3)), Err(LayoutError::UnknownNode(3)));
    }

    #[test]
    fn test_flag_setters() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        graph.set_visible(a, false).unwrap();
        graph.set_expanded(a, false).unwrap();
        graph.set_fixed(a, true).unwrap();
        assert!(!graph.is_visible(a));
        assert!(!graph.is_expanded(a));
        assert!(graph.is_fixed(a));
        assert!(graph.set_weight(NodeId(99), 1.0).is_err());
    }

    #[test]
    fn test_node_bound_survives_removal() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let _b = graph.add_node();
        let _c = graph.add_node();

        assert_eq!(graph.node_bound(), 3);

        graph.remove_node(a);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node_bound(), 3);
    }

    #[test]
    fn test_bounds_skips_unplaced_and_hidden() {
        let mut graph = Graph::new();
        let a = graph.add_node_at(-10.0, -5.0);
        graph.add_node_at(10.0, 5.0);
        graph.add_node();
        let far = graph.add_node_at(1000.0, 1000.0);
        graph.set_visible(far, false).unwrap();
        graph.set_extent(a, size(2.0, 2.0)).unwrap();

        let bounds = graph.bounds().unwrap();
        assert_eq!(bounds.min_x(), -11.0);
        assert_eq!(bounds.max_x(), 10.0);
        assert_eq!(bounds.max_y(), 5.0);
    }

    #[test]
    fn test_node_at_prefers_smallest() {
        let mut graph = Graph::new();
        let outer = graph.add_node_at(50.0, 50.0);
        let inner = graph.add_node_at(40.0, 40.0);
        graph.set_extent(outer, size(100.0, 100.0)).unwrap();
        graph.set_extent(inner, size(10.0, 10.0)).unwrap();
        graph.rebuild_spatial_index();

        assert!(!graph.is_spatial_index_stale());
        assert_eq!(graph.node_at(point(41.0, 39.0)), Some(inner));
        assert_eq!(graph.node_at(point(90.0, 90.0)), Some(outer));
        assert_eq!(graph.node_at(point(200.0, 0.0)), None);
    }

    #[test]
    fn test_clear() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        graph.add_edge(a, b, false);

        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.root(), None);
    }
}
