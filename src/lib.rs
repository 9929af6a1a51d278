//! Trellis Layout - WASM Module
//!
//! This crate provides the layout engine for the Trellis visualization
//! toolkit. It is compiled to WebAssembly and exposes a JavaScript-friendly
//! API via wasm-bindgen; the same types are usable directly from Rust.
//!
//! # Architecture
//!
//! - `graph`: Tree/graph model using petgraph's StableGraph, with animated
//!   start/current/end coordinates per node and spanning tree extraction
//! - `layout`: The shared layout contract and five placement algorithms
//!   (node-link tree, radial, balloon, force-directed, squarified treemap)
//! - `spatial`: R-tree spatial indexing for O(log n) hit testing
//! - `geom`: Point/size/rect/transform aliases over euclid
//!
//! Layouts log through `tracing`; no subscriber is installed here.

use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

pub mod error;
pub mod geom;
pub mod graph;
pub mod layout;
pub mod spatial;

pub use error::{LayoutError, Result};
pub use graph::{Coord, EdgeId, Graph, NodeData, NodeId, SpanningTree};
pub use layout::{
    BalloonConfig, BalloonTreeLayout, ForceConfig, ForceDirectedLayout, ForceMode, Layout,
    LayoutBase, LayoutKind, Orientation, RadialConfig, RadialTreeLayout, RunStatus,
    TidyTreeConfig, TidyTreeLayout, TreemapConfig, TreemapLayout, Viewport,
};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Main entry point for the layout engine.
///
/// Wraps a [`Graph`], the viewport, and one instance of each layout so
/// retained state (radial root history, force simulation) survives between
/// calls from JavaScript.
#[wasm_bindgen]
pub struct TrellisWasm {
    graph: Graph,
    viewport: Viewport,
    layouts: Layouts,
}

/// One instance of every layout kind.
struct Layouts {
    tree: TidyTreeLayout,
    radial: RadialTreeLayout,
    balloon: BalloonTreeLayout,
    force: ForceDirectedLayout,
    treemap: TreemapLayout,
}

impl Layouts {
    fn new() -> Self {
        Self {
            tree: TidyTreeLayout::with_defaults(),
            radial: RadialTreeLayout::with_defaults(),
            balloon: BalloonTreeLayout::with_defaults(),
            force: ForceDirectedLayout::with_defaults(),
            treemap: TreemapLayout::with_defaults(),
        }
    }

    fn get_mut(&mut self, kind: LayoutKind) -> &mut dyn Layout {
        match kind {
            LayoutKind::NodeLinkTree => &mut self.tree,
            LayoutKind::Radial => &mut self.radial,
            LayoutKind::Balloon => &mut self.balloon,
            LayoutKind::ForceDirected => &mut self.force,
            LayoutKind::Treemap => &mut self.treemap,
        }
    }
}

fn parse_kind(kind: &str) -> Result<LayoutKind> {
    kind.parse()
}

fn read_config<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| LayoutError::InvalidConfig(e.to_string()))
}

/// Interleaved `[x0, y0, x1, y1, ...]` per node slot. Empty slots and
/// unplaced axes are `NaN`.
fn slot_buffer(graph: &Graph, pick: impl Fn(&NodeData) -> (f64, f64)) -> Vec<f64> {
    let mut out = vec![f64::NAN; graph.node_bound() * 2];
    for id in graph.nodes() {
        if let Some(data) = graph.node(id) {
            let (x, y) = pick(data);
            out[id.slot() * 2] = x;
            out[id.slot() * 2 + 1] = y;
        }
    }
    out
}

#[wasm_bindgen]
impl TrellisWasm {
    /// Create a new empty engine with an 800x600 viewport.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            viewport: Viewport::new(800.0, 600.0),
            layouts: Layouts::new(),
        }
    }

    /// Create an engine with pre-allocated capacity.
    #[wasm_bindgen(js_name = withCapacity)]
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            graph: Graph::with_capacity(node_capacity, edge_capacity),
            ..Self::new()
        }
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Add an unplaced node. It will grow out of its parent on first layout.
    ///
    /// Returns the stable node ID.
    #[wasm_bindgen(js_name = addNode)]
    pub fn add_node(&mut self) -> u32 {
        self.graph.add_node().raw()
    }

    /// Add a node resting at the specified position.
    #[wasm_bindgen(js_name = addNodeAt)]
    pub fn add_node_at(&mut self, x: f64, y: f64) -> u32 {
        self.graph.add_node_at(x, y).raw()
    }

    /// Remove a node by ID.
    ///
    /// Returns true if the node existed and was removed.
    #[wasm_bindgen(js_name = removeNode)]
    pub fn remove_node(&mut self, node_id: u32) -> bool {
        self.graph.remove_node(NodeId(node_id))
    }

    /// Get the number of nodes in the graph.
    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.graph.node_count() as u32
    }

    /// Get the upper bound on node indices (max index + 1).
    /// May be larger than nodeCount if nodes have been removed.
    #[wasm_bindgen(js_name = nodeBound)]
    pub fn node_bound(&self) -> u32 {
        self.graph.node_bound() as u32
    }

    #[wasm_bindgen(js_name = setVisible)]
    pub fn set_visible(
        &mut self,
        node_id: u32,
        visible: bool,
    ) -> std::result::Result<(), JsError> {
        Ok(self.graph.set_visible(NodeId(node_id), visible)?)
    }

    /// Expand or collapse a node. Collapsed nodes hide their subtree from
    /// tree layouts.
    #[wasm_bindgen(js_name = setExpanded)]
    pub fn set_expanded(
        &mut self,
        node_id: u32,
        expanded: bool,
    ) -> std::result::Result<(), JsError> {
        Ok(self.graph.set_expanded(NodeId(node_id), expanded)?)
    }

    /// Pin a node (exclude from simulation).
    #[wasm_bindgen(js_name = setFixed)]
    pub fn set_fixed(&mut self, node_id: u32, fixed: bool) -> std::result::Result<(), JsError> {
        Ok(self.graph.set_fixed(NodeId(node_id), fixed)?)
    }

    /// Set the size weight used by the treemap.
    #[wasm_bindgen(js_name = setWeight)]
    pub fn set_weight(
        &mut self,
        node_id: u32,
        weight: f64,
    ) -> std::result::Result<(), JsError> {
        Ok(self.graph.set_weight(NodeId(node_id), weight)?)
    }

    /// Set the width and height of a node's bounding box.
    #[wasm_bindgen(js_name = setExtent)]
    pub fn set_extent(
        &mut self,
        node_id: u32,
        width: f64,
        height: f64,
    ) -> std::result::Result<(), JsError> {
        Ok(self.graph.set_extent(NodeId(node_id), geom::size(width, height))?)
    }

    /// Get a node's current X position.
    #[wasm_bindgen(js_name = getNodeX)]
    pub fn get_node_x(&self, node_id: u32) -> Option<f64> {
        self.graph.position(NodeId(node_id)).map(|p| p.x)
    }

    /// Get a node's current Y position.
    #[wasm_bindgen(js_name = getNodeY)]
    pub fn get_node_y(&self, node_id: u32) -> Option<f64> {
        self.graph.position(NodeId(node_id)).map(|p| p.y)
    }

    /// Designate the node tree layouts grow from.
    #[wasm_bindgen(js_name = setRoot)]
    pub fn set_root(&mut self, node_id: u32) -> std::result::Result<(), JsError> {
        Ok(self.graph.set_root(NodeId(node_id))?)
    }

    /// The designated root, or the first node when none is set.
    pub fn root(&self) -> Option<u32> {
        self.graph.root().map(NodeId::raw)
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Add an edge between two nodes.
    ///
    /// Returns the edge ID, or None if source/target don't exist.
    #[wasm_bindgen(js_name = addEdge)]
    pub fn add_edge(&mut self, source: u32, target: u32, directed: bool) -> Option<u32> {
        self.graph
            .add_edge(NodeId(source), NodeId(target), directed)
            .map(|id| id.0)
    }

    /// Add directed edges from a Uint32Array of pairs.
    ///
    /// The edges array should be [src0, tgt0, src1, tgt1, ...].
    /// Returns the number of edges added.
    #[wasm_bindgen(js_name = addEdgesFromPairs)]
    pub fn add_edges_from_pairs(&mut self, edges: &[u32]) -> u32 {
        edges
            .chunks_exact(2)
            .filter(|pair| {
                self.graph
                    .add_edge(NodeId(pair[0]), NodeId(pair[1]), true)
                    .is_some()
            })
            .count() as u32
    }

    /// Remove an edge by ID.
    ///
    /// Returns true if the edge existed and was removed.
    #[wasm_bindgen(js_name = removeEdge)]
    pub fn remove_edge(&mut self, edge_id: u32) -> bool {
        self.graph.remove_edge(EdgeId(edge_id))
    }

    /// Get the number of edges in the graph.
    #[wasm_bindgen(js_name = edgeCount)]
    pub fn edge_count(&self) -> u32 {
        self.graph.edge_count() as u32
    }

    /// Get neighbors of a node, in edge insertion order.
    #[wasm_bindgen(js_name = getNeighbors)]
    pub fn get_neighbors(&self, node_id: u32) -> Vec<u32> {
        self.graph
            .neighbors_ordered(NodeId(node_id))
            .into_iter()
            .map(NodeId::raw)
            .collect()
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    /// Set the screen extent layouts fit themselves to.
    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport.size = geom::size(width, height);
    }

    /// Set the model-to-screen transform as a 2D affine matrix.
    #[wasm_bindgen(js_name = setViewTransform)]
    pub fn set_view_transform(
        &mut self,
        m11: f64,
        m12: f64,
        m21: f64,
        m22: f64,
        m31: f64,
        m32: f64,
    ) {
        self.viewport.view_transform = geom::Transform::new(m11, m12, m21, m22, m31, m32);
    }

    /// Set the viewport insets used when a layout has no margin of its own.
    #[wasm_bindgen(js_name = setInsets)]
    pub fn set_insets(&mut self, top: f64, right: f64, bottom: f64, left: f64) {
        self.viewport.insets = geom::Insets::new(top, right, bottom, left);
    }

    // =========================================================================
    // Layout
    // =========================================================================

    /// Apply a configuration object to a layout.
    ///
    /// `kind` is one of `node-link-tree`, `radial`, `balloon`,
    /// `force-directed` or `treemap`; `config` is a plain object whose
    /// camelCase fields override the defaults.
    pub fn configure(&mut self, kind: &str, config: JsValue) -> std::result::Result<(), JsError> {
        let layouts = &mut self.layouts;
        match parse_kind(kind)? {
            LayoutKind::NodeLinkTree => layouts.tree.set_config(read_config(config)?)?,
            LayoutKind::Radial => layouts.radial.set_config(read_config(config)?)?,
            LayoutKind::Balloon => layouts.balloon.set_config(read_config(config)?)?,
            LayoutKind::ForceDirected => layouts.force.set_config(read_config(config)?)?,
            LayoutKind::Treemap => layouts.treemap.set_config(read_config(config)?)?,
        }
        Ok(())
    }

    /// Set the node-link tree orientation by name.
    #[wasm_bindgen(js_name = setOrientation)]
    pub fn set_orientation(&mut self, orientation: &str) -> std::result::Result<(), JsError> {
        self.layouts.tree.set_orientation(orientation.parse()?);
        Ok(())
    }

    /// Pin a layout's anchor in model space.
    #[wasm_bindgen(js_name = setAnchor)]
    pub fn set_anchor(&mut self, kind: &str, x: f64, y: f64) -> std::result::Result<(), JsError> {
        let kind = parse_kind(kind)?;
        self.layouts
            .get_mut(kind)
            .base_mut()
            .set_anchor(Some(geom::point(x, y)));
        Ok(())
    }

    /// Let a layout's anchor follow the viewport again.
    #[wasm_bindgen(js_name = clearAnchor)]
    pub fn clear_anchor(&mut self, kind: &str) -> std::result::Result<(), JsError> {
        let kind = parse_kind(kind)?;
        self.layouts.get_mut(kind).base_mut().set_anchor(None);
        Ok(())
    }

    /// Set a layout's screen-space margin.
    #[wasm_bindgen(js_name = setMargin)]
    pub fn set_margin(
        &mut self,
        kind: &str,
        top: f64,
        right: f64,
        bottom: f64,
        left: f64,
    ) -> std::result::Result<(), JsError> {
        let kind = parse_kind(kind)?;
        self.layouts
            .get_mut(kind)
            .base_mut()
            .set_margin(Some(geom::Insets::new(top, right, bottom, left)))?;
        Ok(())
    }

    /// Lay out from `node_id` instead of the graph root, or pass nothing to
    /// follow the graph root again.
    #[wasm_bindgen(js_name = setLayoutRoot)]
    pub fn set_layout_root(
        &mut self,
        kind: &str,
        node_id: Option<u32>,
    ) -> std::result::Result<(), JsError> {
        let kind = parse_kind(kind)?;
        self.layouts
            .get_mut(kind)
            .base_mut()
            .set_root(node_id.map(NodeId));
        Ok(())
    }

    /// Run one frame of a layout. Returns true once the layout reports
    /// completion.
    pub fn run(&mut self, kind: &str, fraction: f64) -> std::result::Result<bool, JsError> {
        let kind = parse_kind(kind)?;
        let status = self
            .layouts
            .get_mut(kind)
            .run(&mut self.graph, &self.viewport, fraction);
        Ok(status.is_complete())
    }

    /// Forget state a layout retains between runs.
    pub fn reset(&mut self, kind: &str) -> std::result::Result<(), JsError> {
        let kind = parse_kind(kind)?;
        self.layouts.get_mut(kind).reset();
        Ok(())
    }

    // =========================================================================
    // Coordinate Buffers
    // =========================================================================

    /// Current positions as `[x0, y0, x1, y1, ...]` per node slot.
    #[wasm_bindgen(js_name = getPositions)]
    pub fn get_positions(&self) -> Float64Array {
        Float64Array::from(&slot_buffer(&self.graph, |d| (d.x.current, d.y.current))[..])
    }

    /// Transition start positions.
    #[wasm_bindgen(js_name = getStartPositions)]
    pub fn get_start_positions(&self) -> Float64Array {
        Float64Array::from(&slot_buffer(&self.graph, |d| (d.x.start, d.y.start))[..])
    }

    /// Transition end positions.
    #[wasm_bindgen(js_name = getEndPositions)]
    pub fn get_end_positions(&self) -> Float64Array {
        Float64Array::from(&slot_buffer(&self.graph, |d| (d.x.end, d.y.end))[..])
    }

    /// Positions interpolated between start and end.
    #[wasm_bindgen(js_name = getInterpolatedPositions)]
    pub fn get_interpolated_positions(&self, fraction: f64) -> Float64Array {
        Float64Array::from(
            &slot_buffer(&self.graph, |d| (d.x.lerp(fraction), d.y.lerp(fraction)))[..],
        )
    }

    /// Extents as `[w0, h0, w1, h1, ...]` per node slot.
    #[wasm_bindgen(js_name = getExtents)]
    pub fn get_extents(&self) -> Float64Array {
        Float64Array::from(&slot_buffer(&self.graph, |d| (d.extent.width, d.extent.height))[..])
    }

    // =========================================================================
    // Spatial Queries
    // =========================================================================

    /// Rebuild the spatial index after a layout pass.
    #[wasm_bindgen(js_name = rebuildSpatialIndex)]
    pub fn rebuild_spatial_index(&mut self) {
        self.graph.rebuild_spatial_index();
    }

    /// The smallest node whose bounds contain the model-space point.
    #[wasm_bindgen(js_name = nodeAt)]
    pub fn node_at(&self, x: f64, y: f64) -> Option<u32> {
        self.graph.node_at(geom::point(x, y)).map(NodeId::raw)
    }

    /// Nodes whose bounds intersect the model-space rectangle.
    #[wasm_bindgen(js_name = findNodesInRect)]
    pub fn find_nodes_in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<u32> {
        let r = geom::rect(min_x, min_y, max_x - min_x, max_y - min_y);
        self.graph
            .nodes_in_rect(&r)
            .into_iter()
            .map(NodeId::raw)
            .collect()
    }

    /// Get the bounding box of all placed nodes.
    ///
    /// Returns [min_x, min_y, max_x, max_y] or None if nothing is placed.
    #[wasm_bindgen(js_name = getBounds)]
    pub fn get_bounds(&self) -> Option<Vec<f64>> {
        self.graph
            .bounds()
            .map(|b| vec![b.min_x(), b.min_y(), b.max_x(), b.max_y()])
    }

    /// Clear all nodes and edges, and every layout's retained state.
    pub fn clear(&mut self) {
        self.graph.clear();
        for kind in LayoutKind::ALL {
            self.layouts.get_mut(kind).reset();
        }
    }
}

impl Default for TrellisWasm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Build root -> (a -> (c, d), b) through the engine, as a host would.
    fn small_tree(engine: &mut TrellisWasm) -> [u32; 5] {
        let ids = [0; 5].map(|_| engine.add_node());
        engine.add_edges_from_pairs(&[
            ids[0], ids[1], ids[0], ids[2], ids[1], ids[3], ids[1], ids[4],
        ]);
        ids
    }

    fn run(engine: &mut TrellisWasm, kind: LayoutKind, fraction: f64) -> RunStatus {
        engine
            .layouts
            .get_mut(kind)
            .run(&mut engine.graph, &engine.viewport, fraction)
    }

    #[test]
    fn test_every_layout_places_every_node() {
        for kind in LayoutKind::ALL {
            let mut engine = TrellisWasm::new();
            let ids = small_tree(&mut engine);
            assert_eq!(engine.edge_count(), 4);

            run(&mut engine, kind, 1.0);
            for id in ids {
                let x = engine.get_node_x(id).unwrap();
                let y = engine.get_node_y(id).unwrap();
                assert!(x.is_finite() && y.is_finite(), "{kind}: node {id} unplaced");
            }
        }
    }

    #[test]
    fn test_switching_layouts_animates_from_previous() {
        let mut engine = TrellisWasm::new();
        let ids = small_tree(&mut engine);

        run(&mut engine, LayoutKind::NodeLinkTree, 1.0);
        let before = engine.graph.position(NodeId(ids[3])).unwrap();

        run(&mut engine, LayoutKind::Radial, 0.0);
        let n = engine.graph.node(NodeId(ids[3])).unwrap();
        assert_eq!(n.x.start, before.x);
        assert_eq!(n.y.start, before.y);
        assert_ne!(n.x.end, before.x);
    }

    #[test]
    fn test_slot_buffer_marks_removed_nodes() {
        let mut engine = TrellisWasm::new();
        let a = engine.add_node_at(1.0, 2.0);
        let b = engine.add_node_at(3.0, 4.0);
        engine.add_node();
        engine.remove_node(a);

        let buf = slot_buffer(&engine.graph, |d| (d.x.current, d.y.current));
        assert_eq!(buf.len(), 6);
        assert!(buf[0].is_nan() && buf[1].is_nan());
        assert_eq!(&buf[b as usize * 2..b as usize * 2 + 2], &[3.0, 4.0]);
        assert!(buf[4].is_nan(), "unplaced node reads NaN");
    }

    #[test]
    fn test_treemap_then_pick() {
        let mut engine = TrellisWasm::new();
        engine.set_viewport(100.0, 100.0);
        let root = engine.add_node();
        let leaves: Vec<_> = [3.0, 1.0]
            .iter()
            .map(|&w| {
                let l = engine.add_node();
                engine.graph.set_weight(NodeId(l), w).unwrap();
                engine.add_edge(root, l, true);
                l
            })
            .collect();

        run(&mut engine, LayoutKind::Treemap, 1.0);
        engine.rebuild_spatial_index();

        let big = engine.graph.node_bounds(NodeId(leaves[0])).unwrap();
        let c = big.center();
        assert_eq!(engine.node_at(c.x, c.y), Some(leaves[0]));
        assert_eq!(engine.get_bounds(), Some(vec![0.0, 0.0, 100.0, 100.0]));
    }

    #[test]
    fn test_clear_resets_layouts() {
        let mut engine = TrellisWasm::new();
        small_tree(&mut engine);
        run(&mut engine, LayoutKind::Radial, 1.0);
        assert!(engine.layouts.radial.previous_root().is_some());

        engine.clear();
        assert_eq!(engine.node_count(), 0);
        assert!(engine.layouts.radial.previous_root().is_none());
    }
}
