//! Buchheim-Junger-Leipert node-link tree layout.
//!
//! Implements the O(n) algorithm from "Improving Walker's Algorithm to Run in
//! Linear Time" (Buchheim, Junger, Leipert, 2002) for laying out arbitrary
//! m-ary trees with compact, aesthetically pleasing positioning.
//!
//! The algorithm produces a breadth and a depth coordinate per node; the
//! [`Orientation`] decides which screen axis each one maps to.
//!
//! # Algorithm Overview
//!
//! 1. **First walk (bottom-up):** Recursively assign preliminary breadth
//!    coordinates by merging subtree contours. Threads give O(1) amortized
//!    contour traversal, and overlap is spread across intermediate siblings.
//! 2. **Depth table:** Per-level maximum node extent plus depth spacing,
//!    accumulated once across the whole tree.
//! 3. **Second walk (top-down):** Apply accumulated modifiers to convert
//!    preliminary coordinates into final positions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::params::ParamTable;
use super::{Axis, Layout, LayoutBase, RunStatus, Viewport, set_coordinate};
use crate::error::{LayoutError, Result};
use crate::geom::{self, Point};
use crate::graph::{Graph, NodeId, SpanningTree};

/// Direction the tree grows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    /// Root on the left, depth grows along +x.
    LeftRight,
    /// Root on the right, depth grows along -x.
    RightLeft,
    /// Root at the top, depth grows along +y.
    TopBottom,
    /// Root at the bottom, depth grows along -y.
    BottomTop,
}

impl Orientation {
    /// Whether depth runs along the y axis.
    pub fn is_vertical(self) -> bool {
        matches!(self, Orientation::TopBottom | Orientation::BottomTop)
    }

    pub fn name(self) -> &'static str {
        match self {
            Orientation::LeftRight => "left-right",
            Orientation::RightLeft => "right-left",
            Orientation::TopBottom => "top-bottom",
            Orientation::BottomTop => "bottom-top",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Orientation {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left-right" => Ok(Orientation::LeftRight),
            "right-left" => Ok(Orientation::RightLeft),
            "top-bottom" => Ok(Orientation::TopBottom),
            "bottom-top" => Ok(Orientation::BottomTop),
            other => Err(LayoutError::InvalidOrientation(other.to_string())),
        }
    }
}

/// Configuration for the node-link tree layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TidyTreeConfig {
    pub orientation: Orientation,
    /// Gap between adjacent depth levels, on top of the level's node extent.
    pub depth_spacing: f64,
    /// Minimum gap between siblings.
    pub breadth_spacing: f64,
    /// Minimum gap between neighboring, unrelated subtrees.
    pub subtree_spacing: f64,
    /// Distance of the root from the viewport edge it grows away from.
    pub root_offset: f64,
}

impl Default for TidyTreeConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::LeftRight,
            depth_spacing: 50.0,
            breadth_spacing: 5.0,
            subtree_spacing: 25.0,
            root_offset: 50.0,
        }
    }
}

impl TidyTreeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("depth spacing", self.depth_spacing),
            ("breadth spacing", self.breadth_spacing),
            ("subtree spacing", self.subtree_spacing),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(LayoutError::NegativeSpacing { name, value });
            }
        }
        Ok(())
    }
}

/// Scratch record for one node during a pass.
#[derive(Debug, Clone, Copy, Default)]
struct TreeParams {
    /// Preliminary breadth coordinate (from first walk).
    prelim: f64,
    /// Offset applied to every descendant in the second walk.
    modifier: f64,
    /// Pending shift, spread over siblings by `execute_shifts`.
    shift: f64,
    /// Per-sibling change in shift.
    change: f64,
    /// Greatest uncommon ancestor candidate; `None` means the node itself.
    ancestor: Option<NodeId>,
    /// Contour successor once the node's own subtree is exhausted.
    thread: Option<NodeId>,
    /// Sum of ancestor modifiers, filled in top-down by the second walk.
    offset: f64,
}

/// Operation counters for the last pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreePassStats {
    /// Nodes visited by the first walk.
    pub visits: usize,
    /// Contour steps taken while apportioning.
    pub contour_steps: usize,
}

/// The node-link tree layout engine.
pub struct TidyTreeLayout {
    base: LayoutBase,
    config: TidyTreeConfig,
    params: ParamTable<TreeParams>,
    /// Maximum depth-axis extent per level, then the accumulated level offsets.
    depths: Vec<f64>,
    stats: TreePassStats,
}

impl TidyTreeLayout {
    /// Create a new layout with the given configuration.
    pub fn new(config: TidyTreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            base: LayoutBase::new(),
            config,
            params: ParamTable::new(),
            depths: Vec::new(),
            stats: TreePassStats::default(),
        })
    }

    /// Create a layout with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            base: LayoutBase::new(),
            config: TidyTreeConfig::default(),
            params: ParamTable::new(),
            depths: Vec::new(),
            stats: TreePassStats::default(),
        }
    }

    pub fn config(&self) -> &TidyTreeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TidyTreeConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.config.orientation = orientation;
    }

    pub fn stats(&self) -> TreePassStats {
        self.stats
    }

    /// Explicit anchor, else the root offset in from the edge the tree grows
    /// away from, centred on the breadth axis.
    pub fn layout_anchor(&self, viewport: &Viewport) -> Point {
        if let Some(a) = self.base.anchor() {
            return a;
        }
        let (w, h) = (viewport.size.width, viewport.size.height);
        let off = self.config.root_offset;
        let screen = match self.config.orientation {
            Orientation::LeftRight => geom::point(off, h / 2.0),
            Orientation::RightLeft => geom::point(w - off, h / 2.0),
            Orientation::TopBottom => geom::point(w / 2.0, off),
            Orientation::BottomTop => geom::point(w / 2.0, h - off),
        };
        viewport.to_model(screen)
    }

    /// Lay out `tree` with its root at `anchor`.
    pub fn layout_tree(&mut self, graph: &mut Graph, tree: &SpanningTree, anchor: Point) {
        self.stats = TreePassStats::default();
        self.params = ParamTable::with_bound(graph.node_bound());
        self.depths.clear();

        self.first_walk(graph, tree);
        self.determine_depths();
        self.second_walk(graph, tree, anchor);

        tracing::debug!(
            nodes = tree.len(),
            depth = tree.max_depth(),
            contour_steps = self.stats.contour_steps,
            "node-link tree pass complete"
        );
        self.params.clear();
    }

    /// Extent of a node along the breadth axis.
    fn breadth_extent(&self, graph: &Graph, n: NodeId) -> f64 {
        let e = graph.extent(n);
        if self.config.orientation.is_vertical() {
            e.width
        } else {
            e.height
        }
    }

    /// Extent of a node along the depth axis.
    fn depth_extent(&self, graph: &Graph, n: NodeId) -> f64 {
        let e = graph.extent(n);
        if self.config.orientation.is_vertical() {
            e.height
        } else {
            e.width
        }
    }

    /// Required distance between the centres of two adjacent nodes.
    fn spacing(&self, graph: &Graph, l: NodeId, r: NodeId, siblings: bool) -> f64 {
        let gap = if siblings {
            self.config.breadth_spacing
        } else {
            self.config.subtree_spacing
        };
        gap + 0.5 * (self.breadth_extent(graph, l) + self.breadth_extent(graph, r))
    }

    fn update_depths(&mut self, depth: usize, extent: f64) {
        if self.depths.len() <= depth {
            self.depths.resize(depth + 1, 0.0);
        }
        self.depths[depth] = self.depths[depth].max(extent);
    }

    /// Turn per-level extents into per-level depth offsets.
    fn determine_depths(&mut self) {
        let mut offset = 0.0;
        for d in self.depths.iter_mut() {
            let extent = *d;
            *d = offset;
            offset += extent + self.config.depth_spacing;
        }
    }

    /// Buchheim first walk: bottom-up assignment of preliminary coordinates.
    ///
    /// Children come before their parent in reverse breadth-first order, so
    /// every subtree is finished when its root is visited. A node's position
    /// relative to its left sibling is settled by the parent, in sibling
    /// order, right before the node's subtree is apportioned.
    fn first_walk(&mut self, graph: &Graph, tree: &SpanningTree) {
        for n in tree.bottom_up() {
            self.stats.visits += 1;
            let depth = tree.depth(n).unwrap_or(0) as usize;
            let extent = self.depth_extent(graph, n);
            self.update_depths(depth, extent);

            let children = tree.children(n);
            let (Some(&leftmost), Some(&rightmost)) = (children.first(), children.last()) else {
                continue;
            };

            let mut default_ancestor = leftmost;
            for &c in children {
                self.place_after_sibling(graph, tree, c);
                default_ancestor = self.apportion(graph, tree, c, default_ancestor);
            }

            // Distribute extra space evenly among intermediate children
            self.execute_shifts(tree, n);

            // Centre over first and last children until the parent places n
            self.params[n].prelim =
                0.5 * (self.params[leftmost].prelim + self.params[rightmost].prelim);
        }
    }

    /// Put `c` one spacing to the right of its left sibling. An internal
    /// node keeps the distance to its children's midpoint as its modifier.
    fn place_after_sibling(&mut self, graph: &Graph, tree: &SpanningTree, c: NodeId) {
        let Some(l) = tree.previous_sibling(c) else {
            return;
        };
        let prelim = self.params[l].prelim + self.spacing(graph, l, c, true);
        let midpoint = self.params[c].prelim;
        let cp = &mut self.params[c];
        cp.prelim = prelim;
        if !tree.is_leaf(c) {
            cp.modifier = prelim - midpoint;
        }
    }

    /// Get the next node on the left contour of a subtree.
    fn next_left(&self, tree: &SpanningTree, n: NodeId) -> Option<NodeId> {
        tree.first_child(n).or(self.params[n].thread)
    }

    /// Get the next node on the right contour of a subtree.
    fn next_right(&self, tree: &SpanningTree, n: NodeId) -> Option<NodeId> {
        tree.last_child(n).or(self.params[n].thread)
    }

    /// Apportion: push `v`'s subtree clear of the subtrees of its left
    /// siblings, leaving threads behind where one contour runs out first.
    ///
    /// The `i`/`o` prefixes are inner/outer contours, `p`/`m` the right (v's)
    /// and left (sibling forest) sides.
    fn apportion(
        &mut self,
        graph: &Graph,
        tree: &SpanningTree,
        v: NodeId,
        mut default_ancestor: NodeId,
    ) -> NodeId {
        let Some(w) = tree.previous_sibling(v) else {
            return default_ancestor;
        };

        let mut vip = v;
        let mut vop = v;
        let mut vim = w;
        let mut vom = tree
            .parent(v)
            .and_then(|p| tree.first_child(p))
            .unwrap_or(v);

        let mut sip = self.params[vip].modifier;
        let mut sop = self.params[vop].modifier;
        let mut sim = self.params[vim].modifier;
        let mut som = self.params[vom].modifier;

        let mut nr = self.next_right(tree, vim);
        let mut nl = self.next_left(tree, vip);

        while let (Some(r), Some(l)) = (nr, nl) {
            self.stats.contour_steps += 1;
            vim = r;
            vip = l;
            vom = self.next_left(tree, vom).unwrap_or(vom);
            vop = self.next_right(tree, vop).unwrap_or(vop);
            self.params[vop].ancestor = Some(v);

            let shift = (self.params[vim].prelim + sim) - (self.params[vip].prelim + sip)
                + self.spacing(graph, vim, vip, false);
            if shift > 0.0 {
                let a = self.ancestor(tree, vim, v, default_ancestor);
                self.move_subtree(tree, a, v, shift);
                sip += shift;
                sop += shift;
            }

            sim += self.params[vim].modifier;
            sip += self.params[vip].modifier;
            som += self.params[vom].modifier;
            sop += self.params[vop].modifier;

            nr = self.next_right(tree, vim);
            nl = self.next_left(tree, vip);
        }

        // Set threads
        if nr.is_some() && self.next_right(tree, vop).is_none() {
            let p = &mut self.params[vop];
            p.thread = nr;
            p.modifier += sim - sop;
        }
        if nl.is_some() && self.next_left(tree, vom).is_none() {
            let p = &mut self.params[vom];
            p.thread = nl;
            p.modifier += sip - som;
            default_ancestor = v;
        }

        default_ancestor
    }

    /// The sibling of `v` whose subtree contains `vim`, if known.
    fn ancestor(
        &self,
        tree: &SpanningTree,
        vim: NodeId,
        v: NodeId,
        default_ancestor: NodeId,
    ) -> NodeId {
        let a = self.params[vim].ancestor.unwrap_or(vim);
        if tree.parent(a) == tree.parent(v) {
            a
        } else {
            default_ancestor
        }
    }

    /// Shift subtree `wp` right by `shift`, recording the spread over the
    /// siblings between `wm` and `wp`.
    fn move_subtree(&mut self, tree: &SpanningTree, wm: NodeId, wp: NodeId, shift: f64) {
        let subtrees = (tree.number(wp) as f64 - tree.number(wm) as f64).max(1.0);
        let per_subtree = shift / subtrees;

        let wpp = &mut self.params[wp];
        wpp.change -= per_subtree;
        wpp.shift += shift;
        wpp.prelim += shift;
        wpp.modifier += shift;
        self.params[wm].change += per_subtree;
    }

    /// Execute accumulated shifts for children of node `n`.
    fn execute_shifts(&mut self, tree: &SpanningTree, n: NodeId) {
        let mut shift = 0.0;
        let mut change = 0.0;

        for &c in tree.children(n).iter().rev() {
            let cp = &mut self.params[c];
            cp.prelim += shift;
            cp.modifier += shift;
            change += cp.change;
            shift += cp.shift + change;
        }
    }

    /// Second walk: apply accumulated modifiers and write final positions.
    /// Breadth-first, so each parent is placed before its children.
    fn second_walk(&mut self, graph: &mut Graph, tree: &SpanningTree, anchor: Point) {
        let root = tree.root();
        self.params[root].offset = -self.params[root].prelim;

        for &n in tree.nodes() {
            let np = self.params[n];
            let breadth = np.prelim + np.offset;
            let depth = tree.depth(n).unwrap_or(0) as usize;
            let d = self.depths.get(depth).copied().unwrap_or(0.0);
            let parent = tree.parent(n);

            let (bx, by) = (anchor.x + breadth, anchor.y + breadth);
            match self.config.orientation {
                Orientation::LeftRight => {
                    set_coordinate(graph, n, parent, Axis::X, anchor.x + d);
                    set_coordinate(graph, n, parent, Axis::Y, by);
                }
                Orientation::RightLeft => {
                    set_coordinate(graph, n, parent, Axis::X, anchor.x - d);
                    set_coordinate(graph, n, parent, Axis::Y, by);
                }
                Orientation::TopBottom => {
                    set_coordinate(graph, n, parent, Axis::X, bx);
                    set_coordinate(graph, n, parent, Axis::Y, anchor.y + d);
                }
                Orientation::BottomTop => {
                    set_coordinate(graph, n, parent, Axis::X, bx);
                    set_coordinate(graph, n, parent, Axis::Y, anchor.y - d);
                }
            }

            let offset = np.offset + np.modifier;
            for &c in tree.children(n) {
                self.params[c].offset = offset;
            }
        }
    }
}

impl Layout for TidyTreeLayout {
    fn base(&self) -> &LayoutBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut LayoutBase {
        &mut self.base
    }

    fn run(&mut self, graph: &mut Graph, viewport: &Viewport, fraction: f64) -> RunStatus {
        let status = RunStatus::from_fraction(fraction);
        let Some(tree) = self
            .base
            .layout_root(graph)
            .and_then(|r| graph.spanning_tree(r))
        else {
            tracing::debug!("node-link tree layout has no visible root");
            return status;
        };
        let anchor = self.layout_anchor(viewport);
        self.layout_tree(graph, &tree, anchor);
        status
    }
}
