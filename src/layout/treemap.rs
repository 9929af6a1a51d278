//! Squarified treemap layout.
//!
//! Based on Bruls, Huizing and van Wijk, "Squarified Treemaps" (2000).
//! Leaf weights are summed bottom-up and scaled so the root covers the
//! layout bounds. Each parent's children are then packed into rows, greedily
//! adding the next largest child while that keeps the row's worst aspect
//! ratio from getting worse.
//!
//! This is the one layout that writes node extents as well as positions.

use serde::{Deserialize, Serialize};

use super::params::ParamTable;
use super::{Layout, LayoutBase, RunStatus, Viewport, set_position};
use crate::error::{LayoutError, Result};
use crate::geom::{self, Rect};
use crate::graph::{Graph, NodeId, SpanningTree};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreemapConfig {
    /// Inset between a parent's edge and its children.
    pub frame: f64,
}

impl TreemapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame.is_nan() || self.frame < 0.0 {
            return Err(LayoutError::NegativeFrame(self.frame));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct TreemapParams {
    area: f64,
    rect: Rect,
}

impl Default for TreemapParams {
    fn default() -> Self {
        Self {
            area: 0.0,
            rect: Rect::zero(),
        }
    }
}

pub struct TreemapLayout {
    base: LayoutBase,
    config: TreemapConfig,
    params: ParamTable<TreemapParams>,
}

impl TreemapLayout {
    pub fn new(config: TreemapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            base: LayoutBase::new(),
            config,
            params: ParamTable::new(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            base: LayoutBase::new(),
            config: TreemapConfig::default(),
            params: ParamTable::new(),
        }
    }

    pub fn config(&self) -> &TreemapConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TreemapConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_frame(&mut self, frame: f64) -> Result<()> {
        self.set_config(TreemapConfig { frame })
    }

    /// Partition `bounds` over `tree`.
    pub fn layout_tree(&mut self, graph: &mut Graph, tree: &SpanningTree, bounds: Rect) {
        self.params = ParamTable::with_bound(graph.node_bound());
        let root = tree.root();

        self.place(graph, root, None, bounds);
        if !self.compute_areas(graph, tree, bounds) {
            tracing::debug!(root = %root, "treemap has no positive weight");
            self.params.clear();
            return;
        }

        let mut kids = Vec::new();
        for &n in tree.nodes() {
            let children = tree.children(n);
            if children.is_empty() || self.params[n].area <= 0.0 {
                continue;
            }
            // children of skipped (zero-area) nodes never get a rect
            if n != root && self.params[n].rect.is_empty() {
                continue;
            }
            let inner = self.update_area(tree, n);

            kids.clear();
            kids.extend_from_slice(children);
            // ascending, so the largest is popped first
            kids.sort_by(|&a, &b| self.params[a].area.total_cmp(&self.params[b].area));
            self.squarify(graph, n, &mut kids, inner);
        }

        tracing::debug!(nodes = tree.len(), frame = self.config.frame, "treemap pass complete");
        self.params.clear();
    }

    /// Bottom-up area sums, scaled so the root's area is the bounds' area.
    /// Returns false if there is nothing to lay out.
    fn compute_areas(&mut self, graph: &Graph, tree: &SpanningTree, bounds: Rect) -> bool {
        for n in tree.bottom_up() {
            let children = tree.children(n);
            let area = if children.is_empty() {
                graph.weight(n).max(0.0)
            } else {
                children.iter().map(|&c| self.params[c].area).sum()
            };
            self.params[n].area = area;
        }

        let total = self.params[tree.root()].area;
        if !(total > 0.0) {
            return false;
        }
        let scale = bounds.area() / total;
        for &n in tree.nodes() {
            self.params[n].area *= scale;
        }
        true
    }

    /// Shrink `n`'s rect by the frame and rescale its children's areas to
    /// fill what is left. Returns the interior.
    fn update_area(&mut self, tree: &SpanningTree, n: NodeId) -> Rect {
        let b = self.params[n].rect;
        let f = self.config.frame;
        if f == 0.0 {
            return b;
        }

        let lost = 2.0 * f * (b.width() + b.height() - 2.0 * f);
        let available = self.params[n].area - lost;
        let children = tree.children(n);
        let sum: f64 = children.iter().map(|&c| self.params[c].area).sum();
        let t = if sum > 0.0 { available / sum } else { 0.0 };
        for &c in children {
            self.params[c].area *= t;
        }

        geom::rect(
            b.min_x() + f,
            b.min_y() + f,
            (b.width() - 2.0 * f).max(0.0),
            (b.height() - 2.0 * f).max(0.0),
        )
    }

    /// Greedy row building over `kids`, which must be sorted ascending.
    fn squarify(&mut self, graph: &mut Graph, parent: NodeId, kids: &mut Vec<NodeId>, mut r: Rect) {
        let mut row: Vec<NodeId> = Vec::new();
        let mut w = r.width().min(r.height());
        let mut worst = f64::MAX;

        while let Some(&c) = kids.last() {
            let a = self.params[c].area;
            if !(a > 0.0) {
                tracing::trace!(node = %c, "skipping child without area");
                kids.pop();
                continue;
            }
            row.push(c);
            let nworst = self.worst(&row, w);
            if row.len() == 1 || nworst <= worst {
                kids.pop();
                worst = nworst;
            } else {
                // Adding c makes the row worse: close it and start a new one
                row.pop();
                r = self.layout_row(graph, parent, &row, w, r);
                w = r.width().min(r.height());
                row.clear();
                worst = f64::MAX;
            }
        }

        if !row.is_empty() {
            self.layout_row(graph, parent, &row, w, r);
        }
    }

    /// Worst aspect ratio of `row` laid along a side of length `w`.
    fn worst(&self, row: &[NodeId], w: f64) -> f64 {
        let mut rmax = f64::MIN_POSITIVE;
        let mut rmin = f64::MAX;
        let mut s = 0.0;
        for &n in row {
            let a = self.params[n].area;
            rmin = rmin.min(a);
            rmax = rmax.max(a);
            s += a;
        }
        let s2 = s * s;
        let w2 = w * w;
        (w2 * rmax / s2).max(s2 / (w2 * rmin))
    }

    /// Lay `row` along the shorter side of `r` and return the space left.
    fn layout_row(
        &mut self,
        graph: &mut Graph,
        parent: NodeId,
        row: &[NodeId],
        w: f64,
        r: Rect,
    ) -> Rect {
        let s: f64 = row.iter().map(|&n| self.params[n].area).sum();
        let (x, y) = (r.min_x(), r.min_y());
        let h = if w == 0.0 { 0.0 } else { s / w };
        let horiz = w == r.width();

        let mut d = 0.0;
        for &n in row {
            let nw = if h > 0.0 { self.params[n].area / h } else { 0.0 };
            let cell = if horiz {
                geom::rect(x + d, y, nw, h)
            } else {
                geom::rect(x, y + d, h, nw)
            };
            d += nw;
            self.place(graph, n, Some(parent), cell);
        }

        if horiz {
            geom::rect(x, y + h, r.width(), (r.height() - h).max(0.0))
        } else {
            geom::rect(x + h, y, (r.width() - h).max(0.0), r.height())
        }
    }

    /// Centre `n` in `cell` and size it to match.
    fn place(&mut self, graph: &mut Graph, n: NodeId, parent: Option<NodeId>, cell: Rect) {
        self.params[n].rect = cell;
        set_position(graph, n, parent, cell.center());
        if let Some(d) = graph.node_mut(n) {
            d.extent = cell.size;
        }
    }
}

impl Layout for TreemapLayout {
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
            tracing::debug!("treemap layout has no visible root");
            return status;
        };
        let bounds = self.base.layout_bounds(viewport);
        self.layout_tree(graph, &tree, bounds);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds_of(graph: &Graph, n: NodeId) -> Rect {
        graph.node_bounds(n).unwrap()
    }

    fn overlap(a: &Rect, b: &Rect) -> f64 {
        a.intersection(b).map_or(0.0, |r| r.area())
    }

    fn contains(outer: &Rect, inner: &Rect) -> bool {
        let eps = 1e-6;
        inner.min_x() >= outer.min_x() - eps
            && inner.min_y() >= outer.min_y() - eps
            && inner.max_x() <= outer.max_x() + eps
            && inner.max_y() <= outer.max_y() + eps
    }

    fn weighted_star(weights: &[f64]) -> (Graph, NodeId, Vec<NodeId>) {
        let mut graph = Graph::new();
        let root = graph.add_node();
        let leaves = weights
            .iter()
            .map(|&w| {
                let c = graph.add_node();
                graph.set_weight(c, w).unwrap();
                graph.add_edge(root, c, true);
                c
            })
            .collect();
        (graph, root, leaves)
    }

    #[test]
    fn test_scenario_weighted_leaves_tile_square() {
        let (mut graph, root, leaves) = weighted_star(&[4.0, 3.0, 2.0, 1.0]);
        TreemapLayout::with_defaults().run(&mut graph, &Viewport::new(100.0, 100.0), 1.0);

        let square = geom::rect(0.0, 0.0, 100.0, 100.0);
        assert_eq!(bounds_of(&graph, root), square);

        let rects: Vec<_> = leaves.iter().map(|&l| bounds_of(&graph, l)).collect();
        for (r, expected) in rects.iter().zip([4000.0, 3000.0, 2000.0, 1000.0]) {
            assert!((r.area() - expected).abs() < 1e-6, "area {} vs {expected}", r.area());
            assert!(contains(&square, r));
        }
        for i in 0..rects.len() {
            for j in i + 1..rects.len() {
                assert!(overlap(&rects[i], &rects[j]) < 1e-6, "{i} overlaps {j}");
            }
        }
        let total: f64 = rects.iter().map(|r| r.area()).sum();
        assert!((total - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_equal_leaves_become_squares() {
        let (mut graph, _, leaves) = weighted_star(&[1.0; 6]);
        TreemapLayout::with_defaults().run(&mut graph, &Viewport::new(600.0, 400.0), 1.0);

        for &l in &leaves {
            let e = graph.extent(l);
            assert!((e.width - 200.0).abs() < 1e-9 && (e.height - 200.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_framed_children_fill_parent_interior() {
        // root -> 4 groups -> 5 leaves each, uneven weights
        let mut graph = Graph::new();
        let root = graph.add_node();
        let mut groups = Vec::new();
        for g in 0..4 {
            let group = graph.add_node();
            graph.add_edge(root, group, true);
            for i in 0..5 {
                let leaf = graph.add_node();
                graph.set_weight(leaf, 1.0 + ((g * 5 + i) % 4) as f64).unwrap();
                graph.add_edge(group, leaf, true);
            }
            groups.push(group);
        }

        let frame = 2.0;
        let mut layout = TreemapLayout::new(TreemapConfig { frame }).unwrap();
        layout.run(&mut graph, &Viewport::new(800.0, 600.0), 1.0);
        let tree = graph.spanning_tree(root).unwrap();

        for &n in tree.nodes() {
            let children = tree.children(n);
            if children.is_empty() {
                continue;
            }
            let b = bounds_of(&graph, n);
            let interior = geom::rect(
                b.min_x() + frame,
                b.min_y() + frame,
                b.width() - 2.0 * frame,
                b.height() - 2.0 * frame,
            );
            let sum: f64 = children.iter().map(|&c| bounds_of(&graph, c).area()).sum();
            assert!(
                (sum - interior.area()).abs() < 1e-6 * interior.area(),
                "{n}: children cover {sum}, interior {}",
                interior.area()
            );
            for &c in children {
                assert!(contains(&interior, &bounds_of(&graph, c)), "{c} escapes {n}");
            }
        }
    }

    #[test]
    fn test_collapsed_node_is_a_leaf() {
        let mut graph = Graph::new();
        let root = graph.add_node();
        let a = graph.add_node();
        let b = graph.add_node();
        let hidden = graph.add_node();
        graph.add_edge(root, a, true);
        graph.add_edge(root, b, true);
        graph.add_edge(a, hidden, true);
        graph.set_weight(hidden, 100.0).unwrap();
        graph.set_expanded(a, false).unwrap();

        TreemapLayout::with_defaults().run(&mut graph, &Viewport::new(100.0, 100.0), 1.0);
        // a counts with its own weight, equal to b's
        assert!((bounds_of(&graph, a).area() - 5000.0).abs() < 1e-6);
        assert!(!graph.node(hidden).unwrap().is_placed());
    }

    #[test]
    fn test_zero_weight_child_skipped() {
        let (mut graph, _, leaves) = weighted_star(&[1.0, 0.0]);
        TreemapLayout::with_defaults().run(&mut graph, &Viewport::new(100.0, 100.0), 1.0);
        assert!((bounds_of(&graph, leaves[0]).area() - 10_000.0).abs() < 1e-6);
        assert!(!graph.node(leaves[1]).unwrap().is_placed());
    }

    #[test]
    fn test_negative_frame_rejected() {
        assert_eq!(
            TreemapLayout::new(TreemapConfig { frame: -1.0 }).err(),
            Some(LayoutError::NegativeFrame(-1.0))
        );
        let mut layout = TreemapLayout::with_defaults();
        assert!(layout.set_frame(-0.5).is_err());
        assert_eq!(layout.config().frame, 0.0);
    }
}
