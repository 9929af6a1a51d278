//! Balloon tree layout.
//!
//! Every parent is the centre of a circle and its children are fanned around
//! the circumference, each child in turn the centre of its own, smaller
//! balloon. The bottom-up walk sizes each subtree's enclosing radius; the
//! top-down walk distributes angle and projects positions.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::params::ParamTable;
use super::{Layout, LayoutBase, RunStatus, Viewport, set_position};
use crate::error::{LayoutError, Result};
use crate::geom::{self, Point};
use crate::graph::{Graph, NodeId, SpanningTree};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BalloonConfig {
    /// Radius of a leaf's balloon.
    pub min_radius: f64,
}

impl Default for BalloonConfig {
    fn default() -> Self {
        Self { min_radius: 2.0 }
    }
}

impl BalloonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_radius.is_nan() || self.min_radius < 0.0 {
            return Err(LayoutError::NegativeSpacing {
                name: "minimum radius",
                value: self.min_radius,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct BalloonParams {
    /// Largest child radius; children sit this far out (before scaling).
    d: f64,
    /// Radius of the whole subtree's balloon.
    r: f64,
    /// Half-angle the node needs around its parent.
    a: f64,
    /// Compression applied to the children's half-angles.
    c: f64,
    /// Angular slack left over for the children.
    f: f64,
    center: Point,
    /// Scale factor inherited from the ancestors.
    scale: f64,
    /// Heading from the parent.
    theta: f64,
}

impl Default for BalloonParams {
    fn default() -> Self {
        Self {
            d: 0.0,
            r: 0.0,
            a: 0.0,
            c: 1.0,
            f: 0.0,
            center: Point::origin(),
            scale: 1.0,
            theta: 0.0,
        }
    }
}

pub struct BalloonTreeLayout {
    base: LayoutBase,
    config: BalloonConfig,
    params: ParamTable<BalloonParams>,
}

impl BalloonTreeLayout {
    pub fn new(config: BalloonConfig) -> Result<Self> {
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
            config: BalloonConfig::default(),
            params: ParamTable::new(),
        }
    }

    pub fn config(&self) -> &BalloonConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BalloonConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Lay out `tree` with its root at `anchor`.
    pub fn layout_tree(&mut self, graph: &mut Graph, tree: &SpanningTree, anchor: Point) {
        self.params = ParamTable::with_bound(graph.node_bound());
        self.first_walk(tree);

        let root = tree.root();
        self.params[root].center = anchor;
        self.second_walk(graph, tree);

        tracing::debug!(
            nodes = tree.len(),
            radius = self.params[root].r,
            "balloon pass complete"
        );
        self.params.clear();
    }

    /// Bottom-up: subtree radii and each child's angular footprint.
    fn first_walk(&mut self, tree: &SpanningTree) {
        for n in tree.bottom_up() {
            let children = tree.children(n);
            let d = children
                .iter()
                .map(|&c| self.params[c].r)
                .fold(0.0, f64::max);

            let mut s = 0.0;
            for &c in children {
                let cp = &mut self.params[c];
                cp.a = (cp.r / (d + cp.r)).atan();
                if cp.a.is_nan() {
                    cp.a = 0.0;
                }
                s += cp.a;
            }

            let np = &mut self.params[n];
            np.d = d;
            // Compress when the children need more than a half turn
            if s > PI {
                np.c = PI / s;
                np.f = 0.0;
            } else {
                np.c = 1.0;
                np.f = PI - s;
            }
            np.r = d.max(self.config.min_radius) + 2.0 * d;
        }
    }

    /// Top-down: fan children around each placed parent.
    fn second_walk(&mut self, graph: &mut Graph, tree: &SpanningTree) {
        for &n in tree.nodes() {
            let np = self.params[n];
            set_position(graph, n, tree.parent(n), np.center);

            let children = tree.children(n);
            if children.is_empty() {
                continue;
            }
            let l = np.scale;
            let dd = l * np.d;
            let fs = np.f / children.len() as f64;
            let mut p = np.theta + PI;
            let mut pr = 0.0;

            for &c in children {
                let cp = &mut self.params[c];
                let aa = np.c * cp.a;
                let t = aa.tan();
                let rr = np.d * t / (1.0 - t);
                p += pr + aa + fs;
                let dist = l * rr + dd;
                cp.center = geom::point(np.center.x + dist * p.cos(), np.center.y + dist * p.sin());
                cp.scale = if cp.r > 0.0 { l * rr / cp.r } else { l };
                cp.theta = p;
                pr = aa;
            }
        }
    }
}

impl Layout for BalloonTreeLayout {
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
            tracing::debug!("balloon layout has no visible root");
            return status;
        };
        let anchor = self.base.layout_anchor(viewport);
        self.layout_tree(graph, &tree, anchor);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn star(k: usize) -> (Graph, NodeId, Vec<NodeId>) {
        let mut graph = Graph::new();
        let root = graph.add_node();
        let leaves: Vec<_> = (0..k)
            .map(|_| {
                let c = graph.add_node();
                graph.add_edge(root, c, true);
                c
            })
            .collect();
        (graph, root, leaves)
    }

    fn heading(graph: &Graph, from: NodeId, to: NodeId) -> f64 {
        let a = graph.position(from).unwrap();
        let b = graph.position(to).unwrap();
        (b.y - a.y).atan2(b.x - a.x).rem_euclid(TAU)
    }

    fn distance(graph: &Graph, a: NodeId, b: NodeId) -> f64 {
        (graph.position(a).unwrap() - graph.position(b).unwrap()).length()
    }

    #[test]
    fn test_leaves_ring_the_root() {
        let (mut graph, root, leaves) = star(3);
        let mut layout = BalloonTreeLayout::with_defaults();
        layout.run(&mut graph, &Viewport::new(200.0, 200.0), 1.0);

        assert_eq!(graph.position(root), Some(geom::point(100.0, 100.0)));

        // leaf radius 2: footprint atan(2 / 4), rr = 2 * 0.5 / 0.5
        let a = 0.5_f64.atan();
        let fs = (PI - 3.0 * a) / 3.0;
        let mut p = PI;
        let mut pr = 0.0;
        for &leaf in &leaves {
            p += pr + a + fs;
            pr = a;
            assert!((distance(&graph, root, leaf) - 4.0).abs() < 1e-9);
            assert!((heading(&graph, root, leaf) - p.rem_euclid(TAU)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_crowded_children_compressed_to_full_turn() {
        let (mut graph, root, leaves) = star(20);
        let mut layout = BalloonTreeLayout::with_defaults();
        layout.run(&mut graph, &Viewport::new(200.0, 200.0), 1.0);

        // 20 equal footprints exceed a half turn, so they share the circle evenly
        let step = TAU / 20.0;
        for pair in leaves.windows(2) {
            let gap =
                (heading(&graph, root, pair[1]) - heading(&graph, root, pair[0])).rem_euclid(TAU);
            assert!((gap - step).abs() < 1e-9, "gap {gap}, expected {step}");
        }
    }

    #[test]
    fn test_grandchildren_orbit_their_parent() {
        let mut graph = Graph::new();
        let root = graph.add_node();
        let mid: Vec<_> = (0..2)
            .map(|_| {
                let c = graph.add_node();
                graph.add_edge(root, c, true);
                c
            })
            .collect();
        let mut grand = Vec::new();
        for &m in &mid {
            for _ in 0..3 {
                let g = graph.add_node();
                graph.add_edge(m, g, true);
                grand.push((m, g));
            }
        }

        let mut layout = BalloonTreeLayout::with_defaults();
        layout.run(&mut graph, &Viewport::new(400.0, 400.0), 1.0);

        for &(m, g) in &grand {
            let d = distance(&graph, m, g);
            assert!(d.is_finite() && d > 0.0);
            // grandchildren stay closer to their parent than the parents are to the root
            assert!(d < distance(&graph, root, m), "{g} strays from {m}");
        }
        let first = distance(&graph, grand[0].0, grand[0].1);
        for &(m, g) in &grand {
            assert!((distance(&graph, m, g) - first).abs() < 1e-9);
        }
        assert!(layout.params.is_empty());
    }

    #[test]
    fn test_path_stays_finite() {
        let mut graph = Graph::new();
        let ids: Vec<_> = (0..30).map(|_| graph.add_node()).collect();
        for w in ids.windows(2) {
            graph.add_edge(w[0], w[1], true);
        }
        BalloonTreeLayout::with_defaults().run(&mut graph, &Viewport::new(400.0, 400.0), 1.0);

        for &id in &ids {
            let p = graph.position(id).unwrap();
            assert!(p.x.is_finite() && p.y.is_finite(), "{id} at {p:?}");
        }
    }

    #[test]
    fn test_collapsed_children_left_alone() {
        let (mut graph, root, leaves) = star(2);
        graph.set_expanded(root, false).unwrap();
        BalloonTreeLayout::with_defaults().run(&mut graph, &Viewport::new(100.0, 100.0), 1.0);

        assert!(graph.node(root).unwrap().is_placed());
        assert!(leaves.iter().all(|&l| !graph.node(l).unwrap().is_placed()));
    }

    #[test]
    fn test_negative_min_radius_rejected() {
        assert!(BalloonTreeLayout::new(BalloonConfig { min_radius: -1.0 }).is_err());
    }
}
