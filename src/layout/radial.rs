//! Radial tree layout.
//!
//! Nodes sit on concentric rings keyed by depth. Each node's angular share
//! is proportional to a size measure aggregated over its subtree, and
//! children are fanned out in the order they currently appear around their
//! parent to keep edge crossings down between frames.
//!
//! When the root changes, the branch that contains the previous root keeps
//! its on-screen heading instead of the whole tree spinning around.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::params::ParamTable;
use super::{Layout, LayoutBase, RunStatus, Viewport, set_position};
use crate::error::{LayoutError, Result};
use crate::geom::{self, Point, Rect};
use crate::graph::{Graph, NodeId, SpanningTree};

/// Kept clear between the outermost ring and the bounds when auto-scaling.
const MARGIN: f64 = 30.0;

/// A fixed angular range for the whole tree, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularBounds {
    pub theta: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadialConfig {
    /// Distance between rings when not auto-scaling.
    pub radius_increment: f64,
    /// Fit the outermost ring into the layout bounds.
    pub auto_scale: bool,
    /// Fixed angular range. Disables heading continuity on root changes.
    pub angular_bounds: Option<AngularBounds>,
}

impl Default for RadialConfig {
    fn default() -> Self {
        Self {
            radius_increment: 50.0,
            auto_scale: true,
            angular_bounds: None,
        }
    }
}

impl RadialConfig {
    pub fn validate(&self) -> Result<()> {
        if self.radius_increment.is_nan() || self.radius_increment < 0.0 {
            return Err(LayoutError::NegativeSpacing {
                name: "radius increment",
                value: self.radius_increment,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RadialParams {
    /// Size measure aggregated over the subtree.
    width: f64,
    /// Angular span assigned in the last pass.
    angle: f64,
}

pub struct RadialTreeLayout {
    base: LayoutBase,
    config: RadialConfig,
    params: ParamTable<RadialParams>,
    /// Ring spacing in effect for the current pass.
    radius_inc: f64,
    theta1: f64,
    theta2: f64,
    /// Root of the previous pass, for heading continuity.
    prev_root: Option<NodeId>,
    origin: Point,
}

impl RadialTreeLayout {
    pub fn new(config: RadialConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            base: LayoutBase::new(),
            radius_inc: config.radius_increment,
            config,
            params: ParamTable::new(),
            theta1: 0.0,
            theta2: TAU,
            prev_root: None,
            origin: Point::origin(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            base: LayoutBase::new(),
            radius_inc: RadialConfig::default().radius_increment,
            config: RadialConfig::default(),
            params: ParamTable::new(),
            theta1: 0.0,
            theta2: TAU,
            prev_root: None,
            origin: Point::origin(),
        }
    }

    pub fn config(&self) -> &RadialConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RadialConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Ring spacing used by the last pass.
    pub fn radius_increment(&self) -> f64 {
        self.radius_inc
    }

    /// Angular span given to `n` in the last pass.
    pub fn angular_span(&self, n: NodeId) -> Option<f64> {
        self.params.get(n).map(|p| p.angle)
    }

    /// Root of the last pass.
    pub fn previous_root(&self) -> Option<NodeId> {
        self.prev_root
    }

    /// Bottom-up size measure: bounding diagonal over depth, or the sum over
    /// children when that is larger.
    fn calc_angular_widths(&mut self, graph: &Graph, tree: &SpanningTree) {
        for n in tree.bottom_up() {
            let d = tree.depth(n).unwrap_or(0);
            let diameter = if d == 0 {
                0.0
            } else {
                let e = graph.extent(n);
                e.width.hypot(e.height) / f64::from(d)
            };
            let children = tree.children(n);
            let width = if children.is_empty() {
                diameter
            } else {
                let sum: f64 = children.iter().map(|&c| self.params[c].width).sum();
                diameter.max(sum)
            };
            self.params[n].width = width;
        }
    }

    fn set_scale(&mut self, bounds: &Rect, max_depth: u32) {
        if max_depth == 0 {
            return;
        }
        let r = bounds.width().min(bounds.height()) / 2.0;
        let inc = (r - MARGIN) / f64::from(max_depth);
        if inc > 0.0 {
            self.radius_inc = inc;
        } else {
            tracing::debug!(radius = r, "bounds too small to auto-scale rings");
        }
    }

    /// Share of the parent's span owed to `c`; equal shares when no child
    /// has any size.
    fn fraction(&self, c: NodeId, total: f64, count: usize) -> f64 {
        if total > 0.0 {
            self.params[c].width / total
        } else {
            1.0 / count as f64
        }
    }

    fn total_width(&self, children: &[NodeId]) -> f64 {
        children.iter().map(|&c| self.params[c].width).sum()
    }

    /// Children ordered by their current heading around `n`, measured from
    /// the direction of `n`'s parent. Falls back to structural order when the
    /// children have never been placed.
    fn sorted_children(&self, graph: &Graph, tree: &SpanningTree, n: NodeId) -> Vec<NodeId> {
        let children = tree.children(n);
        let Some(&first) = children.first() else {
            return Vec::new();
        };
        let placed = |id: NodeId| graph.node(id).is_some_and(|d| d.is_placed());
        if !placed(n) || !placed(first) {
            return children.to_vec();
        }

        let np = graph.node(n).map_or(Point::origin(), |d| d.position());
        let base = tree
            .parent(n)
            .filter(|&p| placed(p))
            .and_then(|p| graph.position(p))
            .map_or(0.0, |pp| normalize((pp.y - np.y).atan2(pp.x - np.x)));

        let mut keyed: Vec<(f64, NodeId)> = children
            .iter()
            .map(|&c| {
                let cp = graph.position(c).unwrap_or(np);
                (normalize(-base + (cp.y - np.y).atan2(cp.x - np.x)), c)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, c)| c).collect()
    }

    /// Rotate the start angle so the branch holding the previous root keeps
    /// its current heading from the new root.
    fn calc_angular_bounds(&mut self, graph: &Graph, tree: &SpanningTree) {
        let r = tree.root();
        let Some(prev) = self.prev_root.replace(r) else {
            return;
        };
        if prev == r || !tree.contains(prev) {
            return;
        }

        // child of the new root on the path to the old one
        let mut p = prev;
        loop {
            match tree.parent(p) {
                Some(pp) if pp == r => break,
                Some(pp) => p = pp,
                None => return,
            }
        }

        let children = self.sorted_children(graph, tree, r);
        let total = self.total_width(&children);
        let dt: f64 = children
            .iter()
            .take_while(|&&c| c != p)
            .map(|&c| self.fraction(c, total, children.len()))
            .sum();
        let pw = self.fraction(p, total, children.len());

        let (Some(pp), Some(rp)) = (graph.position(p), graph.position(r)) else {
            return;
        };
        let heading = (pp.y - rp.y).atan2(pp.x - rp.x);
        if heading.is_nan() {
            tracing::debug!(root = %r, "previous branch unplaced, keeping angular bounds");
            return;
        }
        self.theta1 = heading - TAU * (dt + pw / 2.0);
        self.theta2 = self.theta1 + TAU;
        tracing::trace!(
            root = %r,
            previous = %prev,
            theta = self.theta1,
            "rotated for root change"
        );
    }

    /// Fan the children of `n` over `[theta1, theta2]` on ring `r`.
    fn layout(
        &mut self,
        graph: &mut Graph,
        tree: &SpanningTree,
        n: NodeId,
        r: f64,
        theta1: f64,
        theta2: f64,
    ) {
        let dtheta = theta2 - theta1;
        let children = self.sorted_children(graph, tree, n);
        let total = self.total_width(&children);

        let mut nfrac = 0.0;
        for &c in &children {
            let cfrac = self.fraction(c, total, children.len());
            if !tree.is_leaf(c) {
                self.layout(
                    graph,
                    tree,
                    c,
                    r + self.radius_inc,
                    theta1 + nfrac * dtheta,
                    theta1 + (nfrac + cfrac) * dtheta,
                );
            }
            let theta = theta1 + nfrac * dtheta + cfrac * dtheta / 2.0;
            let p = geom::point(self.origin.x + r * theta.cos(), self.origin.y + r * theta.sin());
            set_position(graph, c, Some(n), p);
            self.params[c].angle = cfrac * dtheta;
            nfrac += cfrac;
        }
    }
}

/// Angle wrapped into `[0, 2π)`.
fn normalize(angle: f64) -> f64 {
    angle.rem_euclid(TAU)
}

impl Layout for RadialTreeLayout {
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
            tracing::debug!("radial layout has no visible root");
            return status;
        };
        let root = tree.root();

        self.params.clear();
        self.origin = self.base.layout_anchor(viewport);
        self.radius_inc = self.config.radius_increment;

        let max_depth = tree.max_depth();
        self.calc_angular_widths(graph, &tree);
        if self.config.auto_scale {
            let bounds = self.base.layout_bounds(viewport);
            self.set_scale(&bounds, max_depth);
        }
        match self.config.angular_bounds {
            Some(b) => {
                self.theta1 = b.theta;
                self.theta2 = b.theta + b.width;
                self.prev_root = Some(root);
            }
            None => self.calc_angular_bounds(graph, &tree),
        }

        if max_depth > 0 {
            let (t1, t2, inc) = (self.theta1, self.theta2, self.radius_inc);
            self.layout(graph, &tree, root, inc, t1, t2);
        }

        set_position(graph, root, None, self.origin);
        self.params[root].angle = self.theta2 - self.theta1;

        tracing::debug!(
            nodes = tree.len(),
            depth = max_depth,
            radius_inc = self.radius_inc,
            "radial pass complete"
        );
        status
    }

    fn reset(&mut self) {
        self.prev_root = None;
        self.theta1 = 0.0;
        self.theta2 = TAU;
        self.params.clear();
    }
}
