//! Layout algorithms for tree and graph visualization.
//!
//! Every algorithm shares the contract in this module: it resolves an anchor
//! and bounds from the viewport (unless overridden), writes node coordinates
//! through [`set_coordinate`] so the animation collaborator always has a
//! start/current/end triple to interpolate, and is driven by
//! [`Layout::run`] once per animation frame.
//!
//! - [`tidy_tree`]: node-link tree (Buchheim-Walker, linear time)
//! - [`radial`]: concentric-ring tree with angular continuity on root change
//! - [`balloon`]: nested circles around each parent
//! - [`force`]: Fruchterman-Reingold simulation
//! - [`treemap`]: squarified treemap

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::geom::{self, Insets, Point, Rect, Size, Transform};
use crate::graph::{Graph, NodeId};

pub mod balloon;
pub mod force;
pub mod params;
pub mod radial;
pub mod tidy_tree;
pub mod treemap;

pub use balloon::{BalloonConfig, BalloonTreeLayout};
pub use force::{ForceConfig, ForceDirectedLayout, ForceMode};
pub use params::ParamTable;
pub use radial::{RadialConfig, RadialTreeLayout};
pub use tidy_tree::{Orientation, TidyTreeConfig, TidyTreeLayout, TreePassStats};
pub use treemap::{TreemapConfig, TreemapLayout};

/// The display a layout is fitted to.
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Screen extent.
    pub size: Size,
    /// Screen-space insets applied when no explicit margin is set.
    pub insets: Insets,
    /// Model-to-screen transform (pan and zoom).
    pub view_transform: Transform,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: geom::size(width, height),
            insets: Insets::zero(),
            view_transform: Transform::identity(),
        }
    }

    pub fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    pub fn with_transform(mut self, view_transform: Transform) -> Self {
        self.view_transform = view_transform;
        self
    }

    /// Screen-to-model transform. A singular view transform (zero zoom)
    /// falls back to identity.
    pub fn inverse_transform(&self) -> Transform {
        self.view_transform.inverse().unwrap_or_else(|| {
            tracing::warn!(
                transform = ?self.view_transform,
                "view transform is not invertible, using identity"
            );
            Transform::identity()
        })
    }

    /// Map a screen-space point into model space.
    pub fn to_model(&self, p: Point) -> Point {
        self.inverse_transform().transform_point(p)
    }
}

/// Shared settings every layout carries: optional overrides for the anchor,
/// the bounds, the margin and the root.
#[derive(Debug, Clone, Default)]
pub struct LayoutBase {
    anchor: Option<Point>,
    bounds: Option<Rect>,
    margin: Option<Insets>,
    root: Option<NodeId>,
}

impl LayoutBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the anchor in model space, or `None` to follow the viewport.
    pub fn set_anchor(&mut self, anchor: Option<Point>) {
        self.anchor = anchor;
    }

    pub fn anchor(&self) -> Option<Point> {
        self.anchor
    }

    /// Fix the bounds in model space, or `None` to follow the viewport.
    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    /// Screen-space margin used instead of the viewport insets.
    pub fn set_margin(&mut self, margin: Option<Insets>) -> Result<()> {
        if let Some(m) = margin {
            if m.top < 0.0 || m.right < 0.0 || m.bottom < 0.0 || m.left < 0.0 {
                return Err(LayoutError::NegativeMargin);
            }
        }
        self.margin = margin;
        Ok(())
    }

    /// Lay out from this node instead of the graph's designated root.
    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Explicit bounds if set, else the viewport extent minus margins,
    /// mapped into model space.
    pub fn layout_bounds(&self, viewport: &Viewport) -> Rect {
        if let Some(b) = self.bounds {
            return b;
        }
        let i = self.margin.unwrap_or(viewport.insets);
        let screen = geom::rect(
            i.left,
            i.top,
            viewport.size.width - i.left - i.right,
            viewport.size.height - i.top - i.bottom,
        );
        geom::transform_rect(&viewport.inverse_transform(), &screen)
    }

    /// Explicit anchor if set, else the viewport centre in model space.
    pub fn layout_anchor(&self, viewport: &Viewport) -> Point {
        self.anchor.unwrap_or_else(|| {
            viewport.to_model(geom::point(
                viewport.size.width / 2.0,
                viewport.size.height / 2.0,
            ))
        })
    }

    /// Explicit root if it is still in the graph, else the graph's root.
    pub fn layout_root(&self, graph: &Graph) -> Option<NodeId> {
        self.root
            .filter(|&r| graph.contains(r))
            .or_else(|| graph.root())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Retarget one axis of `node` to `value`.
///
/// The node's current value becomes its start value. A node that has never
/// been placed starts from `referrer`'s current coordinate instead, so new
/// nodes grow out of their parent rather than flying in from the origin.
pub fn set_coordinate(
    graph: &mut Graph,
    node: NodeId,
    referrer: Option<NodeId>,
    axis: Axis,
    value: f64,
) {
    if value.is_nan() {
        tracing::warn!(%node, ?axis, "layout produced NaN coordinate, leaving node in place");
        return;
    }
    let seed = referrer.and_then(|r| graph.node(r)).map(|r| match axis {
        Axis::X => r.x.current,
        Axis::Y => r.y.current,
    });
    if let Some(n) = graph.node_mut(node) {
        match axis {
            Axis::X => n.x.retarget(value, seed),
            Axis::Y => n.y.retarget(value, seed),
        }
    }
}

/// Retarget both axes of `node`.
pub fn set_position(graph: &mut Graph, node: NodeId, referrer: Option<NodeId>, p: Point) {
    set_coordinate(graph, node, referrer, Axis::X, p.x);
    set_coordinate(graph, node, referrer, Axis::Y, p.y);
}

/// Outcome of one `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Complete,
}

impl RunStatus {
    pub fn from_fraction(fraction: f64) -> Self {
        if fraction >= 1.0 {
            RunStatus::Complete
        } else {
            RunStatus::Running
        }
    }

    pub fn is_complete(self) -> bool {
        self == RunStatus::Complete
    }
}

/// A placement strategy driven once per animation frame.
pub trait Layout {
    fn base(&self) -> &LayoutBase;

    fn base_mut(&mut self) -> &mut LayoutBase;

    /// Compute positions for `fraction` in [0, 1] of the current transition.
    ///
    /// Continuous layouts recompute the complete target on every call.
    /// Run-once layouts iterate internally and report completion when the
    /// fraction reaches 1.0.
    fn run(&mut self, graph: &mut Graph, viewport: &Viewport, fraction: f64) -> RunStatus;

    /// Forget state retained between passes.
    fn reset(&mut self) {}

    /// Whether every call yields a complete target layout.
    fn is_continuous(&self) -> bool {
        true
    }
}

/// The available placement strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    NodeLinkTree,
    Radial,
    Balloon,
    ForceDirected,
    Treemap,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 5] = [
        LayoutKind::NodeLinkTree,
        LayoutKind::Radial,
        LayoutKind::Balloon,
        LayoutKind::ForceDirected,
        LayoutKind::Treemap,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::NodeLinkTree => "node-link-tree",
            LayoutKind::Radial => "radial",
            LayoutKind::Balloon => "balloon",
            LayoutKind::ForceDirected => "force-directed",
            LayoutKind::Treemap => "treemap",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        LayoutKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| LayoutError::UnknownLayout(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{point, rect};

    #[test]
    fn test_bounds_from_viewport_and_margin() {
        let viewport = Viewport::new(200.0, 100.0).with_insets(Insets::new(10.0, 10.0, 10.0, 10.0));
        let mut base = LayoutBase::new();
        assert_eq!(base.layout_bounds(&viewport), rect(10.0, 10.0, 180.0, 80.0));

        base.set_margin(Some(Insets::new(0.0, 20.0, 0.0, 20.0))).unwrap();
        assert_eq!(base.layout_bounds(&viewport), rect(20.0, 0.0, 160.0, 100.0));

        base.set_bounds(Some(rect(1.0, 2.0, 3.0, 4.0)));
        assert_eq!(base.layout_bounds(&viewport), rect(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_bounds_mapped_through_inverse_transform() {
        // zoomed in 2x and panned 100px right
        let view = Transform::scale(2.0, 2.0).then_translate(euclid::vec2(100.0, 0.0));
        let viewport = Viewport::new(200.0, 100.0).with_transform(view);
        let base = LayoutBase::new();

        let b = base.layout_bounds(&viewport);
        assert!((b.min_x() + 50.0).abs() < 1e-9);
        assert!((b.width() - 100.0).abs() < 1e-9);
        assert!((b.height() - 50.0).abs() < 1e-9);

        let a = base.layout_anchor(&viewport);
        assert!(a.x.abs() < 1e-9);
        assert!((a.y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_transform_falls_back_to_identity() {
        let viewport = Viewport::new(100.0, 100.0).with_transform(Transform::scale(0.0, 0.0));
        let a = LayoutBase::new().layout_anchor(&viewport);
        assert_eq!(a, point(50.0, 50.0));
    }

    #[test]
    fn test_negative_margin_rejected() {
        let mut base = LayoutBase::new();
        let err = base.set_margin(Some(Insets::new(0.0, -1.0, 0.0, 0.0)));
        assert_eq!(err, Err(LayoutError::NegativeMargin));
    }

    #[test]
    fn test_explicit_anchor() {
        let mut base = LayoutBase::new();
        base.set_anchor(Some(point(3.0, 4.0)));
        assert_eq!(base.layout_anchor(&Viewport::new(10.0, 10.0)), point(3.0, 4.0));
    }

    #[test]
    fn test_set_coordinate_seeds_from_referrer() {
        let mut graph = Graph::new();
        let parent = graph.add_node_at(40.0, 60.0);
        let child = graph.add_node();

        set_position(&mut graph, child, Some(parent), point(100.0, 100.0));
        let c = graph.node(child).unwrap();
        assert_eq!(c.x.start, 40.0);
        assert_eq!(c.y.start, 60.0);
        assert_eq!(c.x.current, 100.0);
        assert_eq!(c.y.end, 100.0);

        set_position(&mut graph, child, Some(parent), point(0.0, 0.0));
        let c = graph.node(child).unwrap();
        assert_eq!(c.x.start, 100.0);
        assert_eq!(c.x.end, 0.0);
    }

    #[test]
    fn test_set_coordinate_ignores_nan() {
        let mut graph = Graph::new();
        let n = graph.add_node_at(1.0, 1.0);
        set_coordinate(&mut graph, n, None, Axis::X, f64::NAN);
        assert_eq!(graph.node(n).unwrap().x.current, 1.0);
    }

    #[test]
    fn test_layout_root_falls_back_to_graph_root() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let mut base = LayoutBase::new();
        assert_eq!(base.layout_root(&graph), Some(a));
        base.set_root(Some(b));
        assert_eq!(base.layout_root(&graph), Some(b));
        graph.remove_node(b);
        assert_eq!(base.layout_root(&graph), Some(a));
    }

    #[test]
    fn test_layout_kind_names() {
        for kind in LayoutKind::ALL {
            assert_eq!(kind.name().parse::<LayoutKind>(), Ok(kind));
        }
        assert_eq!(
            "spiral".parse::<LayoutKind>(),
            Err(LayoutError::UnknownLayout("spiral".into()))
        );
    }

    #[test]
    fn test_run_status_from_fraction() {
        assert_eq!(RunStatus::from_fraction(0.5), RunStatus::Running);
        assert!(RunStatus::from_fraction(1.0).is_complete());
    }
}
