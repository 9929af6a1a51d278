//! R-tree over node bounding boxes using the rstar crate.
//!
//! Provides O(log n) queries for:
//! - Point picking (which node lies under a model-space point)
//! - Rectangle intersection

use rstar::{AABB, Envelope, PointDistance, RTree, RTreeObject};

use crate::geom::{Point, Rect};
use crate::graph::NodeId;

/// A node's bounding box in the spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBox {
    /// The node identifier.
    pub id: NodeId,
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl NodeBox {
    pub fn new(id: NodeId, r: &Rect) -> Self {
        Self {
            id,
            min: [r.min_x(), r.min_y()],
            max: [r.max_x(), r.max_y()],
        }
    }

    fn area(&self) -> f64 {
        (self.max[0] - self.min[0]) * (self.max[1] - self.min[1])
    }
}

impl RTreeObject for NodeBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for NodeBox {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        Envelope::distance_2(&self.envelope(), point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        Envelope::contains_point(&self.envelope(), point)
    }
}

/// Spatial index for graph nodes.
pub struct SpatialIndex {
    tree: RTree<NodeBox>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// The smallest box containing `p`, which for nested layouts (treemaps)
    /// is the deepest node under the point.
    pub fn smallest_containing(&self, p: Point) -> Option<NodeId> {
        self.tree
            .locate_all_at_point(&[p.x, p.y])
            .min_by(|a, b| a.area().total_cmp(&b.area()))
            .map(|b| b.id)
    }

    /// All nodes whose boxes intersect `r`.
    pub fn intersecting(&self, r: &Rect) -> Vec<NodeId> {
        let envelope = AABB::from_corners([r.min_x(), r.min_y()], [r.max_x(), r.max_y()]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|b| b.id)
            .collect()
    }

    /// Rebuild the index from (id, bounds) pairs in one bulk load.
    pub fn rebuild(&mut self, boxes: &[(NodeId, Rect)]) {
        let node_boxes: Vec<_> = boxes.iter().map(|(id, r)| NodeBox::new(*id, r)).collect();
        self.tree = RTree::bulk_load(node_boxes);
    }

    /// Clear all nodes from the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Get the number of nodes in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
