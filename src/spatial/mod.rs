//! Spatial indexing for O(log n) hit testing.
//!
//! This module provides an R-tree based index over node bounding boxes so a
//! host can pick the node under the pointer (for example to choose a new
//! layout root) without scanning every node.

mod rtree;

pub use rtree::SpatialIndex;
