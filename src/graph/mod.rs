//! Graph data structures and operations.
//!
//! This module provides the tree/graph model using petgraph's StableGraph
//! for stable node/edge slots, plus breadth-first spanning tree extraction
//! for the tree-shaped layouts.

mod edge;
mod model;
mod node;
mod tree;

pub use edge::{EdgeData, EdgeId};
pub use model::Graph;
pub use node::{Coord, NodeData, NodeId, NodeState};
pub use tree::SpanningTree;
