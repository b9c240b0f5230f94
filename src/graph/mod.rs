//! Belief graph and roadmap nearest-neighbor index.

mod belief_graph;
mod nn_index;

pub use belief_graph::{
    ActionStats, BeliefGraph, EdgeId, EdgeWeight, VertexData, VertexId, VertexKind,
};
pub use nn_index::FirmIndex;
