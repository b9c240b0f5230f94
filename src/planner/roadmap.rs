//! Roadmap inputs consumed by the planner.
//!
//! Roadmap construction (vertex sampling, dynamic-programming over the
//! graph) happens outside this crate; the planner consumes its outputs: the
//! start and goal vertices, the baseline feedback policy, the baseline
//! cost-to-go table, the node controllers, and the connection radius.

use crate::control::NodeController;
use crate::graph::{EdgeId, VertexId};
use std::collections::HashMap;

/// The precomputed roadmap products the search runs on top of.
#[derive(Debug)]
pub struct Roadmap {
    start: Option<VertexId>,
    goal: Option<VertexId>,
    /// Connection radius for action expansion (meters).
    pub nn_radius: f32,
    feedback: HashMap<VertexId, EdgeId>,
    baseline_cost_to_go: HashMap<VertexId, f64>,
    node_controllers: HashMap<VertexId, NodeController>,
}

impl Roadmap {
    /// Create an empty roadmap with the given connection radius.
    pub fn new(nn_radius: f32) -> Self {
        Self {
            start: None,
            goal: None,
            nn_radius,
            feedback: HashMap::new(),
            baseline_cost_to_go: HashMap::new(),
            node_controllers: HashMap::new(),
        }
    }

    /// The start vertex, once set.
    pub fn start(&self) -> Option<VertexId> {
        self.start
    }

    /// The goal vertex, once set.
    pub fn goal(&self) -> Option<VertexId> {
        self.goal
    }

    /// Set the start vertex.
    pub fn set_start(&mut self, v: VertexId) {
        self.start = Some(v);
    }

    /// Set the goal vertex.
    pub fn set_goal(&mut self, v: VertexId) {
        self.goal = Some(v);
    }

    /// The baseline feedback edge out of a vertex.
    pub fn feedback_edge(&self, v: VertexId) -> Option<EdgeId> {
        self.feedback.get(&v).copied()
    }

    /// Install the baseline feedback edge for a vertex.
    pub fn set_feedback_edge(&mut self, v: VertexId, e: EdgeId) {
        self.feedback.insert(v, e);
    }

    /// Baseline cost-to-go of a vertex; infinite when unknown.
    pub fn baseline_cost_to_go(&self, v: VertexId) -> f64 {
        self.baseline_cost_to_go
            .get(&v)
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Install the baseline cost-to-go of a vertex.
    pub fn set_baseline_cost_to_go(&mut self, v: VertexId, cost: f64) {
        self.baseline_cost_to_go.insert(v, cost);
    }

    /// The stabilizing controller at a roadmap vertex.
    pub fn node_controller_mut(&mut self, v: VertexId) -> Option<&mut NodeController> {
        self.node_controllers.get_mut(&v)
    }

    /// Install the stabilizing controller of a roadmap vertex.
    pub fn set_node_controller(&mut self, v: VertexId, controller: NodeController) {
        self.node_controllers.insert(v, controller);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cost_to_go_is_infinite() {
        let roadmap = Roadmap::new(1.0);
        assert!(roadmap.baseline_cost_to_go(VertexId(3)).is_infinite());
    }

    #[test]
    fn test_feedback_round_trip() {
        let mut roadmap = Roadmap::new(1.0);
        assert_eq!(roadmap.feedback_edge(VertexId(0)), None);
        roadmap.set_feedback_edge(VertexId(0), EdgeId(4));
        assert_eq!(roadmap.feedback_edge(VertexId(0)), Some(EdgeId(4)));
    }
}
