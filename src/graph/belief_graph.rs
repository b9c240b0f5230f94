//! Mutable graph of belief vertices and controller edges.
//!
//! Two vertex classes share the arena: persistent roadmap (FIRM) vertices,
//! which live for the whole run, and transient search-tree vertices created
//! on demand by simulation and destroyed when the tree is pruned after a
//! real action. Cross-references are stable integer ids, never owning
//! handles, so pruning is a tombstone plus dropping the heavy edge
//! controllers.

use crate::control::EdgeController;
use crate::core::types::GaussianBelief;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable vertex identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Stable edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

/// Vertex class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// Persistent roadmap vertex with a stabilizing node controller.
    Firm,
    /// Transient search-tree vertex.
    Pomcp,
}

/// Edge weight: cost estimate plus transition success probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub cost: f64,
    pub success_probability: f64,
}

/// Per-action search statistics on a vertex.
#[derive(Debug, Clone, Default)]
pub struct ActionStats {
    /// N(h,a): times this action was taken from this vertex.
    pub visits: f64,
    /// M(h,a): times taking it ended in collision or deviation.
    pub misses: f64,
    /// Q(h,a): running cost-to-go estimate.
    pub cost_to_go: f64,
    /// The single observation child vertex for this action, once created.
    pub obs_child: Option<VertexId>,
}

/// A belief vertex with its search statistics.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub belief: GaussianBelief,
    pub kind: VertexKind,
    pub pruned: bool,
    /// N(h): completed descents through this vertex.
    pub n_visits: f64,
    /// J(h): minimum cost-to-go over the vertex's actions.
    pub min_cost_to_go: f64,
    /// Whether the action set has been materialized.
    pub expanded: bool,
    /// Action targets in insertion order.
    pub actions: Vec<VertexId>,
    pub action_stats: HashMap<VertexId, ActionStats>,
}

#[derive(Debug)]
struct EdgeRecord {
    from: VertexId,
    to: VertexId,
    weight: EdgeWeight,
    controller: Option<EdgeController>,
    pruned: bool,
}

/// Arena of belief vertices and controller edges.
#[derive(Debug, Default)]
pub struct BeliefGraph {
    vertices: Vec<VertexData>,
    edges: Vec<EdgeRecord>,
    out_edges: Vec<Vec<EdgeId>>,
}

impl BeliefGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex carrying a belief.
    pub fn add_vertex(&mut self, belief: GaussianBelief, kind: VertexKind) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(VertexData {
            belief,
            kind,
            pruned: false,
            n_visits: 0.0,
            min_cost_to_go: f64::INFINITY,
            expanded: false,
            actions: Vec::new(),
            action_stats: HashMap::new(),
        });
        self.out_edges.push(Vec::new());
        id
    }

    /// Vertex data (tombstoned vertices included).
    pub fn vertex(&self, v: VertexId) -> &VertexData {
        &self.vertices[v.0 as usize]
    }

    /// Mutable vertex data.
    pub fn vertex_mut(&mut self, v: VertexId) -> &mut VertexData {
        &mut self.vertices[v.0 as usize]
    }

    /// The belief stored at a vertex.
    pub fn belief(&self, v: VertexId) -> &GaussianBelief {
        &self.vertices[v.0 as usize].belief
    }

    /// Overwrite the belief stored at a vertex.
    pub fn set_belief(&mut self, v: VertexId, belief: GaussianBelief) {
        self.vertices[v.0 as usize].belief = belief;
    }

    /// Whether a vertex has been pruned.
    pub fn is_pruned(&self, v: VertexId) -> bool {
        self.vertices[v.0 as usize].pruned
    }

    /// Total vertices ever allocated.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertices not yet pruned.
    pub fn live_vertex_count(&self) -> usize {
        self.vertices.iter().filter(|v| !v.pruned).count()
    }

    /// Live roadmap vertices.
    pub fn firm_vertex_count(&self) -> usize {
        self.vertices
            .iter()
            .filter(|v| !v.pruned && v.kind == VertexKind::Firm)
            .count()
    }

    /// Add a directed edge carrying a controller.
    pub fn add_edge(
        &mut self,
        from: VertexId,
        to: VertexId,
        weight: EdgeWeight,
        controller: EdgeController,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeRecord {
            from,
            to,
            weight,
            controller: Some(controller),
            pruned: false,
        });
        self.out_edges[from.0 as usize].push(id);
        id
    }

    /// Source vertex of an edge.
    pub fn edge_source(&self, e: EdgeId) -> VertexId {
        self.edges[e.0 as usize].from
    }

    /// Target vertex of an edge.
    pub fn edge_target(&self, e: EdgeId) -> VertexId {
        self.edges[e.0 as usize].to
    }

    /// Weight of an edge.
    pub fn edge_weight(&self, e: EdgeId) -> EdgeWeight {
        self.edges[e.0 as usize].weight
    }

    /// The edge controller, unless the edge has been pruned.
    pub fn controller(&self, e: EdgeId) -> Option<&EdgeController> {
        self.edges[e.0 as usize].controller.as_ref()
    }

    /// Mutable controller access.
    pub fn controller_mut(&mut self, e: EdgeId) -> Option<&mut EdgeController> {
        self.edges[e.0 as usize].controller.as_mut()
    }

    /// Outgoing edges of a vertex.
    pub fn out_edges(&self, v: VertexId) -> &[EdgeId] {
        &self.out_edges[v.0 as usize]
    }

    /// The live edge from `from` to `to`, if any.
    pub fn edge_between(&self, from: VertexId, to: VertexId) -> Option<EdgeId> {
        self.out_edges[from.0 as usize]
            .iter()
            .copied()
            .find(|&e| !self.edges[e.0 as usize].pruned && self.edges[e.0 as usize].to == to)
    }

    // ---- search statistics ----------------------------------------------

    /// N(h) of a vertex.
    pub fn n_visits(&self, v: VertexId) -> f64 {
        self.vertices[v.0 as usize].n_visits
    }

    /// Increment N(h).
    pub fn add_visit(&mut self, v: VertexId) {
        self.vertices[v.0 as usize].n_visits += 1.0;
    }

    /// J(h) of a vertex.
    pub fn min_cost_to_go(&self, v: VertexId) -> f64 {
        self.vertices[v.0 as usize].min_cost_to_go
    }

    /// Set J(h).
    pub fn set_min_cost_to_go(&mut self, v: VertexId, value: f64) {
        self.vertices[v.0 as usize].min_cost_to_go = value;
    }

    /// Whether the action set has been materialized.
    pub fn is_expanded(&self, v: VertexId) -> bool {
        self.vertices[v.0 as usize].expanded
    }

    /// Mark the action set materialized.
    pub fn set_expanded(&mut self, v: VertexId) {
        self.vertices[v.0 as usize].expanded = true;
    }

    /// Action targets of a vertex, in insertion order.
    pub fn actions(&self, v: VertexId) -> Vec<VertexId> {
        self.vertices[v.0 as usize].actions.clone()
    }

    /// Install an action with its heuristic cost-to-go seed.
    pub fn install_action(&mut self, v: VertexId, target: VertexId, heuristic_cost_to_go: f64) {
        let data = &mut self.vertices[v.0 as usize];
        data.actions.push(target);
        data.action_stats.insert(
            target,
            ActionStats {
                cost_to_go: heuristic_cost_to_go,
                ..Default::default()
            },
        );
    }

    /// Statistics for one action.
    pub fn action_stats(&self, v: VertexId, target: VertexId) -> Option<&ActionStats> {
        self.vertices[v.0 as usize].action_stats.get(&target)
    }

    /// Increment N(h,a).
    pub fn add_action_visit(&mut self, v: VertexId, target: VertexId) {
        if let Some(stats) = self.vertices[v.0 as usize].action_stats.get_mut(&target) {
            stats.visits += 1.0;
        }
    }

    /// Increment M(h,a).
    pub fn add_action_miss(&mut self, v: VertexId, target: VertexId) {
        if let Some(stats) = self.vertices[v.0 as usize].action_stats.get_mut(&target) {
            stats.misses += 1.0;
        }
    }

    /// Set Q(h,a).
    pub fn set_action_cost_to_go(&mut self, v: VertexId, target: VertexId, value: f64) {
        if let Some(stats) = self.vertices[v.0 as usize].action_stats.get_mut(&target) {
            stats.cost_to_go = value;
        }
    }

    /// The observation child for an action.
    pub fn obs_child(&self, v: VertexId, target: VertexId) -> Option<VertexId> {
        self.vertices[v.0 as usize]
            .action_stats
            .get(&target)
            .and_then(|s| s.obs_child)
    }

    /// Record the observation child for an action.
    pub fn set_obs_child(&mut self, v: VertexId, target: VertexId, child: VertexId) {
        if let Some(stats) = self.vertices[v.0 as usize].action_stats.get_mut(&target) {
            stats.obs_child = Some(child);
        }
    }

    // ---- pruning ---------------------------------------------------------

    /// Tombstone one vertex: drop its outgoing edge controllers, clear its
    /// edges and statistics. `protected` (the roadmap start) is never pruned.
    pub fn prune_vertex(&mut self, v: VertexId, protected: VertexId) {
        if v == protected {
            return;
        }
        let outgoing = std::mem::take(&mut self.out_edges[v.0 as usize]);
        for e in outgoing {
            let record = &mut self.edges[e.0 as usize];
            record.controller = None;
            record.pruned = true;
        }
        let data = &mut self.vertices[v.0 as usize];
        data.pruned = true;
        data.expanded = false;
        data.actions = Vec::new();
        data.action_stats = HashMap::new();
    }

    /// Recursively tombstone a subtree in post-order, following observation
    /// child pointers.
    pub fn prune_subtree(&mut self, root: VertexId, protected: VertexId) {
        if self.vertices[root.0 as usize].pruned {
            return;
        }
        let children: Vec<VertexId> = self.vertices[root.0 as usize]
            .action_stats
            .values()
            .filter_map(|s| s.obs_child)
            .collect();
        for child in children {
            self.prune_subtree(child, protected);
        }
        self.prune_vertex(root, protected);
    }
}
