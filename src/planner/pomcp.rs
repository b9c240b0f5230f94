//! Particle-based anytime search over the belief graph.
//!
//! Each call to [`PomcpPlanner::choose_action`] grows an action/observation
//! tree rooted at the current belief: particles sampled from the root belief
//! become hypothetical true states, the edge and node controllers act as the
//! transition oracle, and cost-to-go statistics accumulate on the tree
//! vertices. The tree phase selects actions by UCB over cost-to-go; the
//! expansion phase (rollout) samples actions by inverse-cost importance
//! weights seeded from closed-form heuristics.

use crate::config::MargaConfig;
use crate::control::{Controller, ExecutionOutcome};
use crate::core::types::GaussianBelief;
use crate::error::{MargaError, Result};
use crate::graph::{BeliefGraph, EdgeId, EdgeWeight, FirmIndex, VertexId, VertexKind};
use crate::models::Simulator;
use crate::planner::heuristics::{
    approx_stabilization_cost, approx_transition_cost, ucb_bonus, HeuristicParams,
};
use crate::planner::Roadmap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Std-dev inflation applied when sampling particle true states, so that a
/// handful of particles still surfaces collisions near obstacle boundaries.
const PARTICLE_SIGMA_INFLATION: f32 = 3.0;

/// The planner: belief graph, roadmap products, simulator, and the search.
#[derive(Debug)]
pub struct PomcpPlanner {
    config: MargaConfig,
    graph: BeliefGraph,
    index: FirmIndex,
    roadmap: Roadmap,
    sim: Simulator,
    rng: StdRng,
    stab_cost_memo: HashMap<VertexId, f64>,
}

impl PomcpPlanner {
    /// Create a planner over an empty graph. Roadmap content is installed
    /// through [`Self::add_firm_node`] and [`Self::add_baseline_edge`].
    pub fn new(config: MargaConfig, sim: Simulator, nn_radius: f32) -> Self {
        let seed = if config.seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(54321)
        } else {
            // decorrelate from the simulator stream
            config.seed.wrapping_add(0x9e37_79b9)
        };
        Self {
            config,
            graph: BeliefGraph::new(),
            index: FirmIndex::new(),
            roadmap: Roadmap::new(nn_radius),
            sim,
            rng: StdRng::seed_from_u64(seed),
            stab_cost_memo: HashMap::new(),
        }
    }

    // ---- accessors -------------------------------------------------------

    /// The belief graph.
    pub fn graph(&self) -> &BeliefGraph {
        &self.graph
    }

    /// Mutable belief graph access.
    pub fn graph_mut(&mut self) -> &mut BeliefGraph {
        &mut self.graph
    }

    /// The roadmap products.
    pub fn roadmap(&self) -> &Roadmap {
        &self.roadmap
    }

    /// Mutable roadmap access.
    pub fn roadmap_mut(&mut self) -> &mut Roadmap {
        &mut self.roadmap
    }

    /// The simulator.
    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Mutable simulator access.
    pub fn simulator_mut(&mut self) -> &mut Simulator {
        &mut self.sim
    }

    /// The configuration.
    pub fn config(&self) -> &MargaConfig {
        &self.config
    }

    /// Mutable configuration access (scenario tuning between plans).
    pub fn config_mut(&mut self) -> &mut MargaConfig {
        &mut self.config
    }

    // ---- roadmap assembly ------------------------------------------------

    /// Register a roadmap vertex: adds it to the graph and the NN index and
    /// builds its stabilizing node controller.
    pub fn add_firm_node(&mut self, belief: GaussianBelief) -> VertexId {
        let v = self.graph.add_vertex(belief, VertexKind::Firm);
        self.index.insert(v, belief.mean.position());
        let controller =
            Controller::node(belief, self.sim.motion(), self.sim.observation(), &self.config);
        self.roadmap.set_node_controller(v, controller);
        v
    }

    /// Add a roadmap edge with a known baseline cost. The edge carries a
    /// freshly generated trajectory-following controller.
    pub fn add_baseline_edge(&mut self, from: VertexId, to: VertexId, cost: f64) -> EdgeId {
        let controller = self.make_edge_controller(from, to);
        self.graph.add_edge(
            from,
            to,
            EdgeWeight {
                cost,
                success_probability: 1.0,
            },
            controller,
        )
    }

    fn make_edge_controller(
        &self,
        from: VertexId,
        to: VertexId,
    ) -> crate::control::EdgeController {
        let from_pose = self.graph.belief(from).mean;
        let goal = *self.graph.belief(to);
        let trajectory = self.sim.motion().generate_open_loop(&from_pose, &goal.mean);
        Controller::edge(
            goal,
            trajectory,
            self.sim.motion(),
            self.sim.observation(),
            &self.config,
        )
    }

    // ---- approximate costs ----------------------------------------------

    fn heuristic_params(&self) -> HeuristicParams {
        HeuristicParams::from_config(&self.config)
    }

    /// Approximate cost of the edge from `a` to `b`: transition until within
    /// reach, plus stabilization of the covariance.
    pub fn approx_edge_cost(&self, a: VertexId, b: VertexId) -> f64 {
        let params = self.heuristic_params();
        let ba = self.graph.belief(a);
        let bb = self.graph.belief(b);
        approx_transition_cost(ba, bb, &params) + approx_stabilization_cost(ba, bb, &params)
    }

    /// Baseline cost-to-go of a roadmap vertex corrected for approximate
    /// stabilization along the feedback chain. Memoized; infinite (and
    /// cached as such) for vertices with no usable feedback.
    pub fn cost_to_go_with_approx_stab(&mut self, v: VertexId) -> f64 {
        if let Some(&cached) = self.stab_cost_memo.get(&v) {
            return cached;
        }
        let value = self.compute_cost_to_go_with_approx_stab(v);
        self.stab_cost_memo.insert(v, value);
        value
    }

    fn compute_cost_to_go_with_approx_stab(&mut self, current: VertexId) -> f64 {
        let goal = match self.roadmap.goal() {
            Some(g) => g,
            None => return f64::INFINITY,
        };
        let baseline = self.roadmap.baseline_cost_to_go(current);
        if current == goal {
            return baseline;
        }
        if baseline.is_infinite() {
            return f64::INFINITY;
        }
        let edge = match self.roadmap.feedback_edge(current) {
            Some(e) => e,
            None => return f64::INFINITY,
        };
        let next = self.graph.edge_target(edge);
        if next == goal {
            return baseline;
        }

        let next_cost = self.cost_to_go_with_approx_stab(next);
        let params = self.heuristic_params();
        let stab = approx_stabilization_cost(
            self.graph.belief(current),
            self.graph.belief(next),
            &params,
        );
        baseline + (next_cost - self.roadmap.baseline_cost_to_go(next))
            + self.config.pomcp.inflation_for_approx_stab_cost * stab
    }

    // ---- action expansion ------------------------------------------------

    /// Materialize the action set of a vertex: roadmap neighbors within the
    /// connection radius with a motion-feasible straight-line connection.
    /// Each action gets an edge controller and a heuristic cost-to-go seed.
    /// Fails when no neighbor other than the vertex itself exists.
    pub fn expand_actions(&mut self, v: VertexId) -> bool {
        let belief_v = *self.graph.belief(v);
        let neighbors = self
            .index
            .within_radius(belief_v.mean.position(), self.roadmap.nn_radius);

        let motion_cfg = self.sim.motion().config();
        let check_step = motion_cfg.max_linear_vel * motion_cfg.dt;

        let mut installed = 0usize;
        for n in neighbors {
            if n == v {
                continue;
            }
            let belief_n = *self.graph.belief(n);
            if !self
                .sim
                .scene()
                .is_motion_valid(&belief_v.mean, &belief_n.mean, check_step)
            {
                continue;
            }

            let approx_cost = self.approx_edge_cost(v, n);
            if self.graph.edge_between(v, n).is_none() {
                let controller = self.make_edge_controller(v, n);
                self.graph.add_edge(
                    v,
                    n,
                    EdgeWeight {
                        cost: approx_cost,
                        success_probability: 1.0,
                    },
                    controller,
                );
            }
            let seed = approx_cost + self.cost_to_go_with_approx_stab(n);
            self.graph.install_action(v, n, seed);
            installed += 1;
        }

        if installed == 0 {
            log::warn!("no neighbor other than itself found for vertex {:?}", v);
            return false;
        }
        self.graph.set_expanded(v);
        true
    }

    // ---- action selection ------------------------------------------------

    /// Tree-phase selection: argmin over `Q(v,q) - bonus`, ties uniform.
    pub fn select_ucb_action(&mut self, v: VertexId) -> Option<VertexId> {
        let actions = self.graph.actions(v);
        if actions.is_empty() {
            return None;
        }
        let n_visits = self.graph.n_visits(v);
        let c = self.config.pomcp.c_explore_sim;

        let mut best = f64::INFINITY;
        let mut ties: Vec<VertexId> = Vec::new();
        for q in actions {
            let stats = self.graph.action_stats(v, q)?;
            let score = stats.cost_to_go - ucb_bonus(c, n_visits, stats.visits);
            if score < best {
                best = score;
                ties.clear();
                ties.push(q);
            } else if score == best {
                ties.push(q);
            }
        }
        if ties.is_empty() {
            return None;
        }
        let pick = ties[self.rng.gen_range(0..ties.len())];
        Some(pick)
    }

    /// Rollout-phase selection: importance sampling with weights
    /// `1 / (Q^c + regulator)`. The exponent/regulator pair depends on
    /// whether any neighbor is within the scaled reach tolerance, which
    /// switches the policy between exploitative and explorative modes.
    pub fn select_rollout_action(&mut self, v: VertexId) -> Option<VertexId> {
        let actions = self.graph.actions(v);
        if actions.is_empty() {
            return None;
        }

        let belief_v = *self.graph.belief(v);
        let reach = self.config.reach;
        let n_eps = self.config.pomcp.n_eps_for_is_reached;
        let within_reach = actions
            .iter()
            .any(|&q| belief_v.is_reached_within_n_eps(self.graph.belief(q), &reach, n_eps));

        let (exponent, regulator) = if within_reach {
            (
                self.config.pomcp.c_exploit_rollout_within_reach,
                self.config.pomcp.cost_to_go_regulator_within_reach,
            )
        } else {
            (
                self.config.pomcp.c_exploit_rollout_out_of_reach,
                self.config.pomcp.cost_to_go_regulator_out_of_reach,
            )
        };

        let weights: Vec<f64> = actions
            .iter()
            .map(|&q| {
                let cost = self
                    .graph
                    .action_stats(v, q)
                    .map(|s| s.cost_to_go)
                    .unwrap_or(f64::INFINITY);
                let w = 1.0 / (cost.powf(exponent) + regulator);
                if w.is_finite() && w > 0.0 {
                    w
                } else {
                    0.0
                }
            })
            .collect();

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Some(actions[self.rng.gen_range(0..actions.len())]);
        }
        let mut threshold = self.rng.gen::<f64>() * total;
        for (q, w) in actions.iter().zip(weights.iter()) {
            threshold -= w;
            if threshold <= 0.0 {
                return Some(*q);
            }
        }
        actions.last().copied()
    }

    // ---- transition oracle ----------------------------------------------

    /// One simulated controller invocation along `edge`: the edge controller
    /// unless the belief is already at the target node, in which case the
    /// node controller stabilizes (with an inflated step budget to keep the
    /// tree shallow through stabilization).
    ///
    /// Returns the resulting belief, the weighted execution cost, and a
    /// success flag covering controller status and true-state validity.
    pub fn execute_simulation_from_upto(
        &mut self,
        k_step: usize,
        num_steps: usize,
        start: GaussianBelief,
        edge: EdgeId,
    ) -> (GaussianBelief, f64, bool) {
        let scale_stab = self.config.pomcp.scale_stab_num_steps as usize;
        match self.run_controller(k_step, num_steps, scale_stab, &start, edge, true) {
            Ok(outcome) => {
                let cost = self.weighted_execution_cost(&outcome);
                let ok = outcome.is_ok() && self.sim.check_true_state_validity();
                (outcome.belief, cost, ok)
            }
            Err(e) => {
                log::warn!("simulated controller invocation failed: {}", e);
                (start, 0.0, false)
            }
        }
    }

    /// One real controller invocation along `edge` (execution mode, no
    /// stabilization inflation). Used by the executive.
    pub fn execute_policy_step(
        &mut self,
        k_step: usize,
        edge: EdgeId,
        start: &GaussianBelief,
    ) -> Result<ExecutionOutcome> {
        let num_steps = self.config.pomcp.rollout_steps as usize;
        self.run_controller(k_step, num_steps, 1, start, edge, false)
    }

    fn run_controller(
        &mut self,
        k_step: usize,
        num_steps: usize,
        stab_scale: usize,
        start: &GaussianBelief,
        edge: EdgeId,
        construction_mode: bool,
    ) -> Result<ExecutionOutcome> {
        let target = self.graph.edge_target(edge);

        let edge_terminated = match self.graph.controller(edge) {
            Some(ctrl) => ctrl.is_terminated(start, 0),
            None => {
                return Err(MargaError::Planner(format!(
                    "controller of edge {:?} is gone",
                    edge
                )))
            }
        };

        if !edge_terminated {
            match self.graph.controller(edge) {
                Some(ctrl) => {
                    ctrl.execute_from_upto(&mut self.sim, k_step, num_steps, start, construction_mode)
                }
                None => Err(MargaError::Planner(format!(
                    "controller of edge {:?} is gone",
                    edge
                ))),
            }
        } else {
            match self.roadmap.node_controller_mut(target) {
                Some(ctrl) => ctrl.stabilize_upto(
                    &mut self.sim,
                    stab_scale * num_steps,
                    start,
                    construction_mode,
                ),
                None => Err(MargaError::Roadmap(format!(
                    "no node controller for vertex {:?}",
                    target
                ))),
            }
        }
    }

    /// Weighted cost of one execution: bias-corrected covariance cost plus
    /// time cost.
    fn weighted_execution_cost(&self, outcome: &ExecutionOutcome) -> f64 {
        let cov_cost = outcome.filtering_cost - self.config.cost.edge_cost_bias;
        self.config.cost.information_cost_weight * cov_cost
            + self.config.cost.time_cost_weight * outcome.steps_taken as f64
    }

    // ---- the search ------------------------------------------------------

    /// Run the particle loop from the root and return the min-Q action edge.
    ///
    /// The simulator's true state is snapshotted before the particles run
    /// and restored before any return.
    pub fn choose_action(&mut self, root: VertexId) -> Result<EdgeId> {
        let snapshot = self.sim.snapshot();
        let num_particles = self.config.pomcp.num_particles;

        for _ in 0..num_particles {
            let belief = *self.graph.belief(root);
            match belief.sample_pose(&mut self.rng, PARTICLE_SIGMA_INFLATION) {
                Some(state) => self.sim.set_true_state(state),
                None => {
                    log::warn!("could not sample a true state from the root belief");
                    continue;
                }
            }
            let cost_to_go = self.simulate(root, 0, None);
            log::debug!("particle descent cost-to-go: {:.3}", cost_to_go);
        }

        self.sim.restore(snapshot);

        let actions = self.graph.actions(root);
        if actions.is_empty() {
            return Err(MargaError::Planner(
                "no actions available at the search root".to_string(),
            ));
        }
        let mut best = f64::INFINITY;
        let mut ties: Vec<VertexId> = Vec::new();
        for q in actions {
            let cost = self
                .graph
                .action_stats(root, q)
                .map(|s| s.cost_to_go)
                .unwrap_or(f64::INFINITY);
            if cost < best {
                best = cost;
                ties.clear();
                ties.push(q);
            } else if cost == best {
                ties.push(q);
            }
        }
        if ties.is_empty() {
            return Err(MargaError::Planner(
                "no evaluable action at the search root".to_string(),
            ));
        }
        let selected = ties[self.rng.gen_range(0..ties.len())];
        log::debug!("selected action toward {:?} with Q = {:.3}", selected, best);

        self.graph
            .edge_between(root, selected)
            .ok_or_else(|| MargaError::Planner("selected action has no live edge".to_string()))
    }

    /// Tree phase of the search.
    ///
    /// Unexpanded vertices hand off to [`Self::rollout`]. At the horizon the
    /// previously selected edge is committed to, so stabilization toward the
    /// last target amortizes across the remaining depth instead of being
    /// re-decided every level.
    pub fn simulate(&mut self, v: VertexId, depth: u32, last_edge: Option<EdgeId>) -> f64 {
        if !self.graph.is_expanded(v) {
            return self.rollout(v, depth, last_edge, true);
        }

        let max_depth = self.config.pomcp.max_depth;
        let max_reach_depth = self.config.pomcp.max_reach_depth;
        let j_obs = self.config.pomcp.obstacle_cost_to_go;

        let selected_q: VertexId;
        if depth >= max_depth {
            let target = match last_edge {
                Some(e) => self.graph.edge_target(e),
                None => return self.backup_terminal(v, j_obs),
            };
            if depth >= max_reach_depth {
                log::warn!(
                    "target node not reached within {} levels, abandoning branch",
                    max_reach_depth
                );
                return self.backup_terminal(v, j_obs);
            }
            if self.belief_reached_vertex(v, target) {
                let cost = self.approx_edge_cost(v, target)
                    + self.cost_to_go_with_approx_stab(target);
                return self.backup_terminal(v, cost);
            }
            if !self.graph.actions(v).contains(&target) {
                log::warn!(
                    "committed action toward {:?} is not available at {:?}",
                    target,
                    v
                );
                return self.backup_terminal(v, j_obs);
            }
            selected_q = target;
        } else {
            selected_q = match self.select_ucb_action(v) {
                Some(q) => q,
                None => return self.backup_terminal(v, j_obs),
            };
        }

        let (child, edge, c_step, ok) = match self.take_action(v, selected_q, depth) {
            Some(step) => step,
            None => return self.backup_terminal(v, j_obs),
        };
        let j_child = if ok {
            self.simulate(child, depth + 1, Some(edge))
        } else {
            0.0
        };
        self.backup(v, selected_q, c_step, j_child, ok, false)
    }

    /// Expansion phase of the search: the default policy below the tree
    /// frontier. Terminal handling matches [`Self::simulate`]; action
    /// selection is importance sampling over the heuristic cost-to-go.
    pub fn rollout(
        &mut self,
        v: VertexId,
        depth: u32,
        last_edge: Option<EdgeId>,
        newly_expanded: bool,
    ) -> f64 {
        let max_depth = self.config.pomcp.max_depth;
        let max_reach_depth = self.config.pomcp.max_reach_depth;
        let j_obs = self.config.pomcp.obstacle_cost_to_go;

        let selected_q: VertexId;
        if depth >= max_depth {
            let target = match last_edge {
                Some(e) => self.graph.edge_target(e),
                None => return self.backup_terminal(v, j_obs),
            };
            if depth >= max_reach_depth {
                log::warn!(
                    "target node not reached within {} levels, abandoning branch",
                    max_reach_depth
                );
                return self.backup_terminal(v, j_obs);
            }
            if !self.graph.is_expanded(v) && !self.expand_actions(v) {
                return self.backup_terminal(v, j_obs);
            }
            if self.belief_reached_vertex(v, target) {
                let cost = self.approx_edge_cost(v, target)
                    + self.cost_to_go_with_approx_stab(target);
                return self.backup_terminal(v, cost);
            }
            if !self.graph.actions(v).contains(&target) {
                log::warn!(
                    "committed action toward {:?} is not available at {:?}",
                    target,
                    v
                );
                return self.backup_terminal(v, j_obs);
            }
            selected_q = target;
        } else {
            if !self.graph.is_expanded(v) && !self.expand_actions(v) {
                return self.backup_terminal(v, j_obs);
            }
            selected_q = match self.select_rollout_action(v) {
                Some(q) => q,
                None => return self.backup_terminal(v, j_obs),
            };
        }

        let (child, edge, c_step, ok) = match self.take_action(v, selected_q, depth) {
            Some(step) => step,
            None => return self.backup_terminal(v, j_obs),
        };
        let j_child = if ok {
            self.rollout(child, depth + 1, Some(edge), false)
        } else {
            0.0
        };
        self.backup(v, selected_q, c_step, j_child, ok, newly_expanded)
    }

    /// Simulate one controller invocation for the chosen action and resolve
    /// the observation child. `None` when the action has no live edge.
    fn take_action(
        &mut self,
        v: VertexId,
        q: VertexId,
        depth: u32,
    ) -> Option<(VertexId, EdgeId, f64, bool)> {
        let max_depth = self.config.pomcp.max_depth;
        let rollout_steps = self.config.pomcp.rollout_steps as usize;
        let j_obs = self.config.pomcp.obstacle_cost_to_go;

        let edge = self.graph.edge_between(v, q)?;
        // the committing edge controller is entered once at the horizon, so
        // its resume index starts advancing there
        let k_step = (depth as i64 - max_depth as i64 + 1).max(0) as usize;
        let start = *self.graph.belief(v);
        let (next_belief, mut c_step, ok) =
            self.execute_simulation_from_upto(k_step, rollout_steps, start, edge);
        if !ok {
            c_step = j_obs;
        }

        let child = match self.graph.obs_child(v, q) {
            Some(existing) => {
                // observation branches for one action merge into a single
                // child whose belief tracks the latest sample
                self.graph.set_belief(existing, next_belief);
                existing
            }
            None => {
                let created = self.graph.add_vertex(next_belief, VertexKind::Pomcp);
                self.graph.set_obs_child(v, q, created);
                created
            }
        };
        Some((child, edge, c_step, ok))
    }

    /// Whether the belief at `v` satisfies the reach test of `target`.
    fn belief_reached_vertex(&self, v: VertexId, target: VertexId) -> bool {
        self.graph
            .belief(v)
            .is_reached(self.graph.belief(target), &self.config.reach)
    }

    /// Terminal backup: count the visit and pin J(h) to the terminal cost.
    fn backup_terminal(&mut self, v: VertexId, cost: f64) -> f64 {
        self.graph.add_visit(v);
        self.graph.set_min_cost_to_go(v, cost);
        cost
    }

    /// The backup rule shared by the tree and rollout phases.
    ///
    /// `Q_k = c_step + (J_child | J_obs)`, folded into the running mean
    /// `Q += (Q_k - Q) / N(h,q)`. On the branch that just expanded this
    /// vertex the heuristic seed is reset to zero first so it does not bias
    /// the mean. `J(h)` then becomes `min_q Q(h,q)`.
    fn backup(
        &mut self,
        v: VertexId,
        q: VertexId,
        c_step: f64,
        j_child: f64,
        ok: bool,
        newly_expanded: bool,
    ) -> f64 {
        let j_obs = self.config.pomcp.obstacle_cost_to_go;

        self.graph.add_visit(v);
        self.graph.add_action_visit(v, q);
        if !ok {
            self.graph.add_action_miss(v, q);
        }

        let (visits, mut q_old) = match self.graph.action_stats(v, q) {
            Some(stats) => (stats.visits, stats.cost_to_go),
            None => return self.graph.min_cost_to_go(v),
        };
        if newly_expanded {
            q_old = 0.0;
        }
        let q_sample = c_step + if ok { j_child } else { j_obs };
        let q_new = q_old + (q_sample - q_old) / visits;
        self.graph.set_action_cost_to_go(v, q, q_new);

        let j_old = self.graph.min_cost_to_go(v);
        let j_new = if q_new < j_old {
            q_new
        } else {
            // the previous minimum may have been this very action before the
            // update, so recompute the min over all actions
            let mut min = q_new;
            for a in self.graph.actions(v) {
                if let Some(stats) = self.graph.action_stats(v, a) {
                    if stats.cost_to_go < min {
                        min = stats.cost_to_go;
                    }
                }
            }
            min
        };
        self.graph.set_min_cost_to_go(v, j_new);
        j_new
    }

    // ---- tree reuse ------------------------------------------------------

    /// After the executive physically commits to action `q` and observes
    /// `new_belief`: promote the matching observation child to the new root
    /// (allocating one if the action was never simulated), prune every
    /// sibling subtree and the old root, and return the new root.
    pub fn advance_root(
        &mut self,
        old_root: VertexId,
        q: VertexId,
        new_belief: GaussianBelief,
    ) -> VertexId {
        let new_root = match self.graph.obs_child(old_root, q) {
            Some(child) => {
                self.graph.set_belief(child, new_belief);
                child
            }
            None => {
                log::info!("allocating a fresh root after execution");
                let created = self.graph.add_vertex(new_belief, VertexKind::Pomcp);
                self.graph.set_obs_child(old_root, q, created);
                created
            }
        };

        let protected = self.roadmap.start().unwrap_or(new_root);
        for action in self.graph.actions(old_root) {
            if let Some(child) = self.graph.obs_child(old_root, action) {
                if child != new_root {
                    self.graph.prune_subtree(child, protected);
                }
            }
        }
        if old_root != new_root {
            self.graph.prune_vertex(old_root, protected);
        }
        new_root
    }
}
