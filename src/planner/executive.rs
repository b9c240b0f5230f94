//! The outer plan-execute loop.
//!
//! Each iteration asks the planner for one edge, executes it on the real
//! system for a bounded number of steps, folds the resulting belief back
//! into the search tree (promoting the matching child to the new root and
//! pruning the rest), and stops when the goal belief is reached or the
//! robot collides.

use crate::error::{MargaError, Result};
use crate::graph::{EdgeId, VertexId};
use crate::metrics::Metrics;
use crate::planner::PomcpPlanner;

/// How a mission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionOutcome {
    /// The goal belief was reached.
    ReachedGoal,
    /// The true state became invalid during real execution.
    Collided,
    /// The iteration budget ran out before the goal was reached.
    HorizonExhausted,
}

/// Drives the planner against the (simulated) real system.
#[derive(Debug)]
pub struct Executive {
    planner: PomcpPlanner,
    metrics: Metrics,
}

impl Executive {
    /// Wrap a fully assembled planner. The roadmap must have its start and
    /// goal set.
    pub fn new(planner: PomcpPlanner) -> Result<Self> {
        if planner.roadmap().start().is_none() || planner.roadmap().goal().is_none() {
            return Err(MargaError::Roadmap(
                "roadmap start and goal must be set before execution".to_string(),
            ));
        }
        Ok(Self {
            planner,
            metrics: Metrics::new(),
        })
    }

    /// The wrapped planner.
    pub fn planner(&self) -> &PomcpPlanner {
        &self.planner
    }

    /// Mutable planner access.
    pub fn planner_mut(&mut self) -> &mut PomcpPlanner {
        &mut self.planner
    }

    /// Recorded histories.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run the mission to completion.
    pub fn run(&mut self) -> Result<MissionOutcome> {
        let start = self
            .planner
            .roadmap()
            .start()
            .ok_or_else(|| MargaError::Roadmap("missing start".to_string()))?;
        let goal = self
            .planner
            .roadmap()
            .goal()
            .ok_or_else(|| MargaError::Roadmap("missing goal".to_string()))?;

        let reach = self.planner.config().reach;
        let w_info = self.planner.config().cost.information_cost_weight;
        let w_time = self.planner.config().cost.time_cost_weight;
        let bias = self.planner.config().cost.edge_cost_bias;
        let max_iterations = self.planner.config().executive.max_iterations;

        let goal_belief = *self.planner.graph().belief(goal);
        let mut current_root: VertexId = start;
        let mut current_belief = *self.planner.graph().belief(start);
        self.planner
            .simulator_mut()
            .set_true_state(current_belief.mean);

        let mut prev_target: Option<VertexId> = None;
        let mut k_step = 0usize;
        let mut time_step: u64 = 0;
        let mut cov_cost: f64 = 0.0;
        let mut nodes_reached: u32 = 0;
        self.metrics.record_nodes_reached(time_step, nodes_reached);

        let mut iterations = 0usize;
        while !current_belief.is_reached_relaxed(&goal_belief, &reach) {
            iterations += 1;
            if iterations > max_iterations {
                log::error!(
                    "goal not reached within {} plan-execute iterations",
                    max_iterations
                );
                self.finish();
                return Ok(MissionOutcome::HorizonExhausted);
            }

            // plan (simulation may thrash the hidden state; it restores it)
            self.planner.simulator_mut().set_velocity_logging(false);
            let edge: EdgeId = self.planner.choose_action(current_root)?;
            let target = self.planner.graph().edge_target(edge);

            // re-selecting the same edge continues its trajectory instead of
            // restarting it
            if prev_target == Some(target) {
                k_step += 1;
            } else {
                k_step = 0;
            }
            prev_target = Some(target);

            log::info!(
                "executing toward node {:?} (step offset {}), belief at ({:.2}, {:.2})",
                target,
                k_step,
                current_belief.mean.x,
                current_belief.mean.y
            );

            // execute for real
            self.planner.simulator_mut().set_velocity_logging(true);
            let outcome = self.planner.execute_policy_step(k_step, edge, &current_belief)?;

            time_step += outcome.steps_taken as u64;
            cov_cost += outcome.filtering_cost - bias;
            let total_cost = w_info * cov_cost + w_time * time_step as f64;
            self.metrics.record_cost(time_step, cov_cost, total_cost);

            if !outcome.is_ok() || !self.planner.simulator().check_true_state_validity() {
                log::error!("robot collided during execution");
                self.finish();
                return Ok(MissionOutcome::Collided);
            }

            if outcome
                .belief
                .is_reached(self.planner.graph().belief(target), &reach)
            {
                nodes_reached += 1;
                self.metrics.record_nodes_reached(time_step, nodes_reached);
                log::info!("reached roadmap node {:?}", target);
            }

            current_belief = outcome.belief;
            current_root = self.planner.advance_root(current_root, target, current_belief);
        }

        log::info!(
            "goal reached after {} time steps, total cost {:.3}",
            time_step,
            w_info * cov_cost + w_time * time_step as f64
        );
        self.finish();
        Ok(MissionOutcome::ReachedGoal)
    }

    /// Drain simulator-side logs into the metrics.
    fn finish(&mut self) {
        let velocities = self.planner.simulator_mut().take_velocity_log();
        self.metrics.record_velocities(&velocities);
    }
}
