//! Edge and node controllers.
//!
//! A controller fuses a separated regulator with a belief filter: the
//! regulator generates commands from the estimated state, the simulator
//! advances the hidden true state and produces an observation, and the
//! filter folds the observation back into the belief. Driving that loop
//! along a nominal trajectory gives the edge controller; pinning it at a
//! single nominal state gives the node-stabilizing controller.

use crate::config::MargaConfig;
use crate::core::types::{GaussianBelief, ReachTolerances, Velocity2D};
use crate::error::Result;
use crate::estimation::{BeliefFilter, Ekf, LinearSystem, SeparatedController, TrackingLqr};
use crate::models::{BeaconObservationModel, NominalTrajectory, OmniMotionModel, Simulator};

/// Why a controller execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    /// Ran to its termination condition or step budget.
    Completed,
    /// True state became invalid during a construction-mode execution.
    Collided,
    /// Belief mean drifted beyond the nominal-trajectory deviation bound.
    Deviated,
    /// Execution-time cap reached without termination.
    TimedOut,
    /// Node stabilization exceeded its maximum attempts.
    TriesExceeded,
}

/// Result of a controller execution.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Belief after the last executed step.
    pub belief: GaussianBelief,
    /// Accumulated `trace(Σ_k)` over executed steps, plus the small
    /// positive bias.
    pub filtering_cost: f64,
    /// Number of steps executed.
    pub steps_taken: usize,
    /// Trajectory index after the last executed step.
    pub time_to_stop: usize,
    /// Termination condition.
    pub status: ControlStatus,
}

impl ExecutionOutcome {
    /// Whether the execution succeeded.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == ControlStatus::Completed
    }
}

/// Estimator + regulator pair driving the belief along a nominal trajectory.
#[derive(Debug, Clone)]
pub struct Controller<S: SeparatedController, F: BeliefFilter> {
    lss: Vec<LinearSystem>,
    regulator: S,
    filter: F,
    goal: GaussianBelief,
    tries: u32,
    reach: ReachTolerances,
    node_reached_distance: f32,
    max_trajectory_deviation: f32,
    max_tries: u32,
    cost_bias: f64,
    max_exec_time: usize,
}

/// Trajectory-following controller between two roadmap nodes.
pub type EdgeController = Controller<TrackingLqr, Ekf>;

/// Stabilizing controller pinned at a roadmap node.
pub type NodeController = Controller<TrackingLqr, Ekf>;

impl Controller<TrackingLqr, Ekf> {
    /// Build an edge controller over a nominal open-loop trajectory.
    pub fn edge(
        goal: GaussianBelief,
        trajectory: NominalTrajectory,
        motion: &OmniMotionModel,
        observation: &BeaconObservationModel,
        config: &MargaConfig,
    ) -> Self {
        Self::from_nominal(goal, trajectory.states, trajectory.controls, motion, observation, config)
    }

    /// Build a node controller: a single-step nominal trajectory pinned at
    /// the node with zero nominal control.
    pub fn node(
        goal: GaussianBelief,
        motion: &OmniMotionModel,
        observation: &BeaconObservationModel,
        config: &MargaConfig,
    ) -> Self {
        Self::from_nominal(
            goal,
            vec![goal.mean],
            vec![motion.zero_control()],
            motion,
            observation,
            config,
        )
    }

    fn from_nominal(
        goal: GaussianBelief,
        states: Vec<crate::core::types::Pose2D>,
        controls: Vec<Velocity2D>,
        motion: &OmniMotionModel,
        observation: &BeaconObservationModel,
        config: &MargaConfig,
    ) -> Self {
        let lss: Vec<LinearSystem> = states
            .iter()
            .zip(controls.iter())
            .map(|(x, u)| LinearSystem::new(*x, *u, motion, observation))
            .collect();
        let regulator = TrackingLqr::new(
            states,
            controls,
            config.controller.kp_pos,
            config.controller.kp_ori,
            motion.config().max_linear_vel,
            motion.config().max_angular_vel,
        );
        let filter = Ekf::new(motion.clone(), config.filter.psd_floor);
        // scaled by 3 to allow extra steps for the robot to finish the edge
        let max_exec_time = lss.len() * 3;
        // the controller's alignment threshold overrides the planner-wide one
        let reach = ReachTolerances {
            ori: config.controller.node_reached_angle,
            ..config.reach
        };
        Self {
            lss,
            regulator,
            filter,
            goal,
            tries: 0,
            reach,
            node_reached_distance: config.controller.node_reached_distance,
            max_trajectory_deviation: config.controller.max_trajectory_deviation,
            max_tries: config.controller.max_tries,
            cost_bias: config.cost.edge_cost_bias,
            max_exec_time,
        }
    }
}

impl<S: SeparatedController, F: BeliefFilter> Controller<S, F> {
    /// Number of linear systems along the nominal trajectory.
    pub fn length(&self) -> usize {
        self.lss.len()
    }

    /// The controller's goal belief.
    pub fn goal(&self) -> &GaussianBelief {
        &self.goal
    }

    /// Termination test: planar distance from the belief mean to the goal
    /// is within the node-reached distance.
    pub fn is_terminated(&self, belief: &GaussianBelief, _t: usize) -> bool {
        belief.mean.planar_distance(&self.goal.mean) <= self.node_reached_distance
    }

    /// One step of the estimator+regulator loop: generate a command, apply
    /// it to the world, observe, and filter.
    pub fn evolve(
        &self,
        sim: &mut Simulator,
        belief: &GaussianBelief,
        t: usize,
    ) -> Result<GaussianBelief> {
        let u = self.regulator.generate_feedback_control(belief, t);
        sim.apply_control(&u);
        let z = sim.get_observation();

        let last = self.lss.len() - 1;
        let (current, next) = if t < last {
            (&self.lss[t], &self.lss[t + 1])
        } else {
            (&self.lss[last], &self.lss[last])
        };
        self.filter.evolve(belief, &u, &z, current, next)
    }

    /// Evolve once and run the per-step safety checks. Returns the new
    /// belief, its covariance trace, and a failure status if a check fired.
    fn checked_step(
        &self,
        sim: &mut Simulator,
        belief: &GaussianBelief,
        k: usize,
        construction_mode: bool,
    ) -> Result<(GaussianBelief, f64, Option<ControlStatus>)> {
        let next = self.evolve(sim, belief, k)?;
        let trace = next.covariance.trace() as f64;

        if construction_mode && !sim.check_true_state_validity() {
            return Ok((next, trace, Some(ControlStatus::Collided)));
        }

        let nominal = self.lss[k.min(self.lss.len() - 1)].x();
        if next.mean.planar_distance(nominal) > self.max_trajectory_deviation {
            return Ok((next, trace, Some(ControlStatus::Deviated)));
        }

        Ok((next, trace, None))
    }

    /// Execute until the termination condition, a failed safety check, or
    /// the execution-time cap.
    pub fn execute(
        &self,
        sim: &mut Simulator,
        start: &GaussianBelief,
        construction_mode: bool,
    ) -> Result<ExecutionOutcome> {
        let mut belief = *start;
        let mut cost = self.cost_bias;
        let mut k = 0usize;

        while !self.is_terminated(&belief, k) {
            if k >= self.max_exec_time {
                return Ok(ExecutionOutcome {
                    belief,
                    filtering_cost: cost,
                    steps_taken: k,
                    time_to_stop: k,
                    status: ControlStatus::TimedOut,
                });
            }
            let (next, trace, failure) = self.checked_step(sim, &belief, k, construction_mode)?;
            belief = next;
            cost += trace;
            k += 1;
            if let Some(status) = failure {
                return Ok(ExecutionOutcome {
                    belief,
                    filtering_cost: cost,
                    steps_taken: k,
                    time_to_stop: k,
                    status,
                });
            }
        }

        Ok(ExecutionOutcome {
            belief,
            filtering_cost: cost,
            steps_taken: k,
            time_to_stop: k,
            status: ControlStatus::Completed,
        })
    }

    /// Execute exactly one step at trajectory index `k`.
    pub fn execute_one_step(
        &self,
        sim: &mut Simulator,
        k: usize,
        start: &GaussianBelief,
        construction_mode: bool,
    ) -> Result<ExecutionOutcome> {
        self.execute_from_upto(sim, k, 1, start, construction_mode)
    }

    /// Execute up to `num_steps` steps from the start of the trajectory.
    pub fn execute_upto(
        &self,
        sim: &mut Simulator,
        num_steps: usize,
        start: &GaussianBelief,
        construction_mode: bool,
    ) -> Result<ExecutionOutcome> {
        self.execute_from_upto(sim, 0, num_steps, start, construction_mode)
    }

    /// Execute up to `num_steps` steps resuming at trajectory index
    /// `k_start`. The caller advances `k_start` when it re-selects the same
    /// edge across iterations and resets it on a different edge.
    pub fn execute_from_upto(
        &self,
        sim: &mut Simulator,
        k_start: usize,
        num_steps: usize,
        start: &GaussianBelief,
        construction_mode: bool,
    ) -> Result<ExecutionOutcome> {
        let mut belief = *start;
        let mut cost = self.cost_bias;
        let mut k = k_start;
        let mut steps = 0usize;

        while steps < num_steps {
            let (next, trace, failure) = self.checked_step(sim, &belief, k, construction_mode)?;
            belief = next;
            cost += trace;
            k += 1;
            steps += 1;
            if let Some(status) = failure {
                return Ok(ExecutionOutcome {
                    belief,
                    filtering_cost: cost,
                    steps_taken: steps,
                    time_to_stop: k,
                    status,
                });
            }
        }

        Ok(ExecutionOutcome {
            belief,
            filtering_cost: cost,
            steps_taken: steps,
            time_to_stop: k,
            status: ControlStatus::Completed,
        })
    }

    /// Stabilize at the node for up to `num_steps` steps, or until the goal
    /// belief is reached, while the cumulative attempt counter stays within
    /// bounds. The counter persists across calls and resets when the node is
    /// reached or the bound is exceeded.
    pub fn stabilize_upto(
        &mut self,
        sim: &mut Simulator,
        num_steps: usize,
        start: &GaussianBelief,
        construction_mode: bool,
    ) -> Result<ExecutionOutcome> {
        let k = self.lss.len() - 1;
        let mut belief = *start;
        let mut cost = self.cost_bias;
        let mut steps = 0usize;

        loop {
            if belief.is_reached(&self.goal, &self.reach) {
                self.tries = 0;
                break;
            }
            if self.tries >= self.max_tries {
                self.tries = 0;
                log::warn!("node stabilization exceeded {} attempts", self.max_tries);
                return Ok(ExecutionOutcome {
                    belief,
                    filtering_cost: cost,
                    steps_taken: steps,
                    time_to_stop: k,
                    status: ControlStatus::TriesExceeded,
                });
            }
            if steps >= num_steps {
                break;
            }

            let next = self.evolve(sim, &belief, k)?;
            cost += next.covariance.trace() as f64;
            belief = next;
            steps += 1;
            self.tries += 1;

            if construction_mode && !sim.check_true_state_validity() {
                return Ok(ExecutionOutcome {
                    belief,
                    filtering_cost: cost,
                    steps_taken: steps,
                    time_to_stop: k,
                    status: ControlStatus::Collided,
                });
            }
        }

        Ok(ExecutionOutcome {
            belief,
            filtering_cost: cost,
            steps_taken: steps,
            time_to_stop: k,
            status: ControlStatus::Completed,
        })
    }
}
