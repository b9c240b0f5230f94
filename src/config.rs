//! Configuration loading for Marga

use crate::core::types::ReachTolerances;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MargaConfig {
    pub pomcp: PomcpConfig,
    pub controller: ControllerConfig,
    pub cost: CostConfig,
    pub reach: ReachTolerances,
    pub motion: MotionConfig,
    pub observation: ObservationConfig,
    pub filter: FilterConfig,
    pub executive: ExecutiveConfig,
    /// Random seed for deterministic behavior (0 for time-based).
    pub seed: u64,
    /// Global scale on simulated motion/observation noise (0 disables noise).
    pub noise_scale: f32,
}

impl Default for MargaConfig {
    fn default() -> Self {
        Self {
            pomcp: PomcpConfig::default(),
            controller: ControllerConfig::default(),
            cost: CostConfig::default(),
            reach: ReachTolerances::default(),
            motion: MotionConfig::default(),
            observation: ObservationConfig::default(),
            filter: FilterConfig::default(),
            executive: ExecutiveConfig::default(),
            seed: 0,
            noise_scale: 1.0,
        }
    }
}

/// Search parameters for the particle-based planner.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PomcpConfig {
    /// Particles simulated per action choice.
    #[serde(default = "default_num_particles")]
    pub num_particles: usize,

    /// Tree-search horizon; beyond it the search commits to the last edge.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Hard depth cap; a branch that has not reached its target node by this
    /// depth is abandoned with the obstacle penalty. Must exceed `max_depth`.
    #[serde(default = "default_max_reach_depth")]
    pub max_reach_depth: u32,

    /// UCB exploration coefficient for tree-phase action selection.
    #[serde(default = "default_c_explore_sim")]
    pub c_explore_sim: f64,

    /// Rollout exploitation exponent when no neighbor is within reach.
    #[serde(default = "default_c_exploit_out")]
    pub c_exploit_rollout_out_of_reach: f64,

    /// Rollout exploitation exponent when a neighbor is within reach.
    #[serde(default = "default_c_exploit_within")]
    pub c_exploit_rollout_within_reach: f64,

    /// Weight regularizer for the out-of-reach rollout policy.
    #[serde(default = "default_regulator_out")]
    pub cost_to_go_regulator_out_of_reach: f64,

    /// Weight regularizer for the within-reach rollout policy.
    #[serde(default = "default_regulator_within")]
    pub cost_to_go_regulator_within_reach: f64,

    /// Tolerance multiplier for the rollout reach-mode test.
    #[serde(default = "default_n_eps")]
    pub n_eps_for_is_reached: f32,

    /// Position progress per step assumed by the cost heuristics (meters).
    #[serde(default = "default_heur_pos_step")]
    pub heur_pos_step: f32,

    /// Heading progress per step assumed by the cost heuristics (radians).
    #[serde(default = "default_heur_ori_step")]
    pub heur_ori_step: f32,

    /// Accepted for compatibility with older configuration files; the
    /// covariance term of the transition heuristic no longer uses it.
    #[serde(default = "default_heur_cov_step")]
    pub heur_cov_step: f32,

    /// Per-step covariance contraction ratio assumed by the heuristics,
    /// in (0, 1).
    #[serde(default = "default_cov_convergence_rate")]
    pub cov_convergence_rate: f64,

    /// Step multiplier for simulated node stabilization.
    #[serde(default = "default_scale_stab_num_steps")]
    pub scale_stab_num_steps: u32,

    /// Inflation on the approximate stabilization cost along the baseline
    /// feedback chain.
    #[serde(default = "default_inflation_stab")]
    pub inflation_for_approx_stab_cost: f64,

    /// Controller steps per simulated (and executed) action invocation.
    #[serde(default = "default_rollout_steps")]
    pub rollout_steps: u32,

    /// Penalty cost-to-go for collided or exhausted branches.
    #[serde(default = "default_obstacle_cost_to_go")]
    pub obstacle_cost_to_go: f64,
}

fn default_num_particles() -> usize {
    10
}
fn default_max_depth() -> u32 {
    5
}
fn default_max_reach_depth() -> u32 {
    30
}
fn default_c_explore_sim() -> f64 {
    2.0
}
fn default_c_exploit_out() -> f64 {
    4.0
}
fn default_c_exploit_within() -> f64 {
    1.0
}
fn default_regulator_out() -> f64 {
    1.0
}
fn default_regulator_within() -> f64 {
    1.0
}
fn default_n_eps() -> f32 {
    3.0
}
fn default_heur_pos_step() -> f32 {
    0.1
}
fn default_heur_ori_step() -> f32 {
    0.1
}
fn default_heur_cov_step() -> f32 {
    0.001
}
fn default_cov_convergence_rate() -> f64 {
    0.9
}
fn default_scale_stab_num_steps() -> u32 {
    3
}
fn default_inflation_stab() -> f64 {
    1.0
}
fn default_rollout_steps() -> u32 {
    5
}
fn default_obstacle_cost_to_go() -> f64 {
    1000.0
}

impl Default for PomcpConfig {
    fn default() -> Self {
        Self {
            num_particles: default_num_particles(),
            max_depth: default_max_depth(),
            max_reach_depth: default_max_reach_depth(),
            c_explore_sim: default_c_explore_sim(),
            c_exploit_rollout_out_of_reach: default_c_exploit_out(),
            c_exploit_rollout_within_reach: default_c_exploit_within(),
            cost_to_go_regulator_out_of_reach: default_regulator_out(),
            cost_to_go_regulator_within_reach: default_regulator_within(),
            n_eps_for_is_reached: default_n_eps(),
            heur_pos_step: default_heur_pos_step(),
            heur_ori_step: default_heur_ori_step(),
            heur_cov_step: default_heur_cov_step(),
            cov_convergence_rate: default_cov_convergence_rate(),
            scale_stab_num_steps: default_scale_stab_num_steps(),
            inflation_for_approx_stab_cost: default_inflation_stab(),
            rollout_steps: default_rollout_steps(),
            obstacle_cost_to_go: default_obstacle_cost_to_go(),
        }
    }
}

/// Edge/node controller parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Planar distance at which a controller considers its node reached (m).
    pub node_reached_distance: f32,

    /// Heading alignment threshold for node reachability (rad).
    pub node_reached_angle: f32,

    /// Maximum stabilization steps before a node controller gives up.
    pub max_tries: u32,

    /// Maximum deviation from the nominal trajectory before the controller
    /// aborts and forces a replan (m).
    pub max_trajectory_deviation: f32,

    /// Proportional position gain of the tracking regulator.
    pub kp_pos: f32,

    /// Proportional heading gain of the tracking regulator.
    pub kp_ori: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            node_reached_distance: 0.15,
            node_reached_angle: 0.5,
            max_tries: 120,
            max_trajectory_deviation: 1.0,
            kp_pos: 1.0,
            kp_ori: 1.0,
        }
    }
}

/// Weights combining uncertainty and time into execution cost.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    /// Weight on accumulated covariance trace.
    pub information_cost_weight: f64,

    /// Weight on elapsed time steps.
    pub time_cost_weight: f64,

    /// Small positive bias added by every controller execution and
    /// subtracted from accumulated cost, so zero-length executions score
    /// at zero.
    pub edge_cost_bias: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            information_cost_weight: 1.0,
            time_cost_weight: 1.0,
            edge_cost_bias: 0.001,
        }
    }
}

/// Omnidirectional motion model parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConfig {
    /// Control period (seconds).
    pub dt: f32,

    /// Maximum linear velocity (m/s).
    pub max_linear_vel: f32,

    /// Maximum angular velocity (rad/s).
    pub max_angular_vel: f32,

    /// Linear process noise per unit speed (1/s, multiplies |v|).
    pub vel_noise_rate: f32,

    /// Minimum linear process noise std dev (m/s).
    pub vel_noise_min: f32,

    /// Angular process noise per unit rate.
    pub omega_noise_rate: f32,

    /// Minimum angular process noise std dev (rad/s).
    pub omega_noise_min: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            dt: 0.2,
            max_linear_vel: 0.25,
            max_angular_vel: 0.8,
            vel_noise_rate: 0.05,
            vel_noise_min: 0.002,
            omega_noise_rate: 0.05,
            omega_noise_min: 0.002,
        }
    }
}

/// Beacon-referenced full-pose observation model parameters.
///
/// Measurement noise grows quadratically with the distance to the nearest
/// beacon, which makes information a spatial resource the planner can seek.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ObservationConfig {
    /// Position measurement variance at a beacon (m²).
    pub pos_noise_base: f32,

    /// Position variance growth per squared meter from the nearest beacon.
    pub pos_noise_scale: f32,

    /// Heading measurement variance at a beacon (rad²).
    pub heading_noise_base: f32,

    /// Heading variance growth per squared meter from the nearest beacon.
    pub heading_noise_scale: f32,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            pos_noise_base: 0.0004,
            pos_noise_scale: 0.001,
            heading_noise_base: 0.0004,
            heading_noise_scale: 0.001,
        }
    }
}

/// Filter numerics.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Eigenvalue floor applied to posterior covariances.
    pub psd_floor: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { psd_floor: 1e-9 }
    }
}

/// Outer execution loop limits.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutiveConfig {
    /// Maximum plan-execute iterations before the mission is declared
    /// exhausted.
    pub max_iterations: usize,
}

impl Default for ExecutiveConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

impl MargaConfig {
    /// Load configuration from a TOML file. Any malformed or unknown key is
    /// fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MargaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        use crate::error::MargaError;
        if self.pomcp.max_reach_depth <= self.pomcp.max_depth {
            return Err(MargaError::Config(
                "max_reach_depth must exceed max_depth".to_string(),
            ));
        }
        if self.pomcp.cov_convergence_rate <= 0.0 || self.pomcp.cov_convergence_rate >= 1.0 {
            return Err(MargaError::Config(
                "cov_convergence_rate must lie in (0, 1)".to_string(),
            ));
        }
        if self.pomcp.rollout_steps == 0 {
            return Err(MargaError::Config(
                "rollout_steps must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
