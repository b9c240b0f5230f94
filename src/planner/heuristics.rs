//! Closed-form cost heuristics seeding the search.
//!
//! Both heuristics price a hypothetical controller run as a geometric
//! series: the covariance trace is assumed to contract by a fixed ratio per
//! step, so K steps of filtering cost
//! `trace(Σ) · ρ · (1 - ρ^K) / (1 - ρ)`.

use crate::config::MargaConfig;
use crate::core::types::{GaussianBelief, ReachTolerances};

/// Parameters of the cost heuristics.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicParams {
    /// Position progress per step (meters).
    pub heur_pos_step: f32,
    /// Heading progress per step (radians).
    pub heur_ori_step: f32,
    /// Per-step covariance contraction ratio, in (0, 1).
    pub cov_convergence_rate: f64,
    /// Weight on filtering cost.
    pub information_cost_weight: f64,
    /// Weight on step count.
    pub time_cost_weight: f64,
    /// Reach tolerances compensated out of the distances.
    pub reach: ReachTolerances,
}

impl HeuristicParams {
    /// Extract the heuristic parameters from the configuration.
    pub fn from_config(config: &MargaConfig) -> Self {
        Self {
            heur_pos_step: config.pomcp.heur_pos_step,
            heur_ori_step: config.pomcp.heur_ori_step,
            cov_convergence_rate: config.pomcp.cov_convergence_rate,
            information_cost_weight: config.cost.information_cost_weight,
            time_cost_weight: config.cost.time_cost_weight,
            reach: config.reach,
        }
    }
}

/// Filtering cost of `steps` contraction steps starting from `trace`.
fn filtering_cost(trace: f64, steps: f64, rho: f64) -> f64 {
    trace * rho * (1.0 - rho.powf(steps)) / (1.0 - rho)
}

/// Approximate cost of driving belief `a` to within reach of `b`.
///
/// Pose and heading distances are reduced by the reach tolerances (clamped
/// at zero) and divided by the per-step progress; the larger quotient is the
/// assumed step count.
pub fn approx_transition_cost(
    a: &GaussianBelief,
    b: &GaussianBelief,
    params: &HeuristicParams,
) -> f64 {
    let pos_d = (a.pos_distance_to(b) - params.reach.pos).max(0.0);
    let ori_d = (a.ori_distance_to(b) - params.reach.ori).max(0.0);

    let steps_pos = (pos_d / params.heur_pos_step) as f64;
    let steps_ori = (ori_d / params.heur_ori_step) as f64;
    let steps = steps_pos.max(steps_ori);

    let filtering = filtering_cost(
        a.covariance.trace() as f64,
        steps,
        params.cov_convergence_rate,
    );
    params.information_cost_weight * filtering + params.time_cost_weight * steps
}

/// Approximate cost of contracting covariance from `a`'s trace to `b`'s.
///
/// The step count is the geometric contraction count
/// `log(trace_b / trace_a) / log(ρ)`, with the trace ratio clamped at 1 so
/// targets with larger covariance cost nothing.
pub fn approx_stabilization_cost(
    a: &GaussianBelief,
    b: &GaussianBelief,
    params: &HeuristicParams,
) -> f64 {
    let trace_a = a.covariance.trace() as f64;
    let trace_b = b.covariance.trace() as f64;
    if trace_a <= 0.0 {
        return 0.0;
    }
    let ratio = (trace_b / trace_a).min(1.0);
    let steps = ratio.ln() / params.cov_convergence_rate.ln();

    let filtering = filtering_cost(trace_a, steps, params.cov_convergence_rate);
    params.information_cost_weight * filtering + params.time_cost_weight * steps
}

/// UCB exploration bonus subtracted from Q during tree-phase selection.
///
/// The tiny denominator offset makes unvisited actions irresistible once
/// the vertex itself has been visited.
pub fn ucb_bonus(c: f64, n_visits: f64, action_visits: f64) -> f64 {
    c * ((n_visits + 1.0).ln() / (action_visits + 1e-10)).sqrt()
}
