//! Execution time-series recorded by the executive for post-run analysis.

use crate::core::types::Velocity2D;

/// One cost sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostSample {
    /// Elapsed execution time steps.
    pub time_step: u64,
    /// Accumulated covariance cost (bias-corrected).
    pub covariance_cost: f64,
    /// Weighted total execution cost.
    pub total_cost: f64,
}

/// Time-series histories of one mission.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Cost after each executed action.
    pub cost_history: Vec<CostSample>,
    /// (time step, cumulative nodes reached).
    pub nodes_reached_history: Vec<(u64, u32)>,
    /// (sample index, linear speed) of every executed command.
    pub velocity_history: Vec<(usize, f32)>,
}

impl Metrics {
    /// Create empty histories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cost sample.
    pub fn record_cost(&mut self, time_step: u64, covariance_cost: f64, total_cost: f64) {
        self.cost_history.push(CostSample {
            time_step,
            covariance_cost,
            total_cost,
        });
    }

    /// Record the cumulative nodes-reached count.
    pub fn record_nodes_reached(&mut self, time_step: u64, count: u32) {
        self.nodes_reached_history.push((time_step, count));
    }

    /// Append executed velocity commands.
    pub fn record_velocities(&mut self, commands: &[Velocity2D]) {
        let base = self.velocity_history.len();
        for (i, u) in commands.iter().enumerate() {
            self.velocity_history.push((base + i, u.linear_speed()));
        }
    }

    /// Final execution cost, if any action was executed.
    pub fn final_cost(&self) -> Option<CostSample> {
        self.cost_history.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histories_accumulate() {
        let mut m = Metrics::new();
        m.record_cost(5, 0.1, 5.1);
        m.record_cost(10, 0.2, 10.2);
        m.record_nodes_reached(10, 1);
        m.record_velocities(&[Velocity2D::new(0.3, 0.4, 0.0)]);
        assert_eq!(m.cost_history.len(), 2);
        assert_eq!(m.final_cost().unwrap().time_step, 10);
        assert_eq!(m.nodes_reached_history, vec![(10, 1)]);
        assert_eq!(m.velocity_history, vec![(0, 0.5)]);
    }
}
