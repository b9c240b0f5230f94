//! Separated feedback regulator: nominal feedforward plus stationary
//! proportional state feedback.

use crate::core::math::angle_diff;
use crate::core::types::{GaussianBelief, Pose2D, Velocity2D};

/// Generates a feedback control from a belief and a time index along the
/// nominal trajectory. Deterministic in both arguments.
pub trait SeparatedController {
    /// Control for time index `t`. Beyond the trajectory length the
    /// regulator is stationary about the final nominal state.
    fn generate_feedback_control(&self, belief: &GaussianBelief, t: usize) -> Velocity2D;
}

/// Trajectory-tracking regulator with a stationary diagonal gain:
/// `u_t = u*_t - L (x̂ - x*_t)`, output clamped to the velocity limits.
#[derive(Debug, Clone)]
pub struct TrackingLqr {
    nominal_states: Vec<Pose2D>,
    nominal_controls: Vec<Velocity2D>,
    kp_pos: f32,
    kp_ori: f32,
    max_linear_vel: f32,
    max_angular_vel: f32,
}

impl TrackingLqr {
    /// Create a regulator for a nominal trajectory. States and controls must
    /// have equal length and at least one element.
    pub fn new(
        nominal_states: Vec<Pose2D>,
        nominal_controls: Vec<Velocity2D>,
        kp_pos: f32,
        kp_ori: f32,
        max_linear_vel: f32,
        max_angular_vel: f32,
    ) -> Self {
        debug_assert_eq!(nominal_states.len(), nominal_controls.len());
        debug_assert!(!nominal_states.is_empty());
        Self {
            nominal_states,
            nominal_controls,
            kp_pos,
            kp_ori,
            max_linear_vel,
            max_angular_vel,
        }
    }

    /// Length of the nominal trajectory.
    pub fn len(&self) -> usize {
        self.nominal_states.len()
    }

    /// Whether the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.nominal_states.is_empty()
    }
}

impl SeparatedController for TrackingLqr {
    fn generate_feedback_control(&self, belief: &GaussianBelief, t: usize) -> Velocity2D {
        let last = self.nominal_states.len() - 1;
        let (x_ref, u_ref) = if t <= last {
            (&self.nominal_states[t], self.nominal_controls[t])
        } else {
            // stationary regulator about the final state
            (&self.nominal_states[last], Velocity2D::zero())
        };

        let ex = belief.mean.x - x_ref.x;
        let ey = belief.mean.y - x_ref.y;
        let et = angle_diff(x_ref.theta, belief.mean.theta);

        Velocity2D::new(
            u_ref.vx - self.kp_pos * ex,
            u_ref.vy - self.kp_pos * ey,
            u_ref.omega - self.kp_ori * et,
        )
        .clamped(self.max_linear_vel, self.max_angular_vel)
    }
}
