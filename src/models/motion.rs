//! Omnidirectional motion model.
//!
//! The robot integrates world-frame velocity commands directly:
//! `x' = x + u * dt + w`, with process noise that grows with commanded
//! speed. All Jacobians are 3x3, which keeps the estimation stack square.

use crate::config::MotionConfig;
use crate::core::math::{normalize_angle, Mat3};
use crate::core::types::{Pose2D, Velocity2D};
use rand::Rng;
use rand_distr::StandardNormal;

/// Nominal open-loop trajectory between two poses: per-step nominal states
/// and the controls that produce them.
#[derive(Debug, Clone)]
pub struct NominalTrajectory {
    /// Nominal state at each step, starting at the first step's target.
    pub states: Vec<Pose2D>,
    /// Control applied at each step.
    pub controls: Vec<Velocity2D>,
}

impl NominalTrajectory {
    /// Number of steps.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Omnidirectional kinematic model with speed-proportional process noise.
#[derive(Debug, Clone)]
pub struct OmniMotionModel {
    config: MotionConfig,
}

impl OmniMotionModel {
    /// Create a new motion model with the given configuration.
    pub fn new(config: MotionConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    /// The rest command.
    pub fn zero_control(&self) -> Velocity2D {
        Velocity2D::zero()
    }

    /// Noise-free one-step propagation.
    pub fn propagate(&self, pose: &Pose2D, u: &Velocity2D) -> Pose2D {
        let dt = self.config.dt;
        Pose2D::new(
            pose.x + u.vx * dt,
            pose.y + u.vy * dt,
            pose.theta + u.omega * dt,
        )
    }

    /// One-step propagation with sampled process noise.
    ///
    /// `noise_scale` scales the noise std dev; 0 reduces to [`Self::propagate`].
    pub fn sample<R: Rng>(
        &self,
        pose: &Pose2D,
        u: &Velocity2D,
        rng: &mut R,
        noise_scale: f32,
    ) -> Pose2D {
        let nominal = self.propagate(pose, u);
        if noise_scale <= 0.0 {
            return nominal;
        }
        let dt = self.config.dt;
        let (sx, sy, st) = self.noise_std(u);
        let nx: f32 = rng.sample(StandardNormal);
        let ny: f32 = rng.sample(StandardNormal);
        let nt: f32 = rng.sample(StandardNormal);
        Pose2D::new(
            nominal.x + nx * sx * dt * noise_scale,
            nominal.y + ny * sy * dt * noise_scale,
            nominal.theta + nt * st * dt * noise_scale,
        )
    }

    /// State Jacobian ∂f/∂x at any linearization point.
    pub fn state_jacobian(&self, _pose: &Pose2D, _u: &Velocity2D) -> Mat3 {
        Mat3::identity()
    }

    /// Control Jacobian ∂f/∂u.
    pub fn control_jacobian(&self) -> Mat3 {
        Mat3::identity().scale(self.config.dt)
    }

    /// Process noise covariance for a control.
    pub fn process_noise(&self, u: &Velocity2D) -> Mat3 {
        let dt = self.config.dt;
        let (sx, sy, st) = self.noise_std(u);
        Mat3::diagonal(
            (sx * dt) * (sx * dt),
            (sy * dt) * (sy * dt),
            (st * dt) * (st * dt),
        )
    }

    fn noise_std(&self, u: &Velocity2D) -> (f32, f32, f32) {
        let c = &self.config;
        (
            c.vel_noise_rate * u.vx.abs() + c.vel_noise_min,
            c.vel_noise_rate * u.vy.abs() + c.vel_noise_min,
            c.omega_noise_rate * u.omega.abs() + c.omega_noise_min,
        )
    }

    /// Generate the nominal open-loop trajectory from one pose to another:
    /// straight-line translation at maximum speed with simultaneous
    /// shortest-path rotation.
    pub fn generate_open_loop(&self, from: &Pose2D, to: &Pose2D) -> NominalTrajectory {
        let c = &self.config;
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let dtheta = normalize_angle(to.theta - from.theta);
        let dist = (dx * dx + dy * dy).sqrt();

        let steps_pos = dist / (c.max_linear_vel * c.dt);
        let steps_ori = dtheta.abs() / (c.max_angular_vel * c.dt);
        let steps = steps_pos.max(steps_ori).ceil().max(1.0) as usize;

        let mut states = Vec::with_capacity(steps);
        let mut controls = Vec::with_capacity(steps);
        let vx = dx / (steps as f32 * c.dt);
        let vy = dy / (steps as f32 * c.dt);
        let omega = dtheta / (steps as f32 * c.dt);
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            states.push(Pose2D::new(
                from.x + t * dx,
                from.y + t * dy,
                from.theta + t * dtheta,
            ));
            controls.push(Velocity2D::new(vx, vy, omega));
        }
        NominalTrajectory { states, controls }
    }
}
