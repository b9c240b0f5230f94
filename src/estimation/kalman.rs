//! Kalman filtering over the belief state.

use crate::core::math::{angle_diff, Mat3, Vec3};
use crate::core::types::{Covariance2D, GaussianBelief, Pose2D, Velocity2D};
use crate::error::{MargaError, Result};
use crate::estimation::LinearSystem;
use crate::models::OmniMotionModel;

/// One-step belief update: predict with the applied control, correct with
/// the received observation, using the two linearizations straddling the
/// step.
pub trait BeliefFilter {
    /// Advance the belief one step. The returned covariance is always PSD.
    fn evolve(
        &self,
        belief: &GaussianBelief,
        control: &Velocity2D,
        observation: &Pose2D,
        current: &LinearSystem,
        next: &LinearSystem,
    ) -> Result<GaussianBelief>;
}

/// Extended Kalman filter.
///
/// The mean is propagated through the nonlinear motion model; covariances
/// use the Jacobians of the supplied linear systems. The posterior is
/// symmetrized and eigenvalue-floored before it is returned.
#[derive(Debug, Clone)]
pub struct Ekf {
    motion: OmniMotionModel,
    psd_floor: f32,
}

impl Ekf {
    /// Create a filter around the given motion model.
    pub fn new(motion: OmniMotionModel, psd_floor: f32) -> Self {
        Self { motion, psd_floor }
    }
}

impl BeliefFilter for Ekf {
    fn evolve(
        &self,
        belief: &GaussianBelief,
        control: &Velocity2D,
        observation: &Pose2D,
        current: &LinearSystem,
        next: &LinearSystem,
    ) -> Result<GaussianBelief> {
        // Predict
        let x_pred = self.motion.propagate(&belief.mean, control);
        let p = belief.covariance.as_mat3();
        let a = current.a();
        let p_pred = a.mul(&p).mul(&a.transpose()).add(current.q());

        // Correct
        let h = next.h();
        let r = next.r();
        let s = h.mul(&p_pred).mul(&h.transpose()).add(r);
        let s_inv = s
            .inverse()
            .ok_or_else(|| MargaError::Filter("innovation covariance is singular".to_string()))?;
        let k = p_pred.mul(&h.transpose()).mul(&s_inv);

        let innovation = Vec3::new(
            observation.x - x_pred.x,
            observation.y - x_pred.y,
            angle_diff(x_pred.theta, observation.theta),
        );
        let dx = k.mul_vec(&innovation);
        let mean = Pose2D::new(x_pred.x + dx.x, x_pred.y + dx.y, x_pred.theta + dx.z);

        let i_kh = Mat3::identity().sub(&k.mul(h));
        let p_post = i_kh.mul(&p_pred);
        let covariance = Covariance2D::from_mat3(&p_post).repaired(self.psd_floor);

        Ok(GaussianBelief::new(mean, covariance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MotionConfig, ObservationConfig};
    use crate::core::types::Point2D;
    use crate::models::BeaconObservationModel;
    use approx::assert_relative_eq;

    fn setup() -> (Ekf, BeaconObservationModel, OmniMotionModel) {
        let motion = OmniMotionModel::new(MotionConfig::default());
        let observation = BeaconObservationModel::new(
            ObservationConfig::default(),
            vec![Point2D::new(0.0, 0.0)],
        );
        (Ekf::new(motion.clone(), 1e-9), observation, motion)
    }

    fn ls_at(
        pose: Pose2D,
        u: Velocity2D,
        motion: &OmniMotionModel,
        observation: &BeaconObservationModel,
    ) -> LinearSystem {
        LinearSystem::new(pose, u, motion, observation)
    }

    #[test]
    fn test_evolve_tracks_exact_observation() {
        let (ekf, obs_model, motion) = setup();
        let u = Velocity2D::new(0.25, 0.0, 0.0);
        let belief = GaussianBelief::new(Pose2D::identity(), Covariance2D::diagonal(0.1, 0.1, 0.1));
        let true_next = motion.propagate(&Pose2D::identity(), &u);

        let current = ls_at(Pose2D::identity(), u, &motion, &obs_model);
        let next = ls_at(true_next, u, &motion, &obs_model);
        let posterior = ekf
            .evolve(&belief, &u, &true_next, &current, &next)
            .unwrap();

        // observation agrees with prediction: mean lands on it
        assert_relative_eq!(posterior.mean.x, true_next.x, epsilon = 1e-4);
        assert_relative_eq!(posterior.mean.y, true_next.y, epsilon = 1e-4);
    }

    #[test]
    fn test_update_contracts_covariance_near_beacon() {
        let (ekf, obs_model, motion) = setup();
        let u = Velocity2D::zero();
        let belief = GaussianBelief::new(Pose2D::identity(), Covariance2D::diagonal(0.5, 0.5, 0.5));
        let ls = ls_at(Pose2D::identity(), u, &motion, &obs_model);
        let posterior = ekf
            .evolve(&belief, &u, &Pose2D::identity(), &ls, &ls)
            .unwrap();
        assert!(posterior.covariance.trace() < belief.covariance.trace());
    }

    #[test]
    fn test_posterior_is_psd() {
        let (ekf, obs_model, motion) = setup();
        let u = Velocity2D::new(0.1, 0.1, 0.2);
        let belief = GaussianBelief::new(
            Pose2D::identity(),
            Covariance2D::from_array([0.2, 0.05, 0.0, 0.05, 0.3, 0.01, 0.0, 0.01, 0.1]),
        );
        let ls = ls_at(Pose2D::identity(), u, &motion, &obs_model);
        let posterior = ekf
            .evolve(&belief, &u, &Pose2D::new(0.05, 0.03, 0.02), &ls, &ls)
            .unwrap();
        assert!(posterior.covariance.is_psd(0.0));
    }

    #[test]
    fn test_innovation_wraps_heading() {
        let (ekf, obs_model, motion) = setup();
        let u = Velocity2D::zero();
        let start = Pose2D::new(0.0, 0.0, std::f32::consts::PI - 0.05);
        let z = Pose2D::new(0.0, 0.0, -std::f32::consts::PI + 0.05);
        let belief = GaussianBelief::new(start, Covariance2D::diagonal(0.01, 0.01, 0.5));
        let ls = ls_at(start, u, &motion, &obs_model);
        let posterior = ekf.evolve(&belief, &u, &z, &ls, &ls).unwrap();
        // posterior heading moves across the wrap, not backwards through zero
        assert!(posterior.mean.theta.abs() > std::f32::consts::PI - 0.2);
    }
}
