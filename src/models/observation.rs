//! Beacon-referenced pose observation model.
//!
//! The sensor reports the full pose with Gaussian noise whose variance grows
//! quadratically with the distance to the nearest beacon. Far from every
//! beacon the robot is effectively blind, so paths that hug beacons buy
//! information. This is the landscape belief-space planning exploits.

use crate::config::ObservationConfig;
use crate::core::math::Mat3;
use crate::core::types::{Point2D, Pose2D};
use rand::Rng;
use rand_distr::StandardNormal;

/// Full-pose observation model with beacon-distance-scaled noise.
#[derive(Debug, Clone)]
pub struct BeaconObservationModel {
    config: ObservationConfig,
    beacons: Vec<Point2D>,
}

impl BeaconObservationModel {
    /// Create a model over a set of beacons. At least one beacon is expected;
    /// with none, the noise floor is taken at infinite distance.
    pub fn new(config: ObservationConfig, beacons: Vec<Point2D>) -> Self {
        Self { config, beacons }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ObservationConfig {
        &self.config
    }

    /// Beacon positions.
    pub fn beacons(&self) -> &[Point2D] {
        &self.beacons
    }

    /// Squared distance from a pose to the nearest beacon.
    fn nearest_beacon_dist_sq(&self, pose: &Pose2D) -> f32 {
        let p = pose.position();
        self.beacons
            .iter()
            .map(|b| b.distance_squared(&p))
            .fold(f32::INFINITY, f32::min)
    }

    /// Expected observation at a pose (the pose itself).
    #[inline]
    pub fn predicted(&self, pose: &Pose2D) -> Pose2D {
        *pose
    }

    /// Observation Jacobian ∂h/∂x.
    pub fn jacobian(&self) -> Mat3 {
        Mat3::identity()
    }

    /// Measurement noise covariance at a pose.
    pub fn noise_covariance(&self, pose: &Pose2D) -> Mat3 {
        let d_sq = self.nearest_beacon_dist_sq(pose);
        let d_sq = if d_sq.is_finite() { d_sq } else { 1e6 };
        let c = &self.config;
        let rp = c.pos_noise_base + c.pos_noise_scale * d_sq;
        let rt = c.heading_noise_base + c.heading_noise_scale * d_sq;
        Mat3::diagonal(rp, rp, rt)
    }

    /// Sample a noisy observation of the given true pose.
    pub fn observe<R: Rng>(&self, true_pose: &Pose2D, rng: &mut R, noise_scale: f32) -> Pose2D {
        if noise_scale <= 0.0 {
            return *true_pose;
        }
        let r = self.noise_covariance(true_pose);
        let sp = r.get(0, 0).sqrt() * noise_scale;
        let st = r.get(2, 2).sqrt() * noise_scale;
        let nx: f32 = rng.sample(StandardNormal);
        let ny: f32 = rng.sample(StandardNormal);
        let nt: f32 = rng.sample(StandardNormal);
        Pose2D::new(
            true_pose.x + nx * sp,
            true_pose.y + ny * sp,
            true_pose.theta + nt * st,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> BeaconObservationModel {
        BeaconObservationModel::new(
            ObservationConfig::default(),
            vec![Point2D::new(0.0, 0.0), Point2D::new(2.0, 0.0)],
        )
    }

    #[test]
    fn test_noise_grows_with_beacon_distance() {
        let m = model();
        let near = m.noise_covariance(&Pose2D::new(0.1, 0.0, 0.0));
        let far = m.noise_covariance(&Pose2D::new(1.0, 2.0, 0.0));
        assert!(far.get(0, 0) > near.get(0, 0));
        assert!(far.get(2, 2) > near.get(2, 2));
    }

    #[test]
    fn test_nearest_beacon_selected() {
        let m = model();
        let at_second = m.noise_covariance(&Pose2D::new(2.0, 0.0, 0.0));
        let at_first = m.noise_covariance(&Pose2D::new(0.0, 0.0, 0.0));
        assert_eq!(at_second.get(0, 0), at_first.get(0, 0));
    }

    #[test]
    fn test_noise_free_observation_is_exact() {
        let m = model();
        let mut rng = StdRng::seed_from_u64(3);
        let pose = Pose2D::new(0.5, -0.3, 0.7);
        assert_eq!(m.observe(&pose, &mut rng, 0.0), pose);
    }

    #[test]
    fn test_no_beacons_still_bounded() {
        let m = BeaconObservationModel::new(ObservationConfig::default(), vec![]);
        let r = m.noise_covariance(&Pose2D::identity());
        assert!(r.get(0, 0).is_finite());
    }
}
