//! Gaussian belief over the robot pose and the reach predicates the planner
//! and controllers share.

use crate::core::math::Vec3;
use crate::core::types::{Covariance2D, Pose2D};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Tolerances deciding when a belief has "reached" a target belief.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReachTolerances {
    /// Position tolerance in meters.
    pub pos: f32,
    /// Heading tolerance in radians.
    pub ori: f32,
    /// Covariance-trace tolerance: trace(Σ) - trace(Σ_target) must not
    /// exceed this.
    pub cov: f32,
    /// Multiplier applied to the covariance tolerance when the relaxed
    /// goal test is used.
    pub relax_multiplier: f32,
}

impl Default for ReachTolerances {
    fn default() -> Self {
        Self {
            pos: 0.1,
            ori: 0.3,
            cov: 0.02,
            relax_multiplier: 2.0,
        }
    }
}

impl ReachTolerances {
    /// Tolerances uniformly scaled by `n` (used by the rollout reach test).
    pub fn scaled(&self, n: f32) -> ReachTolerances {
        ReachTolerances {
            pos: self.pos * n,
            ori: self.ori * n,
            cov: self.cov * n,
            relax_multiplier: self.relax_multiplier,
        }
    }
}

/// A Gaussian belief: estimated pose and covariance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianBelief {
    /// Estimated mean pose.
    pub mean: Pose2D,
    /// Pose covariance.
    pub covariance: Covariance2D,
}

impl GaussianBelief {
    /// Create a new belief.
    pub fn new(mean: Pose2D, covariance: Covariance2D) -> Self {
        Self { mean, covariance }
    }

    /// Planar distance between means.
    #[inline]
    pub fn pos_distance_to(&self, target: &GaussianBelief) -> f32 {
        self.mean.planar_distance(&target.mean)
    }

    /// Absolute heading difference between means.
    #[inline]
    pub fn ori_distance_to(&self, target: &GaussianBelief) -> f32 {
        self.mean.heading_distance(&target.mean)
    }

    /// Pose-only reach test: position and heading within tolerance.
    pub fn is_reached_pose(&self, target: &GaussianBelief, tol: &ReachTolerances) -> bool {
        self.pos_distance_to(target) <= tol.pos && self.ori_distance_to(target) <= tol.ori
    }

    /// Full reach test: pose plus covariance convergence,
    /// `trace(Σ) - trace(Σ_target) <= tol.cov`.
    pub fn is_reached(&self, target: &GaussianBelief, tol: &ReachTolerances) -> bool {
        self.is_reached_pose(target, tol)
            && (self.covariance.trace() - target.covariance.trace()) as f64 <= tol.cov as f64
    }

    /// Reach test with the covariance tolerance relaxed by the configured
    /// multiplier. Used only for the executive's goal termination.
    pub fn is_reached_relaxed(&self, target: &GaussianBelief, tol: &ReachTolerances) -> bool {
        let relaxed = ReachTolerances {
            cov: tol.cov * tol.relax_multiplier,
            ..*tol
        };
        self.is_reached(target, &relaxed)
    }

    /// Reach test with all tolerances scaled by `n`. The rollout policy uses
    /// this to decide its exploration mode.
    pub fn is_reached_within_n_eps(
        &self,
        target: &GaussianBelief,
        tol: &ReachTolerances,
        n: f32,
    ) -> bool {
        self.is_reached(target, &tol.scaled(n))
    }

    /// Sample a pose from this belief with the standard deviation inflated by
    /// `n_sigma` (inflation surfaces collisions with few particles).
    ///
    /// `None` when the covariance cannot be factored even after repair.
    pub fn sample_pose<R: Rng>(&self, rng: &mut R, n_sigma: f32) -> Option<Pose2D> {
        let cov = self.covariance.repaired(1e-9);
        let l = cov.as_mat3().cholesky()?;
        let n = Vec3::new(
            rng.sample::<f32, _>(StandardNormal),
            rng.sample::<f32, _>(StandardNormal),
            rng.sample::<f32, _>(StandardNormal),
        );
        let offset = l.mul_vec(&n).scale(n_sigma);
        Some(Pose2D::from_vec3(&self.mean.as_vec3().add(&offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn belief_at(x: f32, y: f32, theta: f32, trace_third: f32) -> GaussianBelief {
        GaussianBelief::new(
            Pose2D::new(x, y, theta),
            Covariance2D::diagonal(trace_third, trace_third, trace_third),
        )
    }

    #[test]
    fn test_is_reached_pose() {
        let tol = ReachTolerances::default();
        let a = belief_at(0.0, 0.0, 0.0, 0.01);
        let near = belief_at(0.05, 0.0, 0.1, 0.01);
        let far = belief_at(0.5, 0.0, 0.0, 0.01);
        assert!(a.is_reached_pose(&near, &tol));
        assert!(!a.is_reached_pose(&far, &tol));
    }

    #[test]
    fn test_is_reached_requires_covariance_convergence() {
        let tol = ReachTolerances::default();
        let target = belief_at(0.0, 0.0, 0.0, 0.001);
        let pose_ok_cov_bad = belief_at(0.01, 0.0, 0.0, 0.1);
        let both_ok = belief_at(0.01, 0.0, 0.0, 0.002);
        assert!(pose_ok_cov_bad.is_reached_pose(&target, &tol));
        assert!(!pose_ok_cov_bad.is_reached(&target, &tol));
        assert!(both_ok.is_reached(&target, &tol));
    }

    #[test]
    fn test_relaxed_goal_test() {
        let tol = ReachTolerances {
            cov: 0.01,
            relax_multiplier: 10.0,
            ..Default::default()
        };
        let target = belief_at(0.0, 0.0, 0.0, 0.001);
        let b = belief_at(0.0, 0.0, 0.0, 0.02);
        assert!(!b.is_reached(&target, &tol));
        assert!(b.is_reached_relaxed(&target, &tol));
    }

    #[test]
    fn test_within_n_eps_scales_thresholds() {
        let tol = ReachTolerances {
            pos: 0.1,
            ori: 0.3,
            cov: 0.01,
            relax_multiplier: 2.0,
        };
        let target = belief_at(0.0, 0.0, 0.0, 0.01);
        let b = belief_at(0.25, 0.0, 0.0, 0.01);
        assert!(!b.is_reached(&target, &tol));
        assert!(b.is_reached_within_n_eps(&target, &tol, 3.0));
    }

    #[test]
    fn test_sample_pose_spread_scales_with_sigma() {
        let b = belief_at(1.0, 2.0, 0.0, 0.01);
        let mut rng = StdRng::seed_from_u64(7);
        let mut sum_sq = 0.0f64;
        let n = 1000;
        for _ in 0..n {
            let s = b.sample_pose(&mut rng, 1.0).unwrap();
            let d = s.planar_distance(&b.mean);
            sum_sq += (d * d) as f64;
        }
        // E[dx^2 + dy^2] = 2 * 0.01
        let mean_sq = sum_sq / n as f64;
        assert!(mean_sq > 0.01 && mean_sq < 0.04, "mean_sq = {}", mean_sq);
    }
}
