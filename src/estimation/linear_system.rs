//! Per-step linearization record along a nominal trajectory.

use crate::core::math::Mat3;
use crate::core::types::{Pose2D, Velocity2D};
use crate::models::{BeaconObservationModel, OmniMotionModel};

/// Linearization of the motion and observation models at one point of a
/// nominal open-loop trajectory. Immutable after construction; consumed by
/// both the filter and the regulator.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    x: Pose2D,
    u: Velocity2D,
    a: Mat3,
    b: Mat3,
    h: Mat3,
    q: Mat3,
    r: Mat3,
}

impl LinearSystem {
    /// Linearize both models at a nominal (state, control) pair.
    pub fn new(
        x: Pose2D,
        u: Velocity2D,
        motion: &OmniMotionModel,
        observation: &BeaconObservationModel,
    ) -> Self {
        Self {
            x,
            u,
            a: motion.state_jacobian(&x, &u),
            b: motion.control_jacobian(),
            h: observation.jacobian(),
            q: motion.process_noise(&u),
            r: observation.noise_covariance(&x),
        }
    }

    /// Nominal state.
    #[inline]
    pub fn x(&self) -> &Pose2D {
        &self.x
    }

    /// Nominal control.
    #[inline]
    pub fn u(&self) -> &Velocity2D {
        &self.u
    }

    /// State Jacobian A.
    #[inline]
    pub fn a(&self) -> &Mat3 {
        &self.a
    }

    /// Control Jacobian B.
    #[inline]
    pub fn b(&self) -> &Mat3 {
        &self.b
    }

    /// Observation Jacobian H.
    #[inline]
    pub fn h(&self) -> &Mat3 {
        &self.h
    }

    /// Process noise covariance Q.
    #[inline]
    pub fn q(&self) -> &Mat3 {
        &self.q
    }

    /// Measurement noise covariance R.
    #[inline]
    pub fn r(&self) -> &Mat3 {
        &self.r
    }
}
