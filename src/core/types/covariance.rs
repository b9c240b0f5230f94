//! Pose covariance with the PSD repair required by the filter contract.

use crate::core::math::Mat3;
use serde::{Deserialize, Serialize};

/// Covariance matrix for a 2D pose (x, y, theta).
///
/// Stored row-major as a 3x3 matrix. Filter updates must keep this positive
/// semi-definite; [`Covariance2D::repaired`] enforces that numerically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance2D {
    /// Row-major 3x3 matrix data
    data: [f32; 9],
}

impl Covariance2D {
    /// Create a zero covariance matrix.
    #[inline]
    pub fn zero() -> Self {
        Self { data: [0.0; 9] }
    }

    /// Create a diagonal covariance matrix.
    ///
    /// Parameters are variances: xx = σ²_x, yy = σ²_y, tt = σ²_θ
    #[inline]
    pub fn diagonal(xx: f32, yy: f32, tt: f32) -> Self {
        Self {
            data: [xx, 0.0, 0.0, 0.0, yy, 0.0, 0.0, 0.0, tt],
        }
    }

    /// Create from a row-major array.
    #[inline]
    pub fn from_array(data: [f32; 9]) -> Self {
        Self { data }
    }

    /// Create from a matrix.
    #[inline]
    pub fn from_mat3(m: &Mat3) -> Self {
        Self { data: *m.as_array() }
    }

    /// View as a matrix.
    #[inline]
    pub fn as_mat3(&self) -> Mat3 {
        Mat3::from_array(self.data)
    }

    /// Get variance of x (element [0,0]).
    #[inline]
    pub fn var_x(&self) -> f32 {
        self.data[0]
    }

    /// Get variance of y (element [1,1]).
    #[inline]
    pub fn var_y(&self) -> f32 {
        self.data[4]
    }

    /// Get variance of theta (element [2,2]).
    #[inline]
    pub fn var_theta(&self) -> f32 {
        self.data[8]
    }

    /// Sum of the diagonal. The planner's uncertainty scalar.
    #[inline]
    pub fn trace(&self) -> f32 {
        self.data[0] + self.data[4] + self.data[8]
    }

    /// Get raw data as slice.
    #[inline]
    pub fn as_slice(&self) -> &[f32; 9] {
        &self.data
    }

    /// Whether the matrix is positive definite with minimum eigenvalue at
    /// least `floor` (tested via a Cholesky factorization of `self - floor*I`).
    pub fn is_psd(&self, floor: f32) -> bool {
        let shifted = self.as_mat3().sub(&Mat3::identity().scale(floor));
        shifted.cholesky().is_some()
    }

    /// Symmetrize and floor the eigenvalues at `floor`.
    ///
    /// Diagonal loading is added until the Cholesky test passes, which bounds
    /// the minimum eigenvalue from below without an eigendecomposition.
    pub fn repaired(&self, floor: f32) -> Covariance2D {
        let mut m = self.as_mat3().symmetrized();
        if m.sub(&Mat3::identity().scale(floor)).cholesky().is_some() {
            return Covariance2D::from_mat3(&m);
        }
        let mut load = floor.max(1e-9);
        for _ in 0..32 {
            m = m.add(&Mat3::identity().scale(load));
            if m.sub(&Mat3::identity().scale(floor)).cholesky().is_some() {
                return Covariance2D::from_mat3(&m);
            }
            load *= 2.0;
        }
        // Pathological input; fall back to a diagonal floor.
        Covariance2D::diagonal(
            self.data[0].max(floor),
            self.data[4].max(floor),
            self.data[8].max(floor),
        )
    }
}

impl Default for Covariance2D {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_covariance_trace() {
        let c = Covariance2D::diagonal(0.1, 0.2, 0.05);
        assert_relative_eq!(c.trace(), 0.35);
        assert_relative_eq!(c.var_theta(), 0.05);
    }

    #[test]
    fn test_repair_makes_psd() {
        // Asymmetric with a negative eigenvalue
        let c = Covariance2D::from_array([1.0, 0.4, 0.0, 0.2, -0.5, 0.0, 0.0, 0.0, 0.1]);
        assert!(!c.is_psd(1e-9));
        let r = c.repaired(1e-6);
        assert!(r.is_psd(1e-9));
        // symmetric after repair
        let m = r.as_mat3();
        assert_relative_eq!(m.get(0, 1), m.get(1, 0));
    }

    #[test]
    fn test_repair_keeps_valid_covariance() {
        let c = Covariance2D::diagonal(0.1, 0.1, 0.01);
        let r = c.repaired(1e-6);
        assert_relative_eq!(r.trace(), c.trace(), epsilon = 1e-6);
    }
}
