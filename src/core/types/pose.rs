//! Pose, point, and velocity types for planar belief-space planning.

use crate::core::math::{angle_diff, normalize_angle, Vec3};
use serde::{Deserialize, Serialize};

/// A 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
}

impl Point2D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// Robot pose in 2D space.
///
/// Represents position (x, y) in meters and heading (theta) in radians.
/// Theta is normalized to [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Heading in radians, normalized to [-π, π]
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Identity pose at origin with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    /// Position component.
    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Planar distance to another pose (heading ignored).
    #[inline]
    pub fn planar_distance(&self, other: &Pose2D) -> f32 {
        self.position().distance(&other.position())
    }

    /// Absolute shortest-path heading difference to another pose.
    #[inline]
    pub fn heading_distance(&self, other: &Pose2D) -> f32 {
        angle_diff(self.theta, other.theta).abs()
    }

    /// View as a (x, y, theta) vector for filter math.
    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.theta)
    }

    /// Build from a (x, y, theta) vector, normalizing the heading.
    #[inline]
    pub fn from_vec3(v: &Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// A velocity command for an omnidirectional base: world-frame linear
/// velocities plus angular rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity2D {
    /// X velocity in m/s
    pub vx: f32,
    /// Y velocity in m/s
    pub vy: f32,
    /// Angular velocity in rad/s
    pub omega: f32,
}

impl Velocity2D {
    /// Create a new velocity command.
    #[inline]
    pub fn new(vx: f32, vy: f32, omega: f32) -> Self {
        Self { vx, vy, omega }
    }

    /// Zero command.
    #[inline]
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Linear speed magnitude.
    #[inline]
    pub fn linear_speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Clamp linear speed and angular rate to the given limits.
    pub fn clamped(&self, max_linear: f32, max_angular: f32) -> Velocity2D {
        let speed = self.linear_speed();
        let (vx, vy) = if speed > max_linear && speed > 1e-9 {
            let k = max_linear / speed;
            (self.vx * k, self.vy * k)
        } else {
            (self.vx, self.vy)
        };
        let omega = self.omega.clamp(-max_angular, max_angular);
        Velocity2D::new(vx, vy, omega)
    }

    /// View as a (vx, vy, omega) vector.
    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.vx, self.vy, self.omega)
    }
}

impl Default for Velocity2D {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn test_point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_relative_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_pose_normalizes_theta() {
        let p = Pose2D::new(0.0, 0.0, 3.0 * PI);
        assert!(p.theta.abs() <= PI);
    }

    #[test]
    fn test_planar_distance_ignores_heading() {
        let a = Pose2D::new(0.0, 0.0, 0.0);
        let b = Pose2D::new(1.0, 0.0, PI / 2.0);
        assert_relative_eq!(a.planar_distance(&b), 1.0);
    }

    #[test]
    fn test_heading_distance_wraps() {
        let a = Pose2D::new(0.0, 0.0, PI - 0.05);
        let b = Pose2D::new(0.0, 0.0, -PI + 0.05);
        assert_relative_eq!(a.heading_distance(&b), 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_velocity_clamp() {
        let v = Velocity2D::new(3.0, 4.0, 2.0);
        let c = v.clamped(1.0, 0.5);
        assert_relative_eq!(c.linear_speed(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(c.omega, 0.5);
        // direction preserved
        assert_relative_eq!(c.vy / c.vx, 4.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_pose_vec3_roundtrip() {
        let p = Pose2D::new(1.0, -2.0, 0.3);
        let q = Pose2D::from_vec3(&p.as_vec3());
        assert_relative_eq!(p.x, q.x);
        assert_relative_eq!(p.y, q.y);
        assert_relative_eq!(p.theta, q.theta);
    }
}
