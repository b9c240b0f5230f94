//! Planar workspace: bounds, rectangular obstacles, validity queries.

use crate::core::types::{Point2D, Pose2D};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Rect {
    /// Create a new rectangle from opposite corners.
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whether a point lies inside (inclusive).
    #[inline]
    pub fn contains(&self, p: &Point2D) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// The workspace the robot moves in: world bounds plus obstacles.
#[derive(Debug, Clone)]
pub struct Scene {
    bounds: Rect,
    obstacles: Vec<Rect>,
}

impl Scene {
    /// Create an obstacle-free scene with the given bounds.
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            obstacles: Vec::new(),
        }
    }

    /// World bounds.
    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    /// Add an obstacle.
    pub fn add_obstacle(&mut self, rect: Rect) {
        self.obstacles.push(rect);
    }

    /// Obstacles currently in the scene.
    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    /// Whether a pose is inside the bounds and outside every obstacle.
    pub fn is_valid(&self, pose: &Pose2D) -> bool {
        let p = pose.position();
        if !self.bounds.contains(&p) {
            return false;
        }
        !self.obstacles.iter().any(|o| o.contains(&p))
    }

    /// Whether the straight segment between two poses stays valid, sampled
    /// at `step` intervals.
    pub fn is_motion_valid(&self, from: &Pose2D, to: &Pose2D, step: f32) -> bool {
        let dist = from.planar_distance(to);
        let n = (dist / step.max(1e-4)).ceil() as usize;
        for i in 0..=n {
            let t = if n == 0 { 0.0 } else { i as f32 / n as f32 };
            let p = Pose2D::new(
                from.x + t * (to.x - from.x),
                from.y + t * (to.y - from.y),
                from.theta,
            );
            if !self.is_valid(&p) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_wall() -> Scene {
        let mut scene = Scene::new(Rect::new(-1.0, -1.0, 2.0, 2.0));
        scene.add_obstacle(Rect::new(0.4, -0.5, 0.6, 0.5));
        scene
    }

    #[test]
    fn test_bounds_check() {
        let scene = scene_with_wall();
        assert!(scene.is_valid(&Pose2D::new(0.0, 0.0, 0.0)));
        assert!(!scene.is_valid(&Pose2D::new(-2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_obstacle_check() {
        let scene = scene_with_wall();
        assert!(!scene.is_valid(&Pose2D::new(0.5, 0.0, 0.0)));
        assert!(scene.is_valid(&Pose2D::new(0.5, 1.0, 0.0)));
    }

    #[test]
    fn test_motion_validity() {
        let scene = scene_with_wall();
        let a = Pose2D::new(0.0, 0.0, 0.0);
        let b = Pose2D::new(1.0, 0.0, 0.0);
        let c = Pose2D::new(0.0, 1.0, 0.0);
        assert!(!scene.is_motion_valid(&a, &b, 0.05));
        assert!(scene.is_motion_valid(&a, &c, 0.05));
    }

    #[test]
    fn test_zero_length_motion() {
        let scene = scene_with_wall();
        let a = Pose2D::new(0.0, 0.0, 0.0);
        assert!(scene.is_motion_valid(&a, &a, 0.05));
    }
}
