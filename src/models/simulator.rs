//! The simulator: hidden true state, models, and the workspace.
//!
//! The planner samples particles by overwriting the true state, so the
//! simulator exposes an explicit snapshot/restore pair; `choose_action`
//! snapshots on entry and must restore on every exit path.

use crate::config::{MotionConfig, ObservationConfig};
use crate::core::types::{Point2D, Pose2D, Velocity2D};
use crate::models::{BeaconObservationModel, OmniMotionModel, Scene};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Opaque capture of the simulator's hidden true state.
#[derive(Debug, Clone, Copy)]
pub struct TrueStateSnapshot {
    pose: Pose2D,
}

/// Simulated world: scene, motion/observation models, and the hidden true
/// robot state.
#[derive(Debug)]
pub struct Simulator {
    scene: Scene,
    motion: OmniMotionModel,
    observation: BeaconObservationModel,
    true_state: Pose2D,
    rng: StdRng,
    noise_scale: f32,
    velocity_logging: bool,
    velocity_log: Vec<Velocity2D>,
}

impl Simulator {
    /// Create a simulator.
    ///
    /// `seed` 0 picks a time-based seed; any other value is deterministic.
    pub fn new(
        scene: Scene,
        motion_config: MotionConfig,
        observation_config: ObservationConfig,
        beacons: Vec<Point2D>,
        initial_state: Pose2D,
        noise_scale: f32,
        seed: u64,
    ) -> Self {
        let seed = if seed == 0 {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(12345)
        } else {
            seed
        };
        Self {
            scene,
            motion: OmniMotionModel::new(motion_config),
            observation: BeaconObservationModel::new(observation_config, beacons),
            true_state: initial_state,
            rng: StdRng::seed_from_u64(seed),
            noise_scale,
            velocity_logging: false,
            velocity_log: Vec::new(),
        }
    }

    /// The motion model.
    pub fn motion(&self) -> &OmniMotionModel {
        &self.motion
    }

    /// The observation model.
    pub fn observation(&self) -> &BeaconObservationModel {
        &self.observation
    }

    /// The workspace.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable workspace access (scenario setup).
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The hidden true state.
    pub fn true_state(&self) -> Pose2D {
        self.true_state
    }

    /// Overwrite the hidden true state (particle sampling).
    pub fn set_true_state(&mut self, pose: Pose2D) {
        self.true_state = pose;
    }

    /// Capture the true state for later restoration.
    pub fn snapshot(&self) -> TrueStateSnapshot {
        TrueStateSnapshot {
            pose: self.true_state,
        }
    }

    /// Restore a previously captured true state.
    pub fn restore(&mut self, snapshot: TrueStateSnapshot) {
        self.true_state = snapshot.pose;
    }

    /// Apply a control to the hidden true state.
    pub fn apply_control(&mut self, u: &Velocity2D) {
        self.true_state = self
            .motion
            .sample(&self.true_state, u, &mut self.rng, self.noise_scale);
        if self.velocity_logging {
            self.velocity_log.push(*u);
        }
    }

    /// Observe the hidden true state.
    pub fn get_observation(&mut self) -> Pose2D {
        self.observation
            .observe(&self.true_state, &mut self.rng, self.noise_scale)
    }

    /// Whether a pose is collision-free.
    pub fn is_valid(&self, pose: &Pose2D) -> bool {
        self.scene.is_valid(pose)
    }

    /// Whether the hidden true state is collision-free.
    pub fn check_true_state_validity(&self) -> bool {
        self.scene.is_valid(&self.true_state)
    }

    /// Enable or disable velocity logging (real execution only).
    pub fn set_velocity_logging(&mut self, enabled: bool) {
        self.velocity_logging = enabled;
    }

    /// Drain the velocity log.
    pub fn take_velocity_log(&mut self) -> Vec<Velocity2D> {
        std::mem::take(&mut self.velocity_log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rect;
    use approx::assert_relative_eq;

    fn sim(noise_scale: f32) -> Simulator {
        Simulator::new(
            Scene::new(Rect::new(-1.0, -1.0, 2.0, 2.0)),
            MotionConfig::default(),
            ObservationConfig::default(),
            vec![Point2D::new(0.0, 0.0)],
            Pose2D::identity(),
            noise_scale,
            42,
        )
    }

    #[test]
    fn test_snapshot_restore() {
        let mut s = sim(1.0);
        let snap = s.snapshot();
        s.apply_control(&Velocity2D::new(0.2, 0.0, 0.0));
        s.apply_control(&Velocity2D::new(0.2, 0.0, 0.0));
        assert!(s.true_state().x > 0.0);
        s.restore(snap);
        assert_relative_eq!(s.true_state().x, 0.0);
    }

    #[test]
    fn test_noise_free_observation_matches_state() {
        let mut s = sim(0.0);
        s.apply_control(&Velocity2D::new(0.25, 0.0, 0.0));
        let z = s.get_observation();
        assert_eq!(z, s.true_state());
    }

    #[test]
    fn test_validity_tracks_obstacles() {
        let mut s = sim(0.0);
        assert!(s.check_true_state_validity());
        s.scene_mut().add_obstacle(Rect::new(-0.1, -0.1, 0.1, 0.1));
        assert!(!s.check_true_state_validity());
    }

    #[test]
    fn test_velocity_logging() {
        let mut s = sim(0.0);
        s.set_velocity_logging(true);
        s.apply_control(&Velocity2D::new(0.1, 0.0, 0.0));
        s.apply_control(&Velocity2D::new(0.2, 0.0, 0.0));
        let log = s.take_velocity_log();
        assert_eq!(log.len(), 2);
        assert_relative_eq!(log[1].vx, 0.2);
    }
}
