//! Core value types shared across the planner.

mod belief;
mod covariance;
mod pose;

pub use belief::{GaussianBelief, ReachTolerances};
pub use covariance::Covariance2D;
pub use pose::{Point2D, Pose2D, Velocity2D};
