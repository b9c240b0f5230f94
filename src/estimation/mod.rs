//! Estimation layer: linearization records, the belief filter, and the
//! separated feedback regulator.

mod kalman;
mod linear_system;
mod lqr;

pub use kalman::{BeliefFilter, Ekf};
pub use linear_system::LinearSystem;
pub use lqr::{SeparatedController, TrackingLqr};
