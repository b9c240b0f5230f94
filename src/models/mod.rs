//! World models: motion, observation, workspace, and the simulator that
//! owns the hidden true state.

mod motion;
mod observation;
mod scene;
mod simulator;

pub use motion::{NominalTrajectory, OmniMotionModel};
pub use observation::BeaconObservationModel;
pub use scene::{Rect, Scene};
pub use simulator::{Simulator, TrueStateSnapshot};
