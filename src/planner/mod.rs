//! Planning layer: roadmap inputs, cost heuristics, the particle-based
//! search, and the outer executive loop.

mod executive;
pub mod heuristics;
mod pomcp;
mod roadmap;

pub use executive::{Executive, MissionOutcome};
pub use pomcp::PomcpPlanner;
pub use roadmap::Roadmap;
