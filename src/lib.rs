//! Marga - belief-space motion planning over a roadmap of stabilizing
//! controllers
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    planner/                         │  ← Search + executive
//! │        (pomcp, heuristics, roadmap, executive)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │             graph/            control/              │  ← Belief graph,
//! │      (arena, NN index)   (edge/node controllers)    │    transition oracle
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   estimation/                       │  ← Filter + regulator
//! │            (linear systems, EKF, LQR)               │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     models/                         │  ← World models
//! │       (motion, observation, scene, simulator)       │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      core/                          │  ← Foundation
//! │               (math, pose, belief)                  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # How a plan is made
//!
//! The roadmap supplies stabilizing node controllers, a baseline feedback
//! policy, and a baseline cost-to-go table. At every executive iteration the
//! planner grows an action/observation tree rooted at the current belief:
//! particles sampled from the root belief become hypothetical true states,
//! and each tree step runs an actual edge or node controller (regulator +
//! Kalman filter) in simulation. Cost-to-go statistics back up through the
//! tree; the executive physically executes the minimum-cost action, promotes
//! the matching child to the new root, prunes the rest, and repeats until
//! the goal belief is reached.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: World models (depends on core)
// ============================================================================
pub mod models;

// ============================================================================
// Layer 3: Estimation (depends on core, models)
// ============================================================================
pub mod estimation;

// ============================================================================
// Layer 4: Controllers and the belief graph
// ============================================================================
pub mod control;
pub mod graph;

// ============================================================================
// Layer 5: Planner and executive
// ============================================================================
pub mod planner;

pub mod config;
pub mod error;
pub mod metrics;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::types::{
    Covariance2D, GaussianBelief, Point2D, Pose2D, ReachTolerances, Velocity2D,
};

// Configuration and errors
pub use config::MargaConfig;
pub use error::{MargaError, Result};

// Models
pub use models::{
    BeaconObservationModel, NominalTrajectory, OmniMotionModel, Rect, Scene, Simulator,
    TrueStateSnapshot,
};

// Estimation
pub use estimation::{BeliefFilter, Ekf, LinearSystem, SeparatedController, TrackingLqr};

// Control
pub use control::{ControlStatus, Controller, EdgeController, ExecutionOutcome, NodeController};

// Graph
pub use graph::{ActionStats, BeliefGraph, EdgeId, EdgeWeight, FirmIndex, VertexId, VertexKind};

// Planner
pub use metrics::{CostSample, Metrics};
pub use planner::{Executive, MissionOutcome, PomcpPlanner, Roadmap};
