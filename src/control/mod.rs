//! Controllers built from the estimation layer.

mod controller;

pub use controller::{
    ControlStatus, Controller, EdgeController, ExecutionOutcome, NodeController,
};
