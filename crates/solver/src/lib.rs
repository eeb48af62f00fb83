//! Acceleration envelope and quasi-steady-state lap solver

mod envelope;
mod qss;

pub use envelope::{Envelope, EnvelopeConfig, EnvelopeSample};
pub use qss::{cornering_speed_limit, LapSolver, SolverConfig, SolverError};
