//! Track, vehicle and lap telemetry types shared across vsim

mod error;
mod state;
mod track;
mod vehicle;

pub use error::ModelError;
pub use state::{LapResult, SimulationState};
pub use track::{Track, TrackPoint, TrackSample};
pub use vehicle::{
    AeroParams, BrakeParams, MassParams, PowertrainParams, TireParams, TorquePoint, VehicleSpec,
    GRAVITY,
};
