use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("track needs at least 3 centerline points, got {0}")]
    TooFewPoints(usize),
    #[error("invalid vehicle: {0}")]
    InvalidVehicle(&'static str),
}
