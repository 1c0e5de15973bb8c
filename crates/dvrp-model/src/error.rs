use dvrp_core::{ConfigError, LocationId, OrderId, VehicleId};
use thiserror::Error;

/// Structural errors detected while assembling or mutating the model.
///
/// All of these are fatal at setup time: `Simulation::run` refuses to start
/// on a structurally broken model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("location with id \"{0}\" already exists")]
    DuplicateLocation(LocationId),

    #[error("vehicle with id \"{0}\" already exists")]
    DuplicateVehicle(VehicleId),

    #[error("order with id \"{0}\" already exists")]
    DuplicateOrder(OrderId),

    #[error("unknown location \"{0}\"")]
    UnknownLocation(LocationId),

    #[error("unknown vehicle \"{0}\"")]
    UnknownVehicle(VehicleId),

    #[error("unknown order \"{0}\"")]
    UnknownOrder(OrderId),

    #[error("invalid parameter: {0}")]
    Config(#[from] ConfigError),

    #[error("model invariant violated: {0}")]
    Invariant(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
