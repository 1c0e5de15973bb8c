use dvrp_core::{ConfigError, VehicleId};
use dvrp_model::{ModelError, VehicleStatus};
use thiserror::Error;

/// Fatal simulation errors.
///
/// Rejected decisions are *not* here: a `DecisionError` aborts only the
/// routing cycle and is surfaced through the observer (see
/// `Simulation::last_decision_error`); the run continues under the prior
/// plans.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid parameter: {0}")]
    Config(#[from] ConfigError),

    #[error("vehicle {vehicle} is {status:?} at the end of the horizon, not IDLE")]
    VehicleNotIdleAtEnd { vehicle: VehicleId, status: VehicleStatus },

    /// A service step broke the loading discipline at runtime.  Unreachable
    /// through validated decisions; a custom service program can trigger it.
    #[error("service fault: {0}")]
    ServiceFault(String),

    #[error("simulation has already finished")]
    AlreadyFinished,
}

pub type SimResult<T> = Result<T, SimError>;
