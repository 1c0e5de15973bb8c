//! `dvrp-protocol` — the language-neutral contract between the simulation
//! and external routing algorithms.
//!
//! At every decision point the engine freezes the model into a
//! [`StateSnapshot`], hands it (typically as JSON) to the routing callback,
//! and receives a [`Decision`] back.  This crate owns both shapes, the
//! conversion from/to `serde_json::Value`, and the full validation of a
//! decision against the live model.
//!
//! | Module       | Contents                                               |
//! |--------------|--------------------------------------------------------|
//! | [`state`]    | `StateSnapshot` and its capture from a `Model`         |
//! | [`decision`] | `Decision` and its parse from JSON                     |
//! | [`validate`] | state-feasibility, capacity and LIFO checks            |
//! | [`error`]    | `DecisionError`                                        |
//!
//! Validation rejects a decision *wholesale*: either every constraint holds
//! and the coordinator may apply it atomically, or nothing is applied.

pub mod decision;
pub mod error;
pub mod state;
pub mod validate;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use decision::{Decision, OrderDecision, OrderDisposition, VehicleDecision};
pub use error::{DecisionError, DecisionResult};
pub use state::{OrderState, StateSnapshot, VehicleState, VisitState};
pub use validate::validate_decision;
