//! `dvrp-core` — foundational types for the `rust_dvrp` simulation framework.
//!
//! This crate is a dependency of every other `dvrp-*` crate.  It intentionally
//! has no `dvrp-*` dependencies and minimal external ones (only `serde` and
//! `thiserror`).
//!
//! # What lives here
//!
//! | Module    | Contents                                         |
//! |-----------|--------------------------------------------------|
//! | [`ids`]   | `LocationId`, `OrderId`, `VehicleId`             |
//! | [`time`]  | `SimTime` — totally ordered simulation time      |
//! | [`error`] | `ConfigError`                                    |

pub mod error;
pub mod ids;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::ConfigError;
pub use ids::{LocationId, OrderId, VehicleId};
pub use time::SimTime;
