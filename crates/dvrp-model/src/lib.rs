//! `dvrp-model` — the domain model for dynamic vehicle routing simulations.
//!
//! Holds the four entity types and the [`Model`] container that owns them:
//!
//! | Module       | Contents                                              |
//! |--------------|-------------------------------------------------------|
//! | [`location`] | `Location` — a stop, optionally with a bounded dock   |
//! | [`order`]    | `Order`, `OrderStatus` — a pickup-and-delivery request|
//! | [`vehicle`]  | `Vehicle`, `VehicleStatus`, `LoadingRule`             |
//! | [`visit`]    | `Visit` — one stop of a route plan                    |
//! | [`model`]    | `Model` — id-keyed lookup tables, invariant checks    |
//! | [`error`]    | `ModelError`                                          |
//!
//! Entities reference each other by id only; the `Model` resolves references
//! through its lookup tables, which also keeps JSON serialization of the
//! simulation state trivial.  All containers are `BTreeMap`s so iteration
//! order — and therefore everything downstream of it — is deterministic.

pub mod error;
pub mod location;
pub mod model;
pub mod order;
pub mod vehicle;
pub mod visit;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{ModelError, ModelResult};
pub use location::Location;
pub use model::Model;
pub use order::{Order, OrderStatus};
pub use vehicle::{LoadingRule, Vehicle, VehicleStatus};
pub use visit::Visit;
