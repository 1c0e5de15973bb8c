//! `dvrp-sim` — discrete-event simulation of dynamic vehicle routing.
//!
//! # The loop
//!
//! ```text
//! while let Some((t, wake)) = queue.pop():        (time, FIFO) order
//!   ① Vehicle(v)            — resume v's phase machine to its next suspension
//!   ② OrderRelease          — order becomes OPEN; optional decision point
//!   ③ PostponementExpiry    — self-imposed decision point
//!   ④ Coordinator           — snapshot → routing callback → validate → apply
//!   ⑤ PeriodicUpdate        — scheduled decision point
//! ```
//!
//! Everything is single-threaded and cooperative: a handler runs to its next
//! suspension point without preemption, so model invariants hold at every
//! event boundary without locks.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use dvrp_model::{Location, Model, Order, Vehicle};
//! use dvrp_sim::Simulation;
//!
//! let mut model = Model::new();
//! model.add_location(Location::new("DEPOT"))?;
//! model.add_location(Location::new("CUSTOMER"))?;
//! model.add_vehicle(Vehicle::new("TRUCK", "DEPOT"))?;
//!
//! let mut sim = Simulation::builder(model)
//!     .routing_callback(my_algorithm)
//!     .build()?;
//! sim.provide_orders([Order::new("O-1", "DEPOT", "CUSTOMER").with_release_date(8)], true)?;
//! sim.run()?;
//! ```

pub mod callback;
pub mod error;
pub mod hooks;
pub mod observer;
pub mod sim;
pub mod stats;
pub mod vehicle_exec;

mod coordinator;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use callback::RoutingCallback;
pub use error::{SimError, SimResult};
pub use hooks::{Effects, ModelHooks, NoopHooks, VehicleHooks};
pub use observer::{LogObserver, NoopObserver, SimObserver};
pub use sim::{Simulation, SimulationBuilder};
pub use stats::{OrderStats, VehicleStats};
pub use vehicle_exec::{ServiceOp, ServiceStep};
