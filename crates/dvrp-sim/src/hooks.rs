//! Observable hooks.
//!
//! The engine calls a fixed, enumerated set of hooks at well-defined points
//! of the vehicle execution loop.  All methods have default no-op
//! implementations, so implementors override only what they care about.
//!
//! Hooks run synchronously between events and must not block.  A hook that
//! needs to influence the simulation does so through [`Effects`]; a hook
//! that needs to *suspend* (the pre-service wait) returns a follow-up delay
//! instead of blocking.

use dvrp_core::{LocationId, OrderId, SimTime};
use dvrp_model::{Model, Vehicle};

use crate::vehicle_exec::ServiceStep;

// ── Effects ───────────────────────────────────────────────────────────────────

/// Deferred actions a hook may request; applied by the engine after the hook
/// returns.
#[derive(Default)]
pub struct Effects {
    pub(crate) routing_requested: bool,
}

impl Effects {
    /// Impose a decision point.  Multiple requests at the same instant
    /// coalesce into a single routing cycle.
    pub fn request_routing(&mut self) {
        self.routing_requested = true;
    }
}

// ── VehicleHooks ──────────────────────────────────────────────────────────────

/// Per-vehicle overridable behavior.
///
/// `travel_time` is the one hook almost every model implements; everything
/// else defaults to a no-op.
pub trait VehicleHooks {
    /// Travel time between two locations.  Defaults to zero (teleport).
    fn travel_time(
        &mut self,
        _model: &Model,
        _vehicle: &Vehicle,
        _origin: &LocationId,
        _destination: &LocationId,
    ) -> SimTime {
        SimTime::ZERO
    }

    /// Travel distance between two locations, accumulated into the vehicle
    /// statistics.  Defaults to zero.
    fn travel_distance(
        &mut self,
        _model: &Model,
        _vehicle: &Vehicle,
        _origin: &LocationId,
        _destination: &LocationId,
    ) -> f64 {
        0.0
    }

    /// The vehicle arrived at its next visit.
    fn on_arrival(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {}

    /// An extra wait before service starts, after the dock and earliest-start
    /// gates have cleared.  Returning `Some(d)` with `d > 0` suspends the
    /// vehicle interruptibly for `d`; the engine re-asks after any
    /// interruption.
    fn pre_service(
        &mut self,
        _model: &Model,
        _vehicle: &Vehicle,
        _fx: &mut Effects,
    ) -> Option<SimTime> {
        None
    }

    /// Service is about to begin (the service start time is already stamped).
    fn on_service_start(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {}

    /// Replace the default unload-then-load step sequence for the current
    /// visit.  Returning `None` keeps the default program.
    fn service_program(&mut self, _model: &Model, _vehicle: &Vehicle) -> Option<Vec<ServiceStep>> {
        None
    }

    /// All service steps completed; the dock (if any) has been released.
    fn on_service_finish(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {}

    /// The vehicle went idle and is about to evaluate its next leg.
    fn on_idle(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {}
}

// ── ModelHooks ────────────────────────────────────────────────────────────────

/// Model-scope counterparts of the vehicle hooks, plus the order-request
/// hook.  Useful for policies that watch the whole fleet (e.g. "request
/// routing whenever any vehicle returns to the depot").
pub trait ModelHooks {
    fn on_order_request(&mut self, _model: &Model, _order: &OrderId, _fx: &mut Effects) {}

    fn on_vehicle_arrival(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {}

    fn on_vehicle_service_start(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {}

    fn on_vehicle_service_finish(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {
    }

    fn on_vehicle_idle(&mut self, _model: &Model, _vehicle: &Vehicle, _fx: &mut Effects) {}
}

/// Hooks that do nothing; the default for both hook kinds.
pub struct NoopHooks;

impl VehicleHooks for NoopHooks {}
impl ModelHooks for NoopHooks {}
