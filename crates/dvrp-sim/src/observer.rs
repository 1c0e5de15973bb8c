//! Simulation observers.
//!
//! Every externally visible transition is reported through [`SimObserver`].
//! All methods default to no-ops, so implementors override only what they
//! need.  [`LogObserver`] forwards the event stream to `tracing` and is the
//! default observer; [`NoopObserver`] silences it.

use dvrp_core::{LocationId, OrderId, SimTime, VehicleId};
use dvrp_protocol::DecisionError;
use tracing::{info, warn};

/// Callbacks invoked by the simulation at key transitions.
pub trait SimObserver {
    fn on_simulation_start(&mut self, _at: SimTime) {}
    fn on_simulation_finish(&mut self, _at: SimTime) {}

    // ── Order events ──────────────────────────────────────────────────────

    fn on_order_requested(&mut self, _at: SimTime, _order: &OrderId) {}
    fn on_order_accepted(&mut self, _at: SimTime, _order: &OrderId) {}
    fn on_order_rejected(&mut self, _at: SimTime, _order: &OrderId) {}
    fn on_order_canceled(&mut self, _at: SimTime, _order: &OrderId) {}
    fn on_order_updated(&mut self, _at: SimTime, _order: &OrderId) {}
    fn on_order_postponed(&mut self, _at: SimTime, _order: &OrderId, _until: SimTime) {}
    fn on_postponement_interrupted(&mut self, _at: SimTime, _order: &OrderId) {}
    fn on_postponement_expired(&mut self, _at: SimTime, _order: &OrderId) {}
    fn on_pickup(&mut self, _at: SimTime, _order: &OrderId, _vehicle: &VehicleId) {}
    fn on_delivery(&mut self, _at: SimTime, _order: &OrderId, _vehicle: &VehicleId) {}

    // ── Vehicle events ────────────────────────────────────────────────────

    fn on_departure_delayed(&mut self, _at: SimTime, _vehicle: &VehicleId, _until: SimTime) {}
    fn on_departure(
        &mut self,
        _at: SimTime,
        _vehicle: &VehicleId,
        _from: &LocationId,
        _to: &LocationId,
    ) {
    }
    fn on_arrival(&mut self, _at: SimTime, _vehicle: &VehicleId, _location: &LocationId) {}
    fn on_waiting_for_dock(&mut self, _at: SimTime, _vehicle: &VehicleId, _location: &LocationId) {}
    fn on_waiting_for_earliest_start(
        &mut self,
        _at: SimTime,
        _vehicle: &VehicleId,
        _until: SimTime,
    ) {
    }
    fn on_service_start(&mut self, _at: SimTime, _vehicle: &VehicleId, _location: &LocationId) {}
    fn on_service_finish(&mut self, _at: SimTime, _vehicle: &VehicleId, _location: &LocationId) {}

    // ── Routing events ────────────────────────────────────────────────────

    fn on_routing_start(&mut self, _at: SimTime, _epoch: u64) {}
    fn on_routing_finish(&mut self, _at: SimTime, _epoch: u64) {}
    fn on_decision_rejected(&mut self, _at: SimTime, _error: &DecisionError) {}

    /// Non-fatal anomalies (`RuntimeWarning`s).
    fn warning(&mut self, _at: SimTime, _message: &str) {}
}

/// An observer that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// The default observer: the event stream as `tracing` records.
///
/// Departures and arrivals where origin and destination coincide are
/// suppressed — they are plan bookkeeping, not movement.
pub struct LogObserver;

impl SimObserver for LogObserver {
    fn on_simulation_start(&mut self, at: SimTime) {
        info!(time = %at, "simulation started");
    }

    fn on_simulation_finish(&mut self, at: SimTime) {
        info!(time = %at, "simulation finished");
    }

    fn on_order_requested(&mut self, at: SimTime, order: &OrderId) {
        info!(time = %at, %order, "order requested");
    }

    fn on_order_accepted(&mut self, at: SimTime, order: &OrderId) {
        info!(time = %at, %order, "order accepted");
    }

    fn on_order_rejected(&mut self, at: SimTime, order: &OrderId) {
        info!(time = %at, %order, "order rejected");
    }

    fn on_order_canceled(&mut self, at: SimTime, order: &OrderId) {
        info!(time = %at, %order, "order canceled");
    }

    fn on_order_updated(&mut self, at: SimTime, order: &OrderId) {
        info!(time = %at, %order, "order updated");
    }

    fn on_order_postponed(&mut self, at: SimTime, order: &OrderId, until: SimTime) {
        info!(time = %at, %order, %until, "order postponed");
    }

    fn on_postponement_interrupted(&mut self, at: SimTime, order: &OrderId) {
        info!(time = %at, %order, "postponement interrupted");
    }

    fn on_postponement_expired(&mut self, at: SimTime, order: &OrderId) {
        info!(time = %at, %order, "postponement expired");
    }

    fn on_pickup(&mut self, at: SimTime, order: &OrderId, vehicle: &VehicleId) {
        info!(time = %at, %vehicle, %order, "order picked up");
    }

    fn on_delivery(&mut self, at: SimTime, order: &OrderId, vehicle: &VehicleId) {
        info!(time = %at, %vehicle, %order, "order delivered");
    }

    fn on_departure_delayed(&mut self, at: SimTime, vehicle: &VehicleId, until: SimTime) {
        info!(time = %at, %vehicle, %until, "departure postponed");
    }

    fn on_departure(&mut self, at: SimTime, vehicle: &VehicleId, from: &LocationId, to: &LocationId) {
        if from != to {
            info!(time = %at, %vehicle, %from, %to, "departed");
        }
    }

    fn on_arrival(&mut self, at: SimTime, vehicle: &VehicleId, location: &LocationId) {
        info!(time = %at, %vehicle, %location, "arrived");
    }

    fn on_waiting_for_dock(&mut self, at: SimTime, vehicle: &VehicleId, location: &LocationId) {
        info!(time = %at, %vehicle, %location, "waiting for a free dock");
    }

    fn on_waiting_for_earliest_start(&mut self, at: SimTime, vehicle: &VehicleId, until: SimTime) {
        info!(time = %at, %vehicle, %until, "waiting for earliest service start");
    }

    fn on_service_start(&mut self, at: SimTime, vehicle: &VehicleId, location: &LocationId) {
        info!(time = %at, %vehicle, %location, "service started");
    }

    fn on_service_finish(&mut self, at: SimTime, vehicle: &VehicleId, location: &LocationId) {
        info!(time = %at, %vehicle, %location, "service finished");
    }

    fn on_routing_start(&mut self, at: SimTime, epoch: u64) {
        info!(time = %at, epoch, "routing started");
    }

    fn on_routing_finish(&mut self, at: SimTime, epoch: u64) {
        info!(time = %at, epoch, "routing finished");
    }

    fn on_decision_rejected(&mut self, at: SimTime, error: &DecisionError) {
        warn!(time = %at, %error, "decision rejected");
    }

    fn warning(&mut self, at: SimTime, message: &str) {
        warn!(time = %at, "{message}");
    }
}
