//! Visits — the atoms of a route plan.

use dvrp_core::{LocationId, OrderId, SimTime};

/// One stop of a vehicle route: a location together with the orders to
/// unload and load there.
///
/// The four timestamps are written by the simulation, each exactly once, in
/// the order `arrival ≤ service_start ≤ service_finish ≤ departure`.
/// A visit taken from a decision has all four unset.
#[derive(Clone, Debug, PartialEq)]
pub struct Visit {
    pub location: LocationId,

    /// Orders to load at this stop (applied after `delivery_list`).
    pub pickup_list: Vec<OrderId>,
    /// Orders to unload at this stop (applied first).
    pub delivery_list: Vec<OrderId>,

    /// Earliest instant the vehicle may start this visit; gates both the
    /// departure toward the stop and the service start at it.
    pub earliest_start_time: Option<SimTime>,

    // ── Set by the simulator ──────────────────────────────────────────────
    pub arrival_time: Option<SimTime>,
    pub service_start_time: Option<SimTime>,
    pub service_finish_time: Option<SimTime>,
    pub departure_time: Option<SimTime>,
}

impl Visit {
    pub fn new(location: impl Into<LocationId>) -> Self {
        Self {
            location: location.into(),
            pickup_list: Vec::new(),
            delivery_list: Vec::new(),
            earliest_start_time: None,
            arrival_time: None,
            service_start_time: None,
            service_finish_time: None,
            departure_time: None,
        }
    }

    pub fn with_pickups(mut self, orders: impl IntoIterator<Item = OrderId>) -> Self {
        self.pickup_list = orders.into_iter().collect();
        self
    }

    pub fn with_deliveries(mut self, orders: impl IntoIterator<Item = OrderId>) -> Self {
        self.delivery_list = orders.into_iter().collect();
        self
    }

    pub fn with_earliest_start(mut self, at: impl Into<SimTime>) -> Self {
        self.earliest_start_time = Some(at.into());
        self
    }

    /// `true` once service at this visit has begun — from then on the visit
    /// is immutable to decisions.
    pub fn service_started(&self) -> bool {
        self.service_start_time.is_some()
    }

    // ── Derived spans (None until the bounding timestamps exist) ──────────

    pub fn waiting_time(&self) -> Option<SimTime> {
        Some(self.service_start_time?.since(self.arrival_time?))
    }

    pub fn service_time(&self) -> Option<SimTime> {
        Some(self.service_finish_time?.since(self.service_start_time?))
    }

    pub fn idle_time(&self) -> Option<SimTime> {
        Some(self.departure_time?.since(self.service_finish_time?))
    }
}
