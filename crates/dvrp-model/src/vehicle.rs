//! Vehicles.

use std::collections::VecDeque;

use dvrp_core::{ConfigError, LocationId, OrderId, VehicleId};

use crate::visit::Visit;

// ── VehicleStatus ─────────────────────────────────────────────────────────────

/// Execution state of a vehicle, as visible to routing algorithms.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    /// At a location with no service in progress.
    Idle,
    /// Traveling toward the next visit.
    EnRoute,
    /// Arrived, waiting for a dock slot or an earliest-start bound.
    WaitingForService,
    /// Executing pickup/delivery steps.
    UnderService,
}

// ── LoadingRule ───────────────────────────────────────────────────────────────

/// Constraint on the unload order of carried orders.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingRule {
    /// Any carried order may be unloaded at any stop.
    #[default]
    Free,
    /// Last in, first out: only the top of the loading stack may be unloaded.
    Lifo,
}

// ── Vehicle ───────────────────────────────────────────────────────────────────

/// A vehicle executing a route plan.
///
/// `previous_visit` is set while the vehicle is en route (it is the stop the
/// vehicle departed from); `current_visit` is set whenever the vehicle is at
/// a location.  Exactly one of the two is set at any observable instant —
/// which one is determined by `status`.
#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: VehicleId,
    pub initial_location: LocationId,

    /// Maximum total quantity on board, or `None` for uncapacitated.
    pub capacity: Option<f64>,
    pub loading_rule: LoadingRule,

    // ── Set by the simulator ──────────────────────────────────────────────
    pub status: VehicleStatus,
    pub previous_visit: Option<Visit>,
    pub current_visit: Option<Visit>,
    /// Tentative route: rewritable by decisions, subject to commitment rules.
    pub next_visits: VecDeque<Visit>,
    /// On-board orders in loading order (the LIFO stack when applicable).
    pub carrying_orders: Vec<OrderId>,
    /// Number of visits completed, including the initial one.
    pub completed_visits: u32,
}

impl Vehicle {
    pub fn new(id: impl Into<VehicleId>, initial_location: impl Into<LocationId>) -> Self {
        Self {
            id: id.into(),
            initial_location: initial_location.into(),
            capacity: None,
            loading_rule: LoadingRule::Free,
            status: VehicleStatus::Idle,
            previous_visit: None,
            current_visit: None,
            next_visits: VecDeque::new(),
            carrying_orders: Vec::new(),
            completed_visits: 0,
        }
    }

    pub fn with_capacity(mut self, capacity: f64) -> Result<Self, ConfigError> {
        if !(capacity > 0.0) {
            return Err(ConfigError::NonPositiveQuantity(capacity));
        }
        self.capacity = Some(capacity);
        Ok(self)
    }

    pub fn with_loading_rule(mut self, rule: LoadingRule) -> Self {
        self.loading_rule = rule;
        self
    }

    // ── Predicates ────────────────────────────────────────────────────────

    pub fn is_idle(&self) -> bool {
        self.status == VehicleStatus::Idle
    }

    pub fn is_en_route(&self) -> bool {
        self.status == VehicleStatus::EnRoute
    }

    pub fn is_under_service(&self) -> bool {
        self.status == VehicleStatus::UnderService
    }

    pub fn has_next_visit(&self) -> bool {
        !self.next_visits.is_empty()
    }

    /// The location the vehicle is currently at, if any.
    pub fn current_location(&self) -> Option<&LocationId> {
        self.current_visit.as_ref().map(|v| &v.location)
    }

    /// The destination of the next route leg, if any.
    pub fn next_location(&self) -> Option<&LocationId> {
        self.next_visits.front().map(|v| &v.location)
    }

    /// Total quantity currently on board, given a per-order load lookup.
    pub fn carried_load(&self, load_of: impl Fn(&OrderId) -> f64) -> f64 {
        self.carrying_orders.iter().map(load_of).sum()
    }
}
