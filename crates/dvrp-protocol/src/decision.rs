//! Decisions returned by routing algorithms.
//!
//! A decision names only what changes: vehicles absent from `vehicles` keep
//! their plans, orders absent from `orders` stay undecided.  An explicit
//! `null` vehicle entry also means "no change" (some algorithms emit it for
//! every vehicle they looked at).

use std::collections::BTreeMap;

use dvrp_core::{OrderId, SimTime, VehicleId};

use crate::error::{DecisionError, DecisionResult};
use crate::state::VisitState;

// ── OrderDisposition ──────────────────────────────────────────────────────────

/// What the decision maker wants done with an undecided order.
#[derive(Copy, Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDisposition {
    Accepted,
    Rejected,
    Postponed,
}

/// Disposition of one order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OrderDecision {
    pub status: OrderDisposition,
    /// Required when `status == Postponed`; must lie in the future.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postponed_until: Option<SimTime>,
}

// ── VehicleDecision ───────────────────────────────────────────────────────────

/// Route changes for one vehicle.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct VehicleDecision {
    /// Replacement pickup/delivery lists for the visit being executed.
    /// Only legal while its service has not started; the location must not
    /// change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_visit: Option<VisitState>,

    /// Replacement tentative route.  `None` leaves the route untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_visits: Option<Vec<VisitState>>,
}

// ── Decision ──────────────────────────────────────────────────────────────────

/// A complete routing decision.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Decision {
    #[serde(default)]
    pub vehicles: BTreeMap<VehicleId, Option<VehicleDecision>>,
    #[serde(default)]
    pub orders: BTreeMap<OrderId, OrderDecision>,
}

impl Decision {
    /// The empty decision: every vehicle and order unchanged.
    pub fn no_change() -> Self {
        Self::default()
    }

    /// Reject every given order; used by the default routing callback.
    pub fn reject_all(orders: impl IntoIterator<Item = OrderId>) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            orders: orders
                .into_iter()
                .map(|id| {
                    (id, OrderDecision { status: OrderDisposition::Rejected, postponed_until: None })
                })
                .collect(),
        }
    }

    /// Parse a raw JSON decision, as produced by an external algorithm.
    pub fn from_value(value: serde_json::Value) -> DecisionResult<Self> {
        serde_json::from_value(value).map_err(|e| DecisionError::Malformed(e.to_string()))
    }

    pub fn is_no_change(&self) -> bool {
        self.orders.is_empty() && self.vehicles.values().all(|v| v.is_none())
    }
}
