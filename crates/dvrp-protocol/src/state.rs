//! The state snapshot handed to routing algorithms.
//!
//! Field names and shapes are a wire contract: algorithms in any language
//! parse this JSON.  Empty visit lists are omitted on serialization and
//! default to empty on deserialization; absent optional times are `null`.

use std::collections::BTreeMap;

use dvrp_core::{LocationId, OrderId, SimTime, VehicleId};
use dvrp_model::{Model, Order, OrderStatus, Vehicle, VehicleStatus, Visit};

// ── VisitState ────────────────────────────────────────────────────────────────

/// Wire form of a [`Visit`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisitState {
    pub location: LocationId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pickup_list: Vec<OrderId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delivery_list: Vec<OrderId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_start_time: Option<SimTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<SimTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_start_time: Option<SimTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_finish_time: Option<SimTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<SimTime>,
}

impl VisitState {
    pub fn of(visit: &Visit) -> Self {
        Self {
            location: visit.location.clone(),
            pickup_list: visit.pickup_list.clone(),
            delivery_list: visit.delivery_list.clone(),
            earliest_start_time: visit.earliest_start_time,
            arrival_time: visit.arrival_time,
            service_start_time: visit.service_start_time,
            service_finish_time: visit.service_finish_time,
            departure_time: visit.departure_time,
        }
    }

    /// Convert a decision-supplied visit into a model [`Visit`].
    ///
    /// Runtime timestamps are discarded: a decision plans the future, it does
    /// not rewrite the past.
    pub fn into_visit(self) -> Visit {
        Visit {
            location: self.location,
            pickup_list: self.pickup_list,
            delivery_list: self.delivery_list,
            earliest_start_time: self.earliest_start_time,
            arrival_time: None,
            service_start_time: None,
            service_finish_time: None,
            departure_time: None,
        }
    }
}

// ── VehicleState ──────────────────────────────────────────────────────────────

/// Wire form of one vehicle.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct VehicleState {
    pub status: VehicleStatus,
    pub previous_visit: Option<VisitState>,
    pub current_visit: Option<VisitState>,
    pub next_visits: Vec<VisitState>,
    pub carrying_orders: Vec<OrderId>,
}

impl VehicleState {
    fn of(vehicle: &Vehicle) -> Self {
        Self {
            status: vehicle.status,
            previous_visit: vehicle.previous_visit.as_ref().map(VisitState::of),
            current_visit: vehicle.current_visit.as_ref().map(VisitState::of),
            next_visits: vehicle.next_visits.iter().map(VisitState::of).collect(),
            carrying_orders: vehicle.carrying_orders.clone(),
        }
    }
}

// ── OrderState ────────────────────────────────────────────────────────────────

/// Wire form of one open order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OrderState {
    pub id: OrderId,
    pub pickup_location: LocationId,
    pub delivery_location: LocationId,
    pub release_date: SimTime,
    pub due_date: Option<SimTime>,
    pub earliest_service_start_pickup: Option<SimTime>,
    pub latest_service_start_pickup: Option<SimTime>,
    pub earliest_service_start_delivery: Option<SimTime>,
    pub latest_service_start_delivery: Option<SimTime>,
    pub pickup_duration: SimTime,
    pub delivery_duration: SimTime,
    pub quantity: Option<f64>,
    /// The vehicle that picked the order up, or — for not-yet-picked orders —
    /// the vehicle whose tentative route contains the pickup, if any.
    pub assigned_vehicle: Option<VehicleId>,
    pub pickup_time: Option<SimTime>,
    pub pickup_vehicle: Option<VehicleId>,
    pub status: OrderStatus,
}

impl OrderState {
    fn of(order: &Order, assigned: Option<VehicleId>) -> Self {
        Self {
            id: order.id.clone(),
            pickup_location: order.pickup_location.clone(),
            delivery_location: order.delivery_location.clone(),
            release_date: order.release_date,
            due_date: order.due_date,
            earliest_service_start_pickup: order.earliest_service_start_pickup,
            latest_service_start_pickup: order.latest_service_start_pickup,
            earliest_service_start_delivery: order.earliest_service_start_delivery,
            latest_service_start_delivery: order.latest_service_start_delivery,
            pickup_duration: order.pickup_duration,
            delivery_duration: order.delivery_duration,
            quantity: order.quantity,
            assigned_vehicle: assigned,
            pickup_time: order.pickup_time,
            pickup_vehicle: order.pickup_time.and(order.assigned_vehicle.clone()),
            status: order.status,
        }
    }
}

// ── StateSnapshot ─────────────────────────────────────────────────────────────

/// The full decision-point state: everything a routing algorithm may see.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StateSnapshot {
    pub time: SimTime,
    pub vehicles: BTreeMap<VehicleId, VehicleState>,
    pub open_orders: BTreeMap<OrderId, OrderState>,
    pub canceled_orders: Vec<OrderId>,
    #[serde(default)]
    pub aux: serde_json::Map<String, serde_json::Value>,
}

impl StateSnapshot {
    /// Freeze `model` at instant `now`.
    ///
    /// Only called by the coordinator once the current instant has quiesced,
    /// so the snapshot never observes a half-applied transition.
    pub fn capture(
        model: &Model,
        now: SimTime,
        aux: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let vehicles: BTreeMap<VehicleId, VehicleState> = model
            .vehicles()
            .map(|v| (v.id.clone(), VehicleState::of(v)))
            .collect();

        let open_orders: BTreeMap<OrderId, OrderState> = model
            .open_orders()
            .map(|o| {
                let assigned = assigned_vehicle(model, o);
                (o.id.clone(), OrderState::of(o, assigned))
            })
            .collect();

        let canceled_orders = model.canceled_orders().map(|o| o.id.clone()).collect();

        Self { time: now, vehicles, open_orders, canceled_orders, aux }
    }

    /// The snapshot as a JSON value, for callbacks that speak raw JSON.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("snapshot serialization is infallible")
    }
}

/// Resolve which vehicle an open order is assigned to: the picking vehicle
/// once picked up, otherwise the vehicle planning the pickup.
fn assigned_vehicle(model: &Model, order: &Order) -> Option<VehicleId> {
    if order.is_picked_up() {
        return order.assigned_vehicle.clone();
    }
    for vehicle in model.vehicles() {
        let planned = vehicle
            .current_visit
            .iter()
            .chain(vehicle.next_visits.iter())
            .any(|visit| visit.pickup_list.contains(&order.id));
        if planned {
            return Some(vehicle.id.clone());
        }
    }
    None
}
