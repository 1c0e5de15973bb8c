//! Decision validation.
//!
//! A decision is checked against the live model in three passes:
//!
//! 1. **Order dispositions** — every decided order is open and undecided,
//!    postponements carry a future timestamp, accepted orders stay accepted.
//! 2. **Per-vehicle route walk** — commitment rules (started visit immutable,
//!    en-route destination pinned), list membership (no finalized orders,
//!    pickups accepted and not yet picked, locations match), capacity along
//!    every prefix, and the LIFO stack discipline.
//! 3. **Cross-vehicle consistency** — an order rejected by this decision must
//!    not remain in any vehicle's effective route.
//!
//! The first violation rejects the whole decision; nothing is applied.

use std::collections::BTreeSet;

use dvrp_core::{LocationId, OrderId, SimTime};
use dvrp_model::{LoadingRule, Model, Order, OrderStatus, Vehicle, Visit};

use crate::decision::{Decision, OrderDisposition, VehicleDecision};
use crate::error::{DecisionError, DecisionResult};
use crate::state::VisitState;

/// Validate `decision` against `model` at instant `now`.
pub fn validate_decision(model: &Model, now: SimTime, decision: &Decision) -> DecisionResult<()> {
    let accepted = check_order_dispositions(model, now, decision)?;
    let rejected_now: BTreeSet<&OrderId> = decision
        .orders
        .iter()
        .filter(|(_, d)| d.status == OrderDisposition::Rejected)
        .map(|(id, _)| id)
        .collect();

    for (vehicle_id, vehicle_decision) in &decision.vehicles {
        let vehicle = model
            .vehicle(vehicle_id.as_str())
            .ok_or_else(|| DecisionError::UnknownVehicle(vehicle_id.clone()))?;
        let Some(vd) = vehicle_decision else {
            continue; // explicit null: no change
        };
        check_commitment_rules(vehicle, vd)?;
        let stops = effective_route(vehicle, Some(vd));
        walk_route(model, vehicle, &stops, &accepted, &rejected_now)?;
    }

    // An order rejected by this decision must not survive in any route,
    // including routes of vehicles the decision does not touch.
    if !rejected_now.is_empty() {
        for vehicle in model.vehicles() {
            let vd = decision.vehicles.get(&vehicle.id).and_then(|d| d.as_ref());
            let stops = effective_route(vehicle, vd);
            for stop in stops.iter().filter(|s| !s.finished) {
                for order_id in stop.pickups.iter().chain(&stop.deliveries) {
                    if rejected_now.contains(order_id) {
                        return Err(DecisionError::FinalizedOrderInRoute {
                            vehicle: vehicle.id.clone(),
                            order: order_id.clone(),
                            status: OrderStatus::Rejected,
                        });
                    }
                }
            }
        }
    }

    Ok(())
}

// ── Pass 1: order dispositions ────────────────────────────────────────────────

/// Returns the set of orders that count as accepted after this decision.
fn check_order_dispositions<'a>(
    model: &'a Model,
    now: SimTime,
    decision: &'a Decision,
) -> DecisionResult<BTreeSet<&'a OrderId>> {
    let mut accepted: BTreeSet<&OrderId> = model
        .orders()
        .filter(|o| o.is_accepted())
        .map(|o| &o.id)
        .collect();

    for (order_id, od) in &decision.orders {
        let order = model
            .order(order_id.as_str())
            .ok_or_else(|| DecisionError::UnknownOrder(order_id.clone()))?;

        if !matches!(order.status, OrderStatus::Open | OrderStatus::Postponed) {
            return Err(DecisionError::OrderNotOpen {
                order: order_id.clone(),
                status: order.status,
            });
        }

        match od.status {
            OrderDisposition::Accepted => {
                accepted.insert(&order.id);
            }
            OrderDisposition::Rejected | OrderDisposition::Postponed if order.is_accepted() => {
                return Err(DecisionError::OrderAlreadyAccepted(order_id.clone()));
            }
            OrderDisposition::Rejected => {}
            OrderDisposition::Postponed => {
                let until = od
                    .postponed_until
                    .ok_or_else(|| DecisionError::MissingPostponeTime(order_id.clone()))?;
                if until <= now {
                    return Err(DecisionError::PostponeNotInFuture {
                        order: order_id.clone(),
                        until,
                        now,
                    });
                }
            }
        }
    }

    Ok(accepted)
}

// ── Pass 2: per-vehicle checks ────────────────────────────────────────────────

fn check_commitment_rules(vehicle: &Vehicle, vd: &VehicleDecision) -> DecisionResult<()> {
    if let Some(new_current) = &vd.current_visit {
        let current = vehicle
            .current_visit
            .as_ref()
            .ok_or_else(|| DecisionError::NoCurrentVisit(vehicle.id.clone()))?;
        if current.service_started() {
            return Err(DecisionError::CurrentVisitStarted(vehicle.id.clone()));
        }
        if new_current.location != current.location {
            return Err(DecisionError::CurrentVisitRelocated {
                vehicle: vehicle.id.clone(),
                at: current.location.clone(),
                to: new_current.location.clone(),
            });
        }
    }

    if let Some(route) = &vd.next_visits {
        if vehicle.is_en_route() {
            let committed = vehicle
                .next_location()
                .cloned()
                .ok_or_else(|| DecisionError::EnRouteRouteMissing(vehicle.id.clone()))?;
            let proposed = route
                .first()
                .ok_or_else(|| DecisionError::EnRouteRouteMissing(vehicle.id.clone()))?;
            if proposed.location != committed {
                return Err(DecisionError::EnRouteDiversion {
                    vehicle: vehicle.id.clone(),
                    committed,
                    proposed: proposed.location.clone(),
                });
            }
        }
    }

    Ok(())
}

/// One stop of the route a vehicle would execute if the decision applied.
struct Stop {
    location: LocationId,
    pickups: Vec<OrderId>,
    deliveries: Vec<OrderId>,
    started: bool,
    finished: bool,
}

impl Stop {
    fn of_visit(visit: &Visit) -> Self {
        Self {
            location: visit.location.clone(),
            pickups: visit.pickup_list.clone(),
            deliveries: visit.delivery_list.clone(),
            started: visit.service_started(),
            finished: visit.service_finish_time.is_some(),
        }
    }

    fn of_state(state: &VisitState) -> Self {
        Self {
            location: state.location.clone(),
            pickups: state.pickup_list.clone(),
            deliveries: state.delivery_list.clone(),
            started: false,
            finished: false,
        }
    }
}

/// The route the vehicle would follow after applying `vd` (current visit
/// first, when one exists).
fn effective_route(vehicle: &Vehicle, vd: Option<&VehicleDecision>) -> Vec<Stop> {
    let mut stops = Vec::new();

    match vd.and_then(|d| d.current_visit.as_ref()) {
        Some(replacement) => stops.push(Stop::of_state(replacement)),
        None => {
            if let Some(current) = &vehicle.current_visit {
                stops.push(Stop::of_visit(current));
            }
        }
    }

    match vd.and_then(|d| d.next_visits.as_ref()) {
        Some(route) => stops.extend(route.iter().map(Stop::of_state)),
        None => stops.extend(vehicle.next_visits.iter().map(Stop::of_visit)),
    }

    stops
}

fn walk_route(
    model: &Model,
    vehicle: &Vehicle,
    stops: &[Stop],
    accepted: &BTreeSet<&OrderId>,
    rejected_now: &BTreeSet<&OrderId>,
) -> DecisionResult<()> {
    // On-board orders in loading order; the LIFO stack when applicable.
    let mut onboard: Vec<OrderId> = vehicle.carrying_orders.clone();
    let lifo = vehicle.loading_rule == LoadingRule::Lifo;

    for stop in stops {
        if stop.finished {
            continue; // fully executed; already reflected in carrying_orders
        }

        if stop.started {
            // Committed and partially executed: project the remaining steps
            // without re-validating them.
            for order_id in &stop.deliveries {
                if !order_at(model, order_id)?.is_delivered() {
                    onboard.retain(|o| o != order_id);
                }
            }
            for order_id in &stop.pickups {
                if !order_at(model, order_id)?.is_picked_up() {
                    onboard.push(order_id.clone());
                }
            }
        } else {
            // Deliveries first (the default service order).
            if lifo && !stop.deliveries.is_empty() {
                check_lifo_top(vehicle, stop, &onboard)?;
            }
            for order_id in &stop.deliveries {
                let order = order_at(model, order_id)?;
                check_not_finalized(vehicle, order, rejected_now)?;
                if order.delivery_location != stop.location {
                    return Err(DecisionError::DeliveryAtWrongLocation {
                        order: order_id.clone(),
                        at: stop.location.clone(),
                        expected: order.delivery_location.clone(),
                    });
                }
                let Some(pos) = onboard.iter().position(|o| o == order_id) else {
                    return Err(DecisionError::DeliveryNotOnBoard {
                        vehicle: vehicle.id.clone(),
                        order: order_id.clone(),
                    });
                };
                onboard.remove(pos);
            }

            for order_id in &stop.pickups {
                let order = order_at(model, order_id)?;
                check_not_finalized(vehicle, order, rejected_now)?;
                if !accepted.contains(order_id) {
                    return Err(DecisionError::PickupNotAccepted {
                        vehicle: vehicle.id.clone(),
                        order: order_id.clone(),
                    });
                }
                if order.is_picked_up() || onboard.contains(order_id) {
                    return Err(DecisionError::AlreadyPickedUp {
                        vehicle: vehicle.id.clone(),
                        order: order_id.clone(),
                    });
                }
                if order.pickup_location != stop.location {
                    return Err(DecisionError::PickupAtWrongLocation {
                        order: order_id.clone(),
                        at: stop.location.clone(),
                        expected: order.pickup_location.clone(),
                    });
                }
                onboard.push(order_id.clone());
            }
        }

        if let Some(capacity) = vehicle.capacity {
            let load: f64 = onboard
                .iter()
                .map(|id| model.order(id.as_str()).map_or(0.0, |o| o.load()))
                .sum();
            if load > capacity + 1e-6 {
                return Err(DecisionError::CapacityExceeded {
                    vehicle: vehicle.id.clone(),
                    location: stop.location.clone(),
                    load,
                    capacity,
                });
            }
        }
    }

    Ok(())
}

fn order_at<'a>(model: &'a Model, id: &OrderId) -> DecisionResult<&'a Order> {
    model
        .order(id.as_str())
        .ok_or_else(|| DecisionError::UnknownOrder(id.clone()))
}

fn check_not_finalized(
    vehicle: &Vehicle,
    order: &Order,
    rejected_now: &BTreeSet<&OrderId>,
) -> DecisionResult<()> {
    let status = match order.status {
        OrderStatus::Canceled | OrderStatus::Rejected => order.status,
        _ if rejected_now.contains(&order.id) => OrderStatus::Rejected,
        _ => return Ok(()),
    };
    Err(DecisionError::FinalizedOrderInRoute {
        vehicle: vehicle.id.clone(),
        order: order.id.clone(),
        status,
    })
}

/// Under LIFO the orders unloaded at a stop must be exactly the top of the
/// stack (in any order within the stop).
fn check_lifo_top(vehicle: &Vehicle, stop: &Stop, onboard: &[OrderId]) -> DecisionResult<()> {
    let unload: BTreeSet<&OrderId> = stop.deliveries.iter().collect();
    let top: BTreeSet<&OrderId> = onboard.iter().rev().take(unload.len()).collect();
    if let Some(order) = unload.difference(&top).next() {
        return Err(DecisionError::LifoViolation {
            vehicle: vehicle.id.clone(),
            location: stop.location.clone(),
            order: (*order).clone(),
        });
    }
    Ok(())
}
