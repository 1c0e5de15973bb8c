//! A minimal end-to-end run: one depot, five customers, one truck.
//!
//! Orders arrive every 8 time units; each arrival imposes a decision point.
//! The inline "routing algorithm" assigns every unassigned order to the
//! truck if it is idle at the depot, otherwise accepts and waits for the
//! next decision point.
//!
//! ```sh
//! cargo run -p dvrp-sim --example single_trip
//! ```

use dvrp_core::{LocationId, OrderId, SimTime};
use dvrp_model::{Location, Model, Order, OrderStatus, Vehicle, VehicleStatus};
use dvrp_protocol::{Decision, DecisionResult, StateSnapshot, VehicleDecision, VisitState};
use dvrp_sim::{Effects, Simulation, VehicleHooks};

struct Truck;

impl VehicleHooks for Truck {
    fn travel_time(
        &mut self,
        _model: &Model,
        _vehicle: &dvrp_model::Vehicle,
        origin: &LocationId,
        destination: &LocationId,
    ) -> SimTime {
        if origin == destination {
            SimTime::ZERO
        } else {
            SimTime::from(10)
        }
    }

    /// Back at the depot with unpicked orders pending: ask for a new plan.
    fn on_service_finish(&mut self, model: &Model, vehicle: &dvrp_model::Vehicle, fx: &mut Effects) {
        let at_depot = vehicle.current_location().is_some_and(|l| l.as_str() == "DEPOT");
        if at_depot && model.orders().any(|o| o.is_open() && !o.is_picked_up()) {
            fx.request_routing();
        }
    }
}

fn visit(location: &str) -> VisitState {
    VisitState {
        location: location.into(),
        pickup_list: vec![],
        delivery_list: vec![],
        earliest_start_time: None,
        arrival_time: None,
        service_start_time: None,
        service_finish_time: None,
        departure_time: None,
    }
}

/// Assign all unassigned orders to the truck when it is idle at the depot.
fn demo_routing(state: &StateSnapshot) -> DecisionResult<Decision> {
    let unassigned: Vec<OrderId> = state
        .open_orders
        .values()
        .filter(|o| o.assigned_vehicle.is_none() && o.status == OrderStatus::Open)
        .map(|o| o.id.clone())
        .collect();
    if unassigned.is_empty() {
        return Ok(Decision::no_change());
    }

    let mut decision = Decision::no_change();
    for order in &unassigned {
        decision.orders.insert(
            order.clone(),
            dvrp_protocol::OrderDecision {
                status: dvrp_protocol::OrderDisposition::Accepted,
                postponed_until: None,
            },
        );
    }

    let truck = &state.vehicles["TRUCK"];
    let idle_at_depot = truck.status == VehicleStatus::Idle
        && truck
            .current_visit
            .as_ref()
            .is_some_and(|v| v.location.as_str() == "DEPOT");
    if !idle_at_depot {
        // Accept now, route at a later decision point.
        return Ok(decision);
    }

    let mut route = vec![{
        let mut pickup = visit("DEPOT");
        pickup.pickup_list = unassigned.clone();
        pickup
    }];
    for order in &unassigned {
        let mut stop = visit(state.open_orders[order].delivery_location.as_str());
        stop.delivery_list = vec![order.clone()];
        route.push(stop);
    }
    route.push(visit("DEPOT"));

    decision.vehicles.insert(
        "TRUCK".into(),
        Some(VehicleDecision { current_visit: None, next_visits: Some(route) }),
    );
    Ok(decision)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut model = Model::new();
    model.add_location(Location::new("DEPOT"))?;
    let mut orders = Vec::new();
    for i in 1..=5 {
        let customer = format!("CUSTOMER {i}");
        model.add_location(Location::new(customer.as_str()))?;
        orders.push(
            Order::new(format!("O-{i}"), "DEPOT", customer).with_release_date((i * 8) as f64),
        );
    }
    model.add_vehicle(Vehicle::new("TRUCK", "DEPOT"))?;

    let mut sim = Simulation::builder(model)
        .vehicle_hooks("TRUCK", Truck)
        .routing_callback(demo_routing)
        .build()?;
    sim.provide_orders(orders, true)?;
    sim.run()?;

    for (vehicle, stats) in sim.vehicle_statistics() {
        println!(
            "{vehicle}: moving {:.1}, waiting {:.1}, service {:.1}, idle {:.1}",
            stats.moving, stats.waiting, stats.service, stats.idle
        );
    }
    Ok(())
}
