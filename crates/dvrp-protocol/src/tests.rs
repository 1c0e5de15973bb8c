use dvrp_core::{OrderId, SimTime};
use dvrp_model::{LoadingRule, Location, Model, Order, OrderStatus, Vehicle, VehicleStatus, Visit};
use serde_json::json;

use crate::{
    validate_decision, Decision, DecisionError, OrderDecision, OrderDisposition, StateSnapshot,
    VehicleDecision, VisitState,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn base_model() -> Model {
    let mut model = Model::new();
    model.add_location(Location::new("DEPOT")).unwrap();
    model.add_location(Location::new("A")).unwrap();
    model.add_location(Location::new("B")).unwrap();
    model.add_vehicle(Vehicle::new("TRUCK", "DEPOT")).unwrap();
    let mut visit = Visit::new("DEPOT");
    visit.arrival_time = Some(SimTime::ZERO);
    visit.service_start_time = Some(SimTime::ZERO);
    visit.service_finish_time = Some(SimTime::ZERO);
    model.vehicle_mut("TRUCK").unwrap().current_visit = Some(visit);
    model
}

fn open_order(model: &mut Model, id: &str, delivery: &str) {
    let mut o = Order::new(id, "DEPOT", delivery);
    o.status = OrderStatus::Open;
    model.add_order(o).unwrap();
}

fn accept(model: &mut Model, id: &str) {
    model.order_mut(id).unwrap().acceptance_time = Some(SimTime::ZERO);
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

fn route_decision(vehicle: &str, route: Vec<VisitState>) -> Decision {
    let mut d = Decision::no_change();
    d.vehicles.insert(
        vehicle.into(),
        Some(VehicleDecision { current_visit: None, next_visits: Some(route) }),
    );
    d
}

fn accept_order(d: &mut Decision, id: &str) {
    d.orders.insert(
        id.into(),
        OrderDecision { status: OrderDisposition::Accepted, postponed_until: None },
    );
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

mod snapshot_tests {
    use super::*;

    #[test]
    fn shape_matches_wire_contract() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        let snapshot = StateSnapshot::capture(&model, SimTime::from(8), Default::default());
        let value = snapshot.to_value();

        assert_eq!(value["time"], json!(8.0));
        assert_eq!(value["vehicles"]["TRUCK"]["status"], json!("IDLE"));
        assert_eq!(value["vehicles"]["TRUCK"]["carrying_orders"], json!([]));
        assert_eq!(value["open_orders"]["O-1"]["status"], json!("OPEN"));
        assert_eq!(value["open_orders"]["O-1"]["assigned_vehicle"], json!(null));
        assert_eq!(value["canceled_orders"], json!([]));
        // Empty pickup/delivery lists are omitted from visits.
        assert!(value["vehicles"]["TRUCK"]["current_visit"]
            .get("pickup_list")
            .is_none());
    }

    #[test]
    fn picked_up_orders_stay_open() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        let o = model.order_mut("O-1").unwrap();
        o.status = OrderStatus::PickedUp;
        o.pickup_time = Some(SimTime::from(5));
        o.assigned_vehicle = Some("TRUCK".into());
        model
            .vehicle_mut("TRUCK")
            .unwrap()
            .carrying_orders
            .push(OrderId::from("O-1"));

        let snapshot = StateSnapshot::capture(&model, SimTime::from(6), Default::default());
        let order = &snapshot.open_orders["O-1"];
        assert_eq!(order.status, OrderStatus::PickedUp);
        assert_eq!(order.pickup_vehicle.as_ref().unwrap().as_str(), "TRUCK");
        assert_eq!(order.assigned_vehicle.as_ref().unwrap().as_str(), "TRUCK");
    }

    #[test]
    fn assignment_derived_from_planned_pickup() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        accept(&mut model, "O-1");
        model
            .vehicle_mut("TRUCK")
            .unwrap()
            .next_visits
            .push_back(Visit::new("DEPOT").with_pickups([OrderId::from("O-1")]));

        let snapshot = StateSnapshot::capture(&model, SimTime::ZERO, Default::default());
        assert_eq!(
            snapshot.open_orders["O-1"].assigned_vehicle.as_ref().unwrap().as_str(),
            "TRUCK"
        );
        assert!(snapshot.open_orders["O-1"].pickup_vehicle.is_none());
    }

    #[test]
    fn rejected_orders_disappear_canceled_listed() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        open_order(&mut model, "O-2", "B");
        model.order_mut("O-1").unwrap().status = OrderStatus::Rejected;
        model.order_mut("O-2").unwrap().status = OrderStatus::Canceled;

        let snapshot = StateSnapshot::capture(&model, SimTime::ZERO, Default::default());
        assert!(snapshot.open_orders.is_empty());
        assert_eq!(snapshot.canceled_orders, vec![OrderId::from("O-2")]);
    }
}

// ── Decision parsing ──────────────────────────────────────────────────────────

mod parse_tests {
    use super::*;

    #[test]
    fn parses_minimal_decision() {
        let d = Decision::from_value(json!({
            "vehicles": {},
            "orders": { "O-1": { "status": "rejected" } }
        }))
        .unwrap();
        assert_eq!(d.orders["O-1"].status, OrderDisposition::Rejected);
        assert!(d.vehicles.is_empty());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let d = Decision::from_value(json!({})).unwrap();
        assert!(d.is_no_change());
    }

    #[test]
    fn null_vehicle_entry_means_no_change() {
        let d = Decision::from_value(json!({
            "vehicles": { "TRUCK": null },
            "orders": {}
        }))
        .unwrap();
        assert!(d.is_no_change());
    }

    #[test]
    fn visits_accept_omitted_lists() {
        let d = Decision::from_value(json!({
            "vehicles": { "TRUCK": { "next_visits": [
                { "location": "DEPOT", "pickup_list": ["O-1"] },
                { "location": "A", "delivery_list": ["O-1"] },
                { "location": "DEPOT" }
            ]}},
            "orders": { "O-1": { "status": "accepted" } }
        }))
        .unwrap();
        let route = d.vehicles["TRUCK"].as_ref().unwrap().next_visits.as_ref().unwrap();
        assert_eq!(route.len(), 3);
        assert!(route[2].pickup_list.is_empty());
    }

    #[test]
    fn unknown_disposition_is_malformed() {
        let err = Decision::from_value(json!({
            "orders": { "O-1": { "status": "maybe" } }
        }))
        .unwrap_err();
        assert!(matches!(err, DecisionError::Malformed(_)));
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

mod validate_tests {
    use super::*;

    #[test]
    fn no_change_decision_is_valid() {
        let model = base_model();
        validate_decision(&model, SimTime::ZERO, &Decision::no_change()).unwrap();
    }

    #[test]
    fn unknown_ids_rejected() {
        let model = base_model();
        let mut d = Decision::no_change();
        accept_order(&mut d, "GHOST");
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::UnknownOrder(_))
        ));

        let d = route_decision("GHOST-TRUCK", vec![]);
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::UnknownVehicle(_))
        ));
    }

    #[test]
    fn decision_on_finalized_order_rejected() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        model.order_mut("O-1").unwrap().status = OrderStatus::Rejected;
        let mut d = Decision::no_change();
        accept_order(&mut d, "O-1");
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::OrderNotOpen { .. })
        ));
    }

    #[test]
    fn postponement_must_be_in_future() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");

        let mut d = Decision::no_change();
        d.orders.insert(
            "O-1".into(),
            OrderDecision { status: OrderDisposition::Postponed, postponed_until: None },
        );
        assert!(matches!(
            validate_decision(&model, SimTime::from(8), &d),
            Err(DecisionError::MissingPostponeTime(_))
        ));

        let mut d = Decision::no_change();
        d.orders.insert(
            "O-1".into(),
            OrderDecision {
                status: OrderDisposition::Postponed,
                postponed_until: Some(SimTime::from(8)),
            },
        );
        assert!(matches!(
            validate_decision(&model, SimTime::from(8), &d),
            Err(DecisionError::PostponeNotInFuture { .. })
        ));
    }

    #[test]
    fn accepted_order_cannot_be_rejected() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        accept(&mut model, "O-1");
        let mut d = Decision::no_change();
        d.orders.insert(
            "O-1".into(),
            OrderDecision { status: OrderDisposition::Rejected, postponed_until: None },
        );
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::OrderAlreadyAccepted(_))
        ));
    }

    #[test]
    fn started_visit_is_immutable() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        accept(&mut model, "O-1");
        // TRUCK's current DEPOT visit has service_start_time set (base_model).
        let mut d = Decision::no_change();
        d.vehicles.insert(
            "TRUCK".into(),
            Some(VehicleDecision {
                current_visit: Some(visit("DEPOT")),
                next_visits: None,
            }),
        );
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::CurrentVisitStarted(_))
        ));
    }

    #[test]
    fn unstarted_visit_lists_may_change_but_not_location() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        accept(&mut model, "O-1");
        // Waiting for service: arrived, not yet started.
        let v = model.vehicle_mut("TRUCK").unwrap();
        let mut waiting = Visit::new("DEPOT");
        waiting.arrival_time = Some(SimTime::from(1));
        v.current_visit = Some(waiting);
        v.status = VehicleStatus::WaitingForService;

        let mut ok = Decision::no_change();
        ok.vehicles.insert(
            "TRUCK".into(),
            Some(VehicleDecision {
                current_visit: Some({
                    let mut v = visit("DEPOT");
                    v.pickup_list = vec!["O-1".into()];
                    v
                }),
                next_visits: Some(vec![{
                    let mut v = visit("A");
                    v.delivery_list = vec!["O-1".into()];
                    v
                }]),
            }),
        );
        validate_decision(&model, SimTime::from(1), &ok).unwrap();

        let mut moved = Decision::no_change();
        moved.vehicles.insert(
            "TRUCK".into(),
            Some(VehicleDecision { current_visit: Some(visit("A")), next_visits: None }),
        );
        assert!(matches!(
            validate_decision(&model, SimTime::from(1), &moved),
            Err(DecisionError::CurrentVisitRelocated { .. })
        ));
    }

    #[test]
    fn en_route_destination_is_pinned() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        accept(&mut model, "O-1");
        let v = model.vehicle_mut("TRUCK").unwrap();
        v.status = VehicleStatus::EnRoute;
        v.previous_visit = v.current_visit.take();
        v.next_visits
            .push_back(Visit::new("A").with_deliveries([OrderId::from("O-1")]));
        let o = model.order_mut("O-1").unwrap();
        o.status = OrderStatus::PickedUp;
        o.pickup_time = Some(SimTime::ZERO);
        o.assigned_vehicle = Some("TRUCK".into());
        model
            .vehicle_mut("TRUCK")
            .unwrap()
            .carrying_orders
            .push("O-1".into());

        // Keeping the committed destination but extending the route is fine.
        let mut keep = visit("A");
        keep.delivery_list = vec!["O-1".into()];
        validate_decision(
            &model,
            SimTime::ZERO,
            &route_decision("TRUCK", vec![keep, visit("DEPOT")]),
        )
        .unwrap();

        // Empty route while en route is rejected.
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &route_decision("TRUCK", vec![])),
            Err(DecisionError::EnRouteRouteMissing(_))
        ));

        // Diverting to another location is rejected.
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &route_decision("TRUCK", vec![visit("B")])),
            Err(DecisionError::EnRouteDiversion { .. })
        ));
    }

    #[test]
    fn pickup_requires_acceptance() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        let mut pickup = visit("DEPOT");
        pickup.pickup_list = vec!["O-1".into()];
        let d = route_decision("TRUCK", vec![pickup]);
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::PickupNotAccepted { .. })
        ));

        // Accepting in the same decision makes it valid.
        let mut pickup = visit("DEPOT");
        pickup.pickup_list = vec!["O-1".into()];
        let mut deliver = visit("A");
        deliver.delivery_list = vec!["O-1".into()];
        let mut d = route_decision("TRUCK", vec![pickup, deliver]);
        accept_order(&mut d, "O-1");
        validate_decision(&model, SimTime::ZERO, &d).unwrap();
    }

    #[test]
    fn pickup_location_must_match() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        let mut pickup = visit("B");
        pickup.pickup_list = vec!["O-1".into()];
        let mut d = route_decision("TRUCK", vec![pickup]);
        accept_order(&mut d, "O-1");
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::PickupAtWrongLocation { .. })
        ));
    }

    #[test]
    fn delivery_requires_on_board_or_earlier_pickup() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        accept(&mut model, "O-1");
        let mut deliver = visit("A");
        deliver.delivery_list = vec!["O-1".into()];
        let d = route_decision("TRUCK", vec![deliver]);
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::DeliveryNotOnBoard { .. })
        ));
    }

    #[test]
    fn rejected_order_must_leave_all_routes() {
        let mut model = base_model();
        open_order(&mut model, "O-1", "A");
        // TRUCK already plans to pick O-1 up; the decision rejects O-1 but
        // does not touch TRUCK.
        model
            .vehicle_mut("TRUCK")
            .unwrap()
            .next_visits
            .push_back(Visit::new("DEPOT").with_pickups([OrderId::from("O-1")]));
        let mut d = Decision::no_change();
        d.orders.insert(
            "O-1".into(),
            OrderDecision { status: OrderDisposition::Rejected, postponed_until: None },
        );
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::FinalizedOrderInRoute { .. })
        ));
    }

    #[test]
    fn capacity_checked_along_route_prefix() {
        let mut model = base_model();
        model.vehicle_mut("TRUCK").unwrap().capacity = Some(5.0);
        for (id, qty) in [("O-1", 3.0), ("O-2", 4.0)] {
            let mut o = Order::new(id, "DEPOT", "A").with_quantity(qty).unwrap();
            o.status = OrderStatus::Open;
            model.add_order(o).unwrap();
        }

        // Both picked up at the depot before any delivery: 7 > 5.
        let mut pickup = visit("DEPOT");
        pickup.pickup_list = vec!["O-1".into(), "O-2".into()];
        let mut deliver = visit("A");
        deliver.delivery_list = vec!["O-1".into(), "O-2".into()];
        let mut d = route_decision("TRUCK", vec![pickup, deliver]);
        accept_order(&mut d, "O-1");
        accept_order(&mut d, "O-2");
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::CapacityExceeded { .. })
        ));

        // Interleaved pickup/delivery keeps every prefix within capacity.
        let mut p1 = visit("DEPOT");
        p1.pickup_list = vec!["O-1".into()];
        let mut d1 = visit("A");
        d1.delivery_list = vec!["O-1".into()];
        let mut p2 = visit("DEPOT");
        p2.pickup_list = vec!["O-2".into()];
        let mut d2 = visit("A");
        d2.delivery_list = vec!["O-2".into()];
        let mut d = route_decision("TRUCK", vec![p1, d1, p2, d2]);
        accept_order(&mut d, "O-1");
        accept_order(&mut d, "O-2");
        validate_decision(&model, SimTime::ZERO, &d).unwrap();
    }

    #[test]
    fn lifo_requires_stack_order() {
        let mut model = base_model();
        model.vehicle_mut("TRUCK").unwrap().loading_rule = LoadingRule::Lifo;
        // A picked up before B; both still on board.
        for (id, t) in [("A-ORD", 1.0), ("B-ORD", 2.0)] {
            let mut o = Order::new(id, "DEPOT", "A");
            o.status = OrderStatus::PickedUp;
            o.pickup_time = Some(SimTime::from(t));
            o.acceptance_time = Some(SimTime::ZERO);
            o.assigned_vehicle = Some("TRUCK".into());
            model.add_order(o).unwrap();
        }
        let v = model.vehicle_mut("TRUCK").unwrap();
        v.carrying_orders = vec!["A-ORD".into(), "B-ORD".into()];

        // Delivering A (below B in the stack) first violates LIFO.
        let mut first = visit("A");
        first.delivery_list = vec!["A-ORD".into()];
        let mut second = visit("A");
        second.delivery_list = vec!["B-ORD".into()];
        let d = route_decision("TRUCK", vec![first, second]);
        assert!(matches!(
            validate_decision(&model, SimTime::ZERO, &d),
            Err(DecisionError::LifoViolation { .. })
        ));

        // B first, then A, is the legal unload order.
        let mut first = visit("A");
        first.delivery_list = vec!["B-ORD".into()];
        let mut second = visit("A");
        second.delivery_list = vec!["A-ORD".into()];
        let d = route_decision("TRUCK", vec![first, second]);
        validate_decision(&model, SimTime::ZERO, &d).unwrap();

        // Both in one visit is fine: order within a stop is unconstrained.
        let mut both = visit("A");
        both.delivery_list = vec!["A-ORD".into(), "B-ORD".into()];
        let d = route_decision("TRUCK", vec![both]);
        validate_decision(&model, SimTime::ZERO, &d).unwrap();
    }
}
