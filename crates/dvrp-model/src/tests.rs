use dvrp_core::{OrderId, SimTime};

use crate::{
    Location, LoadingRule, Model, ModelError, Order, OrderStatus, Vehicle, VehicleStatus, Visit,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn two_stop_model() -> Model {
    let mut model = Model::new();
    model.add_location(Location::new("DEPOT")).unwrap();
    model.add_location(Location::new("CUSTOMER")).unwrap();
    model
}

fn order(id: &str) -> Order {
    Order::new(id, "DEPOT", "CUSTOMER")
}

// ── Builders ──────────────────────────────────────────────────────────────────

mod builder_tests {
    use super::*;

    #[test]
    fn duplicate_location_rejected() {
        let mut model = two_stop_model();
        assert!(matches!(
            model.add_location(Location::new("DEPOT")),
            Err(ModelError::DuplicateLocation(_))
        ));
    }

    #[test]
    fn vehicle_requires_known_initial_location() {
        let mut model = two_stop_model();
        assert!(matches!(
            model.add_vehicle(Vehicle::new("TRUCK", "NOWHERE")),
            Err(ModelError::UnknownLocation(_))
        ));
        assert!(model.add_vehicle(Vehicle::new("TRUCK", "DEPOT")).is_ok());
        assert!(matches!(
            model.add_vehicle(Vehicle::new("TRUCK", "DEPOT")),
            Err(ModelError::DuplicateVehicle(_))
        ));
    }

    #[test]
    fn order_requires_known_locations() {
        let mut model = two_stop_model();
        assert!(matches!(
            model.add_order(Order::new("O-1", "DEPOT", "NOWHERE")),
            Err(ModelError::UnknownLocation(_))
        ));
        assert!(model.add_order(order("O-1")).is_ok());
        assert!(matches!(
            model.add_order(order("O-1")),
            Err(ModelError::DuplicateOrder(_))
        ));
    }

    #[test]
    fn zero_dock_capacity_is_config_error() {
        assert!(Location::new("DEPOT").with_dock_capacity(0).is_err());
        assert!(Location::new("DEPOT").with_dock_capacity(1).is_ok());
    }

    #[test]
    fn negative_duration_is_config_error() {
        assert!(order("O-1").with_pickup_duration(-1.0).is_err());
        assert!(order("O-1").with_quantity(0.0).is_err());
        assert!(Vehicle::new("T", "DEPOT").with_capacity(-2.0).is_err());
    }
}

// ── Order lifecycle predicates ────────────────────────────────────────────────

mod order_tests {
    use super::*;

    #[test]
    fn fresh_order_is_unrequested_and_undecided() {
        let o = order("O-1");
        assert_eq!(o.status, OrderStatus::Unrequested);
        assert!(!o.is_open());
        assert!(o.can_be_rejected_or_canceled());
    }

    #[test]
    fn picked_up_order_is_open_but_locked() {
        let mut o = order("O-1");
        o.status = OrderStatus::PickedUp;
        o.pickup_time = Some(SimTime::from(10));
        assert!(o.is_open());
        assert!(!o.is_undecided());
        assert!(!o.can_be_rejected_or_canceled());
    }

    #[test]
    fn tardiness_clamps_early_delivery() {
        let mut o = order("O-1").with_due_date(20);
        o.delivery_time = Some(SimTime::from(18));
        assert_eq!(o.lateness(), Some(-2.0));
        assert_eq!(o.tardiness(), Some(0.0));
        o.delivery_time = Some(SimTime::from(25));
        assert_eq!(o.tardiness(), Some(5.0));
    }
}

// ── Invariants ────────────────────────────────────────────────────────────────

mod invariant_tests {
    use super::*;

    fn model_with_truck() -> Model {
        let mut model = two_stop_model();
        model.add_vehicle(Vehicle::new("TRUCK", "DEPOT")).unwrap();
        // Initial visit, as the simulation sets it up at start.
        let v = model.vehicle_mut("TRUCK").unwrap();
        let mut visit = Visit::new("DEPOT");
        visit.arrival_time = Some(SimTime::ZERO);
        visit.service_start_time = Some(SimTime::ZERO);
        visit.service_finish_time = Some(SimTime::ZERO);
        v.current_visit = Some(visit);
        model
    }

    #[test]
    fn clean_model_passes() {
        let model = model_with_truck();
        model.check_invariants().unwrap();
    }

    #[test]
    fn picked_up_order_must_be_carried() {
        let mut model = model_with_truck();
        model.add_order(order("O-1")).unwrap();
        model.order_mut("O-1").unwrap().status = OrderStatus::PickedUp;
        assert!(matches!(
            model.check_invariants(),
            Err(ModelError::Invariant(_))
        ));
        // Putting it on the truck fixes the violation.
        model
            .vehicle_mut("TRUCK")
            .unwrap()
            .carrying_orders
            .push(OrderId::from("O-1"));
        model.check_invariants().unwrap();
    }

    #[test]
    fn open_order_must_not_be_carried() {
        let mut model = model_with_truck();
        model.add_order(order("O-1")).unwrap();
        model.order_mut("O-1").unwrap().status = OrderStatus::Open;
        model
            .vehicle_mut("TRUCK")
            .unwrap()
            .carrying_orders
            .push(OrderId::from("O-1"));
        assert!(model.check_invariants().is_err());
    }

    #[test]
    fn capacity_overload_detected() {
        let mut model = two_stop_model();
        model
            .add_vehicle(Vehicle::new("TRUCK", "DEPOT").with_capacity(5.0).unwrap())
            .unwrap();
        let mut visit = Visit::new("DEPOT");
        visit.arrival_time = Some(SimTime::ZERO);
        visit.service_start_time = Some(SimTime::ZERO);
        visit.service_finish_time = Some(SimTime::ZERO);
        model.vehicle_mut("TRUCK").unwrap().current_visit = Some(visit);

        for (id, qty) in [("O-1", 3.0), ("O-2", 3.0)] {
            let mut o = order(id).with_quantity(qty).unwrap();
            o.status = OrderStatus::PickedUp;
            o.pickup_time = Some(SimTime::ZERO);
            model.add_order(o).unwrap();
            model
                .vehicle_mut("TRUCK")
                .unwrap()
                .carrying_orders
                .push(OrderId::from(id));
        }
        assert!(matches!(
            model.check_invariants(),
            Err(ModelError::Invariant(msg)) if msg.contains("capacity")
        ));
    }

    #[test]
    fn en_route_vehicle_shape() {
        let mut model = model_with_truck();
        let v = model.vehicle_mut("TRUCK").unwrap();
        v.status = VehicleStatus::EnRoute;
        // Still has a current visit — inconsistent.
        assert!(model.check_invariants().is_err());

        let v = model.vehicle_mut("TRUCK").unwrap();
        v.previous_visit = v.current_visit.take();
        model.check_invariants().unwrap();
    }

    #[test]
    fn lifo_stack_must_be_in_pickup_order() {
        let mut model = two_stop_model();
        model
            .add_vehicle(Vehicle::new("TRUCK", "DEPOT").with_loading_rule(LoadingRule::Lifo))
            .unwrap();
        let mut visit = Visit::new("DEPOT");
        visit.arrival_time = Some(SimTime::ZERO);
        visit.service_start_time = Some(SimTime::ZERO);
        visit.service_finish_time = Some(SimTime::ZERO);
        model.vehicle_mut("TRUCK").unwrap().current_visit = Some(visit);

        for (id, t) in [("A", 5.0), ("B", 3.0)] {
            let mut o = order(id);
            o.status = OrderStatus::PickedUp;
            o.pickup_time = Some(SimTime::from(t));
            o.assigned_vehicle = Some("TRUCK".into());
            model.add_order(o).unwrap();
        }
        // Stack lists A (picked at 5) below B (picked at 3): out of order.
        let v = model.vehicle_mut("TRUCK").unwrap();
        v.carrying_orders = vec![OrderId::from("A"), OrderId::from("B")];
        assert!(model.check_invariants().is_err());

        let v = model.vehicle_mut("TRUCK").unwrap();
        v.carrying_orders = vec![OrderId::from("B"), OrderId::from("A")];
        model.check_invariants().unwrap();
    }
}
