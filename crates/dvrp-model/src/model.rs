//! The `Model` container.

use std::collections::BTreeMap;

use dvrp_core::{LocationId, OrderId, VehicleId};

use crate::error::{ModelError, ModelResult};
use crate::location::Location;
use crate::order::{Order, OrderStatus};
use crate::vehicle::{Vehicle, VehicleStatus};

/// Owns every location, vehicle and order of one simulation run.
///
/// Cross-entity references are ids; this container is the lookup table that
/// resolves them.  Multiple models are fully independent: there is no global
/// state anywhere in the framework.
#[derive(Default)]
pub struct Model {
    locations: BTreeMap<LocationId, Location>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    orders: BTreeMap<OrderId, Order>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Builders ──────────────────────────────────────────────────────────

    pub fn add_location(&mut self, location: Location) -> ModelResult<()> {
        if self.locations.contains_key(&location.id) {
            return Err(ModelError::DuplicateLocation(location.id));
        }
        self.locations.insert(location.id.clone(), location);
        Ok(())
    }

    /// Add a vehicle; its initial location must already be registered.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> ModelResult<()> {
        if self.vehicles.contains_key(&vehicle.id) {
            return Err(ModelError::DuplicateVehicle(vehicle.id));
        }
        if !self.locations.contains_key(&vehicle.initial_location) {
            return Err(ModelError::UnknownLocation(vehicle.initial_location));
        }
        self.vehicles.insert(vehicle.id.clone(), vehicle);
        Ok(())
    }

    /// Register an order; both of its locations must already exist.
    ///
    /// Registration does not release the order — it stays `UNREQUESTED`
    /// until the simulation requests it at its release date.
    pub fn add_order(&mut self, order: Order) -> ModelResult<()> {
        if self.orders.contains_key(&order.id) {
            return Err(ModelError::DuplicateOrder(order.id));
        }
        if !self.locations.contains_key(&order.pickup_location) {
            return Err(ModelError::UnknownLocation(order.pickup_location));
        }
        if !self.locations.contains_key(&order.delivery_location) {
            return Err(ModelError::UnknownLocation(order.delivery_location));
        }
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn vehicle_mut(&mut self, id: &str) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id)
    }

    pub fn order(&self, id: &str) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn order_mut(&mut self, id: &str) -> Option<&mut Order> {
        self.orders.get_mut(id)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    pub fn vehicles_mut(&mut self) -> impl Iterator<Item = &mut Vehicle> {
        self.vehicles.values_mut()
    }

    pub fn vehicle_ids(&self) -> impl Iterator<Item = &VehicleId> {
        self.vehicles.keys()
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn orders_mut(&mut self) -> impl Iterator<Item = &mut Order> {
        self.orders.values_mut()
    }

    /// Requested orders not yet rejected, canceled, or delivered.
    pub fn open_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.is_open())
    }

    pub fn canceled_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders
            .values()
            .filter(|o| o.status == OrderStatus::Canceled)
    }

    /// `true` once every registered order is rejected, canceled or delivered.
    pub fn all_orders_finalized(&self) -> bool {
        self.orders.values().all(|o| o.is_terminal())
    }

    // ── Invariant checks ──────────────────────────────────────────────────

    /// Verify the cross-entity invariants that must hold between any two
    /// events.  Intended for tests and debug assertions; returns the first
    /// violation found.
    pub fn check_invariants(&self) -> ModelResult<()> {
        self.check_carrier_uniqueness()?;
        for vehicle in self.vehicles.values() {
            self.check_vehicle_shape(vehicle)?;
            self.check_vehicle_capacity(vehicle)?;
            self.check_lifo_history(vehicle)?;
        }
        Ok(())
    }

    /// Every `PICKED_UP` order is on exactly one vehicle.
    fn check_carrier_uniqueness(&self) -> ModelResult<()> {
        for order in self.orders.values() {
            let carriers = self
                .vehicles
                .values()
                .filter(|v| v.carrying_orders.contains(&order.id))
                .count();
            let expected = usize::from(order.status == OrderStatus::PickedUp);
            if carriers != expected {
                return Err(ModelError::Invariant(format!(
                    "order {} has status {:?} but is carried by {} vehicle(s)",
                    order.id, order.status, carriers
                )));
            }
        }
        Ok(())
    }

    /// `status` agrees with which of `previous_visit`/`current_visit` is set
    /// and with the timestamps on the current visit.
    fn check_vehicle_shape(&self, vehicle: &Vehicle) -> ModelResult<()> {
        let fail = |msg: String| Err(ModelError::Invariant(msg));
        match vehicle.status {
            VehicleStatus::EnRoute => {
                if vehicle.current_visit.is_some() || vehicle.previous_visit.is_none() {
                    return fail(format!(
                        "en-route vehicle {} must have a previous visit and no current visit",
                        vehicle.id
                    ));
                }
            }
            VehicleStatus::WaitingForService => {
                let Some(current) = &vehicle.current_visit else {
                    return fail(format!("waiting vehicle {} has no current visit", vehicle.id));
                };
                if current.arrival_time.is_none() || current.service_started() {
                    return fail(format!(
                        "waiting vehicle {} has inconsistent visit timestamps",
                        vehicle.id
                    ));
                }
            }
            VehicleStatus::UnderService => {
                let Some(current) = &vehicle.current_visit else {
                    return fail(format!("serving vehicle {} has no current visit", vehicle.id));
                };
                if !current.service_started() || current.service_finish_time.is_some() {
                    return fail(format!(
                        "serving vehicle {} has inconsistent visit timestamps",
                        vehicle.id
                    ));
                }
            }
            VehicleStatus::Idle => {
                // Idle with a current visit is the normal between-visit state;
                // idle without one only occurs after end-of-run finalization.
            }
        }
        Ok(())
    }

    /// Carried quantity never exceeds a finite capacity.
    fn check_vehicle_capacity(&self, vehicle: &Vehicle) -> ModelResult<()> {
        let Some(capacity) = vehicle.capacity else {
            return Ok(());
        };
        let carried = vehicle.carried_load(|id| {
            self.orders.get(id.as_str()).map_or(0.0, |o| o.load())
        });
        if carried > capacity + 1e-6 {
            return Err(ModelError::Invariant(format!(
                "vehicle {} carries {} over capacity {}",
                vehicle.id, carried, capacity
            )));
        }
        Ok(())
    }

    /// Under LIFO: the on-board stack is in pickup order, and no delivered
    /// order overtook one that is still on board.
    fn check_lifo_history(&self, vehicle: &Vehicle) -> ModelResult<()> {
        if vehicle.loading_rule != crate::vehicle::LoadingRule::Lifo {
            return Ok(());
        }
        let pickup_of = |id: &OrderId| {
            self.orders
                .get(id.as_str())
                .and_then(|o| o.pickup_time)
        };
        let stack: Vec<_> = vehicle
            .carrying_orders
            .iter()
            .filter_map(pickup_of)
            .collect();
        if stack.windows(2).any(|w| w[0] > w[1]) {
            return Err(ModelError::Invariant(format!(
                "vehicle {} LIFO stack is not in pickup order",
                vehicle.id
            )));
        }
        // A delivered order picked up before a still-carried one must have
        // left the vehicle before that carried order came aboard.
        for delivered in self.orders.values().filter(|o| {
            o.is_delivered() && o.assigned_vehicle.as_ref() == Some(&vehicle.id)
        }) {
            let (Some(d_pick), Some(d_deliver)) =
                (delivered.pickup_time, delivered.delivery_time)
            else {
                continue;
            };
            for &c_pick in &stack {
                if d_pick < c_pick && d_deliver > c_pick {
                    return Err(ModelError::Invariant(format!(
                        "vehicle {} delivered {} under a still-carried order",
                        vehicle.id, delivered.id
                    )));
                }
            }
        }
        Ok(())
    }
}
