use dvrp_core::{LocationId, OrderId, SimTime, VehicleId};
use dvrp_model::OrderStatus;
use thiserror::Error;

/// A decision violated a validity constraint.
///
/// Any of these rejects the decision wholesale: the coordinator applies
/// nothing and the vehicles continue under their prior plans.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("malformed decision: {0}")]
    Malformed(String),

    #[error("unknown vehicle \"{0}\"")]
    UnknownVehicle(VehicleId),

    #[error("unknown order \"{0}\"")]
    UnknownOrder(OrderId),

    #[error("order {order} is {status:?}, not open for a decision")]
    OrderNotOpen { order: OrderId, status: OrderStatus },

    #[error("order {0} is already accepted and cannot be rejected or postponed")]
    OrderAlreadyAccepted(OrderId),

    #[error("postponement of order {0} has no postponed_until")]
    MissingPostponeTime(OrderId),

    #[error("order {order} postponed until {until}, which is not after {now}")]
    PostponeNotInFuture { order: OrderId, until: SimTime, now: SimTime },

    #[error("vehicle {0} has no current visit to modify")]
    NoCurrentVisit(VehicleId),

    #[error("current visit of vehicle {0} cannot change: service already started")]
    CurrentVisitStarted(VehicleId),

    #[error("current visit of vehicle {vehicle} cannot move from {at} to {to}")]
    CurrentVisitRelocated { vehicle: VehicleId, at: LocationId, to: LocationId },

    #[error("en-route vehicle {0} was given an empty route")]
    EnRouteRouteMissing(VehicleId),

    #[error("en-route vehicle {vehicle} cannot divert from {committed} to {proposed}")]
    EnRouteDiversion { vehicle: VehicleId, committed: LocationId, proposed: LocationId },

    #[error("route of vehicle {vehicle} contains {status:?} order {order}")]
    FinalizedOrderInRoute { vehicle: VehicleId, order: OrderId, status: OrderStatus },

    #[error("order {order} in pickup list of vehicle {vehicle} is not accepted")]
    PickupNotAccepted { vehicle: VehicleId, order: OrderId },

    #[error("order {order} is already picked up but planned for pickup by vehicle {vehicle}")]
    AlreadyPickedUp { vehicle: VehicleId, order: OrderId },

    #[error("order {order} planned for pickup at {at}, but its pickup location is {expected}")]
    PickupAtWrongLocation { order: OrderId, at: LocationId, expected: LocationId },

    #[error("order {order} planned for delivery at {at}, but its delivery location is {expected}")]
    DeliveryAtWrongLocation { order: OrderId, at: LocationId, expected: LocationId },

    #[error("vehicle {vehicle} cannot deliver order {order}: not on board at that point")]
    DeliveryNotOnBoard { vehicle: VehicleId, order: OrderId },

    #[error("capacity of vehicle {vehicle} exceeded at {location}: {load} > {capacity}")]
    CapacityExceeded { vehicle: VehicleId, location: LocationId, load: f64, capacity: f64 },

    #[error("LIFO violation for vehicle {vehicle} at {location}: order {order} is not on top")]
    LifoViolation { vehicle: VehicleId, location: LocationId, order: OrderId },
}

pub type DecisionResult<T> = Result<T, DecisionError>;
