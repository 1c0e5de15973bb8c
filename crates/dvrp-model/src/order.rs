//! Orders.

use dvrp_core::{ConfigError, LocationId, OrderId, SimTime, VehicleId};

// ── OrderStatus ───────────────────────────────────────────────────────────────

/// Lifecycle state of an order.
///
/// ```text
/// UNREQUESTED ──release──▶ OPEN ──┬──▶ REJECTED   (terminal)
///                           │ ▲   ├──▶ CANCELED   (terminal)
///                           │ │   └──▶ PICKED_UP ──▶ DELIVERED (terminal)
///                           ▼ │
///                       POSTPONED   (back to OPEN on acceptance)
/// ```
///
/// Acceptance does not change the status: an accepted order stays `OPEN`
/// (with `acceptance_time` set) until a vehicle picks it up.  A postponed
/// order stays `POSTPONED` until a decision resolves it; the expiry of its
/// deadline only imposes a new decision point.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Unrequested,
    Open,
    Postponed,
    Rejected,
    Canceled,
    PickedUp,
    Delivered,
}

// ── Order ─────────────────────────────────────────────────────────────────────

/// A pickup-and-delivery request.
///
/// Time-window bounds and durations are immutable problem data; everything in
/// the "set by the simulator" block below is mutated by the simulation as the
/// order moves through its lifecycle.
#[derive(Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub pickup_location: LocationId,
    pub delivery_location: LocationId,

    /// Instant at which the order becomes known to the system.
    pub release_date: SimTime,
    pub due_date: Option<SimTime>,

    pub earliest_service_start_pickup: Option<SimTime>,
    pub latest_service_start_pickup: Option<SimTime>,
    pub earliest_service_start_delivery: Option<SimTime>,
    pub latest_service_start_delivery: Option<SimTime>,

    pub pickup_duration: SimTime,
    pub delivery_duration: SimTime,

    /// Optional positive quantity, counted against vehicle capacity.
    pub quantity: Option<f64>,

    // ── Set by the simulator ──────────────────────────────────────────────
    pub status: OrderStatus,
    pub assigned_vehicle: Option<VehicleId>,

    pub acceptance_time: Option<SimTime>,
    pub rejection_time: Option<SimTime>,
    pub cancellation_time: Option<SimTime>,
    pub postponed_until: Option<SimTime>,

    pub pickup_time: Option<SimTime>,
    pub delivery_time: Option<SimTime>,

    /// Set once service of a visit picking this order up has started; from
    /// then on the order can no longer be rejected or canceled.
    pub reject_locked: bool,
}

impl Order {
    pub fn new(
        id: impl Into<OrderId>,
        pickup_location: impl Into<LocationId>,
        delivery_location: impl Into<LocationId>,
    ) -> Self {
        Self {
            id: id.into(),
            pickup_location: pickup_location.into(),
            delivery_location: delivery_location.into(),
            release_date: SimTime::ZERO,
            due_date: None,
            earliest_service_start_pickup: None,
            latest_service_start_pickup: None,
            earliest_service_start_delivery: None,
            latest_service_start_delivery: None,
            pickup_duration: SimTime::ZERO,
            delivery_duration: SimTime::ZERO,
            quantity: None,
            status: OrderStatus::Unrequested,
            assigned_vehicle: None,
            acceptance_time: None,
            rejection_time: None,
            cancellation_time: None,
            postponed_until: None,
            pickup_time: None,
            delivery_time: None,
            reject_locked: false,
        }
    }

    // ── Builder-style setters for problem data ────────────────────────────

    pub fn with_release_date(mut self, at: impl Into<SimTime>) -> Self {
        self.release_date = at.into();
        self
    }

    pub fn with_due_date(mut self, at: impl Into<SimTime>) -> Self {
        self.due_date = Some(at.into());
        self
    }

    pub fn with_pickup_window(
        mut self,
        earliest: Option<SimTime>,
        latest: Option<SimTime>,
    ) -> Self {
        self.earliest_service_start_pickup = earliest;
        self.latest_service_start_pickup = latest;
        self
    }

    pub fn with_delivery_window(
        mut self,
        earliest: Option<SimTime>,
        latest: Option<SimTime>,
    ) -> Self {
        self.earliest_service_start_delivery = earliest;
        self.latest_service_start_delivery = latest;
        self
    }

    pub fn with_pickup_duration(mut self, d: f64) -> Result<Self, ConfigError> {
        self.pickup_duration = SimTime::duration(d)?;
        Ok(self)
    }

    pub fn with_delivery_duration(mut self, d: f64) -> Result<Self, ConfigError> {
        self.delivery_duration = SimTime::duration(d)?;
        Ok(self)
    }

    pub fn with_quantity(mut self, quantity: f64) -> Result<Self, ConfigError> {
        if !(quantity > 0.0) {
            return Err(ConfigError::NonPositiveQuantity(quantity));
        }
        self.quantity = Some(quantity);
        Ok(self)
    }

    // ── Status predicates ─────────────────────────────────────────────────

    /// Requested and not yet rejected, canceled, or delivered.  Note that a
    /// picked-up order is still open: it appears in state snapshots until it
    /// reaches its delivery location.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Open | OrderStatus::Postponed | OrderStatus::PickedUp
        )
    }

    /// Open and awaiting an accept/reject/postpone decision.
    pub fn is_undecided(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::Postponed)
            && self.acceptance_time.is_none()
    }

    pub fn is_accepted(&self) -> bool {
        self.acceptance_time.is_some()
    }

    pub fn is_picked_up(&self) -> bool {
        self.pickup_time.is_some()
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Rejected | OrderStatus::Canceled | OrderStatus::Delivered
        )
    }

    pub fn can_be_rejected_or_canceled(&self) -> bool {
        !self.reject_locked && !self.is_picked_up() && !self.is_delivered()
    }

    /// Quantity counted against vehicle capacity (0 when unset).
    pub fn load(&self) -> f64 {
        self.quantity.unwrap_or(0.0)
    }

    // ── Statistics ────────────────────────────────────────────────────────

    /// `delivery_time - due_date`, if both are known.
    pub fn lateness(&self) -> Option<f64> {
        Some(self.delivery_time?.value() - self.due_date?.value())
    }

    /// Positive part of the lateness.
    pub fn tardiness(&self) -> Option<f64> {
        self.lateness().map(|l| l.max(0.0))
    }
}
