//! The `Simulation` struct, its builder, and the event dispatch loop.

use std::collections::BTreeMap;

use dvrp_core::{ConfigError, LocationId, OrderId, SimTime, VehicleId};
use dvrp_engine::{EventQueue, Resource, TimerId};
use dvrp_model::{Model, ModelError, Order, OrderStatus, VehicleStatus, Visit};
use dvrp_protocol::DecisionError;

use crate::callback::RoutingCallback;
use crate::error::{SimError, SimResult};
use crate::hooks::{Effects, ModelHooks, NoopHooks, VehicleHooks};
use crate::observer::{LogObserver, SimObserver};
use crate::stats::{OrderStats, VehicleStats};
use crate::vehicle_exec::VehicleRuntime;

// ── Wake ──────────────────────────────────────────────────────────────────────

/// What a popped event means.  The payload of the engine's `EventQueue`.
pub(crate) enum Wake {
    /// Resume a vehicle state machine (timer fired, dock granted, or woken
    /// after a decision).
    Vehicle(VehicleId),
    /// Run a routing cycle.
    Coordinator,
    /// An order reaches its release date.
    OrderRelease { order: OrderId, decision_point: bool },
    /// A postponement ran out.
    PostponementExpiry(OrderId),
    /// A scheduled customer cancellation.
    OrderCancel(OrderId),
    /// A scheduled order modification notice.
    OrderUpdate(OrderId),
    /// The periodic updater's next decision point.
    PeriodicUpdate,
}

pub(crate) struct PeriodicUpdater {
    pub(crate) period: SimTime,
    pub(crate) stop_after_last_order_request: bool,
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// A single simulation run: the model, the future-event set, the per-vehicle
/// execution machines, and the decision coordinator.
///
/// Construct via [`Simulation::builder`], seed orders with
/// [`provide_orders`](Simulation::provide_orders), then call
/// [`run`](Simulation::run).
pub struct Simulation {
    pub(crate) model: Model,
    pub(crate) now: SimTime,
    pub(crate) queue: EventQueue<Wake>,

    /// Live dock occupancy per bounded location.
    pub(crate) docks: BTreeMap<LocationId, Resource<VehicleId>>,
    pub(crate) runtimes: BTreeMap<VehicleId, VehicleRuntime>,

    pub(crate) vehicle_hooks: BTreeMap<VehicleId, Box<dyn VehicleHooks>>,
    pub(crate) model_hooks: Box<dyn ModelHooks>,
    pub(crate) routing: Option<Box<dyn RoutingCallback>>,
    pub(crate) observer: Box<dyn SimObserver>,
    /// Free-form data copied into every state snapshot.
    pub(crate) aux: serde_json::Map<String, serde_json::Value>,

    // ── Coordinator state ─────────────────────────────────────────────────
    pub(crate) routing_requested: bool,
    pub(crate) coordinator_scheduled: bool,
    pub(crate) routing_in_progress: bool,
    pub(crate) epoch: u64,
    pub(crate) last_decision_error: Option<DecisionError>,
    pub(crate) rejected_decisions: u64,

    // ── Order timers ──────────────────────────────────────────────────────
    pub(crate) postpone_timers: BTreeMap<OrderId, TimerId>,
    pub(crate) periodic: Option<PeriodicUpdater>,
    pub(crate) pending_releases: usize,

    pub(crate) started: bool,
    pub(crate) finished: bool,
}

impl Simulation {
    pub fn builder(model: Model) -> SimulationBuilder {
        SimulationBuilder::new(model)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of routing cycles run so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The most recent decision rejection, if any.
    pub fn last_decision_error(&self) -> Option<&DecisionError> {
        self.last_decision_error.as_ref()
    }

    pub fn rejected_decisions(&self) -> u64 {
        self.rejected_decisions
    }

    /// `true` once every scheduled order has reached its release date.
    pub fn all_orders_released(&self) -> bool {
        self.pending_releases == 0
    }

    pub fn vehicle_statistics(&self) -> BTreeMap<VehicleId, VehicleStats> {
        self.runtimes
            .iter()
            .map(|(id, rt)| (id.clone(), rt.stats))
            .collect()
    }

    pub fn order_statistics(&self) -> BTreeMap<OrderId, OrderStats> {
        self.model
            .orders()
            .map(|o| {
                let tardiness = o.tardiness().unwrap_or(0.0);
                (o.id.clone(), OrderStats { tardiness })
            })
            .collect()
    }

    // ── Order entry points ────────────────────────────────────────────────

    /// Register `orders` and schedule each release, in release-date order.
    ///
    /// With `decision_point_on_request`, every release imposes a decision
    /// point (requests at the same instant coalesce into one cycle).
    pub fn provide_orders(
        &mut self,
        orders: impl IntoIterator<Item = Order>,
        decision_point_on_request: bool,
    ) -> SimResult<()> {
        let mut orders: Vec<Order> = orders.into_iter().collect();
        orders.sort_by(|a, b| a.release_date.cmp(&b.release_date));
        for order in orders {
            self.request_order(order, decision_point_on_request)?;
        }
        Ok(())
    }

    /// Register one order and schedule its release.
    ///
    /// A release date already in the past is clamped to the current instant
    /// with a warning.
    pub fn request_order(&mut self, order: Order, decision_point: bool) -> SimResult<()> {
        if self.finished {
            return Err(SimError::AlreadyFinished);
        }
        let release = if order.release_date < self.now {
            let message = format!(
                "release date {} of order {} has passed; releasing at {}",
                order.release_date, order.id, self.now
            );
            self.observer.warning(self.now, &message);
            tracing::warn!(time = %self.now, "{message}");
            self.now
        } else {
            order.release_date
        };
        let id = order.id.clone();
        self.model.add_order(order)?;
        self.queue
            .push(release, Wake::OrderRelease { order: id, decision_point });
        self.pending_releases += 1;
        Ok(())
    }

    /// Schedule a customer cancellation of `order` at instant `at`.
    pub fn cancel_order_at(
        &mut self,
        order: impl Into<OrderId>,
        at: impl Into<SimTime>,
    ) -> SimResult<()> {
        let order = order.into();
        if self.model.order(order.as_str()).is_none() {
            return Err(ModelError::UnknownOrder(order).into());
        }
        let at = at.into().max(self.now);
        self.queue.push(at, Wake::OrderCancel(order));
        Ok(())
    }

    /// Schedule an order-modification notice at instant `at`.  The engine
    /// does not change the order itself — callers mutate it from a hook or
    /// between runs — but the notice imposes a decision point so the routing
    /// algorithm observes the modification.
    pub fn update_order_at(
        &mut self,
        order: impl Into<OrderId>,
        at: impl Into<SimTime>,
    ) -> SimResult<()> {
        let order = order.into();
        if self.model.order(order.as_str()).is_none() {
            return Err(ModelError::UnknownOrder(order).into());
        }
        let at = at.into().max(self.now);
        self.queue.push(at, Wake::OrderUpdate(order));
        Ok(())
    }

    /// Impose a decision point every `period` units, starting at `period`.
    ///
    /// The updater stops once every order has been released (or, with
    /// `stop_after_last_order_request` false, once additionally no open
    /// order remains).
    pub fn periodic_updater(
        &mut self,
        period: f64,
        stop_after_last_order_request: bool,
    ) -> SimResult<()> {
        if !(period > 0.0) {
            return Err(SimError::Config(ConfigError::NonPositivePeriod(period)));
        }
        let period = SimTime::duration(period)?;
        self.periodic = Some(PeriodicUpdater { period, stop_after_last_order_request });
        self.queue.push(self.now + period, Wake::PeriodicUpdate);
        Ok(())
    }

    // ── Run loop ──────────────────────────────────────────────────────────

    /// Run until no future event remains, then finalize.
    pub fn run(&mut self) -> SimResult<()> {
        self.run_inner(None)
    }

    /// Run until `deadline` (events at the deadline still fire), then
    /// finalize.  Vehicles still moving or serving at the deadline are a
    /// horizon-cut error.
    pub fn run_until(&mut self, deadline: impl Into<SimTime>) -> SimResult<()> {
        self.run_inner(Some(deadline.into()))
    }

    fn run_inner(&mut self, deadline: Option<SimTime>) -> SimResult<()> {
        if self.finished {
            return Err(SimError::AlreadyFinished);
        }
        self.start()?;
        loop {
            let Some(next) = self.queue.peek_time() else { break };
            if deadline.is_some_and(|d| next > d) {
                break;
            }
            let (at, wake) = self.queue.pop().expect("peeked entry");
            debug_assert!(at >= self.now, "event queue went backwards");
            self.now = at;
            self.dispatch(wake)?;
        }
        if let Some(d) = deadline {
            self.now = self.now.max(d);
        }
        self.finalize()
    }

    fn dispatch(&mut self, wake: Wake) -> SimResult<()> {
        match wake {
            Wake::Vehicle(vehicle) => self.advance_vehicle(&vehicle),
            Wake::Coordinator => self.routing_cycle(),
            Wake::OrderRelease { order, decision_point } => {
                self.release_order(&order, decision_point)
            }
            Wake::PostponementExpiry(order) => self.postponement_expired(&order),
            Wake::OrderCancel(order) => self.execute_cancel(&order),
            Wake::OrderUpdate(order) => self.execute_update(&order),
            Wake::PeriodicUpdate => self.periodic_tick(),
        }
    }

    // ── Start / finalize ──────────────────────────────────────────────────

    /// Seed every vehicle's initial visit and park the fleet.
    fn start(&mut self) -> SimResult<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        let now = self.now;
        self.observer.on_simulation_start(now);

        let ids: Vec<VehicleId> = self.model.vehicle_ids().cloned().collect();
        for vid in &ids {
            let vehicle = self
                .model
                .vehicle_mut(vid.as_str())
                .expect("registered vehicle");
            let mut visit = Visit::new(vehicle.initial_location.clone());
            visit.arrival_time = Some(now);
            visit.service_start_time = Some(now);
            visit.service_finish_time = Some(now);
            vehicle.current_visit = Some(visit);
            vehicle.status = VehicleStatus::Idle;
        }
        for vid in &ids {
            self.advance_vehicle(vid)?;
        }
        Ok(())
    }

    /// Stamp final visits and emit end-of-horizon warnings.
    fn finalize(&mut self) -> SimResult<()> {
        let now = self.now;
        for (vid, rt) in &mut self.runtimes {
            let vehicle = self
                .model
                .vehicle_mut(vid.as_str())
                .expect("registered vehicle");
            if vehicle.status != VehicleStatus::Idle {
                return Err(SimError::VehicleNotIdleAtEnd {
                    vehicle: vid.clone(),
                    status: vehicle.status,
                });
            }
            if let Some(mut visit) = vehicle.current_visit.take() {
                visit.departure_time = Some(now);
                if let Some(finish) = visit.service_finish_time {
                    rt.stats.idle += now.since(finish).value();
                }
                vehicle.previous_visit = Some(visit);
                vehicle.completed_visits += 1;
            }
        }

        let mut warnings = Vec::new();
        for order in self.model.orders() {
            if order.is_undecided() {
                warnings.push(format!("no decision has been made on order {}", order.id));
            } else if order.is_accepted() && !order.is_delivered() {
                warnings.push(format!(
                    "order {} has been accepted but has not been delivered",
                    order.id
                ));
            }
        }
        for message in warnings {
            self.observer.warning(now, &message);
            tracing::warn!(time = %now, "{message}");
        }

        self.observer.on_simulation_finish(now);
        self.finished = true;
        Ok(())
    }

    // ── Order lifecycle handlers ──────────────────────────────────────────

    fn release_order(&mut self, oid: &OrderId, decision_point: bool) -> SimResult<()> {
        let now = self.now;
        let order = self
            .model
            .order_mut(oid.as_str())
            .expect("scheduled order exists");
        if order.status != OrderStatus::Unrequested {
            // Canceled before its release date; nothing to announce.
            self.pending_releases -= 1;
            return Ok(());
        }
        if order.release_date < now {
            order.release_date = now;
        }
        order.status = OrderStatus::Open;

        self.observer.on_order_requested(now, oid);
        let mut fx = Effects::default();
        self.model_hooks.on_order_request(&self.model, oid, &mut fx);
        self.apply_effects(fx);

        self.pending_releases -= 1;
        if decision_point {
            self.request_for_routing();
        }
        Ok(())
    }

    fn execute_cancel(&mut self, oid: &OrderId) -> SimResult<()> {
        let now = self.now;
        let order = self
            .model
            .order_mut(oid.as_str())
            .expect("cancellation target exists");
        if order.is_terminal() || !order.can_be_rejected_or_canceled() {
            let message = format!(
                "order {} can no longer be canceled (status {:?})",
                oid, order.status
            );
            self.observer.warning(now, &message);
            tracing::warn!(time = %now, "{message}");
            return Ok(());
        }
        order.status = OrderStatus::Canceled;
        order.cancellation_time = Some(now);
        if let Some(timer) = self.postpone_timers.remove(oid) {
            self.queue.cancel(timer);
        }
        self.observer.on_order_canceled(now, oid);
        // A canceled order must be scrubbed from all tentative routes by the
        // next valid decision.
        self.request_for_routing();
        Ok(())
    }

    fn execute_update(&mut self, oid: &OrderId) -> SimResult<()> {
        self.observer.on_order_updated(self.now, oid);
        self.request_for_routing();
        Ok(())
    }

    fn periodic_tick(&mut self) -> SimResult<()> {
        let Some(updater) = &self.periodic else {
            return Ok(());
        };
        let period = updater.period;
        let stop_after_last = updater.stop_after_last_order_request;

        if self.all_orders_released() {
            if stop_after_last {
                return Ok(());
            }
            if self.model.open_orders().next().is_none() {
                return Ok(());
            }
        }

        self.request_for_routing();
        self.queue.push(self.now + period, Wake::PeriodicUpdate);
        Ok(())
    }

    // ── Shared plumbing ───────────────────────────────────────────────────

    pub(crate) fn apply_effects(&mut self, fx: Effects) {
        if fx.routing_requested {
            self.request_for_routing();
        }
    }

    pub(crate) fn warn(&mut self, message: String) {
        self.observer.warning(self.now, &message);
        tracing::warn!(time = %self.now, "{message}");
    }
}

// ── SimulationBuilder ─────────────────────────────────────────────────────────

/// Fluent builder for [`Simulation`].
///
/// # Required inputs
///
/// - [`Model`] — locations and vehicles (orders may also arrive later via
///   [`Simulation::provide_orders`])
///
/// # Optional inputs (have defaults)
///
/// | Method                | Default                                       |
/// |-----------------------|-----------------------------------------------|
/// | `.vehicle_hooks(..)`  | all hooks no-op, zero travel times            |
/// | `.model_hooks(..)`    | no-op                                         |
/// | `.routing_callback(..)` | reject every undecided order, with a warning |
/// | `.observer(..)`       | [`LogObserver`] (events go to `tracing`)      |
/// | `.aux(..)`            | empty object                                  |
pub struct SimulationBuilder {
    model: Model,
    vehicle_hooks: BTreeMap<VehicleId, Box<dyn VehicleHooks>>,
    model_hooks: Box<dyn ModelHooks>,
    routing: Option<Box<dyn RoutingCallback>>,
    observer: Box<dyn SimObserver>,
    aux: serde_json::Map<String, serde_json::Value>,
}

impl SimulationBuilder {
    fn new(model: Model) -> Self {
        Self {
            model,
            vehicle_hooks: BTreeMap::new(),
            model_hooks: Box::new(NoopHooks),
            routing: None,
            observer: Box::new(LogObserver),
            aux: serde_json::Map::new(),
        }
    }

    /// Attach hooks to one vehicle.  The id is checked at `build` time.
    pub fn vehicle_hooks(
        mut self,
        vehicle: impl Into<VehicleId>,
        hooks: impl VehicleHooks + 'static,
    ) -> Self {
        self.vehicle_hooks.insert(vehicle.into(), Box::new(hooks));
        self
    }

    pub fn model_hooks(mut self, hooks: impl ModelHooks + 'static) -> Self {
        self.model_hooks = Box::new(hooks);
        self
    }

    /// Supply the routing callback.  Without one, every routing cycle warns
    /// and rejects all undecided orders.
    pub fn routing_callback(mut self, callback: impl RoutingCallback + 'static) -> Self {
        self.routing = Some(Box::new(callback));
        self
    }

    pub fn observer(mut self, observer: impl SimObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Free-form data exposed to the routing algorithm in every snapshot.
    pub fn aux(mut self, aux: serde_json::Map<String, serde_json::Value>) -> Self {
        self.aux = aux;
        self
    }

    /// Validate hook targets, build the dock resources and the per-vehicle
    /// runtimes, and return a ready-to-run [`Simulation`].
    pub fn build(self) -> SimResult<Simulation> {
        for vid in self.vehicle_hooks.keys() {
            if self.model.vehicle(vid.as_str()).is_none() {
                return Err(ModelError::UnknownVehicle(vid.clone()).into());
            }
        }

        let docks: BTreeMap<LocationId, Resource<VehicleId>> = self
            .model
            .locations()
            .filter_map(|loc| {
                loc.dock_capacity
                    .map(|cap| (loc.id.clone(), Resource::new(cap)))
            })
            .collect();

        let runtimes: BTreeMap<VehicleId, VehicleRuntime> = self
            .model
            .vehicle_ids()
            .map(|id| (id.clone(), VehicleRuntime::new()))
            .collect();

        Ok(Simulation {
            model: self.model,
            now: SimTime::ZERO,
            queue: EventQueue::new(),
            docks,
            runtimes,
            vehicle_hooks: self.vehicle_hooks,
            model_hooks: self.model_hooks,
            routing: self.routing,
            observer: self.observer,
            aux: self.aux,
            routing_requested: false,
            coordinator_scheduled: false,
            routing_in_progress: false,
            epoch: 0,
            last_decision_error: None,
            rejected_decisions: 0,
            postpone_timers: BTreeMap::new(),
            periodic: None,
            pending_releases: 0,
            started: false,
            finished: false,
        })
    }
}
