//! The per-vehicle execution state machine.
//!
//! Each vehicle is a cooperative process re-expressed as an explicit phase
//! machine: [`advance_vehicle`](Simulation::advance_vehicle) runs the machine
//! forward until it suspends, recording the suspension as a
//! [`VehiclePhase`] plus (when timed) a pending timer.
//!
//! ```text
//! Parked ──plan──▶ DelayedDeparture ──▶ EnRoute ──▶ AwaitingDock
//!    ▲    (wait for earliest start,     (travel,     (dock FIFO)
//!    │     interruptible)               fixed)           │
//!    │                                                   ▼
//!    └── Serving ◀── PreServiceWait ◀── WaitingEarliestStart
//!        (per-order steps, fixed)       (interruptible)
//! ```
//!
//! **Interruptible** suspensions (delayed departure, earliest-start wait,
//! pre-service wait) are canceled by the decision coordinator so the vehicle
//! re-reads its plan after a route change.  Travel and individual service
//! steps always run to completion; the visit being executed — and, while
//! `EnRoute`, the leg destination — is committed.

use std::collections::VecDeque;

use dvrp_core::{OrderId, SimTime, VehicleId};
use dvrp_engine::{Acquire, Signal, TimerId};
use dvrp_model::{LoadingRule, VehicleStatus};

use crate::error::{SimError, SimResult};
use crate::hooks::Effects;
use crate::sim::{Simulation, Wake};
use crate::stats::VehicleStats;

// ── Service steps ─────────────────────────────────────────────────────────────

/// The two order operations a service program is made of.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ServiceOp {
    Pickup,
    Deliver,
}

/// One atomic step of a visit's service: wait `wait`, then apply `op` to
/// `order`.  The wait is never interrupted.
#[derive(Clone, Debug)]
pub struct ServiceStep {
    pub op: ServiceOp,
    pub order: OrderId,
    pub wait: SimTime,
}

// ── Phase machine state ───────────────────────────────────────────────────────

/// Where a vehicle's process is suspended.
pub(crate) enum VehiclePhase {
    /// No route (or waiting for a decision); blocked on the wakeup signal.
    Parked,
    /// Waiting (interruptibly) until the next visit's earliest start.
    DelayedDeparture,
    /// Traveling; the pending timer fires at arrival.
    EnRoute,
    /// Queued on the destination's dock resource.
    AwaitingDock,
    /// Waiting (interruptibly) for the service-start gate.
    WaitingEarliestStart,
    /// Waiting (interruptibly) on a `pre_service` hook delay.
    PreServiceWait,
    /// Executing service steps; `waiting` is set while a step's wait runs.
    Serving { steps: VecDeque<ServiceStep>, waiting: bool },
}

pub(crate) struct VehicleRuntime {
    pub(crate) phase: VehiclePhase,
    pub(crate) timer: Option<TimerId>,
    /// Whether the pending timer may be canceled by the coordinator.
    pub(crate) interruptible: bool,
    pub(crate) holds_dock: bool,
    /// Set by a dock handoff just before the wake; distinguishes a granted
    /// slot from any other wake while queued.
    pub(crate) dock_granted: bool,
    /// One-shot signal the vehicle blocks on while parked; replaced after
    /// every trigger.
    pub(crate) wakeup: Signal<VehicleId>,
    pub(crate) stats: VehicleStats,
}

impl VehicleRuntime {
    pub(crate) fn new() -> Self {
        Self {
            phase: VehiclePhase::Parked,
            timer: None,
            interruptible: false,
            holds_dock: false,
            dock_granted: false,
            wakeup: Signal::new(),
            stats: VehicleStats::default(),
        }
    }
}

enum StepAction {
    Finished,
    Wait(SimTime),
    Apply(ServiceStep),
}

// ── The machine ───────────────────────────────────────────────────────────────

impl Simulation {
    /// Resume `vehicle`'s process and run it to its next suspension.
    pub(crate) fn advance_vehicle(&mut self, vid: &VehicleId) -> SimResult<()> {
        enum Resume {
            Depart,
            Arrive,
            Gate,
            StartService,
            Service,
            Ignore,
        }

        let resume = {
            let rt = self.runtimes.get_mut(vid).expect("registered vehicle");
            rt.timer = None;
            rt.interruptible = false;
            match &rt.phase {
                VehiclePhase::Parked | VehiclePhase::DelayedDeparture => Resume::Depart,
                VehiclePhase::EnRoute => Resume::Arrive,
                VehiclePhase::AwaitingDock => {
                    if rt.dock_granted {
                        rt.dock_granted = false;
                        rt.holds_dock = true;
                        Resume::Gate
                    } else {
                        Resume::Ignore // spurious wake; still queued
                    }
                }
                VehiclePhase::WaitingEarliestStart => Resume::Gate,
                VehiclePhase::PreServiceWait => Resume::StartService,
                VehiclePhase::Serving { .. } => Resume::Service,
            }
        };

        match resume {
            Resume::Depart => self.depart_eval(vid),
            Resume::Arrive => self.arrive(vid),
            Resume::Gate => self.gate_check(vid),
            Resume::StartService => self.start_service(vid),
            Resume::Service => self.run_service(vid),
            Resume::Ignore => Ok(()),
        }
    }

    // ── Departure ─────────────────────────────────────────────────────────

    /// Idle at a location: park, wait for the earliest start, or depart.
    fn depart_eval(&mut self, vid: &VehicleId) -> SimResult<()> {
        let now = self.now;
        let next_earliest = {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            match vehicle.next_visits.front() {
                None => {
                    let rt = self.runtimes.get_mut(vid).expect("runtime");
                    rt.phase = VehiclePhase::Parked;
                    rt.wakeup.wait(vid.clone());
                    return Ok(());
                }
                Some(next) => next.earliest_start_time,
            }
        };

        if let Some(earliest) = next_earliest {
            if now < earliest {
                self.observer.on_departure_delayed(now, vid, earliest);
                let timer = self.queue.push(earliest, Wake::Vehicle(vid.clone()));
                let rt = self.runtimes.get_mut(vid).expect("runtime");
                rt.phase = VehiclePhase::DelayedDeparture;
                rt.interruptible = true;
                rt.timer = Some(timer);
                return Ok(());
            }
        }

        self.depart(vid)
    }

    fn depart(&mut self, vid: &VehicleId) -> SimResult<()> {
        let now = self.now;
        let (from, to, idle) = {
            let vehicle = self
                .model
                .vehicle_mut(vid.as_str())
                .expect("registered vehicle");
            let mut current = vehicle
                .current_visit
                .take()
                .expect("departing vehicle is at a location");
            current.departure_time = Some(now);
            let idle = current
                .service_finish_time
                .map_or(0.0, |f| now.since(f).value());
            let from = current.location.clone();
            vehicle.previous_visit = Some(current);
            vehicle.completed_visits += 1;
            vehicle.status = VehicleStatus::EnRoute;
            let to = vehicle
                .next_visits
                .front()
                .expect("departure toward a committed visit")
                .location
                .clone();
            (from, to, idle)
        };
        self.runtimes.get_mut(vid).expect("runtime").stats.idle += idle;
        self.observer.on_departure(now, vid, &from, &to);

        let (travel, distance) = match self.vehicle_hooks.get_mut(vid) {
            Some(hook) => {
                let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
                (
                    hook.travel_time(&self.model, vehicle, &from, &to),
                    hook.travel_distance(&self.model, vehicle, &from, &to),
                )
            }
            None => (SimTime::ZERO, 0.0),
        };
        self.runtimes.get_mut(vid).expect("runtime").stats.distance += distance;

        if from == to || travel <= SimTime::ZERO {
            return self.arrive(vid);
        }
        let timer = self.queue.push(now + travel, Wake::Vehicle(vid.clone()));
        let rt = self.runtimes.get_mut(vid).expect("runtime");
        rt.phase = VehiclePhase::EnRoute;
        rt.timer = Some(timer);
        Ok(())
    }

    // ── Arrival ───────────────────────────────────────────────────────────

    fn arrive(&mut self, vid: &VehicleId) -> SimResult<()> {
        let now = self.now;
        let (location, moving) = {
            let vehicle = self
                .model
                .vehicle_mut(vid.as_str())
                .expect("registered vehicle");
            let mut visit = vehicle
                .next_visits
                .pop_front()
                .expect("arriving vehicle has a destination");
            visit.arrival_time = Some(now);
            let moving = vehicle
                .previous_visit
                .as_ref()
                .and_then(|p| p.departure_time)
                .map_or(0.0, |d| now.since(d).value());
            let location = visit.location.clone();
            vehicle.current_visit = Some(visit);
            vehicle.status = VehicleStatus::WaitingForService;
            (location, moving)
        };
        self.runtimes.get_mut(vid).expect("runtime").stats.moving += moving;
        self.observer.on_arrival(now, vid, &location);

        let mut fx = Effects::default();
        if let Some(hook) = self.vehicle_hooks.get_mut(vid) {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            hook.on_arrival(&self.model, vehicle, &mut fx);
        }
        {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            self.model_hooks.on_vehicle_arrival(&self.model, vehicle, &mut fx);
        }
        self.apply_effects(fx);

        // Dock acquisition: strict FIFO, may block.
        if let Some(dock) = self.docks.get_mut(&location) {
            match dock.acquire(vid.clone()) {
                Acquire::Granted => {
                    self.runtimes.get_mut(vid).expect("runtime").holds_dock = true;
                }
                Acquire::Queued => {
                    self.observer.on_waiting_for_dock(now, vid, &location);
                    self.runtimes.get_mut(vid).expect("runtime").phase = VehiclePhase::AwaitingDock;
                    return Ok(());
                }
            }
        }
        self.gate_check(vid)
    }

    // ── Service gate ──────────────────────────────────────────────────────

    /// Wait for the latest of the visit-level and order-level earliest
    /// service starts, then run the pre-service hook.
    fn gate_check(&mut self, vid: &VehicleId) -> SimResult<()> {
        let now = self.now;
        let gate = {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            let visit = vehicle.current_visit.as_ref().expect("vehicle is at a location");
            let mut gate = visit.earliest_start_time.unwrap_or(SimTime::ZERO);
            for oid in &visit.pickup_list {
                if let Some(e) = self
                    .model
                    .order(oid.as_str())
                    .and_then(|o| o.earliest_service_start_pickup)
                {
                    gate = gate.max(e);
                }
            }
            for oid in &visit.delivery_list {
                if let Some(e) = self
                    .model
                    .order(oid.as_str())
                    .and_then(|o| o.earliest_service_start_delivery)
                {
                    gate = gate.max(e);
                }
            }
            gate
        };

        if now < gate {
            self.observer.on_waiting_for_earliest_start(now, vid, gate);
            let timer = self.queue.push(gate, Wake::Vehicle(vid.clone()));
            let rt = self.runtimes.get_mut(vid).expect("runtime");
            rt.phase = VehiclePhase::WaitingEarliestStart;
            rt.interruptible = true;
            rt.timer = Some(timer);
            return Ok(());
        }

        let delay = {
            let mut fx = Effects::default();
            let delay = match self.vehicle_hooks.get_mut(vid) {
                Some(hook) => {
                    let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
                    hook.pre_service(&self.model, vehicle, &mut fx)
                }
                None => None,
            };
            self.apply_effects(fx);
            delay
        };
        if let Some(d) = delay {
            if !d.is_zero() {
                let timer = self.queue.push(now + d, Wake::Vehicle(vid.clone()));
                let rt = self.runtimes.get_mut(vid).expect("runtime");
                rt.phase = VehiclePhase::PreServiceWait;
                rt.interruptible = true;
                rt.timer = Some(timer);
                return Ok(());
            }
        }

        self.start_service(vid)
    }

    // ── Service ───────────────────────────────────────────────────────────

    fn start_service(&mut self, vid: &VehicleId) -> SimResult<()> {
        let now = self.now;
        let (location, waiting, pickups) = {
            let vehicle = self
                .model
                .vehicle_mut(vid.as_str())
                .expect("registered vehicle");
            let visit = vehicle.current_visit.as_mut().expect("vehicle is at a location");
            visit.service_start_time = Some(now);
            let waiting = visit.arrival_time.map_or(0.0, |a| now.since(a).value());
            let location = visit.location.clone();
            let pickups = visit.pickup_list.clone();
            vehicle.status = VehicleStatus::UnderService;
            (location, waiting, pickups)
        };
        self.runtimes.get_mut(vid).expect("runtime").stats.waiting += waiting;

        // Once service starts, the orders being loaded can no longer be
        // rejected or canceled.
        for oid in &pickups {
            if let Some(order) = self.model.order_mut(oid.as_str()) {
                order.reject_locked = true;
            }
        }

        self.observer.on_service_start(now, vid, &location);
        let mut fx = Effects::default();
        if let Some(hook) = self.vehicle_hooks.get_mut(vid) {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            hook.on_service_start(&self.model, vehicle, &mut fx);
        }
        {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            self.model_hooks
                .on_vehicle_service_start(&self.model, vehicle, &mut fx);
        }
        self.apply_effects(fx);

        let steps = match self.vehicle_hooks.get_mut(vid) {
            Some(hook) => {
                let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
                hook.service_program(&self.model, vehicle)
            }
            None => None,
        };
        let steps = steps.unwrap_or_else(|| self.default_service_program(vid));

        self.runtimes.get_mut(vid).expect("runtime").phase = VehiclePhase::Serving {
            steps: steps.into(),
            waiting: false,
        };
        self.run_service(vid)
    }

    /// Unloading first, then loading, with per-order durations.  Under LIFO
    /// the visit's deliveries are unloaded top-of-stack first, so any legal
    /// within-visit set unloads without violating the stack discipline.
    fn default_service_program(&self, vid: &VehicleId) -> Vec<ServiceStep> {
        let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
        let visit = vehicle.current_visit.as_ref().expect("vehicle is at a location");

        let mut deliveries = visit.delivery_list.clone();
        if vehicle.loading_rule == LoadingRule::Lifo {
            deliveries.sort_by_key(|oid| {
                std::cmp::Reverse(vehicle.carrying_orders.iter().position(|c| c == oid))
            });
        }

        let mut steps = Vec::with_capacity(deliveries.len() + visit.pickup_list.len());
        for oid in deliveries {
            let wait = self
                .model
                .order(oid.as_str())
                .map_or(SimTime::ZERO, |o| o.delivery_duration);
            steps.push(ServiceStep { op: ServiceOp::Deliver, order: oid, wait });
        }
        for oid in &visit.pickup_list {
            let wait = self
                .model
                .order(oid.as_str())
                .map_or(SimTime::ZERO, |o| o.pickup_duration);
            steps.push(ServiceStep { op: ServiceOp::Pickup, order: oid.clone(), wait });
        }
        steps
    }

    /// Drive the step queue: zero-wait steps apply inline, timed steps
    /// suspend (non-interruptibly) and apply on wake.
    fn run_service(&mut self, vid: &VehicleId) -> SimResult<()> {
        loop {
            let action = {
                let rt = self.runtimes.get_mut(vid).expect("runtime");
                let VehiclePhase::Serving { steps, waiting } = &mut rt.phase else {
                    unreachable!("run_service outside the Serving phase");
                };
                match steps.front() {
                    None => StepAction::Finished,
                    Some(step) if !*waiting && !step.wait.is_zero() => {
                        *waiting = true;
                        StepAction::Wait(step.wait)
                    }
                    Some(_) => {
                        *waiting = false;
                        StepAction::Apply(steps.pop_front().expect("non-empty step queue"))
                    }
                }
            };
            match action {
                StepAction::Finished => return self.finish_service(vid),
                StepAction::Wait(wait) => {
                    let timer = self.queue.push(self.now + wait, Wake::Vehicle(vid.clone()));
                    self.runtimes.get_mut(vid).expect("runtime").timer = Some(timer);
                    return Ok(());
                }
                StepAction::Apply(step) => self.apply_service_step(vid, step)?,
            }
        }
    }

    fn apply_service_step(&mut self, vid: &VehicleId, step: ServiceStep) -> SimResult<()> {
        let now = self.now;
        let oid = &step.order;
        match step.op {
            ServiceOp::Deliver => {
                {
                    let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
                    let order = self
                        .model
                        .order(oid.as_str())
                        .ok_or_else(|| SimError::ServiceFault(format!("unknown order {oid}")))?;
                    if !order.is_picked_up() {
                        return Err(SimError::ServiceFault(format!(
                            "order {oid} to deliver is not picked up"
                        )));
                    }
                    if order.is_delivered() {
                        return Err(SimError::ServiceFault(format!(
                            "order {oid} is already delivered"
                        )));
                    }
                    if vehicle.current_location() != Some(&order.delivery_location) {
                        return Err(SimError::ServiceFault(format!(
                            "delivery location of order {oid} is {}",
                            order.delivery_location
                        )));
                    }
                    match vehicle.loading_rule {
                        LoadingRule::Lifo => {
                            if vehicle.carrying_orders.last() != Some(oid) {
                                return Err(SimError::ServiceFault(format!(
                                    "LIFO loading rule of vehicle {vid} violated by order {oid}"
                                )));
                            }
                        }
                        LoadingRule::Free => {
                            if !vehicle.carrying_orders.contains(oid) {
                                return Err(SimError::ServiceFault(format!(
                                    "order {oid} is not on vehicle {vid}"
                                )));
                            }
                        }
                    }
                }
                let vehicle = self
                    .model
                    .vehicle_mut(vid.as_str())
                    .expect("registered vehicle");
                vehicle.carrying_orders.retain(|o| o != oid);
                let order = self.model.order_mut(oid.as_str()).expect("checked above");
                order.status = dvrp_model::OrderStatus::Delivered;
                order.delivery_time = Some(now);
                self.observer.on_delivery(now, oid, vid);
            }
            ServiceOp::Pickup => {
                {
                    let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
                    let order = self
                        .model
                        .order(oid.as_str())
                        .ok_or_else(|| SimError::ServiceFault(format!("unknown order {oid}")))?;
                    if order.is_picked_up() || order.is_delivered() {
                        return Err(SimError::ServiceFault(format!(
                            "order {oid} to pick up is already picked up"
                        )));
                    }
                    if vehicle.current_location() != Some(&order.pickup_location) {
                        return Err(SimError::ServiceFault(format!(
                            "pickup location of order {oid} is {}",
                            order.pickup_location
                        )));
                    }
                    if let Some(capacity) = vehicle.capacity {
                        let carried = vehicle.carried_load(|id| {
                            self.model.order(id.as_str()).map_or(0.0, |o| o.load())
                        });
                        if carried + order.load() > capacity + 1e-6 {
                            return Err(SimError::ServiceFault(format!(
                                "capacity of vehicle {vid} violated when loading order {oid}"
                            )));
                        }
                    }
                }
                let vehicle = self
                    .model
                    .vehicle_mut(vid.as_str())
                    .expect("registered vehicle");
                vehicle.carrying_orders.push(oid.clone());
                let order = self.model.order_mut(oid.as_str()).expect("checked above");
                order.status = dvrp_model::OrderStatus::PickedUp;
                order.pickup_time = Some(now);
                order.assigned_vehicle = Some(vid.clone());
                self.observer.on_pickup(now, oid, vid);
            }
        }
        Ok(())
    }

    fn finish_service(&mut self, vid: &VehicleId) -> SimResult<()> {
        let now = self.now;
        let (location, service) = {
            let vehicle = self
                .model
                .vehicle_mut(vid.as_str())
                .expect("registered vehicle");
            let visit = vehicle.current_visit.as_mut().expect("vehicle is at a location");
            visit.service_finish_time = Some(now);
            let service = visit
                .service_start_time
                .map_or(0.0, |s| now.since(s).value());
            let location = visit.location.clone();
            vehicle.status = VehicleStatus::Idle;
            (location, service)
        };
        self.runtimes.get_mut(vid).expect("runtime").stats.service += service;

        // Hand the dock slot to the FIFO head, if anyone is waiting.
        let rt = self.runtimes.get_mut(vid).expect("runtime");
        if rt.holds_dock {
            rt.holds_dock = false;
            if let Some(dock) = self.docks.get_mut(&location) {
                if let Some(next) = dock.release() {
                    self.runtimes
                        .get_mut(&next)
                        .expect("queued vehicle has a runtime")
                        .dock_granted = true;
                    self.queue.push(now, Wake::Vehicle(next));
                }
            }
        }

        self.observer.on_service_finish(now, vid, &location);
        let mut fx = Effects::default();
        if let Some(hook) = self.vehicle_hooks.get_mut(vid) {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            hook.on_service_finish(&self.model, vehicle, &mut fx);
        }
        {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            self.model_hooks
                .on_vehicle_service_finish(&self.model, vehicle, &mut fx);
        }
        self.apply_effects(fx);

        let mut fx = Effects::default();
        if let Some(hook) = self.vehicle_hooks.get_mut(vid) {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            hook.on_idle(&self.model, vehicle, &mut fx);
        }
        {
            let vehicle = self.model.vehicle(vid.as_str()).expect("registered vehicle");
            self.model_hooks.on_vehicle_idle(&self.model, vehicle, &mut fx);
        }
        self.apply_effects(fx);

        self.depart_eval(vid)
    }
}
