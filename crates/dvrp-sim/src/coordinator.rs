//! The decision coordinator.
//!
//! A single logical routing-request flag with coalescing: any number of
//! `request_for_routing` calls at one instant produce exactly one routing
//! cycle.  The coordinator wake is pushed at the current instant, and the
//! queue's FIFO tie-break guarantees it pops only after every event already
//! scheduled there has fired — the state it snapshots is quiescent.
//!
//! One cycle = interrupt interruptible waits → snapshot → callback →
//! validate → apply atomically → wake affected vehicles.  A decision that
//! fails validation is dropped wholesale; the prior plans stay live.

use dvrp_core::{OrderId, VehicleId};
use dvrp_model::OrderStatus;
use dvrp_protocol::{
    validate_decision, Decision, DecisionResult, OrderDisposition, StateSnapshot,
};

use crate::error::SimResult;
use crate::sim::{Simulation, Wake};
use crate::vehicle_exec::VehiclePhase;

impl Simulation {
    /// Impose a decision point.
    ///
    /// Requests arriving while a cycle is executing re-raise the flag; the
    /// coordinator runs another cycle at the same instant after completing
    /// the current one.
    pub fn request_for_routing(&mut self) {
        self.routing_requested = true;
        if !self.coordinator_scheduled && !self.routing_in_progress {
            self.coordinator_scheduled = true;
            self.queue.push(self.now, Wake::Coordinator);
        }
    }

    // ── The routing cycle ─────────────────────────────────────────────────

    pub(crate) fn routing_cycle(&mut self) -> SimResult<()> {
        self.coordinator_scheduled = false;
        if !self.routing_requested {
            return Ok(()); // stale wake; the flag was consumed by an earlier cycle
        }
        self.routing_requested = false;
        self.routing_in_progress = true;
        self.epoch += 1;
        let now = self.now;
        let epoch = self.epoch;
        self.observer.on_routing_start(now, epoch);

        // ── Interrupt interruptible suspensions ───────────────────────────
        //
        // Canceled vehicles are re-woken after the decision applies, so they
        // re-read their (possibly rewritten) plans.  Travel and service-step
        // waits are not touched.
        let mut interrupted: Vec<VehicleId> = Vec::new();
        for (vid, rt) in &mut self.runtimes {
            if rt.interruptible {
                if let Some(timer) = rt.timer.take() {
                    self.queue.cancel(timer);
                    rt.interruptible = false;
                    if matches!(rt.phase, VehiclePhase::PreServiceWait) {
                        // Re-enter through the service gate so the hook sees
                        // the refreshed plan.
                        rt.phase = VehiclePhase::WaitingEarliestStart;
                    }
                    interrupted.push(vid.clone());
                }
            }
        }

        // Pending postponements are handed back to the decision maker: the
        // orders appear in this snapshot as POSTPONED and may be re-decided.
        let mut suspended_postponements: Vec<OrderId> = Vec::new();
        for (oid, timer) in std::mem::take(&mut self.postpone_timers) {
            self.queue.cancel(timer);
            self.observer.on_postponement_interrupted(now, &oid);
            suspended_postponements.push(oid);
        }

        // ── Snapshot ──────────────────────────────────────────────────────
        let snapshot = StateSnapshot::capture(&self.model, now, self.aux.clone());

        // ── Invoke ────────────────────────────────────────────────────────
        let outcome: DecisionResult<Decision> = if self.routing.is_some() {
            let callback = self.routing.as_mut().expect("checked above");
            callback.decide(&snapshot)
        } else {
            self.warn("routing callback is not implemented (all orders will be rejected)".into());
            let undecided: Vec<OrderId> = self
                .model
                .orders()
                .filter(|o| o.is_undecided())
                .map(|o| o.id.clone())
                .collect();
            Ok(Decision::reject_all(undecided))
        };

        // ── Validate and apply ────────────────────────────────────────────
        let mut changed: Vec<VehicleId> = Vec::new();
        let checked = outcome.and_then(|decision| {
            validate_decision(&self.model, now, &decision)?;
            Ok(decision)
        });
        match checked {
            Ok(decision) => {
                changed = self.apply_decision(&decision);
                self.rearm_postponements(&suspended_postponements, &decision);
            }
            Err(error) => {
                tracing::warn!(time = %now, %error, "decision rejected");
                self.observer.on_decision_rejected(now, &error);
                self.rejected_decisions += 1;
                self.last_decision_error = Some(error);
                self.rearm_postponements(&suspended_postponements, &Decision::no_change());
            }
        }

        // ── Wake affected vehicles ────────────────────────────────────────
        //
        // Interrupted vehicles lost their timers and must re-enter their
        // waits either way; parked vehicles whose plan changed are released
        // through their wakeup signal.
        for vid in &interrupted {
            self.queue.push(now, Wake::Vehicle(vid.clone()));
        }
        for vid in &changed {
            if interrupted.contains(vid) {
                continue;
            }
            let rt = self.runtimes.get_mut(vid).expect("registered vehicle");
            if matches!(rt.phase, VehiclePhase::Parked) {
                let waiters = rt.wakeup.trigger();
                rt.wakeup = dvrp_engine::Signal::new();
                for waiter in waiters {
                    self.queue.push(now, Wake::Vehicle(waiter));
                }
            }
        }

        self.warn_lingering_canceled_orders();

        self.routing_in_progress = false;
        self.observer.on_routing_finish(now, epoch);

        // A request raised during the cycle runs another cycle at this same
        // instant, after the vehicles woken above have resumed.
        if self.routing_requested {
            self.coordinator_scheduled = true;
            self.queue.push(now, Wake::Coordinator);
        }
        Ok(())
    }

    // ── Decision application ──────────────────────────────────────────────

    /// Apply a validated decision atomically.  Returns the vehicles whose
    /// plans changed.
    fn apply_decision(&mut self, decision: &Decision) -> Vec<VehicleId> {
        let now = self.now;

        for (oid, od) in &decision.orders {
            match od.status {
                OrderDisposition::Accepted => {
                    let order = self.model.order_mut(oid.as_str()).expect("validated id");
                    if order.acceptance_time.is_none() {
                        order.acceptance_time = Some(now);
                        if order.status == OrderStatus::Postponed {
                            order.status = OrderStatus::Open;
                            order.postponed_until = None;
                        }
                        self.observer.on_order_accepted(now, oid);
                    }
                }
                OrderDisposition::Rejected => {
                    let order = self.model.order_mut(oid.as_str()).expect("validated id");
                    order.status = OrderStatus::Rejected;
                    order.rejection_time = Some(now);
                    order.postponed_until = None;
                    self.observer.on_order_rejected(now, oid);
                }
                OrderDisposition::Postponed => {
                    let until = od.postponed_until.expect("validated postponement");
                    let order = self.model.order_mut(oid.as_str()).expect("validated id");
                    order.status = OrderStatus::Postponed;
                    order.postponed_until = Some(until);
                    self.observer.on_order_postponed(now, oid, until);
                    let timer = self.queue.push(until, Wake::PostponementExpiry(oid.clone()));
                    self.postpone_timers.insert(oid.clone(), timer);
                }
            }
        }

        let mut changed = Vec::new();
        for (vid, vd) in &decision.vehicles {
            let Some(vd) = vd else { continue };
            let vehicle = self.model.vehicle_mut(vid.as_str()).expect("validated id");
            let mut touched = false;
            if let Some(current) = &vd.current_visit {
                let visit = vehicle.current_visit.as_mut().expect("validated current visit");
                visit.pickup_list = current.pickup_list.clone();
                visit.delivery_list = current.delivery_list.clone();
                touched = true;
            }
            if let Some(route) = &vd.next_visits {
                vehicle.next_visits = route
                    .iter()
                    .cloned()
                    .map(|visit| visit.into_visit())
                    .collect();
                touched = true;
            }
            if touched {
                changed.push(vid.clone());
            }
        }
        changed
    }

    /// Restart postponement timers the cycle suspended and the decision left
    /// untouched.  A deadline at or before the current instant already had
    /// its decision point; it is not re-armed.
    fn rearm_postponements(&mut self, suspended: &[OrderId], decision: &Decision) {
        for oid in suspended {
            if decision.orders.contains_key(oid) {
                continue;
            }
            let Some(order) = self.model.order(oid.as_str()) else {
                continue;
            };
            if order.status != OrderStatus::Postponed {
                continue;
            }
            if let Some(until) = order.postponed_until {
                if until > self.now {
                    let timer = self.queue.push(until, Wake::PostponementExpiry(oid.clone()));
                    self.postpone_timers.insert(oid.clone(), timer);
                }
            }
        }
    }

    // ── Postponement expiry ───────────────────────────────────────────────

    /// The self-imposed decision point of a postponed order.
    pub(crate) fn postponement_expired(&mut self, oid: &OrderId) -> SimResult<()> {
        self.postpone_timers.remove(oid);
        let Some(order) = self.model.order(oid.as_str()) else {
            return Ok(());
        };
        if order.status != OrderStatus::Postponed {
            return Ok(()); // decided in the meantime
        }
        self.observer.on_postponement_expired(self.now, oid);
        self.request_for_routing();
        Ok(())
    }

    /// A canceled order still sitting in a tentative route: warned about
    /// every cycle until a decision scrubs it.
    fn warn_lingering_canceled_orders(&mut self) {
        let mut lingering: Vec<(VehicleId, OrderId)> = Vec::new();
        for vehicle in self.model.vehicles() {
            for visit in vehicle
                .current_visit
                .iter()
                .filter(|v| !v.service_started())
                .chain(vehicle.next_visits.iter())
            {
                for oid in visit.pickup_list.iter().chain(&visit.delivery_list) {
                    let canceled = self
                        .model
                        .order(oid.as_str())
                        .is_some_and(|o| o.status == OrderStatus::Canceled);
                    if canceled {
                        lingering.push((vehicle.id.clone(), oid.clone()));
                    }
                }
            }
        }
        for (vid, oid) in lingering {
            self.warn(format!(
                "canceled order {oid} remains in the tentative route of vehicle {vid}"
            ));
        }
    }
}
