//! The routing callback.
//!
//! At every decision point the coordinator hands the frozen state to this
//! callback and receives the decision.  The callback is opaque to the
//! engine: it may shell out to an external solver, block on a socket, or
//! compute inline — real time spent here does not advance simulated time.

use dvrp_protocol::{Decision, DecisionResult, StateSnapshot};

/// The decision maker invoked at each routing cycle.
///
/// Returning `Err` (e.g. the external process produced unparseable JSON)
/// aborts the cycle exactly like a failed validation: nothing is applied and
/// the simulation continues.
///
/// Any `FnMut(&StateSnapshot) -> DecisionResult<Decision>` closure is a
/// routing callback:
///
/// ```rust,ignore
/// let sim = Simulation::builder(model)
///     .routing_callback(|state: &StateSnapshot| {
///         let raw = my_external_solver(state.to_value())?;
///         Decision::from_value(raw)
///     })
///     .build()?;
/// ```
pub trait RoutingCallback {
    fn decide(&mut self, state: &StateSnapshot) -> DecisionResult<Decision>;
}

impl<F> RoutingCallback for F
where
    F: FnMut(&StateSnapshot) -> DecisionResult<Decision>,
{
    fn decide(&mut self, state: &StateSnapshot) -> DecisionResult<Decision> {
        self(state)
    }
}
