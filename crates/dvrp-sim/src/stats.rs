//! End-of-run summary statistics.
//!
//! Accumulated live at each vehicle transition rather than recomputed from a
//! visit history — the engine does not persist one.

/// Per-vehicle time and distance totals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VehicleStats {
    /// Total distance traveled, from the `travel_distance` hook.
    pub distance: f64,
    /// Time spent en route.
    pub moving: f64,
    /// Time between arrival and service start (dock and window waits).
    pub waiting: f64,
    /// Time under service.
    pub service: f64,
    /// Time idle at a location after service, before departure.
    pub idle: f64,
}

/// Per-order outcome metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrderStats {
    /// `max(0, delivery_time - due_date)`; zero without a due date or when
    /// undelivered.
    pub tardiness: f64,
}
