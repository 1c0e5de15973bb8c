//! Locations.

use dvrp_core::{ConfigError, LocationId};

/// A stop in the service area.
///
/// Locations are created before the simulation starts and are immutable
/// thereafter.  A location may carry a *dock*: a counted resource that
/// serializes service, so that at most `dock_capacity` vehicles are under
/// service at the location at once.  The live occupancy state is owned by the
/// simulation layer, not by this struct.
#[derive(Clone, Debug)]
pub struct Location {
    pub id: LocationId,

    /// Optional planar coordinates (or latitude/longitude).  The core never
    /// interprets them; travel times come from the `travel_time` hook.
    pub position: Option<(f64, f64)>,

    /// Number of simultaneous service slots, or `None` for an unbounded
    /// location.
    pub dock_capacity: Option<u32>,
}

impl Location {
    pub fn new(id: impl Into<LocationId>) -> Self {
        Self {
            id: id.into(),
            position: None,
            dock_capacity: None,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some((x, y));
        self
    }

    /// Bound the number of vehicles the location can serve at once.
    pub fn with_dock_capacity(mut self, capacity: u32) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.dock_capacity = Some(capacity);
        Ok(self)
    }
}
