//! Strongly typed identifier wrappers.
//!
//! Entities reference each other by id only (an `Order` holds `LocationId`s,
//! a `Vehicle` holds `OrderId`s); the `Model` resolves references through its
//! lookup tables.  Ids are string-backed because the external JSON contract
//! keys every entity by a caller-chosen string.
//!
//! All ids are `Ord + Hash + Borrow<str>` so they work as `BTreeMap` keys
//! (deterministic iteration order) and can be looked up by `&str` without an
//! allocation.

use std::borrow::Borrow;
use std::fmt;

/// Generate a typed id wrapper around a `String`.
macro_rules! string_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Unique id of a location.
    pub struct LocationId;
}

string_id! {
    /// Unique id of an order.
    pub struct OrderId;
}

string_id! {
    /// Unique id of a vehicle.
    pub struct VehicleId;
}
