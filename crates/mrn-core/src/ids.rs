//! Strongly typed identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as `BTreeMap` keys and
//! sorted collection elements without ceremony.  The inner integer is `pub`
//! because mesoscopic node IDs are *computed* (`macro_node_id * 100 +
//! expansion_counter`) and because the GeoJSON surface emits the raw value,
//! `-1` sentinel included, for GMNS compatibility.

use std::fmt;

/// Generate a typed ID wrapper around an `i64`.
///
/// `-1` is the "unset/none" sentinel throughout the network layers; wrapping
/// it in `INVALID` keeps arithmetic on absent IDs from going unnoticed.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        $vis struct $name(pub i64);

        impl $name {
            /// Sentinel meaning "no valid ID" — serialized as `-1`.
            pub const INVALID: $name = $name(-1);

            /// True for any non-negative ID; the sentinel (and any other
            /// negative value) is invalid.
            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self.0 >= 0
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<i64> for $name {
            #[inline(always)]
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

typed_id! {
    /// Identifier of a node in any of the three network layers.
    ///
    /// Macroscopic node IDs come from the ingested data; mesoscopic node IDs
    /// encode provenance as `macro_node_id * 100 + k`; microscopic node IDs
    /// are allocated monotonically by `MicroNet`.
    pub struct NodeId;
}

typed_id! {
    /// Identifier of a link (edge) in any of the three network layers.
    pub struct LinkId;
}

typed_id! {
    /// Identifier of a movement (a permitted maneuver at a macroscopic node).
    pub struct MovementId;
}
