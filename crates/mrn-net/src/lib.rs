//! `mrn-net` — entity stores for the three network resolutions.
//!
//! Each layer owns its nodes and links exclusively; cross-layer references
//! are stored as IDs, never as pointers.  Collections are `BTreeMap`s keyed
//! by ID, so iterating a net visits entities in ascending-ID order — the
//! compiler's determinism contract rests on that.
//!
//! # Crate layout
//!
//! | Module          | Contents                                             |
//! |-----------------|------------------------------------------------------|
//! | [`macroscopic`] | `MacroNode`, `MacroLink`, `MacroNet` (compiler input)|
//! | [`mesoscopic`]  | `MesoNode`, `MesoLink`, `MesoNet`                    |
//! | [`microscopic`] | `MicroNode`, `MicroLink`, `MicroNet`                 |
//! | [`movement`]    | `Movement`, `Movements`                              |
//! | [`lanes`]       | `LanesInfo`, lane numbering helpers                  |
//! | [`geojson`]     | `geo_feature()` / `geo_feature_collection()` impls   |
//! | [`error`]       | `NetError`, `NetResult<T>`                           |

pub mod error;
pub mod geojson;
pub mod lanes;
pub mod macroscopic;
pub mod mesoscopic;
pub mod microscopic;
pub mod movement;


pub use error::{NetError, NetResult};
pub use lanes::{lane_indices, LanesInfo};
pub use macroscopic::{MacroLink, MacroNet, MacroNode, LANE_WIDTH};
pub use mesoscopic::{MesoLink, MesoNet, MesoNode};
pub use microscopic::{MicroLink, MicroNet, MicroNode};
pub use movement::{Movement, Movements};
