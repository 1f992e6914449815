//! Temporal and spatial alignment of forecast and observation datasets.
//!
//! - [`time`]: the four pairwise time transitions and `valid_time` derivation
//! - [`space`]: grid/point dispatch onto the interpolation engine
//! - [`collection`]: shared-timeline alignment of whole collections
//!
//! Every function returns new datasets; inputs are never modified.

pub mod collection;
pub mod options;
pub mod space;
pub mod time;

pub use collection::{align_time, master_timeline};
pub use options::{CollectionTimeOptions, LeadTimeMode, ReturnAs, SpaceAlignOptions, TimeAlignOptions};
pub use space::{align_space, spatial_alignment, SpatialAlignment};
pub use time::add_valid_time;
