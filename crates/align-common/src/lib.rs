//! Shared data model for dataset alignment.
//!
//! This crate provides the labelled-array backend every other crate works on
//! and the property tags that describe a dataset's layout:
//!
//! - **Dataset**: named dimensions, coordinates, float variables, attributes
//! - **Properties**: (space, time, uncertainty) tags with shape contracts
//! - **Collection**: single / list / named-map wrapper kept through fan-out
//!
//! # Example
//!
//! ```ignore
//! use align_common::{properties_of, Dataset};
//!
//! let ds = Dataset::read_json("obs.json")?;
//! let props = properties_of(&ds)?;
//! if props.is_observation() {
//!     let times = ds.index("valid_time")?;
//! }
//! ```

pub mod attrs;
pub mod collection;
pub mod coords;
pub mod dataset;
pub mod error;
mod ops;
pub mod properties;
pub mod variable;

// Re-export commonly used types at crate root
pub use attrs::Attributes;
pub use collection::Collection;
pub use coords::{CoordValues, Coordinate, FloatKey, Label, Timestamp};
pub use dataset::Dataset;
pub use error::{AlignError, PropertyAxis, Result};
pub use properties::{
    properties_from_attrs, properties_of, properties_to_attrs, set_properties, update_space_property,
    update_time_property, validate_dataset, Properties, Space, Time, Uncertainty,
};
pub use variable::Variable;

/// Dimension and coordinate names shared across crates.
pub mod names {
    pub const GRID_INDEX: &str = "grid_index";
    pub const POINT_INDEX: &str = "point_index";
    pub const XC: &str = "xc";
    pub const YC: &str = "yc";
    pub const LONGITUDE: &str = "longitude";
    pub const LATITUDE: &str = "latitude";
    pub const REFERENCE_TIME: &str = "reference_time";
    pub const LEAD_TIME: &str = "lead_time";
    pub const VALID_TIME: &str = "valid_time";
    pub const MEMBER: &str = "member";
    pub const QUANTILE: &str = "quantile";
    pub const CRS_ATTR: &str = "crs";
    pub const GRID_MAPPING_ATTR: &str = "grid_mapping";
}
