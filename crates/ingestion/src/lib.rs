//! Dataset ingestion.
//!
//! Provides the first stage of an alignment run:
//!
//! - Loaders that read datasets and tag them with their properties
//! - Transformations applied to loaded datasets, such as renames and unit conversions
//! - Forecast-cycle date sets that expand file-path templates

pub mod dates;
pub mod loader;
pub mod loaders;
pub mod pattern;
pub mod transform;
pub mod transformations;

// Re-exports
pub use dates::{parse_duration, parse_timestamp, Dates, DatesConfig};
pub use loader::{load, LoadRequest, Loader, LoaderRegistry};
pub use loaders::JsonLoader;
pub use pattern::{Pattern, PatternValue};
pub use transform::{parse_params, transform, FnTransformation, TransformParams, Transformation, TransformationRegistry};
pub use transformations::{KelvinToCelsius, Names, Rename, UvToSpeed};
