//! Coordinate reference systems for spatial alignment.
//!
//! Implements the map projections from scratch without external dependencies:
//! plate carrée, spherical Lambert Conformal Conic and spherical Mercator,
//! plus the builtin regional grids (`cerra`, `uwcw`).

pub mod crs;
pub mod error;
pub mod grid;
pub mod lambert;
pub mod mercator;

pub use crs::{Crs, SPHERE_RADIUS, WGS84_RADIUS};
pub use error::{ProjectionError, Result};
pub use grid::{builtin, BuiltinGrid, GridMapping, BUILTIN_NAMES};
pub use lambert::LambertConformal;
pub use mercator::Mercator;
