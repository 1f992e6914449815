//! Grid-to-point interpolation.
//!
//! Two methods are registered by default:
//!
//! - `delaunay`: barycentric weights on a Delaunay triangulation of the
//!   stacked source grid, assembled once into a sparse matrix and applied
//!   block by block to every variable
//! - `xarray`: rectilinear linear (or nearest) interpolation along the
//!   source's `latitude`/`longitude` or projected `yc`/`xc` axes
//!
//! Weight matrices are cached per interpolator, keyed by the exact contents
//! of the source and target point sets.

pub mod cache;
pub mod delaunay;
pub mod interpolator;
pub mod options;
pub mod registry;
pub mod space;
pub mod triangulation;
pub mod weights;
pub mod xarray;

pub use cache::{CacheStats, WeightCache};
pub use delaunay::DelaunayInterpolator;
pub use interpolator::Interpolator;
pub use options::{InterpolationOptions, Scheme};
pub use registry::{InterpolatorFactory, InterpolatorRegistry};
pub use space::{
    add_crs, add_grid_mapping, add_xy, crs_of, grid_mapping_of, is_stacked, source_points, stack, target_points,
    unstack, CrsSpec, GridMappingSpec,
};
pub use triangulation::{Point, Triangulation};
pub use weights::WeightMatrix;
pub use xarray::XarrayInterpolator;

use align_common::{Collection, Dataset, Result};
use tracing::info;

/// Interpolate every dataset of `sources` onto the points of `target`,
/// keeping the collection shape.
///
/// One interpolator is built per call, so its weight cache is shared by
/// every member of the collection.
pub fn interpolate(
    registry: &InterpolatorRegistry,
    sources: Collection<Dataset>,
    target: &Dataset,
    method: &str,
    options: &InterpolationOptions,
) -> Result<Collection<Dataset>> {
    let mut interpolator = registry.create(method, target, options)?;
    info!(method, n_datasets = sources.len(), "Interpolating");
    sources.try_map(|ds| interpolator.interpolate(&ds))
}
