//! The interpolator interface and shared output assembly.

use align_common::names::{CRS_ATTR, GRID_INDEX, GRID_MAPPING_ATTR, LATITUDE, LONGITUDE, XC, YC};
use align_common::{update_space_property, Dataset, Result, Space, Variable};

use crate::space::point_coords;

/// A grid-to-point interpolator bound to one target dataset.
pub trait Interpolator: Send {
    /// Registry name of the method.
    fn name(&self) -> &'static str;

    fn source_space(&self) -> Space {
        Space::Grid
    }

    fn target_space(&self) -> Space {
        Space::Point
    }

    /// Interpolate without touching the property tags.
    fn interpolate_raw(&mut self, source: &Dataset) -> Result<Dataset>;

    /// Interpolate and retag the result with the target space.
    fn interpolate(&mut self, source: &Dataset) -> Result<Dataset> {
        let out = self.interpolate_raw(source)?;
        update_space_property(out, self.target_space())
    }
}

const SPATIAL_DIMS: [&str; 5] = [GRID_INDEX, XC, YC, LATITUDE, LONGITUDE];

/// Build an interpolated dataset: the source's non-spatial coordinates, the
/// target's point coordinates and the interpolated variables.
pub(crate) fn assemble_output(
    source: &Dataset,
    target: &Dataset,
    variables: Vec<(String, Variable)>,
) -> Result<Dataset> {
    let mut out = Dataset::new();
    for (name, coord) in source.coords() {
        if SPATIAL_DIMS.contains(&name) || coord.dims.iter().any(|d| SPATIAL_DIMS.contains(&d.as_str())) {
            continue;
        }
        out.assign_coord(name, coord.clone())?;
    }
    for (name, coord) in point_coords(target) {
        out.assign_coord(name, coord)?;
    }
    for (name, var) in variables {
        out.insert_var(name, var)?;
    }

    let mut attrs = source.attrs.clone();
    attrs.remove(CRS_ATTR);
    attrs.remove(GRID_MAPPING_ATTR);
    Ok(out.with_attrs(attrs))
}
