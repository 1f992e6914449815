//! Regular projected grid definitions and the builtin grids.

use serde::{Deserialize, Serialize};

use crate::crs::{Crs, SPHERE_RADIUS};
use crate::error::{ProjectionError, Result};

/// Layout of a regular grid in projected coordinates.
///
/// The lower-left corner is given geographically; cell centres are spaced
/// `dx`, `dy` metres apart along the projected axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMapping {
    pub nx: usize,
    pub ny: usize,
    pub lon_ll: f64,
    pub lat_ll: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon_ur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_ur: Option<f64>,
    pub dx: f64,
    pub dy: f64,
}

impl GridMapping {
    pub fn size(&self) -> usize {
        self.nx * self.ny
    }

    /// Projected axis values `(xc, yc)` of the grid in `crs`.
    pub fn axes(&self, crs: &Crs) -> (Vec<f64>, Vec<f64>) {
        let (x_ll, y_ll) = crs.transform_point(self.lon_ll, self.lat_ll, &Crs::plate_carree());
        let xc = (0..self.nx).map(|i| x_ll + i as f64 * self.dx).collect();
        let yc = (0..self.ny).map(|j| y_ll + j as f64 * self.dy).collect();
        (xc, yc)
    }
}

/// A named projection together with its native grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinGrid {
    pub name: &'static str,
    pub crs: Crs,
    pub grid_mapping: GridMapping,
}

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: &[&str] = &["cerra", "uwcw"];

/// Look up a builtin grid by case-insensitive name.
pub fn builtin(name: &str) -> Result<BuiltinGrid> {
    match name.to_lowercase().as_str() {
        "cerra" => Ok(BuiltinGrid {
            name: "cerra",
            crs: Crs::lambert_conformal(8.0, 50.0, [50.0, 50.0], SPHERE_RADIUS)?,
            grid_mapping: GridMapping {
                nx: 1069,
                ny: 1069,
                lon_ll: -17.4859,
                lat_ll: 20.2923,
                lon_ur: Some(74.1051),
                lat_ur: Some(63.7695),
                dx: 5500.0,
                dy: 5500.0,
            },
        }),
        "uwcw" => Ok(BuiltinGrid {
            name: "uwcw",
            crs: Crs::lambert_conformal(-1.96590281, 55.5164337, [55.499996, 55.499996], SPHERE_RADIUS)?,
            grid_mapping: GridMapping {
                nx: 1909,
                ny: 1609,
                lon_ll: -25.4470005,
                lat_ll: 39.6389999,
                lon_ur: Some(40.1508102),
                lat_ur: Some(62.6713715),
                dx: 2000.0,
                dy: 2000.0,
            },
        }),
        _ => Err(ProjectionError::UnknownBuiltin(name.to_string())),
    }
}
