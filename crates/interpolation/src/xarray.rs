//! Rectilinear interpolation along the source's native axes.
//!
//! Targets are located on either the `(latitude, longitude)` dimension axes,
//! or, for projected grids, on the `(yc, xc)` axes after transforming the
//! target longitude/latitude into the source CRS.

use align_common::names::{LATITUDE, LONGITUDE, POINT_INDEX, XC, YC};
use align_common::{AlignError, Dataset, Result, Variable};
use ndarray::{ArrayD, IxDyn};
use projection::Crs;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::interpolator::{assemble_output, Interpolator};
use crate::options::{InterpolationOptions, Scheme};
use crate::space::{coord_values, crs_of, is_stacked, unstack};

pub struct XarrayInterpolator {
    target: Dataset,
    scheme: Scheme,
}

impl XarrayInterpolator {
    pub const NAME: &'static str = "xarray";

    pub fn new(target: &Dataset, options: &InterpolationOptions) -> Result<Self> {
        Ok(Self {
            target: target.clone(),
            scheme: options.scheme,
        })
    }

    fn from_latlon(&self, source: &Dataset) -> Result<Dataset> {
        let lat = coord_values(source, LATITUDE, LATITUDE)?;
        let lon = coord_values(source, LONGITUDE, LONGITUDE)?;
        let tgt_lat = coord_values(&self.target, LATITUDE, POINT_INDEX)?;
        let tgt_lon = coord_values(&self.target, LONGITUDE, POINT_INDEX)?;
        let axes = Axes {
            y_dim: LATITUDE,
            x_dim: LONGITUDE,
            y: lat,
            x: lon,
        };
        self.interpolate_on(source, &axes, &tgt_lat, &tgt_lon)
    }

    fn from_xcyc(&self, source: &Dataset) -> Result<Dataset> {
        let crs: Crs =
            crs_of(source)?.ok_or_else(|| AlignError::configuration("Source dataset does not have a crs-attribute"))?;
        let tgt_lat = coord_values(&self.target, LATITUDE, POINT_INDEX)?;
        let tgt_lon = coord_values(&self.target, LONGITUDE, POINT_INDEX)?;
        let xyz = crs
            .transform_points(&tgt_lon, &tgt_lat, &Crs::plate_carree())
            .map_err(|e| AlignError::dimension(e.to_string()))?;
        let x: Vec<f64> = xyz.iter().map(|p| p[0]).collect();
        let y: Vec<f64> = xyz.iter().map(|p| p[1]).collect();
        let axes = Axes {
            y_dim: YC,
            x_dim: XC,
            y: coord_values(source, YC, YC)?,
            x: coord_values(source, XC, XC)?,
        };
        self.interpolate_on(source, &axes, &y, &x)
    }

    fn interpolate_on(&self, source: &Dataset, axes: &Axes, ty: &[f64], tx: &[f64]) -> Result<Dataset> {
        let positions: Vec<Option<(f64, f64)>> = ty
            .iter()
            .zip(tx)
            .map(|(&y, &x)| Some((fractional_index(&axes.y, y)?, fractional_index(&axes.x, x)?)))
            .collect();
        let outside = positions.iter().filter(|p| p.is_none()).count();
        debug!(n_target = positions.len(), outside, "Located targets on source axes");

        let source = source.transpose_last(axes.y_dim).transpose_last(axes.x_dim);
        let (ny, nx) = (axes.y.len(), axes.x.len());
        if ny * nx == 0 {
            return Err(AlignError::dimension(format!(
                "cannot interpolate on an empty {}/{} grid",
                axes.y_dim, axes.x_dim
            )));
        }
        let mut variables = Vec::new();
        for (name, var) in source.data_vars() {
            let n = var.dims.len();
            if n < 2 || var.dims[n - 2] != axes.y_dim || var.dims[n - 1] != axes.x_dim {
                warn!(variable = name, "Skipping variable, it does not span both {} and {}", axes.y_dim, axes.x_dim);
                continue;
            }
            let values: Vec<f64> = var.data.iter().copied().collect();
            let rows: Vec<Vec<f64>> = values
                .par_chunks(ny * nx)
                .map(|field| {
                    positions
                        .iter()
                        .map(|p| match p {
                            Some((fy, fx)) => match self.scheme {
                                Scheme::Linear => bilinear(field, nx, ny, *fx, *fy),
                                Scheme::Nearest => nearest(field, nx, ny, *fx, *fy),
                            },
                            None => f64::NAN,
                        })
                        .collect()
                })
                .collect();

            let mut shape = var.shape()[..n - 2].to_vec();
            shape.push(positions.len());
            let flat: Vec<f64> = rows.into_iter().flatten().collect();
            let data = ArrayD::from_shape_vec(IxDyn(&shape), flat)?;
            let mut dims = var.dims[..n - 2].to_vec();
            dims.push(POINT_INDEX.to_string());
            variables.push((name.to_string(), Variable::new(dims, data)?));
        }
        assemble_output(&source, &self.target, variables)
    }
}

impl Interpolator for XarrayInterpolator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interpolate_raw(&mut self, source: &Dataset) -> Result<Dataset> {
        if source.has_dim(LATITUDE) && source.has_dim(LONGITUDE) {
            return self.from_latlon(source);
        }
        let source = if is_stacked(source)? {
            unstack(source, None, None).map_err(|e| {
                AlignError::precondition(format!(
                    "Cannot unstack dataset, dataset must be unstacked to use xarray interpolation ({})",
                    e
                ))
            })?
        } else {
            source.clone()
        };
        self.from_xcyc(&source)
    }
}

struct Axes {
    y_dim: &'static str,
    x_dim: &'static str,
    y: Vec<f64>,
    x: Vec<f64>,
}

/// Position of `v` along a monotonic axis as a fractional index, or `None`
/// outside the axis range.
fn fractional_index(axis: &[f64], v: f64) -> Option<f64> {
    if !v.is_finite() || axis.is_empty() {
        return None;
    }
    if axis.len() == 1 {
        return (axis[0] == v).then_some(0.0);
    }
    let ascending = axis[axis.len() - 1] >= axis[0];
    let key = |a: f64| if ascending { a } else { -a };
    let target = key(v);
    if target < key(axis[0]) || target > key(axis[axis.len() - 1]) {
        return None;
    }
    // First node strictly beyond the target, clamped so the segment is valid.
    let upper = axis.partition_point(|&a| key(a) <= target).clamp(1, axis.len() - 1);
    let (lo, hi) = (key(axis[upper - 1]), key(axis[upper]));
    let frac = if hi == lo { 0.0 } else { (target - lo) / (hi - lo) };
    Some((upper - 1) as f64 + frac)
}

fn bilinear(data: &[f64], width: usize, height: usize, x: f64, y: f64) -> f64 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    if x0 >= width || y0 >= height {
        return f64::NAN;
    }
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

fn nearest(data: &[f64], width: usize, height: usize, x: f64, y: f64) -> f64 {
    let col = x.round() as usize;
    let row = y.round() as usize;
    if col >= width || row >= height {
        return f64::NAN;
    }
    data[row * width + col]
}
