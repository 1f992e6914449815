//! Spatial views of grid and point datasets.
//!
//! A grid is either *stacked* (one `grid_index` dimension carrying latitude
//! and longitude coordinates) or *unstacked* (separate `yc`/`xc` or
//! `latitude`/`longitude` dimensions). [`stack`] and [`unstack`] convert
//! between the two explicitly.

use align_common::names::{
    CRS_ATTR, GRID_INDEX, GRID_MAPPING_ATTR, LATITUDE, LONGITUDE, POINT_INDEX, XC, YC,
};
use align_common::{properties_of, AlignError, Coordinate, Dataset, PropertyAxis, Result, Space};
use projection::{builtin, Crs, GridMapping};

use crate::triangulation::Point;

/// CRS given either as a builtin grid name or in full.
#[derive(Debug, Clone)]
pub enum CrsSpec {
    Builtin(String),
    Custom(Crs),
}

/// Grid mapping given either as a builtin grid name or in full.
#[derive(Debug, Clone)]
pub enum GridMappingSpec {
    Builtin(String),
    Custom(GridMapping),
}

fn require_grid(ds: &Dataset, action: &str) -> Result<()> {
    if properties_of(ds)?.space == Space::Point {
        return Err(AlignError::precondition(format!("{} is not possible on a POINT dataset", action)));
    }
    Ok(())
}

/// Attach a CRS to a grid dataset.
pub fn add_crs(mut ds: Dataset, crs: &CrsSpec) -> Result<Dataset> {
    require_grid(&ds, "adding a CRS")?;
    let crs = match crs {
        CrsSpec::Builtin(name) => builtin(name)
            .map_err(|_| AlignError::configuration(format!("crs: {} not found in supported projections", name)))?
            .crs,
        CrsSpec::Custom(crs) => crs.clone(),
    };
    ds.attrs.encode(CRS_ATTR, &crs)?;
    Ok(ds)
}

/// Attach a grid mapping to a grid dataset.
pub fn add_grid_mapping(mut ds: Dataset, mapping: &GridMappingSpec) -> Result<Dataset> {
    require_grid(&ds, "adding a grid mapping")?;
    let mapping = match mapping {
        GridMappingSpec::Builtin(name) => builtin(name)
            .map_err(|_| AlignError::configuration(format!("grid mapping: {} not found in supported mappings", name)))?
            .grid_mapping,
        GridMappingSpec::Custom(mapping) => mapping.clone(),
    };
    ds.attrs.encode(GRID_MAPPING_ATTR, &mapping)?;
    Ok(ds)
}

/// CRS recorded in the dataset attributes.
pub fn crs_of(ds: &Dataset) -> Result<Option<Crs>> {
    ds.attrs.decode(CRS_ATTR)
}

/// Grid mapping recorded in the dataset attributes.
pub fn grid_mapping_of(ds: &Dataset) -> Result<Option<GridMapping>> {
    ds.attrs.decode(GRID_MAPPING_ATTR)
}

/// True for a single `grid_index` dimension, false for separate planar or
/// geographic axes.
pub fn is_stacked(ds: &Dataset) -> Result<bool> {
    let has = |a: &str, b: &str| ds.has_dim(a) && ds.has_dim(b);
    if has(XC, YC) || has(LONGITUDE, LATITUDE) {
        Ok(false)
    } else if ds.has_dim(GRID_INDEX) {
        Ok(true)
    } else {
        Err(AlignError::schema(
            PropertyAxis::Space,
            "dataset does not have expected dimensions for GRID",
        ))
    }
}

/// Flatten an unstacked grid into `grid_index`, row (`yc`/`latitude`) major.
pub fn stack(ds: &Dataset) -> Result<Dataset> {
    require_grid(ds, "stacking")?;
    if is_stacked(ds)? {
        return Ok(ds.clone());
    }
    if ds.has_dim(XC) && ds.has_dim(YC) {
        ds.stack(YC, XC, GRID_INDEX)
    } else {
        ds.stack(LATITUDE, LONGITUDE, GRID_INDEX)
    }
}

/// Reshape a stacked grid into `(yc, xc)` using its grid mapping and CRS.
///
/// `crs` and `mapping` override the dataset attributes; both end up stored
/// on the result.
pub fn unstack(ds: &Dataset, crs: Option<&Crs>, mapping: Option<&GridMapping>) -> Result<Dataset> {
    require_grid(ds, "unstacking")?;
    if !is_stacked(ds)? {
        return Ok(ds.clone());
    }
    let mapping = match mapping {
        Some(m) => m.clone(),
        None => grid_mapping_of(ds)?.ok_or_else(|| {
            AlignError::configuration("did not find a grid_mapping in the dataset attributes, please provide it")
        })?,
    };
    let crs = match crs {
        Some(c) => c.clone(),
        None => crs_of(ds)?.ok_or_else(|| AlignError::configuration("source dataset does not have a crs attribute"))?,
    };
    let n = ds.dim_size(GRID_INDEX).unwrap_or(0);
    if n != mapping.size() {
        return Err(AlignError::dimension(format!(
            "size of grid_index ({}) does not match product of nx and ny ({})",
            n,
            mapping.size()
        )));
    }

    let (xc, yc) = mapping.axes(&crs);
    let mut out = ds
        .drop_vars(&[XC, YC])
        .unstack(GRID_INDEX, (YC, mapping.ny), (XC, mapping.nx))?
        .with_coord(XC, Coordinate::float(XC, xc))?
        .with_coord(YC, Coordinate::float(YC, yc))?;
    out.attrs.encode(CRS_ATTR, &crs)?;
    out.attrs.encode(GRID_MAPPING_ATTR, &mapping)?;
    Ok(out)
}

/// Add projected `xc`/`yc` coordinates along the spatial index dimension.
pub fn add_xy(ds: &Dataset, crs: Option<&Crs>) -> Result<Dataset> {
    if ds.has_dim(LONGITUDE) && ds.has_dim(LATITUDE) {
        return Err(AlignError::precondition(
            "cannot add x/y coordinates to a dataset that has longitude/latitude dimensions",
        ));
    }
    if ds.has_coord(XC) && ds.has_coord(YC) {
        return Ok(ds.clone());
    }
    let crs = match crs {
        Some(c) => c.clone(),
        None => crs_of(ds)?
            .ok_or_else(|| AlignError::configuration("no CRS provided and no CRS found in dataset attributes"))?,
    };
    let index_dim = match properties_of(ds)?.space {
        Space::Grid => GRID_INDEX,
        Space::Point => POINT_INDEX,
    };
    let lon = coord_values(ds, LONGITUDE, index_dim)?;
    let lat = coord_values(ds, LATITUDE, index_dim)?;
    let xyz = crs
        .transform_points(&lon, &lat, &Crs::plate_carree())
        .map_err(|e| AlignError::dimension(e.to_string()))?;
    let mut out = ds.clone();
    out.assign_coord(XC, Coordinate::float(index_dim, xyz.iter().map(|p| p[0]).collect()))?;
    out.assign_coord(YC, Coordinate::float(index_dim, xyz.iter().map(|p| p[1]).collect()))?;
    Ok(out)
}

/// Values of a float coordinate that must lie along `dim` only.
pub(crate) fn coord_values(ds: &Dataset, name: &str, dim: &str) -> Result<Vec<f64>> {
    let coord = ds.require_coord(name)?;
    if !(coord.dims.len() == 1 && coord.dims[0] == dim) {
        return Err(AlignError::dimension(format!(
            "coordinate '{}' must lie along '{}', found {:?}",
            name, dim, coord.dims
        )));
    }
    coord
        .values
        .as_float()
        .map(|a| a.iter().copied().collect())
        .ok_or_else(|| AlignError::dimension(format!("coordinate '{}' is not numeric", name)))
}

/// `(lat, lon)` pairs of the grid points of a source dataset, in
/// `grid_index` order, or the meshgrid of separate latitude/longitude axes.
pub fn source_points(ds: &Dataset) -> Result<Vec<Point>> {
    if ds.has_dim(LATITUDE) && ds.has_dim(LONGITUDE) {
        let lat = coord_values(ds, LATITUDE, LATITUDE)?;
        let lon = coord_values(ds, LONGITUDE, LONGITUDE)?;
        Ok(lat.iter().flat_map(|&la| lon.iter().map(move |&lo| [la, lo])).collect())
    } else {
        let lat = coord_values(ds, LATITUDE, GRID_INDEX)?;
        let lon = coord_values(ds, LONGITUDE, GRID_INDEX)?;
        Ok(lat.into_iter().zip(lon).map(|(la, lo)| [la, lo]).collect())
    }
}

/// `(lat, lon)` pairs of the target points.
pub fn target_points(ds: &Dataset) -> Result<Vec<Point>> {
    let lat = coord_values(ds, LATITUDE, POINT_INDEX)?;
    let lon = coord_values(ds, LONGITUDE, POINT_INDEX)?;
    Ok(lat.into_iter().zip(lon).map(|(la, lo)| [la, lo]).collect())
}

/// The coordinates of `target` that lie along `point_index`.
pub(crate) fn point_coords(target: &Dataset) -> Vec<(String, Coordinate)> {
    target
        .coords()
        .filter(|(_, c)| c.dims.len() == 1 && c.dims[0] == POINT_INDEX)
        .map(|(name, c)| (name.to_string(), c.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_common::{set_properties, Properties, Time, Variable};
    use chrono::{TimeZone, Utc};
    use ndarray::{ArrayD, IxDyn};

    fn stacked_grid() -> Dataset {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let lat: Vec<f64> = (0..6).map(|k| (k / 3) as f64).collect();
        let lon: Vec<f64> = (0..6).map(|k| (k % 3) as f64).collect();
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 6]), (0..6).map(|v| v as f64).collect()).unwrap();
        let ds = Dataset::new()
            .with_coord("valid_time", Coordinate::times("valid_time", vec![t0]))
            .unwrap()
            .with_coord(LATITUDE, Coordinate::float(GRID_INDEX, lat))
            .unwrap()
            .with_coord(LONGITUDE, Coordinate::float(GRID_INDEX, lon))
            .unwrap()
            .with_var("t2m", Variable::from_dims(&["valid_time", GRID_INDEX], data).unwrap())
            .unwrap();
        set_properties(ds, Properties::deterministic(Space::Grid, Time::Observation)).unwrap()
    }

    fn mapping() -> GridMapping {
        GridMapping {
            nx: 3,
            ny: 2,
            lon_ll: 0.0,
            lat_ll: 0.0,
            lon_ur: None,
            lat_ur: None,
            dx: 1.0,
            dy: 1.0,
        }
    }

    #[test]
    fn test_unstack_then_stack() {
        let ds = stacked_grid();
        assert!(is_stacked(&ds).unwrap());
        let grid = unstack(&ds, Some(&Crs::plate_carree()), Some(&mapping())).unwrap();
        assert!(!is_stacked(&grid).unwrap());
        assert_eq!(grid.dim_size(YC), Some(2));
        assert_eq!(grid.dim_size(XC), Some(3));
        assert_eq!(grid.var("t2m").unwrap().data[[0, 1, 2]], 5.0);
        assert_eq!(grid_mapping_of(&grid).unwrap(), Some(mapping()));

        let again = stack(&grid).unwrap();
        assert_eq!(again.var("t2m").unwrap().data, ds.var("t2m").unwrap().data);
    }

    #[test]
    fn test_unstack_requires_mapping() {
        let err = unstack(&stacked_grid(), Some(&Crs::plate_carree()), None).unwrap_err();
        assert!(matches!(err, AlignError::Configuration(_)));
    }

    #[test]
    fn test_unstack_size_mismatch() {
        let mut bad = mapping();
        bad.nx = 4;
        assert!(unstack(&stacked_grid(), Some(&Crs::plate_carree()), Some(&bad)).is_err());
    }

    #[test]
    fn test_add_builtin_crs() {
        let ds = add_crs(stacked_grid(), &CrsSpec::Builtin("cerra".into())).unwrap();
        assert!(matches!(crs_of(&ds).unwrap(), Some(Crs::LambertConformal(_))));
        let err = add_crs(stacked_grid(), &CrsSpec::Builtin("nowhere".into())).unwrap_err();
        assert!(matches!(err, AlignError::Configuration(_)));
    }

    #[test]
    fn test_add_xy_plate_carree() {
        let ds = add_xy(&stacked_grid(), Some(&Crs::plate_carree())).unwrap();
        let xc = ds.coord(XC).unwrap().values.as_float().unwrap();
        assert_eq!(xc[[4]], 1.0);
    }

    #[test]
    fn test_source_points_order() {
        let points = source_points(&stacked_grid()).unwrap();
        assert_eq!(points[4], [1.0, 1.0]);
    }
}
