//! Synthetic dataset generators.
//!
//! Every generator fills its variable with a value that can be recomputed
//! from the coordinates, so tests can check selections and interpolations
//! exactly:
//!
//! - point datasets: `valid hour + 100 * point`
//! - grid datasets: `lat + 2 * lon + valid hour` (linear in space, so any
//!   linear interpolation reproduces it at in-hull targets)

use align_common::names::{
    GRID_INDEX, LATITUDE, LEAD_TIME, LONGITUDE, POINT_INDEX, REFERENCE_TIME, VALID_TIME,
};
use align_common::{set_properties, Coordinate, Dataset, Properties, Space, Time, Variable};
use ndarray::{ArrayD, IxDyn};

use crate::fixtures::{leads, times};

/// Regular latitude/longitude grid layout.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub nlat: usize,
    pub nlon: usize,
    pub lat0: f64,
    pub lon0: f64,
    pub step: f64,
}

impl GridSpec {
    /// 4 latitudes x 5 longitudes at unit spacing from the origin.
    pub const UNIT_4X5: GridSpec = GridSpec {
        nlat: 4,
        nlon: 5,
        lat0: 0.0,
        lon0: 0.0,
        step: 1.0,
    };

    pub fn lats(&self) -> Vec<f64> {
        (0..self.nlat).map(|i| self.lat0 + i as f64 * self.step).collect()
    }

    pub fn lons(&self) -> Vec<f64> {
        (0..self.nlon).map(|j| self.lon0 + j as f64 * self.step).collect()
    }

    /// Stacked `(lat, lon)` pairs, latitude major.
    pub fn points(&self) -> Vec<(f64, f64)> {
        let lons = self.lons();
        self.lats()
            .into_iter()
            .flat_map(|la| lons.iter().map(move |&lo| (la, lo)))
            .collect()
    }
}

/// The synthetic grid field.
pub fn grid_value(lat: f64, lon: f64, valid_hour: i64) -> f64 {
    lat + 2.0 * lon + valid_hour as f64
}

/// The synthetic point field.
pub fn point_value(valid_hour: i64, point: usize) -> f64 {
    valid_hour as f64 + 100.0 * point as f64
}

fn tagged(ds: Dataset, space: Space, time: Time) -> Dataset {
    set_properties(ds, Properties::deterministic(space, time)).expect("synthetic dataset satisfies its properties")
}

fn array(shape: &[usize], values: Vec<f64>) -> ArrayD<f64> {
    ArrayD::from_shape_vec(IxDyn(shape), values).expect("shape matches values")
}

fn with_points(ds: Dataset, points: &[(f64, f64)]) -> Dataset {
    ds.with_coord(LATITUDE, Coordinate::float(POINT_INDEX, points.iter().map(|p| p.0).collect()))
        .and_then(|ds| ds.with_coord(LONGITUDE, Coordinate::float(POINT_INDEX, points.iter().map(|p| p.1).collect())))
        .expect("point coordinates")
}

fn forecast_axes(ds: Dataset, ref_hours: &[i64], lead_hours: &[i64]) -> Dataset {
    ds.with_coord(REFERENCE_TIME, Coordinate::times(REFERENCE_TIME, times(ref_hours)))
        .and_then(|ds| ds.with_coord(LEAD_TIME, Coordinate::deltas(LEAD_TIME, leads(lead_hours))))
        .expect("forecast time axes")
}

/// Point forecast with a `t2m` variable over `(reference_time, lead_time, point_index)`.
pub fn point_forecast(ref_hours: &[i64], lead_hours: &[i64], points: &[(f64, f64)]) -> Dataset {
    let mut values = Vec::new();
    for &r in ref_hours {
        for &l in lead_hours {
            values.extend((0..points.len()).map(|p| point_value(r + l, p)));
        }
    }
    let data = array(&[ref_hours.len(), lead_hours.len(), points.len()], values);
    let ds = with_points(forecast_axes(Dataset::new(), ref_hours, lead_hours), points)
        .with_var(
            "t2m",
            Variable::from_dims(&[REFERENCE_TIME, LEAD_TIME, POINT_INDEX], data).expect("variable"),
        )
        .expect("t2m");
    tagged(ds, Space::Point, Time::Forecast)
}

/// Point observation with a `t2m` variable over `(valid_time, point_index)`.
pub fn point_observation(valid_hours: &[i64], points: &[(f64, f64)]) -> Dataset {
    let values = valid_hours
        .iter()
        .flat_map(|&h| (0..points.len()).map(move |p| point_value(h, p)))
        .collect();
    let data = array(&[valid_hours.len(), points.len()], values);
    let ds = with_points(Dataset::new(), points)
        .with_coord(VALID_TIME, Coordinate::times(VALID_TIME, times(valid_hours)))
        .and_then(|ds| ds.with_var("t2m", Variable::from_dims(&[VALID_TIME, POINT_INDEX], data)?))
        .expect("t2m");
    tagged(ds, Space::Point, Time::Observation)
}

fn with_stacked_grid(ds: Dataset, grid: &GridSpec) -> Dataset {
    let points = grid.points();
    ds.with_coord(LATITUDE, Coordinate::float(GRID_INDEX, points.iter().map(|p| p.0).collect()))
        .and_then(|ds| ds.with_coord(LONGITUDE, Coordinate::float(GRID_INDEX, points.iter().map(|p| p.1).collect())))
        .expect("grid coordinates")
}

/// Stacked grid forecast over `(reference_time, lead_time, grid_index)`.
pub fn grid_forecast(ref_hours: &[i64], lead_hours: &[i64], grid: &GridSpec) -> Dataset {
    let points = grid.points();
    let mut values = Vec::new();
    for &r in ref_hours {
        for &l in lead_hours {
            values.extend(points.iter().map(|&(la, lo)| grid_value(la, lo, r + l)));
        }
    }
    let data = array(&[ref_hours.len(), lead_hours.len(), points.len()], values);
    let ds = with_stacked_grid(forecast_axes(Dataset::new(), ref_hours, lead_hours), grid)
        .with_var(
            "t2m",
            Variable::from_dims(&[REFERENCE_TIME, LEAD_TIME, GRID_INDEX], data).expect("variable"),
        )
        .expect("t2m");
    tagged(ds, Space::Grid, Time::Forecast)
}

/// Stacked grid observation over `(valid_time, grid_index)`.
pub fn grid_observation(valid_hours: &[i64], grid: &GridSpec) -> Dataset {
    let points = grid.points();
    let values = valid_hours
        .iter()
        .flat_map(|&h| points.iter().map(move |&(la, lo)| grid_value(la, lo, h)))
        .collect();
    let data = array(&[valid_hours.len(), points.len()], values);
    let ds = with_stacked_grid(Dataset::new(), grid)
        .with_coord(VALID_TIME, Coordinate::times(VALID_TIME, times(valid_hours)))
        .and_then(|ds| ds.with_var("t2m", Variable::from_dims(&[VALID_TIME, GRID_INDEX], data)?))
        .expect("t2m");
    tagged(ds, Space::Grid, Time::Observation)
}

/// Unstacked grid observation over `(valid_time, latitude, longitude)`.
pub fn latlon_observation(valid_hours: &[i64], grid: &GridSpec) -> Dataset {
    let (lats, lons) = (grid.lats(), grid.lons());
    let mut values = Vec::new();
    for &h in valid_hours {
        for &la in &lats {
            values.extend(lons.iter().map(|&lo| grid_value(la, lo, h)));
        }
    }
    let data = array(&[valid_hours.len(), lats.len(), lons.len()], values);
    let ds = Dataset::new()
        .with_coord(VALID_TIME, Coordinate::times(VALID_TIME, times(valid_hours)))
        .and_then(|ds| ds.with_coord(LATITUDE, Coordinate::float(LATITUDE, lats)))
        .and_then(|ds| ds.with_coord(LONGITUDE, Coordinate::float(LONGITUDE, lons)))
        .and_then(|ds| ds.with_var("t2m", Variable::from_dims(&[VALID_TIME, LATITUDE, LONGITUDE], data)?))
        .expect("t2m");
    tagged(ds, Space::Grid, Time::Observation)
}

/// Time-tagged point observation holding only station coordinates and times.
pub fn station_targets(valid_hours: &[i64], points: &[(f64, f64)]) -> Dataset {
    point_observation(valid_hours, points).drop_vars(&["t2m"]).coords_only()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_points_latitude_major() {
        let points = GridSpec::UNIT_4X5.points();
        assert_eq!(points.len(), 20);
        assert_eq!(points[1], (0.0, 1.0));
        assert_eq!(points[5], (1.0, 0.0));
    }

    #[test]
    fn test_point_forecast_values() {
        let ds = point_forecast(&[0, 6], &[0, 3], &[(0.0, 0.0), (1.0, 1.0)]);
        let t2m = &ds.var("t2m").unwrap().data;
        assert_eq!(t2m.shape(), &[2, 2, 2]);
        assert_eq!(t2m[[1, 1, 1]], point_value(9, 1));
    }

    #[test]
    fn test_grid_forecast_values() {
        let ds = grid_forecast(&[0], &[0, 6], &GridSpec::UNIT_4X5);
        let t2m = &ds.var("t2m").unwrap().data;
        // grid_index 7 is (lat 1, lon 2)
        assert_eq!(t2m[[0, 1, 7]], grid_value(1.0, 2.0, 6));
    }
}
