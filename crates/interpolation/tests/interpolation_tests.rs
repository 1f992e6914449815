//! End-to-end interpolation of synthetic grids onto stations.

use align_common::names::{GRID_INDEX, LATITUDE, POINT_INDEX, XC, YC};
use align_common::{properties_of, AlignError, Collection, Dataset, Space, Time, Variable};
use indexmap::IndexMap;
use interpolation::{
    interpolate, unstack, CrsSpec, GridMappingSpec, InterpolationOptions, InterpolatorRegistry, Scheme,
    Triangulation,
};
use ndarray::{ArrayD, IxDyn};
use projection::GridMapping;
use test_utils::{
    assert_approx_eq, grid_forecast, grid_observation, grid_value, latlon_observation, station_targets, stations,
    GridSpec,
};

fn registry() -> InterpolatorRegistry {
    InterpolatorRegistry::with_builtins()
}

fn unit_square_source() -> Dataset {
    // (lat, lon) = (0,0), (0,1), (1,0), (1,1) with values 1..4
    let mut ds = grid_observation(&[0], &GridSpec {
        nlat: 2,
        nlon: 2,
        lat0: 0.0,
        lon0: 0.0,
        step: 1.0,
    });
    let data = ArrayD::from_shape_vec(IxDyn(&[1, 4]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    ds.insert_var("t2m", Variable::from_dims(&["valid_time", GRID_INDEX], data).unwrap())
        .unwrap();
    ds
}

fn single(out: Collection<Dataset>) -> Dataset {
    out.into_single().expect("single dataset")
}

#[test]
fn test_delaunay_square_centre_is_bilinear_average() {
    let target = station_targets(&[0], &[(0.5, 0.5)]);
    let out = single(
        interpolate(
            &registry(),
            Collection::Single(unit_square_source()),
            &target,
            "delaunay",
            &InterpolationOptions::default(),
        )
        .unwrap(),
    );
    let t2m = &out.var("t2m").unwrap().data;
    assert_eq!(t2m.shape(), &[1, 1]);
    assert_approx_eq!(t2m[[0, 0]], 2.5, 1e-12);
    assert_eq!(out.var("t2m").unwrap().dims, vec!["valid_time".to_string(), POINT_INDEX.to_string()]);
}

#[test]
fn test_delaunay_constant_field_is_exact() {
    let grid = GridSpec::UNIT_4X5;
    let mut source = grid_forecast(&[0, 6], &[0, 3], &grid);
    let shape = source.var("t2m").unwrap().shape().to_vec();
    let constant = ArrayD::from_elem(IxDyn(&shape), 273.15);
    source
        .insert_var("t2m", Variable::from_dims(&["reference_time", "lead_time", GRID_INDEX], constant).unwrap())
        .unwrap();

    let target = station_targets(&[0], &stations::INSIDE);
    let out = single(
        interpolate(&registry(), source.into(), &target, "delaunay", &InterpolationOptions::default()).unwrap(),
    );
    for v in out.var("t2m").unwrap().data.iter() {
        assert_approx_eq!(*v, 273.15, 1e-9);
    }
}

#[test]
fn test_delaunay_reproduces_linear_field_and_retags_space() {
    let grid = GridSpec::UNIT_4X5;
    let source = grid_forecast(&[0, 6], &[0, 3], &grid);
    let target = station_targets(&[0], &stations::INSIDE);
    let out = single(
        interpolate(&registry(), source.into(), &target, "delaunay", &InterpolationOptions::default()).unwrap(),
    );

    let props = properties_of(&out).unwrap();
    assert_eq!(props.space, Space::Point);
    assert_eq!(props.time, Time::Forecast);
    assert!(out.has_coord("reference_time"));
    assert!(out.has_coord("lead_time"));
    assert!(!out.has_dim(GRID_INDEX));

    let t2m = &out.var("t2m").unwrap().data;
    assert_eq!(t2m.shape(), &[2, 2, 3]);
    for (p, &(lat, lon)) in stations::INSIDE.iter().enumerate() {
        assert_approx_eq!(t2m[[1, 1, p]], grid_value(lat, lon, 9), 1e-9);
    }
}

#[test]
fn test_delaunay_outside_hull_is_nan() {
    let target = station_targets(&[0], &[(0.5, 0.5), stations::OUTSIDE]);
    let out = single(
        interpolate(
            &registry(),
            unit_square_source().into(),
            &target,
            "delaunay",
            &InterpolationOptions::default(),
        )
        .unwrap(),
    );
    let t2m = &out.var("t2m").unwrap().data;
    assert!(t2m[[0, 0]].is_finite());
    assert!(t2m[[0, 1]].is_nan());
}

#[test]
fn test_delaunay_rejects_chunked_grid_index() {
    let mut source = grid_observation(&[0, 1], &GridSpec::UNIT_4X5);
    let var = source.var("t2m").unwrap().clone().chunked(&[(GRID_INDEX, 5)]).unwrap();
    source.insert_var("t2m", var).unwrap();
    let target = station_targets(&[0], &stations::INSIDE);
    let err = interpolate(&registry(), source.into(), &target, "delaunay", &InterpolationOptions::default())
        .unwrap_err();
    assert!(matches!(err, AlignError::Precondition(ref m) if m.contains("grid_index")));
}

#[test]
fn test_delaunay_accepts_chunked_leading_dims() {
    let mut source = grid_observation(&[0, 1, 2, 3], &GridSpec::UNIT_4X5);
    let var = source.var("t2m").unwrap().clone().chunked(&[("valid_time", 3)]).unwrap();
    source.insert_var("t2m", var).unwrap();
    let target = station_targets(&[0], &stations::INSIDE);
    let out = single(
        interpolate(&registry(), source.into(), &target, "delaunay", &InterpolationOptions::default()).unwrap(),
    );
    let t2m = &out.var("t2m").unwrap().data;
    let (lat, lon) = stations::INSIDE[1];
    assert_approx_eq!(t2m[[3, 1]], grid_value(lat, lon, 3), 1e-9);
}

#[test]
fn test_delaunay_requires_linear_scheme() {
    let target = station_targets(&[0], &stations::INSIDE);
    let err = interpolate(
        &registry(),
        unit_square_source().into(),
        &target,
        "delaunay",
        &InterpolationOptions::with_scheme(Scheme::Nearest),
    )
    .unwrap_err();
    assert!(matches!(err, AlignError::Configuration(_)));
}

#[test]
fn test_delaunay_requires_stacked_source() {
    let source = latlon_observation(&[0], &GridSpec::UNIT_4X5);
    let target = station_targets(&[0], &stations::INSIDE);
    let err = interpolate(&registry(), source.into(), &target, "delaunay", &InterpolationOptions::default())
        .unwrap_err();
    assert!(matches!(err, AlignError::Unsupported(_)));
}

#[test]
fn test_unknown_method_is_configuration_error() {
    let target = station_targets(&[0], &stations::INSIDE);
    let err = interpolate(
        &registry(),
        unit_square_source().into(),
        &target,
        "does-not-exist",
        &InterpolationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AlignError::Configuration(ref m) if m == "Unknown interpolation: does-not-exist"));
}

#[test]
fn test_skipped_variable_is_dropped() {
    let mut source = grid_observation(&[0], &GridSpec::UNIT_4X5);
    source
        .insert_var(
            "station_count",
            Variable::from_dims(&["valid_time"], ArrayD::from_elem(IxDyn(&[1]), 3.0)).unwrap(),
        )
        .unwrap();
    let target = station_targets(&[0], &stations::INSIDE);
    let out = single(
        interpolate(&registry(), source.into(), &target, "delaunay", &InterpolationOptions::default()).unwrap(),
    );
    assert!(out.var("t2m").is_some());
    assert!(out.var("station_count").is_none());
}

#[test]
fn test_collection_shape_is_kept() {
    let grid = GridSpec::UNIT_4X5;
    let mut members = IndexMap::new();
    members.insert("a".to_string(), grid_observation(&[0], &grid));
    members.insert("b".to_string(), grid_observation(&[1], &grid));
    let target = station_targets(&[0], &stations::INSIDE);
    let out = interpolate(
        &registry(),
        Collection::Map(members),
        &target,
        "delaunay",
        &InterpolationOptions::default(),
    )
    .unwrap();
    let out = out.into_map().unwrap();
    assert_eq!(out.keys().collect::<Vec<_>>(), vec!["a", "b"]);

    let list = interpolate(
        &registry(),
        Collection::List(vec![grid_observation(&[0], &grid)]),
        &target,
        "delaunay",
        &InterpolationOptions::default(),
    )
    .unwrap();
    assert!(matches!(list, Collection::List(ref v) if v.len() == 1));
}

#[test]
fn test_xarray_from_latlon_dims() {
    let source = latlon_observation(&[0, 1], &GridSpec::UNIT_4X5);
    let target = station_targets(&[0], &stations::INSIDE);
    let out = single(
        interpolate(&registry(), source.into(), &target, "xarray", &InterpolationOptions::default()).unwrap(),
    );
    let t2m = &out.var("t2m").unwrap().data;
    assert_eq!(t2m.shape(), &[2, 3]);
    for (p, &(lat, lon)) in stations::INSIDE.iter().enumerate() {
        assert_approx_eq!(t2m[[1, p]], grid_value(lat, lon, 1), 1e-9);
    }
    let lat = out.coord(LATITUDE).unwrap();
    assert_eq!(lat.dims, vec![POINT_INDEX.to_string()]);
    assert_eq!(properties_of(&out).unwrap().space, Space::Point);
}

#[test]
fn test_xarray_nearest_scheme() {
    let source = latlon_observation(&[0], &GridSpec::UNIT_4X5);
    let target = station_targets(&[0], &[(1.25, 2.75)]);
    let out = single(
        interpolate(
            &registry(),
            source.into(),
            &target,
            "xarray",
            &InterpolationOptions::with_scheme(Scheme::Nearest),
        )
        .unwrap(),
    );
    assert_approx_eq!(out.var("t2m").unwrap().data[[0, 0]], grid_value(1.0, 3.0, 0), 1e-12);
}

#[test]
fn test_xarray_from_stacked_plate_carree_grid() {
    let grid = GridSpec::UNIT_4X5;
    let source = grid_observation(&[0], &grid);
    let source = interpolation::add_crs(source, &CrsSpec::Custom(projection::Crs::plate_carree())).unwrap();
    let mapping = GridMapping {
        nx: grid.nlon,
        ny: grid.nlat,
        lon_ll: 0.0,
        lat_ll: 0.0,
        lon_ur: None,
        lat_ur: None,
        dx: 1.0,
        dy: 1.0,
    };
    let source = interpolation::add_grid_mapping(source, &GridMappingSpec::Custom(mapping)).unwrap();

    let target = station_targets(&[0], &stations::INSIDE);
    let out = single(
        interpolate(&registry(), source.into(), &target, "xarray", &InterpolationOptions::default()).unwrap(),
    );
    assert!(!out.has_coord(XC));
    assert!(!out.has_coord(YC));
    assert!(!out.attrs.contains("crs"));
    let t2m = &out.var("t2m").unwrap().data;
    for (p, &(lat, lon)) in stations::INSIDE.iter().enumerate() {
        assert_approx_eq!(t2m[[0, p]], grid_value(lat, lon, 0), 1e-9);
    }
}

#[test]
fn test_xarray_requires_crs_for_projected_grid() {
    let grid = GridSpec::UNIT_4X5;
    let mapping = GridMapping {
        nx: grid.nlon,
        ny: grid.nlat,
        lon_ll: 0.0,
        lat_ll: 0.0,
        lon_ur: None,
        lat_ur: None,
        dx: 1.0,
        dy: 1.0,
    };
    let mut source = unstack(
        &grid_observation(&[0], &grid),
        Some(&projection::Crs::plate_carree()),
        Some(&mapping),
    )
    .unwrap();
    assert!(source.has_dim(XC) && source.has_dim(YC));
    source.attrs.remove("crs");

    let target = station_targets(&[0], &stations::INSIDE);
    let err = interpolate(&registry(), source.into(), &target, "xarray", &InterpolationOptions::default())
        .unwrap_err();
    assert!(matches!(err, AlignError::Configuration(ref m) if m.contains("crs")));
}

#[test]
fn test_triangulation_covers_nearly_collinear_hull() {
    // Lower boundary bowed inwards by 1e-5 * (x - 5)^2 under a straight top row.
    let c = 1e-5;
    let mut points: Vec<[f64; 2]> = (0..=10).map(|x| [x as f64, -c * (x as f64 - 5.0).powi(2)]).collect();
    points.extend((0..=10).map(|x| [x as f64, 1.0]));

    let tri = Triangulation::new(&points).unwrap();
    assert_eq!(tri.simplices().len(), 29);

    let (_, bary) = tri.locate([5.0, -c * 12.5]).expect("point inside the hull");
    assert!(bary.iter().all(|&b| b >= -1e-9));
    assert_approx_eq!(bary.iter().sum::<f64>(), 1.0, 1e-9);
}
