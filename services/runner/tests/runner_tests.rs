//! Full runs from a YAML configuration over synthetic files.

use std::path::Path;

use align_common::names::{LEAD_TIME, POINT_INDEX, REFERENCE_TIME, VALID_TIME};
use align_common::{Dataset, Variable};
use mxalign_runner::{RunConfig, Runner};
use ndarray::{ArrayD, IxDyn};
use test_utils::{
    assert_approx_eq, grid_forecast, grid_value, point_observation, stations, temp_dir, write_dataset, write_text,
    GridSpec,
};

/// Station observations that equal the synthetic grid field at the
/// station locations.
fn matching_stations(valid_hours: &[i64]) -> Dataset {
    let points = stations::INSIDE;
    let values = valid_hours
        .iter()
        .flat_map(|&h| points.iter().map(move |&(lat, lon)| grid_value(lat, lon, h)))
        .collect();
    let data = ArrayD::from_shape_vec(IxDyn(&[valid_hours.len(), points.len()]), values).unwrap();
    let mut ds = point_observation(valid_hours, &points);
    ds.insert_var("t2m", Variable::from_dims(&[VALID_TIME, POINT_INDEX], data).unwrap())
        .unwrap();
    ds
}

fn write_inputs(dir: &Path) {
    for r in [0, 6] {
        write_dataset(
            dir,
            &format!("model_20240101{:02}.json", r),
            &grid_forecast(&[r], &[0, 3, 6], &GridSpec::UNIT_4X5),
        );
    }
    let hours: Vec<i64> = (0..=12).collect();
    write_dataset(dir, "stations.json", &matching_stations(&hours));
}

fn run_config(dir: &Path) -> String {
    format!(
        r#"
datasets:
  model:
    loader: grid-forecast
    files: "{dir}/model_{{reference_time:%Y%m%d%H}}.json"
    dates: {{ start: 2024-01-01T00, end: 2024-01-01T12, period: 6h, range: 0h, step: 6h }}
  stations:
    loader: point-observation
    files: "{dir}/stations.json"
transformations:
  kelvin_to_celsius: {{ vars: t2m }}
alignment:
  reference: stations
  time: {{ lead_time: start-min }}
  space:
    interpolation: {{ method: delaunay }}
  save: {{ path: "{dir}/out/{{name}}_{{year}}{{month:02}}{{day:02}}.json" }}
verification:
  reference: stations
  metrics:
    rmse_t2m: {{ function: rmse, variable: t2m }}
    bias_t2m: {{ function: bias, variable: t2m }}
"#,
        dir = dir.display()
    )
}

#[test]
fn test_grid_forecast_against_stations() {
    let dir = temp_dir();
    write_inputs(dir.path());
    let path = write_text(dir.path(), "run.yaml", &run_config(dir.path()));

    let config = RunConfig::load(&path).unwrap();
    // Three reference times expanded, one of which has no file.
    assert_eq!(config.datasets["model"].files.as_slice().len(), 3);

    let mut runner = Runner::new(config);
    let report = runner.run(true).unwrap();

    let model = &runner.datasets()["model"];
    let obs = &runner.datasets()["stations"];
    assert_eq!(model.dim_size(REFERENCE_TIME), Some(2));
    assert_eq!(model.dim_size(POINT_INDEX), Some(stations::INSIDE.len()));
    assert_eq!(obs.index(LEAD_TIME).unwrap(), model.index(LEAD_TIME).unwrap());
    assert_eq!(model.var("t2m").unwrap().dims, obs.var("t2m").unwrap().dims);

    let scores = report.scores.unwrap();
    assert_eq!(scores.models(), vec!["model"]);
    assert_approx_eq!(scores.get("model", "rmse_t2m").unwrap(), 0.0, 1e-9);
    assert_approx_eq!(scores.get("model", "bias_t2m").unwrap(), 0.0, 1e-9);

    let names: Vec<&str> = report.outputs.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["model", "stations"]);
    assert!(report.outputs[0].1.ends_with("/out/model_20240101.json"));
}

#[test]
fn test_custom_transformation_shifts_bias() {
    let dir = temp_dir();
    write_inputs(dir.path());
    let yaml = run_config(dir.path()).replace(
        "kelvin_to_celsius: { vars: t2m }",
        "warm_bias: { offset: 1.5, datasets: [model] }",
    );
    let mut runner = Runner::new(RunConfig::from_yaml(&yaml).unwrap());
    runner.transformations_mut().register_fn("warm_bias", |mut ds: Dataset, params| {
        let offset = params.get("offset").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let mut var = ds.var("t2m").cloned().unwrap();
        var.data.mapv_inplace(|v| v + offset);
        ds.insert_var("t2m", var)?;
        Ok(ds)
    });

    let scores = runner.run(true).unwrap().scores.unwrap();
    assert_approx_eq!(scores.get("model", "bias_t2m").unwrap(), 1.5, 1e-9);
    assert_approx_eq!(scores.get("model", "rmse_t2m").unwrap(), 1.5, 1e-9);
}

#[test]
fn test_skip_verification() {
    let dir = temp_dir();
    write_inputs(dir.path());
    let mut runner = Runner::new(RunConfig::from_yaml(&run_config(dir.path())).unwrap());
    let report = runner.run(false).unwrap();
    assert!(report.scores.is_none());
    assert_eq!(report.outputs.len(), 2);
}

#[test]
fn test_unknown_transformation_fails_the_run() {
    let dir = temp_dir();
    write_inputs(dir.path());
    let yaml = run_config(dir.path()).replace("kelvin_to_celsius", "kelvin_to_rankine");
    let err = Runner::new(RunConfig::from_yaml(&yaml).unwrap()).run(true).unwrap_err();
    assert!(format!("{:#}", err).contains("Unknown transformation: kelvin_to_rankine"));
}

#[test]
fn test_missing_dataset_files_fail_the_load() {
    let dir = temp_dir();
    let yaml = run_config(dir.path());
    let err = Runner::new(RunConfig::from_yaml(&yaml).unwrap()).run(true).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load dataset 'model'"));
}
