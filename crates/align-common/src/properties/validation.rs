use std::collections::BTreeSet;

use tracing::debug;

use super::spec::{space_spec, time_spec, uncertainty_spec, PropertySpec};
use super::Properties;
use crate::dataset::Dataset;
use crate::error::{AlignError, PropertyAxis, Result};

fn validate_dims(dims: &BTreeSet<String>, spec: &PropertySpec, axis: PropertyAxis) -> Result<()> {
    if spec.dim_variants.is_empty() {
        return Ok(());
    }
    let matched = spec
        .dim_variants
        .iter()
        .any(|variant| variant.iter().all(|d| dims.contains(*d)));
    if matched {
        return Ok(());
    }
    Err(AlignError::schema(
        axis,
        format!(
            "dataset dims {:?} do not match allowed variants {:?}",
            dims, spec.dim_variants
        ),
    ))
}

fn validate_coords(coords: &BTreeSet<String>, spec: &PropertySpec, axis: PropertyAxis) -> Result<()> {
    let missing: Vec<&str> = spec
        .required_coords
        .iter()
        .copied()
        .filter(|c| !coords.contains(*c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AlignError::schema(axis, format!("missing required coordinates {:?}", missing)))
    }
}

/// Check that `ds` satisfies the space, time and uncertainty contracts of
/// `props`, in that order.
pub fn validate_dataset(ds: &Dataset, props: &Properties) -> Result<()> {
    let dims = ds.dim_set();
    let coords = ds.coord_names();
    let checks = [
        (space_spec(props.space), PropertyAxis::Space),
        (time_spec(props.time), PropertyAxis::Time),
        (uncertainty_spec(props.uncertainty), PropertyAxis::Uncertainty),
    ];
    for (spec, axis) in checks {
        validate_dims(&dims, spec, axis)?;
        validate_coords(&coords, spec, axis)?;
    }
    debug!(properties = %props, "Dataset validated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Coordinate;
    use crate::properties::{Space, Time, Uncertainty};
    use chrono::{Duration, TimeZone, Utc};

    fn point_observation() -> Dataset {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Dataset::new()
            .with_coord("valid_time", Coordinate::times("valid_time", vec![t0, t0 + Duration::hours(1)]))
            .unwrap()
            .with_coord("point_index", Coordinate::float("point_index", vec![0.0, 1.0]))
            .unwrap()
            .with_coord("latitude", Coordinate::float("point_index", vec![52.0, 53.0]))
            .unwrap()
            .with_coord("longitude", Coordinate::float("point_index", vec![4.0, 5.0]))
            .unwrap()
    }

    #[test]
    fn test_valid_point_observation() {
        let props = Properties::deterministic(Space::Point, Time::Observation);
        validate_dataset(&point_observation(), &props).unwrap();
    }

    #[test]
    fn test_wrong_time_tag_fails_on_time_axis() {
        let props = Properties::deterministic(Space::Point, Time::Forecast);
        let err = validate_dataset(&point_observation(), &props).unwrap_err();
        assert!(matches!(err, AlignError::Schema { axis: PropertyAxis::Time, .. }));
    }

    #[test]
    fn test_missing_required_coordinate() {
        let ds = point_observation().drop_vars(&["latitude"]);
        let props = Properties::deterministic(Space::Point, Time::Observation);
        let err = validate_dataset(&ds, &props).unwrap_err();
        match err {
            AlignError::Schema { axis, message } => {
                assert_eq!(axis, PropertyAxis::Space);
                assert!(message.contains("latitude"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_ensemble_requires_member() {
        let props = Properties::new(Space::Point, Time::Observation, Uncertainty::Ensemble);
        let err = validate_dataset(&point_observation(), &props).unwrap_err();
        assert!(matches!(err, AlignError::Schema { axis: PropertyAxis::Uncertainty, .. }));
    }

    #[test]
    fn test_grid_accepts_any_variant() {
        let ds = Dataset::new()
            .with_coord("reference_time", Coordinate::times("reference_time", vec![Utc::now()]))
            .unwrap()
            .with_coord("lead_time", Coordinate::deltas("lead_time", vec![Duration::zero()]))
            .unwrap()
            .with_coord("latitude", Coordinate::float("grid_index", vec![0.0, 1.0]))
            .unwrap()
            .with_coord("longitude", Coordinate::float("grid_index", vec![0.0, 1.0]))
            .unwrap();
        validate_dataset(&ds, &Properties::deterministic(Space::Grid, Time::Forecast)).unwrap();
    }
}
