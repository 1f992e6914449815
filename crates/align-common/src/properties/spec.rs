use super::{Space, Time, Uncertainty};

/// Shape contract of one property value.
///
/// A dataset satisfies the contract when at least one entry of
/// `dim_variants` is a subset of its dimensions (or the list is empty) and
/// every coordinate in `required_coords` is present.
#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub dim_variants: &'static [&'static [&'static str]],
    pub required_coords: &'static [&'static str],
    pub optional_dims: &'static [&'static str],
    pub optional_coords: &'static [&'static str],
}

const GRID: PropertySpec = PropertySpec {
    dim_variants: &[&["xc", "yc"], &["grid_index"], &["longitude", "latitude"]],
    required_coords: &["longitude", "latitude"],
    optional_dims: &["member"],
    optional_coords: &["xc", "yc"],
};

const POINT: PropertySpec = PropertySpec {
    dim_variants: &[&["point_index"]],
    required_coords: &["longitude", "latitude"],
    optional_dims: &[],
    optional_coords: &["code", "elevation", "name", "country"],
};

const FORECAST: PropertySpec = PropertySpec {
    dim_variants: &[&["reference_time", "lead_time"]],
    required_coords: &["reference_time", "lead_time"],
    optional_dims: &[],
    optional_coords: &["valid_time"],
};

const OBSERVATION: PropertySpec = PropertySpec {
    dim_variants: &[&["valid_time"]],
    required_coords: &["valid_time"],
    optional_dims: &[],
    optional_coords: &[],
};

const DETERMINISTIC: PropertySpec = PropertySpec {
    dim_variants: &[],
    required_coords: &[],
    optional_dims: &[],
    optional_coords: &[],
};

const ENSEMBLE: PropertySpec = PropertySpec {
    dim_variants: &[&["member"]],
    required_coords: &["member"],
    optional_dims: &[],
    optional_coords: &[],
};

const QUANTILE: PropertySpec = PropertySpec {
    dim_variants: &[&["quantile"]],
    required_coords: &["quantile"],
    optional_dims: &[],
    optional_coords: &[],
};

pub fn space_spec(space: Space) -> &'static PropertySpec {
    match space {
        Space::Grid => &GRID,
        Space::Point => &POINT,
    }
}

pub fn time_spec(time: Time) -> &'static PropertySpec {
    match time {
        Time::Forecast => &FORECAST,
        Time::Observation => &OBSERVATION,
    }
}

pub fn uncertainty_spec(uncertainty: Uncertainty) -> &'static PropertySpec {
    match uncertainty {
        Uncertainty::Deterministic => &DETERMINISTIC,
        Uncertainty::Ensemble => &ENSEMBLE,
        Uncertainty::Quantile => &QUANTILE,
    }
}
