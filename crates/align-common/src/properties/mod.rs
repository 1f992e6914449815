//! Property tags describing the spatial, temporal and uncertainty layout of a
//! dataset, and their round trip through the dataset attributes.
//!
//! All reads and writes of the `properties` attribute go through this module.

mod spec;
mod validation;

pub use spec::{space_spec, time_spec, uncertainty_spec, PropertySpec};
pub use validation::validate_dataset;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attrs::Attributes;
use crate::dataset::Dataset;
use crate::error::{AlignError, PropertyAxis, Result};

/// Attribute key holding the serialized properties.
pub const PROPERTIES_ATTR: &str = "properties";

macro_rules! string_enum {
    ($name:ident, $axis:expr, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AlignError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AlignError::schema($axis, format!("unknown value '{}'", other))),
                }
            }
        }
    };
}

/// Spatial layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    Grid,
    Point,
}

/// Temporal layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Time {
    Forecast,
    Observation,
}

/// Uncertainty representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uncertainty {
    #[default]
    Deterministic,
    Ensemble,
    Quantile,
}

string_enum!(Space, PropertyAxis::Space, { Grid => "grid", Point => "point" });
string_enum!(Time, PropertyAxis::Time, { Forecast => "forecast", Observation => "observation" });
string_enum!(Uncertainty, PropertyAxis::Uncertainty, {
    Deterministic => "deterministic",
    Ensemble => "ensemble",
    Quantile => "quantile",
});

/// The (space, time, uncertainty) triple attached to every dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Properties {
    pub space: Space,
    pub time: Time,
    #[serde(default)]
    pub uncertainty: Uncertainty,
}

impl Properties {
    pub fn new(space: Space, time: Time, uncertainty: Uncertainty) -> Self {
        Self {
            space,
            time,
            uncertainty,
        }
    }

    pub fn deterministic(space: Space, time: Time) -> Self {
        Self::new(space, time, Uncertainty::Deterministic)
    }

    pub fn is_grid(&self) -> bool {
        self.space == Space::Grid
    }

    pub fn is_point(&self) -> bool {
        self.space == Space::Point
    }

    pub fn is_forecast(&self) -> bool {
        self.time == Time::Forecast
    }

    pub fn is_observation(&self) -> bool {
        self.time == Time::Observation
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.space, self.time, self.uncertainty)
    }
}

/// Store `props` as the three string fields of the `properties` attribute.
pub fn properties_to_attrs(attrs: &mut Attributes, props: &Properties) {
    attrs.set(
        PROPERTIES_ATTR,
        serde_json::json!({
            "space": props.space.as_str(),
            "time": props.time.as_str(),
            "uncertainty": props.uncertainty.as_str(),
        }),
    );
}

/// Read the properties of a dataset. A missing `uncertainty` field means
/// deterministic.
pub fn properties_from_attrs(attrs: &Attributes) -> Result<Properties> {
    let block = attrs
        .get(PROPERTIES_ATTR)
        .and_then(|v| v.as_object())
        .ok_or_else(|| AlignError::schema(PropertyAxis::Attributes, "dataset carries no properties attribute"))?;
    fn field<'a>(
        block: &'a serde_json::Map<String, serde_json::Value>,
        key: &str,
        axis: PropertyAxis,
    ) -> Result<Option<&'a str>> {
        match block.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(Some)
                .ok_or_else(|| AlignError::schema(axis, format!("'{}' must be a string", key))),
        }
    }
    let space: Space = field(block, "space", PropertyAxis::Space)?
        .ok_or_else(|| AlignError::schema(PropertyAxis::Space, "missing 'space' property"))?
        .parse()?;
    let time: Time = field(block, "time", PropertyAxis::Time)?
        .ok_or_else(|| AlignError::schema(PropertyAxis::Time, "missing 'time' property"))?
        .parse()?;
    let uncertainty: Uncertainty = match field(block, "uncertainty", PropertyAxis::Uncertainty)? {
        Some(s) => s.parse()?,
        None => Uncertainty::Deterministic,
    };
    Ok(Properties::new(space, time, uncertainty))
}

/// Properties of `ds`.
pub fn properties_of(ds: &Dataset) -> Result<Properties> {
    properties_from_attrs(&ds.attrs)
}

/// Validate `ds` against `props` and record them in its attributes.
pub fn set_properties(mut ds: Dataset, props: Properties) -> Result<Dataset> {
    validate_dataset(&ds, &props)?;
    properties_to_attrs(&mut ds.attrs, &props);
    Ok(ds)
}

/// Replace the space tag, re-validate and re-serialize.
pub fn update_space_property(ds: Dataset, space: Space) -> Result<Dataset> {
    let props = Properties {
        space,
        ..properties_of(&ds)?
    };
    set_properties(ds, props)
}

/// Replace the time tag, re-validate and re-serialize.
pub fn update_time_property(ds: Dataset, time: Time) -> Result<Dataset> {
    let props = Properties {
        time,
        ..properties_of(&ds)?
    };
    set_properties(ds, props)
}
