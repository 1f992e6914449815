//! Alignment options.
//!
//! Enumerated values are parsed through `FromStr` so that an invalid value
//! is a configuration error whether it comes from code or from a config
//! file.

use std::fmt;
use std::str::FromStr;

use align_common::AlignError;
use interpolation::InterpolationOptions;
use serde::{Deserialize, Serialize};

/// How a forecast is reduced to one value per valid time before it is
/// matched against an observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LeadTimeMode {
    /// Keep lead times shorter than the cycle spacing.
    #[default]
    StartMin,
    /// Keep every lead time of cycles spaced by the longest lead time.
    StartMax,
}

impl LeadTimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadTimeMode::StartMin => "start-min",
            LeadTimeMode::StartMax => "start-max",
        }
    }
}

impl fmt::Display for LeadTimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadTimeMode {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start-min" => Ok(LeadTimeMode::StartMin),
            "start-max" => Ok(LeadTimeMode::StartMax),
            other => Err(AlignError::configuration(format!(
                "Invalid value for lead_time: '{}'. Expected 'start-min' or 'start-max'.",
                other
            ))),
        }
    }
}

impl TryFrom<String> for LeadTimeMode {
    type Error = AlignError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LeadTimeMode> for String {
    fn from(mode: LeadTimeMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Options of a pairwise temporal alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeAlignOptions {
    /// Inner joins instead of outer joins.
    #[serde(default)]
    pub only_common: bool,
    #[serde(default)]
    pub lead_time: LeadTimeMode,
}

/// Layout of the datasets returned by a collection-level time alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReturnAs {
    #[default]
    Forecast,
    Observation,
}

impl FromStr for ReturnAs {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forecast" => Ok(ReturnAs::Forecast),
            "observation" => Ok(ReturnAs::Observation),
            other => Err(AlignError::configuration(format!(
                "Invalid value for return_as: '{}'. Expected 'forecast' or 'observation'.",
                other
            ))),
        }
    }
}

impl TryFrom<String> for ReturnAs {
    type Error = AlignError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReturnAs> for String {
    fn from(value: ReturnAs) -> Self {
        match value {
            ReturnAs::Forecast => "forecast".to_string(),
            ReturnAs::Observation => "observation".to_string(),
        }
    }
}

/// Options of a collection-level time alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionTimeOptions {
    #[serde(default)]
    pub return_as: ReturnAs,
    #[serde(flatten)]
    pub pairwise: TimeAlignOptions,
}

/// Options of a spatial alignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceAlignOptions {
    /// Interpolation method name; `xarray` when unset.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(flatten)]
    pub interpolation: InterpolationOptions,
}

impl SpaceAlignOptions {
    pub const DEFAULT_METHOD: &'static str = "xarray";

    pub fn with_method(method: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            ..Self::default()
        }
    }

    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or(Self::DEFAULT_METHOD)
    }
}
