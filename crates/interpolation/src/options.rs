use std::fmt;
use std::str::FromStr;

use align_common::AlignError;
use serde::{Deserialize, Serialize};

/// Interpolation scheme between source grid nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Linear,
    Nearest,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Linear => "linear",
            Scheme::Nearest => "nearest",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(Scheme::Linear),
            "nearest" => Ok(Scheme::Nearest),
            other => Err(AlignError::configuration(format!(
                "unknown interpolation scheme '{}', expected 'linear' or 'nearest'",
                other
            ))),
        }
    }
}

/// Options passed to an interpolator at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterpolationOptions {
    #[serde(default)]
    pub scheme: Scheme,
}

impl InterpolationOptions {
    pub fn with_scheme(scheme: Scheme) -> Self {
        Self { scheme }
    }
}
