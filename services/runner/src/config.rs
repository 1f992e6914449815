//! Run configuration.
//!
//! A run is described by one YAML file:
//!
//! ```yaml
//! dates:
//!   start: 2024-01-01T00
//!   end: 2024-01-07T00
//!   period: 1D
//!   range: 48h
//!   step: 3h
//! datasets:
//!   model:
//!     loader: point-forecast
//!     files: ["${DATA_DIR:-/data}/model_{reference_time:%Y%m%d%H}.json"]
//!   stations:
//!     loader: point-observation
//!     files: ["${DATA_DIR:-/data}/stations.json"]
//!     dates: { step: 1h }
//! transformations:
//!   kelvin_to_celsius: { vars: t2m, datasets: [model] }
//! alignment:
//!   reference: stations
//!   time: { return_as: forecast, lead_time: start-min }
//!   space:
//!     interpolation: { method: delaunay }
//!   save: { path: "out/{name}_{year}{month:02}.json" }
//! verification:
//!   reference: stations
//!   metrics:
//!     rmse_t2m: { function: rmse, variable: t2m }
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are substituted from the environment
//! before parsing.

use std::fs;
use std::path::Path;

use alignment::{CollectionTimeOptions, SpaceAlignOptions};
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use ingestion::{Dates, DatesConfig, LoadRequest, Names, TransformParams};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub datasets: IndexMap<String, DatasetConfig>,
    /// Dates shared by every dataset; per-dataset keys take precedence.
    #[serde(default)]
    pub dates: Option<DatesConfig>,
    #[serde(default)]
    pub transformations: IndexMap<String, TransformationConfig>,
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub verification: Option<VerificationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub loader: String,
    pub files: Names,
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    #[serde(default)]
    pub crs: Option<String>,
    #[serde(default)]
    pub grid_mapping: Option<String>,
    #[serde(default)]
    pub dates: Option<DatesConfig>,
}

impl DatasetConfig {
    pub fn request(&self) -> LoadRequest {
        LoadRequest {
            files: self.files.as_slice().iter().map(Into::into).collect(),
            variables: self.variables.clone(),
            crs: self.crs.clone(),
            grid_mapping: self.grid_mapping.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformationConfig {
    /// Datasets to transform; all when unset.
    #[serde(default)]
    pub datasets: Option<Vec<String>>,
    #[serde(flatten)]
    pub params: TransformParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlignmentConfig {
    pub reference: String,
    #[serde(default)]
    pub time: Option<CollectionTimeOptions>,
    #[serde(default)]
    pub space: Option<SpaceConfig>,
    #[serde(default)]
    pub save: Option<SaveConfig>,
}

/// Space alignment options per kind of (dataset, reference) pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpaceConfig {
    /// Grid datasets onto a point reference.
    #[serde(default)]
    pub interpolation: Option<SpaceAlignOptions>,
    /// Grid datasets onto a grid reference.
    #[serde(default)]
    pub regrid: Option<SpaceAlignOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveConfig {
    /// Output path template with `{name}`, `{year}`, `{month}` and `{day}`.
    pub path: String,
    /// Datasets to save; all when unset.
    #[serde(default)]
    pub datasets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    pub reference: String,
    pub metrics: IndexMap<String, MetricConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricConfig {
    /// Registered metric function (`rmse`, `mae`, `bias`).
    pub function: String,
    pub variable: String,
    /// Variable of the reference dataset; `variable` when unset.
    #[serde(default)]
    pub reference_variable: Option<String>,
}

impl RunConfig {
    /// Read, substitute, parse and resolve a run configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read run config from {:?}", path.as_ref()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid run config {:?}", path.as_ref()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let mut config: RunConfig = serde_yaml::from_str(&expanded).context("Failed to parse run config YAML")?;
        config.resolve_dates()?;
        config.validate()?;
        Ok(config)
    }

    /// Expand every dataset's file templates through its dates, if any.
    fn resolve_dates(&mut self) -> Result<()> {
        for (name, dataset) in self.datasets.iter_mut() {
            let dates = match (&self.dates, &dataset.dates) {
                (Some(global), Some(local)) => Some(global.merged(local)),
                (Some(global), None) => Some(global.clone()),
                (None, Some(local)) => Some(local.clone()),
                (None, None) => None,
            };
            if let Some(dates) = dates {
                let dates = Dates::from_config(&dates).with_context(|| format!("dataset '{}'", name))?;
                let files = dates
                    .substitute_all(dataset.files.as_slice())
                    .with_context(|| format!("dataset '{}'", name))?;
                dataset.files = Names::Many(files);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.datasets.is_empty() {
            bail!("No datasets configured");
        }
        let known = |name: &str, what: &str| -> Result<()> {
            if !self.datasets.contains_key(name) {
                bail!("{} '{}' is not a configured dataset", what, name);
            }
            Ok(())
        };
        known(&self.alignment.reference, "Alignment reference")?;
        for (transformation, config) in &self.transformations {
            for name in config.datasets.iter().flatten() {
                known(name, &format!("Dataset of transformation '{}'", transformation))?;
            }
        }
        if let Some(save) = &self.alignment.save {
            for name in save.datasets.iter().flatten() {
                known(name, "Saved dataset")?;
            }
        }
        if let Some(verification) = &self.verification {
            known(&verification.reference, "Verification reference")?;
        }
        Ok(())
    }
}

/// Expand environment variables in YAML content.
/// Supports ${VAR} and ${VAR:-default} syntax.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => expr.push(c),
                    None => bail!("Unclosed variable substitution: ${{{}", expr),
                }
            }
            result.push_str(&resolve_var_expr(&expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr)),
    }
}
