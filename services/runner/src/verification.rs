//! Verification metrics over aligned datasets.

use std::collections::BTreeMap;
use std::fmt;

use align_common::Dataset;
use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use tracing::debug;

use crate::config::{MetricConfig, VerificationConfig};

/// Score of forecast values against reference values. Both slices hold
/// only pairs finite on both sides and are never empty.
pub type MetricFn = fn(&[f64], &[f64]) -> f64;

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n as f64
}

pub fn rmse(forecast: &[f64], reference: &[f64]) -> f64 {
    mean(forecast.iter().zip(reference).map(|(f, o)| (f - o).powi(2))).sqrt()
}

pub fn mae(forecast: &[f64], reference: &[f64]) -> f64 {
    mean(forecast.iter().zip(reference).map(|(f, o)| (f - o).abs()))
}

pub fn bias(forecast: &[f64], reference: &[f64]) -> f64 {
    mean(forecast.iter().zip(reference).map(|(f, o)| f - o))
}

pub struct MetricRegistry {
    metrics: BTreeMap<String, MetricFn>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("rmse", rmse);
        registry.register("mae", mae);
        registry.register("bias", bias);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, metric: MetricFn) {
        self.metrics.insert(name.into(), metric);
    }

    pub fn get(&self, name: &str) -> Result<MetricFn> {
        self.metrics.get(name).copied().ok_or_else(|| {
            anyhow!(
                "Unknown metric function: {} (available: {})",
                name,
                self.metrics.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// A configured metric: a function applied to one variable pair.
pub struct Metric {
    pub name: String,
    function: MetricFn,
    variable: String,
    reference_variable: String,
}

impl Metric {
    pub fn new(registry: &MetricRegistry, name: &str, config: &MetricConfig) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            function: registry.get(&config.function)?,
            variable: config.variable.clone(),
            reference_variable: config.reference_variable.clone().unwrap_or_else(|| config.variable.clone()),
        })
    }

    /// Score `ds` against `reference`. Both variables must be aligned: same
    /// dimensions in the same order. NaN when no pair is finite on both sides.
    pub fn compute(&self, ds: &Dataset, reference: &Dataset) -> Result<f64> {
        let forecast = ds
            .var(&self.variable)
            .ok_or_else(|| anyhow!("{}: variable '{}' not found", self.name, self.variable))?;
        let observed = reference
            .var(&self.reference_variable)
            .ok_or_else(|| anyhow!("{}: reference variable '{}' not found", self.name, self.reference_variable))?;
        if forecast.dims != observed.dims || forecast.shape() != observed.shape() {
            bail!(
                "{}: '{}' {:?}{:?} is not aligned with reference '{}' {:?}{:?}",
                self.name,
                self.variable,
                forecast.dims,
                forecast.shape(),
                self.reference_variable,
                observed.dims,
                observed.shape()
            );
        }

        let (f, o): (Vec<f64>, Vec<f64>) = forecast
            .data
            .iter()
            .zip(observed.data.iter())
            .filter(|(f, o)| f.is_finite() && o.is_finite())
            .map(|(f, o)| (*f, *o))
            .unzip();
        debug!(metric = %self.name, n_pairs = f.len(), "Computing metric");
        if f.is_empty() {
            return Ok(f64::NAN);
        }
        Ok((self.function)(&f, &o))
    }
}

/// Metric values by model, then metric, in configuration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scores {
    values: IndexMap<String, IndexMap<String, f64>>,
}

impl Scores {
    pub fn insert(&mut self, model: &str, metric: &str, value: f64) {
        self.values
            .entry(model.to_string())
            .or_default()
            .insert(metric.to_string(), value);
    }

    pub fn get(&self, model: &str, metric: &str) -> Option<f64> {
        self.values.get(model).and_then(|m| m.get(metric)).copied()
    }

    pub fn models(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics: Vec<&String> = self.values.values().flat_map(|m| m.keys()).fold(Vec::new(), |mut acc, k| {
            if !acc.contains(&k) {
                acc.push(k);
            }
            acc
        });
        write!(f, "{:<20}", "model")?;
        for metric in &metrics {
            write!(f, " {:>12}", metric)?;
        }
        writeln!(f)?;
        for (model, row) in &self.values {
            write!(f, "{:<20}", model)?;
            for metric in &metrics {
                match row.get(metric.as_str()) {
                    Some(v) => write!(f, " {:>12.4}", v)?,
                    None => write!(f, " {:>12}", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Score every dataset except the reference with every configured metric.
pub fn verify(
    registry: &MetricRegistry,
    config: &VerificationConfig,
    datasets: &IndexMap<String, Dataset>,
) -> Result<Scores> {
    let reference = datasets
        .get(&config.reference)
        .ok_or_else(|| anyhow!("Verification reference '{}' was not loaded", config.reference))?;
    let metrics = config
        .metrics
        .iter()
        .map(|(name, metric)| Metric::new(registry, name, metric))
        .collect::<Result<Vec<_>>>()?;

    let mut scores = Scores::default();
    for (model, ds) in datasets {
        if *model == config.reference {
            continue;
        }
        for metric in &metrics {
            scores.insert(model, &metric.name, metric.compute(ds, reference)?);
        }
    }
    Ok(scores)
}
