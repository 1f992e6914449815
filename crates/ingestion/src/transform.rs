//! Named dataset transformations.
//!
//! A transformation maps one dataset to another under a JSON object of
//! named parameters. [`transform`] applies one to every member of a
//! collection, keeping the collection shape.

use std::collections::BTreeMap;

use align_common::{AlignError, Collection, Dataset, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::transformations::{KelvinToCelsius, Rename, UvToSpeed};

/// Named transformation parameters.
pub type TransformParams = Map<String, Value>;

pub trait Transformation: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, ds: Dataset, params: &TransformParams) -> Result<Dataset>;
}

/// Decode the parameters of transformation `name` into `T`.
pub fn parse_params<T: DeserializeOwned>(name: &str, params: &TransformParams) -> Result<T> {
    serde_json::from_value(Value::Object(params.clone()))
        .map_err(|e| AlignError::configuration(format!("{}: invalid parameters: {}", name, e)))
}

/// A transformation backed by a function registered at startup.
pub struct FnTransformation<F> {
    name: String,
    func: F,
}

impl<F> Transformation for FnTransformation<F>
where
    F: Fn(Dataset, &TransformParams) -> Result<Dataset> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ds: Dataset, params: &TransformParams) -> Result<Dataset> {
        (self.func)(ds, params)
    }
}

pub struct TransformationRegistry {
    transformations: BTreeMap<String, Box<dyn Transformation>>,
}

impl TransformationRegistry {
    pub fn new() -> Self {
        Self {
            transformations: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Rename);
        registry.register(KelvinToCelsius);
        registry.register(UvToSpeed);
        registry
    }

    pub fn register<T: Transformation + 'static>(&mut self, transformation: T) {
        self.transformations
            .insert(transformation.name().to_string(), Box::new(transformation));
    }

    /// Register a plain function as transformation `name`.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(Dataset, &TransformParams) -> Result<Dataset> + Send + Sync + 'static,
    {
        self.register(FnTransformation { name: name.into(), func });
    }

    pub fn available(&self) -> Vec<&str> {
        self.transformations.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Result<&dyn Transformation> {
        self.transformations
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| AlignError::configuration(format!("Unknown transformation: {}", name)))
    }
}

impl Default for TransformationRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Apply transformation `name` to every dataset of `datasets`.
pub fn transform(
    registry: &TransformationRegistry,
    name: &str,
    datasets: Collection<Dataset>,
    params: &TransformParams,
) -> Result<Collection<Dataset>> {
    let transformation = registry.get(name)?;
    debug!(transformation = name, n_datasets = datasets.len(), "Transforming");
    datasets.try_map(|ds| transformation.apply(ds, params))
}
