//! Loader trait, load requests and the loader registry.

use std::collections::BTreeMap;
use std::path::PathBuf;

use align_common::{set_properties, AlignError, Dataset, Properties, Result};
use interpolation::{add_crs, add_grid_mapping, CrsSpec, GridMappingSpec};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::loaders::JsonLoader;

/// What to load, as given in a run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub files: Vec<PathBuf>,
    /// Data variables to keep; all when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    /// Builtin grid name whose CRS is attached to the loaded dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    /// Builtin grid name whose grid mapping is attached to the loaded dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_mapping: Option<String>,
}

impl LoadRequest {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_variables<S: Into<String>>(mut self, variables: impl IntoIterator<Item = S>) -> Self {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    /// Drop files that do not exist, returning how many were dropped.
    pub fn retain_existing(&mut self) -> usize {
        let before = self.files.len();
        self.files.retain(|file| {
            let exists = file.exists();
            if !exists {
                warn!(file = %file.display(), "File is missing, skipping");
            }
            exists
        });
        before - self.files.len()
    }
}

/// A named source of datasets with fixed property tags.
pub trait Loader: Send + Sync {
    fn name(&self) -> &str;

    /// Tags every dataset of this loader is validated against.
    fn properties(&self) -> Properties;

    /// Read the raw dataset. Validation and tagging happen in [`load`].
    fn load(&self, request: &LoadRequest) -> Result<Dataset>;
}

/// Loaders by name.
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Box<dyn Loader>>,
}

impl LoaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            loaders: BTreeMap::new(),
        }
    }

    /// A registry holding the JSON loaders for the four deterministic layouts.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(JsonLoader::point_observation());
        registry.register(JsonLoader::point_forecast());
        registry.register(JsonLoader::grid_forecast());
        registry.register(JsonLoader::grid_observation());
        registry
    }

    /// Add a loader, replacing any loader of the same name.
    pub fn register<L: Loader + 'static>(&mut self, loader: L) {
        self.loaders.insert(loader.name().to_string(), Box::new(loader));
    }

    pub fn available(&self) -> Vec<&str> {
        self.loaders.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Result<&dyn Loader> {
        self.loaders
            .get(name)
            .map(|loader| loader.as_ref())
            .ok_or_else(|| AlignError::configuration(format!("Unknown loader: {}", name)))
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Load a dataset with the named loader, validate it against the loader's
/// properties and record them in its attributes.
///
/// CRS and grid mapping attributes requested by `request` are attached
/// after validation.
pub fn load(registry: &LoaderRegistry, name: &str, request: &LoadRequest) -> Result<Dataset> {
    let loader = registry.get(name)?;
    let raw = loader.load(request)?;
    let mut ds = set_properties(raw, loader.properties())?;

    if let Some(crs) = &request.crs {
        ds = add_crs(ds, &CrsSpec::Builtin(crs.clone()))?;
    }
    if let Some(mapping) = &request.grid_mapping {
        ds = add_grid_mapping(ds, &GridMappingSpec::Builtin(mapping.clone()))?;
    }

    info!(
        loader = name,
        n_files = request.files.len(),
        dims = ?ds.dim_names(),
        variables = ?ds.var_names(),
        "Loaded dataset"
    );
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_loader() {
        let registry = LoaderRegistry::with_builtins();
        let err = load(&registry, "does-not-exist", &LoadRequest::default()).unwrap_err();
        assert!(matches!(err, AlignError::Configuration(ref m) if m == "Unknown loader: does-not-exist"));
    }

    #[test]
    fn test_builtin_names() {
        let registry = LoaderRegistry::with_builtins();
        assert_eq!(
            registry.available(),
            vec!["grid-forecast", "grid-observation", "point-forecast", "point-observation"]
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: LoadRequest =
            serde_json::from_str(r#"{"files": ["a.json", "b.json"], "variables": ["t2m"], "crs": "cerra"}"#).unwrap();
        assert_eq!(request.files.len(), 2);
        assert_eq!(request.variables.as_deref(), Some(&["t2m".to_string()][..]));
        assert_eq!(request.crs.as_deref(), Some("cerra"));
        assert!(request.grid_mapping.is_none());
    }

    #[test]
    fn test_retain_existing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.json");
        std::fs::write(&present, "{}").unwrap();
        let mut request = LoadRequest::new([present.clone(), dir.path().join("missing.json")]);
        assert_eq!(request.retain_existing(), 1);
        assert_eq!(request.files, vec![present]);
    }
}
