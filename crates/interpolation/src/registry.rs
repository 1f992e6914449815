//! Name → constructor registry of interpolation methods.

use std::collections::BTreeMap;

use align_common::{AlignError, Dataset, Result};

use crate::delaunay::DelaunayInterpolator;
use crate::interpolator::Interpolator;
use crate::options::InterpolationOptions;
use crate::xarray::XarrayInterpolator;

/// Builds an interpolator bound to a target dataset.
pub type InterpolatorFactory = fn(&Dataset, &InterpolationOptions) -> Result<Box<dyn Interpolator>>;

#[derive(Clone, Default)]
pub struct InterpolatorRegistry {
    factories: BTreeMap<String, InterpolatorFactory>,
}

impl InterpolatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the `delaunay` and `xarray` methods.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(DelaunayInterpolator::NAME, delaunay);
        registry.register(XarrayInterpolator::NAME, xarray);
        registry
    }

    /// Register a method, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, factory: InterpolatorFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Registered method names, sorted.
    pub fn available(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(
        &self,
        name: &str,
        target: &Dataset,
        options: &InterpolationOptions,
    ) -> Result<Box<dyn Interpolator>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| AlignError::configuration(format!("Unknown interpolation: {}", name)))?;
        factory(target, options)
    }
}

fn delaunay(target: &Dataset, options: &InterpolationOptions) -> Result<Box<dyn Interpolator>> {
    Ok(Box::new(DelaunayInterpolator::new(target, options)?))
}

fn xarray(target: &Dataset, options: &InterpolationOptions) -> Result<Box<dyn Interpolator>> {
    Ok(Box::new(XarrayInterpolator::new(target, options)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = InterpolatorRegistry::with_builtins();
        assert_eq!(registry.available(), vec!["delaunay", "xarray"]);
    }

    #[test]
    fn test_unknown_method() {
        let registry = InterpolatorRegistry::with_builtins();
        let err = registry
            .create("kriging", &Dataset::new(), &InterpolationOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, AlignError::Configuration(ref m) if m.contains("kriging")));
    }
}
