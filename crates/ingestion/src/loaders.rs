//! Built-in loaders for the JSON dataset encoding.
//!
//! These take the place of the zarr and anemoi loaders: every layout
//! (gridded or point forecasts and observations) is read from the JSON
//! encoding. Decoding zarr stores or other on-disk formats is not
//! supported.

use align_common::names::{POINT_INDEX, REFERENCE_TIME, VALID_TIME};
use align_common::{AlignError, Dataset, Properties, Result, Space, Time};
use tracing::debug;

use crate::loader::{LoadRequest, Loader};

/// Reads one or more JSON-encoded datasets and concatenates them along the
/// layout's primary time dimension.
#[derive(Debug, Clone)]
pub struct JsonLoader {
    name: &'static str,
    properties: Properties,
    concat_dim: &'static str,
    /// `(from, to)` dimension renames applied to every file before
    /// concatenation.
    dim_renames: &'static [(&'static str, &'static str)],
}

impl JsonLoader {
    pub fn new(name: &'static str, properties: Properties) -> Self {
        let concat_dim = if properties.is_forecast() { REFERENCE_TIME } else { VALID_TIME };
        Self {
            name,
            properties,
            concat_dim,
            dim_renames: &[],
        }
    }

    /// Station observations; the station `code` dimension becomes
    /// `point_index`.
    pub fn point_observation() -> Self {
        Self {
            dim_renames: &[("code", POINT_INDEX)],
            ..Self::new("point-observation", Properties::deterministic(Space::Point, Time::Observation))
        }
    }

    pub fn point_forecast() -> Self {
        Self::new("point-forecast", Properties::deterministic(Space::Point, Time::Forecast))
    }

    pub fn grid_forecast() -> Self {
        Self::new("grid-forecast", Properties::deterministic(Space::Grid, Time::Forecast))
    }

    pub fn grid_observation() -> Self {
        Self::new("grid-observation", Properties::deterministic(Space::Grid, Time::Observation))
    }

    pub fn concat_dim(&self) -> &str {
        self.concat_dim
    }

    fn read(&self, path: &std::path::Path) -> Result<Dataset> {
        debug!(loader = self.name, path = %path.display(), "Reading dataset");
        let mut ds = Dataset::read_json(path)?;
        for (from, to) in self.dim_renames {
            if ds.has_dim(from) {
                ds = ds.rename_dim(from, to)?;
            }
        }
        Ok(ds)
    }
}

impl Loader for JsonLoader {
    fn name(&self) -> &str {
        self.name
    }

    fn properties(&self) -> Properties {
        self.properties
    }

    fn load(&self, request: &LoadRequest) -> Result<Dataset> {
        if request.files.is_empty() {
            return Err(AlignError::precondition(format!("{}: no input files to load", self.name)));
        }
        let mut parts = request
            .files
            .iter()
            .map(|path| self.read(path))
            .collect::<Result<Vec<_>>>()?;
        let ds = if parts.len() == 1 {
            parts.remove(0)
        } else {
            Dataset::concat(&parts, self.concat_dim)?
        };
        match &request.variables {
            Some(variables) => ds.select_vars(variables),
            None => Ok(ds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_dim_follows_time_tag() {
        assert_eq!(JsonLoader::point_forecast().concat_dim(), REFERENCE_TIME);
        assert_eq!(JsonLoader::grid_observation().concat_dim(), VALID_TIME);
        assert_eq!(JsonLoader::point_observation().concat_dim(), VALID_TIME);
    }

    #[test]
    fn test_no_files() {
        let err = JsonLoader::grid_forecast().load(&LoadRequest::default()).unwrap_err();
        assert!(matches!(err, AlignError::Precondition(_)));
    }
}
