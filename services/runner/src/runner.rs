//! The alignment pipeline: load, transform, align in time, align in space,
//! name outputs, verify.

use align_common::{Collection, Dataset};
use alignment::space::align_with;
use alignment::{align_time, spatial_alignment, SpatialAlignment};
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use ingestion::{load, transform, LoaderRegistry, TransformationRegistry};
use interpolation::InterpolatorRegistry;
use tracing::{info, warn};

use crate::config::{RunConfig, SpaceConfig};
use crate::save::output_path;
use crate::verification::{verify, MetricRegistry, Scores};

/// What a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// `(dataset, path)` of every dataset that would be saved.
    pub outputs: Vec<(String, String)>,
    pub scores: Option<Scores>,
}

pub struct Runner {
    config: RunConfig,
    loaders: LoaderRegistry,
    transformations: TransformationRegistry,
    interpolators: InterpolatorRegistry,
    metrics: MetricRegistry,
    datasets: IndexMap<String, Dataset>,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            loaders: LoaderRegistry::with_builtins(),
            transformations: TransformationRegistry::with_builtins(),
            interpolators: InterpolatorRegistry::with_builtins(),
            metrics: MetricRegistry::with_builtins(),
            datasets: IndexMap::new(),
        }
    }

    pub fn loaders_mut(&mut self) -> &mut LoaderRegistry {
        &mut self.loaders
    }

    pub fn transformations_mut(&mut self) -> &mut TransformationRegistry {
        &mut self.transformations
    }

    pub fn metrics_mut(&mut self) -> &mut MetricRegistry {
        &mut self.metrics
    }

    pub fn datasets(&self) -> &IndexMap<String, Dataset> {
        &self.datasets
    }

    /// Run every stage. Verification is skipped when `verify` is false or
    /// no verification is configured.
    pub fn run(&mut self, verify: bool) -> Result<RunReport> {
        self.load_datasets()?;
        self.transform_datasets()?;
        let outputs = self.align()?;
        let scores = if verify { self.verify()? } else { None };
        Ok(RunReport { outputs, scores })
    }

    pub fn load_datasets(&mut self) -> Result<()> {
        for (name, config) in &self.config.datasets {
            let mut request = config.request();
            let missing = request.retain_existing();
            if missing > 0 {
                warn!(dataset = %name, missing, remaining = request.files.len(), "Some input files are missing");
            }
            let ds = load(&self.loaders, &config.loader, &request)
                .with_context(|| format!("Failed to load dataset '{}'", name))?;
            self.datasets.insert(name.clone(), ds);
        }
        info!(datasets = ?self.datasets.keys().collect::<Vec<_>>(), "Loaded datasets");
        Ok(())
    }

    pub fn transform_datasets(&mut self) -> Result<()> {
        for (name, config) in &self.config.transformations {
            let targets: Vec<String> = match &config.datasets {
                Some(targets) => targets.clone(),
                None => self.datasets.keys().cloned().collect(),
            };
            for key in targets {
                let ds = self
                    .datasets
                    .shift_remove(&key)
                    .ok_or_else(|| anyhow!("Dataset '{}' of transformation '{}' is not loaded", key, name))?;
                let out = transform(&self.transformations, name, Collection::Single(ds), &config.params)
                    .with_context(|| format!("Transformation '{}' failed on '{}'", name, key))?
                    .into_single()
                    .ok_or_else(|| anyhow!("Transformation '{}' changed the shape of '{}'", name, key))?;
                self.datasets.insert(key, out);
            }
        }
        // Transformed datasets were re-inserted at the end; restore config order.
        let order: Vec<&String> = self.config.datasets.keys().collect();
        self.datasets
            .sort_by(|a, _, b, _| order.iter().position(|k| *k == a).cmp(&order.iter().position(|k| *k == b)));
        Ok(())
    }

    /// Align in time and space, returning the output paths of saved datasets.
    pub fn align(&mut self) -> Result<Vec<(String, String)>> {
        let alignment = self.config.alignment.clone();

        match &alignment.time {
            Some(options) => {
                let datasets = std::mem::take(&mut self.datasets);
                self.datasets = align_time(Collection::Map(datasets), options)
                    .context("Temporal alignment failed")?
                    .into_map()
                    .ok_or_else(|| anyhow!("Temporal alignment changed the collection shape"))?;
            }
            None => info!("Skipping temporal alignment"),
        }

        match &alignment.space {
            Some(space) => self.align_space(&alignment.reference, space)?,
            None => info!("Skipping spatial alignment"),
        }

        let mut outputs = Vec::new();
        if let Some(save) = &alignment.save {
            for (name, ds) in &self.datasets {
                if save.datasets.as_ref().map_or(true, |only| only.contains(name)) {
                    let path = output_path(&save.path, name, ds)?;
                    info!(dataset = %name, path = %path, "Saving to {}", path);
                    outputs.push((name.clone(), path));
                }
            }
        }
        Ok(outputs)
    }

    fn align_space(&mut self, reference: &str, space: &SpaceConfig) -> Result<()> {
        let reference_ds = self
            .datasets
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow!("Alignment reference '{}' was not loaded", reference))?;

        for (name, ds) in self.datasets.iter_mut() {
            if name == reference {
                continue;
            }
            let kind = spatial_alignment(ds, &reference_ds)?;
            let options = match kind {
                SpatialAlignment::Interpolation => space.interpolation.as_ref(),
                SpatialAlignment::Regrid => space.regrid.as_ref(),
                SpatialAlignment::Selection | SpatialAlignment::Gridding => None,
            };
            let Some(options) = options else {
                info!(dataset = %name, alignment = kind.as_str(), "No space options configured, leaving dataset as is");
                continue;
            };
            let (aligned, _) = align_with(&self.interpolators, ds, &reference_ds, options)
                .with_context(|| format!("Spatial alignment ({}) of '{}' failed", kind.as_str(), name))?;
            *ds = aligned;
        }
        Ok(())
    }

    /// Score every non-reference dataset, if verification is configured.
    pub fn verify(&self) -> Result<Option<Scores>> {
        let Some(config) = &self.config.verification else {
            info!("No verification configured");
            return Ok(None);
        };
        let scores = verify(&self.metrics, config, &self.datasets)?;
        info!(models = ?scores.models(), "Verification complete");
        Ok(Some(scores))
    }
}
