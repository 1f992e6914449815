//! Pairwise spatial alignment.

use align_common::{properties_of, AlignError, Collection, Dataset, Result, Space};
use interpolation::{Interpolator, InterpolatorRegistry};
use tracing::debug;

use crate::options::SpaceAlignOptions;

/// Which kind of spatial alignment a (source, reference) pair needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialAlignment {
    /// Grid source onto point reference.
    Interpolation,
    /// Grid source onto grid reference.
    Regrid,
    /// Point source onto point reference.
    Selection,
    /// Point source onto grid reference.
    Gridding,
}

impl SpatialAlignment {
    pub fn of(source: Space, reference: Space) -> Self {
        match (source, reference) {
            (Space::Grid, Space::Point) => SpatialAlignment::Interpolation,
            (Space::Grid, Space::Grid) => SpatialAlignment::Regrid,
            (Space::Point, Space::Point) => SpatialAlignment::Selection,
            (Space::Point, Space::Grid) => SpatialAlignment::Gridding,
        }
    }

    /// Key of this alignment in a run configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpatialAlignment::Interpolation => "interpolation",
            SpatialAlignment::Regrid => "regrid",
            SpatialAlignment::Selection => "selection",
            SpatialAlignment::Gridding => "gridding",
        }
    }

    fn unsupported(&self) -> AlignError {
        let what = match self {
            SpatialAlignment::Regrid => "Regridding not implemented",
            SpatialAlignment::Selection => "Point selection not implemented",
            SpatialAlignment::Gridding => "Gridding of point data not implemented",
            SpatialAlignment::Interpolation => "Interpolation not available",
        };
        AlignError::unsupported(what)
    }
}

/// Classify a dataset pair by their space tags.
pub fn spatial_alignment(source: &Dataset, reference: &Dataset) -> Result<SpatialAlignment> {
    Ok(SpatialAlignment::of(
        properties_of(source)?.space,
        properties_of(reference)?.space,
    ))
}

/// Bring `source` onto the spatial layout of `reference`. The reference is
/// returned unchanged.
pub fn align_with(
    registry: &InterpolatorRegistry,
    source: &Dataset,
    reference: &Dataset,
    options: &SpaceAlignOptions,
) -> Result<(Dataset, Dataset)> {
    let mut aligner = SpaceAligner::new(registry, reference, options);
    Ok((aligner.align(source)?, reference.clone()))
}

/// Aligns many sources against one reference, sharing a single
/// interpolator (and its weight cache) between them.
pub(crate) struct SpaceAligner<'a> {
    registry: &'a InterpolatorRegistry,
    reference: &'a Dataset,
    options: &'a SpaceAlignOptions,
    interpolator: Option<Box<dyn Interpolator>>,
}

impl<'a> SpaceAligner<'a> {
    pub(crate) fn new(
        registry: &'a InterpolatorRegistry,
        reference: &'a Dataset,
        options: &'a SpaceAlignOptions,
    ) -> Self {
        Self {
            registry,
            reference,
            options,
            interpolator: None,
        }
    }

    pub(crate) fn align(&mut self, source: &Dataset) -> Result<Dataset> {
        let kind = spatial_alignment(source, self.reference)?;
        debug!(alignment = kind.as_str(), "Aligning in space");
        if kind != SpatialAlignment::Interpolation {
            return Err(kind.unsupported());
        }
        let mut interpolator = match self.interpolator.take() {
            Some(interpolator) => interpolator,
            None => self
                .registry
                .create(self.options.method(), self.reference, &self.options.interpolation)?,
        };
        let result = interpolator.interpolate(source);
        self.interpolator = Some(interpolator);
        result
    }
}

/// Align every member of `datasets` against `reference`, keeping the
/// collection shape.
pub fn align_space(
    registry: &InterpolatorRegistry,
    datasets: Collection<Dataset>,
    reference: &Dataset,
    options: &SpaceAlignOptions,
) -> Result<Collection<Dataset>> {
    let mut aligner = SpaceAligner::new(registry, reference, options);
    datasets.try_map(|ds| aligner.align(&ds))
}
