//! Barycentric interpolation on a Delaunay triangulation of the source grid.

use std::sync::Arc;

use align_common::names::{GRID_INDEX, POINT_INDEX};
use align_common::{AlignError, Dataset, Result, Variable};
use ndarray::{Array2, ArrayD, ArrayViewD, IxDyn};
use tracing::{debug, warn};

use crate::cache::{CacheStats, WeightCache};
use crate::interpolator::{assemble_output, Interpolator};
use crate::options::{InterpolationOptions, Scheme};
use crate::space::{source_points, target_points};
use crate::triangulation::Triangulation;
use crate::weights::WeightMatrix;

pub struct DelaunayInterpolator {
    target: Dataset,
    cache: WeightCache,
}

impl DelaunayInterpolator {
    pub const NAME: &'static str = "delaunay";

    pub fn new(target: &Dataset, options: &InterpolationOptions) -> Result<Self> {
        if options.scheme != Scheme::Linear {
            return Err(AlignError::configuration(format!(
                "Method: {}. Delaunay interpolation only supports linear interpolation",
                options.scheme
            )));
        }
        Ok(Self {
            target: target.clone(),
            cache: WeightCache::default(),
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn weights(&mut self, source: &Dataset) -> Result<Arc<WeightMatrix>> {
        let src = source_points(source)?;
        let tgt = target_points(&self.target)?;
        self.cache.get_or_build(&src, &tgt, || {
            let triangulation = Triangulation::new(&src)?;
            Ok(WeightMatrix::build(&triangulation, &tgt))
        })
    }
}

impl Interpolator for DelaunayInterpolator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interpolate_raw(&mut self, source: &Dataset) -> Result<Dataset> {
        if !source.has_dim(GRID_INDEX) {
            return Err(AlignError::unsupported(
                "Delaunay interpolation currently only supports stacked grids",
            ));
        }
        let weights = self.weights(source)?;
        let (n_target, _) = weights.shape();

        let mut variables = Vec::new();
        for (name, var) in source.data_vars() {
            if var.dims.last().map(String::as_str) != Some(GRID_INDEX) {
                warn!(variable = name, "Skipping variable, it does not end with spatial dimension grid_index");
                continue;
            }
            debug!(variable = name, "Interpolating");
            let data = var.map_blocks(n_target, |block| interpolate_block(&weights, block, name))?;
            let mut dims = var.dims.clone();
            if let Some(last) = dims.last_mut() {
                *last = POINT_INDEX.to_string();
            }
            let mut out = Variable::new(dims, data)?;
            out.chunks = var.chunks.as_ref().map(|chunks| {
                let mut chunks = chunks.clone();
                if let Some(last) = chunks.last_mut() {
                    *last = vec![n_target];
                }
                chunks
            });
            variables.push((name.to_string(), out));
        }
        assemble_output(source, &self.target, variables)
    }
}

/// Multiply one `(.., n_source)` block by the transposed weights.
fn interpolate_block(weights: &WeightMatrix, block: ArrayViewD<'_, f64>, variable: &str) -> Result<ArrayD<f64>> {
    let shape = block.shape();
    let n_source = shape[shape.len() - 1];
    let n_leading: usize = shape[..shape.len() - 1].iter().product();

    if block.iter().any(|v| v.is_nan()) {
        warn!(variable, "Interpolating NaNs");
    }

    let flat = Array2::from_shape_vec((n_leading, n_source), block.iter().copied().collect())?;
    let out = weights.apply(flat.view());
    let mut out_shape = shape[..shape.len() - 1].to_vec();
    out_shape.push(out.ncols());
    Ok(out.into_shape(IxDyn(&out_shape))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_nearest_scheme() {
        let err = DelaunayInterpolator::new(&Dataset::new(), &InterpolationOptions::with_scheme(Scheme::Nearest))
            .err()
            .unwrap();
        assert!(matches!(err, AlignError::Configuration(_)));
    }

    #[test]
    fn test_block_keeps_leading_shape() {
        let triangulation = Triangulation::new(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]).unwrap();
        let weights = WeightMatrix::build(&triangulation, &[[0.5, 0.5], [0.0, 0.0], [0.25, 0.75]]);
        let block = ArrayD::from_shape_vec(IxDyn(&[2, 1, 4]), vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let out = interpolate_block(&weights, block.view(), "t2m").unwrap();
        assert_eq!(out.shape(), &[2, 1, 3]);
        assert!((out[[0, 0, 0]] - 2.5).abs() < 1e-12);
        assert!((out[[0, 0, 1]] - 1.0).abs() < 1e-12);
        assert_eq!(out[[1, 0, 2]], 0.0);
    }
}
