//! Sparse barycentric weight matrices.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use tracing::debug;

use crate::triangulation::{Point, Triangulation};

/// A compressed sparse row (n_target × n_source) matrix of interpolation
/// weights.
///
/// Rows of targets inside the convex hull hold one weight per simplex vertex,
/// summing to one. Rows of targets outside hold NaN in every stored position.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    n_target: usize,
    n_source: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
    outside: usize,
}

impl WeightMatrix {
    /// Build the weights of `targets` from a triangulation of the source
    /// points.
    pub fn build(triangulation: &Triangulation, targets: &[Point]) -> Self {
        let n_target = targets.len();
        let n_source = triangulation.points().len();
        debug!(n_target, n_source, "Calculating interpolation-weight matrix");

        let filler = triangulation.simplices().first().copied().unwrap_or([0, 0, 0]);
        let rows: Vec<([usize; 3], [f64; 3], bool)> = targets
            .par_iter()
            .map(|&p| match triangulation.locate(p) {
                Some((s, bary)) => (triangulation.simplices()[s], bary, true),
                None => (filler, [f64::NAN; 3], false),
            })
            .collect();

        let mut indptr = Vec::with_capacity(n_target + 1);
        let mut indices = Vec::with_capacity(3 * n_target);
        let mut values = Vec::with_capacity(3 * n_target);
        let mut outside = 0;
        indptr.push(0);
        for (vertices, weights, inside) in rows {
            if !inside {
                outside += 1;
            }
            indices.extend_from_slice(&vertices);
            values.extend_from_slice(&weights);
            indptr.push(indices.len());
        }
        debug!(outside, "Done");

        Self {
            n_target,
            n_source,
            indptr,
            indices,
            values,
            outside,
        }
    }

    /// Shape as (n_target, n_source).
    pub fn shape(&self) -> (usize, usize) {
        (self.n_target, self.n_source)
    }

    /// Number of targets outside the source convex hull.
    pub fn n_outside(&self) -> usize {
        self.outside
    }

    /// Column indices and weights of one row.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.indptr[i]..self.indptr[i + 1];
        (&self.indices[range.clone()], &self.values[range])
    }

    /// Multiply `(n_leading, n_source)` values by the transposed weights,
    /// giving `(n_leading, n_target)`.
    pub fn apply(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let n_leading = data.nrows();
        let mut out = Array2::<f64>::zeros((n_leading, self.n_target));
        for (l, src) in data.outer_iter().enumerate() {
            for t in 0..self.n_target {
                let (cols, weights) = self.row(t);
                out[[l, t]] = cols.iter().zip(weights).map(|(&c, &w)| w * src[c]).sum();
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn square() -> Triangulation {
        Triangulation::new(&[[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_rows_sum_to_one_inside() {
        let targets = vec![[0.5, 0.5], [0.1, 0.2], [0.9, 0.05], [1.0, 1.0]];
        let w = WeightMatrix::build(&square(), &targets);
        assert_eq!(w.shape(), (4, 4));
        for t in 0..targets.len() {
            let (_, weights) = w.row(t);
            assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert_eq!(w.n_outside(), 0);
    }

    #[test]
    fn test_outside_rows_all_nan() {
        let w = WeightMatrix::build(&square(), &[[2.0, 2.0], [0.5, 0.5]]);
        let (_, weights) = w.row(0);
        assert!(!weights.is_empty());
        assert!(weights.iter().all(|v| v.is_nan()));
        assert_eq!(w.n_outside(), 1);
    }

    #[test]
    fn test_apply_square_centre() {
        let w = WeightMatrix::build(&square(), &[[0.5, 0.5], [5.0, 5.0]]);
        let data = array![[1.0, 2.0, 3.0, 4.0], [10.0, 10.0, 10.0, 10.0]];
        let out = w.apply(data.view());
        assert!((out[[0, 0]] - 2.5).abs() < 1e-12);
        assert!(out[[0, 1]].is_nan());
        assert!((out[[1, 0]] - 10.0).abs() < 1e-12);
    }
}
