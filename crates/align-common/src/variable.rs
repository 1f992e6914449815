//! Data variables: named-dimension float arrays with optional block chunking.

use ndarray::{ArrayD, ArrayViewD, IxDyn, Slice};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use crate::ops;

/// A data variable. Missing values are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "VariableWire", try_from = "VariableWire")]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    /// Block sizes per dimension, aligned with `dims`. `None` means one block.
    pub chunks: Option<Vec<Vec<usize>>>,
}

impl Variable {
    pub fn new(dims: Vec<String>, data: ArrayD<f64>) -> Result<Self> {
        if dims.len() != data.ndim() {
            return Err(AlignError::dimension(format!(
                "variable with dims {:?} has rank {}",
                dims,
                data.ndim()
            )));
        }
        Ok(Self {
            dims,
            data,
            chunks: None,
        })
    }

    /// Convenience constructor from string slices.
    pub fn from_dims(dims: &[&str], data: ArrayD<f64>) -> Result<Self> {
        Self::new(dims.iter().map(|d| d.to_string()).collect(), data)
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Split the variable into blocks. Every dimension without an entry
    /// stays a single block.
    pub fn chunked(mut self, chunks: &[(&str, usize)]) -> Result<Self> {
        let mut per_dim: Vec<Vec<usize>> = self.shape().iter().map(|&n| vec![n]).collect();
        for (dim, size) in chunks {
            let axis = self
                .axis_of(dim)
                .ok_or_else(|| AlignError::dimension(format!("cannot chunk missing dimension '{}'", dim)))?;
            if *size == 0 {
                return Err(AlignError::dimension("chunk size must be positive"));
            }
            let n = self.shape()[axis];
            let mut blocks = vec![*size; n / size];
            if n % size != 0 {
                blocks.push(n % size);
            }
            per_dim[axis] = blocks;
        }
        self.chunks = Some(per_dim);
        Ok(self)
    }

    /// Number of blocks along `dim` (1 when unchunked).
    pub fn n_chunks(&self, dim: &str) -> usize {
        match (&self.chunks, self.axis_of(dim)) {
            (Some(chunks), Some(axis)) => chunks[axis].len().max(1),
            _ => 1,
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.chunks
            .as_ref()
            .map(|c| c.iter().any(|blocks| blocks.len() > 1))
            .unwrap_or(false)
    }

    fn block_sizes(&self) -> Vec<Vec<usize>> {
        match &self.chunks {
            Some(chunks) => chunks.clone(),
            None => self.shape().iter().map(|&n| vec![n]).collect(),
        }
    }

    /// Apply `f` block by block over the leading dimensions, replacing the
    /// trailing dimension by one of length `out_len`.
    ///
    /// The trailing dimension must be a single block. Blocks are processed in
    /// parallel; `f` only sees its own block.
    pub fn map_blocks<F>(&self, out_len: usize, f: F) -> Result<ArrayD<f64>>
    where
        F: Fn(ArrayViewD<'_, f64>) -> Result<ArrayD<f64>> + Sync,
    {
        let ndim = self.data.ndim();
        if ndim == 0 {
            return Err(AlignError::dimension("cannot map blocks over a scalar variable"));
        }
        let sizes = self.block_sizes();
        let trailing = &self.dims[ndim - 1];
        if sizes[ndim - 1].len() > 1 {
            return Err(AlignError::precondition(format!(
                "{} must not be chunked (found {} chunks)",
                trailing,
                sizes[ndim - 1].len()
            )));
        }

        let mut blocks: Vec<Vec<(usize, usize)>> = vec![Vec::new()];
        for dim_sizes in &sizes[..ndim - 1] {
            let mut next = Vec::with_capacity(blocks.len() * dim_sizes.len());
            for origin in &blocks {
                let mut start = 0;
                for &size in dim_sizes {
                    let mut block = origin.clone();
                    block.push((start, start + size));
                    next.push(block);
                    start += size;
                }
            }
            blocks = next;
        }

        let results: Vec<Result<(Vec<(usize, usize)>, ArrayD<f64>)>> = blocks
            .into_par_iter()
            .map(|ranges| {
                let view = self.data.slice_each_axis(|ax| {
                    let i = ax.axis.index();
                    if i < ranges.len() {
                        Slice::from(ranges[i].0..ranges[i].1)
                    } else {
                        Slice::from(..)
                    }
                });
                let out = f(view)?;
                Ok((ranges, out))
            })
            .collect();

        let mut shape = self.shape().to_vec();
        shape[ndim - 1] = out_len;
        let mut out = ArrayD::from_elem(IxDyn(&shape), f64::NAN);
        for result in results {
            let (ranges, block) = result?;
            let mut expected: Vec<usize> = ranges.iter().map(|(a, b)| b - a).collect();
            expected.push(out_len);
            if block.shape() != expected.as_slice() {
                return Err(AlignError::dimension(format!(
                    "block function returned shape {:?}, expected {:?}",
                    block.shape(),
                    expected
                )));
            }
            out.slice_each_axis_mut(|ax| {
                let i = ax.axis.index();
                if i < ranges.len() {
                    Slice::from(ranges[i].0..ranges[i].1)
                } else {
                    Slice::from(..)
                }
            })
            .assign(&block);
        }
        Ok(out)
    }

    // Positional operations keep the block layout of untouched dimensions.
    fn reset_chunks(&self, axis: usize, n: usize) -> Option<Vec<Vec<usize>>> {
        self.chunks.as_ref().map(|chunks| {
            let mut chunks = chunks.clone();
            chunks[axis] = vec![n];
            chunks
        })
    }

    pub(crate) fn take(&self, axis: usize, idx: &[usize]) -> Self {
        Self {
            dims: self.dims.clone(),
            data: ops::take_axis(&self.data, axis, idx),
            chunks: self.reset_chunks(axis, idx.len()),
        }
    }

    pub(crate) fn reindex(&self, axis: usize, positions: &[Option<usize>]) -> Self {
        Self {
            dims: self.dims.clone(),
            data: ops::reindex_axis(&self.data, axis, positions, f64::NAN),
            chunks: self.reset_chunks(axis, positions.len()),
        }
    }

    pub(crate) fn permute(&self, order: &[usize]) -> Self {
        Self {
            dims: order.iter().map(|&i| self.dims[i].clone()).collect(),
            data: ops::permute(&self.data, order),
            chunks: self
                .chunks
                .as_ref()
                .map(|c| order.iter().map(|&i| c[i].clone()).collect()),
        }
    }

    pub(crate) fn gather_nd(
        &self,
        axis: usize,
        flat: &[usize],
        new_dims: &[String],
        indexer_shape: &[usize],
    ) -> Result<Self> {
        let mut dims = self.dims[..axis].to_vec();
        dims.extend_from_slice(new_dims);
        dims.extend_from_slice(&self.dims[axis + 1..]);
        Ok(Self {
            dims,
            data: ops::gather_nd(&self.data, axis, flat, indexer_shape)?,
            chunks: None,
        })
    }

    pub(crate) fn split_axis(&self, axis: usize, names: [&str; 2], sizes: [usize; 2]) -> Result<Self> {
        let mut dims = self.dims[..axis].to_vec();
        dims.extend(names.iter().map(|n| n.to_string()));
        dims.extend_from_slice(&self.dims[axis + 1..]);
        let mut shape = self.shape()[..axis].to_vec();
        shape.extend_from_slice(&sizes);
        shape.extend_from_slice(&self.shape()[axis + 1..]);
        Ok(Self {
            dims,
            data: ops::reshape(&self.data, &shape)?,
            chunks: None,
        })
    }

    pub(crate) fn stack_pair(&self, a: (&str, usize), b: (&str, usize), new_dim: &str) -> Result<Self> {
        let (dims, data) = ops::stack_pair(&self.data, &self.dims, a, b, new_dim)?;
        Ok(Self {
            dims,
            data,
            chunks: None,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct VariableWire {
    dims: Vec<String>,
    data: ArrayD<Option<f64>>,
}

impl From<Variable> for VariableWire {
    fn from(var: Variable) -> Self {
        Self {
            dims: var.dims,
            data: var.data.mapv(|v| (!v.is_nan()).then_some(v)),
        }
    }
}

impl TryFrom<VariableWire> for Variable {
    type Error = AlignError;

    fn try_from(wire: VariableWire) -> Result<Self> {
        Variable::new(wire.dims, wire.data.mapv(|v| v.unwrap_or(f64::NAN)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn ramp(shape: &[usize]) -> ArrayD<f64> {
        let n: usize = shape.iter().product();
        Array::from_shape_vec(IxDyn(shape), (0..n).map(|v| v as f64).collect()).unwrap()
    }

    #[test]
    fn test_chunked_block_sizes() {
        let var = Variable::from_dims(&["time", "grid_index"], ramp(&[5, 4]))
            .unwrap()
            .chunked(&[("time", 2)])
            .unwrap();
        assert_eq!(var.chunks.as_ref().unwrap()[0], vec![2, 2, 1]);
        assert_eq!(var.n_chunks("time"), 3);
        assert_eq!(var.n_chunks("grid_index"), 1);
    }

    #[test]
    fn test_map_blocks_matches_whole_array() {
        let var = Variable::from_dims(&["time", "grid_index"], ramp(&[5, 4]))
            .unwrap()
            .chunked(&[("time", 2)])
            .unwrap();
        let out = var
            .map_blocks(1, |block| {
                let sums = block.sum_axis(ndarray::Axis(block.ndim() - 1));
                Ok(sums.insert_axis(ndarray::Axis(block.ndim() - 1)))
            })
            .unwrap();
        assert_eq!(out.shape(), &[5, 1]);
        assert_eq!(out[[0, 0]], 0.0 + 1.0 + 2.0 + 3.0);
        assert_eq!(out[[4, 0]], 16.0 + 17.0 + 18.0 + 19.0);
    }

    #[test]
    fn test_map_blocks_rejects_chunked_trailing_dim() {
        let var = Variable::from_dims(&["time", "grid_index"], ramp(&[2, 4]))
            .unwrap()
            .chunked(&[("grid_index", 2)])
            .unwrap();
        let err = var.map_blocks(1, |b| Ok(b.to_owned())).unwrap_err();
        assert!(matches!(err, AlignError::Precondition(_)));
    }

    #[test]
    fn test_json_nan_is_null() {
        let mut data = ramp(&[2]);
        data[[1]] = f64::NAN;
        let var = Variable::from_dims(&["point_index"], data).unwrap();
        let json = serde_json::to_value(&var).unwrap();
        assert!(json["data"]["data"][1].is_null());
        let back: Variable = serde_json::from_value(json).unwrap();
        assert!(back.data[[1]].is_nan());
    }
}
