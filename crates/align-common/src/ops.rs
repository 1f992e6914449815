//! Element-type agnostic array helpers used by the dataset operations.

use ndarray::{ArrayD, Axis, IxDyn, Slice};

use crate::error::{AlignError, Result};

/// Take positions `idx` along `axis`.
pub(crate) fn take_axis<T: Clone>(a: &ArrayD<T>, axis: usize, idx: &[usize]) -> ArrayD<T> {
    if idx.is_empty() {
        return a.slice_axis(Axis(axis), Slice::from(0..0)).to_owned();
    }
    a.select(Axis(axis), idx)
}

/// Rebuild `axis` from optional source positions, writing `fill` where the
/// position is `None`.
pub(crate) fn reindex_axis<T: Clone>(
    a: &ArrayD<T>,
    axis: usize,
    positions: &[Option<usize>],
    fill: T,
) -> ArrayD<T> {
    let mut shape = a.shape().to_vec();
    shape[axis] = positions.len();
    let mut out = ArrayD::from_elem(IxDyn(&shape), fill);
    for (dst, src) in positions.iter().enumerate() {
        if let Some(src) = src {
            out.index_axis_mut(Axis(axis), dst)
                .assign(&a.index_axis(Axis(axis), *src));
        }
    }
    out
}

/// Reshape in logical (row-major) element order.
pub(crate) fn reshape<T: Clone>(a: &ArrayD<T>, shape: &[usize]) -> Result<ArrayD<T>> {
    let expected: usize = shape.iter().product();
    if expected != a.len() {
        return Err(AlignError::dimension(format!(
            "cannot reshape {} elements into {:?}",
            a.len(),
            shape
        )));
    }
    let values: Vec<T> = a.iter().cloned().collect();
    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?)
}

/// Reorder axes, materializing the result in standard layout.
pub(crate) fn permute<T: Clone>(a: &ArrayD<T>, order: &[usize]) -> ArrayD<T> {
    a.view()
        .permuted_axes(IxDyn(order))
        .as_standard_layout()
        .into_owned()
}

/// Merge axes `a` and `b` (sizes `na`, `nb`) into one trailing axis of size
/// `na * nb`, broadcasting when the array lacks one of them.
///
/// `dims` are the array's dimension names; the returned names list the
/// remaining dimensions followed by `new_dim`.
pub(crate) fn stack_pair<T: Clone>(
    arr: &ArrayD<T>,
    dims: &[String],
    (a, na): (&str, usize),
    (b, nb): (&str, usize),
    new_dim: &str,
) -> Result<(Vec<String>, ArrayD<T>)> {
    let mut dims = dims.to_vec();
    let mut arr = arr.clone();
    for (name, size) in [(a, na), (b, nb)] {
        if !dims.iter().any(|d| d == name) {
            let expanded = arr.insert_axis(Axis(dims.len()));
            let mut shape = expanded.shape().to_vec();
            if let Some(last) = shape.last_mut() {
                *last = size;
            }
            arr = expanded
                .broadcast(IxDyn(&shape))
                .ok_or_else(|| AlignError::dimension(format!("cannot broadcast over '{}'", name)))?
                .to_owned();
            dims.push(name.to_string());
        }
    }

    let position = |name: &str| {
        dims.iter()
            .position(|d| d == name)
            .ok_or_else(|| AlignError::dimension(format!("dimension '{}' missing after broadcast", name)))
    };
    let (ia, ib) = (position(a)?, position(b)?);
    let mut order: Vec<usize> = (0..dims.len()).filter(|&i| i != ia && i != ib).collect();
    order.push(ia);
    order.push(ib);

    let permuted = permute(&arr, &order);
    let mut shape: Vec<usize> = permuted.shape()[..order.len() - 2].to_vec();
    shape.push(na * nb);
    let stacked = reshape(&permuted, &shape)?;

    let mut new_dims: Vec<String> = order[..order.len() - 2]
        .iter()
        .map(|&i| dims[i].clone())
        .collect();
    new_dims.push(new_dim.to_string());
    Ok((new_dims, stacked))
}

/// Replace `axis` with the axes of `indexer_shape`, taking the flat
/// positions `flat` along the original axis.
pub(crate) fn gather_nd<T: Clone>(
    a: &ArrayD<T>,
    axis: usize,
    flat: &[usize],
    indexer_shape: &[usize],
) -> Result<ArrayD<T>> {
    let taken = take_axis(a, axis, flat);
    let mut shape = a.shape()[..axis].to_vec();
    shape.extend_from_slice(indexer_shape);
    shape.extend_from_slice(&a.shape()[axis + 1..]);
    reshape(&taken, &shape)
}
