//! Labelled N-dimensional datasets.
//!
//! A [`Dataset`] holds named dimensions, coordinate arrays keyed to those
//! dimensions, float data variables and an attribute map. Every operation
//! returns a new dataset; coordinates are always materialized.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attrs::Attributes;
use crate::coords::{CoordValues, Coordinate, Label};
use crate::error::{AlignError, Result};
use crate::variable::Variable;

/// A labelled dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    dims: IndexMap<String, usize>,
    coords: IndexMap<String, Coordinate>,
    data_vars: IndexMap<String, Variable>,
    pub attrs: Attributes,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Dataset::assign_coord`].
    pub fn with_coord(mut self, name: impl Into<String>, coord: Coordinate) -> Result<Self> {
        self.assign_coord(name, coord)?;
        Ok(self)
    }

    /// Builder form of [`Dataset::insert_var`].
    pub fn with_var(mut self, name: impl Into<String>, var: Variable) -> Result<Self> {
        self.insert_var(name, var)?;
        Ok(self)
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }

    fn register_dims(&mut self, dims: &[String], shape: &[usize]) -> Result<()> {
        let unique: BTreeSet<&String> = dims.iter().collect();
        if unique.len() != dims.len() {
            return Err(AlignError::dimension(format!("repeated dimension in {:?}", dims)));
        }
        for (dim, &size) in dims.iter().zip(shape) {
            match self.dims.get(dim) {
                Some(&existing) if existing != size => {
                    return Err(AlignError::dimension(format!(
                        "conflicting sizes for dimension '{}': {} vs {}",
                        dim, existing, size
                    )));
                }
                Some(_) => {}
                None => {
                    self.dims.insert(dim.clone(), size);
                }
            }
        }
        Ok(())
    }

    /// Insert or replace a coordinate.
    pub fn assign_coord(&mut self, name: impl Into<String>, coord: Coordinate) -> Result<()> {
        let name = name.into();
        let mut next = self.clone();
        if let Some(i) = next.coords.get_index_of(&name) {
            next.coords.shift_remove_index(i);
            next.prune_dims();
            next.register_dims(&coord.dims, coord.shape())?;
            next.coords.shift_insert(i, name, coord);
        } else {
            next.register_dims(&coord.dims, coord.shape())?;
            next.coords.insert(name, coord);
        }
        *self = next;
        Ok(())
    }

    /// Insert or replace a data variable.
    pub fn insert_var(&mut self, name: impl Into<String>, var: Variable) -> Result<()> {
        let name = name.into();
        self.register_dims(&var.dims, var.shape())?;
        self.data_vars.insert(name, var);
        self.prune_dims();
        Ok(())
    }

    fn prune_dims(&mut self) {
        let used: BTreeSet<String> = self
            .coords
            .values()
            .flat_map(|c| c.dims.iter().cloned())
            .chain(self.data_vars.values().flat_map(|v| v.dims.iter().cloned()))
            .collect();
        self.dims.retain(|d, _| used.contains(d));
    }

    fn check(&self) -> Result<()> {
        for (name, coord) in &self.coords {
            for (dim, &size) in coord.dims.iter().zip(coord.shape()) {
                if self.dims.get(dim) != Some(&size) {
                    return Err(AlignError::dimension(format!(
                        "coordinate '{}' disagrees with the size of '{}'",
                        name, dim
                    )));
                }
            }
        }
        for (name, var) in &self.data_vars {
            for (dim, &size) in var.dims.iter().zip(var.shape()) {
                if self.dims.get(dim) != Some(&size) {
                    return Err(AlignError::dimension(format!(
                        "variable '{}' disagrees with the size of '{}'",
                        name, dim
                    )));
                }
            }
        }
        Ok(())
    }

    // --- accessors ---

    pub fn dims(&self) -> impl Iterator<Item = (&str, usize)> {
        self.dims.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn dim_names(&self) -> Vec<&str> {
        self.dims.keys().map(String::as_str).collect()
    }

    pub fn dim_set(&self) -> BTreeSet<String> {
        self.dims.keys().cloned().collect()
    }

    pub fn dim_size(&self, dim: &str) -> Option<usize> {
        self.dims.get(dim).copied()
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dims.contains_key(dim)
    }

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    /// A coordinate that must be present.
    pub fn require_coord(&self, name: &str) -> Result<&Coordinate> {
        self.coords
            .get(name)
            .ok_or_else(|| AlignError::dimension(format!("missing coordinate '{}'", name)))
    }

    pub fn has_coord(&self, name: &str) -> bool {
        self.coords.contains_key(name)
    }

    pub fn coord_names(&self) -> BTreeSet<String> {
        self.coords.keys().cloned().collect()
    }

    pub fn coords(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.coords.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    pub fn data_vars(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.data_vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn var_names(&self) -> Vec<String> {
        self.data_vars.keys().cloned().collect()
    }

    /// Index labels of a dimension, read from its 1-D coordinate.
    pub fn index(&self, dim: &str) -> Result<Vec<Label>> {
        match self.coords.get(dim) {
            Some(coord) if coord.is_index_of(dim) => coord.values.labels(),
            _ => Err(AlignError::dimension(format!("dimension '{}' has no index coordinate", dim))),
        }
    }

    /// True when any variable splits `dim` into more than one block.
    pub fn is_chunked_along(&self, dim: &str) -> bool {
        self.data_vars.values().any(|v| v.n_chunks(dim) > 1)
    }

    fn size_of(&self, dim: &str) -> Result<usize> {
        self.dims
            .get(dim)
            .copied()
            .ok_or_else(|| AlignError::dimension(format!("dataset has no dimension '{}'", dim)))
    }

    // --- selection ---

    /// Select positions along `dim`.
    pub fn isel(&self, dim: &str, idx: &[usize]) -> Result<Dataset> {
        let size = self.size_of(dim)?;
        if let Some(bad) = idx.iter().find(|&&i| i >= size) {
            return Err(AlignError::dimension(format!(
                "position {} out of bounds for '{}' of size {}",
                bad, dim, size
            )));
        }
        let mut out = self.clone();
        for coord in out.coords.values_mut() {
            if let Some(axis) = coord.axis_of(dim) {
                coord.values = coord.values.take(axis, idx);
            }
        }
        for var in out.data_vars.values_mut() {
            if let Some(axis) = var.axis_of(dim) {
                *var = var.take(axis, idx);
            }
        }
        out.dims.insert(dim.to_string(), idx.len());
        Ok(out)
    }

    /// Select labels along `dim`. Every label must be present.
    pub fn sel(&self, dim: &str, labels: &[Label]) -> Result<Dataset> {
        let lookup = position_lookup(&self.index(dim)?);
        let idx = labels
            .iter()
            .map(|l| lookup.get(l).copied().ok_or_else(|| AlignError::missing_label(dim, l)))
            .collect::<Result<Vec<_>>>()?;
        self.isel(dim, &idx)
    }

    /// Keep the positions along `dim` whose label satisfies `keep`.
    pub fn filter_dim<F>(&self, dim: &str, keep: F) -> Result<Dataset>
    where
        F: Fn(&Label) -> bool,
    {
        let idx: Vec<usize> = self
            .index(dim)?
            .iter()
            .enumerate()
            .filter(|(_, l)| keep(l))
            .map(|(i, _)| i)
            .collect();
        self.isel(dim, &idx)
    }

    /// Conform `dim` to `labels`; absent labels are filled with NaN (or a
    /// missing time).
    pub fn reindex(&self, dim: &str, labels: &[Label]) -> Result<Dataset> {
        let lookup = position_lookup(&self.index(dim)?);
        let positions: Vec<Option<usize>> = labels.iter().map(|l| lookup.get(l).copied()).collect();
        let mut out = self.clone();
        for (name, coord) in out.coords.iter_mut() {
            if name == dim {
                coord.values = CoordValues::from_labels(labels)?;
            } else if let Some(axis) = coord.axis_of(dim) {
                coord.values = coord.values.reindex(axis, &positions);
            }
        }
        for var in out.data_vars.values_mut() {
            if let Some(axis) = var.axis_of(dim) {
                *var = var.reindex(axis, &positions);
            }
        }
        out.dims.insert(dim.to_string(), labels.len());
        Ok(out)
    }

    /// Vectorised selection along `dim` by a multi-dimensional label array.
    ///
    /// Every element of `indexer` must be a label of `dim`. `dim` is replaced
    /// by the indexer's dimensions in every coordinate and variable; the
    /// coordinate named `dim` becomes `indexer` itself.
    pub fn sel_nd(&self, dim: &str, indexer: &Coordinate) -> Result<Dataset> {
        let lookup = position_lookup(&self.index(dim)?);
        let flat = indexer
            .values
            .flat_labels()
            .into_iter()
            .map(|l| match l {
                Some(l) => lookup.get(&l).copied().ok_or_else(|| AlignError::missing_label(dim, &l)),
                None => Err(AlignError::missing_label(dim, "NaT")),
            })
            .collect::<Result<Vec<_>>>()?;

        let shape = indexer.shape().to_vec();
        let mut out = Dataset {
            dims: IndexMap::new(),
            coords: IndexMap::new(),
            data_vars: IndexMap::new(),
            attrs: self.attrs.clone(),
        };
        for (name, coord) in &self.coords {
            let coord = if name == dim {
                indexer.clone()
            } else if let Some(axis) = coord.axis_of(dim) {
                let mut dims = coord.dims[..axis].to_vec();
                dims.extend(indexer.dims.iter().cloned());
                dims.extend_from_slice(&coord.dims[axis + 1..]);
                Coordinate::new(dims, coord.values.gather_nd(axis, &flat, &shape)?)?
            } else {
                coord.clone()
            };
            out.register_dims(&coord.dims, coord.shape())?;
            out.coords.insert(name.clone(), coord);
        }
        for (name, var) in &self.data_vars {
            let var = match var.axis_of(dim) {
                Some(axis) => var.gather_nd(axis, &flat, &indexer.dims, &shape)?,
                None => var.clone(),
            };
            out.register_dims(&var.dims, var.shape())?;
            out.data_vars.insert(name.clone(), var);
        }
        Ok(out)
    }

    // --- reshaping ---

    /// Merge dimensions `a` and `b` into one trailing dimension `new_dim`,
    /// `a` varying slowest.
    pub fn stack(&self, a: &str, b: &str, new_dim: &str) -> Result<Dataset> {
        let na = self.size_of(a)?;
        let nb = self.size_of(b)?;
        let touches = |dims: &[String]| dims.iter().any(|d| d == a || d == b);
        let mut out = Dataset {
            dims: IndexMap::new(),
            coords: IndexMap::new(),
            data_vars: IndexMap::new(),
            attrs: self.attrs.clone(),
        };
        for (name, coord) in &self.coords {
            let coord = if touches(&coord.dims) {
                let (dims, values) = coord.values.stack_pair(&coord.dims, (a, na), (b, nb), new_dim)?;
                Coordinate::new(dims, values)?
            } else {
                coord.clone()
            };
            out.register_dims(&coord.dims, coord.shape())?;
            out.coords.insert(name.clone(), coord);
        }
        for (name, var) in &self.data_vars {
            let var = if touches(&var.dims) {
                var.stack_pair((a, na), (b, nb), new_dim)?
            } else {
                var.clone()
            };
            out.register_dims(&var.dims, var.shape())?;
            out.data_vars.insert(name.clone(), var);
        }
        Ok(out)
    }

    /// Split `dim` into the dimensions `a` and `b`, `a` varying slowest.
    /// The size of `dim` must be `na * nb`.
    pub fn unstack(&self, dim: &str, (a, na): (&str, usize), (b, nb): (&str, usize)) -> Result<Dataset> {
        let size = self.size_of(dim)?;
        if size != na * nb {
            return Err(AlignError::dimension(format!(
                "size of {} ({}) does not match {} x {}",
                dim, size, na, nb
            )));
        }
        let mut out = Dataset {
            dims: IndexMap::new(),
            coords: IndexMap::new(),
            data_vars: IndexMap::new(),
            attrs: self.attrs.clone(),
        };
        for (name, coord) in &self.coords {
            let coord = match coord.axis_of(dim) {
                Some(axis) => {
                    let mut dims = coord.dims[..axis].to_vec();
                    dims.extend([a.to_string(), b.to_string()]);
                    dims.extend_from_slice(&coord.dims[axis + 1..]);
                    let mut shape = coord.shape()[..axis].to_vec();
                    shape.extend([na, nb]);
                    shape.extend_from_slice(&coord.shape()[axis + 1..]);
                    Coordinate::new(dims, coord.values.reshape(&shape)?)?
                }
                None => coord.clone(),
            };
            out.register_dims(&coord.dims, coord.shape())?;
            out.coords.insert(name.clone(), coord);
        }
        for (name, var) in &self.data_vars {
            let var = match var.axis_of(dim) {
                Some(axis) => var.split_axis(axis, [a, b], [na, nb])?,
                None => var.clone(),
            };
            out.register_dims(&var.dims, var.shape())?;
            out.data_vars.insert(name.clone(), var);
        }
        Ok(out)
    }

    /// Make the 1-D coordinate `new`, defined along `old`, the index of the
    /// dimension, renaming the dimension to `new`.
    pub fn swap_dims(&self, old: &str, new: &str) -> Result<Dataset> {
        match self.coords.get(new) {
            Some(coord) if coord.is_index_of(old) => self.rename_dim_only(old, new),
            _ => Err(AlignError::dimension(format!(
                "coordinate '{}' is not a 1-D coordinate along '{}'",
                new, old
            ))),
        }
    }

    /// Rename a dimension together with its index coordinate, if any.
    pub fn rename_dim(&self, old: &str, new: &str) -> Result<Dataset> {
        let mut out = self.rename_dim_only(old, new)?;
        if let Some(coord) = out.coords.get(old) {
            if coord.is_index_of(new) {
                if out.coords.contains_key(new) {
                    return Err(AlignError::dimension(format!("coordinate '{}' already exists", new)));
                }
                out.rename_key(old, new);
            }
        }
        Ok(out)
    }

    fn rename_key(&mut self, old: &str, new: &str) {
        if let Some(i) = self.coords.get_index_of(old) {
            if let Some((_, coord)) = self.coords.shift_remove_index(i) {
                self.coords.shift_insert(i, new.to_string(), coord);
            }
        }
    }

    fn rename_dim_only(&self, old: &str, new: &str) -> Result<Dataset> {
        self.size_of(old)?;
        if old != new && self.dims.contains_key(new) {
            return Err(AlignError::dimension(format!("dimension '{}' already exists", new)));
        }
        let rename = |dims: &mut Vec<String>| {
            for d in dims.iter_mut() {
                if d == old {
                    *d = new.to_string();
                }
            }
        };
        let mut out = self.clone();
        for coord in out.coords.values_mut() {
            rename(&mut coord.dims);
        }
        for var in out.data_vars.values_mut() {
            rename(&mut var.dims);
        }
        out.dims = self
            .dims
            .iter()
            .map(|(d, &n)| (if d == old { new.to_string() } else { d.clone() }, n))
            .collect();
        Ok(out)
    }

    /// Rename a data variable.
    pub fn rename_var(&self, old: &str, new: &str) -> Result<Dataset> {
        if self.data_vars.contains_key(new) {
            return Err(AlignError::configuration(format!("variable '{}' already exists", new)));
        }
        let i = self
            .data_vars
            .get_index_of(old)
            .ok_or_else(|| AlignError::configuration(format!("variable '{}' not found", old)))?;
        let mut out = self.clone();
        if let Some((_, var)) = out.data_vars.shift_remove_index(i) {
            out.data_vars.shift_insert(i, new.to_string(), var);
        }
        Ok(out)
    }

    /// Move the given dimensions to the front of every variable, in order.
    pub fn transpose_front(&self, front: &[&str]) -> Dataset {
        self.transpose_with(|dims| {
            let mut order: Vec<usize> = front
                .iter()
                .filter_map(|f| dims.iter().position(|d| d == f))
                .collect();
            let rest: Vec<usize> = (0..dims.len()).filter(|i| !order.contains(i)).collect();
            order.extend(rest);
            order
        })
    }

    /// Move `dim` to the last axis of every variable and coordinate holding it.
    pub fn transpose_last(&self, dim: &str) -> Dataset {
        self.transpose_with(|dims| {
            let mut order: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] != dim).collect();
            order.extend(dims.iter().position(|d| d == dim));
            order
        })
    }

    fn transpose_with<F>(&self, order_of: F) -> Dataset
    where
        F: Fn(&[String]) -> Vec<usize>,
    {
        let mut out = self.clone();
        for coord in out.coords.values_mut() {
            let order = order_of(&coord.dims);
            if order.iter().enumerate().any(|(i, &o)| i != o) {
                coord.values = coord.values.permute(&order);
                coord.dims = order.iter().map(|&i| coord.dims[i].clone()).collect();
            }
        }
        for var in out.data_vars.values_mut() {
            let order = order_of(&var.dims);
            if order.iter().enumerate().any(|(i, &o)| i != o) {
                *var = var.permute(&order);
            }
        }
        out
    }

    // --- variables ---

    /// Remove coordinates or data variables by name. Unknown names are ignored.
    pub fn drop_vars<S: AsRef<str>>(&self, names: &[S]) -> Dataset {
        let mut out = self.clone();
        for name in names {
            out.coords.shift_remove(name.as_ref());
            out.data_vars.shift_remove(name.as_ref());
        }
        out.prune_dims();
        out
    }

    /// Keep only the named data variables, in the given order.
    pub fn select_vars<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset> {
        let mut data_vars = IndexMap::new();
        for name in names {
            let name = name.as_ref();
            let var = self
                .data_vars
                .get(name)
                .ok_or_else(|| AlignError::configuration(format!("variable '{}' not found", name)))?;
            data_vars.insert(name.to_string(), var.clone());
        }
        let mut out = self.clone();
        out.data_vars = data_vars;
        out.prune_dims();
        Ok(out)
    }

    /// A dataset holding this dataset's coordinates and attributes only.
    pub fn coords_only(&self) -> Dataset {
        let mut out = self.clone();
        out.data_vars.clear();
        out.prune_dims();
        out
    }

    /// Concatenate datasets along `dim`. Coordinates and variables without
    /// `dim` are taken from the first dataset.
    pub fn concat(parts: &[Dataset], dim: &str) -> Result<Dataset> {
        let first = parts
            .first()
            .ok_or_else(|| AlignError::dimension("cannot concatenate zero datasets"))?;
        let total = parts.iter().map(|p| p.size_of(dim)).sum::<Result<usize>>()?;
        let mut out = first.clone();
        for (name, coord) in out.coords.iter_mut() {
            if let Some(axis) = coord.axis_of(dim) {
                let values = parts
                    .iter()
                    .map(|p| p.require_coord(name).map(|c| &c.values))
                    .collect::<Result<Vec<_>>>()?;
                coord.values = CoordValues::concat(&values, axis)?;
            }
        }
        for (name, var) in out.data_vars.iter_mut() {
            if let Some(axis) = var.axis_of(dim) {
                let views = parts
                    .iter()
                    .map(|p| {
                        let other = p.var(name).ok_or_else(|| {
                            AlignError::dimension(format!("variable '{}' missing from a concatenated part", name))
                        })?;
                        if other.dims != var.dims {
                            return Err(AlignError::dimension(format!(
                                "variable '{}' has dims {:?} and {:?}",
                                name, var.dims, other.dims
                            )));
                        }
                        Ok(other.data.view())
                    })
                    .collect::<Result<Vec<_>>>()?;
                var.data = ndarray::concatenate(ndarray::Axis(axis), &views)?;
                var.chunks = None;
            }
        }
        out.dims.insert(dim.to_string(), total);
        out.check()?;
        Ok(out)
    }

    // --- I/O ---

    /// Read a dataset from its JSON encoding.
    pub fn read_json(path: impl AsRef<Path>) -> Result<Dataset> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write the JSON encoding of this dataset.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;
        Ok(())
    }
}

/// First position of each label.
fn position_lookup(labels: &[Label]) -> HashMap<Label, usize> {
    let mut lookup = HashMap::with_capacity(labels.len());
    for (i, l) in labels.iter().enumerate() {
        lookup.entry(l.clone()).or_insert(i);
    }
    lookup
}

#[derive(Deserialize)]
struct RawDataset {
    #[serde(default)]
    dims: IndexMap<String, usize>,
    #[serde(default)]
    coords: IndexMap<String, Coordinate>,
    #[serde(default)]
    data_vars: IndexMap<String, Variable>,
    #[serde(default)]
    attrs: Attributes,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = AlignError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        let mut ds = Dataset {
            dims: raw.dims,
            ..Dataset::default()
        };
        for (name, coord) in raw.coords {
            ds.register_dims(&coord.dims, coord.shape())?;
            ds.coords.insert(name, coord);
        }
        for (name, var) in raw.data_vars {
            ds.register_dims(&var.dims, var.shape())?;
            ds.data_vars.insert(name, var);
        }
        ds.attrs = raw.attrs;
        ds.prune_dims();
        ds.check()?;
        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use ndarray::{array, ArrayD, IxDyn};

    fn forecast() -> Dataset {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        Dataset::new()
            .with_coord("reference_time", Coordinate::times("reference_time", vec![t0, t0 + Duration::hours(6)]))
            .unwrap()
            .with_coord(
                "lead_time",
                Coordinate::deltas("lead_time", vec![Duration::zero(), Duration::hours(3), Duration::hours(6)]),
            )
            .unwrap()
            .with_var("t2m", Variable::from_dims(&["reference_time", "lead_time"], data).unwrap())
            .unwrap()
    }

    #[test]
    fn test_conflicting_sizes_rejected() {
        let ds = forecast();
        let bad = Variable::from_dims(&["lead_time"], array![1.0].into_dyn()).unwrap();
        assert!(ds.with_var("bad", bad).is_err());
    }

    #[test]
    fn test_sel_missing_label() {
        let ds = forecast();
        let err = ds
            .sel("lead_time", &[Label::Delta(Duration::hours(12))])
            .unwrap_err();
        assert!(matches!(err, AlignError::MissingLabel { .. }));
    }

    #[test]
    fn test_reindex_fills_nan() {
        let ds = forecast();
        let labels = vec![
            Label::Delta(Duration::hours(3)),
            Label::Delta(Duration::hours(9)),
        ];
        let out = ds.reindex("lead_time", &labels).unwrap();
        let t2m = &out.var("t2m").unwrap().data;
        assert_eq!(t2m.shape(), &[2, 2]);
        assert_eq!(t2m[[0, 0]], 2.0);
        assert!(t2m[[1, 1]].is_nan());
        assert_eq!(out.index("lead_time").unwrap(), labels);
    }

    #[test]
    fn test_stack_and_swap() {
        let ds = forecast();
        let stacked = ds.stack("reference_time", "lead_time", "time").unwrap();
        assert_eq!(stacked.dim_size("time"), Some(6));
        assert!(!stacked.has_dim("reference_time"));
        let ref_coord = stacked.coord("reference_time").unwrap();
        assert_eq!(ref_coord.dims, vec!["time".to_string()]);
        let t2m = &stacked.var("t2m").unwrap().data;
        assert_eq!(t2m.iter().cloned().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let swapped = stacked.swap_dims("time", "lead_time").unwrap();
        assert!(swapped.has_dim("lead_time"));
        assert!(swapped.coord("lead_time").unwrap().is_index_of("lead_time"));
    }

    #[test]
    fn test_unstack_inverts_stack() {
        let ds = forecast();
        let stacked = ds.stack("reference_time", "lead_time", "time").unwrap();
        let back = stacked
            .drop_vars(&["reference_time", "lead_time"])
            .unstack("time", ("reference_time", 2), ("lead_time", 3))
            .unwrap();
        assert_eq!(back.var("t2m"), ds.var("t2m"));
        assert!(stacked.unstack("time", ("a", 4), ("b", 2)).is_err());
    }

    #[test]
    fn test_sel_nd_replaces_dim() {
        let obs = Dataset::new()
            .with_coord("valid_time", Coordinate::float("valid_time", vec![0.0, 1.0, 2.0]))
            .unwrap()
            .with_var("t2m", Variable::from_dims(&["valid_time"], array![10.0, 11.0, 12.0].into_dyn()).unwrap())
            .unwrap();
        let indexer = Coordinate::new(
            vec!["r".into(), "l".into()],
            CoordValues::Float(array![[0.0, 1.0], [1.0, 2.0]].into_dyn()),
        )
        .unwrap();
        let out = obs.sel_nd("valid_time", &indexer).unwrap();
        assert!(!out.has_dim("valid_time"));
        let t2m = &out.var("t2m").unwrap().data;
        assert_eq!(t2m[[1, 1]], 12.0);
        assert_eq!(out.coord("valid_time").unwrap().dims, vec!["r".to_string(), "l".to_string()]);
    }

    #[test]
    fn test_rename_dim_moves_index() {
        let ds = Dataset::new()
            .with_coord("code", Coordinate::text("code", vec!["A".into(), "B".into()]))
            .unwrap();
        let out = ds.rename_dim("code", "point_index").unwrap();
        assert!(out.coord("point_index").unwrap().is_index_of("point_index"));
        assert!(out.coord("code").is_none());
    }

    #[test]
    fn test_concat_and_json() {
        let ds = forecast();
        let both = Dataset::concat(&[ds.clone(), ds.isel("reference_time", &[1]).unwrap()], "reference_time").unwrap();
        assert_eq!(both.dim_size("reference_time"), Some(3));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fc.json");
        both.write_json(&path).unwrap();
        let back = Dataset::read_json(&path).unwrap();
        assert_eq!(back, both);
    }
}
