//! Coordinate arrays and index labels.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, Utc};
use ndarray::{Array1, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};
use crate::ops;

/// Timestamp type used for reference and valid times.
pub type Timestamp = DateTime<Utc>;

/// Typed values of a coordinate.
///
/// Time-like values are optional so that outer joins can fill the gaps
/// with a not-a-time marker, in the same way float values are filled with NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ValuesWire", from = "ValuesWire")]
pub enum CoordValues {
    Float(ArrayD<f64>),
    Time(ArrayD<Option<Timestamp>>),
    Delta(ArrayD<Option<Duration>>),
    Text(ArrayD<String>),
}

macro_rules! each_values {
    ($values:expr, $arr:ident => $body:expr) => {
        match $values {
            CoordValues::Float($arr) => CoordValues::Float($body),
            CoordValues::Time($arr) => CoordValues::Time($body),
            CoordValues::Delta($arr) => CoordValues::Delta($body),
            CoordValues::Text($arr) => CoordValues::Text($body),
        }
    };
}

impl CoordValues {
    /// Shape of the underlying array.
    pub fn shape(&self) -> &[usize] {
        match self {
            CoordValues::Float(a) => a.shape(),
            CoordValues::Time(a) => a.shape(),
            CoordValues::Delta(a) => a.shape(),
            CoordValues::Text(a) => a.shape(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the value type, for error messages.
    pub fn dtype(&self) -> &'static str {
        match self {
            CoordValues::Float(_) => "float",
            CoordValues::Time(_) => "time",
            CoordValues::Delta(_) => "delta",
            CoordValues::Text(_) => "text",
        }
    }

    pub fn as_float(&self) -> Option<&ArrayD<f64>> {
        match self {
            CoordValues::Float(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&ArrayD<Option<Timestamp>>> {
        match self {
            CoordValues::Time(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_delta(&self) -> Option<&ArrayD<Option<Duration>>> {
        match self {
            CoordValues::Delta(a) => Some(a),
            _ => None,
        }
    }

    pub(crate) fn take(&self, axis: usize, idx: &[usize]) -> Self {
        each_values!(self, a => ops::take_axis(a, axis, idx))
    }

    pub(crate) fn reindex(&self, axis: usize, positions: &[Option<usize>]) -> Self {
        match self {
            CoordValues::Float(a) => CoordValues::Float(ops::reindex_axis(a, axis, positions, f64::NAN)),
            CoordValues::Time(a) => CoordValues::Time(ops::reindex_axis(a, axis, positions, None)),
            CoordValues::Delta(a) => CoordValues::Delta(ops::reindex_axis(a, axis, positions, None)),
            CoordValues::Text(a) => CoordValues::Text(ops::reindex_axis(a, axis, positions, String::new())),
        }
    }

    pub(crate) fn permute(&self, order: &[usize]) -> Self {
        each_values!(self, a => ops::permute(a, order))
    }

    pub(crate) fn reshape(&self, shape: &[usize]) -> Result<Self> {
        Ok(each_values!(self, a => ops::reshape(a, shape)?))
    }

    pub(crate) fn gather_nd(&self, axis: usize, flat: &[usize], shape: &[usize]) -> Result<Self> {
        Ok(each_values!(self, a => ops::gather_nd(a, axis, flat, shape)?))
    }

    pub(crate) fn stack_pair(
        &self,
        dims: &[String],
        a: (&str, usize),
        b: (&str, usize),
        new_dim: &str,
    ) -> Result<(Vec<String>, Self)> {
        let mut names = Vec::new();
        let values = each_values!(self, arr => {
            let (n, v) = ops::stack_pair(arr, dims, a, b, new_dim)?;
            names = n;
            v
        });
        Ok((names, values))
    }

    pub(crate) fn concat(parts: &[&CoordValues], axis: usize) -> Result<Self> {
        fn join<T: Clone>(arrays: Vec<&ArrayD<T>>, axis: usize) -> Result<ArrayD<T>> {
            let views: Vec<_> = arrays.iter().map(|a| a.view()).collect();
            Ok(ndarray::concatenate(ndarray::Axis(axis), &views)?)
        }
        let first = parts
            .first()
            .ok_or_else(|| AlignError::dimension("cannot concatenate zero coordinates"))?;
        let mismatch = || AlignError::dimension("cannot concatenate coordinates of different types");
        Ok(match first {
            CoordValues::Float(_) => CoordValues::Float(join(
                parts.iter().map(|p| p.as_float().ok_or_else(mismatch)).collect::<Result<_>>()?,
                axis,
            )?),
            CoordValues::Time(_) => CoordValues::Time(join(
                parts.iter().map(|p| p.as_time().ok_or_else(mismatch)).collect::<Result<_>>()?,
                axis,
            )?),
            CoordValues::Delta(_) => CoordValues::Delta(join(
                parts.iter().map(|p| p.as_delta().ok_or_else(mismatch)).collect::<Result<_>>()?,
                axis,
            )?),
            CoordValues::Text(_) => CoordValues::Text(join(
                parts
                    .iter()
                    .map(|p| match p {
                        CoordValues::Text(a) => Ok(a),
                        _ => Err(mismatch()),
                    })
                    .collect::<Result<_>>()?,
                axis,
            )?),
        })
    }

    /// Labels of a one-dimensional coordinate.
    ///
    /// Fails on missing time values, which cannot act as index labels.
    pub fn labels(&self) -> Result<Vec<Label>> {
        if self.shape().len() != 1 {
            return Err(AlignError::dimension(format!(
                "index labels require a 1-D coordinate, got shape {:?}",
                self.shape()
            )));
        }
        match self {
            CoordValues::Float(a) => Ok(a.iter().map(|v| Label::Float(FloatKey(*v))).collect()),
            CoordValues::Time(a) => a
                .iter()
                .map(|v| v.map(Label::Time).ok_or_else(|| AlignError::dimension("missing time in index")))
                .collect(),
            CoordValues::Delta(a) => a
                .iter()
                .map(|v| v.map(Label::Delta).ok_or_else(|| AlignError::dimension("missing lead time in index")))
                .collect(),
            CoordValues::Text(a) => Ok(a.iter().map(|v| Label::Text(v.clone())).collect()),
        }
    }

    /// Labels of every element in logical order; `None` marks a missing time.
    pub fn flat_labels(&self) -> Vec<Option<Label>> {
        match self {
            CoordValues::Float(a) => a.iter().map(|v| Some(Label::Float(FloatKey(*v)))).collect(),
            CoordValues::Time(a) => a.iter().map(|v| v.map(Label::Time)).collect(),
            CoordValues::Delta(a) => a.iter().map(|v| v.map(Label::Delta)).collect(),
            CoordValues::Text(a) => a.iter().map(|v| Some(Label::Text(v.clone()))).collect(),
        }
    }

    /// Build a one-dimensional coordinate from labels of a single kind.
    pub fn from_labels(labels: &[Label]) -> Result<Self> {
        let shape = IxDyn(&[labels.len()]);
        let kind = labels.first().map(Label::kind).unwrap_or("time");
        let mixed = || AlignError::dimension("labels of mixed kinds cannot form an index");
        Ok(match kind {
            "float" => CoordValues::Float(ArrayD::from_shape_vec(
                shape,
                labels
                    .iter()
                    .map(|l| match l {
                        Label::Float(k) => Ok(k.0),
                        _ => Err(mixed()),
                    })
                    .collect::<Result<_>>()?,
            )?),
            "delta" => CoordValues::Delta(ArrayD::from_shape_vec(
                shape,
                labels
                    .iter()
                    .map(|l| match l {
                        Label::Delta(d) => Ok(Some(*d)),
                        _ => Err(mixed()),
                    })
                    .collect::<Result<_>>()?,
            )?),
            "text" => CoordValues::Text(ArrayD::from_shape_vec(
                shape,
                labels
                    .iter()
                    .map(|l| match l {
                        Label::Text(s) => Ok(s.clone()),
                        _ => Err(mixed()),
                    })
                    .collect::<Result<_>>()?,
            )?),
            _ => CoordValues::Time(ArrayD::from_shape_vec(
                shape,
                labels
                    .iter()
                    .map(|l| match l {
                        Label::Time(t) => Ok(Some(*t)),
                        _ => Err(mixed()),
                    })
                    .collect::<Result<_>>()?,
            )?),
        })
    }
}

/// A named-dimension coordinate array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub dims: Vec<String>,
    pub values: CoordValues,
}

impl Coordinate {
    /// Create a coordinate, checking the dimension count against the array rank.
    pub fn new(dims: Vec<String>, values: CoordValues) -> Result<Self> {
        if dims.len() != values.shape().len() {
            return Err(AlignError::dimension(format!(
                "coordinate with dims {:?} has rank {}",
                dims,
                values.shape().len()
            )));
        }
        Ok(Self { dims, values })
    }

    pub fn float(dim: &str, values: Vec<f64>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            values: CoordValues::Float(Array1::from(values).into_dyn()),
        }
    }

    pub fn times(dim: &str, values: Vec<Timestamp>) -> Self {
        let values: Vec<Option<Timestamp>> = values.into_iter().map(Some).collect();
        Self {
            dims: vec![dim.to_string()],
            values: CoordValues::Time(Array1::from(values).into_dyn()),
        }
    }

    pub fn deltas(dim: &str, values: Vec<Duration>) -> Self {
        let values: Vec<Option<Duration>> = values.into_iter().map(Some).collect();
        Self {
            dims: vec![dim.to_string()],
            values: CoordValues::Delta(Array1::from(values).into_dyn()),
        }
    }

    pub fn text(dim: &str, values: Vec<String>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            values: CoordValues::Text(Array1::from(values).into_dyn()),
        }
    }

    /// Index of `dim` among this coordinate's dimensions.
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// True when the coordinate is the one-dimensional index of `dim`.
    pub fn is_index_of(&self, dim: &str) -> bool {
        self.dims.len() == 1 && self.dims[0] == dim
    }
}

/// A hashable, ordered index label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Time(Timestamp),
    Delta(Duration),
    Float(FloatKey),
    Text(String),
}

impl Label {
    fn kind(&self) -> &'static str {
        match self {
            Label::Time(_) => "time",
            Label::Delta(_) => "delta",
            Label::Float(_) => "float",
            Label::Text(_) => "text",
        }
    }

    pub fn as_time(&self) -> Option<Timestamp> {
        match self {
            Label::Time(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_delta(&self) -> Option<Duration> {
        match self {
            Label::Delta(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Label::Delta(d) => write!(f, "{}s", d.num_seconds()),
            Label::Float(k) => write!(f, "{}", k.0),
            Label::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Float wrapper with total ordering and bitwise equality, usable as a key.
#[derive(Debug, Clone, Copy)]
pub struct FloatKey(pub f64);

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatKey {}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for FloatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// On-disk encoding: NaN floats become null, lead times are whole seconds.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "data", rename_all = "lowercase")]
enum ValuesWire {
    Float(ArrayD<Option<f64>>),
    Time(ArrayD<Option<Timestamp>>),
    Delta(ArrayD<Option<i64>>),
    Text(ArrayD<String>),
}

impl From<CoordValues> for ValuesWire {
    fn from(values: CoordValues) -> Self {
        match values {
            CoordValues::Float(a) => ValuesWire::Float(a.mapv(|v| (!v.is_nan()).then_some(v))),
            CoordValues::Time(a) => ValuesWire::Time(a),
            CoordValues::Delta(a) => ValuesWire::Delta(a.mapv(|d| d.map(|d| d.num_seconds()))),
            CoordValues::Text(a) => ValuesWire::Text(a),
        }
    }
}

impl From<ValuesWire> for CoordValues {
    fn from(wire: ValuesWire) -> Self {
        match wire {
            ValuesWire::Float(a) => CoordValues::Float(a.mapv(|v| v.unwrap_or(f64::NAN))),
            ValuesWire::Time(a) => CoordValues::Time(a),
            ValuesWire::Delta(a) => CoordValues::Delta(a.mapv(|s| s.map(Duration::seconds))),
            ValuesWire::Text(a) => CoordValues::Text(a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_labels_roundtrip() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let coord = Coordinate::times("reference_time", vec![t0, t0 + Duration::hours(6)]);
        let labels = coord.values.labels().unwrap();
        assert_eq!(labels[1], Label::Time(t0 + Duration::hours(6)));
        assert_eq!(CoordValues::from_labels(&labels).unwrap(), coord.values);
    }

    #[test]
    fn test_missing_time_is_not_a_label() {
        let values = CoordValues::Time(ArrayD::from_shape_vec(IxDyn(&[2]), vec![None, None]).unwrap());
        assert!(values.labels().is_err());
    }

    #[test]
    fn test_float_key_total_order() {
        let mut keys = vec![FloatKey(0.9), FloatKey(0.1), FloatKey(0.5)];
        keys.sort();
        assert_eq!(keys[0], FloatKey(0.1));
    }

    #[test]
    fn test_json_encoding_keeps_nan_and_deltas() {
        let mut coord = Coordinate::float("point_index", vec![1.0, f64::NAN]);
        let json = serde_json::to_string(&coord).unwrap();
        let back: Coordinate = serde_json::from_str(&json).unwrap();
        let values = back.values.as_float().unwrap();
        assert_eq!(values[[0]], 1.0);
        assert!(values[[1]].is_nan());

        coord = Coordinate::deltas("lead_time", vec![Duration::hours(3)]);
        let json = serde_json::to_string(&coord).unwrap();
        let back: Coordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coord);
    }
}
