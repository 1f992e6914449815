//! Built-in transformations.

use align_common::{AlignError, Dataset, Result, Variable};
use indexmap::IndexMap;
use ndarray::Zip;
use serde::Deserialize;
use tracing::debug;

use crate::transform::{parse_params, TransformParams, Transformation};

const KELVIN_OFFSET: f64 = 273.15;

/// A single name or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Names {
    One(String),
    Many(Vec<String>),
}

impl Names {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Names::One(name) => std::slice::from_ref(name),
            Names::Many(names) => names,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.as_slice().iter().any(|n| n == name)
    }
}

fn require_var<'a>(ds: &'a Dataset, name: &str) -> Result<&'a Variable> {
    ds.var(name)
        .ok_or_else(|| AlignError::configuration(format!("variable '{}' not found", name)))
}

/// Give data variables a common name: every variable named in a list is
/// renamed to that list's key.
pub struct Rename;

#[derive(Deserialize)]
struct RenameParams {
    rename_dict: IndexMap<String, Names>,
}

impl Transformation for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn apply(&self, ds: Dataset, params: &TransformParams) -> Result<Dataset> {
        let params: RenameParams = parse_params(self.name(), params)?;
        let mut out = ds;
        for (new_name, old_names) in &params.rename_dict {
            for name in out.var_names() {
                if name != *new_name && old_names.contains(&name) {
                    if out.var(new_name).is_some() {
                        return Err(AlignError::configuration(format!(
                            "cannot rename '{}' to '{}': '{}' already exists",
                            name, new_name, new_name
                        )));
                    }
                    debug!(from = %name, to = %new_name, "Renaming variable");
                    out = out.rename_var(&name, new_name)?;
                }
            }
        }
        Ok(out)
    }
}

/// Subtract (or with `inverse`, add) 273.15 from the named variables.
pub struct KelvinToCelsius;

#[derive(Deserialize)]
struct KelvinToCelsiusParams {
    vars: Names,
    #[serde(default)]
    inverse: bool,
}

impl Transformation for KelvinToCelsius {
    fn name(&self) -> &str {
        "kelvin_to_celsius"
    }

    fn apply(&self, ds: Dataset, params: &TransformParams) -> Result<Dataset> {
        let params: KelvinToCelsiusParams = parse_params(self.name(), params)?;
        let offset = if params.inverse { KELVIN_OFFSET } else { -KELVIN_OFFSET };
        let mut out = ds;
        for name in params.vars.as_slice() {
            let mut var = require_var(&out, name)?.clone();
            var.data.mapv_inplace(|x| x + offset);
            out.insert_var(name.clone(), var)?;
        }
        Ok(out)
    }
}

/// Wind speed from its two components.
pub struct UvToSpeed;

#[derive(Deserialize)]
struct UvToSpeedParams {
    u: String,
    v: String,
    speed: String,
}

impl Transformation for UvToSpeed {
    fn name(&self) -> &str {
        "uv_to_speed"
    }

    fn apply(&self, ds: Dataset, params: &TransformParams) -> Result<Dataset> {
        let params: UvToSpeedParams = parse_params(self.name(), params)?;
        let u = require_var(&ds, &params.u)?;
        let v = require_var(&ds, &params.v)?;
        if u.dims != v.dims {
            return Err(AlignError::dimension(format!(
                "'{}' has dims {:?} but '{}' has {:?}",
                params.u, u.dims, params.v, v.dims
            )));
        }
        let data = Zip::from(&u.data).and(&v.data).map_collect(|a, b| a.hypot(*b));
        let mut speed = Variable::new(u.dims.clone(), data)?;
        speed.chunks = u.chunks.clone();

        let mut out = ds.clone();
        out.insert_var(params.speed, speed)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};
    use serde_json::json;

    fn params(value: serde_json::Value) -> TransformParams {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("parameters must be an object"),
        }
    }

    fn dataset(vars: &[(&str, Vec<f64>)]) -> Dataset {
        let mut ds = Dataset::new();
        for (name, values) in vars {
            let data = ArrayD::from_shape_vec(IxDyn(&[values.len()]), values.clone()).unwrap();
            ds.insert_var(*name, Variable::from_dims(&["point_index"], data).unwrap())
                .unwrap();
        }
        ds
    }

    #[test]
    fn test_rename_from_any_listed_name() {
        let ds = dataset(&[("2t", vec![1.0]), ("10u", vec![2.0])]);
        let out = Rename
            .apply(ds, &params(json!({"rename_dict": {"t2m": ["air_temperature", "2t"], "u10": "10u"}})))
            .unwrap();
        assert_eq!(out.var_names(), vec!["t2m".to_string(), "u10".to_string()]);
    }

    #[test]
    fn test_rename_onto_existing_variable_fails() {
        let ds = dataset(&[("2t", vec![1.0]), ("t2m", vec![2.0])]);
        let err = Rename
            .apply(ds, &params(json!({"rename_dict": {"t2m": "2t"}})))
            .unwrap_err();
        assert!(matches!(err, AlignError::Configuration(ref m) if m.contains("already exists")));
    }

    #[test]
    fn test_rename_to_itself_is_a_no_op() {
        let ds = dataset(&[("t2m", vec![2.0])]);
        let out = Rename
            .apply(ds, &params(json!({"rename_dict": {"t2m": ["t2m", "2t"]}})))
            .unwrap();
        assert_eq!(out.var_names(), vec!["t2m".to_string()]);
    }

    #[test]
    fn test_kelvin_to_celsius_and_back() {
        let ds = dataset(&[("t2m", vec![273.15, 300.0])]);
        let celsius = KelvinToCelsius.apply(ds, &params(json!({"vars": "t2m"}))).unwrap();
        let data = &celsius.var("t2m").unwrap().data;
        assert!(data[[0]].abs() < 1e-9);
        assert!((data[[1]] - 26.85).abs() < 1e-9);

        let kelvin = KelvinToCelsius
            .apply(celsius, &params(json!({"vars": ["t2m"], "inverse": true})))
            .unwrap();
        assert!((kelvin.var("t2m").unwrap().data[[1]] - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_kelvin_to_celsius_missing_variable() {
        let err = KelvinToCelsius
            .apply(dataset(&[]), &params(json!({"vars": "t2m"})))
            .unwrap_err();
        assert!(matches!(err, AlignError::Configuration(_)));
    }

    #[test]
    fn test_uv_to_speed() {
        let ds = dataset(&[("u10", vec![3.0, 0.0]), ("v10", vec![4.0, -2.0])]);
        let out = UvToSpeed
            .apply(ds, &params(json!({"u": "u10", "v": "v10", "speed": "ws10"})))
            .unwrap();
        let speed = &out.var("ws10").unwrap().data;
        assert!((speed[[0]] - 5.0).abs() < 1e-12);
        assert!((speed[[1]] - 2.0).abs() < 1e-12);
        assert!(out.var("u10").is_some());
    }

    #[test]
    fn test_invalid_parameters() {
        let err = UvToSpeed.apply(Dataset::new(), &params(json!({"u": "u10"}))).unwrap_err();
        assert!(matches!(err, AlignError::Configuration(ref m) if m.starts_with("uv_to_speed: invalid parameters")));
    }
}
