//! Free-form dataset attributes.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Attribute map of a dataset.
///
/// Structured entries (properties, CRS, grid mapping) are stored as JSON
/// values and read back through [`Attributes::decode`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Decode a structured entry. Absent keys give `Ok(None)`.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.0.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Store a structured entry.
    pub fn encode<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        self.0.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Copy every entry of `other`, overwriting existing keys.
    pub fn extend(&mut self, other: &Attributes) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Mapping {
        nx: usize,
        dx: f64,
    }

    #[test]
    fn test_encode_decode() {
        let mut attrs = Attributes::new();
        attrs.encode("grid_mapping", &Mapping { nx: 3, dx: 2.5 }).unwrap();
        let back: Option<Mapping> = attrs.decode("grid_mapping").unwrap();
        assert_eq!(back, Some(Mapping { nx: 3, dx: 2.5 }));
        assert!(attrs.decode::<Mapping>("crs").unwrap().is_none());
    }

    #[test]
    fn test_decode_wrong_shape_fails() {
        let mut attrs = Attributes::new();
        attrs.set("grid_mapping", "cerra");
        assert!(attrs.decode::<Mapping>("grid_mapping").is_err());
    }
}
