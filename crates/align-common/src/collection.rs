//! Shape-preserving containers of datasets.

use indexmap::IndexMap;

use crate::error::Result;

/// A single item, an ordered list, or a name-keyed map.
///
/// Operations that fan out over a collection return the same shape category
/// they were given.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection<T> {
    Single(T),
    List(Vec<T>),
    Map(IndexMap<String, T>),
}

impl<T> Collection<T> {
    pub fn len(&self) -> usize {
        match self {
            Collection::Single(_) => 1,
            Collection::List(items) => items.len(),
            Collection::Map(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items in order.
    pub fn values(&self) -> Vec<&T> {
        match self {
            Collection::Single(item) => vec![item],
            Collection::List(items) => items.iter().collect(),
            Collection::Map(items) => items.values().collect(),
        }
    }

    /// Items with their map key, if any.
    pub fn entries(&self) -> Vec<(Option<&str>, &T)> {
        match self {
            Collection::Single(item) => vec![(None, item)],
            Collection::List(items) => items.iter().map(|i| (None, i)).collect(),
            Collection::Map(items) => items.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
        }
    }

    /// Map every item, keeping the collection shape.
    pub fn map<U, F>(self, mut f: F) -> Collection<U>
    where
        F: FnMut(T) -> U,
    {
        match self {
            Collection::Single(item) => Collection::Single(f(item)),
            Collection::List(items) => Collection::List(items.into_iter().map(f).collect()),
            Collection::Map(items) => Collection::Map(items.into_iter().map(|(k, v)| (k, f(v))).collect()),
        }
    }

    /// Fallible [`Collection::map`]; stops at the first error.
    pub fn try_map<U, F>(self, mut f: F) -> Result<Collection<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        Ok(match self {
            Collection::Single(item) => Collection::Single(f(item)?),
            Collection::List(items) => Collection::List(items.into_iter().map(f).collect::<Result<_>>()?),
            Collection::Map(items) => Collection::Map(
                items
                    .into_iter()
                    .map(|(k, v)| f(v).map(|v| (k, v)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Fallible map over borrowed items.
    pub fn try_map_ref<U, F>(&self, mut f: F) -> Result<Collection<U>>
    where
        F: FnMut(&T) -> Result<U>,
    {
        Ok(match self {
            Collection::Single(item) => Collection::Single(f(item)?),
            Collection::List(items) => Collection::List(items.iter().map(&mut f).collect::<Result<_>>()?),
            Collection::Map(items) => Collection::Map(
                items
                    .iter()
                    .map(|(k, v)| f(v).map(|v| (k.clone(), v)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    pub fn into_single(self) -> Option<T> {
        match self {
            Collection::Single(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<IndexMap<String, T>> {
        match self {
            Collection::Map(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Collection::Single(item) => vec![item],
            Collection::List(items) => items,
            Collection::Map(items) => items.into_values().collect(),
        }
    }
}

impl<T> From<T> for Collection<T> {
    fn from(item: T) -> Self {
        Collection::Single(item)
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Collection::List(items)
    }
}

impl<T> From<IndexMap<String, T>> for Collection<T> {
    fn from(items: IndexMap<String, T>) -> Self {
        Collection::Map(items)
    }
}
