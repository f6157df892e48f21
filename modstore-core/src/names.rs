//! Member name overrides

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Override table from a declared member name to the externally visible name.
///
/// The external name is what ends up in dispatch keys and constants. Lookups
/// fall back to the declared name, so an empty table is the identity.
///
/// # Example
///
/// ```
/// use modstore_core::NameMap;
///
/// let names = NameMap::new().rename("fetch", "load");
/// assert_eq!(names.resolve("fetch"), "load");
/// assert_eq!(names.resolve("leave"), "leave");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameMap(BTreeMap<String, String>);

impl NameMap {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override, builder style
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.insert(from, to);
        self
    }

    /// Add an override
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    /// Resolve a declared name to its external name
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Whether `name` has an override
    pub fn overrides(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Free-function form of [`NameMap::resolve`]
pub fn resolve<'a>(names: &'a NameMap, name: &'a str) -> &'a str {
    names.resolve(name)
}
