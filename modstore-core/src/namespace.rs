//! Colon-terminated module namespaces

use std::fmt;

use serde::Serialize;

/// Segment terminator
pub const SEPARATOR: char = ':';

/// Prefix shared by every key a module exposes, e.g. `test:list:`.
///
/// The empty namespace is the root. Any other namespace ends with
/// [`SEPARATOR`]; [`Namespace::new`] appends it when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// The root namespace (empty prefix)
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Create a namespace, terminating it with `:` if needed
    pub fn new(namespace: impl Into<String>) -> Self {
        let mut namespace = namespace.into();
        if !namespace.is_empty() && !namespace.ends_with(SEPARATOR) {
            namespace.push(SEPARATOR);
        }
        Self(namespace)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix a member name: `test:` + `updateName` -> `test:updateName`
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// Namespace of a nested module: `test:` + `list` -> `test:list:`
    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}{}{}", self.0, segment, SEPARATOR))
    }

    /// Namespace without its terminator, used as the registration key
    pub fn trimmed(&self) -> &str {
        self.0.strip_suffix(SEPARATOR).unwrap_or(&self.0)
    }

    /// Whether `key` carries this namespace as its prefix
    pub fn owns(&self, key: &str) -> bool {
        key.starts_with(&self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
