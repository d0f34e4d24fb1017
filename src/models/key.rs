use crate::error::RuntimeError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static KEY_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_.-]+$").unwrap());

/// A namespaced string identifier, e.g. `blocks:stone_block`. Both parts
/// are restricted to `[a-z0-9_.-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespacedKey {
    namespace: String,
    name: String,
}

impl NamespacedKey {
    pub fn new(namespace: &str, name: &str) -> Result<Self, RuntimeError> {
        if !KEY_PART.is_match(namespace) {
            return Err(RuntimeError::InvalidKey(format!(
                "bad namespace: {namespace:?}"
            )));
        }
        if !KEY_PART.is_match(name) {
            return Err(RuntimeError::InvalidKey(format!("bad name: {name:?}")));
        }

        Ok(Self {
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Shorthand for keys in the runtime's own `core` namespace.
    pub fn core(name: &str) -> Result<Self, RuntimeError> {
        Self::new("core", name)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl core::fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl core::str::FromStr for NamespacedKey {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((ns, name)) => Self::new(ns, name),
            None => Err(RuntimeError::InvalidKey(format!(
                "expected namespace:name, got {s:?}"
            ))),
        }
    }
}

impl TryFrom<String> for NamespacedKey {
    type Error = RuntimeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<&str> for NamespacedKey {
    type Error = RuntimeError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NamespacedKey> for String {
    fn from(k: NamespacedKey) -> String {
        k.to_string()
    }
}
