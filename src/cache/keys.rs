//! Storage Key Module
//!
//! Namespacing, composite-key serialization and wildcard pattern matching.

use std::fmt;
use std::str::FromStr;

/// Suffix marking an eviction key as a wildcard pattern.
pub const WILDCARD_SUFFIX: &str = ":*";

// == Key Matching ==
/// How namespace filtering and wildcard eviction compare keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMatching {
    /// Keys must start with the namespaced prefix
    #[default]
    Prefix,
    /// Keys only need to contain the namespace/prefix anywhere (legacy behaviour)
    Substring,
}

impl KeyMatching {
    fn matches(self, candidate: &str, needle: &str) -> bool {
        match self {
            KeyMatching::Prefix => candidate.starts_with(needle),
            KeyMatching::Substring => candidate.contains(needle),
        }
    }
}

impl FromStr for KeyMatching {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" => Ok(KeyMatching::Prefix),
            "substring" => Ok(KeyMatching::Substring),
            other => Err(format!("unknown key matching mode: {}", other)),
        }
    }
}

impl fmt::Display for KeyMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMatching::Prefix => write!(f, "prefix"),
            KeyMatching::Substring => write!(f, "substring"),
        }
    }
}

// == Key Builder ==
/// Builds storage keys for one namespace.
///
/// Cloned into every strategy at init time so they can derive the same
/// storage keys the engine does.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    namespace: String,
    /// `"{namespace}:"`
    prefix: String,
    matching: KeyMatching,
}

impl KeyBuilder {
    pub fn new(namespace: impl Into<String>, matching: KeyMatching) -> Self {
        let namespace = namespace.into();
        let prefix = format!("{}:", namespace);
        Self {
            namespace,
            prefix,
            matching,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn matching(&self) -> KeyMatching {
        self.matching
    }

    // == Create Storage Key ==
    /// Prefixes `key` with the namespace unless it already carries it.
    pub fn storage_key(&self, key: &str) -> String {
        if self.matching.matches(key, &self.prefix) {
            key.to_string()
        } else {
            format!("{}{}", self.prefix, key)
        }
    }

    /// Returns true if `storage_key` belongs to this namespace.
    pub fn owns(&self, storage_key: &str) -> bool {
        match self.matching {
            KeyMatching::Prefix => storage_key.starts_with(&self.prefix),
            KeyMatching::Substring => storage_key.contains(&self.namespace),
        }
    }

    // == Wildcard Patterns ==
    /// Returns the namespaced search key if `key` is a wildcard pattern.
    ///
    /// `"user:*"` becomes `"{namespace}:user"`.
    pub fn pattern_prefix(&self, key: &str) -> Option<String> {
        key.strip_suffix(WILDCARD_SUFFIX)
            .map(|search| self.storage_key(search))
    }

    /// Returns true if `storage_key` is selected by a namespaced pattern prefix.
    pub fn pattern_matches(&self, storage_key: &str, pattern_prefix: &str) -> bool {
        self.matching.matches(storage_key, pattern_prefix)
    }
}

// == Serialize Item Keys ==
/// Joins `base` with each already-serialized argument using `_`, in order.
pub fn serialize_item_keys<S: AsRef<str>>(base: &str, args: &[S]) -> String {
    let mut key = base.to_string();
    for arg in args {
        key.push('_');
        key.push_str(arg.as_ref());
    }
    key
}
