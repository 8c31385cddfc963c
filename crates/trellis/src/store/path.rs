//! Key path parsing and naming limits.

use std::fmt;

use super::error::{StoreError, StoreResult};

/// Naming limits enforced by a [`ConfigStore`](super::ConfigStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum length of one key path component, in characters.
    pub max_key_component_len: usize,
    /// Maximum length of a value name, in characters.
    pub max_value_name_len: usize,
    /// Maximum number of components in a key path.
    pub max_depth: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_key_component_len: 255,
            max_value_name_len: 16_383,
            max_depth: 512,
        }
    }
}

impl StoreLimits {
    /// Set the maximum key component length.
    pub fn with_max_key_component_len(mut self, len: usize) -> Self {
        self.max_key_component_len = len;
        self
    }

    /// Set the maximum value name length.
    pub fn with_max_value_name_len(mut self, len: usize) -> Self {
        self.max_value_name_len = len;
        self
    }

    /// Set the maximum key nesting depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub(crate) fn check_value_name(&self, name: &str) -> StoreResult<()> {
        if name.chars().count() > self.max_value_name_len {
            return Err(StoreError::invalid_path(
                name,
                format!("value name longer than {} characters", self.max_value_name_len),
            ));
        }
        Ok(())
    }
}

/// A parsed key path: the components below the root key.
///
/// Both `/` and `\` separate components; empty components are dropped, so
/// `"Software//Vendor/"` and `"\\Software\\Vendor"` name the same key. The
/// empty path names the root key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    components: Vec<String>,
}

impl KeyPath {
    /// Parse and validate a path against `limits`.
    pub fn parse(path: &str, limits: &StoreLimits) -> StoreResult<Self> {
        let components: Vec<String> = path
            .split(['/', '\\'])
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();

        if components.len() > limits.max_depth {
            return Err(StoreError::invalid_path(
                path,
                format!("deeper than {} levels", limits.max_depth),
            ));
        }
        if let Some(long) = components
            .iter()
            .find(|c| c.chars().count() > limits.max_key_component_len)
        {
            return Err(StoreError::invalid_path(
                path,
                format!(
                    "component {long:?} longer than {} characters",
                    limits.max_key_component_len
                ),
            ));
        }

        Ok(Self { components })
    }

    /// The path components, as written.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Whether this is the root key.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.components.len()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.components.join("/"))
    }
}

/// The lookup form of a key or value name.
pub(crate) fn fold(name: &str) -> String {
    name.to_lowercase()
}
