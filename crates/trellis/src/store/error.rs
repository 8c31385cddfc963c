//! Error types for the configuration store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::value::ValueType;

/// Errors returned by [`ConfigStore`](super::ConfigStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key or value does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The key path, or `key/value` for a missing value.
        path: String,
    },

    /// The value exists but holds a different type than requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the caller asked for.
        expected: ValueType,
        /// The type actually stored.
        found: ValueType,
    },

    /// The key's permissions forbid the operation.
    #[error("access denied: {path}")]
    AccessDenied {
        /// The key path.
        path: String,
    },

    /// A payload does not match its type tag.
    #[error("malformed {value_type} payload: {reason}")]
    Malformed {
        /// The type tag the payload claims.
        value_type: ValueType,
        /// What is wrong with it.
        reason: String,
    },

    /// A key path or value name breaks the naming rules or limits.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The offending path or name.
        path: String,
        /// Which rule was broken.
        reason: String,
    },

    /// The key cannot be deleted because it still has subkeys.
    #[error("key has subkeys: {path}")]
    HasSubkeys {
        /// The key path.
        path: String,
    },

    /// Saving or loading a snapshot failed.
    #[error("snapshot {path}: {source}")]
    Persistence {
        /// The snapshot file.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: SnapshotError,
    },
}

impl StoreError {
    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn access_denied(path: impl Into<String>) -> Self {
        Self::AccessDenied { path: path.into() }
    }

    pub(crate) fn malformed(value_type: ValueType, reason: impl Into<String>) -> Self {
        Self::Malformed {
            value_type,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// The cause of a [`StoreError::Persistence`] failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Reading or writing the file failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The JSON document could not be produced or parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The TOML document could not be produced.
    #[error("toml serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The TOML document could not be parsed.
    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The document parsed but its contents are not a valid store.
    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
