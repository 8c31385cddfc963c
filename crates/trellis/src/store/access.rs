//! Per-key access control.

use serde::{Deserialize, Serialize};

/// What may be done with a key's values and subkeys.
///
/// A key without explicit permissions inherits them from its nearest
/// ancestor that has some. The root key defaults to [`Permissions::READ_WRITE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    /// Values and subkeys may be read.
    pub read: bool,
    /// Values and subkeys may be created, changed, and deleted.
    pub write: bool,
}

impl Permissions {
    /// Full access.
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
    };

    /// Reads only.
    pub const READ_ONLY: Self = Self {
        read: true,
        write: false,
    };

    /// No access.
    pub const NONE: Self = Self {
        read: false,
        write: false,
    };
}

impl Default for Permissions {
    fn default() -> Self {
        Self::READ_WRITE
    }
}

/// The kind of access an operation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
}

impl Access {
    pub(crate) fn allowed_by(self, permissions: Permissions) -> bool {
        match self {
            Self::Read => permissions.read,
            Self::Write => permissions.write,
        }
    }
}
