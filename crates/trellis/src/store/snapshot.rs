//! On-disk snapshot format.
//!
//! A snapshot lists every key once, parents before children, each under its
//! full path. The list stays flat however deep the keys are nested. Values
//! are written in their typed form where the payload decodes, and as `raw`
//! bytes where it does not, so a snapshot never loses data.
//!
//! ```json
//! {
//!   "keys": [
//!     { "path": "", "values": [] },
//!     {
//!       "path": "Software",
//!       "permissions": { "read": true, "write": false },
//!       "values": [
//!         { "name": "Path", "type": "expandable-string", "data": "%HOME%/bin" },
//!         { "name": "Count", "type": "int32", "data": 3 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Keys missing from the list but named inside a listed path are created
//! empty on load. 64-bit integers are written as signed 64-bit numbers with
//! the same bits, since TOML has no unsigned integers.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::access::Permissions;
use super::error::SnapshotError;
use super::value::{Value, ValueType};

/// The whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every key, parents first. The root key has the empty path.
    #[serde(default)]
    pub keys: Vec<KeySnapshot>,
}

/// One key with its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySnapshot {
    /// The full key path, `/`-separated, spelled as the keys were created.
    pub path: String,
    /// Explicit permissions, if the key has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    /// The key's values.
    #[serde(default)]
    pub values: Vec<ValueSnapshot>,
}

/// One value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSnapshot {
    /// The value name. Empty for the default value.
    pub name: String,
    /// The type tag.
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// The typed payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SnapshotData>,
    /// The raw payload, for values whose bytes do not decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Vec<u8>>,
}

/// A typed payload as written in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotData {
    /// String and expandable-string payloads.
    Text(String),
    /// Int32 and int64 payloads.
    Integer(i64),
    /// Multi-string payloads.
    Strings(Vec<String>),
    /// Binary payloads.
    Bytes(Vec<u8>),
}

impl ValueSnapshot {
    /// Capture a stored payload.
    pub fn capture(name: &str, value_type: ValueType, data: &[u8]) -> Self {
        let typed = Value::decode(value_type, data).ok().map(|value| match value {
            Value::String(s) | Value::ExpandableString(s) => SnapshotData::Text(s),
            Value::Int32(n) => SnapshotData::Integer(i64::from(n)),
            Value::Int64(n) => SnapshotData::Integer(n as i64),
            Value::MultiString(items) => SnapshotData::Strings(items),
            Value::Binary(bytes) => SnapshotData::Bytes(bytes),
        });
        let raw = typed.is_none().then(|| data.to_vec());

        Self {
            name: name.to_owned(),
            value_type,
            data: typed,
            raw,
        }
    }

    /// Recover the stored payload bytes.
    pub fn payload(&self) -> Result<Vec<u8>, SnapshotError> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        let Some(data) = &self.data else {
            return Err(self.invalid("neither data nor raw payload"));
        };

        let value = match (self.value_type, data) {
            (ValueType::String, SnapshotData::Text(s)) => Value::String(s.clone()),
            (ValueType::ExpandableString, SnapshotData::Text(s)) => {
                Value::ExpandableString(s.clone())
            }
            (ValueType::Int32, SnapshotData::Integer(n)) => {
                let n = u32::try_from(*n).map_err(|_| self.invalid("int32 out of range"))?;
                Value::Int32(n)
            }
            (ValueType::Int64, SnapshotData::Integer(n)) => Value::Int64(*n as u64),
            (ValueType::MultiString, SnapshotData::Strings(items)) => {
                Value::MultiString(items.clone())
            }
            (ValueType::Binary, SnapshotData::Bytes(bytes)) => Value::Binary(bytes.clone()),
            // An empty array deserializes as the first list variant.
            (ValueType::Binary, SnapshotData::Strings(items)) if items.is_empty() => {
                Value::Binary(Vec::new())
            }
            _ => return Err(self.invalid("data does not match type")),
        };

        value.encode().map_err(|e| self.invalid(&e.to_string()))
    }

    fn invalid(&self, reason: &str) -> SnapshotError {
        SnapshotError::Invalid(format!("value {:?} ({}): {reason}", self.name, self.value_type))
    }
}

/// Snapshot file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// JSON (`serde_json`).
    Json,
    /// TOML (`toml`).
    Toml,
}

impl Snapshot {
    /// Serialize to text.
    pub fn to_text(&self, format: SnapshotFormat) -> Result<String, SnapshotError> {
        Ok(match format {
            SnapshotFormat::Json => serde_json::to_string_pretty(self)?,
            SnapshotFormat::Toml => toml::to_string_pretty(self)?,
        })
    }

    /// Parse from text.
    pub fn from_text(text: &str, format: SnapshotFormat) -> Result<Self, SnapshotError> {
        Ok(match format {
            SnapshotFormat::Json => serde_json::from_str(text)?,
            SnapshotFormat::Toml => toml::from_str(text)?,
        })
    }

    /// Write to `path` atomically: the text goes to a temporary file in the
    /// same directory, which is then renamed over `path`.
    pub fn write_atomic(&self, path: &Path, format: SnapshotFormat) -> Result<(), SnapshotError> {
        let text = self.to_text(format)?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read from `path`.
    pub fn read(path: &Path, format: SnapshotFormat) -> Result<Self, SnapshotError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(&text, format)
    }
}
