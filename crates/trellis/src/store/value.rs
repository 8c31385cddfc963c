//! Value types and the payload codec.
//!
//! Every stored value is a [`ValueType`] tag plus raw bytes. [`Value`] is the
//! decoded, typed form. The byte layouts are:
//!
//! | Type | Tag | Payload |
//! |---|---|---|
//! | [`ValueType::String`] | 1 | UTF-16LE text, zero-terminated |
//! | [`ValueType::ExpandableString`] | 2 | as `String`, may contain `%NAME%` references |
//! | [`ValueType::Binary`] | 3 | bytes as-is |
//! | [`ValueType::Int32`] | 4 | 4 bytes, little-endian |
//! | [`ValueType::MultiString`] | 7 | zero-terminated UTF-16LE strings, then one more terminator |
//! | [`ValueType::Int64`] | 11 | 8 bytes, little-endian |

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{StoreError, StoreResult};

/// The type tag of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    /// Plain text.
    String,
    /// Text with `%NAME%` references, expanded by the reader.
    ExpandableString,
    /// Arbitrary bytes.
    Binary,
    /// A 32-bit integer.
    Int32,
    /// An ordered list of strings.
    MultiString,
    /// A 64-bit integer.
    Int64,
}

impl ValueType {
    /// Every value type, in tag order.
    pub const ALL: [ValueType; 6] = [
        Self::String,
        Self::ExpandableString,
        Self::Binary,
        Self::Int32,
        Self::MultiString,
        Self::Int64,
    ];

    /// The numeric tag.
    pub fn tag(self) -> u32 {
        match self {
            Self::String => 1,
            Self::ExpandableString => 2,
            Self::Binary => 3,
            Self::Int32 => 4,
            Self::MultiString => 7,
            Self::Int64 => 11,
        }
    }

    /// Look up a type by its numeric tag.
    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.tag() == tag)
    }

    /// Whether the payload is UTF-16 text.
    pub fn is_text(self) -> bool {
        matches!(self, Self::String | Self::ExpandableString | Self::MultiString)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::ExpandableString => "expandable-string",
            Self::Binary => "binary",
            Self::Int32 => "int32",
            Self::MultiString => "multi-string",
            Self::Int64 => "int64",
        };
        f.write_str(name)
    }
}

/// A typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Plain text.
    String(String),
    /// Text with unexpanded `%NAME%` references.
    ExpandableString(String),
    /// Arbitrary bytes.
    Binary(Vec<u8>),
    /// A 32-bit integer.
    Int32(u32),
    /// An ordered list of strings. The strings must not be empty.
    MultiString(Vec<String>),
    /// A 64-bit integer.
    Int64(u64),
}

impl Value {
    /// The type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::ExpandableString(_) => ValueType::ExpandableString,
            Self::Binary(_) => ValueType::Binary,
            Self::Int32(_) => ValueType::Int32,
            Self::MultiString(_) => ValueType::MultiString,
            Self::Int64(_) => ValueType::Int64,
        }
    }

    /// Encode to the raw payload.
    ///
    /// Fails with [`StoreError::Malformed`] for text containing NUL and for
    /// multi-strings containing an empty string, neither of which the
    /// payload format can represent.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let ty = self.value_type();
        match self {
            Self::String(s) | Self::ExpandableString(s) => {
                let mut out = Vec::with_capacity((s.len() + 1) * 2);
                push_utf16z(ty, s, &mut out)?;
                Ok(out)
            }
            Self::MultiString(items) => {
                let mut out = Vec::new();
                for item in items {
                    if item.is_empty() {
                        return Err(StoreError::malformed(
                            ty,
                            "multi-string entries cannot be empty",
                        ));
                    }
                    push_utf16z(ty, item, &mut out)?;
                }
                out.extend_from_slice(&[0, 0]);
                Ok(out)
            }
            Self::Binary(bytes) => Ok(bytes.clone()),
            Self::Int32(n) => Ok(n.to_le_bytes().to_vec()),
            Self::Int64(n) => Ok(n.to_le_bytes().to_vec()),
        }
    }

    /// Decode a raw payload according to its type tag.
    pub fn decode(value_type: ValueType, data: &[u8]) -> StoreResult<Self> {
        match value_type {
            ValueType::String => decode_utf16z(value_type, data).map(Self::String),
            ValueType::ExpandableString => {
                decode_utf16z(value_type, data).map(Self::ExpandableString)
            }
            ValueType::MultiString => decode_multi(data).map(Self::MultiString),
            ValueType::Binary => Ok(Self::Binary(data.to_vec())),
            ValueType::Int32 => {
                let bytes: [u8; 4] = data
                    .try_into()
                    .map_err(|_| wrong_size(value_type, 4, data.len()))?;
                Ok(Self::Int32(u32::from_le_bytes(bytes)))
            }
            ValueType::Int64 => {
                let bytes: [u8; 8] = data
                    .try_into()
                    .map_err(|_| wrong_size(value_type, 8, data.len()))?;
                Ok(Self::Int64(u64::from_le_bytes(bytes)))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Int64(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::MultiString(v)
    }
}

fn push_utf16z(ty: ValueType, s: &str, out: &mut Vec<u8>) -> StoreResult<()> {
    if s.contains('\0') {
        return Err(StoreError::malformed(ty, "text contains a NUL character"));
    }
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    Ok(())
}

fn utf16_units(ty: ValueType, data: &[u8]) -> StoreResult<Vec<u16>> {
    if data.len() % 2 != 0 {
        return Err(StoreError::malformed(ty, format!("odd payload length {}", data.len())));
    }
    Ok(data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

fn units_to_string(ty: ValueType, units: &[u16]) -> StoreResult<String> {
    String::from_utf16(units).map_err(|_| StoreError::malformed(ty, "invalid UTF-16"))
}

fn wrong_size(ty: ValueType, expected: usize, found: usize) -> StoreError {
    StoreError::malformed(ty, format!("expected {expected} bytes, got {found}"))
}

fn decode_utf16z(ty: ValueType, data: &[u8]) -> StoreResult<String> {
    let units = utf16_units(ty, data)?;
    let Some((&0, text)) = units.split_last() else {
        return Err(StoreError::malformed(ty, "missing terminator"));
    };
    if text.contains(&0) {
        return Err(StoreError::malformed(ty, "embedded NUL before terminator"));
    }
    units_to_string(ty, text)
}

fn decode_multi(data: &[u8]) -> StoreResult<Vec<String>> {
    let ty = ValueType::MultiString;
    let units = utf16_units(ty, data)?;
    let Some((&0, body)) = units.split_last() else {
        return Err(StoreError::malformed(ty, "missing list terminator"));
    };
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let Some((&0, entries)) = body.split_last() else {
        return Err(StoreError::malformed(ty, "last entry is not terminated"));
    };
    entries
        .split(|&unit| unit == 0)
        .map(|entry| {
            if entry.is_empty() {
                Err(StoreError::malformed(ty, "empty entry inside list"))
            } else {
                units_to_string(ty, entry)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_malformed(result: StoreResult<Value>, expected: ValueType) {
        match result {
            Err(StoreError::Malformed { value_type, .. }) => assert_eq!(value_type, expected),
            other => panic!("expected malformed {expected}, got {other:?}"),
        }
    }

    #[test]
    fn test_tags() {
        assert_eq!(ValueType::String.tag(), 1);
        assert_eq!(ValueType::ExpandableString.tag(), 2);
        assert_eq!(ValueType::Binary.tag(), 3);
        assert_eq!(ValueType::Int32.tag(), 4);
        assert_eq!(ValueType::MultiString.tag(), 7);
        assert_eq!(ValueType::Int64.tag(), 11);
        assert_eq!(ValueType::from_tag(7), Some(ValueType::MultiString));
        assert_eq!(ValueType::from_tag(5), None);
    }

    #[test]
    fn test_string_layout() {
        let bytes = Value::from("Hi").encode().unwrap();
        assert_eq!(bytes, vec![b'H', 0, b'i', 0, 0, 0]);
    }

    #[test]
    fn test_multi_string_layout() {
        let value = Value::MultiString(vec!["a".into(), "bc".into()]);
        let bytes = value.encode().unwrap();
        assert_eq!(bytes, vec![b'a', 0, 0, 0, b'b', 0, b'c', 0, 0, 0, 0, 0]);
        assert_eq!(Value::decode(ValueType::MultiString, &bytes).unwrap(), value);

        let empty = Value::MultiString(Vec::new());
        assert_eq!(empty.encode().unwrap(), vec![0, 0]);
        assert_eq!(Value::decode(ValueType::MultiString, &[0, 0]).unwrap(), empty);
    }

    #[test]
    fn test_integer_layout() {
        assert_eq!(Value::Int32(0x0403_0201).encode().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(
            Value::decode(ValueType::Int64, &[1, 0, 0, 0, 0, 0, 0, 0x80]).unwrap(),
            Value::Int64(0x8000_0000_0000_0001)
        );
    }

    #[test]
    fn test_non_ascii_text() {
        let value = Value::ExpandableString("Grüße 🌍 %HOME%".into());
        let bytes = value.encode().unwrap();
        assert_eq!(Value::decode(ValueType::ExpandableString, &bytes).unwrap(), value);
    }

    #[test]
    fn test_malformed_payloads() {
        assert_malformed(Value::decode(ValueType::Int32, &[1, 2, 3]), ValueType::Int32);
        assert_malformed(Value::decode(ValueType::Int64, &[0; 4]), ValueType::Int64);
        assert_malformed(Value::decode(ValueType::String, &[b'a', 0, 0]), ValueType::String);
        assert_malformed(Value::decode(ValueType::String, &[b'a', 0]), ValueType::String);
        assert_malformed(Value::decode(ValueType::String, &[]), ValueType::String);
        assert_malformed(
            Value::decode(ValueType::String, &[0x00, 0xD8, 0, 0]),
            ValueType::String,
        );
        assert_malformed(
            Value::decode(ValueType::MultiString, &[b'a', 0, 0, 0]),
            ValueType::MultiString,
        );
        assert_malformed(
            Value::decode(ValueType::MultiString, &[b'a', 0, 0, 0, 0, 0, b'b', 0, 0, 0, 0, 0]),
            ValueType::MultiString,
        );
    }

    #[test]
    fn test_unrepresentable_values() {
        assert_malformed(
            Value::MultiString(vec!["ok".into(), String::new()]).encode().map(Value::Binary),
            ValueType::MultiString,
        );
        assert_malformed(
            Value::from("a\0b").encode().map(Value::Binary),
            ValueType::String,
        );
    }
}
