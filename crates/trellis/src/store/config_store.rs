//! The hierarchical key/value store.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use trellis_core::{PerfSpan, Signal};
use trellis_core::logging::{span_names, targets};

use super::access::{Access, Permissions};
use super::error::{SnapshotError, StoreError, StoreResult};
use super::expand::{Environment, expand};
use super::path::{KeyPath, StoreLimits, fold};
use super::snapshot::{KeySnapshot, Snapshot, SnapshotFormat, ValueSnapshot};
use super::value::{Value, ValueType};

/// The untyped form of a stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    /// The type tag.
    pub value_type: ValueType,
    /// The payload bytes.
    pub data: Vec<u8>,
}

/// A value listed by [`ConfigStore::values`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueInfo {
    /// The value name as written. Empty for the default value.
    pub name: String,
    /// The type tag.
    pub value_type: ValueType,
}

#[derive(Debug, Clone)]
struct StoredValue {
    name: String,
    value_type: ValueType,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct KeyNode {
    name: String,
    permissions: Option<Permissions>,
    /// Keyed by folded name.
    values: BTreeMap<String, StoredValue>,
    /// Keyed by folded name.
    subkeys: BTreeMap<String, KeyNode>,
}

impl KeyNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Append this key and its subkeys, parents first.
    fn to_snapshot(&self, path: &str, out: &mut Vec<KeySnapshot>) {
        out.push(KeySnapshot {
            path: path.to_owned(),
            permissions: self.permissions,
            values: self
                .values
                .values()
                .map(|v| ValueSnapshot::capture(&v.name, v.value_type, &v.data))
                .collect(),
        });
        for sub in self.subkeys.values() {
            let sub_path = if path.is_empty() {
                sub.name.clone()
            } else {
                format!("{path}/{}", sub.name)
            };
            sub.to_snapshot(&sub_path, out);
        }
    }

    /// Rebuild a key tree from a flat snapshot.
    fn from_snapshot(snapshot: &Snapshot, limits: &StoreLimits) -> Result<Self, SnapshotError> {
        let mut root = KeyNode::default();
        let mut listed = HashSet::new();

        for entry in &snapshot.keys {
            let key = KeyPath::parse(&entry.path, limits)
                .map_err(|e| SnapshotError::Invalid(e.to_string()))?;
            let folded: Vec<String> = key.components().iter().map(|c| fold(c)).collect();
            if !listed.insert(folded.join("/")) {
                return Err(SnapshotError::Invalid(format!("duplicate key {:?}", entry.path)));
            }

            let mut node = &mut root;
            for component in key.components() {
                node = node
                    .subkeys
                    .entry(fold(component))
                    .or_insert_with(|| KeyNode::named(component));
            }
            node.permissions = entry.permissions;

            for value in &entry.values {
                limits
                    .check_value_name(&value.name)
                    .map_err(|e| SnapshotError::Invalid(e.to_string()))?;
                let stored = StoredValue {
                    name: value.name.clone(),
                    value_type: value.value_type,
                    data: value.payload()?,
                };
                if node.values.insert(fold(&value.name), stored).is_some() {
                    return Err(SnapshotError::Invalid(format!(
                        "duplicate value {:?} in key {:?}",
                        value.name, entry.path
                    )));
                }
            }
        }

        Ok(root)
    }
}

/// A thread-safe hierarchical store of typed values.
///
/// Keys form a tree below an unnamed root key and are addressed by
/// slash-separated paths. Each key holds named values; the empty name is the
/// key's default value. Key and value names compare case-insensitively and
/// keep the case they were created with.
///
/// # Example
///
/// ```
/// use trellis::store::{ConfigStore, MapEnvironment, Value};
///
/// let store = ConfigStore::new();
/// store.create_key("Software/Trellis").unwrap();
/// store.set_value("Software/Trellis", "Retries", Value::Int32(3)).unwrap();
/// store
///     .set_value("software/trellis", "Cache", Value::ExpandableString("%HOME%/cache".into()))
///     .unwrap();
///
/// assert_eq!(store.get_u32("SOFTWARE/Trellis", "retries").unwrap(), 3);
///
/// // The stored text keeps the reference; expansion happens on read.
/// assert_eq!(store.get_expandable("Software/Trellis", "Cache").unwrap(), "%HOME%/cache");
/// let env = MapEnvironment::new().with("HOME", "/home/ada");
/// assert_eq!(
///     store.get_expanded("Software/Trellis", "Cache", &env).unwrap(),
///     "/home/ada/cache"
/// );
/// ```
pub struct ConfigStore {
    root: RwLock<KeyNode>,
    limits: StoreLimits,
    changed: Signal<String>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Create an empty store with default limits.
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    /// Create an empty store with custom limits.
    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            root: RwLock::new(KeyNode::default()),
            limits,
            changed: Signal::new(),
        }
    }

    /// The naming limits in force.
    pub fn limits(&self) -> &StoreLimits {
        &self.limits
    }

    /// Emitted with the key path after every successful change.
    pub fn changed(&self) -> &Signal<String> {
        &self.changed
    }

    // ========================================================================
    // Keys
    // ========================================================================

    /// Create a key and any missing ancestors.
    ///
    /// Returns `true` if anything was created. Creating keys needs write
    /// access where they are added.
    pub fn create_key(&self, path: &str) -> StoreResult<bool> {
        let key = self.parse(path)?;
        let created = {
            let mut root = self.root.write();
            let mut node = &mut *root;
            let mut effective = node.permissions.unwrap_or_default();
            let mut created = false;

            for (depth, component) in key.components().iter().enumerate() {
                let folded = fold(component);
                if !node.subkeys.contains_key(&folded) {
                    if !effective.write {
                        return Err(StoreError::access_denied(prefix(&key, depth)));
                    }
                    node.subkeys.insert(folded.clone(), KeyNode::named(component));
                    created = true;
                }
                node = node
                    .subkeys
                    .get_mut(&folded)
                    .ok_or_else(|| StoreError::not_found(prefix(&key, depth + 1)))?;
                effective = node.permissions.unwrap_or(effective);
            }
            created.then(|| canonical_path(&root, &key))
        };

        if let Some(key) = &created {
            tracing::debug!(target: targets::STORE, %key, "key created");
            self.changed.emit(key.clone());
        }
        Ok(created.is_some())
    }

    /// Check whether a key exists.
    pub fn key_exists(&self, path: &str) -> StoreResult<bool> {
        let key = self.parse(path)?;
        let root = self.root.read();
        Ok(find(&root, &key).is_some())
    }

    /// Delete a key that has no subkeys, along with its values.
    pub fn delete_key(&self, path: &str) -> StoreResult<()> {
        self.remove_key(path, false)
    }

    /// Delete a key with all its subkeys and values.
    pub fn delete_tree(&self, path: &str) -> StoreResult<()> {
        self.remove_key(path, true)
    }

    /// Names of a key's direct subkeys, as written.
    pub fn subkeys(&self, path: &str) -> StoreResult<Vec<String>> {
        self.with_key(path, Access::Read, |node| {
            Ok(node.subkeys.values().map(|k| k.name.clone()).collect())
        })
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Store a typed value, replacing any value of the same name.
    pub fn set_value(&self, path: &str, name: &str, value: Value) -> StoreResult<()> {
        let data = value.encode()?;
        self.set_raw(path, name, value.value_type(), data)
    }

    /// Store a payload under a type tag without checking that it decodes.
    pub fn set_raw(
        &self,
        path: &str,
        name: &str,
        value_type: ValueType,
        data: Vec<u8>,
    ) -> StoreResult<()> {
        self.limits.check_value_name(name)?;
        let key = self.with_key_mut(path, |node, key| {
            node.values.insert(
                fold(name),
                StoredValue {
                    name: name.to_owned(),
                    value_type,
                    data,
                },
            );
            tracing::debug!(
                target: targets::STORE,
                key = %key,
                value = name,
                %value_type,
                "value set"
            );
            Ok(())
        })?;
        self.changed.emit(key);
        Ok(())
    }

    /// Read a value in its typed form.
    pub fn get_value(&self, path: &str, name: &str) -> StoreResult<Value> {
        let raw = self.get_raw(path, name)?;
        Value::decode(raw.value_type, &raw.data)
    }

    /// Read a value's type tag and payload.
    pub fn get_raw(&self, path: &str, name: &str) -> StoreResult<RawValue> {
        self.with_value(path, name, |value| RawValue {
            value_type: value.value_type,
            data: value.data.clone(),
        })
    }

    /// The type tag of a value.
    pub fn value_type(&self, path: &str, name: &str) -> StoreResult<ValueType> {
        self.with_value(path, name, |value| value.value_type)
    }

    /// Read a [`ValueType::String`] value.
    pub fn get_string(&self, path: &str, name: &str) -> StoreResult<String> {
        match self.get_typed(path, name, ValueType::String)? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(ValueType::String, &other)),
        }
    }

    /// Read a [`ValueType::ExpandableString`] value without expanding it.
    pub fn get_expandable(&self, path: &str, name: &str) -> StoreResult<String> {
        match self.get_typed(path, name, ValueType::ExpandableString)? {
            Value::ExpandableString(s) => Ok(s),
            other => Err(mismatch(ValueType::ExpandableString, &other)),
        }
    }

    /// Read a string value with `%NAME%` references expanded from `env`.
    ///
    /// Expandable strings are expanded. Plain strings are returned as
    /// stored, since they carry no references.
    pub fn get_expanded(
        &self,
        path: &str,
        name: &str,
        env: &dyn Environment,
    ) -> StoreResult<String> {
        match self.get_value(path, name)? {
            Value::ExpandableString(s) => Ok(expand(&s, env)),
            Value::String(s) => Ok(s),
            other => Err(mismatch(ValueType::ExpandableString, &other)),
        }
    }

    /// Read a [`ValueType::Int32`] value.
    pub fn get_u32(&self, path: &str, name: &str) -> StoreResult<u32> {
        match self.get_typed(path, name, ValueType::Int32)? {
            Value::Int32(n) => Ok(n),
            other => Err(mismatch(ValueType::Int32, &other)),
        }
    }

    /// Read a [`ValueType::Int64`] value.
    pub fn get_u64(&self, path: &str, name: &str) -> StoreResult<u64> {
        match self.get_typed(path, name, ValueType::Int64)? {
            Value::Int64(n) => Ok(n),
            other => Err(mismatch(ValueType::Int64, &other)),
        }
    }

    /// Read a [`ValueType::Binary`] value.
    pub fn get_binary(&self, path: &str, name: &str) -> StoreResult<Vec<u8>> {
        match self.get_typed(path, name, ValueType::Binary)? {
            Value::Binary(bytes) => Ok(bytes),
            other => Err(mismatch(ValueType::Binary, &other)),
        }
    }

    /// Read a [`ValueType::MultiString`] value.
    pub fn get_multi_string(&self, path: &str, name: &str) -> StoreResult<Vec<String>> {
        match self.get_typed(path, name, ValueType::MultiString)? {
            Value::MultiString(items) => Ok(items),
            other => Err(mismatch(ValueType::MultiString, &other)),
        }
    }

    /// Delete a value.
    pub fn delete_value(&self, path: &str, name: &str) -> StoreResult<()> {
        let key = self.with_key_mut(path, |node, key| {
            node.values
                .remove(&fold(name))
                .ok_or_else(|| StoreError::not_found(value_path(key, name)))?;
            tracing::debug!(target: targets::STORE, key = %key, value = name, "value deleted");
            Ok(())
        })?;
        self.changed.emit(key);
        Ok(())
    }

    /// Names and types of a key's values.
    pub fn values(&self, path: &str) -> StoreResult<Vec<ValueInfo>> {
        self.with_key(path, Access::Read, |node| {
            Ok(node
                .values
                .values()
                .map(|v| ValueInfo {
                    name: v.name.clone(),
                    value_type: v.value_type,
                })
                .collect())
        })
    }

    // ========================================================================
    // Permissions
    // ========================================================================

    /// Set or clear a key's explicit permissions.
    ///
    /// With `None` the key inherits from its nearest ancestor again. Changing
    /// permissions is not itself subject to access checks.
    pub fn set_permissions(&self, path: &str, permissions: Option<Permissions>) -> StoreResult<()> {
        let key = self.parse(path)?;
        let canonical = {
            let mut root = self.root.write();
            let node = find_mut(&mut root, &key)
                .ok_or_else(|| StoreError::not_found(key.to_string()))?;
            node.permissions = permissions;
            canonical_path(&root, &key)
        };
        tracing::debug!(
            target: targets::STORE,
            key = %canonical,
            ?permissions,
            "permissions changed"
        );
        self.changed.emit(canonical);
        Ok(())
    }

    /// The permissions in effect for a key.
    pub fn permissions(&self, path: &str) -> StoreResult<Permissions> {
        let key = self.parse(path)?;
        let root = self.root.read();
        resolve(&root, &key)
            .map(|(_, effective)| effective)
            .ok_or_else(|| StoreError::not_found(key.to_string()))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Capture the whole store.
    pub fn snapshot(&self) -> Snapshot {
        let mut keys = Vec::new();
        self.root.read().to_snapshot("", &mut keys);
        Snapshot { keys }
    }

    /// Build a store from a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, limits: StoreLimits) -> Result<Self, SnapshotError> {
        let root = KeyNode::from_snapshot(snapshot, &limits)?;
        Ok(Self {
            root: RwLock::new(root),
            limits,
            changed: Signal::new(),
        })
    }

    /// Save the store to a JSON file.
    ///
    /// The file is written atomically using a temporary file and rename.
    pub fn save_json(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        self.save(path.as_ref(), SnapshotFormat::Json)
    }

    /// Save the store to a TOML file.
    ///
    /// The file is written atomically using a temporary file and rename.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        self.save(path.as_ref(), SnapshotFormat::Toml)
    }

    /// Load a store with default limits from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::load(path.as_ref(), SnapshotFormat::Json, StoreLimits::default())
    }

    /// Load a store with default limits from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::load(path.as_ref(), SnapshotFormat::Toml, StoreLimits::default())
    }

    /// Load a store from a JSON file, checking it against `limits`.
    pub fn load_json_with_limits(path: impl AsRef<Path>, limits: StoreLimits) -> StoreResult<Self> {
        Self::load(path.as_ref(), SnapshotFormat::Json, limits)
    }

    /// Load a store from a TOML file, checking it against `limits`.
    pub fn load_toml_with_limits(path: impl AsRef<Path>, limits: StoreLimits) -> StoreResult<Self> {
        Self::load(path.as_ref(), SnapshotFormat::Toml, limits)
    }

    fn save(&self, path: &Path, format: SnapshotFormat) -> StoreResult<()> {
        let _span = tracing::debug_span!(target: targets::STORE, span_names::PERSISTENCE, ?format)
            .entered();
        let _perf = PerfSpan::new("store_save");
        self.snapshot()
            .write_atomic(path, format)
            .map_err(|source| persistence_failed(path, source))?;
        tracing::debug!(target: targets::STORE, path = %path.display(), "store saved");
        Ok(())
    }

    fn load(path: &Path, format: SnapshotFormat, limits: StoreLimits) -> StoreResult<Self> {
        let _span = tracing::debug_span!(target: targets::STORE, span_names::PERSISTENCE, ?format)
            .entered();
        let _perf = PerfSpan::new("store_load");
        let store = Snapshot::read(path, format)
            .and_then(|snapshot| Self::from_snapshot(&snapshot, limits))
            .map_err(|source| persistence_failed(path, source))?;
        tracing::debug!(target: targets::STORE, path = %path.display(), "store loaded");
        Ok(store)
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn parse(&self, path: &str) -> StoreResult<KeyPath> {
        KeyPath::parse(path, &self.limits)
    }

    fn remove_key(&self, path: &str, recursive: bool) -> StoreResult<()> {
        let key = self.parse(path)?;
        let Some((last, parent_components)) = key.components().split_last() else {
            return Err(StoreError::invalid_path(path, "the root key cannot be deleted"));
        };

        let canonical = {
            let mut root = self.root.write();
            let (node, effective) =
                resolve(&root, &key).ok_or_else(|| StoreError::not_found(key.to_string()))?;
            if !effective.write {
                return Err(StoreError::access_denied(key.to_string()));
            }
            if !recursive && !node.subkeys.is_empty() {
                return Err(StoreError::HasSubkeys { path: key.to_string() });
            }
            let canonical = canonical_path(&root, &key);

            let parent = parent_components
                .iter()
                .try_fold(&mut *root, |node, component| node.subkeys.get_mut(&fold(component)))
                .ok_or_else(|| StoreError::not_found(key.to_string()))?;
            parent.subkeys.remove(&fold(last));
            canonical
        };

        tracing::debug!(target: targets::STORE, key = %canonical, recursive, "key deleted");
        self.changed.emit(canonical);
        Ok(())
    }

    /// Run `f` on an existing key after checking `access`.
    fn with_key<T>(
        &self,
        path: &str,
        access: Access,
        f: impl FnOnce(&KeyNode) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let key = self.parse(path)?;
        let root = self.root.read();
        let (node, effective) =
            resolve(&root, &key).ok_or_else(|| StoreError::not_found(key.to_string()))?;
        if !access.allowed_by(effective) {
            tracing::debug!(target: targets::STORE, key = %key, ?access, "access denied");
            return Err(StoreError::access_denied(key.to_string()));
        }
        f(node)
    }

    /// Run `f` on an existing, writable key. Returns the key path for the
    /// change notification, which callers emit after the lock is released.
    fn with_key_mut(
        &self,
        path: &str,
        f: impl FnOnce(&mut KeyNode, &str) -> StoreResult<()>,
    ) -> StoreResult<String> {
        let key = self.parse(path)?;
        let key_display = key.to_string();
        let mut root = self.root.write();
        let writable = resolve(&root, &key)
            .ok_or_else(|| StoreError::not_found(key_display.clone()))?
            .1
            .write;
        if !writable {
            tracing::debug!(target: targets::STORE, key = %key, "write denied");
            return Err(StoreError::access_denied(key_display));
        }
        let canonical = canonical_path(&root, &key);
        let node = find_mut(&mut root, &key).ok_or_else(|| StoreError::not_found(key_display))?;
        f(node, &canonical)?;
        Ok(canonical)
    }

    fn with_value<T>(
        &self,
        path: &str,
        name: &str,
        f: impl FnOnce(&StoredValue) -> T,
    ) -> StoreResult<T> {
        let key = self.parse(path)?;
        self.with_key(path, Access::Read, |node| {
            node.values
                .get(&fold(name))
                .map(f)
                .ok_or_else(|| StoreError::not_found(value_path(&key.to_string(), name)))
        })
    }

    fn get_typed(&self, path: &str, name: &str, expected: ValueType) -> StoreResult<Value> {
        let raw = self.get_raw(path, name)?;
        if raw.value_type != expected {
            return Err(StoreError::TypeMismatch {
                expected,
                found: raw.value_type,
            });
        }
        Value::decode(raw.value_type, &raw.data)
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("limits", &self.limits)
            .field("subkeys", &self.root.read().subkeys.len())
            .finish_non_exhaustive()
    }
}

/// A shareable store handle.
pub type SharedConfigStore = Arc<ConfigStore>;

fn find<'a>(root: &'a KeyNode, key: &KeyPath) -> Option<&'a KeyNode> {
    key.components()
        .iter()
        .try_fold(root, |node, component| node.subkeys.get(&fold(component)))
}

fn find_mut<'a>(root: &'a mut KeyNode, key: &KeyPath) -> Option<&'a mut KeyNode> {
    key.components()
        .iter()
        .try_fold(root, |node, component| node.subkeys.get_mut(&fold(component)))
}

/// Find a key along with the permissions in effect for it.
fn resolve<'a>(root: &'a KeyNode, key: &KeyPath) -> Option<(&'a KeyNode, Permissions)> {
    let start = (root, root.permissions.unwrap_or_default());
    key.components().iter().try_fold(start, |(node, effective), component| {
        let child = node.subkeys.get(&fold(component))?;
        Some((child, child.permissions.unwrap_or(effective)))
    })
}

/// The path of an existing key spelled with the names it was created with.
fn canonical_path(root: &KeyNode, key: &KeyPath) -> String {
    let mut names = Vec::with_capacity(key.depth());
    let mut node = root;
    for component in key.components() {
        match node.subkeys.get(&fold(component)) {
            Some(child) => {
                names.push(child.name.as_str());
                node = child;
            }
            None => names.push(component.as_str()),
        }
    }
    names.join("/")
}

fn prefix(key: &KeyPath, len: usize) -> String {
    key.components()[..len].join("/")
}

fn value_path(key: &str, name: &str) -> String {
    let name = if name.is_empty() { "(default)" } else { name };
    if key.is_empty() {
        name.to_owned()
    } else {
        format!("{key}/{name}")
    }
}

fn mismatch(expected: ValueType, found: &Value) -> StoreError {
    StoreError::TypeMismatch {
        expected,
        found: found.value_type(),
    }
}

fn persistence_failed(path: &Path, source: SnapshotError) -> StoreError {
    tracing::error!(
        target: targets::STORE,
        path = %path.display(),
        error = %source,
        "snapshot persistence failed"
    );
    StoreError::Persistence {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::expand::MapEnvironment;
    use parking_lot::Mutex;

    fn store_with_app() -> ConfigStore {
        let store = ConfigStore::new();
        store.create_key("Software/Vendor/App").unwrap();
        store
    }

    #[test]
    fn test_every_type_reads_back() {
        let store = store_with_app();
        let key = "Software/Vendor/App";

        store.set_value(key, "Name", Value::from("Trellis")).unwrap();
        store
            .set_value(key, "Home", Value::ExpandableString("%HOME%/trellis".into()))
            .unwrap();
        store.set_value(key, "Blob", Value::Binary(vec![0, 1, 254, 255])).unwrap();
        store.set_value(key, "Count", Value::Int32(0xDEAD_BEEF)).unwrap();
        store.set_value(key, "Big", Value::Int64(u64::MAX)).unwrap();
        store
            .set_value(key, "Paths", Value::MultiString(vec!["a".into(), "b c".into()]))
            .unwrap();

        assert_eq!(store.get_string(key, "Name").unwrap(), "Trellis");
        assert_eq!(store.get_expandable(key, "Home").unwrap(), "%HOME%/trellis");
        assert_eq!(store.get_binary(key, "Blob").unwrap(), vec![0, 1, 254, 255]);
        assert_eq!(store.get_u32(key, "Count").unwrap(), 0xDEAD_BEEF);
        assert_eq!(store.get_u64(key, "Big").unwrap(), u64::MAX);
        assert_eq!(store.get_multi_string(key, "Paths").unwrap(), vec!["a", "b c"]);
        assert_eq!(store.value_type(key, "Paths").unwrap(), ValueType::MultiString);
    }

    #[test]
    fn test_names_are_case_insensitive_and_preserved() {
        let store = store_with_app();
        store.set_value("software/VENDOR/app", "Theme", Value::from("dark")).unwrap();
        store.set_value("Software/Vendor/App", "THEME", Value::from("light")).unwrap();

        assert_eq!(store.get_string("SOFTWARE/vendor/APP", "theme").unwrap(), "light");
        assert_eq!(store.subkeys("software/vendor").unwrap(), vec!["App"]);

        // Replacing a value keeps the latest spelling.
        let values = store.values("Software/Vendor/App").unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].name, "THEME");
    }

    #[test]
    fn test_default_value() {
        let store = store_with_app();
        store.set_value("Software/Vendor/App", "", Value::from("fallback")).unwrap();

        assert_eq!(store.get_string("Software/Vendor/App", "").unwrap(), "fallback");
        assert_eq!(store.values("Software/Vendor/App").unwrap()[0].name, "");
    }

    #[test]
    fn test_create_key_reports_creation() {
        let store = ConfigStore::new();
        assert!(store.create_key("A/B").unwrap());
        assert!(!store.create_key("a/b").unwrap());
        assert!(store.create_key("A/B/C").unwrap());
        assert!(store.key_exists("a/B/c").unwrap());
        assert!(!store.key_exists("A/X").unwrap());
        assert!(store.key_exists("").unwrap());
    }

    #[test]
    fn test_not_found() {
        let store = store_with_app();

        let err = store.get_string("Software/Vendor/App", "Missing").unwrap_err();
        match err {
            StoreError::NotFound { path } => assert_eq!(path, "Software/Vendor/App/Missing"),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            store.get_string("Software/Nobody", "x"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.set_value("Software/Nobody", "x", Value::Int32(1)),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_value("Software/Vendor/App", "x"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(store.delete_key("Nope"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_missing_default_value_path() {
        let store = store_with_app();
        match store.get_raw("Software", "").unwrap_err() {
            StoreError::NotFound { path } => assert_eq!(path, "Software/(default)"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_type_mismatch() {
        let store = store_with_app();
        store.set_value("Software/Vendor/App", "Count", Value::Int32(3)).unwrap();

        match store.get_string("Software/Vendor/App", "Count").unwrap_err() {
            StoreError::TypeMismatch { expected, found } => {
                assert_eq!(expected, ValueType::String);
                assert_eq!(found, ValueType::Int32);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            store.get_u64("Software/Vendor/App", "Count"),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_payload() {
        let store = store_with_app();
        store
            .set_raw("Software/Vendor/App", "Short", ValueType::Int32, vec![1, 2, 3])
            .unwrap();

        // The raw bytes are still readable.
        let raw = store.get_raw("Software/Vendor/App", "Short").unwrap();
        assert_eq!(raw.data, vec![1, 2, 3]);

        assert!(matches!(
            store.get_u32("Software/Vendor/App", "Short"),
            Err(StoreError::Malformed {
                value_type: ValueType::Int32,
                ..
            })
        ));
        assert!(matches!(
            store.get_value("Software/Vendor/App", "Short"),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_expanded_read() {
        let store = store_with_app();
        let key = "Software/Vendor/App";
        store
            .set_value(key, "Cache", Value::ExpandableString("%LOCALAPPDATA%\\Cache".into()))
            .unwrap();
        store.set_value(key, "Plain", Value::from("%LOCALAPPDATA%")).unwrap();
        store.set_value(key, "Count", Value::Int32(1)).unwrap();

        let env = MapEnvironment::new().with("LocalAppData", "C:\\Users\\ada\\AppData\\Local");

        assert_eq!(
            store.get_expanded(key, "Cache", &env).unwrap(),
            "C:\\Users\\ada\\AppData\\Local\\Cache"
        );
        assert_eq!(store.get_expanded(key, "Plain", &env).unwrap(), "%LOCALAPPDATA%");
        assert!(matches!(
            store.get_expanded(key, "Count", &env),
            Err(StoreError::TypeMismatch { .. })
        ));
        assert!(matches!(
            store.get_string(key, "Cache"),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_read_only_key_denies_writes() {
        let store = store_with_app();
        store.set_value("Software/Vendor", "Keep", Value::Int32(1)).unwrap();
        store
            .set_permissions("Software/Vendor", Some(Permissions::READ_ONLY))
            .unwrap();

        assert!(matches!(
            store.set_value("Software/Vendor", "Keep", Value::Int32(2)),
            Err(StoreError::AccessDenied { .. })
        ));
        assert!(matches!(
            store.delete_value("Software/Vendor", "Keep"),
            Err(StoreError::AccessDenied { .. })
        ));
        // Inherited by subkeys.
        assert!(matches!(
            store.set_value("Software/Vendor/App", "x", Value::Int32(2)),
            Err(StoreError::AccessDenied { .. })
        ));
        assert!(matches!(
            store.create_key("Software/Vendor/Other"),
            Err(StoreError::AccessDenied { .. })
        ));
        assert!(matches!(
            store.delete_tree("Software/Vendor"),
            Err(StoreError::AccessDenied { .. })
        ));

        // Reads still work, and creating an existing key changes nothing.
        assert_eq!(store.get_u32("Software/Vendor", "Keep").unwrap(), 1);
        assert!(!store.create_key("Software/Vendor/App").unwrap());
    }

    #[test]
    fn test_permission_override_and_reset() {
        let store = store_with_app();
        store.set_permissions("Software", Some(Permissions::READ_ONLY)).unwrap();
        store
            .set_permissions("Software/Vendor/App", Some(Permissions::READ_WRITE))
            .unwrap();

        assert_eq!(store.permissions("Software/Vendor").unwrap(), Permissions::READ_ONLY);
        assert_eq!(
            store.permissions("Software/Vendor/App").unwrap(),
            Permissions::READ_WRITE
        );
        store.set_value("Software/Vendor/App", "ok", Value::Int32(1)).unwrap();

        store.set_permissions("Software/Vendor/App", None).unwrap();
        assert_eq!(store.permissions("Software/Vendor/App").unwrap(), Permissions::READ_ONLY);
        assert_eq!(store.permissions("").unwrap(), Permissions::READ_WRITE);
    }

    #[test]
    fn test_unreadable_key_denies_reads() {
        let store = store_with_app();
        store.set_value("Software/Vendor/App", "Secret", Value::from("x")).unwrap();
        store
            .set_permissions("Software/Vendor/App", Some(Permissions::NONE))
            .unwrap();

        assert!(matches!(
            store.get_string("Software/Vendor/App", "Secret"),
            Err(StoreError::AccessDenied { .. })
        ));
        assert!(matches!(
            store.values("Software/Vendor/App"),
            Err(StoreError::AccessDenied { .. })
        ));
        assert!(matches!(
            store.subkeys("Software/Vendor/App"),
            Err(StoreError::AccessDenied { .. })
        ));
        assert!(store.key_exists("Software/Vendor/App").unwrap());
    }

    #[test]
    fn test_delete_key_and_tree() {
        let store = store_with_app();
        store.set_value("Software/Vendor", "v", Value::Int32(1)).unwrap();

        assert!(matches!(
            store.delete_key("Software/Vendor"),
            Err(StoreError::HasSubkeys { .. })
        ));
        store.delete_key("software/vendor/app").unwrap();
        assert!(!store.key_exists("Software/Vendor/App").unwrap());
        store.delete_key("Software/Vendor").unwrap();

        store.create_key("Software/Vendor/App/Deep").unwrap();
        store.delete_tree("Software").unwrap();
        assert!(!store.key_exists("Software").unwrap());
        assert!(store.subkeys("").unwrap().is_empty());
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let store = store_with_app();
        assert!(matches!(store.delete_tree(""), Err(StoreError::InvalidPath { .. })));
        assert!(matches!(store.delete_key("/"), Err(StoreError::InvalidPath { .. })));
    }

    #[test]
    fn test_changed_signal_uses_stored_spelling() {
        let store = ConfigStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        store.changed().connect(move |key| seen_clone.lock().push(key.clone()));

        store.create_key("Software/Vendor").unwrap();
        store.create_key("software/vendor").unwrap();
        store.set_value("SOFTWARE/VENDOR", "x", Value::Int32(1)).unwrap();
        store.delete_value("software/vendor", "X").unwrap();
        store.set_permissions("software", Some(Permissions::READ_WRITE)).unwrap();
        store.delete_tree("software").unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                "Software/Vendor",
                "Software/Vendor",
                "Software/Vendor",
                "Software",
                "Software",
            ]
        );
    }

    #[test]
    fn test_failed_change_emits_nothing() {
        let store = store_with_app();
        store.set_permissions("Software", Some(Permissions::READ_ONLY)).unwrap();
        let count = Arc::new(Mutex::new(0));
        let count_clone = count.clone();
        store.changed().connect(move |_| *count_clone.lock() += 1);

        assert!(store.set_value("Software", "x", Value::Int32(1)).is_err());
        assert!(store.delete_tree("Software/Vendor").is_err());
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn test_limits() {
        let limits = StoreLimits::default()
            .with_max_key_component_len(8)
            .with_max_value_name_len(4)
            .with_max_depth(2);
        let store = ConfigStore::with_limits(limits);

        assert!(matches!(store.create_key("a/b/c"), Err(StoreError::InvalidPath { .. })));
        assert!(matches!(
            store.create_key("toolongname"),
            Err(StoreError::InvalidPath { .. })
        ));
        store.create_key("a/b").unwrap();
        assert!(matches!(
            store.set_value("a/b", "names", Value::Int32(1)),
            Err(StoreError::InvalidPath { .. })
        ));
        store.set_value("a/b", "name", Value::Int32(1)).unwrap();
    }

    #[test]
    fn test_encode_errors_are_malformed() {
        let store = store_with_app();
        assert!(matches!(
            store.set_value("Software", "s", Value::from("a\0b")),
            Err(StoreError::Malformed { .. })
        ));
        assert!(matches!(
            store.set_value("Software", "m", Value::MultiString(vec!["a".into(), String::new()])),
            Err(StoreError::Malformed { .. })
        ));
    }

    fn populated() -> ConfigStore {
        let store = store_with_app();
        let key = "Software/Vendor/App";
        store.set_value(key, "", Value::from("default")).unwrap();
        store.set_value(key, "Home", Value::ExpandableString("%HOME%".into())).unwrap();
        store.set_value(key, "Blob", Value::Binary(vec![9, 8, 7])).unwrap();
        store.set_value(key, "Empty", Value::Binary(Vec::new())).unwrap();
        store.set_value(key, "Count", Value::Int32(u32::MAX)).unwrap();
        store.set_value(key, "Big", Value::Int64(1 << 63)).unwrap();
        store.set_value(key, "List", Value::MultiString(vec!["x".into(), "y".into()])).unwrap();
        store.set_raw(key, "Broken", ValueType::String, vec![0x41]).unwrap();
        store.set_permissions("Software/Vendor", Some(Permissions::READ_ONLY)).unwrap();
        store
    }

    fn assert_populated(store: &ConfigStore) {
        let key = "Software/Vendor/App";
        assert_eq!(store.get_string(key, "").unwrap(), "default");
        assert_eq!(store.get_expandable(key, "home").unwrap(), "%HOME%");
        assert_eq!(store.get_binary(key, "Blob").unwrap(), vec![9, 8, 7]);
        assert_eq!(store.get_binary(key, "Empty").unwrap(), Vec::<u8>::new());
        assert_eq!(store.get_u32(key, "Count").unwrap(), u32::MAX);
        assert_eq!(store.get_u64(key, "Big").unwrap(), 1 << 63);
        assert_eq!(store.get_multi_string(key, "List").unwrap(), vec!["x", "y"]);
        assert_eq!(
            store.get_raw(key, "Broken").unwrap(),
            RawValue {
                value_type: ValueType::String,
                data: vec![0x41]
            }
        );
        assert_eq!(store.permissions(key).unwrap(), Permissions::READ_ONLY);
        assert_eq!(store.subkeys("Software").unwrap(), vec!["Vendor"]);
    }

    #[test]
    fn test_json_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("store.json");

        populated().save_json(&file).unwrap();
        let loaded = ConfigStore::load_json(&file).unwrap();
        assert_populated(&loaded);
    }

    #[test]
    fn test_toml_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("store.toml");

        populated().save_toml(&file).unwrap();
        let loaded = ConfigStore::load_toml(&file).unwrap();
        assert_populated(&loaded);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("store.json");
        std::fs::write(&file, "stale").unwrap();

        ConfigStore::new().save_json(&file).unwrap();
        let loaded = ConfigStore::load_json(&file).unwrap();
        assert!(loaded.subkeys("").unwrap().is_empty());
    }

    #[test]
    fn test_load_failures() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ConfigStore::load_json(&missing),
            Err(StoreError::Persistence {
                source: SnapshotError::Io(_),
                ..
            })
        ));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();
        assert!(matches!(
            ConfigStore::load_json(&garbage),
            Err(StoreError::Persistence {
                source: SnapshotError::Json(_),
                ..
            })
        ));

        let duplicate = dir.path().join("duplicate.json");
        std::fs::write(
            &duplicate,
            r#"{ "keys": [ { "path": "A" }, { "path": "Software" }, { "path": "a" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            ConfigStore::load_json(&duplicate),
            Err(StoreError::Persistence {
                source: SnapshotError::Invalid(_),
                ..
            })
        ));
    }

    #[test]
    fn test_snapshot_depth_checked() {
        let mut snapshot = ConfigStore::new().snapshot();
        snapshot.keys.push(KeySnapshot {
            path: "a/b".into(),
            permissions: None,
            values: Vec::new(),
        });

        let shallow = StoreLimits::default().with_max_depth(1);
        assert!(ConfigStore::from_snapshot(&snapshot, shallow).is_err());

        let store = ConfigStore::from_snapshot(&snapshot, StoreLimits::default()).unwrap();
        assert!(store.key_exists("a").unwrap());
        assert!(store.key_exists("A/B").unwrap());
    }

    #[test]
    fn test_snapshot_is_flat_and_parents_first() {
        let store = store_with_app();
        store.set_value("Software/Vendor", "v", Value::Int32(1)).unwrap();

        let paths: Vec<String> = store.snapshot().keys.into_iter().map(|k| k.path).collect();
        assert_eq!(paths, vec!["", "Software", "Software/Vendor", "Software/Vendor/App"]);
    }

    fn deepest_key(depth: usize) -> String {
        (0..depth).map(|i| format!("k{i}")).collect::<Vec<_>>().join("/")
    }

    #[test]
    fn test_deepest_key_survives_both_formats() {
        let limits = StoreLimits::default();
        let path = deepest_key(limits.max_depth);
        let store = ConfigStore::new();
        store.create_key(&path).unwrap();
        store.set_value(&path, "Leaf", Value::Int32(7)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("deep.json");
        let toml = dir.path().join("deep.toml");
        store.save_json(&json).unwrap();
        store.save_toml(&toml).unwrap();

        assert_eq!(ConfigStore::load_json(&json).unwrap().get_u32(&path, "Leaf").unwrap(), 7);
        assert_eq!(ConfigStore::load_toml(&toml).unwrap().get_u32(&path, "Leaf").unwrap(), 7);
    }

    #[test]
    fn test_load_with_custom_limits() {
        let limits = StoreLimits::default().with_max_depth(600);
        let path = deepest_key(600);
        let store = ConfigStore::with_limits(limits.clone());
        store.create_key(&path).unwrap();
        store.set_value(&path, "", Value::from("bottom")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("deep.json");
        let toml = dir.path().join("deep.toml");
        store.save_json(&json).unwrap();
        store.save_toml(&toml).unwrap();

        // Too deep for the default limits.
        assert!(matches!(
            ConfigStore::load_json(&json),
            Err(StoreError::Persistence {
                source: SnapshotError::Invalid(_),
                ..
            })
        ));

        let loaded = ConfigStore::load_json_with_limits(&json, limits.clone()).unwrap();
        assert_eq!(loaded.get_string(&path, "").unwrap(), "bottom");
        assert_eq!(loaded.limits(), &limits);

        let loaded = ConfigStore::load_toml_with_limits(&toml, limits).unwrap();
        assert_eq!(loaded.get_string(&path, "").unwrap(), "bottom");
    }

    #[test]
    fn test_shared_across_threads() {
        let store: SharedConfigStore = Arc::new(store_with_app());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .set_value("Software/Vendor/App", &format!("t{i}"), Value::Int32(i))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.values("Software/Vendor/App").unwrap().len(), 4);
    }
}
