//! Hierarchical typed configuration store.
//!
//! [`ConfigStore`] keeps a tree of keys, each holding named values tagged
//! with a [`ValueType`]. It is an in-process store; nothing here touches an
//! operating-system registry.
//!
//! # Paths
//!
//! Keys are addressed by paths such as `"Software/Vendor/App"`. Backslashes
//! work as separators too. Names are case-insensitive and case-preserving.
//! The empty value name addresses a key's default value.
//!
//! # Types
//!
//! Values are stored as raw payloads (see [`value`] for the byte layouts)
//! and decoded on read. Typed getters such as [`ConfigStore::get_u32`] fail
//! with [`StoreError::TypeMismatch`] when the stored tag differs, and with
//! [`StoreError::Malformed`] when the payload does not decode.
//!
//! # Change Notifications
//!
//! Connect to [`ConfigStore::changed`] to hear about every change:
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use trellis::store::{ConfigStore, Value};
//!
//! let store = ConfigStore::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let seen_clone = seen.clone();
//! store.changed().connect(move |key| seen_clone.lock().unwrap().push(key.clone()));
//!
//! store.create_key("App").unwrap();
//! store.set_value("app", "Theme", Value::from("dark")).unwrap();
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["App".to_string(), "App".to_string()]);
//! ```
//!
//! # Persistence
//!
//! Stores are saved to and loaded from JSON or TOML snapshots:
//!
//! ```no_run
//! use trellis::store::ConfigStore;
//!
//! # fn main() -> Result<(), trellis::store::StoreError> {
//! let store = ConfigStore::load_json("config.json")?;
//! store.save_toml("config.toml")?;
//! # Ok(())
//! # }
//! ```

mod access;
mod config_store;
mod error;
pub mod expand;
mod path;
pub mod snapshot;
pub mod value;

pub use access::Permissions;
pub use config_store::{ConfigStore, RawValue, SharedConfigStore, ValueInfo};
pub use error::{SnapshotError, StoreError, StoreResult};
pub use expand::{Environment, MapEnvironment, ProcessEnvironment, expand};
pub use path::{KeyPath, StoreLimits};
pub use snapshot::{KeySnapshot, Snapshot, SnapshotFormat};
pub use value::{Value, ValueType};
