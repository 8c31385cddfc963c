//! Core systems for Trellis.
//!
//! This crate provides the foundational components shared by the Trellis
//! framework crate:
//!
//! - **Object Tree**: Arena-backed parent-child structure with stable ids
//! - **Signal/Slot System**: Synchronous change notification
//! - **Logging**: Tracing targets, tree visualization, timing spans
//!
//! # Object Tree Example
//!
//! ```
//! use trellis_core::ObjectRegistry;
//!
//! let mut registry = ObjectRegistry::new();
//! let root = registry.register("Window");
//! let child = registry.register("Button");
//! registry.set_parent(child, Some(root)).unwrap();
//!
//! assert_eq!(registry.ancestors(child).unwrap(), vec![root]);
//! ```
//!
//! # Signal/Slot Example
//!
//! ```
//! use trellis_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod object;
pub mod signal;

pub use logging::{ObjectTreeDebug, PerfSpan, TreeFormatOptions, TreeStyle};
pub use object::{ObjectError, ObjectId, ObjectRegistry, ObjectResult};
pub use signal::{ConnectionId, Signal};
