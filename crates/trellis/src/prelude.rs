//! Prelude module for Trellis.
//!
//! This module re-exports the most commonly used types:
//!
//! ```
//! use trellis::prelude::*;
//! ```

// ============================================================================
// Application
// ============================================================================

pub use crate::application::{Application, ApplicationConfig, ApplicationError, EventPoster};

// ============================================================================
// Object System
// ============================================================================

pub use trellis_core::{ObjectId, Signal};

// ============================================================================
// Widgets and Events
// ============================================================================

pub use crate::widget::{
    CustomEvent, DispatchError, DispatchResult, EventDispatcher, EventFilter, HandlerError,
    HandlerResult, HideEvent, Key, KeyPressEvent, KeyReleaseEvent, KeyboardModifiers, MouseButton,
    MouseDoubleClickEvent, MouseMoveEvent, MousePressEvent, MouseReleaseEvent, Point, ShowEvent,
    WheelEvent, Widget, WidgetEvent, WidgetTree, filter_fn,
};

// ============================================================================
// Configuration Store
// ============================================================================

pub use crate::store::{ConfigStore, Permissions, StoreError, Value, ValueType};
