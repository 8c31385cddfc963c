//! Trellis - widget event dispatch and a typed hierarchical configuration store.
//!
//! This is the main crate. It builds on [`trellis_core`] and provides:
//!
//! - [`widget`]: the widget tree, event filters, and the event dispatcher
//!   that propagates ignored events to parent widgets
//! - [`application`]: an event loop host with a posted-event queue
//! - [`store`]: a registry-style store of typed values under
//!   hierarchical keys, with JSON and TOML snapshots
//!
//! Most programs only need the prelude:
//!
//! ```
//! use trellis::prelude::*;
//!
//! struct Button {
//!     clicks: u32,
//! }
//!
//! impl Widget for Button {
//!     fn mouse_press_event(&mut self, _event: &mut MousePressEvent) -> HandlerResult {
//!         self.clicks += 1;
//!         Ok(())
//!     }
//! }
//!
//! struct Panel;
//! impl Widget for Panel {}
//!
//! let mut app = Application::new(ApplicationConfig::new());
//! let panel = app.widgets_mut().insert(Panel);
//! let button = app.widgets_mut().insert_child(panel, Button { clicks: 0 }).unwrap();
//!
//! let press = MousePressEvent::new(MouseButton::Left, Point::ZERO, KeyboardModifiers::NONE);
//! app.post_event(button, WidgetEvent::MousePress(press)).unwrap();
//! assert_eq!(app.process_events().unwrap(), 1);
//! assert_eq!(app.widgets().widget::<Button>(button).unwrap().clicks, 1);
//! ```

pub mod application;
pub mod prelude;
pub mod store;
pub mod widget;

pub use trellis_core::{ObjectId, Signal, logging};

pub use application::{
    Application, ApplicationConfig, ApplicationError, ApplicationResult, EventPoster,
};
pub use store::{ConfigStore, StoreError, StoreResult, Value, ValueType};
