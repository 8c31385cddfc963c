//! Widget system for Trellis.
//!
//! This module provides the widget event architecture:
//!
//! - [`Widget`] trait: receives events through a generic hook and
//!   kind-specific handlers
//! - [`EventFilter`] trait: intercepts events headed for a monitored widget
//! - [`WidgetTree`]: owns widgets, their structure, and their filters
//! - [`EventDispatcher`]: runs the handler chain and propagates ignored
//!   events to parent widgets
//!
//! # Creating a Widget
//!
//! Implement [`Widget`] and override the handlers you care about. Handlers
//! you leave alone ignore input events, which passes them on to the parent.
//!
//! ```
//! use trellis::widget::*;
//!
//! struct Canvas {
//!     strokes: u32,
//! }
//!
//! impl Widget for Canvas {
//!     fn mouse_press_event(&mut self, event: &mut MousePressEvent) -> HandlerResult {
//!         if event.button == MouseButton::Left {
//!             self.strokes += 1;
//!         } else {
//!             // Let the container deal with other buttons.
//!             event.base.ignore();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! struct Window;
//! impl Widget for Window {}
//!
//! let mut tree = WidgetTree::new();
//! let window = tree.insert(Window);
//! let canvas = tree.insert_child(window, Canvas { strokes: 0 }).unwrap();
//!
//! let mut event = WidgetEvent::MousePress(MousePressEvent::new(
//!     MouseButton::Left,
//!     Point::new(5.0, 5.0),
//!     KeyboardModifiers::NONE,
//! ));
//! let result = EventDispatcher::send_event(&mut tree, canvas, &mut event).unwrap();
//!
//! assert_eq!(result, DispatchResult::Accepted);
//! assert_eq!(tree.widget::<Canvas>(canvas).unwrap().strokes, 1);
//! ```

mod dispatcher;
mod error;
mod events;
mod filter;
mod traits;
mod tree;


pub use dispatcher::{
    DispatchOutcome, DispatchReport, DispatchResult, DispatchStep, EventDispatcher, WidgetAccess,
};
pub use error::{DispatchError, DispatchStage, HandlerError, HandlerResult};
pub use events::{
    CustomEvent, EventBase, EventKind, HideEvent, Key, KeyPressEvent, KeyReleaseEvent,
    KeyboardModifiers, MouseButton, MouseDoubleClickEvent, MouseMoveEvent, MousePressEvent,
    MouseReleaseEvent, Point, ShowEvent, WheelEvent, WidgetEvent,
};
pub use filter::{EventFilter, FilterId, filter_fn};
pub use traits::Widget;
pub use tree::WidgetTree;
