//! Event filters.
//!
//! An event filter gets first refusal on every event delivered to the widget
//! it is installed on. Filters are owned by the [`WidgetTree`](super::WidgetTree)
//! alongside the widget they monitor, so a filter lives exactly as long as it
//! stays installed: it is dropped when removed or when the widget is destroyed.
//!
//! Any `FnMut(&mut WidgetEvent, ObjectId) -> HandlerResult<bool>` closure is
//! an event filter. Wrap it in [`filter_fn`] to get its signature inferred:
//!
//! ```
//! use trellis::widget::{filter_fn, EventKind, Widget, WidgetTree};
//!
//! struct Panel;
//! impl Widget for Panel {}
//!
//! let mut tree = WidgetTree::new();
//! let panel = tree.insert(Panel);
//!
//! // Swallow all key presses headed for the panel.
//! tree.install_event_filter(panel, filter_fn(|event, _target| {
//!     Ok(event.kind() == EventKind::KeyPress)
//! }))
//! .unwrap();
//! ```

use slotmap::new_key_type;
use trellis_core::ObjectId;

use super::error::HandlerResult;
use super::events::WidgetEvent;

new_key_type! {
    /// Identifies an installed event filter.
    ///
    /// Returned by [`WidgetTree::install_event_filter`](super::WidgetTree::install_event_filter)
    /// and used to remove the filter again.
    pub struct FilterId;
}

/// Intercepts events headed for a monitored widget.
pub trait EventFilter {
    /// Inspect an event before the monitored widget's own handlers run.
    ///
    /// `target` is the widget the filter is installed on. Return `Ok(true)`
    /// to consume the event; the widget's handlers then do not run. Calling
    /// [`WidgetEvent::ignore`] still forwards the event to the parent, whether
    /// or not it was consumed.
    fn event_filter(&mut self, event: &mut WidgetEvent, target: ObjectId) -> HandlerResult<bool>;
}

impl<F> EventFilter for F
where
    F: FnMut(&mut WidgetEvent, ObjectId) -> HandlerResult<bool>,
{
    fn event_filter(&mut self, event: &mut WidgetEvent, target: ObjectId) -> HandlerResult<bool> {
        self(event, target)
    }
}

/// Build an event filter from a closure.
///
/// This only pins down the closure's signature, so parameter and return
/// types need no annotations.
pub fn filter_fn<F>(filter: F) -> F
where
    F: FnMut(&mut WidgetEvent, ObjectId) -> HandlerResult<bool>,
{
    filter
}
