//! Event dispatching and propagation for widgets.
//!
//! # Event Flow
//!
//! When an event is sent to a widget, the following steps occur at that
//! widget:
//!
//! 1. **Event Filters**: All event filters installed on the widget are
//!    invoked in reverse order (most recently installed first). If a filter
//!    returns `true`, the event is consumed and the widget's own handlers
//!    are skipped.
//!
//! 2. **Event Hook**: The widget's generic [`Widget::event`] method. If it
//!    returns `true`, the specific handler is skipped.
//!
//! 3. **Specific Handler**: The handler for the event's kind, such as
//!    [`Widget::mouse_press_event`].
//!
//! 4. **Propagation**: If the event was left ignored and its kind
//!    propagates, it is offered to the parent widget, resetting it to
//!    accepted and starting again at step 1. This continues until a widget
//!    keeps the event or the root is reached.
//!
//! Whether a step consumed the event only decides which handlers run at the
//! current widget. Whether the event moves on to the parent is decided by
//! the ignored flag alone.
//!
//! # Usage
//!
//! The `EventDispatcher` works with any widget storage implementing
//! [`WidgetAccess`]; [`WidgetTree`](super::WidgetTree) is the one the
//! framework uses.
//!
//! ```
//! use trellis::widget::{
//!     DispatchResult, EventDispatcher, KeyboardModifiers, MouseButton, MousePressEvent, Point,
//!     Widget, WidgetEvent, WidgetTree,
//! };
//!
//! struct Panel;
//! impl Widget for Panel {}
//!
//! let mut tree = WidgetTree::new();
//! let root = tree.insert(Panel);
//! let leaf = tree.insert_child(root, Panel).unwrap();
//!
//! let mut event = WidgetEvent::MousePress(MousePressEvent::new(
//!     MouseButton::Left,
//!     Point::new(3.0, 4.0),
//!     KeyboardModifiers::NONE,
//! ));
//!
//! // Neither panel handles presses, so the event climbs to the root and ends ignored.
//! let result = EventDispatcher::send_event(&mut tree, leaf, &mut event).unwrap();
//! assert_eq!(result, DispatchResult::Ignored);
//! ```

use trellis_core::ObjectId;
use trellis_core::logging::{span_names, targets};

use super::error::{DispatchError, DispatchStage, HandlerError};
use super::events::WidgetEvent;
use super::filter::{EventFilter, FilterId};
use super::traits::{Widget, dispatch_specific};

/// Result of dispatching an event to a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// A widget's handler chain kept the event.
    Accepted,
    /// An event filter consumed the event and did not ignore it.
    Filtered,
    /// No widget kept the event.
    Ignored,
}

impl DispatchResult {
    /// Check if the event was handled (accepted or filtered).
    pub fn was_handled(&self) -> bool {
        matches!(self, Self::Accepted | Self::Filtered)
    }
}

/// Outcome of a dispatch call.
pub type DispatchOutcome = Result<DispatchResult, DispatchError>;

/// One handler invocation recorded by [`EventDispatcher::send_event_traced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStep {
    /// The widget whose chain ran the step.
    pub widget: ObjectId,
    /// Which step ran.
    pub stage: DispatchStage,
}

/// The full record of a traced dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// How the dispatch ended.
    pub result: DispatchResult,
    /// Every handler invocation, in order.
    pub steps: Vec<DispatchStep>,
}

impl DispatchReport {
    /// The distinct widgets the event visited, in order.
    pub fn visited(&self) -> Vec<ObjectId> {
        let mut visited: Vec<ObjectId> = Vec::new();
        for step in &self.steps {
            if visited.last() != Some(&step.widget) {
                visited.push(step.widget);
            }
        }
        visited
    }
}

/// Trait for accessing widgets by their ObjectId.
///
/// Implement this trait for your widget storage mechanism to use
/// the `EventDispatcher`. Storage without event filters can rely on the
/// default filter methods.
pub trait WidgetAccess {
    /// Get an immutable reference to a widget by its ID.
    fn get_widget(&self, id: ObjectId) -> Option<&dyn Widget>;

    /// Get a mutable reference to a widget by its ID.
    fn get_widget_mut(&mut self, id: ObjectId) -> Option<&mut dyn Widget>;

    /// Get the parent of a widget, if it has one.
    fn parent_of(&self, id: ObjectId) -> Option<ObjectId>;

    /// Get the children of a widget.
    ///
    /// Default implementation returns an empty vec.
    fn children_of(&self, _id: ObjectId) -> Vec<ObjectId> {
        Vec::new()
    }

    /// The filters installed on a widget, in installation order.
    fn event_filters(&self, _id: ObjectId) -> Vec<FilterId> {
        Vec::new()
    }

    /// Get an installed filter by its ID.
    fn get_event_filter_mut(&mut self, _filter_id: FilterId) -> Option<&mut dyn EventFilter> {
        None
    }
}

/// How the handler chain at one widget ended.
enum ChainEnd {
    Filtered,
    Handled,
}

/// Event dispatcher for the widget system.
///
/// Provides methods for dispatching events to widgets with proper
/// event filter handling and parent propagation.
pub struct EventDispatcher;

impl EventDispatcher {
    /// Send an event to a widget, invoking event filters and handling propagation.
    ///
    /// This is the main entry point for event dispatch. A handler error stops
    /// the dispatch immediately and is returned as [`DispatchError::Handler`].
    pub fn send_event<S: WidgetAccess>(
        storage: &mut S,
        target_id: ObjectId,
        event: &mut WidgetEvent,
    ) -> DispatchOutcome {
        Self::dispatch(storage, target_id, event, true, None)
    }

    /// Like [`send_event`](Self::send_event), but also records every handler
    /// invocation.
    pub fn send_event_traced<S: WidgetAccess>(
        storage: &mut S,
        target_id: ObjectId,
        event: &mut WidgetEvent,
    ) -> Result<DispatchReport, DispatchError> {
        let mut steps = Vec::new();
        let result = Self::dispatch(storage, target_id, event, true, Some(&mut steps))?;
        Ok(DispatchReport { result, steps })
    }

    /// Send an event without propagation (direct delivery only).
    ///
    /// This runs the filters and handlers of one widget but never offers the
    /// event to its parent, even if it ends up ignored.
    pub fn send_event_direct<S: WidgetAccess>(
        storage: &mut S,
        target_id: ObjectId,
        event: &mut WidgetEvent,
    ) -> DispatchOutcome {
        Self::dispatch(storage, target_id, event, false, None)
    }

    /// Get the ancestor chain of a widget, from its immediate parent to the root.
    pub fn ancestor_chain<S: WidgetAccess>(storage: &S, start_id: ObjectId) -> Vec<ObjectId> {
        let mut chain = Vec::new();
        let mut current = storage.parent_of(start_id);

        while let Some(id) = current {
            chain.push(id);
            current = storage.parent_of(id);
        }

        chain
    }

    fn dispatch<S: WidgetAccess>(
        storage: &mut S,
        target_id: ObjectId,
        event: &mut WidgetEvent,
        propagate: bool,
        mut trace: Option<&mut Vec<DispatchStep>>,
    ) -> DispatchOutcome {
        let kind = event.kind();
        let _span = tracing::trace_span!(
            target: targets::DISPATCH,
            span_names::DISPATCH,
            %kind,
            widget = ?target_id
        )
        .entered();

        let mut current = target_id;
        loop {
            event.accept();
            let end = Self::run_chain(storage, current, event, trace.as_deref_mut())?;

            if !event.is_ignored() {
                let result = match end {
                    ChainEnd::Filtered => DispatchResult::Filtered,
                    ChainEnd::Handled => DispatchResult::Accepted,
                };
                tracing::trace!(
                    target: targets::DISPATCH,
                    widget = ?current,
                    ?result,
                    "event kept"
                );
                return Ok(result);
            }

            if !propagate || !event.should_propagate() {
                return Ok(DispatchResult::Ignored);
            }

            match storage.parent_of(current) {
                Some(parent) => {
                    tracing::debug!(
                        target: targets::DISPATCH,
                        %kind,
                        from = ?current,
                        to = ?parent,
                        "propagating ignored event to parent"
                    );
                    current = parent;
                }
                None => {
                    tracing::trace!(target: targets::DISPATCH, root = ?current, "ignored at root");
                    return Ok(DispatchResult::Ignored);
                }
            }
        }
    }

    /// Run filters, event hook, and specific handler of one widget.
    fn run_chain<S: WidgetAccess>(
        storage: &mut S,
        widget_id: ObjectId,
        event: &mut WidgetEvent,
        mut trace: Option<&mut Vec<DispatchStep>>,
    ) -> Result<ChainEnd, DispatchError> {
        if storage.get_widget(widget_id).is_none() {
            return Err(DispatchError::WidgetNotFound(widget_id));
        }

        let mut record = |stage: DispatchStage| {
            tracing::trace!(target: targets::DISPATCH, widget = ?widget_id, %stage, "invoking");
            if let Some(steps) = trace.as_deref_mut() {
                steps.push(DispatchStep {
                    widget: widget_id,
                    stage,
                });
            }
        };

        for filter_id in storage.event_filters(widget_id).into_iter().rev() {
            let Some(filter) = storage.get_event_filter_mut(filter_id) else {
                continue;
            };
            record(DispatchStage::Filter);
            let consumed = filter
                .event_filter(event, widget_id)
                .map_err(|source| Self::handler_failed(widget_id, DispatchStage::Filter, source))?;
            if consumed {
                return Ok(ChainEnd::Filtered);
            }
        }

        let widget = storage
            .get_widget_mut(widget_id)
            .ok_or(DispatchError::WidgetNotFound(widget_id))?;

        record(DispatchStage::Event);
        let consumed = widget
            .event(event)
            .map_err(|source| Self::handler_failed(widget_id, DispatchStage::Event, source))?;
        if consumed {
            return Ok(ChainEnd::Handled);
        }

        record(DispatchStage::Specific);
        dispatch_specific(widget, event)
            .map_err(|source| Self::handler_failed(widget_id, DispatchStage::Specific, source))?;
        Ok(ChainEnd::Handled)
    }

    fn handler_failed(
        widget: ObjectId,
        stage: DispatchStage,
        source: HandlerError,
    ) -> DispatchError {
        tracing::warn!(
            target: targets::DISPATCH,
            ?widget,
            %stage,
            error = %source,
            "event handler failed, aborting dispatch"
        );
        DispatchError::Handler {
            widget,
            stage,
            source,
        }
    }
}
