//! The application object: widget ownership, event delivery, and lifecycle.
//!
//! An [`Application`] is an ordinary value. Create as many as you like (one
//! per test, for instance); each owns its own [`WidgetTree`] and posted-event
//! queue. Dropping it tears everything down.
//!
//! # Example
//!
//! ```
//! use trellis::application::{Application, ApplicationConfig};
//! use trellis::widget::{
//!     HandlerResult, Key, KeyPressEvent, KeyboardModifiers, Widget, WidgetEvent,
//! };
//!
//! struct Editor {
//!     typed: String,
//! }
//!
//! impl Widget for Editor {
//!     fn key_press_event(&mut self, event: &mut KeyPressEvent) -> HandlerResult {
//!         self.typed.push_str(&event.text);
//!         Ok(())
//!     }
//! }
//!
//! let mut app = Application::new(ApplicationConfig::default().with_queue_capacity(64));
//! let editor = app.widgets_mut().insert(Editor { typed: String::new() });
//!
//! // Events may be queued from any thread through a poster.
//! let poster = app.poster();
//! std::thread::spawn(move || {
//!     let event = KeyPressEvent::new(Key::Character('h'), KeyboardModifiers::NONE, "h", false);
//!     poster.post(editor, WidgetEvent::KeyPress(event)).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! assert_eq!(app.process_events().unwrap(), 1);
//! assert_eq!(app.widgets().widget::<Editor>(editor).unwrap().typed, "h");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use thiserror::Error;
use trellis_core::ObjectId;
use trellis_core::logging::{span_names, targets};

use crate::widget::{
    DispatchError, DispatchReport, DispatchResult, EventDispatcher, WidgetEvent, WidgetTree,
};

/// Errors from application-level operations.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The application has been shut down.
    #[error("application has been shut down")]
    ShutDown,

    /// The posted-event queue is at capacity.
    #[error("posted event queue is full")]
    QueueFull,

    /// Dispatching an event failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// Configuration for an [`Application`].
#[derive(Debug, Clone, Default)]
pub struct ApplicationConfig {
    /// Maximum number of queued events. `None` for an unbounded queue.
    pub queue_capacity: Option<usize>,
    /// Maximum number of events dispatched by one
    /// [`process_events`](Application::process_events) call. `None` to
    /// dispatch everything queued when the call started.
    pub max_events_per_pass: Option<usize>,
}

impl ApplicationConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the posted-event queue.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Limit how many events one processing pass dispatches.
    pub fn with_max_events_per_pass(mut self, max: usize) -> Self {
        self.max_events_per_pass = Some(max);
        self
    }
}

#[derive(Debug)]
struct PostedEvent {
    target: ObjectId,
    event: WidgetEvent,
}

/// A cloneable, thread-safe handle for queueing events to an [`Application`].
#[derive(Debug, Clone)]
pub struct EventPoster {
    sender: Sender<PostedEvent>,
    shut_down: Arc<AtomicBool>,
}

impl EventPoster {
    /// Queue an event for `target`. It is dispatched by the next
    /// [`Application::process_events`] call.
    pub fn post(&self, target: ObjectId, event: WidgetEvent) -> ApplicationResult<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ApplicationError::ShutDown);
        }

        let kind = event.kind();
        match self.sender.try_send(PostedEvent { target, event }) {
            Ok(()) => {
                tracing::trace!(
                    target: targets::APPLICATION,
                    widget = ?target,
                    %kind,
                    "event posted"
                );
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    target: targets::APPLICATION,
                    widget = ?target,
                    %kind,
                    "event queue full, dropping event"
                );
                Err(ApplicationError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(ApplicationError::ShutDown),
        }
    }

    /// Check whether the application behind this poster has shut down.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

/// Owns the widget tree and drives event delivery.
pub struct Application {
    config: ApplicationConfig,
    widgets: WidgetTree,
    sender: Sender<PostedEvent>,
    receiver: Receiver<PostedEvent>,
    shut_down: Arc<AtomicBool>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new(ApplicationConfig::default())
    }
}

impl Application {
    /// Create an application with the given configuration.
    pub fn new(config: ApplicationConfig) -> Self {
        let (sender, receiver) = match config.queue_capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };

        tracing::info!(
            target: targets::APPLICATION,
            queue_capacity = ?config.queue_capacity,
            max_events_per_pass = ?config.max_events_per_pass,
            "application initialized"
        );

        Self {
            config,
            widgets: WidgetTree::new(),
            sender,
            receiver,
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The configuration the application was created with.
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    /// The widget tree.
    pub fn widgets(&self) -> &WidgetTree {
        &self.widgets
    }

    /// The widget tree, mutably.
    pub fn widgets_mut(&mut self) -> &mut WidgetTree {
        &mut self.widgets
    }

    /// Dispatch an event synchronously, with propagation.
    pub fn send_event(
        &mut self,
        target: ObjectId,
        event: &mut WidgetEvent,
    ) -> ApplicationResult<DispatchResult> {
        self.ensure_running()?;
        Ok(EventDispatcher::send_event(&mut self.widgets, target, event)?)
    }

    /// Dispatch an event synchronously and return the full handler trace.
    pub fn send_event_traced(
        &mut self,
        target: ObjectId,
        event: &mut WidgetEvent,
    ) -> ApplicationResult<DispatchReport> {
        self.ensure_running()?;
        Ok(EventDispatcher::send_event_traced(&mut self.widgets, target, event)?)
    }

    /// Queue an event for later dispatch.
    pub fn post_event(&self, target: ObjectId, event: WidgetEvent) -> ApplicationResult<()> {
        self.poster().post(target, event)
    }

    /// Get a handle other threads can use to queue events.
    pub fn poster(&self) -> EventPoster {
        EventPoster {
            sender: self.sender.clone(),
            shut_down: self.shut_down.clone(),
        }
    }

    /// Number of events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.receiver.len()
    }

    /// Dispatch queued events in posting order.
    ///
    /// Each event finishes its propagation before the next one starts.
    /// Events posted while this runs wait for the next call. Returns the
    /// number of events dispatched.
    ///
    /// # Errors
    ///
    /// If an event's dispatch fails, that event is dropped and the error is
    /// returned. Events queued behind it remain queued.
    pub fn process_events(&mut self) -> ApplicationResult<usize> {
        self.ensure_running()?;
        let _span = tracing::debug_span!(target: targets::APPLICATION, span_names::PROCESS_EVENTS)
            .entered();

        let queued = self.receiver.len();
        let limit = self.config.max_events_per_pass.map_or(queued, |max| queued.min(max));

        let mut processed = 0;
        while processed < limit {
            let Ok(PostedEvent { target, mut event }) = self.receiver.try_recv() else {
                break;
            };
            processed += 1;

            if let Err(err) = EventDispatcher::send_event(&mut self.widgets, target, &mut event) {
                tracing::warn!(
                    target: targets::APPLICATION,
                    widget = ?target,
                    error = %err,
                    remaining = self.receiver.len(),
                    "posted event failed"
                );
                return Err(err.into());
            }
        }

        tracing::debug!(
            target: targets::APPLICATION,
            processed,
            remaining = self.receiver.len(),
            "processed events"
        );
        Ok(processed)
    }

    /// Check whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Destroy every widget and filter and discard queued events.
    ///
    /// Later sends and posts fail with [`ApplicationError::ShutDown`].
    /// Calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let discarded = self.receiver.try_iter().count();
        let widgets = self.widgets.len();
        self.widgets.clear();

        tracing::info!(
            target: targets::APPLICATION,
            widgets,
            discarded_events = discarded,
            "application shut down"
        );
    }

    fn ensure_running(&self) -> ApplicationResult<()> {
        if self.is_shut_down() {
            Err(ApplicationError::ShutDown)
        } else {
            Ok(())
        }
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .field("widgets", &self.widgets)
            .field("pending_events", &self.pending_events())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
