//! Error types for widget event handling.

use std::fmt;

use thiserror::Error;
use trellis_core::ObjectId;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by an event handler or event filter.
///
/// A failing handler aborts the dispatch of the event it was handling.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl HandlerError {
    /// Create a handler error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type returned by event handlers and filters.
pub type HandlerResult<T = ()> = std::result::Result<T, HandlerError>;

/// The step of a widget's handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStage {
    /// An installed event filter.
    Filter,
    /// The widget's generic [`event`](super::Widget::event) hook.
    Event,
    /// The kind-specific handler, such as
    /// [`mouse_press_event`](super::Widget::mouse_press_event).
    Specific,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Filter => "event filter",
            Self::Event => "event hook",
            Self::Specific => "specific handler",
        };
        f.write_str(name)
    }
}

/// Errors that abort an event dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The target (or an ancestor on the propagation path) is not in the tree.
    #[error("widget {0:?} not found")]
    WidgetNotFound(ObjectId),

    /// A handler or filter returned an error.
    #[error("{stage} of widget {widget:?} failed: {source}")]
    Handler {
        /// The widget whose chain was running.
        widget: ObjectId,
        /// The step that failed.
        stage: DispatchStage,
        /// The handler's error.
        #[source]
        source: HandlerError,
    },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_handler_error_source_chain() {
        let io = std::io::Error::other("disk gone");
        let err = HandlerError::with_source("could not persist click", io);

        assert_eq!(err.to_string(), "could not persist click");
        assert_eq!(err.source().map(|s| s.to_string()), Some("disk gone".into()));
        assert!(HandlerError::new("plain").source().is_none());
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::Handler {
            widget: ObjectId::default(),
            stage: DispatchStage::Specific,
            source: HandlerError::new("boom"),
        };
        let text = err.to_string();
        assert!(text.starts_with("specific handler of widget"));
        assert!(text.ends_with("failed: boom"));
    }
}
