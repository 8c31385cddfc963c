//! Core widget trait definitions.
//!
//! This module defines the [`Widget`] trait, the capability every node of a
//! [`WidgetTree`](super::WidgetTree) provides: receiving events.
//!
//! # Handler Chain
//!
//! For each widget an event visits, the dispatcher runs:
//!
//! 1. installed event filters (see [`EventFilter`](super::EventFilter)),
//! 2. the generic [`Widget::event`] hook,
//! 3. the kind-specific handler, e.g. [`Widget::mouse_press_event`].
//!
//! A step returning `true` ("consumed") stops the chain at this widget.
//! Calling [`WidgetEvent::ignore`] asks for the event to be offered to the
//! parent widget afterwards.
//!
//! The default specific handlers for input and custom events ignore the
//! event, so a widget that does not override a handler lets the event bubble
//! up. Show and hide handlers default to doing nothing.

use std::any::Any;

use super::error::HandlerResult;
use super::events::{
    CustomEvent, HideEvent, KeyPressEvent, KeyReleaseEvent, MouseDoubleClickEvent,
    MouseMoveEvent, MousePressEvent, MouseReleaseEvent, ShowEvent, WheelEvent, WidgetEvent,
};

/// The base trait for all widgets.
///
/// # Example
///
/// ```
/// use trellis::widget::{HandlerResult, MousePressEvent, Widget};
///
/// struct Button {
///     clicks: u32,
/// }
///
/// impl Widget for Button {
///     fn mouse_press_event(&mut self, _event: &mut MousePressEvent) -> HandlerResult {
///         self.clicks += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Widget: Any {
    /// Generic event hook, called before the kind-specific handler.
    ///
    /// Return `Ok(true)` to stop the chain here; the specific handler then
    /// does not run. The default returns `Ok(false)`.
    fn event(&mut self, _event: &mut WidgetEvent) -> HandlerResult<bool> {
        Ok(false)
    }

    /// Handle a mouse button press. Ignores the event by default.
    fn mouse_press_event(&mut self, event: &mut MousePressEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }

    /// Handle a mouse button release. Ignores the event by default.
    fn mouse_release_event(&mut self, event: &mut MouseReleaseEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }

    /// Handle a mouse double-click. Ignores the event by default.
    fn mouse_double_click_event(&mut self, event: &mut MouseDoubleClickEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }

    /// Handle mouse movement. Ignores the event by default.
    fn mouse_move_event(&mut self, event: &mut MouseMoveEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }

    /// Handle a wheel scroll. Ignores the event by default.
    fn wheel_event(&mut self, event: &mut WheelEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }

    /// Handle a key press. Ignores the event by default.
    fn key_press_event(&mut self, event: &mut KeyPressEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }

    /// Handle a key release. Ignores the event by default.
    fn key_release_event(&mut self, event: &mut KeyReleaseEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }

    /// Called when the widget is shown.
    fn show_event(&mut self, _event: &mut ShowEvent) -> HandlerResult {
        Ok(())
    }

    /// Called when the widget is hidden.
    fn hide_event(&mut self, _event: &mut HideEvent) -> HandlerResult {
        Ok(())
    }

    /// Handle a user-defined event. Ignores the event by default.
    fn custom_event(&mut self, event: &mut CustomEvent) -> HandlerResult {
        event.base.ignore();
        Ok(())
    }
}

/// Route an event to the kind-specific handler of `widget`.
pub(crate) fn dispatch_specific(widget: &mut dyn Widget, event: &mut WidgetEvent) -> HandlerResult {
    match event {
        WidgetEvent::MousePress(e) => widget.mouse_press_event(e),
        WidgetEvent::MouseRelease(e) => widget.mouse_release_event(e),
        WidgetEvent::DoubleClick(e) => widget.mouse_double_click_event(e),
        WidgetEvent::MouseMove(e) => widget.mouse_move_event(e),
        WidgetEvent::Wheel(e) => widget.wheel_event(e),
        WidgetEvent::KeyPress(e) => widget.key_press_event(e),
        WidgetEvent::KeyRelease(e) => widget.key_release_event(e),
        WidgetEvent::Show(e) => widget.show_event(e),
        WidgetEvent::Hide(e) => widget.hide_event(e),
        WidgetEvent::Custom(e) => widget.custom_event(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::events::{Key, KeyboardModifiers, MouseButton, Point};

    struct Plain;
    impl Widget for Plain {}

    #[test]
    fn test_default_input_handlers_ignore() {
        let mut widget = Plain;
        let mut press = WidgetEvent::MousePress(MousePressEvent::new(
            MouseButton::Left,
            Point::ZERO,
            KeyboardModifiers::NONE,
        ));
        dispatch_specific(&mut widget, &mut press).unwrap();
        assert!(press.is_ignored());

        let mut key = WidgetEvent::KeyPress(KeyPressEvent::new(
            Key::Enter,
            KeyboardModifiers::NONE,
            "",
            false,
        ));
        dispatch_specific(&mut widget, &mut key).unwrap();
        assert!(key.is_ignored());

        let mut custom = WidgetEvent::Custom(CustomEvent::new(()));
        dispatch_specific(&mut widget, &mut custom).unwrap();
        assert!(custom.is_ignored());
    }

    #[test]
    fn test_default_show_hide_handlers_leave_event_accepted() {
        let mut widget = Plain;
        let mut show = WidgetEvent::Show(ShowEvent::new());
        dispatch_specific(&mut widget, &mut show).unwrap();
        assert!(show.is_accepted());

        let mut hide = WidgetEvent::Hide(HideEvent::new());
        dispatch_specific(&mut widget, &mut hide).unwrap();
        assert!(hide.is_accepted());
    }

    #[test]
    fn test_default_event_hook_does_not_consume() {
        let mut widget = Plain;
        let mut show = WidgetEvent::Show(ShowEvent::new());
        assert!(!widget.event(&mut show).unwrap());
    }
}
