//! Widget event types.
//!
//! Every event carries an [`EventBase`] holding its accepted/ignored flag.
//! An event starts out accepted. A handler that cannot deal with it calls
//! [`WidgetEvent::ignore`], which is the signal for the dispatcher to offer
//! the event to the parent widget.
//!
//! # Custom Events
//!
//! Applications can dispatch their own payloads through [`CustomEvent`]:
//!
//! ```
//! use trellis::widget::{CustomEvent, WidgetEvent};
//!
//! struct RefreshRequest {
//!     force: bool,
//! }
//!
//! let event = WidgetEvent::Custom(CustomEvent::new(RefreshRequest { force: true }));
//!
//! if let Some(custom) = event.as_custom() {
//!     if let Some(request) = custom.downcast_ref::<RefreshRequest>() {
//!         assert!(request.force);
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;

/// A position in widget-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal offset from the widget's left edge.
    pub x: f32,
    /// Vertical offset from the widget's top edge.
    pub y: f32,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Keyboard modifiers that may be held during input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeyboardModifiers {
    /// The Shift key is held.
    pub shift: bool,
    /// The Control key is held.
    pub control: bool,
    /// The Alt key is held.
    pub alt: bool,
    /// The Meta/Super key is held.
    pub meta: bool,
}

impl KeyboardModifiers {
    /// No modifiers pressed.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };

    /// Shift modifier only.
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    /// Control modifier only.
    pub const CTRL: Self = Self {
        control: true,
        ..Self::NONE
    };

    /// Alt modifier only.
    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    /// Check if any modifier is pressed.
    pub fn any(&self) -> bool {
        self.shift || self.control || self.alt || self.meta
    }
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MouseButton {
    /// Primary button (usually left).
    Left = 0,
    /// Secondary button (usually right).
    Right = 1,
    /// Middle button (scroll wheel click).
    Middle = 2,
}

/// Keys reported by key events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character key.
    Character(char),
    /// Enter / Return.
    Enter,
    /// Escape.
    Escape,
    /// Tab.
    Tab,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Space bar.
    Space,
    /// Up arrow.
    ArrowUp,
    /// Down arrow.
    ArrowDown,
    /// Left arrow.
    ArrowLeft,
    /// Right arrow.
    ArrowRight,
    /// A function key, `F(1)` through `F(24)`.
    F(u8),
    /// A key with no mapping, carrying the platform scan code.
    Unknown(u16),
}

/// Common data for all widget events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBase {
    accepted: bool,
}

impl Default for EventBase {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBase {
    /// Create a new event base. Events start out accepted.
    pub fn new() -> Self {
        Self { accepted: true }
    }

    /// Check if the event has been accepted.
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Accept the event, keeping it at the current widget.
    pub fn accept(&mut self) {
        self.accepted = true;
    }

    /// Ignore the event, asking for it to be offered to the parent widget.
    pub fn ignore(&mut self) {
        self.accepted = false;
    }

    /// Set the accepted flag directly.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }
}

macro_rules! pointer_event {
    ($(#[$meta:meta])* $name:ident, $verb:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            /// Base event data.
            pub base: EventBase,
            #[doc = concat!("The button that was ", $verb, ".")]
            pub button: MouseButton,
            /// Position in widget-local coordinates.
            pub pos: Point,
            /// Keyboard modifiers held during the event.
            pub modifiers: KeyboardModifiers,
        }

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "`.")]
            pub fn new(button: MouseButton, pos: Point, modifiers: KeyboardModifiers) -> Self {
                Self {
                    base: EventBase::new(),
                    button,
                    pos,
                    modifiers,
                }
            }
        }
    };
}

pointer_event!(
    /// Mouse press event.
    MousePressEvent,
    "pressed"
);
pointer_event!(
    /// Mouse release event.
    MouseReleaseEvent,
    "released"
);
pointer_event!(
    /// Mouse double-click event.
    MouseDoubleClickEvent,
    "double-clicked"
);

/// Mouse move event.
#[derive(Debug, Clone, Copy)]
pub struct MouseMoveEvent {
    /// Base event data.
    pub base: EventBase,
    /// Position in widget-local coordinates.
    pub pos: Point,
    /// Mouse buttons currently held, as a bit mask indexed by [`MouseButton`].
    pub buttons: u8,
    /// Keyboard modifiers held during the event.
    pub modifiers: KeyboardModifiers,
}

impl MouseMoveEvent {
    /// Create a new mouse move event.
    pub fn new(pos: Point, buttons: u8, modifiers: KeyboardModifiers) -> Self {
        Self {
            base: EventBase::new(),
            pos,
            buttons,
            modifiers,
        }
    }

    /// Check if a specific button is held.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        (self.buttons & (1 << button as u8)) != 0
    }
}

/// Mouse wheel (scroll) event.
#[derive(Debug, Clone, Copy)]
pub struct WheelEvent {
    /// Base event data.
    pub base: EventBase,
    /// Position in widget-local coordinates.
    pub pos: Point,
    /// Horizontal scroll delta (positive = right).
    pub delta_x: f32,
    /// Vertical scroll delta (positive = away from the user).
    pub delta_y: f32,
    /// Keyboard modifiers held during the event.
    pub modifiers: KeyboardModifiers,
}

impl WheelEvent {
    /// Create a new wheel event.
    pub fn new(pos: Point, delta_x: f32, delta_y: f32, modifiers: KeyboardModifiers) -> Self {
        Self {
            base: EventBase::new(),
            pos,
            delta_x,
            delta_y,
            modifiers,
        }
    }
}

/// Key press event.
#[derive(Debug, Clone)]
pub struct KeyPressEvent {
    /// Base event data.
    pub base: EventBase,
    /// The key that was pressed.
    pub key: Key,
    /// Keyboard modifiers held during the event.
    pub modifiers: KeyboardModifiers,
    /// The text produced by this key press, empty for non-printable keys.
    pub text: String,
    /// Whether this is an auto-repeat.
    pub is_repeat: bool,
}

impl KeyPressEvent {
    /// Create a new key press event.
    pub fn new(
        key: Key,
        modifiers: KeyboardModifiers,
        text: impl Into<String>,
        is_repeat: bool,
    ) -> Self {
        Self {
            base: EventBase::new(),
            key,
            modifiers,
            text: text.into(),
            is_repeat,
        }
    }
}

/// Key release event.
#[derive(Debug, Clone)]
pub struct KeyReleaseEvent {
    /// Base event data.
    pub base: EventBase,
    /// The key that was released.
    pub key: Key,
    /// Keyboard modifiers held during the event.
    pub modifiers: KeyboardModifiers,
}

impl KeyReleaseEvent {
    /// Create a new key release event.
    pub fn new(key: Key, modifiers: KeyboardModifiers) -> Self {
        Self {
            base: EventBase::new(),
            key,
            modifiers,
        }
    }
}

/// Show event, sent when a widget becomes visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowEvent {
    /// Base event data.
    pub base: EventBase,
}

impl ShowEvent {
    /// Create a new show event.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Hide event, sent when a widget is hidden.
#[derive(Debug, Clone, Copy, Default)]
pub struct HideEvent {
    /// Base event data.
    pub base: EventBase,
}

impl HideEvent {
    /// Create a new hide event.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A custom event that can carry any user-defined payload.
///
/// The payload is stored type-erased; recover it with
/// [`downcast_ref`](Self::downcast_ref) or [`downcast_mut`](Self::downcast_mut).
pub struct CustomEvent {
    /// Base event data.
    pub base: EventBase,
    payload: Box<dyn Any + Send + Sync>,
    type_id: TypeId,
    name: Option<String>,
}

impl CustomEvent {
    /// Create a new custom event with the given payload.
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self {
            base: EventBase::new(),
            type_id: TypeId::of::<T>(),
            payload: Box::new(payload),
            name: None,
        }
    }

    /// Create a new custom event with a name for logging.
    pub fn with_name<T: Any + Send + Sync>(payload: T, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(payload)
        }
    }

    /// Get the event name, if one was provided.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if the payload is of type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Try to get a reference to the payload as type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Try to get a mutable reference to the payload as type `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.payload.downcast_mut::<T>()
    }
}

impl fmt::Debug for CustomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEvent")
            .field("base", &self.base)
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// The kind of a [`WidgetEvent`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Mouse press.
    MousePress,
    /// Mouse release.
    MouseRelease,
    /// Mouse double-click.
    MouseDoubleClick,
    /// Mouse move.
    MouseMove,
    /// Mouse wheel.
    Wheel,
    /// Key press.
    KeyPress,
    /// Key release.
    KeyRelease,
    /// Widget shown.
    Show,
    /// Widget hidden.
    Hide,
    /// User-defined event.
    Custom,
}

impl EventKind {
    /// Whether events of this kind may be re-offered to the parent widget.
    ///
    /// Input and custom events propagate when ignored. Show and hide are
    /// about one specific widget and never leave it.
    pub fn propagates(self) -> bool {
        !matches!(self, Self::Show | Self::Hide)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Enum wrapping all widget event types.
#[derive(Debug)]
pub enum WidgetEvent {
    /// Mouse press event.
    MousePress(MousePressEvent),
    /// Mouse release event.
    MouseRelease(MouseReleaseEvent),
    /// Mouse double-click event.
    DoubleClick(MouseDoubleClickEvent),
    /// Mouse move event.
    MouseMove(MouseMoveEvent),
    /// Mouse wheel event.
    Wheel(WheelEvent),
    /// Key press event.
    KeyPress(KeyPressEvent),
    /// Key release event.
    KeyRelease(KeyReleaseEvent),
    /// Show event.
    Show(ShowEvent),
    /// Hide event.
    Hide(HideEvent),
    /// User-defined custom event.
    Custom(CustomEvent),
}

impl WidgetEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MousePress(_) => EventKind::MousePress,
            Self::MouseRelease(_) => EventKind::MouseRelease,
            Self::DoubleClick(_) => EventKind::MouseDoubleClick,
            Self::MouseMove(_) => EventKind::MouseMove,
            Self::Wheel(_) => EventKind::Wheel,
            Self::KeyPress(_) => EventKind::KeyPress,
            Self::KeyRelease(_) => EventKind::KeyRelease,
            Self::Show(_) => EventKind::Show,
            Self::Hide(_) => EventKind::Hide,
            Self::Custom(_) => EventKind::Custom,
        }
    }

    fn base(&self) -> &EventBase {
        match self {
            Self::MousePress(e) => &e.base,
            Self::MouseRelease(e) => &e.base,
            Self::DoubleClick(e) => &e.base,
            Self::MouseMove(e) => &e.base,
            Self::Wheel(e) => &e.base,
            Self::KeyPress(e) => &e.base,
            Self::KeyRelease(e) => &e.base,
            Self::Show(e) => &e.base,
            Self::Hide(e) => &e.base,
            Self::Custom(e) => &e.base,
        }
    }

    fn base_mut(&mut self) -> &mut EventBase {
        match self {
            Self::MousePress(e) => &mut e.base,
            Self::MouseRelease(e) => &mut e.base,
            Self::DoubleClick(e) => &mut e.base,
            Self::MouseMove(e) => &mut e.base,
            Self::Wheel(e) => &mut e.base,
            Self::KeyPress(e) => &mut e.base,
            Self::KeyRelease(e) => &mut e.base,
            Self::Show(e) => &mut e.base,
            Self::Hide(e) => &mut e.base,
            Self::Custom(e) => &mut e.base,
        }
    }

    /// Check if the event has been accepted.
    pub fn is_accepted(&self) -> bool {
        self.base().is_accepted()
    }

    /// Check if the event has been marked ignored.
    pub fn is_ignored(&self) -> bool {
        !self.is_accepted()
    }

    /// Accept the event.
    pub fn accept(&mut self) {
        self.base_mut().accept();
    }

    /// Ignore the event so that it is offered to the parent widget.
    pub fn ignore(&mut self) {
        self.base_mut().ignore();
    }

    /// Set the accepted flag directly.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.base_mut().set_accepted(accepted);
    }

    /// Check if this event should be offered to the parent widget.
    ///
    /// True when the event is ignored and its kind propagates.
    pub fn should_propagate(&self) -> bool {
        self.kind().propagates() && self.is_ignored()
    }

    /// Try to get the inner [`CustomEvent`].
    pub fn as_custom(&self) -> Option<&CustomEvent> {
        match self {
            Self::Custom(e) => Some(e),
            _ => None,
        }
    }

    /// Try to get the inner [`CustomEvent`] mutably.
    pub fn as_custom_mut(&mut self) -> Option<&mut CustomEvent> {
        match self {
            Self::Custom(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press() -> WidgetEvent {
        WidgetEvent::MousePress(MousePressEvent::new(
            MouseButton::Left,
            Point::new(4.0, 2.0),
            KeyboardModifiers::NONE,
        ))
    }

    #[test]
    fn test_events_start_accepted() {
        let event = press();
        assert!(event.is_accepted());
        assert!(!event.should_propagate());
    }

    #[test]
    fn test_ignore_marks_for_propagation() {
        let mut event = press();
        event.ignore();
        assert!(event.is_ignored());
        assert!(event.should_propagate());

        event.accept();
        assert!(!event.should_propagate());
    }

    #[test]
    fn test_show_hide_never_propagate() {
        let mut show = WidgetEvent::Show(ShowEvent::new());
        show.ignore();
        assert!(!show.should_propagate());

        let mut hide = WidgetEvent::Hide(HideEvent::new());
        hide.ignore();
        assert!(!hide.should_propagate());
    }

    #[test]
    fn test_custom_event_downcast() {
        #[derive(Debug, PartialEq)]
        struct Payload(u32);

        let mut event = CustomEvent::with_name(Payload(7), "refresh");
        assert!(event.is::<Payload>());
        assert!(!event.is::<String>());
        assert_eq!(event.name(), Some("refresh"));

        event.downcast_mut::<Payload>().unwrap().0 += 1;
        assert_eq!(event.downcast_ref::<Payload>(), Some(&Payload(8)));
    }

    #[test]
    fn test_mouse_move_buttons() {
        let event = MouseMoveEvent::new(Point::ZERO, 0b101, KeyboardModifiers::SHIFT);
        assert!(event.is_button_pressed(MouseButton::Left));
        assert!(!event.is_button_pressed(MouseButton::Right));
        assert!(event.is_button_pressed(MouseButton::Middle));
        assert!(event.modifiers.any());
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(press().kind(), EventKind::MousePress);
        assert_eq!(EventKind::KeyPress.to_string(), "KeyPress");
    }
}
