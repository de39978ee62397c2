//! X11 Events
//!
//! The connection translates raw protocol events into [`XEvent`]s, resolving
//! atoms on the way, so the window manager never deals with atom values

use crate::{
    core::Window,
    geometry::{Point, Rectangle},
};
use bitflags::bitflags;
use x11rb::protocol::xproto::{Keycode, StackMode, Timestamp};

// ============================== XEvent ==============================

/// Low-level wrapper around X-server events
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XEvent {
    /// A window asks to be mapped
    MapRequest(Window),
    /// A window was unmapped
    UnmapNotify(UnmapEvent),
    /// A window was destroyed
    DestroyNotify(Window),
    /// A window asks for a new geometry
    ConfigureRequest(ConfigureRequestData),
    /// A window changed its geometry. Only the root window's is of interest
    ConfigureNotify(ConfigureEvent),
    /// A window property changed
    PropertyNotify(PropertyEvent),
    /// A client message arrived
    ClientMessage(ClientMessageEvent),
    /// The pointer entered a window
    EnterNotify(PointerEvent),
    /// A window received input focus
    FocusIn(Window),
    /// A mouse button was pressed
    ButtonPress(ButtonEvent),
    /// A mouse button was released
    ButtonRelease(ButtonEvent),
    /// The pointer moved
    MotionNotify(MotionEvent),
    /// A key combination was pressed
    KeyPress(KeyEvent),
    /// The keyboard or modifier mapping changed
    MappingNotify {
        /// The keyboard mapping itself changed
        keyboard: bool,
    },
    /// Part of a window needs to be redrawn
    Expose {
        /// The exposed window
        window: Window,
        /// Number of expose events that follow
        count:  u16,
    },
    /// Event the window manager does not track
    Unknown(u8),
}

impl XEvent {
    /// Short name used in logs
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::MapRequest(_) => "MapRequest",
            Self::UnmapNotify(_) => "UnmapNotify",
            Self::DestroyNotify(_) => "DestroyNotify",
            Self::ConfigureRequest(_) => "ConfigureRequest",
            Self::ConfigureNotify(_) => "ConfigureNotify",
            Self::PropertyNotify(_) => "PropertyNotify",
            Self::ClientMessage(_) => "ClientMessage",
            Self::EnterNotify(_) => "EnterNotify",
            Self::FocusIn(_) => "FocusIn",
            Self::ButtonPress(_) => "ButtonPress",
            Self::ButtonRelease(_) => "ButtonRelease",
            Self::MotionNotify(_) => "MotionNotify",
            Self::KeyPress(_) => "KeyPress",
            Self::MappingNotify { .. } => "MappingNotify",
            Self::Expose { .. } => "Expose",
            Self::Unknown(_) => "Unknown",
        }
    }
}

/// Data associated with an unmap event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnmapEvent {
    /// The unmapped window
    pub(crate) window:    Window,
    /// Sent by a client rather than the server, meaning the client wants to
    /// be withdrawn
    pub(crate) synthetic: bool,
}

/// Data associated with a configure event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConfigureEvent {
    /// The window associated with the event
    pub(crate) window: Window,
    /// The new geometry of the window
    pub(crate) rect:   Rectangle,
}

bitflags! {
    /// Fields present in a configure request
    #[derive(Default)]
    pub(crate) struct ConfigFields: u16 {
        const X            = 1 << 0;
        const Y            = 1 << 1;
        const WIDTH        = 1 << 2;
        const HEIGHT       = 1 << 3;
        const BORDER_WIDTH = 1 << 4;
        const SIBLING      = 1 << 5;
        const STACK_MODE   = 1 << 6;
    }
}

/// Data associated with a configure request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConfigureRequestData {
    /// The window associated with the event
    pub(crate) window:       Window,
    /// Which of the following fields were requested
    pub(crate) fields:       ConfigFields,
    /// Requested geometry; only the fields named in `fields` are meaningful
    pub(crate) rect:         Rectangle,
    /// Requested border width
    pub(crate) border_width: i32,
    /// Sibling window, used with `stack_mode`
    pub(crate) sibling:      Window,
    /// Requested stacking
    pub(crate) stack_mode:   StackMode,
}

/// Properties the window manager reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyKind {
    /// `WM_NAME` or `_NET_WM_NAME`
    Name,
    /// `WM_NORMAL_HINTS`
    NormalHints,
    /// `WM_HINTS`
    Hints,
    /// `WM_TRANSIENT_FOR`
    TransientFor,
    /// `_NET_WM_WINDOW_TYPE`
    WindowType,
    /// Anything else
    Other,
}

/// Data associated with a property change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PropertyEvent {
    /// The window associated with the event
    pub(crate) window:  Window,
    /// The property that changed
    pub(crate) kind:    PropertyKind,
    /// The property was deleted
    pub(crate) deleted: bool,
}

/// How a `_NET_WM_STATE` request changes a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateAction {
    /// `_NET_WM_STATE_REMOVE`
    Remove,
    /// `_NET_WM_STATE_ADD`
    Add,
    /// `_NET_WM_STATE_TOGGLE`
    Toggle,
}

impl StateAction {
    /// Decode the first data word of a `_NET_WM_STATE` message
    pub(crate) const fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    /// Whether the state should be set, given whether it is set now
    pub(crate) const fn apply(self, current: bool) -> bool {
        match self {
            Self::Remove => false,
            Self::Add => true,
            Self::Toggle => !current,
        }
    }
}

/// Client messages the window manager understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClientRequest {
    /// `_NET_WM_STATE` naming `_NET_WM_STATE_FULLSCREEN`
    Fullscreen(StateAction),
    /// `_NET_ACTIVE_WINDOW`
    Activate,
    /// Anything else
    Other,
}

/// Data associated with a client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientMessageEvent {
    /// The window the message is about
    pub(crate) window:  Window,
    /// What is asked for
    pub(crate) request: ClientRequest,
}

/// Data associated with a crossing event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PointerEvent {
    /// The window that was entered
    pub(crate) window:   Window,
    /// Absolute position of the pointer
    pub(crate) root:     Point,
    /// A normal crossing into the window itself rather than a grab change or
    /// a move from a child
    pub(crate) relevant: bool,
}

/// Data associated with a button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ButtonEvent {
    /// The window the press happened in
    pub(crate) window: Window,
    /// Button number
    pub(crate) button: u8,
    /// Modifier state
    pub(crate) state:  u16,
    /// Absolute position of the pointer
    pub(crate) root:   Point,
    /// Position relative to `window`
    pub(crate) event:  Point,
}

/// Data associated with a motion event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MotionEvent {
    /// The window the pointer moved in
    pub(crate) window: Window,
    /// Absolute position of the pointer
    pub(crate) root:   Point,
    /// Server time of the event
    pub(crate) time:   Timestamp,
}

/// Data associated with a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyEvent {
    /// The key that was pressed
    pub(crate) keycode: Keycode,
    /// Modifier state
    pub(crate) state:   u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_actions() {
        assert_eq!(StateAction::from_value(2), Some(StateAction::Toggle));
        assert_eq!(StateAction::from_value(7), None);
        assert!(StateAction::Toggle.apply(false));
        assert!(!StateAction::Toggle.apply(true));
        assert!(StateAction::Add.apply(true));
        assert!(!StateAction::Remove.apply(true));
    }
}
