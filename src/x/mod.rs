//! The seam between the window manager and the X-server
//!
//! [`XConn`] is every request and query the window manager makes. The
//! [`XConnection`](xconnection::XConnection) implements it on top of `x11rb`,
//! the [`MockConn`](mock::MockConn) records requests for tests

pub(crate) mod event;
pub(crate) mod input;
pub(crate) mod keysym;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod property;
pub(crate) mod xconnection;

use crate::{
    core::{
        bar::DrawOp,
        bindings::KeyChord,
        decoration::{Color, Schemes},
        CursorKind,
        Keysym,
        Window,
    },
    geometry::{Point, Rectangle},
};
use anyhow::Result;
use event::{ConfigureRequestData, XEvent};
use input::Button;
use property::{Hints, IcccmWindowState, Protocol, SizeHints};
use x11rb::protocol::xproto::Keycode;

/// Attributes and geometry of an existing window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowInfo {
    /// Geometry, border excluded
    pub(crate) rect:              Rectangle,
    /// Border width
    pub(crate) border_width:      i32,
    /// The window opted out of being managed
    pub(crate) override_redirect: bool,
    /// The window is mapped and all its ancestors are
    pub(crate) viewable:          bool,
}

/// Requests and queries the window manager makes to the X-server
///
/// Requests on windows that vanished in the meantime are expected; they are
/// not reported as errors
pub(crate) trait XConn {
    // ========================= Setup ========================= [[[

    /// The root window
    fn root(&self) -> Window;
    /// Area of the whole virtual screen
    fn screen_rect(&self) -> Rectangle;
    /// Unique physical screens; empty when multi-head is not active
    fn screens(&self) -> Vec<Rectangle>;
    /// Redirect the root window's substructure, failing when another window
    /// manager holds it
    fn become_wm(&self) -> Result<()>;
    /// Publish the supported hints and select the root window's events
    fn init_wm(&self) -> Result<()>;
    /// Release everything [`XConn::init_wm`] set up
    fn cleanup(&self) -> Result<()>;
    /// Height of the loaded font
    fn font_height(&self) -> i32;
    /// Width of `text` in the loaded font
    fn text_width(&self, text: &str) -> i32;

    // ]]] === Setup ===

    // ======================== Events ========================= [[[

    /// Block until the next event
    fn next_event(&self) -> Result<XEvent>;
    /// Send every buffered request
    fn flush(&self);
    /// Wait for the server to process every request and drop the crossing
    /// events it generated
    fn drop_enter_events(&self) -> Result<()>;

    // ]]] === Events ===

    // ======================== Queries ======================== [[[

    /// Children of the root window, bottom to top
    fn top_level_windows(&self) -> Result<Vec<Window>>;
    fn window_info(&self, window: Window) -> Option<WindowInfo>;
    /// The `WM_STATE` of `window`
    fn window_state(&self, window: Window) -> Option<IcccmWindowState>;
    /// `_NET_WM_NAME`, falling back to `WM_NAME`
    fn window_title(&self, window: Window) -> Option<String>;
    /// `WM_NAME` of the root window
    fn root_name(&self) -> Option<String>;
    /// Instance and class from `WM_CLASS`
    fn window_class(&self, window: Window) -> Option<(String, String)>;
    fn size_hints(&self, window: Window) -> Option<SizeHints>;
    fn hints(&self, window: Window) -> Option<Hints>;
    fn transient_for(&self, window: Window) -> Option<Window>;
    /// `_NET_WM_STATE` contains `_NET_WM_STATE_FULLSCREEN`
    fn requests_fullscreen(&self, window: Window) -> bool;
    /// `_NET_WM_WINDOW_TYPE` is `_NET_WM_WINDOW_TYPE_DIALOG`
    fn is_dialog(&self, window: Window) -> bool;
    fn supports_protocol(&self, window: Window, protocol: Protocol) -> bool;
    /// Position of the pointer on the root window
    fn query_pointer(&self) -> Option<Point>;
    /// Keysym in the first column of the keyboard mapping
    fn keysym(&self, keycode: Keycode) -> Keysym;
    /// Modifier bit NumLock is mapped to
    fn numlock_mask(&self) -> u16;
    /// Reload the keyboard and modifier mappings
    fn refresh_keyboard(&self) -> Result<()>;

    // ]]] === Queries ===

    // ======================= Requests ======================== [[[

    fn configure_window(&self, window: Window, rect: Rectangle, border_width: i32) -> Result<()>;
    /// Grant a configure request exactly as asked
    fn configure_unmanaged(&self, request: &ConfigureRequestData) -> Result<()>;
    /// Tell a client its geometry without changing it
    fn send_configure_notify(&self, window: Window, rect: Rectangle, border_width: i32)
        -> Result<()>;
    fn move_window(&self, window: Window, point: Point) -> Result<()>;
    fn set_border_width(&self, window: Window, width: i32) -> Result<()>;
    fn set_border_color(&self, window: Window, color: Color) -> Result<()>;
    fn raise_window(&self, window: Window) -> Result<()>;
    /// Stack `window` directly below `sibling`
    fn stack_below(&self, window: Window, sibling: Window) -> Result<()>;
    fn map_window(&self, window: Window) -> Result<()>;
    /// Listen to the events of a managed window
    fn select_client_events(&self, window: Window) -> Result<()>;
    fn set_window_state(&self, window: Window, state: IcccmWindowState) -> Result<()>;
    /// Rewrite `_NET_WM_STATE` for the fullscreen state
    fn set_fullscreen_state(&self, window: Window, fullscreen: bool) -> Result<()>;
    /// Drop the urgency bit from `WM_HINTS`
    fn clear_urgency(&self, window: Window) -> Result<()>;
    /// Give input focus to `window` and mark it active
    fn focus_window(&self, window: Window) -> Result<()>;
    /// Give input focus back to the root window and clear the active window
    fn focus_root(&self) -> Result<()>;
    /// Send `protocol` when the client supports it, reporting whether it did
    fn send_protocol(&self, window: Window, protocol: Protocol) -> Result<bool>;
    /// Destroy the client owning `window`
    fn kill_client(&self, window: Window) -> Result<()>;
    fn append_client_list(&self, window: Window) -> Result<()>;
    fn set_client_list(&self, windows: &[Window]) -> Result<()>;
    fn grab_server(&self) -> Result<()>;
    fn ungrab_server(&self) -> Result<()>;

    // ]]] === Requests ===

    // ======================== Input ========================== [[[

    /// Replace every key grab on the root window with `chords`
    fn grab_keys(&self, chords: &[KeyChord]) -> Result<()>;
    /// Replace the button grabs on `window`. Unfocused windows also get a
    /// grab on every button so a click focuses them
    fn grab_buttons(&self, window: Window, focused: bool, buttons: &[(u16, Button)]) -> Result<()>;
    fn ungrab_buttons(&self, window: Window) -> Result<()>;
    /// Grab the pointer showing `cursor`, reporting whether it succeeded
    fn grab_pointer(&self, cursor: CursorKind) -> Result<bool>;
    fn ungrab_pointer(&self) -> Result<()>;
    /// Move the pointer to `point` relative to `window`
    fn warp_pointer(&self, window: Window, point: Point) -> Result<()>;
    /// Let a frozen button press through to the client
    fn replay_pointer(&self) -> Result<()>;

    // ]]] === Input ===

    // ========================= Bars ========================== [[[

    /// Create a bar window covering `rect`
    fn create_bar(&self, rect: Rectangle) -> Result<Window>;
    fn destroy_window(&self, window: Window) -> Result<()>;
    /// Render `ops` on `bar`
    fn draw_bar(
        &self,
        bar: Window,
        width: i32,
        height: i32,
        ops: &[DrawOp],
        schemes: &Schemes,
    ) -> Result<()>;

    // ]]] === Bars ===
}
