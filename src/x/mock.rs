//! A fake X-server that records every request it receives

use super::{
    event::{ConfigureRequestData, XEvent},
    input::Button,
    property::{Hints, IcccmWindowState, Protocol, SizeHints},
    WindowInfo,
    XConn,
};
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
use anyhow::{anyhow, Result};
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
};
use x11rb::protocol::xproto::Keycode;

/// Width of every character in the fake font
pub(crate) const CHAR_WIDTH: i32 = 10;

/// Height of the fake font
pub(crate) const FONT_HEIGHT: i32 = 10;

/// The root window of the fake server
pub(crate) const ROOT: Window = 0x3e8;

/// A request received by the [`MockConn`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    Configure(Window, Rectangle, i32),
    ConfigureUnmanaged(Window),
    ConfigureNotify(Window, Rectangle, i32),
    Move(Window, Point),
    BorderWidth(Window, i32),
    BorderColor(Window, Color),
    Raise(Window),
    StackBelow(Window, Window),
    Map(Window),
    SelectEvents(Window),
    WindowState(Window, IcccmWindowState),
    Fullscreen(Window, bool),
    ClearUrgency(Window),
    Focus(Window),
    FocusRoot,
    Protocol(Window, Protocol),
    Kill(Window),
    AppendClientList(Window),
    ClientList(Vec<Window>),
    GrabServer,
    UngrabServer,
    GrabKeys(Vec<KeyChord>),
    GrabButtons(Window, bool),
    UngrabButtons(Window),
    GrabPointer(CursorKind),
    UngrabPointer,
    Warp(Window, Point),
    ReplayPointer,
    CreateBar(Window, Rectangle),
    Destroy(Window),
    DrawBar(Window, Vec<DrawOp>),
}

/// A window known to the fake server
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MockWindow {
    pub(crate) info:         WindowInfo,
    pub(crate) title:        Option<String>,
    pub(crate) class:        Option<(String, String)>,
    pub(crate) size_hints:   Option<SizeHints>,
    pub(crate) hints:        Option<Hints>,
    pub(crate) transient:    Option<Window>,
    pub(crate) fullscreen:   bool,
    pub(crate) dialog:       bool,
    pub(crate) protocols:    Vec<Protocol>,
    pub(crate) state:        Option<IcccmWindowState>,
}

impl MockWindow {
    /// A viewable window at `rect` without any properties
    pub(crate) fn new(rect: Rectangle) -> Self {
        Self {
            info:       WindowInfo {
                rect,
                border_width: 0,
                override_redirect: false,
                viewable: true,
            },
            title:      None,
            class:      None,
            size_hints: None,
            hints:      None,
            transient:  None,
            fullscreen: false,
            dialog:     false,
            protocols:  Vec::new(),
            state:      None,
        }
    }

    pub(crate) fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub(crate) fn classed(mut self, instance: &str, class: &str) -> Self {
        self.class = Some((instance.to_string(), class.to_string()));
        self
    }
}

/// Fake X-server
#[derive(Debug)]
pub(crate) struct MockConn {
    /// The whole virtual screen
    pub(crate) screen:        Rectangle,
    /// Physical screens reported
    pub(crate) screens:       RefCell<Vec<Rectangle>>,
    /// Windows that exist on the server
    pub(crate) windows:       RefCell<HashMap<Window, MockWindow>>,
    /// Events handed out by [`XConn::next_event`]
    pub(crate) events:        RefCell<VecDeque<XEvent>>,
    /// Every request, in order
    pub(crate) requests:      RefCell<Vec<Request>>,
    /// Pointer position
    pub(crate) pointer:       Cell<Point>,
    /// Name of the root window
    pub(crate) root_name:     RefCell<Option<String>>,
    /// Keycode to keysym mapping
    pub(crate) keymap:        RefCell<HashMap<Keycode, Keysym>>,
    /// Whether pointer grabs succeed
    pub(crate) grab_succeeds: Cell<bool>,
    /// Next id handed to a created window
    next_id:                  Cell<Window>,
}

impl MockConn {
    /// A server with one screen covering `screen`
    pub(crate) fn new(screen: Rectangle) -> Self {
        Self {
            screen,
            screens: RefCell::new(vec![screen]),
            windows: RefCell::new(HashMap::new()),
            events: RefCell::new(VecDeque::new()),
            requests: RefCell::new(Vec::new()),
            pointer: Cell::new(Point::new(0, 0)),
            root_name: RefCell::new(None),
            keymap: RefCell::new(HashMap::new()),
            grab_succeeds: Cell::new(true),
            next_id: Cell::new(0x100_0000),
        }
    }

    pub(crate) fn add_window(&self, window: Window, mock: MockWindow) {
        self.windows.borrow_mut().insert(window, mock);
    }

    pub(crate) fn push_event(&self, event: XEvent) {
        self.events.borrow_mut().push_back(event);
    }

    /// Requests received so far, clearing the log
    pub(crate) fn take_requests(&self) -> Vec<Request> {
        self.requests.borrow_mut().drain(..).collect()
    }

    /// Whether a request matching `pred` was received since the last
    /// [`MockConn::take_requests`]
    pub(crate) fn received(&self, pred: impl Fn(&Request) -> bool) -> bool {
        self.requests.borrow().iter().any(pred)
    }

    /// Number of reconfigurations of `window`
    pub(crate) fn configures_of(&self, window: Window) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| matches!(r, Request::Configure(w, ..) if *w == window))
            .count()
    }

    fn record(&self, request: Request) -> Result<()> {
        self.requests.borrow_mut().push(request);
        Ok(())
    }

    fn with_window<T>(&self, window: Window, f: impl FnOnce(&MockWindow) -> Option<T>) -> Option<T> {
        self.windows.borrow().get(&window).and_then(f)
    }
}

impl XConn for MockConn {
    fn root(&self) -> Window {
        ROOT
    }

    fn screen_rect(&self) -> Rectangle {
        self.screen
    }

    fn screens(&self) -> Vec<Rectangle> {
        self.screens.borrow().clone()
    }

    fn become_wm(&self) -> Result<()> {
        Ok(())
    }

    fn init_wm(&self) -> Result<()> {
        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    fn font_height(&self) -> i32 {
        FONT_HEIGHT
    }

    fn text_width(&self, text: &str) -> i32 {
        text.chars().count() as i32 * CHAR_WIDTH
    }

    fn next_event(&self) -> Result<XEvent> {
        self.events
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no more events"))
    }

    fn flush(&self) {}

    fn drop_enter_events(&self) -> Result<()> {
        self.events
            .borrow_mut()
            .retain(|e| !matches!(e, XEvent::EnterNotify(_)));
        Ok(())
    }

    fn top_level_windows(&self) -> Result<Vec<Window>> {
        let mut windows = self.windows.borrow().keys().copied().collect::<Vec<_>>();
        windows.sort_unstable();
        Ok(windows)
    }

    fn window_info(&self, window: Window) -> Option<WindowInfo> {
        self.with_window(window, |w| Some(w.info))
    }

    fn window_state(&self, window: Window) -> Option<IcccmWindowState> {
        self.with_window(window, |w| w.state)
    }

    fn window_title(&self, window: Window) -> Option<String> {
        self.with_window(window, |w| w.title.clone())
    }

    fn root_name(&self) -> Option<String> {
        self.root_name.borrow().clone()
    }

    fn window_class(&self, window: Window) -> Option<(String, String)> {
        self.with_window(window, |w| w.class.clone())
    }

    fn size_hints(&self, window: Window) -> Option<SizeHints> {
        self.with_window(window, |w| w.size_hints)
    }

    fn hints(&self, window: Window) -> Option<Hints> {
        self.with_window(window, |w| w.hints)
    }

    fn transient_for(&self, window: Window) -> Option<Window> {
        self.with_window(window, |w| w.transient)
    }

    fn requests_fullscreen(&self, window: Window) -> bool {
        self.with_window(window, |w| Some(w.fullscreen))
            .unwrap_or(false)
    }

    fn is_dialog(&self, window: Window) -> bool {
        self.with_window(window, |w| Some(w.dialog)).unwrap_or(false)
    }

    fn supports_protocol(&self, window: Window, protocol: Protocol) -> bool {
        self.with_window(window, |w| Some(w.protocols.contains(&protocol)))
            .unwrap_or(false)
    }

    fn query_pointer(&self) -> Option<Point> {
        Some(self.pointer.get())
    }

    fn keysym(&self, keycode: Keycode) -> Keysym {
        self.keymap.borrow().get(&keycode).copied().unwrap_or(0)
    }

    fn numlock_mask(&self) -> u16 {
        0x10
    }

    fn refresh_keyboard(&self) -> Result<()> {
        Ok(())
    }

    fn configure_window(&self, window: Window, rect: Rectangle, border_width: i32) -> Result<()> {
        self.record(Request::Configure(window, rect, border_width))
    }

    fn configure_unmanaged(&self, request: &ConfigureRequestData) -> Result<()> {
        self.record(Request::ConfigureUnmanaged(request.window))
    }

    fn send_configure_notify(
        &self,
        window: Window,
        rect: Rectangle,
        border_width: i32,
    ) -> Result<()> {
        self.record(Request::ConfigureNotify(window, rect, border_width))
    }

    fn move_window(&self, window: Window, point: Point) -> Result<()> {
        self.record(Request::Move(window, point))
    }

    fn set_border_width(&self, window: Window, width: i32) -> Result<()> {
        self.record(Request::BorderWidth(window, width))
    }

    fn set_border_color(&self, window: Window, color: Color) -> Result<()> {
        self.record(Request::BorderColor(window, color))
    }

    fn raise_window(&self, window: Window) -> Result<()> {
        self.record(Request::Raise(window))
    }

    fn stack_below(&self, window: Window, sibling: Window) -> Result<()> {
        self.record(Request::StackBelow(window, sibling))
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.record(Request::Map(window))
    }

    fn select_client_events(&self, window: Window) -> Result<()> {
        self.record(Request::SelectEvents(window))
    }

    fn set_window_state(&self, window: Window, state: IcccmWindowState) -> Result<()> {
        if let Some(w) = self.windows.borrow_mut().get_mut(&window) {
            w.state = Some(state);
        }
        self.record(Request::WindowState(window, state))
    }

    fn set_fullscreen_state(&self, window: Window, fullscreen: bool) -> Result<()> {
        self.record(Request::Fullscreen(window, fullscreen))
    }

    fn clear_urgency(&self, window: Window) -> Result<()> {
        self.record(Request::ClearUrgency(window))
    }

    fn focus_window(&self, window: Window) -> Result<()> {
        self.record(Request::Focus(window))
    }

    fn focus_root(&self) -> Result<()> {
        self.record(Request::FocusRoot)
    }

    fn send_protocol(&self, window: Window, protocol: Protocol) -> Result<bool> {
        if self.supports_protocol(window, protocol) {
            self.record(Request::Protocol(window, protocol))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn kill_client(&self, window: Window) -> Result<()> {
        self.record(Request::Kill(window))
    }

    fn append_client_list(&self, window: Window) -> Result<()> {
        self.record(Request::AppendClientList(window))
    }

    fn set_client_list(&self, windows: &[Window]) -> Result<()> {
        self.record(Request::ClientList(windows.to_vec()))
    }

    fn grab_server(&self) -> Result<()> {
        self.record(Request::GrabServer)
    }

    fn ungrab_server(&self) -> Result<()> {
        self.record(Request::UngrabServer)
    }

    fn grab_keys(&self, chords: &[KeyChord]) -> Result<()> {
        self.record(Request::GrabKeys(chords.to_vec()))
    }

    fn grab_buttons(&self, window: Window, focused: bool, _: &[(u16, Button)]) -> Result<()> {
        self.record(Request::GrabButtons(window, focused))
    }

    fn ungrab_buttons(&self, window: Window) -> Result<()> {
        self.record(Request::UngrabButtons(window))
    }

    fn grab_pointer(&self, cursor: CursorKind) -> Result<bool> {
        self.record(Request::GrabPointer(cursor))?;
        Ok(self.grab_succeeds.get())
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.record(Request::UngrabPointer)
    }

    fn warp_pointer(&self, window: Window, point: Point) -> Result<()> {
        self.record(Request::Warp(window, point))
    }

    fn replay_pointer(&self) -> Result<()> {
        self.record(Request::ReplayPointer)
    }

    fn create_bar(&self, rect: Rectangle) -> Result<Window> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.record(Request::CreateBar(id, rect))?;
        Ok(id)
    }

    fn destroy_window(&self, window: Window) -> Result<()> {
        self.windows.borrow_mut().remove(&window);
        self.record(Request::Destroy(window))
    }

    fn draw_bar(&self, bar: Window, _: i32, _: i32, ops: &[DrawOp], _: &Schemes) -> Result<()> {
        self.record(Request::DrawBar(bar, ops.to_vec()))
    }
}
