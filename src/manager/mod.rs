//! The window manager: every client and monitor, the reactions to events and
//! the actions bindings trigger
//!
//! [`WindowManager`] is generic over [`XConn`], so the same code runs against
//! the X-server and against the recording mock in the tests

mod actions;
mod arrange;
mod drag;
mod events;
mod focus;
mod manage;

use crate::{
    config::Settings,
    core::{bar::BarState, bar::Title, mode::ModeStack, Window},
    geometry::{Point, Rectangle},
    monitor::registry::Registry,
    process,
    statusbar::StatusBar,
    x::{event::XEvent, property::IcccmWindowState, XConn},
    WM_NAME,
};
use anyhow::{Context, Result};
use drag::Drag;
use std::collections::VecDeque;

// ========================== WindowManager =========================== [[[

/// The window-manager context threaded through every handler
pub(crate) struct WindowManager<X: XConn> {
    /// Connection to the X-server
    pub(crate) conn: X,
    /// Resolved configuration
    settings:        Settings,
    /// Clients and monitors
    registry:        Registry,
    /// Active input modes
    modes:           ModeStack,
    /// Status text shown on the selected monitor
    statusbar:       StatusBar,
    /// Height of the bars
    bar_height:      i32,
    /// Horizontal text padding in the bars
    lrpad:           i32,
    /// Area of the whole virtual screen
    screen:          Rectangle,
    /// Current gap between tiled windows
    gap:             i32,
    /// Pointer drag in progress
    drag:            Option<Drag>,
    /// Events that arrived during a drag, replayed once it ends
    deferred:        VecDeque<XEvent>,
    /// Monitor the pointer was last seen on
    motion_monitor:  Option<usize>,
    /// Cleared by the `quit` action
    running:         bool,
}

impl<X: XConn> WindowManager<X> {
    /// Create the window manager. Nothing is requested from the server until
    /// [`WindowManager::run`]
    pub(crate) fn new(conn: X, settings: Settings) -> Self {
        let font_height = conn.font_height();
        let screen = conn.screen_rect();
        let statusbar = StatusBar::new(&settings.status_program);
        let gap = settings.gap;

        Self {
            conn,
            settings,
            registry: Registry::new(),
            modes: ModeStack::new(),
            statusbar,
            bar_height: font_height + 10,
            lrpad: font_height,
            screen,
            gap,
            drag: None,
            deferred: VecDeque::new(),
            motion_monitor: None,
            running: true,
        }
    }

    /// Take over the display, manage the existing windows and handle events
    /// until `quit`
    pub(crate) fn run(&mut self) -> Result<()> {
        self.conn.become_wm()?;
        process::install_child_reaper().context("failed to install SIGCHLD handler")?;
        self.initialize()?;
        self.scan()?;
        self.conn.flush();
        log::info!("{} is managing {} windows", WM_NAME!(), self.registry.len());

        while self.running {
            let event = self.conn.next_event()?;
            self.handle_event(event)?;
            self.conn.flush();
        }

        self.shutdown()
    }

    /// Build the monitors and bars, publish the supported hints and grab the
    /// keys of the base mode
    fn initialize(&mut self) -> Result<()> {
        self.update_geometry()?;
        self.update_bars()?;
        self.update_status();
        self.conn.init_wm()?;
        self.grab_keys()?;
        self.focus(None)
    }

    /// Manage the windows that existed before startup. Transient windows go
    /// last so their parents are known
    fn scan(&mut self) -> Result<()> {
        let mut transients = vec![];

        for window in self.conn.top_level_windows()? {
            let info = match self.conn.window_info(window) {
                Some(info) if !info.override_redirect => info,
                _ => continue,
            };
            let iconic = self.conn.window_state(window) == Some(IcccmWindowState::Iconic);
            if !(info.viewable || iconic) || self.registry.contains(window) {
                continue;
            }

            if self.conn.transient_for(window).is_some() {
                transients.push((window, info));
            } else {
                self.manage(window, info)?;
            }
        }

        for (window, info) in transients {
            self.manage(window, info)?;
        }

        Ok(())
    }

    /// Give every window back to the server
    fn shutdown(&mut self) -> Result<()> {
        log::info!("shutting down");
        self.view(self.settings.tag_mask)?;

        for idx in self.registry.monitors.indices() {
            let stack = self
                .registry
                .monitor(idx)
                .map(|m| m.stack.clone())
                .unwrap_or_default();
            for window in stack {
                self.unmanage(window, false)?;
            }
        }

        let bars = self
            .registry
            .monitors
            .iter()
            .filter_map(|(_, m)| m.bar)
            .collect::<Vec<_>>();
        for bar in bars {
            self.conn.destroy_window(bar)?;
        }

        self.conn.cleanup()
    }

    // ============================ Monitors ========================== [[[

    /// Reconcile the monitors with the physical screens, returning whether
    /// anything changed
    pub(crate) fn update_geometry(&mut self) -> Result<bool> {
        let screens = self.conn.screens();
        let result = self.registry.reconcile(
            &screens,
            self.screen,
            &self.settings.monitor,
            self.bar_height,
        );

        for removed in &result.removed {
            if let Some(bar) = removed.bar {
                self.conn.destroy_window(bar)?;
            }
        }

        if result.dirty {
            log::debug!(
                "monitors changed: {} created, {} removed",
                result.created.len(),
                result.removed.len()
            );
            if let Some(pointer) = self.conn.query_pointer() {
                self.registry.selected = self
                    .registry
                    .monitors
                    .from_rect(&Rectangle::new(pointer.x, pointer.y, 1, 1), self.registry.selected);
            }
        }

        Ok(result.dirty)
    }

    /// Rectangle of the bar of monitor `idx`
    fn bar_rect(&self, idx: usize) -> Option<Rectangle> {
        self.registry
            .monitor(idx)
            .map(|m| Rectangle::new(m.window.x, m.bar_y, m.window.width, self.bar_height))
    }

    /// Create the bars of monitors that have none and move the others into
    /// place
    pub(crate) fn update_bars(&mut self) -> Result<()> {
        for idx in self.registry.monitors.indices() {
            let rect = match self.bar_rect(idx) {
                Some(rect) => rect,
                None => continue,
            };

            match self.registry.monitor(idx).and_then(|m| m.bar) {
                Some(bar) => self.conn.configure_window(bar, rect, 0)?,
                None => {
                    let bar = self.conn.create_bar(rect)?;
                    log::debug!("created bar Window({:#0x}) for monitor {}", bar, idx);
                    if let Some(m) = self.registry.monitor_mut(idx) {
                        m.bar = Some(bar);
                    }
                },
            }
        }

        Ok(())
    }

    /// Index of the monitor owning `window`, which may be a bar, a client or
    /// the root window
    pub(crate) fn window_to_monitor(&self, window: Window) -> usize {
        if window == self.conn.root() {
            if let Some(pointer) = self.conn.query_pointer() {
                return self.monitor_at(pointer);
            }
        }

        self.registry
            .monitors
            .iter()
            .find(|(_, m)| m.bar == Some(window))
            .map(|(idx, _)| idx)
            .or_else(|| self.registry.monitor_of(window))
            .unwrap_or(self.registry.selected)
    }

    /// Monitor whose window area contains `point`
    pub(crate) fn monitor_at(&self, point: Point) -> usize {
        self.registry
            .monitors
            .from_rect(&Rectangle::new(point.x, point.y, 1, 1), self.registry.selected)
    }

    // ]]] === Monitors ===

    // ============================== Bar ============================= [[[

    /// Read the status text from the root window's name
    pub(crate) fn update_status(&mut self) {
        let conn = &self.conn;
        self.statusbar
            .set_text(conn.root_name(), &|s| conn.text_width(s));
    }

    /// Redraw the bar of monitor `idx`
    pub(crate) fn draw_bar(&self, idx: usize) -> Result<()> {
        let m = match self.registry.monitor(idx) {
            Some(m) => m,
            None => return Ok(()),
        };
        let bar = match m.bar {
            Some(bar) if m.show_bar => bar,
            _ => return Ok(()),
        };

        let (occupied, urgent) = self.registry.occupancy(idx);
        let title = m.selected.and_then(|w| self.registry.client(w)).map(|c| Title {
            name:     &c.name,
            floating: c.is_floating(),
            fixed:    c.is_fixed(),
        });

        let state = BarState {
            width: m.window.width,
            height: self.bar_height,
            lrpad: self.lrpad,
            font_height: self.conn.font_height(),
            tags: &self.settings.tags,
            occupied,
            urgent,
            selected: m.selected_tags,
            status: &self.statusbar,
            draw_status: idx == self.registry.selected,
            mode_label: self.modes.current().label(),
            title,
        };

        let ops = crate::core::bar::plan(&state, &|s| self.conn.text_width(s));
        self.conn
            .draw_bar(bar, state.width, state.height, &ops, &self.settings.schemes)
            .context(format!("failed to draw bar of monitor {}", idx))
    }

    /// Redraw every bar
    pub(crate) fn draw_bars(&self) -> Result<()> {
        for idx in self.registry.monitors.indices() {
            self.draw_bar(idx)?;
        }
        Ok(())
    }

    // ]]] === Bar ===

    /// Grab the keys of the active mode
    pub(crate) fn grab_keys(&self) -> Result<()> {
        let chords = self
            .settings
            .bindings
            .keys(self.modes.current())
            .iter()
            .map(|b| b.chord)
            .collect::<Vec<_>>();
        log::debug!("grabbing {} keys of mode {}", chords.len(), self.modes.current());
        self.conn.grab_keys(&chords)
    }
} // ]]] === WindowManager ===

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use crate::x::mock::{MockConn, MockWindow};

    /// Screen of the mock server
    pub(crate) const SCREEN: Rectangle = Rectangle::new(0, 0, 1000, 500);

    /// Built-in settings without a bar, border or rules, so the window area
    /// is the whole screen
    pub(crate) fn settings() -> Settings {
        let mut settings = Settings::builtin();
        settings.monitor.show_bar = false;
        settings.gap = 10;
        settings.border_width = 0;
        settings.rules.clear();
        settings
    }

    /// An initialized manager over a fresh mock server, with the request log
    /// cleared
    pub(crate) fn manager_with(settings: Settings) -> WindowManager<MockConn> {
        let mut wm = WindowManager::new(MockConn::new(SCREEN), settings);
        wm.initialize().expect("initializes");
        wm.conn.take_requests();
        wm
    }

    pub(crate) fn manager() -> WindowManager<MockConn> {
        manager_with(settings())
    }

    /// Let the manager handle a map request for a new window
    pub(crate) fn map(wm: &mut WindowManager<MockConn>, window: Window, mock: MockWindow) {
        wm.conn.add_window(window, mock);
        wm.handle_event(XEvent::MapRequest(window)).expect("handles map request");
    }

    /// Map a plain window
    pub(crate) fn map_plain(wm: &mut WindowManager<MockConn>, window: Window) {
        map(wm, window, MockWindow::new(Rectangle::new(10, 10, 200, 100)));
    }

    pub(crate) fn assert_invariants(wm: &WindowManager<MockConn>) {
        if let Err(e) = wm.registry.check_invariants(wm.settings.tag_mask) {
            panic!("invariant violated: {}", e);
        }
    }

    /// Last geometry `window` was configured with
    pub(crate) fn last_configure(wm: &WindowManager<MockConn>, window: Window) -> Option<Rectangle> {
        wm.conn.requests.borrow().iter().rev().find_map(|r| match r {
            crate::x::mock::Request::Configure(w, rect, _) if *w == window => Some(*rect),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::*;
    use super::*;
    use crate::x::mock::{MockConn, MockWindow, Request};

    #[test]
    fn initialize_creates_one_monitor_and_its_bar() {
        let mut settings = settings();
        settings.monitor.show_bar = true;
        let wm = manager_with(settings);

        assert_eq!(wm.registry.monitors.valid_count(), 1);
        let m = wm.registry.selected_monitor().expect("selected monitor");
        assert!(m.bar.is_some());
        assert_eq!(m.window, Rectangle::new(0, 20, 1000, 480));
        assert_eq!(wm.bar_rect(0), Some(Rectangle::new(0, 0, 1000, 20)));
    }

    #[test]
    fn scan_manages_viewable_windows_with_transients_last() {
        let conn = MockConn::new(SCREEN);
        conn.add_window(2, MockWindow::new(Rectangle::new(0, 0, 100, 100)));
        let mut dialog = MockWindow::new(Rectangle::new(0, 0, 50, 50));
        dialog.transient = Some(2);
        conn.add_window(1, dialog);
        let mut hidden = MockWindow::new(Rectangle::new(0, 0, 50, 50));
        hidden.info.viewable = false;
        conn.add_window(3, hidden);
        let mut popup = MockWindow::new(Rectangle::new(0, 0, 50, 50));
        popup.info.override_redirect = true;
        conn.add_window(4, popup);

        let mut wm = WindowManager::new(conn, settings());
        wm.initialize().expect("initializes");
        wm.scan().expect("scans");

        assert_eq!(wm.registry.len(), 2);
        assert!(!wm.registry.contains(3));
        assert!(!wm.registry.contains(4));
        // the transient follows its parent's monitor and floats
        let dialog = wm.registry.client(1).expect("managed");
        assert!(dialog.is_floating());
        assert_eq!(wm.registry.client_list(), vec![1, 2]);
        assert_invariants(&wm);
    }

    #[test]
    fn status_text_falls_back_to_version() {
        let mut wm = manager();
        assert_eq!(wm.statusbar.text, crate::core::default_status());

        *wm.conn.root_name.borrow_mut() = Some(String::from("cpu 3%"));
        wm.update_status();
        assert_eq!(wm.statusbar.text, "cpu 3%");
        assert_eq!(wm.statusbar.width, 6 * 10 + 2);
    }

    #[test]
    fn bars_are_only_drawn_when_shown() {
        let wm = manager();
        wm.draw_bars().expect("draws");
        assert!(!wm.conn.received(|r| matches!(r, Request::DrawBar(..))));

        let mut settings = settings();
        settings.monitor.show_bar = true;
        let wm = manager_with(settings);
        wm.draw_bars().expect("draws");
        assert!(wm.conn.received(|r| matches!(r, Request::DrawBar(..))));
    }

    #[test]
    fn shutdown_releases_every_client() {
        let mut wm = manager();
        map_plain(&mut wm, 10);
        map_plain(&mut wm, 11);
        wm.shutdown().expect("shuts down");

        assert_eq!(wm.registry.len(), 0);
        assert!(wm.conn.received(|r| *r == Request::WindowState(10, IcccmWindowState::Withdrawn)));
        assert!(wm.conn.received(|r| *r == Request::WindowState(11, IcccmWindowState::Withdrawn)));
    }
}
