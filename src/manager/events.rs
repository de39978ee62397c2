//! Reactions to X-server events

use super::WindowManager;
use crate::{
    core::{
        bar::{self, BarHit, Click},
        Window,
    },
    x::{
        event::{
            ButtonEvent,
            ClientMessageEvent,
            ClientRequest,
            ConfigureEvent,
            KeyEvent,
            MotionEvent,
            PointerEvent,
            PropertyEvent,
            PropertyKind,
            UnmapEvent,
            XEvent,
        },
        property::IcccmWindowState,
        XConn,
    },
};
use anyhow::Result;

impl<X: XConn> WindowManager<X> {
    /// Handle one event. A pointer drag in progress sees the event first
    pub(crate) fn handle_event(&mut self, event: XEvent) -> Result<()> {
        log::trace!("received {}", event.name());

        if self.drag.is_some() {
            return self.handle_drag_event(event);
        }

        self.dispatch(event)
    }

    /// Route `event` to its handler
    pub(crate) fn dispatch(&mut self, event: XEvent) -> Result<()> {
        match event {
            XEvent::MapRequest(window) => self.map_request(window),
            XEvent::UnmapNotify(ev) => self.unmap_notify(ev),
            XEvent::DestroyNotify(window) =>
                if self.registry.contains(window) {
                    self.unmanage(window, true)
                } else {
                    Ok(())
                },
            XEvent::ConfigureRequest(req) => self.configure_request(&req),
            XEvent::ConfigureNotify(ev) => self.configure_notify(ev),
            XEvent::PropertyNotify(ev) => self.property_notify(ev),
            XEvent::ClientMessage(ev) => self.client_message(ev),
            XEvent::EnterNotify(ev) => self.enter_notify(ev),
            XEvent::FocusIn(window) => self.focus_in(window),
            XEvent::ButtonPress(ev) => self.button_press(ev),
            XEvent::MotionNotify(ev) => self.motion_notify(ev),
            XEvent::KeyPress(ev) => self.key_press(ev),
            XEvent::MappingNotify { keyboard } => {
                self.conn.refresh_keyboard()?;
                if keyboard {
                    self.grab_keys()?;
                }
                Ok(())
            },
            XEvent::Expose { window, count } => {
                if count == 0 {
                    let bar = self
                        .registry
                        .monitors
                        .iter()
                        .find(|(_, m)| m.bar == Some(window))
                        .map(|(idx, _)| idx);
                    if let Some(idx) = bar {
                        self.draw_bar(idx)?;
                    }
                }
                Ok(())
            },
            XEvent::ButtonRelease(_) | XEvent::Unknown(_) => Ok(()),
        }
    }

    // =========================== Windows ============================ [[[

    fn map_request(&mut self, window: Window) -> Result<()> {
        let info = match self.conn.window_info(window) {
            Some(info) => info,
            None => return Ok(()),
        };

        if info.override_redirect || self.registry.contains(window) {
            return Ok(());
        }

        self.manage(window, info)
    }

    fn unmap_notify(&mut self, ev: UnmapEvent) -> Result<()> {
        if !self.registry.contains(ev.window) {
            return Ok(());
        }

        if ev.synthetic {
            self.conn
                .set_window_state(ev.window, IcccmWindowState::Withdrawn)
        } else {
            self.unmanage(ev.window, false)
        }
    }

    /// Only the root window is of interest: its size follows the screens
    fn configure_notify(&mut self, ev: ConfigureEvent) -> Result<()> {
        if ev.window != self.conn.root() {
            return Ok(());
        }

        let resized = self.screen != ev.rect;
        self.screen = ev.rect;
        let dirty = self.update_geometry()?;

        if resized || dirty {
            log::info!("screen is now {}", self.screen);
            self.update_bars()?;

            let fullscreen = self
                .registry
                .monitors
                .iter()
                .flat_map(|(_, m)| m.clients.iter().map(move |w| (*w, m.screen)))
                .filter(|(w, _)| self.registry.client(*w).map_or(false, |c| c.is_fullscreen()))
                .collect::<Vec<_>>();
            for (window, screen) in fullscreen {
                self.resize_client(window, screen)?;
            }

            self.focus(None)?;
            self.arrange(None)?;
        }

        Ok(())
    }

    fn property_notify(&mut self, ev: PropertyEvent) -> Result<()> {
        if ev.window == self.conn.root() {
            if ev.kind == PropertyKind::Name {
                self.update_status();
                self.draw_bar(self.registry.selected)?;
            }
            return Ok(());
        }

        if ev.deleted || !self.registry.contains(ev.window) {
            return Ok(());
        }

        let window = ev.window;
        match ev.kind {
            PropertyKind::TransientFor => {
                let parent = self.conn.transient_for(window);
                let idx = self.registry.monitor_of(window);
                let tiled = self.registry.client(window).map_or(false, |c| !c.is_floating());
                if tiled && parent.map_or(false, |p| self.registry.contains(p)) {
                    if let Some(c) = self.registry.client_mut(window) {
                        c.set_floating(true);
                    }
                    self.arrange(idx)?;
                }
            },
            PropertyKind::NormalHints => self.update_size_hints(window),
            PropertyKind::Hints => {
                self.update_wm_hints(window)?;
                self.draw_bars()?;
            },
            PropertyKind::Name => {
                let title = self.conn.window_title(window);
                if let Some(c) = self.registry.client_mut(window) {
                    c.set_name(title);
                }
                if let Some(idx) = self.registry.monitor_of(window) {
                    if self.registry.monitor(idx).and_then(|m| m.selected) == Some(window) {
                        self.draw_bar(idx)?;
                    }
                }
            },
            PropertyKind::WindowType => self.update_window_type(window)?,
            PropertyKind::Other => {},
        }

        Ok(())
    }

    fn client_message(&mut self, ev: ClientMessageEvent) -> Result<()> {
        let current = match self.registry.client(ev.window) {
            Some(c) => c.is_fullscreen(),
            None => return Ok(()),
        };

        match ev.request {
            ClientRequest::Fullscreen(action) => self.set_fullscreen(ev.window, action.apply(current)),
            ClientRequest::Activate => {
                let urgent = self.registry.client(ev.window).map_or(false, |c| c.is_urgent());
                if self.registry.selected_client() != Some(ev.window) && !urgent {
                    log::debug!("Window({:#0x}) asked to be activated", ev.window);
                    self.set_urgent(ev.window, true)?;
                    self.draw_bars()?;
                }
                Ok(())
            },
            ClientRequest::Other => Ok(()),
        }
    }

    // ]]] === Windows ===

    // ============================ Pointer =========================== [[[

    /// Select the monitor `idx` when it is not selected yet, returning
    /// whether it changed
    fn select_monitor(&mut self, idx: usize) -> Result<bool> {
        if idx == self.registry.selected {
            return Ok(false);
        }

        if let Some(sel) = self.registry.selected_client() {
            self.unfocus(sel, true)?;
        }
        log::debug!("selecting monitor {}", idx);
        self.registry.selected = idx;
        Ok(true)
    }

    /// Focus follows the pointer
    fn enter_notify(&mut self, ev: PointerEvent) -> Result<()> {
        let root = self.conn.root();
        if !ev.relevant && ev.window != root {
            return Ok(());
        }

        let client = self.registry.contains(ev.window).then(|| ev.window);
        let idx = client
            .and_then(|w| self.registry.monitor_of(w))
            .unwrap_or_else(|| self.window_to_monitor(ev.window));

        if !self.select_monitor(idx)?
            && (client.is_none() || client == self.registry.selected_client())
        {
            return Ok(());
        }

        self.focus(client)
    }

    /// Some clients take focus on their own. Give it back to the selection
    fn focus_in(&mut self, window: Window) -> Result<()> {
        match self.registry.selected_client() {
            Some(sel) if sel != window => self.set_focus(sel),
            _ => Ok(()),
        }
    }

    fn button_press(&mut self, ev: ButtonEvent) -> Result<()> {
        let idx = self.window_to_monitor(ev.window);
        if self.select_monitor(idx)? {
            self.focus(None)?;
        }

        let mut clicked = 0;
        let click = if self.registry.monitor(idx).and_then(|m| m.bar) == Some(ev.window) {
            let (bar_width, hit) = match self.registry.monitor(idx) {
                Some(m) => {
                    let (occupied, _) = self.registry.occupancy(idx);
                    let cells = bar::tag_cells(
                        &self.settings.tags,
                        occupied,
                        m.selected_tags,
                        self.lrpad,
                        &|s| self.conn.text_width(s),
                    );
                    (
                        m.window.width,
                        bar::hit_test(ev.event.x, &cells, m.window.width, self.statusbar.width),
                    )
                },
                None => return Ok(()),
            };

            match hit {
                BarHit::Tag(mask) => {
                    clicked = mask;
                    Click::TagBar
                },
                BarHit::Status => {
                    let conn = &self.conn;
                    let offset = bar_width - self.statusbar.width;
                    self.statusbar
                        .record_click(ev.event.x - offset, &|s| conn.text_width(s));
                    Click::StatusText
                },
                BarHit::Title => Click::WinTitle,
            }
        } else if self.registry.contains(ev.window) {
            self.focus(Some(ev.window))?;
            self.restack(self.registry.selected)?;
            self.conn.replay_pointer()?;
            Click::ClientWin
        } else {
            Click::RootWin
        };

        let action = self
            .settings
            .bindings
            .find_button(click, ev.button, ev.state, self.conn.numlock_mask())
            .map(|action| action.with_clicked_tag(clicked));

        match action {
            Some(action) => self.run_action(&action),
            None => Ok(()),
        }
    }

    /// Moving the pointer across the root window switches monitors
    fn motion_notify(&mut self, ev: MotionEvent) -> Result<()> {
        if ev.window != self.conn.root() {
            return Ok(());
        }

        let idx = self.monitor_at(ev.root);
        if self.motion_monitor.map_or(false, |last| last != idx) && self.select_monitor(idx)? {
            self.focus(None)?;
        }
        self.motion_monitor = Some(idx);

        Ok(())
    }

    // ]]] === Pointer ===

    fn key_press(&mut self, ev: KeyEvent) -> Result<()> {
        let keysym = self.conn.keysym(ev.keycode);
        let action = self
            .settings
            .bindings
            .find_key(self.modes.current(), keysym, ev.state, self.conn.numlock_mask())
            .cloned();

        match action {
            Some(action) => self.run_action(&action),
            None => {
                log::trace!("no binding for keysym {:#x} in mode {}", keysym, self.modes.current());
                Ok(())
            },
        }
    }
}
