//! Input focus, borders and urgency

use super::WindowManager;
use crate::{
    core::Window,
    x::{property::Protocol, XConn},
};
use anyhow::{Context, Result};

impl<X: XConn> WindowManager<X> {
    /// Focus `target`, or the most recently focused visible client of the
    /// selected monitor when `target` is missing or hidden
    pub(crate) fn focus(&mut self, target: Option<Window>) -> Result<()> {
        let target = target
            .filter(|w| self.registry.is_visible(*w))
            .or_else(|| self.registry.first_visible_in_stack(self.registry.selected));

        if let Some(current) = self.registry.selected_client() {
            if Some(current) != target {
                self.unfocus(current, false)?;
            }
        }

        match target {
            Some(window) => {
                if let Some(idx) = self.registry.monitor_of(window) {
                    if idx != self.registry.selected {
                        log::debug!("selecting monitor {}", idx);
                        self.registry.selected = idx;
                    }
                }

                if self.registry.client(window).map_or(false, |c| c.is_urgent()) {
                    self.set_urgent(window, false)?;
                }

                self.registry.detach_stack(window);
                self.registry.attach_stack(window);
                self.grab_buttons(window, true)?;
                self.conn
                    .set_border_color(window, self.settings.schemes.selected.border)?;
                self.set_focus(window)?;
            },
            None => self.conn.focus_root()?,
        }

        if let Some(m) = self.registry.selected_monitor_mut() {
            m.selected = target;
        }

        self.draw_bars()
    }

    /// Revert the border of `window` and grab every button on it again
    pub(crate) fn unfocus(&mut self, window: Window, reset_input: bool) -> Result<()> {
        if !self.registry.contains(window) {
            return Ok(());
        }

        self.grab_buttons(window, false)?;
        self.conn
            .set_border_color(window, self.settings.schemes.normal.border)?;
        if reset_input {
            self.conn.focus_root()?;
        }

        Ok(())
    }

    /// Hand input focus to `window`, unless it refuses it, and offer
    /// `WM_TAKE_FOCUS`
    pub(crate) fn set_focus(&self, window: Window) -> Result<()> {
        if !self.registry.client(window).map_or(false, |c| c.never_focus()) {
            self.conn
                .focus_window(window)
                .context(format!("failed to focus Window({:#0x})", window))?;
        }
        self.conn.send_protocol(window, Protocol::TakeFocus)?;
        Ok(())
    }

    /// Set or clear the urgency of `window`
    pub(crate) fn set_urgent(&mut self, window: Window, urgent: bool) -> Result<()> {
        if let Some(client) = self.registry.client_mut(window) {
            client.set_urgent(urgent);
        }
        if !urgent {
            self.conn.clear_urgency(window)?;
        }
        Ok(())
    }

    /// Grab the client-window buttons on `window`
    pub(crate) fn grab_buttons(&self, window: Window, focused: bool) -> Result<()> {
        let buttons = self
            .settings
            .bindings
            .client_buttons()
            .map(|b| (b.mask, b.button))
            .collect::<Vec<_>>();
        self.conn.grab_buttons(window, focused, &buttons)
    }
}
