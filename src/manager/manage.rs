//! Taking windows under management and letting them go

use super::WindowManager;
use crate::{
    core::{hints::SizeConstraints, Window},
    geometry::{Point, Rectangle},
    monitor::client::{Client, ClientFlags},
    rule,
    x::{
        event::{ConfigFields, ConfigureRequestData},
        property::IcccmWindowState,
        WindowInfo,
        XConn,
    },
};
use anyhow::{Context, Result};
use std::cmp;

impl<X: XConn> WindowManager<X> {
    /// Start managing `window`
    pub(crate) fn manage(&mut self, window: Window, info: WindowInfo) -> Result<()> {
        let mut client = Client::new(window, info.rect, info.border_width);
        client.set_name(self.conn.window_title(window));
        if let Some((instance, class)) = self.conn.window_class(window) {
            client.instance = instance;
            client.class = class;
        }

        let transient = self.conn.transient_for(window);
        let parent = transient
            .and_then(|t| self.registry.client(t))
            .map(|p| (p.monitor, p.tags));

        let mut floating = transient.is_some();
        match parent {
            Some((monitor, tags)) => {
                client.monitor = monitor;
                client.tags = tags;
            },
            None => {
                client.monitor = self.registry.selected;
                let outcome = rule::apply(
                    &self.settings.rules,
                    &client.class,
                    &client.instance,
                    &client.name,
                );
                floating |= outcome.floating;
                if let Some(num) = outcome.monitor {
                    if let Some((idx, _)) = self.registry.monitors.iter().find(|(_, m)| m.num == num) {
                        client.monitor = idx;
                    }
                }
                let tags = outcome.tags & self.settings.tag_mask;
                client.tags = if tags == 0 {
                    self.registry
                        .monitor(client.monitor)
                        .map_or(1, |m| m.selected_tags)
                } else {
                    tags
                };
            },
        }

        self.place_on_screen(&mut client);
        client.border_width = self.settings.border_width;
        client.shown_border = Some(client.border_width);
        client.set_hints(SizeConstraints::from_hints(self.conn.size_hints(window).as_ref()));
        if let Some(hints) = self.conn.hints(window) {
            client.set_urgent(hints.urgent);
            client.flags.set(ClientFlags::NEVER_FOCUS, hints.never_focus());
        }
        client.set_floating(floating || client.is_fixed());

        log::debug!(
            "managing Window({:#0x}) '{}' ({}, {}) on monitor {} tags {:#x}",
            window,
            client.name,
            client.instance,
            client.class,
            client.monitor,
            client.tags
        );

        let (rect, border, monitor) = (client.rect, client.border_width, client.monitor);
        self.registry.insert(client);

        self.conn
            .set_border_width(window, border)
            .context(format!("failed to set border of Window({:#0x})", window))?;
        self.conn
            .set_border_color(window, self.settings.schemes.normal.border)?;
        self.conn.send_configure_notify(window, rect, border)?;
        self.update_window_type(window)?;
        self.conn.select_client_events(window)?;
        self.grab_buttons(window, false)?;

        if self.registry.client(window).map_or(false, Client::is_floating) {
            self.conn.raise_window(window)?;
        }

        self.registry.attach(window);
        self.registry.attach_stack(window);
        self.conn.append_client_list(window)?;
        // off screen until it is arranged
        self.conn
            .move_window(window, Point::new(rect.x + 2 * self.screen.width, rect.y))?;
        self.conn.set_window_state(window, IcccmWindowState::Normal)?;

        if monitor == self.registry.selected {
            if let Some(current) = self.registry.selected_client() {
                self.unfocus(current, false)?;
            }
        }
        if let Some(m) = self.registry.monitor_mut(monitor) {
            m.selected = Some(window);
        }

        self.arrange(Some(monitor))?;
        self.conn.map_window(window)?;
        self.focus(None)
    }

    /// Keep a new client on its monitor's screen and off a top bar
    fn place_on_screen(&self, client: &mut Client) {
        let m = match self.registry.monitor(client.monitor) {
            Some(m) => m,
            None => return,
        };
        let (screen, area) = (m.screen, m.window);
        let outer_width = client.outer_width() + self.gap;
        let outer_height = client.outer_height() + self.gap;

        if client.rect.x + outer_width > screen.right() {
            client.rect.x = screen.right() - outer_width;
        }
        if client.rect.y + outer_height > screen.bottom() {
            client.rect.y = screen.bottom() - outer_height;
        }
        client.rect.x = cmp::max(client.rect.x, screen.x);

        let center = client.rect.x + client.rect.width / 2;
        let under_bar = m.bar_y == screen.y && center >= area.x && center < area.right();
        let top = if under_bar {
            screen.y + self.bar_height
        } else {
            screen.y
        };
        client.rect.y = cmp::max(client.rect.y, top);
    }

    /// Stop managing `window`. A destroyed window is not touched anymore
    pub(crate) fn unmanage(&mut self, window: Window, destroyed: bool) -> Result<()> {
        let monitor = match self.registry.monitor_of(window) {
            Some(monitor) => monitor,
            None => return Ok(()),
        };
        log::debug!("unmanaging Window({:#0x}), destroyed: {}", window, destroyed);

        self.registry.detach(window);
        self.registry.detach_stack(window);
        let client = self.registry.remove(window);

        if !destroyed {
            if let Some(client) = client {
                self.conn.grab_server()?;
                self.conn.set_border_width(window, client.old_border_width)?;
                self.conn.ungrab_buttons(window)?;
                self.conn
                    .set_window_state(window, IcccmWindowState::Withdrawn)?;
                self.conn.ungrab_server()?;
            }
        }

        self.focus(None)?;
        self.conn.set_client_list(&self.registry.client_list())?;
        self.arrange(Some(monitor))
    }

    /// Move `window` to monitor `target`, onto the tags shown there
    pub(crate) fn send_to_monitor(&mut self, window: Window, target: usize) -> Result<()> {
        if self.registry.monitor_of(window) == Some(target) {
            return Ok(());
        }

        log::debug!("sending Window({:#0x}) to monitor {}", window, target);
        self.unfocus(window, true)?;
        self.registry.move_to_monitor(window, target);
        self.focus(None)?;
        self.arrange(None)
    }

    /// Honor a configure request. Floating clients get what they ask for
    /// within their monitor, tiled ones are told their current geometry
    pub(crate) fn configure_request(&mut self, request: &ConfigureRequestData) -> Result<()> {
        let window = request.window;
        let (floating, monitor) = match self.registry.client(window) {
            Some(c) => (c.is_floating(), c.monitor),
            None => return self.conn.configure_unmanaged(request),
        };
        let fields = request.fields;

        if fields.contains(ConfigFields::BORDER_WIDTH) {
            if let Some(c) = self.registry.client_mut(window) {
                // a fullscreen client keeps no border until it leaves fullscreen
                if c.is_fullscreen() {
                    c.old_border_width = request.border_width;
                } else {
                    c.border_width = request.border_width;
                }
            }
            return Ok(());
        }

        if !floating {
            if let Some(c) = self.registry.client(window) {
                let border = c.shown_border.unwrap_or(c.border_width);
                self.conn.send_configure_notify(window, c.rect, border)?;
            }
            return Ok(());
        }

        let screen = match self.registry.monitor(monitor) {
            Some(m) => m.screen,
            None => return Ok(()),
        };
        let (rect, border) = match self.registry.client_mut(window) {
            Some(c) => {
                let mut rect = c.rect;
                if fields.contains(ConfigFields::X) {
                    rect.x = screen.x + request.rect.x;
                }
                if fields.contains(ConfigFields::Y) {
                    rect.y = screen.y + request.rect.y;
                }
                if fields.contains(ConfigFields::WIDTH) {
                    rect.width = request.rect.width;
                }
                if fields.contains(ConfigFields::HEIGHT) {
                    rect.height = request.rect.height;
                }

                let outer_width = rect.width + 2 * c.border_width;
                let outer_height = rect.height + 2 * c.border_width;
                if rect.x + rect.width > screen.right() {
                    // center in x direction
                    rect.x = screen.x + (screen.width / 2 - outer_width / 2);
                }
                if rect.y + rect.height > screen.bottom() {
                    rect.y = screen.y + (screen.height / 2 - outer_height / 2);
                }

                c.old_rect = c.rect;
                c.rect = rect;
                c.shown_border = Some(c.border_width);
                (rect, c.border_width)
            },
            None => return Ok(()),
        };

        let moved_only = fields.intersects(ConfigFields::X | ConfigFields::Y)
            && !fields.intersects(ConfigFields::WIDTH | ConfigFields::HEIGHT);
        if moved_only {
            self.conn.send_configure_notify(window, rect, border)?;
        }
        if self.registry.is_visible(window) {
            self.conn.configure_window(window, rect, border)?;
        }

        Ok(())
    }

    /// Apply `_NET_WM_STATE` and `_NET_WM_WINDOW_TYPE`
    pub(crate) fn update_window_type(&mut self, window: Window) -> Result<()> {
        if self.conn.requests_fullscreen(window) {
            self.set_fullscreen(window, true)?;
        }
        if self.conn.is_dialog(window) {
            if let Some(c) = self.registry.client_mut(window) {
                c.set_floating(true);
            }
        }
        Ok(())
    }

    /// Re-read `WM_HINTS`. The selected client never becomes urgent
    pub(crate) fn update_wm_hints(&mut self, window: Window) -> Result<()> {
        let hints = match self.conn.hints(window) {
            Some(hints) => hints,
            None => return Ok(()),
        };

        if hints.urgent && self.registry.selected_client() == Some(window) {
            self.conn.clear_urgency(window)?;
        } else if let Some(c) = self.registry.client_mut(window) {
            c.set_urgent(hints.urgent);
        }
        if let Some(c) = self.registry.client_mut(window) {
            c.flags.set(ClientFlags::NEVER_FOCUS, hints.never_focus());
        }

        Ok(())
    }

    /// Re-read `WM_NORMAL_HINTS`
    pub(crate) fn update_size_hints(&mut self, window: Window) {
        let hints = SizeConstraints::from_hints(self.conn.size_hints(window).as_ref());
        if let Some(c) = self.registry.client_mut(window) {
            c.set_hints(hints);
        }
    }

    /// The screen-absolute rectangle `window` occupies, border included
    pub(crate) fn outer_rect(&self, window: Window) -> Option<Rectangle> {
        self.registry.client(window).map(|c| {
            Rectangle::new(c.rect.x, c.rect.y, c.outer_width(), c.outer_height())
        })
    }
}
