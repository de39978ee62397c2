//! Placing clients: resizing, the layouts, hiding and stacking

use super::WindowManager;
use crate::{
    core::{
        hints::{apply_size_hints, Bounds},
        layout::{Arrangement, Tiled},
        Layout,
        Window,
    },
    geometry::{Point, Rectangle},
    monitor::client::Client,
    x::XConn,
};
use anyhow::{Context, Result};

impl<X: XConn> WindowManager<X> {
    /// What the hints resolver needs to know about the monitor of `client`
    fn bounds(&self, client: &Client) -> Option<Bounds> {
        self.registry.monitor(client.monitor).map(|m| Bounds {
            screen:     self.screen.dimension(),
            area:       m.window,
            bar_height: self.bar_height,
            gap:        self.gap,
        })
    }

    /// Gap and border width `client` is drawn with. Floating clients have no
    /// gap; a lone tiled client or a monocle layout has neither
    fn frame(&self, client: &Client) -> (i32, i32) {
        if client.is_floating() {
            return (0, client.border_width);
        }

        let alone = self
            .registry
            .monitor(client.monitor)
            .map_or(false, |m| m.layout == Layout::Monocle)
            || self.registry.tiled(client.monitor).len() == 1;

        if alone {
            (0, 0)
        } else {
            (self.gap, client.border_width)
        }
    }

    /// Final geometry and border of `window` when offered `rect`
    fn placement(&self, window: Window, rect: Rectangle) -> Option<(Rectangle, i32)> {
        let client = self.registry.client(window)?;
        let (gap, border) = self.frame(client);
        Some((rect.inset(gap), border))
    }

    /// Send `rect` and `border` to the server, remembering them
    fn configure_client(&mut self, window: Window, rect: Rectangle, border: i32) -> Result<()> {
        if let Some(client) = self.registry.client_mut(window) {
            if !client.is_fullscreen() {
                client.old_rect = client.rect;
            }
            client.rect = rect;
            client.shown_border = Some(border);
        }

        self.conn
            .configure_window(window, rect, border)
            .context(format!("failed to configure Window({:#0x})", window))?;
        self.conn.send_configure_notify(window, rect, border)
    }

    /// Place `window` at `rect`, whether or not it is there already
    pub(crate) fn resize_client(&mut self, window: Window, rect: Rectangle) -> Result<()> {
        match self.placement(window, rect) {
            Some((rect, border)) => self.configure_client(window, rect, border),
            None => Ok(()),
        }
    }

    /// Offer `proposed` to `window`. The size hints are honored and nothing is
    /// sent when the result matches what the window already has
    pub(crate) fn resize(
        &mut self,
        window: Window,
        proposed: Rectangle,
        interactive: bool,
    ) -> Result<()> {
        let (rect, unchanged) = {
            let client = match self.registry.client(window) {
                Some(client) => client,
                None => return Ok(()),
            };
            let bounds = match self.bounds(client) {
                Some(bounds) => bounds,
                None => return Ok(()),
            };
            let (rect, _) = apply_size_hints(client, proposed, interactive, &bounds);
            let (gap, border) = self.frame(client);
            let rect = rect.inset(gap);
            (
                (rect, border),
                client.rect == rect && client.shown_border == Some(border),
            )
        };

        if unchanged {
            log::trace!("Window({:#0x}) is already at {}", window, rect.0);
            return Ok(());
        }

        self.configure_client(window, rect.0, rect.1)
    }

    // ============================ Arrange =========================== [[[

    /// Lay out monitor `idx`, or every monitor
    pub(crate) fn arrange(&mut self, idx: Option<usize>) -> Result<()> {
        let indices = idx.map_or_else(|| self.registry.monitors.indices(), |idx| vec![idx]);

        for idx in &indices {
            self.show_hide(*idx)?;
        }
        for idx in indices {
            self.arrange_monitor(idx)?;
            self.restack(idx)?;
        }

        Ok(())
    }

    /// Apply the layout of monitor `idx` to its tiled clients
    fn arrange_monitor(&mut self, idx: usize) -> Result<()> {
        let (layout, params) = match self.registry.monitor(idx) {
            Some(m) => (m.layout, Arrangement {
                area:  m.window,
                mfact: m.mfact,
                gap:   self.gap,
            }),
            None => return Ok(()),
        };

        let tiled = self
            .registry
            .tiled(idx)
            .into_iter()
            .filter_map(|w| self.registry.client(w))
            .map(|c| Tiled {
                window:       c.window,
                border_width: c.border_width,
            })
            .collect::<Vec<_>>();

        for (window, rect) in layout.arrange(&params, &tiled) {
            self.resize(window, rect, false)?;
        }

        Ok(())
    }

    /// Show the visible clients of monitor `idx` and move the others off
    /// screen
    fn show_hide(&mut self, idx: usize) -> Result<()> {
        let stack = match self.registry.monitor(idx) {
            Some(m) => m.stack.clone(),
            None => return Ok(()),
        };
        let (shown, hidden): (Vec<_>, Vec<_>) =
            stack.into_iter().partition(|w| self.registry.is_visible(*w));

        for window in shown {
            let (point, refloat) = match self.registry.client(window) {
                Some(c) => (c.rect.point(), c.is_floating() && !c.is_fullscreen()),
                None => continue,
            };
            self.conn.move_window(window, point)?;
            if refloat {
                let rect = self.registry.client(window).map(|c| c.rect);
                if let Some(rect) = rect {
                    self.resize(window, rect, false)?;
                }
            }
        }

        for window in hidden.into_iter().rev() {
            if let Some(c) = self.registry.client(window) {
                let point = Point::new(-2 * (c.outer_width() + self.gap), c.rect.y);
                self.conn.move_window(window, point)?;
            }
        }

        Ok(())
    }

    /// Redraw the bar and restack monitor `idx`: a floating selection on top,
    /// tiled clients below the bar in focus order
    pub(crate) fn restack(&mut self, idx: usize) -> Result<()> {
        self.draw_bar(idx)?;

        let (selected, stack, bar) = match self.registry.monitor(idx) {
            Some(m) => match m.selected {
                Some(sel) => (sel, m.stack.clone(), m.bar),
                None => return Ok(()),
            },
            None => return Ok(()),
        };

        if self.registry.client(selected).map_or(false, Client::is_floating) {
            self.conn.raise_window(selected)?;
        }

        let mut sibling = bar;
        for window in stack {
            let tiled = self
                .registry
                .client(window)
                .map_or(false, |c| !c.is_floating());
            if tiled && self.registry.is_visible(window) {
                if let Some(sibling) = sibling {
                    self.conn.stack_below(window, sibling)?;
                }
                sibling = Some(window);
            }
        }

        self.conn.drop_enter_events()
    }

    // ]]] === Arrange ===

    /// Enter or leave fullscreen
    pub(crate) fn set_fullscreen(&mut self, window: Window, fullscreen: bool) -> Result<()> {
        let (current, screen) = match self.registry.client(window) {
            Some(c) => (
                c.is_fullscreen(),
                self.registry.monitor(c.monitor).map(|m| m.screen),
            ),
            None => return Ok(()),
        };

        if fullscreen && !current {
            let screen = match screen {
                Some(screen) => screen,
                None => return Ok(()),
            };
            log::debug!("Window({:#0x}) enters fullscreen", window);
            self.conn.set_fullscreen_state(window, true)?;
            if let Some(c) = self.registry.client_mut(window) {
                c.enter_fullscreen(screen);
            }
            self.resize_client(window, screen)?;
            self.conn.raise_window(window)?;
        } else if !fullscreen && current {
            log::debug!("Window({:#0x}) leaves fullscreen", window);
            self.conn.set_fullscreen_state(window, false)?;
            let restore = self.registry.client_mut(window).map(Client::leave_fullscreen);
            if let Some(rect) = restore {
                self.resize_client(window, rect)?;
            }
            let idx = self.registry.monitor_of(window);
            self.arrange(idx)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixture::*;
    use crate::{
        core::Layout,
        geometry::Rectangle,
        x::{
            event::{
                ClientMessageEvent,
                ClientRequest,
                ConfigFields,
                ConfigureRequestData,
                StateAction,
                XEvent,
            },
            mock::{MockWindow, Request},
            property::SizeHints,
        },
    };
    use x11rb::protocol::xproto::StackMode;

    #[test]
    fn three_tiled_clients_scenario() {
        let mut wm = manager();
        // new clients go to the head, so C is mapped first and A last
        for window in [0xc, 0xb, 0xa] {
            map_plain(&mut wm, window);
        }

        assert_eq!(wm.registry.monitor(0).map(|m| m.clients.clone()), Some(vec![0xa, 0xb, 0xc]));
        assert_eq!(last_configure(&wm, 0xa), Some(Rectangle::new(460, 10, 530, 480)));
        assert_eq!(last_configure(&wm, 0xb), Some(Rectangle::new(10, 10, 440, 235)));
        assert_eq!(last_configure(&wm, 0xc), Some(Rectangle::new(10, 255, 440, 235)));
        assert_invariants(&wm);
    }

    #[test]
    fn stack_heights_cover_the_window_area() {
        for count in [1_u32, 2, 3, 10] {
            let mut wm = manager();
            for window in 1..=count {
                map_plain(&mut wm, window);
            }

            let stack = wm
                .registry
                .monitor(0)
                .map(|m| m.clients[usize::from(count > 1)..].to_vec())
                .unwrap_or_default();
            let gap = if count == 1 { 0 } else { wm.gap };
            let total = stack
                .iter()
                .filter_map(|w| wm.registry.client(*w))
                .map(|c| c.rect.height + gap)
                .sum::<i32>();
            assert!((total + gap - SCREEN.height).abs() <= 1, "count={} total={}", count, total);
        }
    }

    #[test]
    fn resize_twice_configures_once() {
        let mut wm = manager();
        let mut settings = settings();
        settings.border_width = 2;
        let mut wm2 = manager_with(settings);
        for wm in [&mut wm, &mut wm2] {
            map_plain(wm, 1);
            map_plain(wm, 2);
            wm.conn.take_requests();

            let rect = Rectangle::new(100, 100, 300, 200);
            wm.resize(1, rect, false).expect("resizes");
            wm.resize(1, rect, false).expect("resizes");
            assert_eq!(wm.conn.configures_of(1), 1);

            wm.arrange(None).expect("arranges");
            wm.arrange(None).expect("arranges");
            assert_eq!(wm.conn.configures_of(1), 2);
            assert_eq!(wm.conn.configures_of(2), 0);
        }
    }

    #[test]
    fn single_and_monocle_clients_have_no_gap_or_border() {
        let mut settings = settings();
        settings.border_width = 3;
        let mut wm = manager_with(settings);
        map_plain(&mut wm, 1);
        assert_eq!(last_configure(&wm, 1), Some(SCREEN));
        assert!(wm.conn.received(|r| *r == Request::Configure(1, SCREEN, 0)));

        map_plain(&mut wm, 2);
        assert_eq!(wm.registry.client(1).and_then(|c| c.shown_border), Some(3));

        if let Some(m) = wm.registry.monitor_mut(0) {
            m.layout = Layout::Monocle;
        }
        wm.arrange(Some(0)).expect("arranges");
        for window in [1, 2] {
            assert_eq!(last_configure(&wm, window), Some(SCREEN));
            assert_eq!(wm.registry.client(window).and_then(|c| c.shown_border), Some(0));
        }
    }

    #[test]
    fn fixed_client_keeps_its_size() {
        let mut wm = manager();
        let mut mock = MockWindow::new(Rectangle::new(50, 50, 200, 100));
        mock.size_hints = Some(SizeHints {
            min_size: Some((200, 100)),
            max_size: Some((200, 100)),
            ..SizeHints::default()
        });
        map(&mut wm, 1, mock);

        let client = wm.registry.client(1).expect("managed");
        assert!(client.is_fixed());
        assert!(client.is_floating());

        for proposed in [
            Rectangle::new(0, 0, 900, 400),
            Rectangle::new(30, 30, 10, 10),
            Rectangle::new(100, 100, 200, 101),
        ] {
            wm.resize(1, proposed, false).expect("resizes");
            wm.resize(1, proposed, true).expect("resizes");
            let rect = wm.registry.client(1).map(|c| c.rect).expect("managed");
            assert_eq!((rect.width, rect.height), (200, 100));
        }
    }

    #[test]
    fn hidden_clients_move_off_screen() {
        let mut wm = manager();
        map_plain(&mut wm, 1);
        if let Some(c) = wm.registry.client_mut(1) {
            c.tags = 1 << 3;
        }
        wm.conn.take_requests();
        wm.arrange(Some(0)).expect("arranges");

        assert!(wm.conn.received(|r| matches!(r, Request::Move(1, p) if p.x < 0)));
    }

    #[test]
    fn restack_keeps_tiled_clients_below_the_bar() {
        let mut settings = settings();
        settings.monitor.show_bar = true;
        let mut wm = manager_with(settings);
        let bar = wm.registry.monitor(0).and_then(|m| m.bar).expect("bar");
        map_plain(&mut wm, 1);
        map_plain(&mut wm, 2);
        wm.conn.take_requests();

        wm.restack(0).expect("restacks");
        let requests = wm.conn.take_requests();
        assert!(requests.contains(&Request::StackBelow(2, bar)));
        assert!(requests.contains(&Request::StackBelow(1, 2)));
        assert!(!requests.iter().any(|r| matches!(r, Request::Raise(_))));
    }

    #[test]
    fn fullscreen_round_trip() {
        let mut settings = settings();
        settings.border_width = 2;
        let mut wm = manager_with(settings);
        map_plain(&mut wm, 1);
        map_plain(&mut wm, 2);
        let before = wm.registry.client(1).map(|c| c.rect).expect("managed");

        let message = |action| {
            XEvent::ClientMessage(ClientMessageEvent {
                window:  1,
                request: ClientRequest::Fullscreen(action),
            })
        };

        wm.handle_event(message(StateAction::Add)).expect("handles");
        let client = wm.registry.client(1).expect("managed");
        assert!(client.is_fullscreen() && client.is_floating());
        assert_eq!(client.border_width, 0);
        assert_eq!(client.rect, SCREEN);
        assert!(wm.conn.received(|r| *r == Request::Fullscreen(1, true)));

        wm.handle_event(message(StateAction::Toggle)).expect("handles");
        let client = wm.registry.client(1).expect("managed");
        assert!(!client.is_fullscreen() && !client.is_floating());
        assert_eq!(client.border_width, 2);
        assert_eq!(client.rect, before);
        assert_invariants(&wm);
    }

    #[test]
    fn border_requests_wait_for_fullscreen_to_end() {
        let mut settings = settings();
        settings.border_width = 2;
        let mut wm = manager_with(settings);
        map_plain(&mut wm, 1);
        map_plain(&mut wm, 2);

        let message = |action| {
            XEvent::ClientMessage(ClientMessageEvent {
                window:  1,
                request: ClientRequest::Fullscreen(action),
            })
        };
        wm.handle_event(message(StateAction::Add)).expect("handles");

        wm.configure_request(&ConfigureRequestData {
            window:       1,
            fields:       ConfigFields::BORDER_WIDTH,
            rect:         Rectangle::new(0, 0, 0, 0),
            border_width: 5,
            sibling:      0,
            stack_mode:   StackMode::ABOVE,
        })
        .expect("handles");
        assert_eq!(wm.registry.client(1).map(|c| c.border_width), Some(0));

        wm.conn.take_requests();
        wm.resize_client(1, SCREEN).expect("resizes");
        assert!(wm.conn.received(|r| *r == Request::Configure(1, SCREEN, 0)));

        wm.handle_event(message(StateAction::Toggle)).expect("handles");
        let client = wm.registry.client(1).expect("managed");
        assert!(!client.is_fullscreen());
        assert_eq!(client.border_width, 5);
        assert_invariants(&wm);
    }
}
