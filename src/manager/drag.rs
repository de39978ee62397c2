//! Moving and resizing clients with the pointer
//!
//! A drag is a state of the event loop rather than a nested loop: while it
//! lasts, motion drives the client, a few requests are still served, and
//! everything else waits until the button is released

use super::WindowManager;
use crate::{
    core::{CursorKind, Window},
    geometry::{Point, Rectangle},
    x::{
        event::{MotionEvent, XEvent},
        XConn,
    },
};
use anyhow::Result;
use std::mem;
use x11rb::protocol::xproto::Timestamp;

/// What the pointer does to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DragKind {
    Move,
    Resize,
}

/// A drag in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Drag {
    pub(crate) kind:   DragKind,
    /// The dragged client
    pub(crate) window: Window,
    /// Pointer position when the drag started
    pub(crate) origin: Point,
    /// Geometry of the client when the drag started
    pub(crate) rect:   Rectangle,
    /// Time of the last motion that was acted on
    pub(crate) last:   Timestamp,
}

impl<X: XConn> WindowManager<X> {
    /// Grab the pointer and start dragging the selected client
    pub(crate) fn start_drag(&mut self, kind: DragKind) -> Result<()> {
        let window = match self.registry.selected_client() {
            Some(window) => window,
            None => return Ok(()),
        };
        let (rect, border) = match self.registry.client(window) {
            Some(c) if !c.is_fullscreen() => (c.rect, c.border_width),
            _ => return Ok(()),
        };

        self.restack(self.registry.selected)?;

        let cursor = match kind {
            DragKind::Move => CursorKind::Move,
            DragKind::Resize => CursorKind::Resize,
        };
        if !self.conn.grab_pointer(cursor)? {
            log::debug!("could not grab the pointer");
            return Ok(());
        }

        let origin = match kind {
            DragKind::Move => match self.conn.query_pointer() {
                Some(pointer) => pointer,
                None => return self.conn.ungrab_pointer(),
            },
            DragKind::Resize => {
                self.conn.warp_pointer(
                    window,
                    Point::new(rect.width + border - 1, rect.height + border - 1),
                )?;
                Point::new(rect.x, rect.y)
            },
        };

        log::debug!("dragging Window({:#0x}): {:?}", window, kind);
        self.drag = Some(Drag {
            kind,
            window,
            origin,
            rect,
            last: 0,
        });

        Ok(())
    }

    /// Handle `event` while a drag is in progress
    pub(crate) fn handle_drag_event(&mut self, event: XEvent) -> Result<()> {
        match event {
            XEvent::ConfigureRequest(_) | XEvent::Expose { .. } | XEvent::MapRequest(_) =>
                self.dispatch(event),
            XEvent::MotionNotify(ev) => self.drag_motion(ev),
            XEvent::ButtonRelease(_) => self.finish_drag(),
            other => {
                self.deferred.push_back(other);
                Ok(())
            },
        }
    }

    fn drag_motion(&mut self, ev: MotionEvent) -> Result<()> {
        let drag = match self.drag.as_mut() {
            Some(drag) => drag,
            None => return Ok(()),
        };
        if ev.time.wrapping_sub(drag.last) <= self.settings.motion_interval {
            return Ok(());
        }
        drag.last = ev.time;
        let drag = *drag;

        let (current, border, floating) = match self.registry.client(drag.window) {
            Some(c) => (c.rect, c.border_width, c.is_floating()),
            None => return Ok(()),
        };
        let area = match self.registry.selected_monitor() {
            Some(m) => m.window,
            None => return Ok(()),
        };
        let snap = self.settings.snap;

        let proposed = match drag.kind {
            DragKind::Move => {
                let outer_w = current.width + 2 * border;
                let outer_h = current.height + 2 * border;
                let mut x = drag.rect.x + (ev.root.x - drag.origin.x);
                let mut y = drag.rect.y + (ev.root.y - drag.origin.y);

                if (area.x - x).abs() < snap {
                    x = area.x;
                } else if ((area.x + area.width) - (x + outer_w)).abs() < snap {
                    x = area.x + area.width - outer_w;
                }
                if (area.y - y).abs() < snap {
                    y = area.y;
                } else if ((area.y + area.height) - (y + outer_h)).abs() < snap {
                    y = area.y + area.height - outer_h;
                }

                let escaped = (x - current.x).abs() > snap || (y - current.y).abs() > snap;
                (Rectangle::new(x, y, current.width, current.height), escaped)
            },
            DragKind::Resize => {
                let w = (ev.root.x - drag.origin.x - 2 * border + 1).max(1);
                let h = (ev.root.y - drag.origin.y - 2 * border + 1).max(1);
                let inside = w <= area.width && h <= area.height;

                let escaped = inside
                    && ((w - current.width).abs() > snap || (h - current.height).abs() > snap);
                (Rectangle::new(current.x, current.y, w, h), escaped)
            },
        };

        let (rect, escaped) = proposed;
        if !floating && escaped {
            if let Some(c) = self.registry.client_mut(drag.window) {
                c.set_floating(true);
            }
            self.arrange(self.registry.monitor_of(drag.window))?;
        }

        if self.registry.client(drag.window).map_or(false, |c| c.is_floating()) {
            self.resize(drag.window, rect, true)?;
        }

        Ok(())
    }

    /// Release the pointer and hand the client to the monitor it was dropped
    /// on. Events that waited are handled afterwards, except crossings
    fn finish_drag(&mut self) -> Result<()> {
        let drag = match self.drag.take() {
            Some(drag) => drag,
            None => return Ok(()),
        };

        if drag.kind == DragKind::Resize {
            if let Some(c) = self.registry.client(drag.window) {
                let corner = Point::new(c.rect.width + c.border_width - 1, c.rect.height + c.border_width - 1);
                self.conn.warp_pointer(drag.window, corner)?;
            }
        }
        self.conn.ungrab_pointer()?;
        self.deferred
            .retain(|event| !matches!(event, XEvent::EnterNotify(_)));

        if let Some(rect) = self.outer_rect(drag.window) {
            let target = self.registry.monitors.from_rect(&rect, self.registry.selected);
            if self.registry.monitor_of(drag.window) != Some(target) {
                log::debug!("Window({:#0x}) was dropped on monitor {}", drag.window, target);
                self.send_to_monitor(drag.window, target)?;
                self.registry.selected = target;
                self.focus(None)?;
            }
        }

        for event in mem::take(&mut self.deferred) {
            self.handle_event(event)?;
        }

        Ok(())
    }
}
