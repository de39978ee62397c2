//! What key and button bindings do

use super::{drag::DragKind, WindowManager};
use crate::{
    core::{
        action::{Action, MONITOR_PLACEHOLDER},
        mode::Mode,
        TagMask,
        Window,
    },
    geometry::Rectangle,
    process,
    x::{property::Protocol, XConn},
};
use anyhow::Result;
use itertools::Itertools;

/// Pixels a floating client is moved or resized by per keypress
const STEP: i32 = 5;

/// [`STEP`] in the direction of `n`
const fn step(n: i32) -> i32 {
    if n > 0 {
        STEP
    } else {
        -STEP
    }
}

impl<X: XConn> WindowManager<X> {
    /// Run `action`
    pub(crate) fn run_action(&mut self, action: &Action) -> Result<()> {
        log::debug!("running {:?}", action);

        match action {
            Action::Spawn(argv) => {
                self.spawn(argv);
                Ok(())
            },
            Action::SpawnReset(argv) => {
                self.reset_mode()?;
                self.spawn(argv);
                self.focus(None)
            },
            Action::Shell(line) => {
                let argv = [
                    self.settings.shell.to_string_lossy().to_string(),
                    String::from("-c"),
                    line.clone(),
                ];
                self.spawn(&argv);
                Ok(())
            },
            Action::View(mask) => self.view(*mask),
            Action::ToggleView(mask) => self.toggle_view(*mask),
            Action::Tag(mask) => self.tag(*mask),
            Action::ToggleTag(mask) => self.toggle_tag(*mask),
            Action::FocusStack(dir) => self.focus_stack(*dir),
            Action::FocusMonitor(dir) => self.focus_monitor(*dir),
            Action::TagMonitor(dir) => self.tag_monitor(*dir),
            Action::SetMfact(delta) => self.set_mfact(*delta),
            Action::ToggleLayout => self.toggle_layout(),
            Action::ToggleFloating => self.toggle_floating(),
            Action::MakeMain => self.make_main(),
            Action::KillClient => self.kill_client(),
            Action::MoveVert(n) => self.nudge(|r| Rectangle { y: r.y + step(*n), ..r }),
            Action::MoveHoriz(n) => self.nudge(|r| Rectangle { x: r.x + step(*n), ..r }),
            Action::ResizeWindow(n) => self.resize_window(step(*n)),
            Action::AspectRatio(n) => {
                let d = step(*n);
                self.nudge(|r| Rectangle::new(r.x - d, r.y + d, r.width + 2 * d, r.height - 2 * d))
            },
            Action::PushMode(mode) => self.push_mode(*mode),
            Action::PopMode => self.pop_mode(),
            Action::ResetMode => self.reset_mode(),
            Action::Quit => {
                log::info!("quit requested");
                self.running = false;
                Ok(())
            },
            Action::MoveMouse => self.start_drag(DragKind::Move),
            Action::ResizeMouse => self.start_drag(DragKind::Resize),
            Action::SigStatusBar(button) => {
                if let Err(e) = self.statusbar.send_signal(*button) {
                    log::warn!("failed to signal the status bar: {:#}", e);
                }
                Ok(())
            },
        }
    }

    /// Launch `argv` detached, with the selected monitor's number filled in.
    /// A failure is logged and otherwise ignored
    fn spawn(&self, argv: &[String]) {
        let num = self.registry.selected_monitor().map_or(0, |m| m.num).to_string();
        let argv = argv
            .iter()
            .map(|arg| arg.replace(MONITOR_PLACEHOLDER, &num))
            .collect::<Vec<_>>();

        match process::spawn(&argv) {
            Ok(pid) => log::debug!("spawned '{}' as {}", argv.iter().join(" "), pid),
            Err(e) => log::error!("failed to spawn '{}': {:#}", argv.iter().join(" "), e),
        }
    }

    // ============================== Tags ============================ [[[

    /// Show `mask` on the selected monitor. An empty mask changes nothing
    pub(crate) fn view(&mut self, mask: TagMask) -> Result<()> {
        let mask = mask & self.settings.tag_mask;
        let idx = self.registry.selected;
        match self.registry.selected_monitor_mut() {
            Some(m) if mask != 0 && m.selected_tags != mask => m.selected_tags = mask,
            _ => return Ok(()),
        }

        self.focus(None)?;
        self.arrange(Some(idx))
    }

    fn toggle_view(&mut self, mask: TagMask) -> Result<()> {
        let idx = self.registry.selected;
        let mask = mask & self.settings.tag_mask;
        match self.registry.selected_monitor_mut() {
            Some(m) if m.selected_tags ^ mask != 0 => m.selected_tags ^= mask,
            _ => return Ok(()),
        }

        self.focus(None)?;
        self.arrange(Some(idx))
    }

    /// Move the selected client to `mask`
    fn tag(&mut self, mask: TagMask) -> Result<()> {
        let mask = mask & self.settings.tag_mask;
        self.retag(|_| mask)
    }

    fn toggle_tag(&mut self, mask: TagMask) -> Result<()> {
        let mask = mask & self.settings.tag_mask;
        self.retag(|tags| tags ^ mask)
    }

    /// Give the selected client new tags. A client never loses every tag
    fn retag(&mut self, f: impl FnOnce(TagMask) -> TagMask) -> Result<()> {
        let idx = self.registry.selected;
        let window = match self.registry.selected_client() {
            Some(window) => window,
            None => return Ok(()),
        };

        match self.registry.client_mut(window) {
            Some(c) => {
                let tags = f(c.tags);
                if tags == 0 {
                    return Ok(());
                }
                c.tags = tags;
            },
            None => return Ok(()),
        }

        self.focus(None)?;
        self.arrange(Some(idx))
    }

    // ]]] === Tags ===

    // ============================= Focus ============================ [[[

    /// Focus the next or previous visible client, wrapping around
    fn focus_stack(&mut self, dir: i32) -> Result<()> {
        let idx = self.registry.selected;
        let selected = match self.registry.selected_client() {
            Some(w) if !self.registry.client(w).map_or(true, |c| c.is_fullscreen()) => w,
            _ => return Ok(()),
        };

        let visible = self.registry.visible(idx);
        let pos = match visible.iter().position(|w| *w == selected) {
            Some(pos) => pos,
            None => return Ok(()),
        };
        let len = visible.len();
        let next = if dir > 0 {
            (pos + 1) % len
        } else {
            (pos + len - 1) % len
        };

        self.focus(Some(visible[next]))?;
        self.restack(idx)
    }

    fn focus_monitor(&mut self, dir: i32) -> Result<()> {
        if self.registry.monitors.valid_count() <= 1 {
            return Ok(());
        }
        let target = self.registry.monitors.in_direction(self.registry.selected, dir);
        if target == self.registry.selected {
            return Ok(());
        }

        if let Some(sel) = self.registry.selected_client() {
            self.unfocus(sel, false)?;
        }
        self.registry.selected = target;
        self.focus(None)
    }

    fn tag_monitor(&mut self, dir: i32) -> Result<()> {
        let window = match self.registry.selected_client() {
            Some(window) if self.registry.monitors.valid_count() > 1 => window,
            _ => return Ok(()),
        };
        let target = self.registry.monitors.in_direction(self.registry.selected, dir);
        self.send_to_monitor(window, target)
    }

    /// Move the selected client to the master position. The master itself
    /// swaps with the next tiled client
    fn make_main(&mut self) -> Result<()> {
        let idx = self.registry.selected;
        let selected = match self.registry.selected_client() {
            Some(w) => w,
            None => return Ok(()),
        };
        if self.registry.client(selected).map_or(true, |c| c.is_floating()) {
            return Ok(());
        }

        let mut target = selected;
        if self.registry.tiled(idx).first() == Some(&selected) {
            target = match self.registry.next_tiled(selected) {
                Some(next) => next,
                None => return Ok(()),
            };
        }

        self.registry.promote(target);
        self.focus(Some(target))?;
        self.arrange(Some(idx))
    }

    // ]]] === Focus ===

    // ============================ Layout ============================ [[[

    fn set_mfact(&mut self, delta: i32) -> Result<()> {
        let idx = self.registry.selected;
        match self.registry.selected_monitor_mut() {
            Some(m) if (5..=95).contains(&(m.mfact + delta)) => m.mfact += delta,
            _ => return Ok(()),
        }
        self.arrange(Some(idx))
    }

    fn toggle_layout(&mut self) -> Result<()> {
        let idx = self.registry.selected;
        let has_selection = match self.registry.selected_monitor_mut() {
            Some(m) => {
                m.layout = m.layout.toggled();
                log::debug!("monitor {} uses the {} layout", idx, m.layout);
                m.selected.is_some()
            },
            None => return Ok(()),
        };

        if has_selection {
            self.arrange(Some(idx))
        } else {
            self.draw_bar(idx)
        }
    }

    /// Toggle the selected client floating. A client that starts floating is
    /// centered on its monitor
    pub(crate) fn toggle_floating(&mut self) -> Result<()> {
        let idx = self.registry.selected;
        let window = match self.registry.selected_client() {
            Some(w) => w,
            None => return Ok(()),
        };
        let area = match self.registry.monitor(idx) {
            Some(m) => m.window,
            None => return Ok(()),
        };

        let centered = match self.registry.client_mut(window) {
            Some(c) if !c.is_fullscreen() => {
                let floating = !c.is_floating() || c.is_fixed();
                c.set_floating(floating);
                floating.then(|| {
                    Rectangle::new(
                        area.x + area.width / 2 - c.rect.width / 2,
                        area.y + area.height / 2 - c.rect.height / 2,
                        c.rect.width,
                        c.rect.height,
                    )
                })
            },
            _ => return Ok(()),
        };

        if let Some(rect) = centered {
            self.resize(window, rect, false)?;
        }
        self.arrange(Some(idx))
    }

    /// Resize the selected floating client, or change the gap when the
    /// selection is tiled
    fn resize_window(&mut self, d: i32) -> Result<()> {
        let floating = self
            .registry
            .selected_client()
            .and_then(|w| self.registry.client(w))
            .map_or(false, |c| c.is_floating());

        if floating {
            return self.nudge(|r| {
                Rectangle::new(r.x + d, r.y + d, r.width - 2 * d, r.height - 2 * d)
            });
        }

        if self.gap + d >= 0 {
            self.gap += d;
            log::debug!("gap is now {}", self.gap);
            self.arrange(None)?;
        }
        Ok(())
    }

    /// Change the geometry of the selected floating client
    fn nudge(&mut self, f: impl FnOnce(Rectangle) -> Rectangle) -> Result<()> {
        let (window, rect) = match self
            .registry
            .selected_client()
            .and_then(|w| self.registry.client(w))
        {
            Some(c) if c.is_floating() => (c.window, c.rect),
            _ => return Ok(()),
        };

        self.resize(window, f(rect), false)
    }

    // ]]] === Layout ===

    /// Close the selected client, killing it when it does not support
    /// `WM_DELETE_WINDOW`
    fn kill_client(&mut self) -> Result<()> {
        let window: Window = match self.registry.selected_client() {
            Some(w) => w,
            None => return Ok(()),
        };

        if !self.conn.send_protocol(window, Protocol::Delete)? {
            log::debug!("killing Window({:#0x})", window);
            self.conn.grab_server()?;
            self.conn.kill_client(window)?;
            self.conn.ungrab_server()?;
        }
        Ok(())
    }

    // ============================= Modes ============================ [[[

    fn push_mode(&mut self, mode: Mode) -> Result<()> {
        if self.modes.push(mode) {
            log::debug!("entering mode {}", mode);
            self.grab_keys()?;
            self.arrange(Some(self.registry.selected))?;
        }
        Ok(())
    }

    fn pop_mode(&mut self) -> Result<()> {
        if self.modes.pop() {
            log::debug!("back to mode {}", self.modes.current());
            self.grab_keys()?;
            self.draw_bars()?;
        }
        Ok(())
    }

    pub(crate) fn reset_mode(&mut self) -> Result<()> {
        if self.modes.depth() > 1 {
            self.modes.reset();
            self.grab_keys()?;
            self.draw_bars()?;
        }
        Ok(())
    }

    // ]]] === Modes ===
}
