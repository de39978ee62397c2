//! Ownership of every [`Client`] and [`Monitor`]
//!
//! A client sits in exactly one monitor: once in the monitor's `clients`
//! list (attach order, new clients at the head) and once in its `stack`
//! (focus order). Windows are the handles used in both lists

use super::{client::Client, unique_screens, Monitor, MonitorDefaults, MonitorTable};
use crate::{
    core::{TagMask, Window},
    geometry::Rectangle,
};
use std::collections::HashMap;

/// What [`Registry::reconcile`] changed
#[derive(Debug, Default)]
pub(crate) struct Reconciliation {
    /// Whether any monitor was added, removed or moved
    pub(crate) dirty:   bool,
    /// Slots of the monitors that were created
    pub(crate) created: Vec<usize>,
    /// Monitors that were removed, with their clients already migrated
    pub(crate) removed: Vec<Monitor>,
}

// ============================= Registry ============================= [[[

/// Clients and monitors, and which monitor is selected
#[derive(Debug, Default)]
pub(crate) struct Registry {
    /// Every managed client
    clients:             HashMap<Window, Client>,
    /// Every monitor
    pub(crate) monitors: MonitorTable,
    /// Index of the monitor receiving input
    pub(crate) selected: usize,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    pub(crate) fn client(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub(crate) fn client_mut(&mut self, window: Window) -> Option<&mut Client> {
        self.clients.get_mut(&window)
    }

    /// Number of managed clients
    pub(crate) fn len(&self) -> usize {
        self.clients.len()
    }

    /// Start tracking `client`. It is not attached to any list yet
    pub(crate) fn insert(&mut self, client: Client) {
        self.clients.insert(client.window, client);
    }

    /// Stop tracking `window`. It must be detached already
    pub(crate) fn remove(&mut self, window: Window) -> Option<Client> {
        debug_assert!(
            self.monitors
                .iter()
                .all(|(_, m)| !m.clients.contains(&window) && !m.stack.contains(&window)),
            "removing attached client Window({:#0x})",
            window
        );
        self.clients.remove(&window)
    }

    pub(crate) fn monitor(&self, idx: usize) -> Option<&Monitor> {
        self.monitors.get(idx)
    }

    pub(crate) fn monitor_mut(&mut self, idx: usize) -> Option<&mut Monitor> {
        self.monitors.get_mut(idx)
    }

    pub(crate) fn selected_monitor(&self) -> Option<&Monitor> {
        self.monitors.get(self.selected)
    }

    pub(crate) fn selected_monitor_mut(&mut self) -> Option<&mut Monitor> {
        self.monitors.get_mut(self.selected)
    }

    /// The focused client of the selected monitor
    pub(crate) fn selected_client(&self) -> Option<Window> {
        self.selected_monitor().and_then(|m| m.selected)
    }

    /// Index of the monitor owning `window`
    pub(crate) fn monitor_of(&self, window: Window) -> Option<usize> {
        self.client(window).map(|c| c.monitor)
    }

    // ============================= Lists ============================ [[[

    /// Put `window` at the head of its monitor's client list
    pub(crate) fn attach(&mut self, window: Window) {
        if let Some(idx) = self.monitor_of(window) {
            if let Some(m) = self.monitors.get_mut(idx) {
                debug_assert!(!m.clients.contains(&window), "client attached twice");
                m.clients.insert(0, window);
            }
        }
    }

    /// Remove `window` from its monitor's client list
    pub(crate) fn detach(&mut self, window: Window) {
        if let Some(idx) = self.monitor_of(window) {
            if let Some(m) = self.monitors.get_mut(idx) {
                let pos = m.clients.iter().position(|w| *w == window);
                debug_assert!(pos.is_some(), "detaching unattached Window({:#0x})", window);
                if let Some(pos) = pos {
                    m.clients.remove(pos);
                }
            }
        }
    }

    /// Put `window` at the head of its monitor's focus stack
    pub(crate) fn attach_stack(&mut self, window: Window) {
        if let Some(idx) = self.monitor_of(window) {
            if let Some(m) = self.monitors.get_mut(idx) {
                debug_assert!(!m.stack.contains(&window), "client stacked twice");
                m.stack.insert(0, window);
            }
        }
    }

    /// Remove `window` from its monitor's focus stack. When it was the
    /// monitor's selection, the next visible client in the stack takes over
    pub(crate) fn detach_stack(&mut self, window: Window) {
        let idx = match self.monitor_of(window) {
            Some(idx) => idx,
            None => return,
        };

        let was_selected = match self.monitors.get_mut(idx) {
            Some(m) => {
                let pos = m.stack.iter().position(|w| *w == window);
                debug_assert!(pos.is_some(), "unstacking unstacked Window({:#0x})", window);
                if let Some(pos) = pos {
                    m.stack.remove(pos);
                }
                m.selected == Some(window)
            },
            None => return,
        };

        if was_selected {
            let next = self.first_visible_in_stack(idx);
            if let Some(m) = self.monitors.get_mut(idx) {
                m.selected = next;
            }
        }
    }

    /// Move `window` to the head of its monitor's client list, making it the
    /// master
    pub(crate) fn promote(&mut self, window: Window) {
        self.detach(window);
        self.attach(window);
    }

    /// Hand `window` to monitor `target`, taking on its selected tags
    pub(crate) fn move_to_monitor(&mut self, window: Window, target: usize) {
        let tags = match self.monitors.get(target) {
            Some(m) => m.selected_tags,
            None => return,
        };

        self.detach(window);
        self.detach_stack(window);
        if let Some(c) = self.clients.get_mut(&window) {
            c.monitor = target;
            c.tags = tags;
        }
        self.attach(window);
        self.attach_stack(window);
    }

    // ]]] === Lists ===

    // =========================== Visibility ========================= [[[

    /// Whether `window` is on a tag its monitor shows
    pub(crate) fn is_visible(&self, window: Window) -> bool {
        self.client(window).map_or(false, |c| {
            self.monitors
                .get(c.monitor)
                .map_or(false, |m| c.is_visible_on(m.selected_tags))
        })
    }

    /// Visible clients of monitor `idx`, in attach order
    pub(crate) fn visible(&self, idx: usize) -> Vec<Window> {
        self.monitors.get(idx).map_or_else(Vec::new, |m| {
            m.clients
                .iter()
                .copied()
                .filter(|w| self.is_visible(*w))
                .collect()
        })
    }

    /// Visible clients of monitor `idx` that take part in the layout, in
    /// attach order
    pub(crate) fn tiled(&self, idx: usize) -> Vec<Window> {
        self.visible(idx)
            .into_iter()
            .filter(|w| self.client(*w).map_or(false, |c| !c.is_floating()))
            .collect()
    }

    /// The tiled client following `window` in attach order
    pub(crate) fn next_tiled(&self, window: Window) -> Option<Window> {
        let idx = self.monitor_of(window)?;
        let tiled = self.tiled(idx);
        let m = self.monitors.get(idx)?;
        let pos = m.clients.iter().position(|w| *w == window)?;
        m.clients[pos + 1..].iter().copied().find(|w| tiled.contains(w))
    }

    /// Most recently focused visible client of monitor `idx`
    pub(crate) fn first_visible_in_stack(&self, idx: usize) -> Option<Window> {
        self.monitors
            .get(idx)?
            .stack
            .iter()
            .copied()
            .find(|w| self.is_visible(*w))
    }

    /// Tags holding a client of monitor `idx`, and those holding an urgent one
    pub(crate) fn occupancy(&self, idx: usize) -> (TagMask, TagMask) {
        self.monitors.get(idx).map_or((0, 0), |m| {
            m.clients
                .iter()
                .filter_map(|w| self.client(*w))
                .fold((0, 0), |(occ, urg), c| {
                    (occ | c.tags, if c.is_urgent() { urg | c.tags } else { urg })
                })
        })
    }

    /// Every client, monitor by monitor, in attach order
    pub(crate) fn client_list(&self) -> Vec<Window> {
        self.monitors
            .iter()
            .flat_map(|(_, m)| m.clients.iter().copied())
            .collect()
    }

    // ]]] === Visibility ===

    /// Bring the monitor table in line with the physical `screens`. Without
    /// any screen information a single monitor covers `full`
    pub(crate) fn reconcile(
        &mut self,
        screens: &[Rectangle],
        full: Rectangle,
        defaults: &MonitorDefaults,
        bar_height: i32,
    ) -> Reconciliation {
        let mut result = Reconciliation::default();
        let screens = if screens.is_empty() {
            vec![full]
        } else {
            unique_screens(screens)
        };

        let count = self.monitors.valid_count();
        for _ in count..screens.len() {
            result.created.push(self.monitors.create(defaults));
            result.dirty = true;
        }

        for _ in screens.len()..count {
            let last = match self.monitors.indices().last() {
                Some(&idx) => idx,
                None => break,
            };
            if let Some(removed) = self.remove_monitor(last) {
                result.removed.push(removed);
                result.dirty = true;
            }
        }

        let indices = self.monitors.indices();
        for (num, (idx, screen)) in indices.into_iter().zip(screens).enumerate() {
            if let Some(m) = self.monitors.get_mut(idx) {
                if m.set_screen(num, screen, bar_height) {
                    log::debug!("monitor {} now covers {}", idx, screen);
                    result.dirty = true;
                }
            }
        }

        if !self.monitors.is_valid(self.selected) {
            self.selected = self.monitors.next_valid(0).unwrap_or(0);
        }

        result
    }

    /// Invalidate monitor `idx`, moving its clients to the next monitor
    fn remove_monitor(&mut self, idx: usize) -> Option<Monitor> {
        let mut removed = self.monitors.invalidate(idx)?;
        let target = self.monitors.next_valid(idx + 1);
        log::debug!("removing monitor {}, clients go to {:?}", idx, target);

        if let Some(target) = target {
            for window in removed.clients.drain(..) {
                if let Some(c) = self.clients.get_mut(&window) {
                    c.monitor = target;
                }
                self.attach(window);
                self.attach_stack(window);
            }
            removed.stack.clear();
            removed.selected = None;

            if self.selected == idx {
                self.selected = self.monitors.next_valid(0).unwrap_or(target);
            }
        }

        Some(removed)
    }

    /// Check the structural invariants, describing the first violation
    pub(crate) fn check_invariants(&self, tag_mask: TagMask) -> Result<(), String> {
        if self.clients.is_empty() && self.monitors.valid_count() == 0 {
            return Ok(());
        }
        if !self.monitors.is_valid(self.selected) {
            return Err(format!("selected monitor {} is not valid", self.selected));
        }

        let mut seen = 0;
        for (idx, m) in self.monitors.iter() {
            let mut clients = m.clients.clone();
            let mut stack = m.stack.clone();
            clients.sort_unstable();
            stack.sort_unstable();

            if clients.windows(2).any(|w| w[0] == w[1]) || stack.windows(2).any(|w| w[0] == w[1]) {
                return Err(format!("monitor {} lists a client twice", idx));
            }
            if clients != stack {
                return Err(format!("monitor {} client list and stack differ", idx));
            }
            if let Some(sel) = m.selected {
                if !stack.contains(&sel) {
                    return Err(format!("monitor {} selects an unknown client", idx));
                }
            }

            for w in &clients {
                let c = self
                    .client(*w)
                    .ok_or_else(|| format!("monitor {} lists unmanaged Window({:#0x})", idx, w))?;
                if c.monitor != idx {
                    return Err(format!("Window({:#0x}) is listed on the wrong monitor", w));
                }
                if c.tags == 0 || c.tags & !tag_mask != 0 {
                    return Err(format!("Window({:#0x}) has tags {:#x}", w, c.tags));
                }
            }
            seen += clients.len();
        }

        if seen != self.clients.len() {
            return Err(format!("{} clients, {} listed", self.clients.len(), seen));
        }

        Ok(())
    }
} // ]]] === Registry ===

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: Rectangle = Rectangle::new(0, 0, 3840, 1080);

    fn left() -> Rectangle {
        Rectangle::new(0, 0, 1920, 1080)
    }

    fn right() -> Rectangle {
        Rectangle::new(1920, 0, 1920, 1080)
    }

    fn registry(screens: &[Rectangle]) -> Registry {
        let mut reg = Registry::new();
        reg.reconcile(screens, FULL, &MonitorDefaults::default(), 20);
        reg
    }

    fn add(reg: &mut Registry, window: Window, monitor: usize, tags: TagMask) {
        let mut c = Client::new(window, Rectangle::new(0, 0, 100, 100), 0);
        c.monitor = monitor;
        c.tags = tags;
        reg.insert(c);
        reg.attach(window);
        reg.attach_stack(window);
    }

    #[test]
    fn attach_puts_clients_at_the_head() {
        let mut reg = registry(&[left()]);
        add(&mut reg, 1, 0, 1);
        add(&mut reg, 2, 0, 1);
        assert_eq!(reg.monitor(0).map(|m| m.clients.clone()), Some(vec![2, 1]));
        assert_eq!(reg.check_invariants(0x1ff), Ok(()));
    }

    #[test]
    fn detaching_the_selection_picks_next_visible() {
        let mut reg = registry(&[left()]);
        add(&mut reg, 1, 0, 1);
        add(&mut reg, 2, 0, 2);
        add(&mut reg, 3, 0, 1);
        if let Some(m) = reg.monitor_mut(0) {
            m.selected = Some(3);
        }

        reg.detach_stack(3);
        assert_eq!(reg.monitor(0).and_then(|m| m.selected), Some(1));

        reg.detach_stack(1);
        assert_eq!(reg.monitor(0).and_then(|m| m.selected), None);
    }

    #[test]
    fn tiled_skips_hidden_and_floating() {
        let mut reg = registry(&[left()]);
        add(&mut reg, 1, 0, 1);
        add(&mut reg, 2, 0, 2);
        add(&mut reg, 3, 0, 1);
        add(&mut reg, 4, 0, 1);
        if let Some(c) = reg.client_mut(3) {
            c.set_floating(true);
        }

        assert_eq!(reg.tiled(0), vec![4, 1]);
        assert_eq!(reg.visible(0), vec![4, 3, 1]);
        assert_eq!(reg.next_tiled(4), Some(1));
        assert_eq!(reg.next_tiled(1), None);
    }

    #[test]
    fn occupancy_and_urgency() {
        let mut reg = registry(&[left()]);
        add(&mut reg, 1, 0, 0b001);
        add(&mut reg, 2, 0, 0b100);
        if let Some(c) = reg.client_mut(2) {
            c.set_urgent(true);
        }
        assert_eq!(reg.occupancy(0), (0b101, 0b100));
    }

    #[test]
    fn new_screens_create_monitors() {
        let mut reg = registry(&[left()]);
        let result = reg.reconcile(&[left(), right()], FULL, &MonitorDefaults::default(), 20);

        assert!(result.dirty);
        assert_eq!(result.created, vec![1]);
        assert_eq!(reg.monitor(1).map(|m| m.screen), Some(right()));
        assert_eq!(reg.monitor(1).map(|m| m.window), Some(Rectangle::new(1920, 20, 1920, 1060)));
    }

    #[test]
    fn unchanged_screens_are_not_dirty() {
        let mut reg = registry(&[left(), right()]);
        let result = reg.reconcile(&[left(), right(), left()], FULL, &MonitorDefaults::default(), 20);
        assert!(!result.dirty);
        assert!(result.created.is_empty());
    }

    #[test]
    fn removed_monitor_hands_its_clients_over() {
        let mut reg = registry(&[left(), right()]);
        add(&mut reg, 1, 0, 0b01);
        add(&mut reg, 2, 1, 0b10);
        add(&mut reg, 3, 1, 0b01);
        reg.selected = 1;

        let result = reg.reconcile(&[left()], FULL, &MonitorDefaults::default(), 20);

        assert!(result.dirty);
        assert_eq!(result.removed.len(), 1);
        assert_eq!(reg.monitors.valid_count(), 1);
        assert_eq!(reg.selected, 0);
        for (w, tags) in [(1, 0b01), (2, 0b10), (3, 0b01)] {
            assert_eq!(reg.client(w).map(|c| (c.monitor, c.tags)), Some((0, tags)));
        }
        assert_eq!(reg.check_invariants(0x1ff), Ok(()));
    }

    #[test]
    fn no_screen_information_means_one_monitor() {
        let reg = registry(&[]);
        assert_eq!(reg.monitors.valid_count(), 1);
        assert_eq!(reg.monitor(0).map(|m| m.screen), Some(FULL));
    }

    #[test]
    fn moving_between_monitors_takes_the_target_tags() {
        let mut reg = registry(&[left(), right()]);
        if let Some(m) = reg.monitor_mut(1) {
            m.selected_tags = 0b100;
        }
        add(&mut reg, 1, 0, 0b001);
        reg.move_to_monitor(1, 1);

        assert_eq!(reg.client(1).map(|c| (c.monitor, c.tags)), Some((1, 0b100)));
        assert_eq!(reg.check_invariants(0x1ff), Ok(()));
    }

    #[test]
    fn invariant_violations_are_reported() {
        let mut reg = registry(&[left()]);
        add(&mut reg, 1, 0, 0);
        assert!(reg.check_invariants(0x1ff).is_err());
    }
}
