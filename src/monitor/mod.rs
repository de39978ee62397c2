//! Representation of the monitors connected to the X-Server
//!
//! Monitors live in a table of slots. Removing a monitor leaves an empty slot
//! behind instead of compacting the table, so the index of every other monitor
//! stays valid. Growing the table only ever appends

pub(crate) mod client;
pub(crate) mod registry;

use crate::{
    core::{Layout, TagMask, Window},
    geometry::Rectangle,
};

/// Slots allocated when the first monitor is created
const INITIAL_CAPACITY: usize = 2;

/// Values a new [`Monitor`] starts out with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MonitorDefaults {
    /// Initially selected tags
    pub(crate) tags:     TagMask,
    /// Size of the master column in percent
    pub(crate) mfact:    i32,
    /// Whether the bar is shown
    pub(crate) show_bar: bool,
    /// Whether the bar is at the top of the screen
    pub(crate) top_bar:  bool,
}

impl Default for MonitorDefaults {
    fn default() -> Self {
        Self {
            tags:     1,
            mfact:    55,
            show_bar: true,
            top_bar:  true,
        }
    }
}

// ============================== Monitor ============================= [[[

/// A logical screen region with its own tags, layout and bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Monitor {
    /// Position among the physical screens
    pub(crate) num:           usize,
    /// The whole screen area
    pub(crate) screen:        Rectangle,
    /// Screen area minus the bar
    pub(crate) window:        Rectangle,
    /// Vertical position of the bar, negative when hidden
    pub(crate) bar_y:         i32,
    /// Whether the bar is shown
    pub(crate) show_bar:      bool,
    /// Whether the bar is at the top
    pub(crate) top_bar:       bool,
    /// Tags that are shown
    pub(crate) selected_tags: TagMask,
    /// Arrangement of the tiled clients
    pub(crate) layout:        Layout,
    /// Size of the master column in percent
    pub(crate) mfact:         i32,
    /// Clients in attach order; the head is the master
    pub(crate) clients:       Vec<Window>,
    /// Clients in focus order; the head was focused last
    pub(crate) stack:         Vec<Window>,
    /// The focused client
    pub(crate) selected:      Option<Window>,
    /// The bar window
    pub(crate) bar:           Option<Window>,
}

impl Monitor {
    /// Create an empty [`Monitor`]
    pub(crate) fn new(num: usize, defaults: &MonitorDefaults) -> Self {
        Self {
            num,
            screen: Rectangle::zeroed(),
            window: Rectangle::zeroed(),
            bar_y: 0,
            show_bar: defaults.show_bar,
            top_bar: defaults.top_bar,
            selected_tags: defaults.tags,
            layout: Layout::default(),
            mfact: defaults.mfact,
            clients: vec![],
            stack: vec![],
            selected: None,
            bar: None,
        }
    }

    /// Derive the window area and bar position from the screen area
    pub(crate) fn update_bar_position(&mut self, bar_height: i32) {
        self.window = self.screen;
        if self.show_bar {
            self.window.height -= bar_height;
            if self.top_bar {
                self.bar_y = self.window.y;
                self.window.y += bar_height;
            } else {
                self.bar_y = self.window.y + self.window.height;
            }
        } else {
            self.bar_y = -bar_height;
        }
    }

    /// Move to `screen`, returning whether anything changed
    pub(crate) fn set_screen(&mut self, num: usize, screen: Rectangle, bar_height: i32) -> bool {
        if self.screen == screen && self.num == num {
            return false;
        }

        self.num = num;
        self.screen = screen;
        self.update_bar_position(bar_height);
        true
    }
} // ]]] === Monitor ===

/// Drop exact duplicates, keeping the first of each. Cloned outputs count once
pub(crate) fn unique_screens(screens: &[Rectangle]) -> Vec<Rectangle> {
    let mut unique: Vec<Rectangle> = Vec::with_capacity(screens.len());
    for screen in screens {
        if !unique.contains(screen) {
            unique.push(*screen);
        }
    }
    unique
}

// =========================== MonitorTable =========================== [[[

/// Index-stable storage for [`Monitor`]s
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MonitorTable {
    /// Every slot; `None` is a free slot
    slots: Vec<Option<Monitor>>,
}

impl MonitorTable {
    pub(crate) const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Number of slots, used or not
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of monitors
    pub(crate) fn valid_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Put a new monitor in the first free slot, doubling the table when full
    pub(crate) fn create(&mut self, defaults: &MonitorDefaults) -> usize {
        let idx = if let Some(idx) = self.slots.iter().position(Option::is_none) {
            idx
        } else {
            let old = self.slots.len();
            let new = if old == 0 { INITIAL_CAPACITY } else { old * 2 };
            self.slots.resize(new, None);
            old
        };

        log::debug!("creating monitor {} (capacity {})", idx, self.slots.len());
        self.slots[idx] = Some(Monitor::new(idx, defaults));
        idx
    }

    /// Free the slot at `idx`, handing back what it held
    pub(crate) fn invalidate(&mut self, idx: usize) -> Option<Monitor> {
        self.slots.get_mut(idx).and_then(Option::take)
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&Monitor> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut Monitor> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    pub(crate) fn is_valid(&self, idx: usize) -> bool {
        self.get(idx).is_some()
    }

    /// Monitors with their indices, in slot order
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &Monitor)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|m| (i, m)))
    }

    /// Mutable monitors with their indices, in slot order
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Monitor)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|m| (i, m)))
    }

    /// Indices of the monitors, in slot order
    pub(crate) fn indices(&self) -> Vec<usize> {
        self.iter().map(|(i, _)| i).collect()
    }

    /// First valid slot at or after `start`, wrapping around the table
    pub(crate) fn next_valid(&self, start: usize) -> Option<usize> {
        let len = self.slots.len();
        (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&idx| self.is_valid(idx))
    }

    /// The valid monitor after (`dir > 0`) or before `from`, wrapping around.
    /// Returns `from` when it is the only monitor
    pub(crate) fn in_direction(&self, from: usize, dir: i32) -> usize {
        let len = self.slots.len();
        if len == 0 {
            return from;
        }

        (1..len)
            .map(|offset| {
                if dir > 0 {
                    (from + offset) % len
                } else {
                    (from + len - offset % len) % len
                }
            })
            .find(|&idx| self.is_valid(idx))
            .unwrap_or(from)
    }

    /// The monitor whose window area overlaps `rect` the most, or `fallback`
    /// when none does
    pub(crate) fn from_rect(&self, rect: &Rectangle, fallback: usize) -> usize {
        let mut best = fallback;
        let mut max_area = 0;

        for (idx, monitor) in self.iter() {
            let area = monitor.window.intersection_area(rect);
            if area > max_area {
                max_area = area;
                best = idx;
            }
        }

        best
    }
} // ]]] === MonitorTable ===
