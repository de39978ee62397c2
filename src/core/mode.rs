//! Input modes. The mode on top of the stack selects the active key bindings
//! and the label shown in the bar

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Number of frames the mode stack holds, base frame included
pub(crate) const MODE_STACK_DEPTH: usize = 8;

/// An input mode
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Mode {
    /// Default bindings
    Normal,
    /// Confirm quitting
    Quit,
    /// Pick a browser profile
    Browser,
    /// Pick a `surf` profile
    Surf,
}

impl Mode {
    /// Label drawn in the bar while the mode is active
    pub(crate) const fn label(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::Quit => Some("Quit?"),
            Self::Browser => Some("Browser"),
            Self::Surf => Some("Surf"),
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Normal
    }
}

// ============================ ModeStack ============================= [[[

/// Bounded stack of [`Mode`]s. The base frame is always [`Mode::Normal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModeStack {
    /// Storage for every frame
    frames: [Mode; MODE_STACK_DEPTH],
    /// Index of the top frame
    top:    usize,
}

impl ModeStack {
    /// Create a [`ModeStack`] holding only the base frame
    pub(crate) const fn new() -> Self {
        Self {
            frames: [Mode::Normal; MODE_STACK_DEPTH],
            top:    0,
        }
    }

    /// The active mode
    pub(crate) const fn current(&self) -> Mode {
        self.frames[self.top]
    }

    /// Number of frames in use
    pub(crate) const fn depth(&self) -> usize {
        self.top + 1
    }

    /// Push `mode`. Returns `false` and leaves the stack untouched when full
    pub(crate) fn push(&mut self, mode: Mode) -> bool {
        if self.top + 1 >= MODE_STACK_DEPTH {
            log::warn!("mode stack is full, ignoring push of {}", mode);
            return false;
        }

        self.top += 1;
        self.frames[self.top] = mode;
        true
    }

    /// Pop the top frame. The base frame is never popped
    pub(crate) fn pop(&mut self) -> bool {
        if self.top == 0 {
            return false;
        }

        self.top -= 1;
        true
    }

    /// Collapse to the base frame
    pub(crate) fn reset(&mut self) {
        self.top = 0;
    }
} // ]]] === ModeStack ===

impl Default for ModeStack {
    fn default() -> Self {
        Self::new()
    }
}
