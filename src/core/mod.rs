//! Base types used throughout [`tagwm`]

pub(crate) mod action;
pub(crate) mod bar;
pub(crate) mod bindings;
pub(crate) mod decoration;
pub(crate) mod hints;
pub(crate) mod layout;
pub(crate) mod mode;

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export
pub(crate) use x11rb::protocol::xproto::{Atom, Keysym, Window};

/// Bit vector of tags. A client is visible on a monitor when the two masks
/// intersect
pub(crate) type TagMask = u32;

/// Maximum number of tags that fit in a [`TagMask`] alongside the sign bit
pub(crate) const MAX_TAGS: usize = 31;

/// Name given to clients that do not provide one
pub(crate) const BROKEN: &str = "broken";

/// Longest client name that is kept
pub(crate) const MAX_NAME_LEN: usize = 255;

/// Window manager's name
#[macro_export]
macro_rules! WM_NAME (
    () => { "tagwm" };
);

/// Text shown in the status area when the root window has no name
pub(crate) fn default_status() -> String {
    format!("{}-{}", WM_NAME!(), env!("CARGO_PKG_VERSION"))
}

/// Mask with one bit set per configured tag
pub(crate) const fn tag_mask(count: usize) -> TagMask {
    if count >= MAX_TAGS {
        (1_u32 << MAX_TAGS) - 1
    } else {
        (1_u32 << count) - 1
    }
}

// ============================== Layout ==============================
// ====================================================================

/// Arrangement applied to the tiled clients of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Layout {
    /// Master column on the right, everything else stacked on the left
    Tile,
    /// Every tiled client fills the window area
    Monocle,
}

impl Layout {
    /// Switch between the two layouts
    pub(crate) const fn toggled(self) -> Self {
        match self {
            Self::Tile => Self::Monocle,
            Self::Monocle => Self::Tile,
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::Tile
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Tile => write!(f, "tile"),
            Self::Monocle => write!(f, "monocle"),
        }
    }
}

// ============================== Cursor ==============================
// ====================================================================

/// Cursor shapes used by the window manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CursorKind {
    /// Shown on the root window and bars
    Normal,
    /// Shown while resizing with the pointer
    Resize,
    /// Shown while moving with the pointer
    Move,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_mask_covers_configured_tags() {
        assert_eq!(tag_mask(9), 0x1ff);
        assert_eq!(tag_mask(1), 1);
        assert_eq!(tag_mask(31), 0x7fff_ffff);
        assert_eq!(tag_mask(40), 0x7fff_ffff);
    }

    #[test]
    fn layout_toggles_between_two_entries() {
        assert_eq!(Layout::Tile.toggled(), Layout::Monocle);
        assert_eq!(Layout::Tile.toggled().toggled(), Layout::Tile);
    }
}
