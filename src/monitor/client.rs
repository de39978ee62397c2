//! Metadata about a managed X-window

use crate::{
    core::{hints::SizeConstraints, TagMask, Window, BROKEN, MAX_NAME_LEN},
    geometry::Rectangle,
};
use bitflags::bitflags;

bitflags! {
    /// State flags of a [`Client`]
    #[derive(Default)]
    pub(crate) struct ClientFlags: u8 {
        /// Minimum and maximum size agree
        const FIXED       = 0b0000_0001;
        /// Exempt from the layout
        const FLOATING    = 0b0000_0010;
        /// Asked for attention
        const URGENT      = 0b0000_0100;
        /// Covers its monitor's screen
        const FULLSCREEN  = 0b0000_1000;
        /// Must not be given input focus directly
        const NEVER_FOCUS = 0b0001_0000;
    }
}

// ============================== Client ============================== [[[

/// Information about a managed top-level [`Window`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Client {
    /// The client's window
    pub(crate) window:           Window,
    /// Title, at most [`MAX_NAME_LEN`] bytes
    pub(crate) name:             String,
    /// Class part of `WM_CLASS`
    pub(crate) class:            String,
    /// Instance part of `WM_CLASS`
    pub(crate) instance:         String,
    /// Current geometry, border excluded
    pub(crate) rect:             Rectangle,
    /// Geometry before the last resize
    pub(crate) old_rect:         Rectangle,
    /// Border width the client should carry
    pub(crate) border_width:     i32,
    /// Border width the window had before it was managed, or before going
    /// fullscreen
    pub(crate) old_border_width: i32,
    /// Border width last sent to the server
    pub(crate) shown_border:     Option<i32>,
    /// Tags the client is on
    pub(crate) tags:             TagMask,
    /// Index of the owning monitor
    pub(crate) monitor:          usize,
    /// Size constraints from `WM_NORMAL_HINTS`
    pub(crate) hints:            SizeConstraints,
    /// State flags
    pub(crate) flags:            ClientFlags,
    /// Floating state before going fullscreen
    pub(crate) old_floating:     bool,
}

impl Client {
    /// Create a [`Client`] for `window` at `rect`
    pub(crate) fn new(window: Window, rect: Rectangle, old_border_width: i32) -> Self {
        Self {
            window,
            name: String::from(BROKEN),
            class: String::new(),
            instance: String::new(),
            rect,
            old_rect: rect,
            border_width: 0,
            old_border_width,
            shown_border: None,
            tags: 0,
            monitor: 0,
            hints: SizeConstraints::default(),
            flags: ClientFlags::empty(),
            old_floating: false,
        }
    }

    pub(crate) const fn is_floating(&self) -> bool {
        self.flags.contains(ClientFlags::FLOATING)
    }

    pub(crate) fn set_floating(&mut self, floating: bool) {
        self.flags.set(ClientFlags::FLOATING, floating);
    }

    pub(crate) const fn is_fixed(&self) -> bool {
        self.flags.contains(ClientFlags::FIXED)
    }

    pub(crate) const fn is_urgent(&self) -> bool {
        self.flags.contains(ClientFlags::URGENT)
    }

    pub(crate) fn set_urgent(&mut self, urgent: bool) {
        self.flags.set(ClientFlags::URGENT, urgent);
    }

    pub(crate) const fn is_fullscreen(&self) -> bool {
        self.flags.contains(ClientFlags::FULLSCREEN)
    }

    pub(crate) const fn never_focus(&self) -> bool {
        self.flags.contains(ClientFlags::NEVER_FOCUS)
    }

    /// Store new size constraints and recompute [`ClientFlags::FIXED`]
    pub(crate) fn set_hints(&mut self, hints: SizeConstraints) {
        self.hints = hints;
        self.flags.set(ClientFlags::FIXED, hints.is_fixed());
    }

    /// Whether the client is on one of `tags`
    pub(crate) const fn is_visible_on(&self, tags: TagMask) -> bool {
        self.tags & tags != 0
    }

    /// Width including both borders
    pub(crate) const fn outer_width(&self) -> i32 {
        self.rect.width + 2 * self.border_width
    }

    /// Height including both borders
    pub(crate) const fn outer_height(&self) -> i32 {
        self.rect.height + 2 * self.border_width
    }

    /// Set the title, falling back to [`BROKEN`] for missing or empty names
    pub(crate) fn set_name(&mut self, name: Option<String>) {
        let mut name = name.filter(|n| !n.is_empty()).unwrap_or_else(|| String::from(BROKEN));

        if name.len() > MAX_NAME_LEN {
            let mut end = MAX_NAME_LEN;
            while !name.is_char_boundary(end) {
                end -= 1;
            }
            name.truncate(end);
        }

        self.name = name;
    }

    /// Remember the current geometry and floating state, then cover `screen`
    /// without a border
    pub(crate) fn enter_fullscreen(&mut self, screen: Rectangle) {
        self.flags.insert(ClientFlags::FULLSCREEN);
        self.old_floating = self.is_floating();
        self.old_border_width = self.border_width;
        self.border_width = 0;
        self.set_floating(true);
        self.old_rect = self.rect;
        self.rect = screen;
    }

    /// Undo [`Client::enter_fullscreen`], returning the geometry to restore
    pub(crate) fn leave_fullscreen(&mut self) -> Rectangle {
        self.flags.remove(ClientFlags::FULLSCREEN);
        self.set_floating(self.old_floating);
        self.border_width = self.old_border_width;
        self.old_rect
    }
} // ]]] === Client ===
