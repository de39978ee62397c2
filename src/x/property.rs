//! ICCCM properties read from client windows

use x11rb::properties;

// ============================ SizeHints =============================

/// The parts of `WM_NORMAL_HINTS` the window manager honors
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct SizeHints {
    /// The base size, used together with `size_increment`
    pub(crate) base_size:      Option<(i32, i32)>,
    /// The minimum size that the window may be assigned
    pub(crate) min_size:       Option<(i32, i32)>,
    /// The maximum size that the window may be assigned
    pub(crate) max_size:       Option<(i32, i32)>,
    /// Steps in which the window wants to be resized
    pub(crate) size_increment: Option<(i32, i32)>,
    /// Minimum and maximum aspect ratio, as `(numerator, denominator)`
    pub(crate) aspect:         Option<((i32, i32), (i32, i32))>,
}

impl From<&properties::WmSizeHints> for SizeHints {
    fn from(hints: &properties::WmSizeHints) -> Self {
        Self {
            base_size:      hints.base_size,
            min_size:       hints.min_size,
            max_size:       hints.max_size,
            size_increment: hints.size_increment,
            aspect:         hints.aspect.map(|(min, max)| {
                (
                    (min.numerator, min.denominator),
                    (max.numerator, max.denominator),
                )
            }),
        }
    }
}

// ============================== Hints ===============================

/// The parts of `WM_HINTS` the window manager honors
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Hints {
    /// The client asks for attention
    pub(crate) urgent: bool,
    /// Whether the client wants input focus; `None` when it did not say
    pub(crate) input:  Option<bool>,
}

impl Hints {
    /// A client that explicitly refuses input is never focused directly
    pub(crate) const fn never_focus(&self) -> bool {
        matches!(self.input, Some(false))
    }
}

impl From<&properties::WmHints> for Hints {
    fn from(hints: &properties::WmHints) -> Self {
        Self {
            urgent: hints.urgent,
            input:  hints.input,
        }
    }
}

// ======================== IcccmWindowState ==========================

/// Value of the `WM_STATE` property
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum IcccmWindowState {
    /// Not mapped and not managed
    Withdrawn,
    /// Mapped
    Normal,
    /// Minimized
    Iconic,
}

impl IcccmWindowState {
    /// Value written to the property
    pub(crate) const fn value(self) -> u32 {
        match self {
            Self::Withdrawn => 0,
            Self::Normal => 1,
            Self::Iconic => 3,
        }
    }

    /// Decode a property value
    pub(crate) const fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Withdrawn),
            1 => Some(Self::Normal),
            3 => Some(Self::Iconic),
            _ => None,
        }
    }
}

/// Protocols a client may advertise in `WM_PROTOCOLS`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Protocol {
    /// `WM_DELETE_WINDOW`
    Delete,
    /// `WM_TAKE_FOCUS`
    TakeFocus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_state_values() {
        for state in [
            IcccmWindowState::Withdrawn,
            IcccmWindowState::Normal,
            IcccmWindowState::Iconic,
        ] {
            assert_eq!(IcccmWindowState::from_value(state.value()), Some(state));
        }
        assert_eq!(IcccmWindowState::from_value(2), None);
    }

    #[test]
    fn input_hint() {
        assert!(!Hints::default().never_focus());
        assert!(!Hints { input: Some(true), ..Hints::default() }.never_focus());
        assert!(Hints { input: Some(false), ..Hints::default() }.never_focus());
    }
}
