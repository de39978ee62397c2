//! Input into the window manager

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};
use x11rb::protocol::xproto::{Button as XButton, ModMask as XModMask};

// ============================== ModMask =============================
// ====================================================================

/// Keycode modifier that is held
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ModMask {
    /// Left or right `shift` key
    Shift,
    /// Caps-lock
    Lock,
    /// Left or right `control` key
    #[serde(alias = "ctrl")]
    Control,
    /// Modifier 1 as defined in `xmodmap` (usually `alt`)
    Mod1,
    /// Modifier 2 as defined in `xmodmap` (usually `num-lock`)
    Mod2,
    /// Modifier 3 as defined in `xmodmap` (usually blank)
    Mod3,
    /// Modifier 4 as defined in `xmodmap` (usually `super`)
    Mod4,
    /// Modifier 5 as defined or in `xmodmap` (usually `mode_shift`)
    Mod5,
}

impl ModMask {
    /// Whether this modifier is part of `mask`
    pub(crate) fn was_held(self, mask: u16) -> bool {
        mask & u16::from(self) > 0
    }

    /// Every modifier held in `mask`
    pub(crate) fn held(mask: u16) -> Vec<Self> {
        Self::iter().filter(|m| m.was_held(mask)).collect()
    }
}

impl From<ModMask> for u16 {
    fn from(m: ModMask) -> Self {
        u16::from(match m {
            ModMask::Shift => XModMask::SHIFT,
            ModMask::Lock => XModMask::LOCK,
            ModMask::Control => XModMask::CONTROL,
            ModMask::Mod1 => XModMask::M1,
            ModMask::Mod2 => XModMask::M2,
            ModMask::Mod3 => XModMask::M3,
            ModMask::Mod4 => XModMask::M4,
            ModMask::Mod5 => XModMask::M5,
        })
    }
}

impl FromStr for ModMask {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shift" => Ok(Self::Shift),
            "lock" => Ok(Self::Lock),
            "control" | "ctrl" => Ok(Self::Control),
            "mod1" | "alt" => Ok(Self::Mod1),
            "mod2" => Ok(Self::Mod2),
            "mod3" => Ok(Self::Mod3),
            "mod4" | "super" => Ok(Self::Mod4),
            "mod5" => Ok(Self::Mod5),
            _ => Err(Error::InvalidChord(format!("unknown modifier '{}'", s))),
        }
    }
}

impl fmt::Display for ModMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Shift => "shift",
            Self::Lock => "lock",
            Self::Control => "control",
            Self::Mod1 => "mod1",
            Self::Mod2 => "mod2",
            Self::Mod3 => "mod3",
            Self::Mod4 => "mod4",
            Self::Mod5 => "mod5",
        };
        write!(f, "{}", name)
    }
}

/// Every modifier that can take part in a binding
const BINDABLE: u16 = 0x00ff;

/// Remove Lock, NumLock and anything that is not a modifier (pointer buttons)
pub(crate) const fn clean_mask(mask: u16, numlock: u16) -> u16 {
    mask & !(numlock | 0x0002) & BINDABLE
}

/// The four combinations of Lock and NumLock a grab has to cover
pub(crate) const fn lock_combinations(numlock: u16) -> [u16; 4] {
    [0, 0x0002, numlock, numlock | 0x0002]
}

// ============================== Button ==============================
// ====================================================================

/// Available buttons on a mouse
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Button {
    /// 1, Left-click
    #[serde(rename = "button1", alias = "mouse1")]
    Left,
    /// 2, Middle-click
    #[serde(rename = "button2", alias = "mouse2")]
    Middle,
    /// 3, Right-click
    #[serde(rename = "button3", alias = "mouse3")]
    Right,
    /// 4, Wheel-scroll up
    #[serde(rename = "button4", alias = "scroll-up")]
    ScrollUp,
    /// 5, Wheel-scroll down
    #[serde(rename = "button5", alias = "scroll-down")]
    ScrollDown,
}

impl From<Button> for XButton {
    fn from(b: Button) -> Self {
        match b {
            Button::Left => 1,
            Button::Middle => 2,
            Button::Right => 3,
            Button::ScrollUp => 4,
            Button::ScrollDown => 5,
        }
    }
}

impl TryFrom<u8> for Button {
    type Error = Error;

    fn try_from(u: u8) -> Result<Self, Self::Error> {
        match u {
            1 => Ok(Self::Left),
            2 => Ok(Self::Middle),
            3 => Ok(Self::Right),
            4 => Ok(Self::ScrollUp),
            5 => Ok(Self::ScrollDown),
            _ => Err(Error::InvalidChord(format!("mouse button {} is unknown", u))),
        }
    }
}

impl FromStr for Button {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "button1" | "mouse1" => Ok(Self::Left),
            "button2" | "mouse2" => Ok(Self::Middle),
            "button3" | "mouse3" => Ok(Self::Right),
            "button4" | "mouse4" | "scroll-up" => Ok(Self::ScrollUp),
            "button5" | "mouse5" | "scroll-down" => Ok(Self::ScrollDown),
            _ => Err(Error::InvalidChord(format!("unknown button '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_mask_drops_locks_and_buttons() {
        let numlock = u16::from(ModMask::Mod2);
        let mod4 = u16::from(ModMask::Mod4);
        let shift = u16::from(ModMask::Shift);
        let lock = u16::from(ModMask::Lock);
        let button1 = 0x0100;

        assert_eq!(clean_mask(mod4 | numlock | lock | button1, numlock), mod4);
        assert_eq!(clean_mask(mod4 | shift, numlock), mod4 | shift);
    }

    #[test]
    fn modifier_names() {
        assert_eq!("ctrl".parse::<ModMask>().ok(), Some(ModMask::Control));
        assert_eq!("Shift".parse::<ModMask>().ok(), Some(ModMask::Shift));
        assert!("hyper".parse::<ModMask>().is_err());
        assert_eq!(ModMask::held(0x0041), vec![ModMask::Shift, ModMask::Mod4]);
    }

    #[test]
    fn button_names() {
        assert_eq!("button3".parse::<Button>().ok(), Some(Button::Right));
        assert_eq!(Button::try_from(1).ok(), Some(Button::Left));
        assert!(Button::try_from(9).is_err());
        assert_eq!(XButton::from(Button::Middle), 2);
    }
}
