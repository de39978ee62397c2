//! Key and button bindings. Each mode owns an ordered table of key bindings;
//! button bindings are shared by every mode. Lookup returns the first match

use super::{action::Action, bar::Click, mode::Mode, Keysym};
use crate::{
    error::Error,
    x::{
        input::{clean_mask, Button, ModMask},
        keysym,
    },
};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::{collections::HashMap, fmt, str::FromStr};

// ============================= KeyChord ============================= [[[

/// A modifier mask and a keysym
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct KeyChord {
    /// Modifiers that have to be held
    pub(crate) mask:   u16,
    /// The key that is pressed
    pub(crate) keysym: Keysym,
}

/// Split `mod+shift+x` into its modifier mask and the last component. The
/// word `mod` stands for `modkey`
fn split_chord(chord: &str, modkey: ModMask) -> Result<(u16, &str), Error> {
    let mut parts = chord.split('+').map(str::trim).collect::<Vec<_>>();
    let last = parts
        .pop()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::InvalidChord(chord.to_string()))?;

    let mut mask = 0;
    for part in parts {
        let m = if part.eq_ignore_ascii_case("mod") {
            modkey
        } else {
            ModMask::from_str(part)?
        };
        mask |= u16::from(m);
    }

    Ok((mask, last))
}

impl KeyChord {
    /// Parse a chord such as `mod+shift+Return`
    pub(crate) fn parse(chord: &str, modkey: ModMask) -> Result<Self, Error> {
        let (mask, key) = split_chord(chord, modkey)?;
        let keysym = keysym::from_name(key).ok_or_else(|| Error::InvalidKeysym(key.to_string()))?;
        Ok(Self { mask, keysym })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for m in ModMask::held(self.mask) {
            write!(f, "{}+", m)?;
        }
        write!(f, "{}", keysym::name_of(self.keysym))
    }
} // ]]] === KeyChord ===

/// A key chord and what it triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyBinding {
    pub(crate) chord:  KeyChord,
    pub(crate) action: Action,
}

/// A pointer button pressed on a part of the screen and what it triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ButtonBinding {
    /// Where the press has to land
    pub(crate) click:  Click,
    /// Modifiers that have to be held
    pub(crate) mask:   u16,
    /// The button that is pressed
    pub(crate) button: Button,
    /// What is done
    pub(crate) action: Action,
}

impl ButtonBinding {
    /// Parse a `<click>:<chord>` key and an action string
    pub(crate) fn parse(trigger: &str, action: &str, modkey: ModMask) -> Result<Self, Error> {
        let (click, chord) = trigger
            .split_once(':')
            .ok_or_else(|| Error::InvalidChord(format!("missing click location in '{}'", trigger)))?;
        let click = Click::from_str(click.trim())
            .map_err(|_| Error::InvalidClick(click.trim().to_string()))?;
        let (mask, button) = split_chord(chord, modkey)?;

        Ok(Self {
            click,
            mask,
            button: Button::from_str(button)?,
            action: Action::from_str(action)?,
        })
    }
}

// ============================= Bindings ============================= [[[

/// Every binding known to the window manager
#[derive(Debug, Clone, Default)]
pub(crate) struct Bindings {
    /// Key bindings per mode, in configuration order
    keys:    HashMap<Mode, Vec<KeyBinding>>,
    /// Button bindings, in configuration order
    buttons: Vec<ButtonBinding>,
}

impl Bindings {
    /// Resolve the bindings written in the configuration
    pub(crate) fn new(
        modes: &IndexMap<Mode, IndexMap<String, String>>,
        buttons: &IndexMap<String, String>,
        modkey: ModMask,
    ) -> Result<Self> {
        let mut keys = HashMap::new();
        for (mode, table) in modes {
            let mut bindings = Vec::with_capacity(table.len());
            for (chord, action) in table {
                let chord = KeyChord::parse(chord, modkey)
                    .context(format!("invalid key in mode '{}': {}", mode, chord))?;
                let action = Action::from_str(action)
                    .context(format!("invalid action for '{}' in mode '{}'", chord, mode))?;
                bindings.push(KeyBinding { chord, action });
            }
            keys.insert(*mode, bindings);
        }

        let buttons = buttons
            .iter()
            .map(|(trigger, action)| {
                ButtonBinding::parse(trigger, action, modkey)
                    .context(format!("invalid button binding: {}", trigger))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { keys, buttons })
    }

    /// Key bindings active in `mode`
    pub(crate) fn keys(&self, mode: Mode) -> &[KeyBinding] {
        self.keys.get(&mode).map_or(&[], Vec::as_slice)
    }

    /// Every button binding
    pub(crate) fn buttons(&self) -> &[ButtonBinding] {
        &self.buttons
    }

    /// Button bindings that are grabbed on client windows
    pub(crate) fn client_buttons(&self) -> impl Iterator<Item = &ButtonBinding> {
        self.buttons.iter().filter(|b| b.click == Click::ClientWin)
    }

    /// First key binding of `mode` matching the pressed chord
    pub(crate) fn find_key(
        &self,
        mode: Mode,
        keysym: Keysym,
        state: u16,
        numlock: u16,
    ) -> Option<&Action> {
        let state = clean_mask(state, numlock);
        self.keys(mode)
            .iter()
            .find(|b| b.chord.keysym == keysym && clean_mask(b.chord.mask, numlock) == state)
            .map(|b| &b.action)
    }

    /// First button binding matching the press
    pub(crate) fn find_button(
        &self,
        click: Click,
        button: u8,
        state: u16,
        numlock: u16,
    ) -> Option<&Action> {
        let state = clean_mask(state, numlock);
        self.buttons
            .iter()
            .find(|b| {
                b.click == click
                    && u8::from(b.button) == button
                    && clean_mask(b.mask, numlock) == state
            })
            .map(|b| &b.action)
    }
} // ]]] === Bindings ===

#[cfg(test)]
mod tests {
    use super::*;

    const MOD4: u16 = 0x0040;
    const SHIFT: u16 = 0x0001;
    const NUMLOCK: u16 = 0x0010;
    const LOCK: u16 = 0x0002;

    fn bindings() -> Bindings {
        let mut modes = IndexMap::new();
        let mut normal = IndexMap::new();
        normal.insert(String::from("mod+t"), String::from("spawn st"));
        normal.insert(String::from("mod+shift+q"), String::from("push-mode quit"));
        normal.insert(String::from("mod+q"), String::from("kill-client"));
        modes.insert(Mode::Normal, normal);

        let mut quit = IndexMap::new();
        quit.insert(String::from("y"), String::from("quit"));
        quit.insert(String::from("Escape"), String::from("pop-mode"));
        modes.insert(Mode::Quit, quit);

        let mut buttons = IndexMap::new();
        buttons.insert(String::from("tag-bar:button1"), String::from("view"));
        buttons.insert(String::from("client-win:mod+button1"), String::from("move-mouse"));

        match Bindings::new(&modes, &buttons, ModMask::Mod4) {
            Ok(b) => b,
            Err(e) => panic!("{:?}", e),
        }
    }

    #[test]
    fn parse_chords() {
        let chord = KeyChord::parse("mod+shift+Return", ModMask::Mod4).ok();
        assert_eq!(
            chord,
            Some(KeyChord {
                mask:   MOD4 | SHIFT,
                keysym: 0xff0d,
            })
        );
        assert!(KeyChord::parse("mod+", ModMask::Mod4).is_err());
        assert!(KeyChord::parse("hyper+a", ModMask::Mod4).is_err());
        assert!(KeyChord::parse("mod+NotAKey", ModMask::Mod4).is_err());
    }

    #[test]
    fn key_lookup_ignores_locks() {
        let b = bindings();
        assert_eq!(
            b.find_key(Mode::Normal, 0x74, MOD4 | NUMLOCK | LOCK, NUMLOCK),
            Some(&Action::Spawn(vec![String::from("st")]))
        );
        assert_eq!(b.find_key(Mode::Normal, 0x74, MOD4 | SHIFT, NUMLOCK), None);
        assert_eq!(
            b.find_key(Mode::Normal, 0x71, MOD4 | SHIFT, NUMLOCK),
            Some(&Action::PushMode(Mode::Quit))
        );
    }

    #[test]
    fn modes_have_separate_tables() {
        let b = bindings();
        assert_eq!(b.find_key(Mode::Quit, 0x79, 0, NUMLOCK), Some(&Action::Quit));
        assert_eq!(b.find_key(Mode::Normal, 0x79, 0, NUMLOCK), None);
        assert!(b.keys(Mode::Surf).is_empty());
    }

    #[test]
    fn earlier_bindings_shadow_later_ones() {
        let mut modes = IndexMap::new();
        let mut normal = IndexMap::new();
        normal.insert(String::from("mod+q"), String::from("kill-client"));
        normal.insert(String::from("mod4+q"), String::from("quit"));
        modes.insert(Mode::Normal, normal);

        let b = Bindings::new(&modes, &IndexMap::new(), ModMask::Mod4).ok();
        let found = b.as_ref().and_then(|b| b.find_key(Mode::Normal, 0x71, MOD4, NUMLOCK));
        assert_eq!(found, Some(&Action::KillClient));
    }

    #[test]
    fn button_lookup() {
        let b = bindings();
        assert_eq!(b.find_button(Click::TagBar, 1, 0, NUMLOCK), Some(&Action::View(0)));
        assert_eq!(
            b.find_button(Click::ClientWin, 1, MOD4 | NUMLOCK, NUMLOCK),
            Some(&Action::MoveMouse)
        );
        assert_eq!(b.find_button(Click::ClientWin, 1, 0, NUMLOCK), None);
        assert_eq!(b.client_buttons().count(), 1);
    }

    #[test]
    fn bad_button_bindings() {
        assert!(ButtonBinding::parse("nowhere:button1", "view", ModMask::Mod4).is_err());
        assert!(ButtonBinding::parse("tag-bar", "view", ModMask::Mod4).is_err());
        assert!(ButtonBinding::parse("tag-bar:button9", "view", ModMask::Mod4).is_err());
        assert!(ButtonBinding::parse("tag-bar:button1", "fly", ModMask::Mod4).is_err());
    }
}
