//! Actions that key and button bindings trigger

use super::{mode::Mode, TagMask};
use crate::error::Error;
use std::{fmt, str::FromStr};

/// Placeholder in `spawn` arguments replaced with the selected monitor
pub(crate) const MONITOR_PLACEHOLDER: &str = "{monitor}";

/// Something the window manager can be asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    /// Launch a detached process
    Spawn(Vec<String>),
    /// Collapse the mode stack, then launch a detached process
    SpawnReset(Vec<String>),
    /// Run a command line with the configured shell
    Shell(String),
    /// Show the given tags on the selected monitor
    View(TagMask),
    /// Toggle the given tags on the selected monitor
    ToggleView(TagMask),
    /// Move the selected client to the given tags
    Tag(TagMask),
    /// Toggle the given tags on the selected client
    ToggleTag(TagMask),
    /// Cycle focus through the visible clients
    FocusStack(i32),
    /// Focus the next/previous monitor
    FocusMonitor(i32),
    /// Send the selected client to the next/previous monitor
    TagMonitor(i32),
    /// Grow or shrink the master column, in percent
    SetMfact(i32),
    /// Switch between tile and monocle
    ToggleLayout,
    /// Toggle the selected client floating
    ToggleFloating,
    /// Move the selected client to the master position
    MakeMain,
    /// Close the selected client
    KillClient,
    /// Move the selected floating client vertically
    MoveVert(i32),
    /// Move the selected floating client horizontally
    MoveHoriz(i32),
    /// Resize the selected floating client, or change the gap
    ResizeWindow(i32),
    /// Change the aspect ratio of the selected floating client
    AspectRatio(i32),
    /// Enter an input mode
    PushMode(Mode),
    /// Leave the current input mode
    PopMode,
    /// Return to the base input mode
    ResetMode,
    /// Exit the window manager
    Quit,
    /// Move the selected client with the pointer
    MoveMouse,
    /// Resize the selected client with the pointer
    ResizeMouse,
    /// Signal the status bar process with the given button
    SigStatusBar(i32),
}

impl Action {
    /// Actions bound on the tag bar with a zero mask act on the clicked tag
    pub(crate) fn with_clicked_tag(&self, clicked: TagMask) -> Self {
        match self {
            Self::View(0) => Self::View(clicked),
            Self::ToggleView(0) => Self::ToggleView(clicked),
            Self::Tag(0) => Self::Tag(clicked),
            Self::ToggleTag(0) => Self::ToggleTag(clicked),
            other => other.clone(),
        }
    }
}

/// Parse a tag mask: decimal, `0x` hexadecimal, `1<<n`, or `all`
pub(crate) fn parse_mask(s: &str) -> Result<TagMask, Error> {
    let invalid = || Error::InvalidAction(format!("invalid tag mask: {}", s));
    let s = s.trim();

    if s == "all" {
        return Ok(!0);
    }

    if let Some(hex) = s.strip_prefix("0x") {
        return TagMask::from_str_radix(hex, 16).map_err(|_| invalid());
    }

    if let Some((base, shift)) = s.split_once("<<") {
        let base = base.trim().parse::<TagMask>().map_err(|_| invalid())?;
        let shift = shift.trim().parse::<u32>().map_err(|_| invalid())?;
        return base.checked_shl(shift).ok_or_else(invalid);
    }

    s.parse::<TagMask>().map_err(|_| invalid())
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| Error::InvalidAction(String::from("empty action")))?;
        let args = words.map(ToString::to_string).collect::<Vec<_>>();

        let mask = || -> Result<TagMask, Error> {
            args.first().map_or(Ok(0), |a| parse_mask(a))
        };
        let int = || -> Result<i32, Error> {
            let arg = args.first().ok_or_else(|| {
                Error::InvalidAction(format!("'{}' requires a numeric argument", name))
            })?;
            arg.parse::<i32>()
                .map_err(|_| Error::InvalidAction(format!("invalid number '{}' for {}", arg, name)))
        };
        let argv = || -> Result<Vec<String>, Error> {
            if args.is_empty() {
                Err(Error::InvalidAction(format!("'{}' requires a command", name)))
            } else {
                Ok(args.clone())
            }
        };

        Ok(match name {
            "spawn" => Self::Spawn(argv()?),
            "spawn-reset" => Self::SpawnReset(argv()?),
            "shell" => {
                let line = s.trim_start()[name.len()..].trim();
                if line.is_empty() {
                    return Err(Error::InvalidAction(String::from(
                        "'shell' requires a command line",
                    )));
                }
                Self::Shell(line.to_string())
            },
            "view" => Self::View(mask()?),
            "toggle-view" => Self::ToggleView(mask()?),
            "tag" => Self::Tag(mask()?),
            "toggle-tag" => Self::ToggleTag(mask()?),
            "focus-stack" => Self::FocusStack(int()?),
            "focus-monitor" => Self::FocusMonitor(int()?),
            "tag-monitor" => Self::TagMonitor(int()?),
            "set-mfact" => Self::SetMfact(int()?),
            "toggle-layout" => Self::ToggleLayout,
            "toggle-floating" => Self::ToggleFloating,
            "make-main" => Self::MakeMain,
            "kill-client" => Self::KillClient,
            "move-vert" => Self::MoveVert(int()?),
            "move-horiz" => Self::MoveHoriz(int()?),
            "resize-window" => Self::ResizeWindow(int()?),
            "aspect-ratio" => Self::AspectRatio(int()?),
            "push-mode" => {
                let mode = args.first().ok_or_else(|| {
                    Error::InvalidAction(String::from("'push-mode' requires a mode name"))
                })?;
                Self::PushMode(
                    Mode::from_str(mode)
                        .map_err(|_| Error::InvalidAction(format!("unknown mode '{}'", mode)))?,
                )
            },
            "pop-mode" => Self::PopMode,
            "reset-mode" => Self::ResetMode,
            "quit" => Self::Quit,
            "move-mouse" => Self::MoveMouse,
            "resize-mouse" => Self::ResizeMouse,
            "sig-statusbar" => Self::SigStatusBar(int()?),
            other => return Err(Error::InvalidAction(format!("unknown action '{}'", other))),
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Spawn(argv) => write!(f, "spawn {}", argv.join(" ")),
            Self::SpawnReset(argv) => write!(f, "spawn-reset {}", argv.join(" ")),
            Self::Shell(line) => write!(f, "shell {}", line),
            Self::View(m) => write!(f, "view {:#x}", m),
            Self::ToggleView(m) => write!(f, "toggle-view {:#x}", m),
            Self::Tag(m) => write!(f, "tag {:#x}", m),
            Self::ToggleTag(m) => write!(f, "toggle-tag {:#x}", m),
            Self::FocusStack(i) => write!(f, "focus-stack {}", i),
            Self::FocusMonitor(i) => write!(f, "focus-monitor {}", i),
            Self::TagMonitor(i) => write!(f, "tag-monitor {}", i),
            Self::SetMfact(i) => write!(f, "set-mfact {}", i),
            Self::ToggleLayout => write!(f, "toggle-layout"),
            Self::ToggleFloating => write!(f, "toggle-floating"),
            Self::MakeMain => write!(f, "make-main"),
            Self::KillClient => write!(f, "kill-client"),
            Self::MoveVert(i) => write!(f, "move-vert {}", i),
            Self::MoveHoriz(i) => write!(f, "move-horiz {}", i),
            Self::ResizeWindow(i) => write!(f, "resize-window {}", i),
            Self::AspectRatio(i) => write!(f, "aspect-ratio {}", i),
            Self::PushMode(m) => write!(f, "push-mode {}", m),
            Self::PopMode => write!(f, "pop-mode"),
            Self::ResetMode => write!(f, "reset-mode"),
            Self::Quit => write!(f, "quit"),
            Self::MoveMouse => write!(f, "move-mouse"),
            Self::ResizeMouse => write!(f, "resize-mouse"),
            Self::SigStatusBar(i) => write!(f, "sig-statusbar {}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks() {
        assert_eq!(parse_mask("5").ok(), Some(5));
        assert_eq!(parse_mask("0x1f").ok(), Some(0x1f));
        assert_eq!(parse_mask("1<<8").ok(), Some(256));
        assert_eq!(parse_mask("1 << 2").ok(), Some(4));
        assert_eq!(parse_mask("all").ok(), Some(!0));
        assert!(parse_mask("1<<40").is_err());
        assert!(parse_mask("zz").is_err());
    }

    #[test]
    fn parse_actions() {
        assert_eq!(
            "spawn st nvim".parse::<Action>().ok(),
            Some(Action::Spawn(vec![String::from("st"), String::from("nvim")]))
        );
        assert_eq!("view".parse::<Action>().ok(), Some(Action::View(0)));
        assert_eq!("view all".parse::<Action>().ok(), Some(Action::View(!0)));
        assert_eq!("tag 1<<3".parse::<Action>().ok(), Some(Action::Tag(8)));
        assert_eq!("focus-stack -1".parse::<Action>().ok(), Some(Action::FocusStack(-1)));
        assert_eq!("set-mfact +5".parse::<Action>().ok(), Some(Action::SetMfact(5)));
        assert_eq!(
            "push-mode browser".parse::<Action>().ok(),
            Some(Action::PushMode(Mode::Browser))
        );
        assert_eq!("sig-statusbar 3".parse::<Action>().ok(), Some(Action::SigStatusBar(3)));
        assert_eq!(
            "shell  slock && xset dpms force off ".parse::<Action>().ok(),
            Some(Action::Shell(String::from("slock && xset dpms force off")))
        );
    }

    #[test]
    fn reject_bad_actions() {
        assert!("".parse::<Action>().is_err());
        assert!("explode".parse::<Action>().is_err());
        assert!("spawn".parse::<Action>().is_err());
        assert!("shell   ".parse::<Action>().is_err());
        assert!("focus-stack".parse::<Action>().is_err());
        assert!("focus-stack up".parse::<Action>().is_err());
        assert!("push-mode insert".parse::<Action>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in ["toggle-layout", "move-vert -1", "push-mode quit", "spawn-reset surf -c x"] {
            let action = text.parse::<Action>().ok();
            assert_eq!(action.map(|a| a.to_string()).as_deref(), Some(text));
        }
    }

    #[test]
    fn clicked_tag_fills_zero_masks() {
        assert_eq!(Action::View(0).with_clicked_tag(4), Action::View(4));
        assert_eq!(Action::ToggleTag(0).with_clicked_tag(2), Action::ToggleTag(2));
        assert_eq!(Action::View(1).with_clicked_tag(4), Action::View(1));
        assert_eq!(Action::Quit.with_clicked_tag(4), Action::Quit);
    }
}
