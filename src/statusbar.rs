//! The status text and its companion process
//!
//! The root window's name is shown right-aligned in the bar of the selected
//! monitor. Control characters split it into segments; clicking a segment
//! signals the companion process with the control character preceding it

use crate::{core::default_status, process};
use anyhow::Result;

/// Status text and the state needed to signal its producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusBar {
    /// The raw text, separators included
    pub(crate) text:    String,
    /// Width of the drawn text plus a small margin
    pub(crate) width:   i32,
    /// Separator preceding the last clicked segment
    pub(crate) signal:  i32,
    /// Cached pid of the companion process
    pub(crate) pid:     Option<u32>,
    /// Executable name of the companion process
    pub(crate) program: String,
}

/// Separators are the ASCII control characters
fn is_separator(c: char) -> bool {
    (c as u32) < u32::from(b' ')
}

impl StatusBar {
    /// Create an empty status bar whose companion is `program`
    pub(crate) fn new(program: &str) -> Self {
        Self {
            text:    String::new(),
            width:   0,
            signal:  0,
            pid:     None,
            program: program.to_string(),
        }
    }

    /// Status bar showing `text`, without a companion
    #[cfg(test)]
    pub(crate) fn with_text(text: &str, measure: &dyn Fn(&str) -> i32) -> Self {
        let mut bar = Self::new("");
        bar.set_text(Some(text.to_string()), measure);
        bar
    }

    /// Replace the text. `None` shows the version string
    pub(crate) fn set_text(&mut self, text: Option<String>, measure: &dyn Fn(&str) -> i32) {
        self.text = text.unwrap_or_else(default_status);
        self.width = self.segments().map(measure).sum::<i32>() + 2;
    }

    /// The drawn pieces of the text
    pub(crate) fn segments(&self) -> impl Iterator<Item = &str> {
        self.text.split(is_separator)
    }

    /// Find the separator preceding the segment under `x`, where `x` is
    /// relative to the left edge of the status text. Zero when the first
    /// segment was hit
    pub(crate) fn signal_at(&self, x: i32, measure: &dyn Fn(&str) -> i32) -> i32 {
        let mut edge = 0;
        let mut signal = 0;
        let mut start = 0;

        for (idx, c) in self.text.char_indices() {
            if edge > x {
                break;
            }
            if is_separator(c) {
                edge += measure(&self.text[start..idx]);
                start = idx + c.len_utf8();
                if edge >= x {
                    break;
                }
                signal = c as i32;
            }
        }

        signal
    }

    /// Remember the separator under `x`
    pub(crate) fn record_click(&mut self, x: i32, measure: &dyn Fn(&str) -> i32) {
        self.signal = self.signal_at(x, measure);
    }

    /// Pid of the companion, reusing the cached one while it still runs
    fn companion(&mut self) -> Option<u32> {
        if let Some(pid) = self.pid {
            if process::command_name(pid).as_deref() == Some(self.program.as_str()) {
                return Some(pid);
            }
        }

        self.pid = process::oldest_named(&self.program);
        self.pid
    }

    /// Tell the companion that `button` was pressed on the last clicked
    /// segment
    pub(crate) fn send_signal(&mut self, button: i32) -> Result<()> {
        if self.signal == 0 {
            return Ok(());
        }

        match self.companion() {
            Some(pid) => {
                log::debug!("signaling {} ({}) with {}", self.program, pid, self.signal);
                process::queue_signal(pid, self.signal, button)
            },
            None => {
                log::debug!("status bar process '{}' is not running", self.program);
                Ok(())
            },
        }
    }
}
