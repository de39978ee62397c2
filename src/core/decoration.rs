//! Color schemes used for borders and the bar

use crate::error::Error;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// =========================== Colorscheme ============================
// ====================================================================

/// A 24-bit RGB color
pub(crate) type Color = u32;

macro_rules! if_6 {
    ($c:ident) => {
        ($c.len() == 6).then(|| $c)
    };
}

/// Parse `#rrggbb` or `0xrrggbb`, or look the name up in `palette`
pub(crate) fn to_hex(s: &str, palette: &IndexMap<String, String>) -> Result<Color> {
    let s = palette.get(s).map_or(s, String::as_str);
    let trim = s.strip_prefix("0x").map_or_else(
        || s.strip_prefix('#').and_then(|c| if_6!(c)),
        |c| if_6!(c),
    );

    if let Some(color) = trim {
        return u32::from_str_radix(color, 16).context(format!("failed to convert {} to hex", s));
    }

    Err(Error::InvalidColor(s.to_string()).into())
}

/// The three colors a scheme is made of, as written in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SchemeSpec {
    /// Text color
    pub(crate) fg:     String,
    /// Background color
    pub(crate) bg:     String,
    /// Window border color
    pub(crate) border: String,
}

/// A resolved set of colors
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ColorScheme {
    /// Text color
    pub(crate) fg:     Color,
    /// Background color
    pub(crate) bg:     Color,
    /// Window border color
    pub(crate) border: Color,
}

impl ColorScheme {
    /// Resolve a [`SchemeSpec`] against the named colors
    pub(crate) fn new(spec: &SchemeSpec, palette: &IndexMap<String, String>) -> Result<Self> {
        Ok(Self {
            fg:     to_hex(&spec.fg, palette)?,
            bg:     to_hex(&spec.bg, palette)?,
            border: to_hex(&spec.border, palette)?,
        })
    }
}

/// Which [`ColorScheme`] to draw with
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SchemeKind {
    /// Unfocused windows and the plain bar
    Normal,
    /// Focused window, selected tags and title
    Selected,
    /// Mode label
    AppLaunch,
}

/// Every scheme the window manager draws with
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Schemes {
    pub(crate) normal:     ColorScheme,
    pub(crate) selected:   ColorScheme,
    pub(crate) app_launch: ColorScheme,
}

impl Schemes {
    /// Built-in schemes
    pub(crate) const DEFAULT: Self = Self {
        normal:     ColorScheme {
            fg:     0xBB_BBBB,
            bg:     0x22_2222,
            border: 0x44_4444,
        },
        selected:   ColorScheme {
            fg:     0xFA_2106,
            bg:     0x22_2222,
            border: 0x00_5577,
        },
        app_launch: ColorScheme {
            fg:     0xBB_BBBB,
            bg:     0x11_750A,
            border: 0x44_4444,
        },
    };

    /// Look up the scheme for `kind`
    pub(crate) const fn get(&self, kind: SchemeKind) -> &ColorScheme {
        match kind {
            SchemeKind::Normal => &self.normal,
            SchemeKind::Selected => &self.selected,
            SchemeKind::AppLaunch => &self.app_launch,
        }
    }
}

impl Default for Schemes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> IndexMap<String, String> {
        let mut p = IndexMap::new();
        p.insert(String::from("cyan"), String::from("#005577"));
        p
    }

    #[test]
    fn hex_forms() {
        let p = palette();
        assert_eq!(to_hex("#fa2106", &p).ok(), Some(0xfa2106));
        assert_eq!(to_hex("0x11750a", &p).ok(), Some(0x11750a));
        assert_eq!(to_hex("cyan", &p).ok(), Some(0x005577));
    }

    #[test]
    fn malformed_colors() {
        let p = palette();
        assert!(to_hex("#fff", &p).is_err());
        assert!(to_hex("magenta", &p).is_err());
        assert!(to_hex("#gggggg", &p).is_err());
    }

    #[test]
    fn scheme_from_spec() {
        let spec = SchemeSpec {
            fg:     String::from("#eeeeee"),
            bg:     String::from("#222222"),
            border: String::from("cyan"),
        };
        let scheme = ColorScheme::new(&spec, &palette()).ok();
        assert_eq!(
            scheme,
            Some(ColorScheme {
                fg:     0xeeeeee,
                bg:     0x222222,
                border: 0x005577,
            })
        );
    }
}
