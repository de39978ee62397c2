//! Keysym names understood in key chords

use crate::core::Keysym;

/// Named keysyms. Single printable Latin-1 characters map to their code point
/// and are not listed
const NAMED: &[(&str, Keysym)] = &[
    ("space", 0x0020),
    ("exclam", 0x0021),
    ("quotedbl", 0x0022),
    ("numbersign", 0x0023),
    ("dollar", 0x0024),
    ("percent", 0x0025),
    ("ampersand", 0x0026),
    ("apostrophe", 0x0027),
    ("parenleft", 0x0028),
    ("parenright", 0x0029),
    ("asterisk", 0x002a),
    ("plus", 0x002b),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("colon", 0x003a),
    ("semicolon", 0x003b),
    ("less", 0x003c),
    ("equal", 0x003d),
    ("greater", 0x003e),
    ("question", 0x003f),
    ("at", 0x0040),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("asciicircum", 0x005e),
    ("underscore", 0x005f),
    ("grave", 0x0060),
    ("braceleft", 0x007b),
    ("bar", 0x007c),
    ("braceright", 0x007d),
    ("asciitilde", 0x007e),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Scroll_Lock", 0xff14),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Page_Up", 0xff55),
    ("Next", 0xff56),
    ("Page_Down", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("Delete", 0xffff),
    ("XF86MonBrightnessUp", 0x1008_ff02),
    ("XF86MonBrightnessDown", 0x1008_ff03),
    ("XF86AudioLowerVolume", 0x1008_ff11),
    ("XF86AudioMute", 0x1008_ff12),
    ("XF86AudioRaiseVolume", 0x1008_ff13),
    ("XF86AudioPlay", 0x1008_ff14),
    ("XF86AudioStop", 0x1008_ff15),
    ("XF86AudioPrev", 0x1008_ff16),
    ("XF86AudioNext", 0x1008_ff17),
    ("XF86AudioMicMute", 0x1008_ffb2),
];

/// First function key, `F1`
const F1: Keysym = 0xffbe;

/// Resolve a keysym from its name
pub(crate) fn from_name(name: &str) -> Option<Keysym> {
    if let Some(&(_, sym)) = NAMED.iter().find(|(n, _)| *n == name) {
        return Some(sym);
    }

    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=35).contains(&n).then(|| F1 + n - 1);
    }

    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        // keysyms of letters are the lowercase code point
        (Some(c), None) if c.is_ascii_graphic() => Some(u32::from(c.to_ascii_lowercase())),
        (Some(c), None) if ('\u{a0}'..='\u{ff}').contains(&c) => Some(u32::from(c)),
        _ => None,
    }
}

/// The name of a keysym, for logging
pub(crate) fn name_of(sym: Keysym) -> String {
    if let Some((name, _)) = NAMED.iter().find(|(_, s)| *s == sym) {
        return (*name).to_string();
    }
    if (F1..F1 + 35).contains(&sym) {
        return format!("F{}", sym - F1 + 1);
    }
    char::from_u32(sym)
        .filter(char::is_ascii_graphic)
        .map_or_else(|| format!("{:#x}", sym), |c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_names() {
        assert_eq!(from_name("Return"), Some(0xff0d));
        assert_eq!(from_name("a"), Some(0x61));
        assert_eq!(from_name("A"), Some(0x61));
        assert_eq!(from_name("0"), Some(0x30));
        assert_eq!(from_name("F12"), Some(0xffc9));
        assert_eq!(from_name("XF86AudioMicMute"), Some(0x1008_ffb2));
        assert_eq!(from_name("F0"), None);
        assert_eq!(from_name("NoSuchKey"), None);
    }

    #[test]
    fn names_for_logging() {
        assert_eq!(name_of(0xff1b), "Escape");
        assert_eq!(name_of(0x71), "q");
        assert_eq!(name_of(0xffbf), "F2");
    }
}
