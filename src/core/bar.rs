//! The status bar as a list of drawing operations. Nothing here talks to the
//! X server: the plan is handed to [`XConn::draw_bar`](crate::x::XConn) which
//! renders it into the bar window

use super::{decoration::SchemeKind, TagMask};
use crate::{geometry::Rectangle, statusbar::StatusBar};
use strum::{Display, EnumString};

/// The ellipsis appended to truncated text
const ELLIPSIS: &str = "...";

/// Where a pointer button was pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum Click {
    /// On a tag cell
    TagBar,
    /// On the status text
    StatusText,
    /// On the title or mode label
    WinTitle,
    /// On a managed client
    ClientWin,
    /// Anywhere else
    RootWin,
}

/// A single drawing operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DrawOp {
    /// A rectangle, outlined or filled with the scheme's foreground (or
    /// background when inverted)
    Rect {
        rect:   Rectangle,
        scheme: SchemeKind,
        filled: bool,
        invert: bool,
    },
    /// A background fill with text on top, `pad` pixels from the left edge
    Text {
        rect:   Rectangle,
        scheme: SchemeKind,
        pad:    i32,
        text:   String,
        invert: bool,
    },
}

/// The selected client as shown in the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Title<'a> {
    pub(crate) name:     &'a str,
    pub(crate) floating: bool,
    pub(crate) fixed:    bool,
}

/// Everything that ends up in one monitor's bar
#[derive(Debug, Clone, Copy)]
pub(crate) struct BarState<'a> {
    /// Width of the bar, which is the monitor's window-area width
    pub(crate) width:       i32,
    /// Height of the bar
    pub(crate) height:      i32,
    /// Horizontal padding added to every text cell
    pub(crate) lrpad:       i32,
    /// Height of the font
    pub(crate) font_height: i32,
    /// Tag names
    pub(crate) tags:        &'a [String],
    /// Tags that hold at least one client of the monitor
    pub(crate) occupied:    TagMask,
    /// Tags that hold an urgent client of the monitor
    pub(crate) urgent:      TagMask,
    /// Tags the monitor shows
    pub(crate) selected:    TagMask,
    /// The status text
    pub(crate) status:      &'a StatusBar,
    /// Whether the status text is drawn on this bar
    pub(crate) draw_status: bool,
    /// Label of the active mode
    pub(crate) mode_label:  Option<&'a str>,
    /// The monitor's selected client
    pub(crate) title:       Option<Title<'a>>,
}

/// A tag drawn in the bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TagCell {
    /// Index of the tag
    pub(crate) index: usize,
    /// Left edge
    pub(crate) x:     i32,
    /// Width, padding included
    pub(crate) width: i32,
}

/// Cells of the tags that are shown: those that are occupied or selected
pub(crate) fn tag_cells(
    tags: &[String],
    occupied: TagMask,
    selected: TagMask,
    lrpad: i32,
    measure: &dyn Fn(&str) -> i32,
) -> Vec<TagCell> {
    let mut x = 0;
    tags.iter()
        .enumerate()
        .filter(|(i, _)| (occupied | selected) & (1 << *i) != 0)
        .map(|(index, name)| {
            let width = measure(name) + lrpad;
            let cell = TagCell { index, x, width };
            x += width;
            cell
        })
        .collect()
}

/// What a press on the bar at `x` hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BarHit {
    /// A tag, given as its mask
    Tag(TagMask),
    /// The status text
    Status,
    /// The title area
    Title,
}

/// Classify a press at `x` on a bar of width `bar_width`
pub(crate) fn hit_test(x: i32, cells: &[TagCell], bar_width: i32, status_width: i32) -> BarHit {
    if let Some(cell) = cells.iter().find(|c| x < c.x + c.width) {
        return BarHit::Tag(1 << cell.index);
    }

    if x > bar_width - status_width {
        BarHit::Status
    } else {
        BarHit::Title
    }
}

/// Shorten `text` so it fits in `available` pixels, ending it with an
/// ellipsis when cut. Returns `None` when not even the ellipsis fits
pub(crate) fn fit_text(text: &str, available: i32, measure: &dyn Fn(&str) -> i32) -> Option<String> {
    if available <= 0 {
        return None;
    }
    if measure(text) <= available {
        return Some(text.to_string());
    }

    let chars = text.chars().collect::<Vec<_>>();
    (0..chars.len())
        .rev()
        .map(|len| {
            let mut cut = chars[..len].iter().collect::<String>();
            cut.push_str(ELLIPSIS);
            cut
        })
        .find(|cut| measure(cut) <= available)
}

/// Turn a [`BarState`] into drawing operations, back to front
pub(crate) fn plan(state: &BarState, measure: &dyn Fn(&str) -> i32) -> Vec<DrawOp> {
    let underline = state.height / 10;
    let text_height = state.height - underline;
    let mut ops = vec![DrawOp::Rect {
        rect:   Rectangle::new(0, 0, state.width, state.height),
        scheme: SchemeKind::Normal,
        filled: true,
        invert: true,
    }];

    let text = |x: i32, width: i32, scheme, pad: i32, s: &str, invert| -> DrawOp {
        DrawOp::Text {
            rect: Rectangle::new(x, 0, width, text_height),
            scheme,
            pad,
            text: fit_text(s, width - pad, measure).unwrap_or_default(),
            invert,
        }
    };

    let status_width = state.status.width;
    if state.draw_status {
        let mut x = state.width - status_width;
        for segment in state.status.segments() {
            let w = measure(segment);
            ops.push(text(x, w, SchemeKind::Normal, 0, segment, false));
            x += w;
        }
    }

    let mut x = 0;
    for cell in tag_cells(state.tags, state.occupied, state.selected, state.lrpad, measure) {
        let bit = 1 << cell.index;
        let selected = state.selected & bit != 0;
        let scheme = if selected {
            SchemeKind::Selected
        } else {
            SchemeKind::Normal
        };

        ops.push(text(
            cell.x,
            cell.width,
            scheme,
            state.lrpad / 2,
            &state.tags[cell.index],
            state.urgent & bit != 0,
        ));

        if selected {
            ops.push(DrawOp::Rect {
                rect:   Rectangle::new(cell.x, state.height - underline, cell.width, underline),
                scheme: SchemeKind::Selected,
                filled: true,
                invert: false,
            });
        }
        x = cell.x + cell.width;
    }

    let width = state.width - status_width - x;
    if width <= state.height {
        return ops;
    }

    if let Some(label) = state.mode_label {
        let label_width = (measure(label) + state.lrpad).min(width);
        ops.push(text(x, label_width, SchemeKind::AppLaunch, state.lrpad / 2, label, false));
        if width > label_width {
            ops.push(DrawOp::Rect {
                rect:   Rectangle::new(x + label_width, 0, width - label_width, state.height),
                scheme: SchemeKind::Normal,
                filled: true,
                invert: true,
            });
        }
    } else if let Some(title) = state.title {
        ops.push(text(x, width, SchemeKind::Normal, state.lrpad / 2, title.name, false));
        if title.floating {
            let side = state.font_height / 6 + 2;
            let offset = state.font_height / 9;
            ops.push(DrawOp::Rect {
                rect:   Rectangle::new(x + offset, offset, side, side),
                scheme: SchemeKind::Normal,
                filled: title.fixed,
                invert: false,
            });
        }
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    /// Every character is 10 pixels wide
    fn measure(s: &str) -> i32 {
        s.chars().count() as i32 * 10
    }

    fn tags() -> Vec<String> {
        ["Main", ">_", "3", "4"].iter().map(ToString::to_string).collect()
    }

    #[test]
    fn click_names() {
        assert_eq!(Click::from_str("tag-bar").ok(), Some(Click::TagBar));
        assert_eq!(Click::from_str("client-win").ok(), Some(Click::ClientWin));
        assert_eq!(Click::StatusText.to_string(), "status-text");
        assert!(Click::from_str("title").is_err());
    }

    #[test]
    fn only_occupied_or_selected_tags_get_cells() {
        let cells = tag_cells(&tags(), 0b1000, 0b0001, 10, &measure);
        assert_eq!(cells, vec![
            TagCell {
                index: 0,
                x:     0,
                width: 50,
            },
            TagCell {
                index: 3,
                x:     50,
                width: 20,
            },
        ]);
    }

    #[test]
    fn hit_testing() {
        let cells = tag_cells(&tags(), 0b1000, 0b0001, 10, &measure);
        assert_eq!(hit_test(0, &cells, 500, 100), BarHit::Tag(0b0001));
        assert_eq!(hit_test(49, &cells, 500, 100), BarHit::Tag(0b0001));
        assert_eq!(hit_test(50, &cells, 500, 100), BarHit::Tag(0b1000));
        assert_eq!(hit_test(70, &cells, 500, 100), BarHit::Title);
        assert_eq!(hit_test(400, &cells, 500, 100), BarHit::Title);
        assert_eq!(hit_test(401, &cells, 500, 100), BarHit::Status);
    }

    #[test]
    fn text_is_cut_with_an_ellipsis() {
        assert_eq!(fit_text("hello", 50, &measure).as_deref(), Some("hello"));
        assert_eq!(fit_text("hello world", 60, &measure).as_deref(), Some("hel..."));
        assert_eq!(fit_text("hello", 20, &measure), None);
        assert_eq!(fit_text("hello", 0, &measure), None);
    }

    #[test]
    fn plan_draws_underline_and_title_box() {
        let status = StatusBar::with_text("abc", &measure);
        let tags = tags();
        let state = BarState {
            width:       500,
            height:      20,
            lrpad:       10,
            font_height: 18,
            tags:        &tags,
            occupied:    0b0001,
            urgent:      0,
            selected:    0b0001,
            status:      &status,
            draw_status: true,
            mode_label:  None,
            title:       Some(Title {
                name:     "st",
                floating: true,
                fixed:    true,
            }),
        };
        let ops = plan(&state, &measure);

        assert!(ops.contains(&DrawOp::Rect {
            rect:   Rectangle::new(0, 18, 50, 2),
            scheme: SchemeKind::Selected,
            filled: true,
            invert: false,
        }));
        assert!(ops.contains(&DrawOp::Rect {
            rect:   Rectangle::new(52, 2, 5, 5),
            scheme: SchemeKind::Normal,
            filled: true,
            invert: false,
        }));
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, rect, .. } if text == "abc" && rect.x == 500 - status.width
        )));
    }

    #[test]
    fn mode_label_replaces_title() {
        let status = StatusBar::with_text("", &measure);
        let tags = tags();
        let state = BarState {
            width:       500,
            height:      20,
            lrpad:       10,
            font_height: 18,
            tags:        &tags,
            occupied:    0,
            urgent:      0,
            selected:    0b0001,
            status:      &status,
            draw_status: false,
            mode_label:  Some("Quit?"),
            title:       Some(Title {
                name:     "st",
                floating: false,
                fixed:    false,
            }),
        };
        let ops = plan(&state, &measure);

        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, scheme: SchemeKind::AppLaunch, .. } if text == "Quit?"
        )));
        assert!(!ops.iter().any(|op| matches!(op, DrawOp::Text { text, .. } if text == "st")));
    }
}
