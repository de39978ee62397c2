//! ICCCM size constraints and the resolver that applies them to a proposed
//! client geometry

use crate::{
    geometry::{Dimension, Rectangle},
    monitor::client::Client,
    x::property::SizeHints,
};
use serde::{Deserialize, Serialize};
use std::cmp;

// ========================= SizeConstraints ========================== [[[

/// Size constraints read from a client's `WM_NORMAL_HINTS`. A zero value
/// means the constraint is absent
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct SizeConstraints {
    /// Base width, subtracted before increments are applied
    pub(crate) base_width:  i32,
    /// Base height, subtracted before increments are applied
    pub(crate) base_height: i32,
    /// Width increment
    pub(crate) inc_width:   i32,
    /// Height increment
    pub(crate) inc_height:  i32,
    /// Maximum width
    pub(crate) max_width:   i32,
    /// Maximum height
    pub(crate) max_height:  i32,
    /// Minimum width
    pub(crate) min_width:   i32,
    /// Minimum height
    pub(crate) min_height:  i32,
    /// Lower bound of `height / width`
    pub(crate) min_aspect:  f32,
    /// Upper bound of `width / height`
    pub(crate) max_aspect:  f32,
}

impl SizeConstraints {
    /// Build the constraints from the hints a client advertises. The base
    /// size falls back to the minimum size and vice-versa
    pub(crate) fn from_hints(hints: Option<&SizeHints>) -> Self {
        let hints = match hints {
            Some(h) => h,
            None => return Self::default(),
        };

        let (base_width, base_height) = hints.base_size.or(hints.min_size).unwrap_or((0, 0));
        let (min_width, min_height) = hints.min_size.or(hints.base_size).unwrap_or((0, 0));
        let (inc_width, inc_height) = hints.size_increment.unwrap_or((0, 0));
        let (max_width, max_height) = hints.max_size.unwrap_or((0, 0));

        let (min_aspect, max_aspect) = match hints.aspect {
            Some(((min_num, min_den), (max_num, max_den))) if min_num != 0 && max_den != 0 =>
                (min_den as f32 / min_num as f32, max_num as f32 / max_den as f32),
            _ => (0.0, 0.0),
        };

        Self {
            base_width,
            base_height,
            inc_width,
            inc_height,
            max_width,
            max_height,
            min_width,
            min_height,
            min_aspect,
            max_aspect,
        }
    }

    /// A client whose minimum and maximum sizes agree cannot be resized
    pub(crate) const fn is_fixed(&self) -> bool {
        self.max_width != 0
            && self.max_height != 0
            && self.max_width == self.min_width
            && self.max_height == self.min_height
    }
} // ]]] === SizeConstraints ===

// ============================== Bounds ============================== [[[

/// Everything besides the client itself that the resolver needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bounds {
    /// Size of the whole virtual screen
    pub(crate) screen:     Dimension,
    /// Window area of the client's monitor
    pub(crate) area:       Rectangle,
    /// Height of the status bar, which is also the smallest allowed side
    pub(crate) bar_height: i32,
    /// Gap between tiled windows
    pub(crate) gap:        i32,
} // ]]] === Bounds ===

/// Correct `proposed` so it honors the client's constraints. The returned
/// flag reports whether the result differs from the client's stored geometry
pub(crate) fn apply_size_hints(
    client: &Client,
    proposed: Rectangle,
    interactive: bool,
    bounds: &Bounds,
) -> (Rectangle, bool) {
    let Rectangle {
        mut x,
        mut y,
        mut width,
        mut height,
    } = proposed;
    let bw = client.border_width;
    let gapped_width = client.rect.width + 2 * bw + bounds.gap;
    let gapped_height = client.rect.height + 2 * bw + bounds.gap;

    width = cmp::max(1, width);
    height = cmp::max(1, height);

    if interactive {
        if x > bounds.screen.width {
            x = bounds.screen.width - gapped_width;
        }
        if y > bounds.screen.height {
            y = bounds.screen.height - gapped_height;
        }
        if x + width + 2 * bw < 0 {
            x = 0;
        }
        if y + height + 2 * bw < 0 {
            y = 0;
        }
    } else {
        let area = bounds.area;
        if x >= area.right() {
            x = area.right() - gapped_width;
        }
        if y >= area.bottom() {
            y = area.bottom() - gapped_height;
        }
        if x + width + 2 * bw <= area.x {
            x = area.x;
        }
        if y + height + 2 * bw <= area.y {
            y = area.y;
        }
    }

    height = cmp::max(height, bounds.bar_height);
    width = cmp::max(width, bounds.bar_height);

    if client.is_floating() {
        let (w, h) = constrain(&client.hints, width, height);
        width = w;
        height = h;
    }

    let rect = Rectangle::new(x, y, width, height);
    (rect, rect != client.rect)
}

/// Apply base size, aspect, increments and min/max (ICCCM 4.1.2.3)
fn constrain(hints: &SizeConstraints, mut width: i32, mut height: i32) -> (i32, i32) {
    let base_is_min =
        hints.base_width == hints.min_width && hints.base_height == hints.min_height;

    if !base_is_min {
        width -= hints.base_width;
        height -= hints.base_height;
    }

    if hints.min_aspect > 0.0 && hints.max_aspect > 0.0 && width > 0 && height > 0 {
        if hints.max_aspect < width as f32 / height as f32 {
            width = (height as f32 * hints.max_aspect + 0.5) as i32;
        } else if hints.min_aspect < height as f32 / width as f32 {
            height = (width as f32 * hints.min_aspect + 0.5) as i32;
        }
    }

    // increments are relative to the base size
    if base_is_min {
        width -= hints.base_width;
        height -= hints.base_height;
    }

    if hints.inc_width > 0 {
        width -= width % hints.inc_width;
    }
    if hints.inc_height > 0 {
        height -= height % hints.inc_height;
    }

    width = cmp::max(width + hints.base_width, hints.min_width);
    height = cmp::max(height + hints.base_height, hints.min_height);

    if hints.max_width > 0 {
        width = cmp::min(width, hints.max_width);
    }
    if hints.max_height > 0 {
        height = cmp::min(height, hints.max_height);
    }

    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            screen:     Dimension::new(1920, 1080),
            area:       Rectangle::new(0, 20, 1920, 1060),
            bar_height: 20,
            gap:        0,
        }
    }

    fn floating_client(hints: SizeConstraints) -> Client {
        let mut client = Client::new(1, Rectangle::new(100, 100, 300, 300), 0);
        client.border_width = 2;
        client.hints = hints;
        client.set_floating(true);
        client
    }

    #[test]
    fn fixed_client_keeps_its_size() {
        let hints = SizeConstraints::from_hints(Some(&SizeHints {
            min_size: Some((200, 100)),
            max_size: Some((200, 100)),
            ..SizeHints::default()
        }));
        assert!(hints.is_fixed());

        let client = floating_client(hints);
        for proposed in [
            Rectangle::new(0, 0, 1, 1),
            Rectangle::new(50, 60, 2000, 2000),
            Rectangle::new(10, 10, 200, 100),
            Rectangle::new(-500, -500, 0, -7),
        ] {
            for interactive in [true, false] {
                let (rect, _) = apply_size_hints(&client, proposed, interactive, &bounds());
                assert_eq!((rect.width, rect.height), (200, 100));
            }
        }
    }

    #[test]
    fn missing_hints_are_not_fixed() {
        let hints = SizeConstraints::from_hints(None);
        assert_eq!(hints, SizeConstraints::default());
        assert!(!hints.is_fixed());
    }

    #[test]
    fn base_size_falls_back_to_min_size() {
        let hints = SizeConstraints::from_hints(Some(&SizeHints {
            min_size: Some((40, 30)),
            ..SizeHints::default()
        }));
        assert_eq!((hints.base_width, hints.base_height), (40, 30));
        assert_eq!((hints.min_width, hints.min_height), (40, 30));
    }

    #[test]
    fn increments_snap_relative_to_base() {
        let hints = SizeConstraints {
            base_width: 4,
            base_height: 4,
            inc_width: 10,
            inc_height: 20,
            ..SizeConstraints::default()
        };
        let client = floating_client(hints);
        let (rect, _) =
            apply_size_hints(&client, Rectangle::new(100, 100, 127, 95), false, &bounds());
        assert_eq!((rect.width, rect.height), (124, 84));
    }

    #[test]
    fn aspect_limits_width() {
        let hints = SizeConstraints {
            min_aspect: 0.5,
            max_aspect: 1.0,
            ..SizeConstraints::default()
        };
        let client = floating_client(hints);
        let (rect, _) =
            apply_size_hints(&client, Rectangle::new(100, 100, 400, 200), false, &bounds());
        assert_eq!((rect.width, rect.height), (200, 200));
    }

    #[test]
    fn tiled_clients_ignore_hints() {
        let hints = SizeConstraints {
            max_width: 100,
            max_height: 100,
            ..SizeConstraints::default()
        };
        let mut client = floating_client(hints);
        client.set_floating(false);
        let (rect, _) =
            apply_size_hints(&client, Rectangle::new(100, 100, 400, 400), false, &bounds());
        assert_eq!((rect.width, rect.height), (400, 400));
    }

    #[test]
    fn sides_never_drop_below_bar_height() {
        let client = floating_client(SizeConstraints::default());
        let (rect, changed) =
            apply_size_hints(&client, Rectangle::new(100, 100, 0, -4), false, &bounds());
        assert_eq!((rect.width, rect.height), (20, 20));
        assert!(changed);
    }

    #[test]
    fn offscreen_position_is_pulled_into_window_area() {
        let client = floating_client(SizeConstraints::default());
        let (rect, _) =
            apply_size_hints(&client, Rectangle::new(-1000, 5000, 300, 300), false, &bounds());
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 1080 - 304);
    }

    #[test]
    fn unchanged_geometry_is_reported() {
        let client = floating_client(SizeConstraints::default());
        let (_, changed) = apply_size_hints(&client, client.rect, false, &bounds());
        assert!(!changed);
    }
}
