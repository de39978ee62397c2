//! Layout functions. Each one maps the visible tiled clients of a monitor to
//! the rectangles they are offered; the gap inset is applied when the client
//! is resized

use super::{Layout, Window};
use crate::geometry::Rectangle;

/// A tiled client as seen by a layout function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tiled {
    /// The client's window
    pub(crate) window:       Window,
    /// The border width the client currently carries
    pub(crate) border_width: i32,
}

/// Parameters of a monitor relevant to the arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Arrangement {
    /// Window area of the monitor
    pub(crate) area:  Rectangle,
    /// Size of the master column in percent of the area width
    pub(crate) mfact: i32,
    /// Gap between tiled windows
    pub(crate) gap:   i32,
}

impl Layout {
    /// Compute the rectangle offered to each tiled client, in list order
    pub(crate) fn arrange(self, params: &Arrangement, clients: &[Tiled]) -> Vec<(Window, Rectangle)> {
        match self {
            Self::Tile => tile(params, clients),
            Self::Monocle => monocle(params, clients),
        }
    }
}

/// Every client fills the window area
fn monocle(params: &Arrangement, clients: &[Tiled]) -> Vec<(Window, Rectangle)> {
    clients.iter().map(|c| (c.window, params.area)).collect()
}

/// The first client gets a master column on the right side of the area, the
/// rest share the left column from top to bottom. Each stack client receives
/// the remaining height divided by the number of clients left, so rounding
/// error lands on the last one
fn tile(params: &Arrangement, clients: &[Tiled]) -> Vec<(Window, Rectangle)> {
    let area = params.area;
    let (master, stack) = match clients.split_first() {
        Some(split) => split,
        None => return vec![],
    };

    if stack.is_empty() {
        return vec![(master.window, area)];
    }

    let mut placed = Vec::with_capacity(clients.len());
    let mut master_width = area.width * params.mfact / 100;
    let bw = master.border_width;

    placed.push((
        master.window,
        Rectangle::new(
            area.x + area.width - master_width,
            area.y,
            master_width - 2 * bw,
            area.height - 2 * bw,
        ),
    ));

    master_width -= params.gap;

    let available = area.height - params.gap;
    let mut offset = 0;
    for (idx, client) in stack.iter().enumerate() {
        let remaining = (stack.len() - idx) as i32;
        let share = (available - offset) / remaining;
        let bw = client.border_width;

        placed.push((
            client.window,
            Rectangle::new(
                area.x,
                area.y + offset,
                area.width - master_width - 2 * bw,
                share - 2 * bw + params.gap,
            ),
        ));

        offset += share;
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiled(count: u32, border_width: i32) -> Vec<Tiled> {
        (1..=count)
            .map(|window| Tiled {
                window,
                border_width,
            })
            .collect()
    }

    fn params(gap: i32) -> Arrangement {
        Arrangement {
            area: Rectangle::new(0, 0, 1000, 500),
            mfact: 55,
            gap,
        }
    }

    #[test]
    fn no_clients_no_placements() {
        assert!(Layout::Tile.arrange(&params(10), &[]).is_empty());
        assert!(Layout::Monocle.arrange(&params(10), &[]).is_empty());
    }

    #[test]
    fn single_client_fills_area() {
        let placed = Layout::Tile.arrange(&params(10), &tiled(1, 2));
        assert_eq!(placed, vec![(1, Rectangle::new(0, 0, 1000, 500))]);
    }

    #[test]
    fn monocle_stacks_everything_on_the_area() {
        let placed = Layout::Monocle.arrange(&params(10), &tiled(3, 2));
        assert_eq!(placed.len(), 3);
        assert!(placed.iter().all(|(_, r)| *r == Rectangle::new(0, 0, 1000, 500)));
    }

    #[test]
    fn three_clients_master_and_two_stacked() {
        let placed = Layout::Tile.arrange(&params(10), &tiled(3, 0));
        // offered rectangles, before the gap inset
        assert_eq!(placed[0], (1, Rectangle::new(450, 0, 550, 500)));
        assert_eq!(placed[1], (2, Rectangle::new(0, 0, 460, 255)));
        assert_eq!(placed[2], (3, Rectangle::new(0, 245, 460, 255)));

        // after the inset the windows are separated by exactly one gap
        let frames: Vec<_> = placed.iter().map(|(_, r)| r.inset(10)).collect();
        assert_eq!(frames[0], Rectangle::new(460, 10, 530, 480));
        assert_eq!(frames[1], Rectangle::new(10, 10, 440, 235));
        assert_eq!(frames[2], Rectangle::new(10, 255, 440, 235));
        assert_eq!(frames[0].x - frames[1].right(), 10);
    }

    #[test]
    fn stack_shares_cover_the_column() {
        for count in [2_u32, 3, 10] {
            for gap in [0, 7, 10] {
                let params = params(gap);
                let placed = Layout::Tile.arrange(&params, &tiled(count, 0));
                let stack = &placed[1..];

                let shares: Vec<i32> = stack.iter().map(|(_, r)| r.height - gap).collect();
                assert_eq!(shares.iter().sum::<i32>(), params.area.height - gap);

                let min = shares.iter().min().copied().unwrap_or_default();
                let max = shares.iter().max().copied().unwrap_or_default();
                assert!(max - min <= 1, "count={} gap={} {:?}", count, gap, shares);

                for pair in stack.windows(2) {
                    assert_eq!(pair[0].1.y + pair[0].1.height - gap, pair[1].1.y);
                }
            }
        }
    }

    #[test]
    fn border_is_subtracted_from_offered_size() {
        let placed = Layout::Tile.arrange(&params(0), &tiled(2, 2));
        assert_eq!(placed[0].1, Rectangle::new(450, 0, 546, 496));
        assert_eq!(placed[1].1, Rectangle::new(0, 0, 446, 496));
    }
}
