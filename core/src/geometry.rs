//! Pixel-space rectangles and the overlap tests shared by the world and the
//! movement controller.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle measured in whole world units.
///
/// The rectangle covers the half-open ranges `x..x + width` and
/// `y..y + height`, so two rectangles that merely share an edge do not
/// overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl PixelRect {
    /// Creates a rectangle anchored at `(x, y)` with the provided size.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle of the provided size whose center is snapped to the
    /// nearest whole unit of `center`.
    #[must_use]
    pub fn centered_on(center: Vec2, size: IVec2) -> Self {
        let half = size.as_vec2() / 2.0;
        Self::new(
            (center.x - half.x).round() as i32,
            (center.y - half.y).round() as i32,
            size.x,
            size.y,
        )
    }

    /// Left edge of the rectangle.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Top edge of the rectangle.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Horizontal extent of the rectangle.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Vertical extent of the rectangle.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Upper-left corner of the rectangle.
    #[must_use]
    pub const fn position(&self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// Width and height packed into a vector.
    #[must_use]
    pub const fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }

    /// Exact geometric center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Returns a copy of the rectangle moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: IVec2) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// The four corner pixels covered by the rectangle.
    ///
    /// Corners use the last covered pixel on each axis, so every corner lies
    /// inside the rectangle.
    #[must_use]
    pub fn corners(&self) -> [IVec2; 4] {
        let right = self.x + (self.width - 1).max(0);
        let bottom = self.y + (self.height - 1).max(0);
        [
            IVec2::new(self.x, self.y),
            IVec2::new(right, self.y),
            IVec2::new(self.x, bottom),
            IVec2::new(right, bottom),
        ]
    }

    /// Reports whether the two rectangles share at least one pixel.
    #[must_use]
    pub const fn overlaps(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Reports whether the rectangle lies entirely inside `container`.
    #[must_use]
    pub const fn is_within(&self, container: &PixelRect) -> bool {
        self.x >= container.x
            && self.y >= container.y
            && self.x + self.width <= container.x + container.width
            && self.y + self.height <= container.y + container.height
    }
}

enum AxisWindow {
    Always,
    Never,
    Between(f32, f32),
}

/// Reports whether `a` moving by `a_motion` and `b` moving by `b_motion`
/// overlap at any time during the step.
///
/// Time is normalized to `0.0..=1.0`. Rectangles that already overlap collide
/// immediately; otherwise each axis contributes the open interval during which
/// the projections overlap under relative motion, and a collision requires the
/// intervals of both axes to intersect inside the step.
#[must_use]
pub fn swept_overlap(a: PixelRect, a_motion: Vec2, b: PixelRect, b_motion: Vec2) -> bool {
    if a.overlaps(&b) {
        return true;
    }

    let relative = a_motion - b_motion;
    let axes = [
        axis_window(a.x, a.x + a.width, b.x, b.x + b.width, relative.x),
        axis_window(a.y, a.y + a.height, b.y, b.y + b.height, relative.y),
    ];

    let mut first = 0.0_f32;
    let mut last = 1.0_f32;
    for window in axes {
        match window {
            AxisWindow::Never => return false,
            AxisWindow::Always => {}
            AxisWindow::Between(entry, exit) => {
                first = first.max(entry);
                last = last.min(exit);
                if first >= last {
                    return false;
                }
            }
        }
    }

    true
}

fn axis_window(a_min: i32, a_max: i32, b_min: i32, b_max: i32, velocity: f32) -> AxisWindow {
    if velocity == 0.0 {
        return if a_min < b_max && b_min < a_max {
            AxisWindow::Always
        } else {
            AxisWindow::Never
        };
    }

    let toward = (b_min - a_max) as f32 / velocity;
    let away = (b_max - a_min) as f32 / velocity;
    if velocity > 0.0 {
        AxisWindow::Between(toward, away)
    } else {
        AxisWindow::Between(away, toward)
    }
}

/// Rotates a heading by the provided angle in degrees.
#[must_use]
pub fn rotate_degrees(heading: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(heading)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_overlap() {
        let left = PixelRect::new(0, 0, 16, 16);
        let right = PixelRect::new(16, 0, 16, 16);
        assert!(!left.overlaps(&right));
        assert!(left.overlaps(&PixelRect::new(15, 15, 4, 4)));
    }

    #[test]
    fn corners_stay_inside_the_rectangle() {
        let rect = PixelRect::new(10, 20, 14, 16);
        let corners = rect.corners();
        assert_eq!(corners[0], IVec2::new(10, 20));
        assert_eq!(corners[3], IVec2::new(23, 35));
    }

    #[test]
    fn centered_on_round_trips_rectangle_center() {
        let rect = PixelRect::new(104, 104, 14, 16);
        assert_eq!(PixelRect::centered_on(rect.center(), rect.size()), rect);
    }

    #[test]
    fn swept_test_catches_tunnelling() {
        let mover = PixelRect::new(0, 0, 4, 4);
        let wall = PixelRect::new(10, 0, 2, 4);
        assert!(!mover.translated(IVec2::new(20, 0)).overlaps(&wall));
        assert!(swept_overlap(mover, Vec2::new(20.0, 0.0), wall, Vec2::ZERO));
    }

    #[test]
    fn swept_test_reports_immediate_overlap() {
        let a = PixelRect::new(0, 0, 4, 4);
        let b = PixelRect::new(2, 2, 4, 4);
        assert!(swept_overlap(a, Vec2::ZERO, b, Vec2::ZERO));
    }

    #[test]
    fn swept_test_allows_stopping_flush_against_obstacle() {
        let mover = PixelRect::new(0, 0, 4, 4);
        let wall = PixelRect::new(8, 0, 4, 4);
        assert!(!swept_overlap(mover, Vec2::new(4.0, 0.0), wall, Vec2::ZERO));
        assert!(swept_overlap(mover, Vec2::new(5.0, 0.0), wall, Vec2::ZERO));
    }

    #[test]
    fn swept_test_requires_both_axes_to_agree() {
        let mover = PixelRect::new(0, 0, 4, 4);
        let other = PixelRect::new(10, 10, 4, 4);
        // x projections meet mid-step but the y projections never do
        assert!(!swept_overlap(mover, Vec2::new(10.0, 0.0), other, Vec2::ZERO));
        assert!(swept_overlap(mover, Vec2::new(10.0, 10.0), other, Vec2::ZERO));
    }

    #[test]
    fn swept_test_uses_relative_motion() {
        let a = PixelRect::new(0, 0, 4, 4);
        let b = PixelRect::new(10, 0, 4, 4);
        assert!(!swept_overlap(a, Vec2::new(8.0, 0.0), b, Vec2::new(8.0, 0.0)));
        assert!(swept_overlap(a, Vec2::new(4.0, 0.0), b, Vec2::new(-4.0, 0.0)));
    }

    #[test]
    fn rotation_preserves_length() {
        let heading = Vec2::new(1.0, 0.0);
        let rotated = rotate_degrees(heading, 90.0);
        assert!((rotated.length() - 1.0).abs() < 1e-5);
        assert!(rotated.x.abs() < 1e-5);
        assert!((rotated.y - 1.0).abs() < 1e-5);
    }
}
