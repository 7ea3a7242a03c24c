//! Resize handles and the move/resize geometry of field rectangles.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Corner handle of a selected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    #[serde(rename = "nw")]
    NorthWest,
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "se")]
    SouthEast,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::NorthWest,
        Corner::NorthEast,
        Corner::SouthWest,
        Corner::SouthEast,
    ];

    /// CSS cursor shown while hovering or dragging this handle.
    pub fn cursor(self) -> &'static str {
        match self {
            Corner::NorthWest | Corner::SouthEast => "nwse-resize",
            Corner::NorthEast | Corner::SouthWest => "nesw-resize",
        }
    }

    /// The corner across the horizontal axis: north and south swap.
    ///
    /// Handles are named as seen on screen. On a page whose y axis points
    /// up, the screen's north-west corner is the rectangle's south-west one.
    pub fn mirrored_vertically(self) -> Corner {
        match self {
            Corner::NorthWest => Corner::SouthWest,
            Corner::NorthEast => Corner::SouthEast,
            Corner::SouthWest => Corner::NorthWest,
            Corner::SouthEast => Corner::NorthEast,
        }
    }

    /// Position of this corner on a rectangle.
    pub fn position(self, rect: Rect) -> Point {
        match self {
            Corner::NorthWest => Point::new(rect.x0, rect.y0),
            Corner::NorthEast => Point::new(rect.x1, rect.y0),
            Corner::SouthWest => Point::new(rect.x0, rect.y1),
            Corner::SouthEast => Point::new(rect.x1, rect.y1),
        }
    }
}

/// A resize handle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub corner: Corner,
}

impl Handle {
    pub fn new(position: Point, corner: Corner) -> Self {
        Self { position, corner }
    }

    /// Check if a screen point is within `tolerance` pixels of this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// The four corner handles of a rectangle.
pub fn handles(rect: Rect) -> [Handle; 4] {
    Corner::ALL.map(|corner| Handle::new(corner.position(rect), corner))
}

/// Find which handle, if any, is under a screen point.
pub fn hit_test_handles(rect: Rect, point: Point, tolerance: f64) -> Option<Corner> {
    handles(rect)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.corner)
}

/// Translate a rectangle, keeping its top-left corner at or past the origin.
pub fn apply_move(original: Rect, delta: Vec2) -> Rect {
    let origin = Point::new(
        (original.x0 + delta.x).max(0.0),
        (original.y0 + delta.y).max(0.0),
    );
    Rect::from_origin_size(origin, original.size())
}

/// Resize a rectangle by dragging one of its corners.
///
/// `delta` is the document-space displacement of the handle since the
/// gesture started. Edges opposite the handle stay put. Width and height
/// never drop below `min_size`; the excess delta is discarded instead.
pub fn apply_resize(original: Rect, corner: Corner, delta: Vec2, min_size: f64) -> Rect {
    let (x, y) = (original.x0, original.y0);
    let (w, h) = (original.width(), original.height());

    let (x, w) = match corner {
        Corner::NorthWest | Corner::SouthWest => shrink_from_start(x, w, delta.x, min_size),
        Corner::NorthEast | Corner::SouthEast => (x, grow_from_end(w, delta.x, min_size)),
    };
    let (y, h) = match corner {
        Corner::NorthWest | Corner::NorthEast => shrink_from_start(y, h, delta.y, min_size),
        Corner::SouthWest | Corner::SouthEast => (y, grow_from_end(h, delta.y, min_size)),
    };

    Rect::new(x, y, x + w, y + h)
}

/// Move the leading edge of a span. Positive delta shrinks it.
fn shrink_from_start(start: f64, len: f64, delta: f64, min_size: f64) -> (f64, f64) {
    // Not f64::clamp: the bounds can cross when the span is already undersized.
    let delta = delta.min(len - min_size).max(-start);
    (start + delta, (len - delta).max(min_size))
}

/// Move the trailing edge of a span. Positive delta grows it.
fn grow_from_end(len: f64, delta: f64, min_size: f64) -> f64 {
    (len + delta).max(min_size)
}
