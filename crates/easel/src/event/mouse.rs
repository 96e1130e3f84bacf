use std::fmt;

use crate::geom::Point;

/// A mouse event. Coordinates are relative to the window, and are copied
/// from the host without further normalisation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct MouseEvent {
    /// Horizontal position.
    pub x: i32,
    /// Vertical position.
    pub y: i32,
}

impl MouseEvent {
    /// Construct a mouse event.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The event location as a point.
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<Point> for MouseEvent {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl fmt::Display for MouseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event(x={}, y={})", self.x, self.y)
    }
}
