//! Geometry primitives for windows and pointer positions.
use std::{fmt, str::FromStr};

use crate::error::{Error, Result};

/// A location in window coordinates. Pointer positions may be negative or
/// exceed the window size when the pointer is outside the window.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Point {
    /// Horizontal offset.
    pub x: i32,
    /// Vertical offset.
    pub y: i32,
}

impl Point {
    /// Construct a point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Is this point within a `width` x `height` area anchored at the origin?
    /// Edges are inclusive.
    pub fn within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && i64::from(self.x) <= i64::from(width)
            && i64::from(self.y) <= i64::from(height)
    }
}

impl From<(i32, i32)> for Point {
    #[inline]
    fn from(v: (i32, i32)) -> Self {
        Self { x: v.0, y: v.1 }
    }
}

/// Window geometry: size plus screen position, in the `WxH+X+Y` form used by
/// window managers.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Screen x offset.
    pub x: i32,
    /// Screen y offset.
    pub y: i32,
}

impl Geometry {
    /// Construct a geometry.
    pub fn new(width: u32, height: u32, x: i32, y: i32) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    /// Is either dimension too small to draw into? Window managers report
    /// these transient sizes while a window is being mapped or minimised.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 2 || self.height <= 2
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

impl FromStr for Geometry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Host(format!("invalid geometry: {s:?}"));
        // Negative offsets are reported as "+-5".
        let normalized = s.replacen('x', "+", 1);
        let parts: Vec<&str> = normalized.split('+').map(str::trim).collect();
        let [w, h, x, y] = parts.as_slice() else {
            return Err(bad());
        };
        Ok(Self {
            width: w.parse().map_err(|_| bad())?,
            height: h.parse().map_err(|_| bad())?,
            x: x.parse().map_err(|_| bad())?,
            y: y.parse().map_err(|_| bad())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_roundtrip() -> Result<()> {
        let g: Geometry = "300x200+10+20".parse()?;
        assert_eq!(g, Geometry::new(300, 200, 10, 20));
        assert_eq!(g.to_string(), "300x200+10+20");

        let g: Geometry = "300x200+-5+0".parse()?;
        assert_eq!(g.x, -5);

        assert!("300x200".parse::<Geometry>().is_err());
        assert!("axb+1+2".parse::<Geometry>().is_err());
        Ok(())
    }

    #[test]
    fn degenerate() {
        assert!(Geometry::new(2, 1, 0, 0).is_degenerate());
        assert!(Geometry::new(1, 300, 0, 0).is_degenerate());
        assert!(Geometry::new(2, 2, 0, 0).is_degenerate());
        assert!(Geometry::new(300, 2, 0, 0).is_degenerate());
        assert!(!Geometry::new(3, 3, 0, 0).is_degenerate());
    }

    #[test]
    fn within() {
        assert!(Point::new(0, 0).within(10, 10));
        assert!(Point::new(10, 10).within(10, 10));
        assert!(!Point::new(-1, 5).within(10, 10));
        assert!(!Point::new(5, 11).within(10, 10));
    }
}
