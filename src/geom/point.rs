use std::ops::{Add, Sub};

/// A location in a two-dimensional coordinate system.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Distance from (0, 0) to this point.
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(p1: Point, p2: Point) -> f32 {
        (p1 - p2).length()
    }

    /// Point at `f` of the way from `p2` to `p1` (`f == 1` yields `p1`).
    pub fn interpolate(p1: Point, p2: Point, f: f32) -> Point {
        let f1 = 1.0 - f;
        Point::new(p1.x * f + p2.x * f1, p1.y * f + p2.y * f1)
    }

    /// Convert a polar coordinate (angle in radians) to a point.
    pub fn polar(len: f32, angle: f32) -> Point {
        Point::new(len * angle.cos(), len * angle.sin())
    }

    /// Scale the segment from (0, 0) to this point to `thickness`.
    /// A zero-length point is left unchanged.
    pub fn normalize(&mut self, thickness: f32) {
        if self.x != 0.0 || self.y != 0.0 {
            let relative = thickness / self.length();
            self.x *= relative;
            self.y *= relative;
        }
    }

    pub fn offset(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_distance() {
        assert!(approx_eq(
            Point::distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)),
            5.0
        ));
    }

    #[test]
    fn test_interpolate() {
        let p = Point::interpolate(Point::new(10.0, 0.0), Point::new(0.0, 10.0), 0.25);
        assert!(approx_eq(p.x, 2.5));
        assert!(approx_eq(p.y, 7.5));
    }

    #[test]
    fn test_normalize_zero_is_noop() {
        let mut p = Point::ZERO;
        p.normalize(5.0);
        assert_eq!(p, Point::ZERO);

        let mut q = Point::new(3.0, 4.0);
        q.normalize(10.0);
        assert!(approx_eq(q.x, 6.0));
        assert!(approx_eq(q.y, 8.0));
    }
}
