use super::Point;

/// An axis-aligned rectangle defined by its top-left corner and size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub const EMPTY: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning the given min/max extents.
    pub fn from_extents(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self::new(x_min, y_min, x_max - x_min, y_max - y_min)
    }

    pub fn set_to(&mut self, x: f32, y: f32, width: f32, height: f32) {
        *self = Self::new(x, y, width, height);
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// A rectangle with no positive area is empty.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn set_empty(&mut self) {
        *self = Self::EMPTY;
    }

    /// Half-open containment test: the right and bottom edges are outside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.contains(point.x, point.y)
    }

    pub fn contains_rect(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.x.max(other.x) < self.right().min(other.right())
            && self.y.max(other.y) < self.bottom().min(other.bottom())
    }

    /// Overlapping area of the two rectangles, or an empty rectangle.
    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if x >= right || y >= bottom {
            return Rectangle::EMPTY;
        }
        Rectangle::from_extents(x, y, right, bottom)
    }

    /// Smallest rectangle containing both. Empty operands are ignored.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rectangle::from_extents(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Grow by `dx` on the left and right and by `dy` on the top and bottom.
    pub fn inflate(&mut self, dx: f32, dy: f32) {
        self.x -= dx;
        self.width += 2.0 * dx;
        self.y -= dy;
        self.height += 2.0 * dy;
    }

    pub fn offset(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_half_open() {
        let r = Rectangle::new(0.0, 0.0, 100.0, 100.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(50.0, 50.0));
        assert!(!r.contains(100.0, 50.0));
        assert!(!r.contains(150.0, 50.0));
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Rectangle::new(10.0, 10.0, 5.0, 5.0);
        assert_eq!(a.union(&Rectangle::EMPTY), a);
        assert_eq!(Rectangle::EMPTY.union(&a), a);

        let b = Rectangle::new(0.0, 12.0, 4.0, 10.0);
        assert_eq!(a.union(&b), Rectangle::new(0.0, 10.0, 15.0, 12.0));
    }

    #[test]
    fn test_intersection() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Rectangle::new(5.0, 5.0, 5.0, 5.0));
        assert!(a
            .intersection(&Rectangle::new(20.0, 20.0, 1.0, 1.0))
            .is_empty());
    }
}
