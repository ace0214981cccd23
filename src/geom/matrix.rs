use super::{Point, Rectangle};
use crate::math::{cos_deg, sin_deg, RAD_TO_DEG, TWO_PI};
use std::f32::consts::{FRAC_PI_2, PI};

/// A 2D affine transformation.
///
/// Points map as `x' = a*x + c*y + tx` and `y' = b*x + d*y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Matrix {
    /// Identity matrix (no transformation)
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Create a pure translation
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn set_to(&mut self, a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> &mut Self {
        *self = Self::new(a, b, c, d, tx, ty);
        self
    }

    pub fn copy_from(&mut self, other: &Matrix) -> &mut Self {
        *self = *other;
        self
    }

    pub fn identity(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Combine with `other` in place: the result applies `self` first, then `other`.
    pub fn concat(&mut self, other: &Matrix) {
        let mut a = self.a * other.a;
        let mut b = 0.0;
        let mut c = 0.0;
        let mut d = self.d * other.d;
        let mut tx = self.tx * other.a + other.tx;
        let mut ty = self.ty * other.d + other.ty;

        if self.b != 0.0 || self.c != 0.0 || other.b != 0.0 || other.c != 0.0 {
            a += self.b * other.c;
            d += self.c * other.b;
            b += self.a * other.b + self.b * other.d;
            c += self.c * other.a + self.d * other.c;
            tx += self.ty * other.c;
            ty += self.tx * other.b;
        }

        *self = Self::new(a, b, c, d, tx, ty);
    }

    /// Pre-multiply: the result applies `self` first, then the given matrix.
    pub fn prepend(&mut self, a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> &mut Self {
        let tx1 = self.tx;
        if a != 1.0 || b != 0.0 || c != 0.0 || d != 1.0 {
            let a1 = self.a;
            let c1 = self.c;
            self.a = a1 * a + self.b * c;
            self.b = a1 * b + self.b * d;
            self.c = c1 * a + self.d * c;
            self.d = c1 * b + self.d * d;
        }
        self.tx = tx1 * a + self.ty * c + tx;
        self.ty = tx1 * b + self.ty * d + ty;
        self
    }

    /// Post-multiply: the result applies the given matrix first, then `self`.
    pub fn append(&mut self, a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> &mut Self {
        let a1 = self.a;
        let b1 = self.b;
        let c1 = self.c;
        let d1 = self.d;
        if a != 1.0 || b != 0.0 || c != 0.0 || d != 1.0 {
            self.a = a * a1 + b * c1;
            self.b = a * b1 + b * d1;
            self.c = c * a1 + d * c1;
            self.d = c * b1 + d * d1;
        }
        self.tx = tx * a1 + ty * c1 + self.tx;
        self.ty = tx * b1 + ty * d1 + self.ty;
        self
    }

    /// Matrix that applies `other` first, then `self`.
    pub fn pre_multiply(&self, other: &Matrix) -> Matrix {
        let mut a = other.a * self.a;
        let mut b = 0.0;
        let mut c = 0.0;
        let mut d = other.d * self.d;
        let mut tx = other.tx * self.a + self.tx;
        let mut ty = other.ty * self.d + self.ty;

        if other.b != 0.0 || other.c != 0.0 || self.b != 0.0 || self.c != 0.0 {
            a += other.b * self.c;
            d += other.c * self.b;
            b += other.a * self.b + other.b * self.d;
            c += other.c * self.a + other.d * self.c;
            tx += other.ty * self.c;
            ty += other.tx * self.b;
        }

        Matrix::new(a, b, c, d, tx, ty)
    }

    /// Invert in place.
    ///
    /// Never produces infinities. An axis-aligned matrix with a zero scale
    /// collapses to the zero matrix; any other singular matrix becomes the
    /// identity.
    pub fn invert(&mut self) {
        *self = self.inverted();
    }

    /// Compute the inverse. See [`Matrix::invert`].
    pub fn inverted(&self) -> Matrix {
        let Matrix { a, b, c, d, tx, ty } = *self;

        if b == 0.0 && c == 0.0 {
            if a == 0.0 || d == 0.0 {
                return Matrix::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
            }
            let a = 1.0 / a;
            let d = 1.0 / d;
            return Matrix::new(a, 0.0, 0.0, d, -a * tx, -d * ty);
        }

        let determinant = a * d - b * c;
        if determinant == 0.0 {
            return Matrix::IDENTITY;
        }

        let inv = 1.0 / determinant;
        let na = d * inv;
        let nb = -b * inv;
        let nc = -c * inv;
        let nd = a * inv;
        Matrix::new(na, nb, nc, nd, -(na * tx + nc * ty), -(nb * tx + nd * ty))
    }

    /// Rotate by `angle` radians around the origin, applied after the current transform.
    pub fn rotate(&mut self, angle: f32) {
        if angle == 0.0 {
            return;
        }
        let degrees = angle * RAD_TO_DEG;
        let u = cos_deg(degrees);
        let v = sin_deg(degrees);
        let Matrix { a, b, c, d, tx, ty } = *self;
        self.a = a * u - b * v;
        self.b = a * v + b * u;
        self.c = c * u - d * v;
        self.d = c * v + d * u;
        self.tx = tx * u - ty * v;
        self.ty = tx * v + ty * u;
    }

    /// Scale, applied after the current transform.
    pub fn scale(&mut self, sx: f32, sy: f32) {
        if sx != 1.0 {
            self.a *= sx;
            self.c *= sx;
            self.tx *= sx;
        }
        if sy != 1.0 {
            self.b *= sy;
            self.d *= sy;
            self.ty *= sy;
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
    }

    pub fn transform_point(&self, x: f32, y: f32) -> Point {
        Point::new(
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Transform ignoring translation.
    pub fn delta_transform_point(&self, point: Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y,
            self.b * point.x + self.d * point.y,
        )
    }

    /// Replace `bounds` with the integer-aligned box enclosing its four
    /// transformed corners.
    pub fn transform_bounds(&self, bounds: &mut Rectangle) {
        let x = bounds.x;
        let y = bounds.y;
        let x_max = x + bounds.width;
        let y_max = y + bounds.height;

        let p0 = self.transform_point(x, y);
        let p1 = self.transform_point(x_max, y);
        let p2 = self.transform_point(x_max, y_max);
        let p3 = self.transform_point(x, y_max);

        let min_x = p0.x.min(p1.x).min(p2.x).min(p3.x);
        let max_x = p0.x.max(p1.x).max(p2.x).max(p3.x);
        let min_y = p0.y.min(p1.y).min(p2.y).min(p3.y);
        let max_y = p0.y.max(p1.y).max(p2.y).max(p3.y);

        bounds.x = min_x.floor();
        bounds.width = (max_x - bounds.x).ceil();
        bounds.y = min_y.floor();
        bounds.height = (max_y - bounds.y).ceil();
    }

    /// Horizontal scale, negative when the matrix mirrors.
    pub fn scale_x(&self) -> f32 {
        if self.b == 0.0 {
            return self.a;
        }
        let result = (self.a * self.a + self.b * self.b).sqrt();
        if self.determinant() < 0.0 {
            -result
        } else {
            result
        }
    }

    /// Vertical scale, negative when the matrix mirrors.
    pub fn scale_y(&self) -> f32 {
        if self.c == 0.0 {
            return self.d;
        }
        let result = (self.c * self.c + self.d * self.d).sqrt();
        if self.determinant() < 0.0 {
            -result
        } else {
            result
        }
    }

    /// Horizontal skew in radians.
    pub fn skew_x(&self) -> f32 {
        if self.d < 0.0 {
            self.d.atan2(self.c) + FRAC_PI_2
        } else {
            self.d.atan2(self.c) - FRAC_PI_2
        }
    }

    /// Vertical skew in radians.
    pub fn skew_y(&self) -> f32 {
        if self.a < 0.0 {
            self.b.atan2(self.a) - PI
        } else {
            self.b.atan2(self.a)
        }
    }

    /// Rebuild the linear part from scale and skew (skews in radians).
    /// Translation is left untouched.
    pub fn update_scale_and_rotation(&mut self, scale_x: f32, scale_y: f32, skew_x: f32, skew_y: f32) {
        if (skew_x == 0.0 || skew_x == TWO_PI) && (skew_y == 0.0 || skew_y == TWO_PI) {
            self.a = scale_x;
            self.b = 0.0;
            self.c = 0.0;
            self.d = scale_y;
            return;
        }

        let skew_x_deg = skew_x * RAD_TO_DEG;
        let skew_y_deg = skew_y * RAD_TO_DEG;
        let u = cos_deg(skew_x_deg);
        let v = sin_deg(skew_x_deg);
        if skew_x == skew_y {
            self.a = u * scale_x;
            self.b = v * scale_x;
        } else {
            self.a = cos_deg(skew_y_deg) * scale_x;
            self.b = sin_deg(skew_y_deg) * scale_x;
        }
        self.c = -v * scale_y;
        self.d = u * scale_y;
    }

    /// Build a scale + rotation (radians) + translation matrix.
    pub fn create_box(&mut self, scale_x: f32, scale_y: f32, rotation: f32, tx: f32, ty: f32) {
        if rotation != 0.0 {
            let degrees = rotation * RAD_TO_DEG;
            let u = cos_deg(degrees);
            let v = sin_deg(degrees);
            self.a = u * scale_x;
            self.b = v * scale_y;
            self.c = -v * scale_x;
            self.d = u * scale_y;
        } else {
            self.a = scale_x;
            self.b = 0.0;
            self.c = 0.0;
            self.d = scale_y;
        }
        self.tx = tx;
        self.ty = ty;
    }

    /// Box matrix for a gradient spanning `width` x `height`.
    pub fn create_gradient_box(&mut self, width: f32, height: f32, rotation: f32, tx: f32, ty: f32) {
        self.create_box(
            width / 1638.4,
            height / 1638.4,
            rotation,
            tx + width / 2.0,
            ty + height / 2.0,
        );
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DEG_TO_RAD;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn matrix_approx_eq(m: &Matrix, n: &Matrix) -> bool {
        approx_eq(m.a, n.a)
            && approx_eq(m.b, n.b)
            && approx_eq(m.c, n.c)
            && approx_eq(m.d, n.d)
            && approx_eq(m.tx, n.tx)
            && approx_eq(m.ty, n.ty)
    }

    #[test]
    fn test_identity() {
        let m = Matrix::default();
        assert!(m.is_identity());
        let p = m.transform_point(3.0, 4.0);
        assert_eq!(p, Point::new(3.0, 4.0));
    }

    #[test]
    fn test_invert_round_trip() {
        let samples = [
            Matrix::new(2.0, 0.0, 0.0, 3.0, 10.0, -5.0),
            Matrix::new(0.8, 0.6, -0.6, 0.8, 12.0, 7.0),
            Matrix::new(1.5, 0.3, 0.7, -2.0, -4.0, 9.0),
            Matrix::new(-1.0, 0.0, 0.0, 1.0, 5.0, 5.0),
        ];
        for original in samples {
            let mut m = original;
            m.invert();
            m.invert();
            assert!(matrix_approx_eq(&m, &original), "{original:?} -> {m:?}");
        }
    }

    #[test]
    fn test_invert_undoes_transform() {
        let m = Matrix::new(0.8, 0.6, -0.6, 0.8, 12.0, 7.0);
        let p = m.transform_point(3.0, 4.0);
        let back = m.inverted().transform_point(p.x, p.y);
        assert!(approx_eq(back.x, 3.0));
        assert!(approx_eq(back.y, 4.0));
    }

    #[test]
    fn test_invert_degenerate() {
        let mut m = Matrix::new(0.0, 0.0, 0.0, 2.0, 5.0, 5.0);
        m.invert();
        assert_eq!(m, Matrix::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0));

        let mut n = Matrix::new(1.0, 2.0, 2.0, 4.0, 1.0, 1.0);
        n.invert();
        assert!(n.is_identity());
    }

    #[test]
    fn test_concat_applies_self_first() {
        // translate then scale: (0,0) -> (10,0) -> (20,0)
        let mut m = Matrix::translation(10.0, 0.0);
        m.concat(&Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0));
        let p = m.transform_point(0.0, 0.0);
        assert!(approx_eq(p.x, 20.0));
        assert!(approx_eq(p.y, 0.0));
    }

    #[test]
    fn test_append_and_prepend_order() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);

        // append: translate first, then scale
        let mut appended = scale;
        appended.append(1.0, 0.0, 0.0, 1.0, 10.0, 0.0);
        assert!(approx_eq(appended.transform_point(0.0, 0.0).x, 20.0));

        // prepend: scale first, then translate
        let mut prepended = scale;
        prepended.prepend(1.0, 0.0, 0.0, 1.0, 10.0, 0.0);
        assert!(approx_eq(prepended.transform_point(0.0, 0.0).x, 10.0));
        assert!(approx_eq(prepended.transform_point(1.0, 0.0).x, 12.0));
    }

    #[test]
    fn test_pre_multiply_matches_append() {
        let parent = Matrix::new(0.8, 0.6, -0.6, 0.8, 12.0, 7.0);
        let child = Matrix::new(2.0, 0.0, 0.5, 1.0, 3.0, -1.0);
        let mut expected = parent;
        expected.append(child.a, child.b, child.c, child.d, child.tx, child.ty);
        assert!(matrix_approx_eq(&parent.pre_multiply(&child), &expected));
    }

    #[test]
    fn test_delta_transform_ignores_translation() {
        let m = Matrix::new(2.0, 0.0, 0.0, 2.0, 100.0, 100.0);
        assert_eq!(m.delta_transform_point(Point::new(1.0, 1.0)), Point::new(2.0, 2.0));
    }

    #[test]
    fn test_transform_bounds_floors_and_ceils() {
        let m = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.5, 0.5);
        let mut r = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        m.transform_bounds(&mut r);
        assert_eq!(r, Rectangle::new(0.0, 0.0, 11.0, 11.0));
    }

    #[test]
    fn test_transform_bounds_rotated() {
        let mut m = Matrix::IDENTITY;
        m.rotate(90.0 * DEG_TO_RAD);
        let mut r = Rectangle::new(0.0, 0.0, 10.0, 20.0);
        m.transform_bounds(&mut r);
        assert_eq!(r, Rectangle::new(-20.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn test_decompose_mirrored_scale() {
        let mut m = Matrix::IDENTITY;
        m.update_scale_and_rotation(-2.0, 3.0, 0.0, 0.0);
        assert!(approx_eq(m.scale_x(), -2.0));
        assert!(approx_eq(m.scale_y(), 3.0));

        let mut r = Matrix::IDENTITY;
        let angle = 30.0 * DEG_TO_RAD;
        r.update_scale_and_rotation(2.0, 2.0, angle, angle);
        assert!(approx_eq(r.scale_x(), 2.0));
        assert!(approx_eq(r.scale_y(), 2.0));
        assert!(approx_eq(r.skew_y(), angle));
        assert!(approx_eq(r.skew_x(), angle));
    }

    #[test]
    fn test_create_box() {
        let mut m = Matrix::IDENTITY;
        m.create_box(2.0, 3.0, 0.0, 5.0, 6.0);
        assert_eq!(m, Matrix::new(2.0, 0.0, 0.0, 3.0, 5.0, 6.0));
    }
}
