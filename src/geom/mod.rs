//! Geometry primitives: affine matrices, points and rectangles.

mod matrix;
mod point;
mod rectangle;

pub use matrix::Matrix;
pub use point::Point;
pub use rectangle::Rectangle;
