//! Bitmap filter descriptions.
//!
//! Filters are carried as parameters only: the engine needs them to size
//! bounds and to pick a render mode, while the pixel math belongs to the
//! platform layer.

use crate::math::{cos_deg, sin_deg};

#[derive(Clone, Debug, PartialEq)]
pub struct BlurFilter {
    pub blur_x: f32,
    pub blur_y: f32,
    pub quality: u32,
}

impl Default for BlurFilter {
    fn default() -> Self {
        Self {
            blur_x: 4.0,
            blur_y: 4.0,
            quality: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlowFilter {
    /// 0xRRGGBB
    pub color: u32,
    pub alpha: f32,
    pub blur_x: f32,
    pub blur_y: f32,
    pub strength: f32,
    pub quality: u32,
    pub inner: bool,
    pub knockout: bool,
}

impl Default for GlowFilter {
    fn default() -> Self {
        Self {
            color: 0xFF0000,
            alpha: 1.0,
            blur_x: 6.0,
            blur_y: 6.0,
            strength: 2.0,
            quality: 1,
            inner: false,
            knockout: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DropShadowFilter {
    pub distance: f32,
    /// Degrees.
    pub angle: f32,
    pub glow: GlowFilter,
    pub hide_object: bool,
}

impl Default for DropShadowFilter {
    fn default() -> Self {
        Self {
            distance: 4.0,
            angle: 45.0,
            glow: GlowFilter {
                color: 0,
                blur_x: 4.0,
                blur_y: 4.0,
                strength: 1.0,
                ..GlowFilter::default()
            },
            hide_object: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Blur(BlurFilter),
    Glow(GlowFilter),
    DropShadow(DropShadowFilter),
    /// 4x5 row-major color transform.
    ColorMatrix([f32; 20]),
    /// Shader filter that reserves `padding` pixels on every side.
    Custom { padding: f32 },
}

/// Extra space a filter list needs around the unfiltered bounds.
///
/// `min_*` are never positive and `max_*` never negative, so applying the
/// offset always keeps the original bounds inside the result.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterOffset {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl FilterOffset {
    pub fn measure(filters: &[Filter]) -> FilterOffset {
        let mut min_x = 0.0_f32;
        let mut min_y = 0.0_f32;
        let mut max_x = 0.0_f32;
        let mut max_y = 0.0_f32;

        for filter in filters {
            let (blur_x, blur_y, shift) = match filter {
                Filter::Blur(f) => (f.blur_x, f.blur_y, None),
                Filter::Glow(f) => (f.blur_x, f.blur_y, None),
                Filter::DropShadow(f) => (f.glow.blur_x, f.glow.blur_y, Some(shadow_shift(f))),
                Filter::Custom { padding } => (*padding, *padding, None),
                Filter::ColorMatrix(_) => continue,
            };

            min_x -= blur_x;
            min_y -= blur_y;
            max_x += blur_x;
            max_y += blur_y;

            if let Some((dx, dy)) = shift {
                min_x += dx;
                max_x += dx;
                min_y += dy;
                max_y += dy;
            }
        }

        FilterOffset {
            min_x: min_x.min(0.0),
            min_y: min_y.min(0.0),
            max_x: max_x.max(0.0),
            max_y: max_y.max(0.0),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == FilterOffset::default()
    }
}

/// Shadow displacement rounded away from zero.
fn shadow_shift(filter: &DropShadowFilter) -> (f32, f32) {
    if filter.distance == 0.0 {
        return (0.0, 0.0);
    }
    let away = |v: f32| if v > 0.0 { v.ceil() } else { v.floor() };
    (
        away(filter.distance * cos_deg(filter.angle)),
        away(filter.distance * sin_deg(filter.angle)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_has_no_offset() {
        assert!(FilterOffset::measure(&[]).is_zero());
        assert!(FilterOffset::measure(&[Filter::ColorMatrix([0.0; 20])]).is_zero());
    }

    #[test]
    fn test_blur_pads_symmetrically() {
        let offset = FilterOffset::measure(&[Filter::Blur(BlurFilter {
            blur_x: 3.0,
            blur_y: 5.0,
            quality: 1,
        })]);
        assert_eq!(
            offset,
            FilterOffset {
                min_x: -3.0,
                min_y: -5.0,
                max_x: 3.0,
                max_y: 5.0
            }
        );
    }

    #[test]
    fn test_drop_shadow_shifts_padding() {
        // distance 4 at 45 degrees: 2.83 rounds away from zero to 3
        let offset = FilterOffset::measure(&[Filter::DropShadow(DropShadowFilter::default())]);
        assert_eq!(offset.min_x, -1.0);
        assert_eq!(offset.max_x, 7.0);
        assert_eq!(offset.min_y, -1.0);
        assert_eq!(offset.max_y, 7.0);
    }

    #[test]
    fn test_large_shift_is_clamped_to_contain_origin() {
        let offset = FilterOffset::measure(&[Filter::DropShadow(DropShadowFilter {
            distance: 50.0,
            angle: 0.0,
            glow: GlowFilter {
                blur_x: 2.0,
                blur_y: 2.0,
                ..GlowFilter::default()
            },
            hide_object: false,
        })]);
        assert_eq!(offset.min_x, 0.0);
        assert_eq!(offset.max_x, 52.0);
        assert_eq!(offset.min_y, -2.0);
        assert_eq!(offset.max_y, 2.0);
    }

    #[test]
    fn test_filters_accumulate() {
        let offset = FilterOffset::measure(&[
            Filter::Blur(BlurFilter::default()),
            Filter::Custom { padding: 2.0 },
        ]);
        assert_eq!(offset.min_x, -6.0);
        assert_eq!(offset.max_y, 6.0);
    }
}
