//! Texture regions: the part of a [`BitmapData`](crate::BitmapData) an
//! object draws, including atlas trimming and rotation.

use crate::bitmap_data::{BitmapData, BitmapId};

/// How a bitmap fills an area larger or smaller than its texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BitmapFillMode {
    /// Stretch to fill.
    #[default]
    Scale,
    /// Draw at natural size and cut off the excess.
    Clip,
    /// Tile.
    Repeat,
}

/// A rectangular region of a bitmap, possibly packed into an atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Texture {
    pub bitmap: BitmapId,
    /// Region origin inside the bitmap.
    pub bitmap_x: f32,
    pub bitmap_y: f32,
    /// Region size inside the bitmap.
    pub bitmap_width: f32,
    pub bitmap_height: f32,
    /// Offset of the trimmed region inside the untrimmed frame.
    pub offset_x: f32,
    pub offset_y: f32,
    /// Untrimmed frame size, in logical pixels.
    pub texture_width: f32,
    pub texture_height: f32,
    /// Size of the whole backing bitmap.
    pub source_width: f32,
    pub source_height: f32,
    /// Region is stored rotated 90 degrees in the atlas.
    pub rotated: bool,
}

impl Texture {
    /// Texture covering a whole bitmap.
    pub fn from_bitmap(bitmap: BitmapId, data: &BitmapData) -> Self {
        let w = data.width as f32;
        let h = data.height as f32;
        Self {
            bitmap,
            bitmap_x: 0.0,
            bitmap_y: 0.0,
            bitmap_width: w,
            bitmap_height: h,
            offset_x: 0.0,
            offset_y: 0.0,
            texture_width: w,
            texture_height: h,
            source_width: w,
            source_height: h,
            rotated: false,
        }
    }

    /// Sub-texture of an atlas page.
    #[allow(clippy::too_many_arguments)]
    pub fn region(
        bitmap: BitmapId,
        data: &BitmapData,
        bitmap_x: f32,
        bitmap_y: f32,
        bitmap_width: f32,
        bitmap_height: f32,
        offset_x: f32,
        offset_y: f32,
        texture_width: f32,
        texture_height: f32,
        rotated: bool,
    ) -> Self {
        Self {
            bitmap,
            bitmap_x,
            bitmap_y,
            bitmap_width,
            bitmap_height,
            offset_x,
            offset_y,
            texture_width,
            texture_height,
            source_width: data.width as f32,
            source_height: data.height as f32,
            rotated,
        }
    }
}
