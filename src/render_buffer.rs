//! Backend-independent drawing surfaces.

use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{Error, Result};

/// A 2D surface a renderer draws into and reads pixels back from.
///
/// Pixels read back are straight (non-premultiplied) RGBA, row-major.
pub trait RenderBuffer {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Change the surface size. Contents are undefined afterwards. With
    /// `use_max_size` the surface only grows, never shrinks.
    fn resize(&mut self, width: u32, height: u32, use_max_size: bool) -> Result<()>;

    /// Make every pixel transparent.
    fn clear(&mut self);

    /// Read a `width` x `height` block at (`x`, `y`). Pixels outside the
    /// surface read as transparent.
    fn get_pixels(&mut self, x: i32, y: i32, width: u32, height: u32) -> Result<Vec<u8>>;

    /// Encode the whole surface as a `data:` URL. `mime` selects PNG
    /// (default) or JPEG.
    fn to_data_url(&mut self, mime: Option<&str>) -> Result<String> {
        let (width, height) = (self.width(), self.height());
        let pixels = self.get_pixels(0, 0, width, height)?;
        encode_data_url(width, height, pixels, mime)
    }
}

/// Encode straight-alpha RGBA pixels as a base64 `data:` URL.
pub fn encode_data_url(width: u32, height: u32, rgba: Vec<u8>, mime: Option<&str>) -> Result<String> {
    let image = RgbaImage::from_raw(width, height, rgba).ok_or(Error::InvalidSurfaceSize { width, height })?;

    let (format, mime) = match mime {
        Some("image/jpeg") | Some("image/jpg") => (ImageFormat::Jpeg, "image/jpeg"),
        _ => (ImageFormat::Png, "image/png"),
    };
    // JPEG has no alpha channel.
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8()),
        _ => DynamicImage::ImageRgba8(image),
    };

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;
    let b64 = general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{mime};base64,{b64}"))
}

/// Convert premultiplied RGBA bytes to straight alpha in place.
pub(crate) fn demultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_data_url_round_trips() {
        let url = encode_data_url(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 128], None).unwrap();
        let b64 = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = general_purpose::STANDARD.decode(b64).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 0, 255, 128]);
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let url = encode_data_url(1, 1, vec![10, 20, 30, 40], Some("image/jpeg")).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        assert!(matches!(
            encode_data_url(2, 2, vec![0; 4], None),
            Err(Error::InvalidSurfaceSize { width: 2, height: 2 })
        ));
    }

    #[test]
    fn test_demultiply() {
        let mut px = [64, 32, 0, 128, 10, 10, 10, 0, 1, 2, 3, 255];
        demultiply_in_place(&mut px);
        assert_eq!(&px[..4], &[128, 64, 0, 128]);
        assert_eq!(&px[4..8], &[10, 10, 10, 0]);
        assert_eq!(&px[8..], &[1, 2, 3, 255]);
    }
}
