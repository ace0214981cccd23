use super::bitmap::ImageNode;
use crate::bitmap_data::BitmapId;
use crate::constants::UV_PACK_SCALE;
use crate::geom::Rectangle;

/// Pack a normalized texture coordinate into one word: `v` in the high
/// 16 bits, `u` in the low 16 bits.
#[inline]
pub fn pack_uv(u: f32, v: f32) -> u32 {
    (((v * UV_PACK_SCALE) as u32) << 16) | ((u * UV_PACK_SCALE) as u32)
}

/// Inverse of [`pack_uv`], up to quantization.
#[inline]
pub fn unpack_uv(packed: u32) -> (f32, f32) {
    (
        (packed & 0xFFFF) as f32 / UV_PACK_SCALE,
        (packed >> 16) as f32 / UV_PACK_SCALE,
    )
}

/// The common single-blit bitmap. UVs are packed when the blit is
/// recorded so the batcher can copy them straight into vertex memory.
#[derive(Clone, Debug)]
pub struct NormalBitmapNode {
    pub image: Option<BitmapId>,
    pub image_width: f32,
    pub image_height: f32,
    pub smoothing: bool,
    pub rotated: bool,
    pub source: Rectangle,
    pub draw: Rectangle,
    /// Packed UVs of the four corners, in vertex order.
    pub uvs: [u32; 4],
    pub(crate) render_count: usize,
}

impl Default for NormalBitmapNode {
    fn default() -> Self {
        Self {
            image: None,
            image_width: 0.0,
            image_height: 0.0,
            smoothing: true,
            rotated: false,
            source: Rectangle::EMPTY,
            draw: Rectangle::EMPTY,
            uvs: [0; 4],
            render_count: 0,
        }
    }
}

impl NormalBitmapNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clean_before_render(&mut self) {
        self.render_count = 0;
        self.image = None;
    }
}

impl ImageNode for NormalBitmapNode {
    fn set_image(&mut self, image: BitmapId, image_width: f32, image_height: f32, smoothing: bool, rotated: bool) {
        self.image = Some(image);
        self.image_width = image_width;
        self.image_height = image_height;
        self.smoothing = smoothing;
        self.rotated = rotated;
    }

    fn draw_image(
        &mut self,
        source_x: f32,
        source_y: f32,
        source_w: f32,
        source_h: f32,
        draw_x: f32,
        draw_y: f32,
        draw_w: f32,
        draw_h: f32,
    ) {
        self.source = Rectangle::new(source_x, source_y, source_w, source_h);
        self.draw = Rectangle::new(draw_x, draw_y, draw_w, draw_h);
        self.render_count = 1;

        let u = source_x / self.image_width;
        let v = source_y / self.image_height;

        let corners = if self.rotated {
            // Atlas region stored rotated: walk the corners counter-clockwise.
            let w = source_h / self.image_width;
            let h = source_w / self.image_height;
            [(u + w, v), (u + w, v + h), (u, v + h), (u, v)]
        } else {
            let w = source_w / self.image_width;
            let h = source_h / self.image_height;
            [(u, v), (u + w, v), (u + w, v + h), (u, v + h)]
        };

        for (slot, (x, y)) in self.uvs.iter_mut().zip(corners) {
            *slot = pack_uv(x, y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap_data::{BitmapData, BitmapRegistry};

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 4.0 / UV_PACK_SCALE
    }

    fn node(rotated: bool) -> NormalBitmapNode {
        let mut registry = BitmapRegistry::new();
        let id = registry.insert(BitmapData::surface(100, 100));
        let mut node = NormalBitmapNode::new();
        node.set_image(id, 100.0, 100.0, true, rotated);
        node.draw_image(10.0, 20.0, 30.0, 40.0, 0.0, 0.0, 30.0, 40.0);
        node
    }

    fn unpacked(node: &NormalBitmapNode) -> Vec<(f32, f32)> {
        node.uvs.iter().map(|&p| unpack_uv(p)).collect()
    }

    #[test]
    fn test_pack_uv_layout() {
        assert_eq!(pack_uv(0.0, 0.0), 0);
        assert_eq!(pack_uv(1.0, 0.0), 0x0000_FFFF);
        assert_eq!(pack_uv(0.0, 1.0), 0xFFFF_0000);
        assert_eq!(pack_uv(1.0, 1.0), 0xFFFF_FFFF);
    }

    #[test]
    fn test_draw_sets_single_render() {
        let n = node(false);
        assert_eq!(n.render_count, 1);
        assert_eq!(n.source, Rectangle::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn test_unrotated_uvs() {
        let uvs = unpacked(&node(false));
        let expected = [(0.1, 0.2), (0.4, 0.2), (0.4, 0.6), (0.1, 0.6)];
        for ((u, v), (eu, ev)) in uvs.into_iter().zip(expected) {
            assert!(approx_eq(u, eu) && approx_eq(v, ev), "({u}, {v}) != ({eu}, {ev})");
        }
    }

    #[test]
    fn test_rotated_uvs_swap_extent_and_turn_ccw() {
        let plain = unpacked(&node(false));
        let rotated = unpacked(&node(true));

        // Extent along u and v is swapped.
        let extent = |c: &[(f32, f32)]| (c[2].0 - c[0].0, c[2].1 - c[0].1);
        let (pw, ph) = extent(&plain);
        let rot_w = rotated[0].0 - rotated[3].0;
        let rot_h = rotated[1].1 - rotated[0].1;
        assert!(approx_eq(rot_w, ph));
        assert!(approx_eq(rot_h, pw));

        // Corner i of the rotated quad sits where corner i+1 of an
        // unrotated quad with swapped extents would be.
        let (u0, v0) = plain[0];
        let swapped = [(u0, v0), (u0 + ph, v0), (u0 + ph, v0 + pw), (u0, v0 + pw)];
        for i in 0..4 {
            let (u, v) = rotated[i];
            let (eu, ev) = swapped[(i + 1) % 4];
            assert!(approx_eq(u, eu) && approx_eq(v, ev), "corner {i}");
        }
    }

    #[test]
    fn test_clean_keeps_uvs_but_resets_count() {
        let mut n = node(false);
        n.clean_before_render();
        assert_eq!(n.render_count, 0);
        assert!(n.image.is_none());
    }
}
