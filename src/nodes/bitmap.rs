use crate::bitmap_data::BitmapId;
use crate::display::BlendMode;
use crate::geom::{Matrix, Rectangle};
use crate::texture::{BitmapFillMode, Texture};

/// One image blit: a source rectangle in bitmap pixels drawn into a
/// destination rectangle in local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageDraw {
    pub source: Rectangle,
    pub dest: Rectangle,
}

/// Nodes that can receive image blits from the texture-fill helpers.
pub trait ImageNode {
    fn set_image(&mut self, image: BitmapId, image_width: f32, image_height: f32, smoothing: bool, rotated: bool);

    #[allow(clippy::too_many_arguments)]
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
    );
}

/// A bitmap drawn as any number of blits (tiling, 9-slice, cached surfaces).
#[derive(Clone, Debug, Default)]
pub struct BitmapNode {
    pub image: Option<BitmapId>,
    pub image_width: f32,
    pub image_height: f32,
    pub smoothing: bool,
    /// Extra transform applied to every blit.
    pub matrix: Option<Matrix>,
    pub blend_mode: Option<BlendMode>,
    pub alpha: Option<f32>,
    pub rotated: bool,
    pub draw_data: Vec<ImageDraw>,
    pub(crate) render_count: usize,
}

impl BitmapNode {
    pub fn new() -> Self {
        Self {
            smoothing: true,
            ..Self::default()
        }
    }

    pub fn clean_before_render(&mut self) {
        self.draw_data.clear();
        self.render_count = 0;
        self.image = None;
        self.matrix = None;
        self.blend_mode = None;
        self.alpha = None;
    }
}

impl ImageNode for BitmapNode {
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
        self.draw_data.push(ImageDraw {
            source: Rectangle::new(source_x, source_y, source_w, source_h),
            dest: Rectangle::new(draw_x, draw_y, draw_w, draw_h),
        });
        self.render_count += 1;
    }
}

/// Emit the blits that draw `texture` into a `dest_w` x `dest_h` area
/// using `fill_mode`. `scale` is the texture scale factor.
#[allow(clippy::too_many_arguments)]
pub fn update_texture_data(
    node: &mut impl ImageNode,
    texture: &Texture,
    dest_w: f32,
    dest_h: f32,
    fill_mode: BitmapFillMode,
    smoothing: bool,
    scale: f32,
) {
    node.set_image(
        texture.bitmap,
        texture.source_width,
        texture.source_height,
        smoothing,
        texture.rotated,
    );

    let Texture {
        bitmap_x,
        bitmap_y,
        bitmap_width,
        bitmap_height,
        offset_x,
        offset_y,
        texture_width,
        texture_height,
        ..
    } = *texture;

    match fill_mode {
        BitmapFillMode::Scale => {
            let ts_x = dest_w / texture_width * scale;
            let ts_y = dest_h / texture_height * scale;
            node.draw_image(
                bitmap_x,
                bitmap_y,
                bitmap_width,
                bitmap_height,
                ts_x * offset_x,
                ts_y * offset_y,
                ts_x * bitmap_width,
                ts_y * bitmap_height,
            );
        }
        BitmapFillMode::Clip => {
            let display_w = texture_width.min(dest_w);
            let display_h = texture_height.min(dest_h);
            let clip = ClipImage {
                scale,
                bitmap_x,
                bitmap_y,
                scaled_w: bitmap_width * scale,
                scaled_h: bitmap_height * scale,
                offset_x,
                offset_y,
            };
            clip.draw(node, display_w, display_h, 0.0, 0.0);
        }
        BitmapFillMode::Repeat => {
            if texture_width <= 0.0 || texture_height <= 0.0 {
                return;
            }
            let clip = ClipImage {
                scale,
                bitmap_x,
                bitmap_y,
                scaled_w: bitmap_width * scale,
                scaled_h: bitmap_height * scale,
                offset_x,
                offset_y,
            };
            let mut start_x = 0.0;
            while start_x < dest_w {
                let mut start_y = 0.0;
                while start_y < dest_h {
                    let display_w = (dest_w - start_x).min(texture_width);
                    let display_h = (dest_h - start_y).min(texture_height);
                    clip.draw(node, display_w, display_h, start_x, start_y);
                    start_y += texture_height;
                }
                start_x += texture_width;
            }
        }
    }
}

/// Emit the (up to) nine blits of a 9-slice bitmap.
///
/// Corners keep their size, edges stretch along one axis and the center
/// along both. When the target is smaller than the fixed corners, the whole
/// texture is stretched instead.
#[allow(clippy::too_many_arguments)]
pub fn update_texture_data_with_scale9_grid(
    node: &mut impl ImageNode,
    texture: &Texture,
    grid: &Rectangle,
    dest_w: f32,
    dest_h: f32,
    smoothing: bool,
    scale: f32,
) {
    node.set_image(
        texture.bitmap,
        texture.source_width,
        texture.source_height,
        smoothing,
        texture.rotated,
    );

    let image_width = texture.bitmap_width;
    let image_height = texture.bitmap_height;
    let dest_w = dest_w - (texture.texture_width - texture.bitmap_width * scale);
    let dest_h = dest_h - (texture.texture_height - texture.bitmap_height * scale);

    let target_w0 = grid.x - texture.offset_x;
    let target_h0 = grid.y - texture.offset_y;
    let mut source_w0 = target_w0 / scale;
    let mut source_h0 = target_h0 / scale;
    let mut source_w1 = grid.width / scale;
    let mut source_h1 = grid.height / scale;

    // A zero-sized center would leave the middle hollow.
    if source_h1 == 0.0 {
        source_h1 = 1.0;
        if source_h0 >= image_height {
            source_h0 -= 1.0;
        }
    }
    if source_w1 == 0.0 {
        source_w1 = 1.0;
        if source_w0 >= image_width {
            source_w0 -= 1.0;
        }
    }

    let source_x0 = texture.bitmap_x;
    let source_x1 = source_x0 + source_w0;
    let source_x2 = source_x1 + source_w1;
    let source_w2 = image_width - source_w0 - source_w1;

    let source_y0 = texture.bitmap_y;
    let source_y1 = source_y0 + source_h0;
    let source_y2 = source_y1 + source_h1;
    let source_h2 = image_height - source_h0 - source_h1;

    let target_w2 = source_w2 * scale;
    let target_h2 = source_h2 * scale;

    if (source_w0 + source_w2) * scale > dest_w || (source_h0 + source_h2) * scale > dest_h {
        node.draw_image(
            texture.bitmap_x,
            texture.bitmap_y,
            texture.bitmap_width,
            texture.bitmap_height,
            texture.offset_x,
            texture.offset_y,
            dest_w,
            dest_h,
        );
        return;
    }

    let target_x0 = texture.offset_x;
    let target_x1 = target_x0 + target_w0;
    let target_x2 = target_x0 + (dest_w - target_w2);
    let target_w1 = dest_w - target_w0 - target_w2;

    let target_y0 = texture.offset_y;
    let target_y1 = target_y0 + target_h0;
    let target_y2 = target_y0 + dest_h - target_h2;
    let target_h1 = dest_h - target_h0 - target_h2;

    //             x0     x1     x2
    //          y0 +------+------+------+
    //             |      |      |      | h0
    //          y1 +------+------+------+
    //             |      |      |      | h1
    //          y2 +------+------+------+
    //             |      |      |      | h2
    //             +------+------+------+
    //                w0     w1     w2
    let columns = [
        (source_x0, source_w0, target_x0, target_w0),
        (source_x1, source_w1, target_x1, target_w1),
        (source_x2, source_w2, target_x2, target_w2),
    ];
    let rows = [
        (source_y0, source_h0, target_y0, target_h0),
        (source_y1, source_h1, target_y1, target_h1),
        (source_y2, source_h2, target_y2, target_h2),
    ];
    for &(sy, sh, ty, th) in &rows {
        if sh <= 0.0 {
            continue;
        }
        for &(sx, sw, tx, tw) in &columns {
            if sw > 0.0 {
                node.draw_image(sx, sy, sw, sh, tx, ty, tw, th);
            }
        }
    }
}

/// Natural-size blit trimmed to a display area.
struct ClipImage {
    scale: f32,
    bitmap_x: f32,
    bitmap_y: f32,
    scaled_w: f32,
    scaled_h: f32,
    offset_x: f32,
    offset_y: f32,
}

impl ClipImage {
    fn draw(&self, node: &mut impl ImageNode, dest_w: f32, dest_h: f32, start_x: f32, start_y: f32) {
        let mut scaled_w = self.scaled_w;
        let mut scaled_h = self.scaled_h;

        let overflow_x = self.offset_x + scaled_w - dest_w;
        if overflow_x > 0.0 {
            scaled_w -= overflow_x;
        }
        let overflow_y = self.offset_y + scaled_h - dest_h;
        if overflow_y > 0.0 {
            scaled_h -= overflow_y;
        }

        node.draw_image(
            self.bitmap_x,
            self.bitmap_y,
            scaled_w / self.scale,
            scaled_h / self.scale,
            start_x + self.offset_x,
            start_y + self.offset_y,
            scaled_w,
            scaled_h,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap_data::{BitmapData, BitmapRegistry};

    fn texture(width: u32, height: u32) -> Texture {
        let mut registry = BitmapRegistry::new();
        let data = BitmapData::surface(width, height);
        let id = registry.insert(data.clone());
        Texture::from_bitmap(id, &data)
    }

    fn draw(sx: f32, sy: f32, sw: f32, sh: f32, dx: f32, dy: f32, dw: f32, dh: f32) -> ImageDraw {
        ImageDraw {
            source: Rectangle::new(sx, sy, sw, sh),
            dest: Rectangle::new(dx, dy, dw, dh),
        }
    }

    #[test]
    fn test_clean_before_render_empties_node() {
        let mut node = BitmapNode::new();
        node.draw_image(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0);
        node.alpha = Some(0.5);
        node.clean_before_render();
        assert_eq!(node.render_count, 0);
        assert!(node.draw_data.is_empty());
        assert!(node.image.is_none());
        assert!(node.alpha.is_none());
    }

    #[test]
    fn test_scale_fill_stretches_once() {
        let mut node = BitmapNode::new();
        update_texture_data(&mut node, &texture(100, 100), 200.0, 50.0, BitmapFillMode::Scale, true, 1.0);
        assert_eq!(node.draw_data, vec![draw(0.0, 0.0, 100.0, 100.0, 0.0, 0.0, 200.0, 50.0)]);
        assert_eq!(node.image_width, 100.0);
    }

    #[test]
    fn test_clip_fill_trims_to_area() {
        let mut node = BitmapNode::new();
        update_texture_data(&mut node, &texture(100, 100), 50.0, 40.0, BitmapFillMode::Clip, true, 1.0);
        assert_eq!(node.draw_data, vec![draw(0.0, 0.0, 50.0, 40.0, 0.0, 0.0, 50.0, 40.0)]);
    }

    #[test]
    fn test_repeat_fill_tiles() {
        let mut node = BitmapNode::new();
        update_texture_data(&mut node, &texture(100, 100), 250.0, 100.0, BitmapFillMode::Repeat, true, 1.0);
        assert_eq!(
            node.draw_data,
            vec![
                draw(0.0, 0.0, 100.0, 100.0, 0.0, 0.0, 100.0, 100.0),
                draw(0.0, 0.0, 100.0, 100.0, 100.0, 0.0, 100.0, 100.0),
                draw(0.0, 0.0, 50.0, 100.0, 200.0, 0.0, 50.0, 100.0),
            ]
        );
        assert_eq!(node.render_count, 3);
    }

    #[test]
    fn test_scale9_emits_nine_slices() {
        let mut node = BitmapNode::new();
        let grid = Rectangle::new(10.0, 10.0, 10.0, 10.0);
        update_texture_data_with_scale9_grid(&mut node, &texture(30, 30), &grid, 90.0, 60.0, true, 1.0);

        assert_eq!(node.draw_data.len(), 9);
        assert_eq!(node.draw_data[0], draw(0.0, 0.0, 10.0, 10.0, 0.0, 0.0, 10.0, 10.0));
        assert_eq!(node.draw_data[4], draw(10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 70.0, 40.0));
        assert_eq!(node.draw_data[8], draw(20.0, 20.0, 10.0, 10.0, 80.0, 50.0, 10.0, 10.0));
    }

    #[test]
    fn test_scale9_too_small_falls_back_to_stretch() {
        let mut node = BitmapNode::new();
        let grid = Rectangle::new(10.0, 10.0, 10.0, 10.0);
        update_texture_data_with_scale9_grid(&mut node, &texture(30, 30), &grid, 15.0, 15.0, true, 1.0);
        assert_eq!(node.draw_data, vec![draw(0.0, 0.0, 30.0, 30.0, 0.0, 0.0, 15.0, 15.0)]);
    }
}
