//! Content kinds. Each kind measures its own content and knows how to
//! describe itself as a render node.

use crate::bitmap_data::BitmapId;
use crate::geom::Rectangle;
use crate::nodes::{
    update_texture_data, update_texture_data_with_scale9_grid, vertex_bounds, BitmapNode, FillStyle,
    GraphicsNode, GraphicsPath, GroupNode, MeshNode, NormalBitmapNode, PathShape, RenderNode,
    StrokeStyle, TextFormat, TextNode,
};
use crate::texture::{BitmapFillMode, Texture};

/// Inputs a kind needs from its owning object when building a node.
#[derive(Clone, Copy, Debug)]
pub struct NodeParams {
    /// NaN when unset.
    pub explicit_width: f32,
    /// NaN when unset.
    pub explicit_height: f32,
    pub texture_scale_factor: f32,
    /// Identity handed to graphics nodes for raster caching.
    pub cache_key: u64,
}

/// Leaf rendering behavior of a content kind.
pub trait Renderable {
    /// Local-space area covered by the object's own content.
    fn measure_content_bounds(&self, explicit_width: f32, explicit_height: f32) -> Rectangle;

    /// Rebuild `node`. Sets it to `None` when there is nothing to draw.
    fn update_render_node(&self, node: &mut Option<RenderNode>, params: &NodeParams);

    /// Bitmap sampled by this content, if any.
    fn bitmap(&self) -> Option<BitmapId> {
        None
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BitmapContent {
    pub texture: Option<Texture>,
    pub scale9_grid: Option<Rectangle>,
    pub fill_mode: BitmapFillMode,
    pub smoothing: bool,
}

impl BitmapContent {
    pub fn new(texture: Option<Texture>) -> Self {
        Self {
            texture,
            scale9_grid: None,
            fill_mode: BitmapFillMode::Scale,
            smoothing: true,
        }
    }
}

impl Renderable for BitmapContent {
    fn measure_content_bounds(&self, explicit_width: f32, explicit_height: f32) -> Rectangle {
        let Some(texture) = &self.texture else {
            return Rectangle::EMPTY;
        };
        Rectangle::new(
            0.0,
            0.0,
            or_auto(explicit_width, texture.texture_width),
            or_auto(explicit_height, texture.texture_height),
        )
    }

    fn update_render_node(&self, node: &mut Option<RenderNode>, params: &NodeParams) {
        let Some(texture) = &self.texture else {
            *node = None;
            return;
        };
        let dest_w = or_auto(params.explicit_width, texture.texture_width);
        let dest_h = or_auto(params.explicit_height, texture.texture_height);
        let scale = params.texture_scale_factor;

        // A single stretched blit fits the packed-UV node; everything else
        // needs a node that holds several blits.
        if self.scale9_grid.is_none() && self.fill_mode == BitmapFillMode::Scale {
            if !matches!(node, Some(RenderNode::NormalBitmap(_))) {
                *node = Some(RenderNode::NormalBitmap(NormalBitmapNode::new()));
            }
            if let Some(RenderNode::NormalBitmap(n)) = node {
                update_texture_data(n, texture, dest_w, dest_h, self.fill_mode, self.smoothing, scale);
            }
            return;
        }

        if !matches!(node, Some(RenderNode::Bitmap(_))) {
            *node = Some(RenderNode::Bitmap(BitmapNode::new()));
        }
        if let Some(RenderNode::Bitmap(n)) = node {
            match &self.scale9_grid {
                Some(grid) => update_texture_data_with_scale9_grid(
                    n,
                    texture,
                    grid,
                    dest_w,
                    dest_h,
                    self.smoothing,
                    scale,
                ),
                None => update_texture_data(
                    n,
                    texture,
                    dest_w,
                    dest_h,
                    self.fill_mode,
                    self.smoothing,
                    scale,
                ),
            }
        }
    }

    fn bitmap(&self) -> Option<BitmapId> {
        self.texture.map(|t| t.bitmap)
    }
}

/// A textured triangle mesh. `uvs` are normalized over the texture region.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshContent {
    pub texture: Option<Texture>,
    pub vertices: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u16>,
    pub smoothing: bool,
}

impl MeshContent {
    pub fn new(texture: Option<Texture>) -> Self {
        Self {
            texture,
            vertices: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            smoothing: true,
        }
    }
}

impl Renderable for MeshContent {
    fn measure_content_bounds(&self, _explicit_width: f32, _explicit_height: f32) -> Rectangle {
        vertex_bounds(&self.vertices)
    }

    fn update_render_node(&self, node: &mut Option<RenderNode>, params: &NodeParams) {
        let Some(texture) = &self.texture else {
            *node = None;
            return;
        };
        if !matches!(node, Some(RenderNode::Mesh(_))) {
            *node = Some(RenderNode::Mesh(MeshNode::new()));
        }
        let Some(RenderNode::Mesh(mesh)) = node else {
            return;
        };
        let scale = params.texture_scale_factor;
        mesh.image = Some(texture.bitmap);
        mesh.image_width = texture.source_width;
        mesh.image_height = texture.source_height;
        mesh.smoothing = self.smoothing;
        mesh.rotated = texture.rotated;
        mesh.vertices.clone_from(&self.vertices);
        mesh.uvs.clone_from(&self.uvs);
        mesh.indices.clone_from(&self.indices);
        mesh.update_bounds();
        mesh.draw_mesh(
            texture.bitmap_x,
            texture.bitmap_y,
            texture.bitmap_width,
            texture.bitmap_height,
            texture.offset_x,
            texture.offset_y,
            texture.bitmap_width * scale,
            texture.bitmap_height * scale,
        );
    }

    fn bitmap(&self) -> Option<BitmapId> {
        self.texture.map(|t| t.bitmap)
    }
}

/// Single-style text. Glyph shaping happens in the platform layer, which
/// reports the measured size through `text_width`/`text_height`.
#[derive(Clone, Debug, PartialEq)]
pub struct TextContent {
    pub text: String,
    pub size: f32,
    pub text_color: u32,
    pub stroke: f32,
    pub stroke_color: u32,
    pub bold: bool,
    pub italic: bool,
    pub font_family: String,
    pub line_spacing: f32,
    pub text_width: f32,
    pub text_height: f32,
    /// Fill color drawn behind the text.
    pub background: Option<u32>,
    /// Outline color drawn around the text area.
    pub border: Option<u32>,
}

impl TextContent {
    /// Text with default styling. The measured size starts as a rough
    /// estimate of half an em per character.
    pub fn new(text: impl Into<String>, size: f32) -> Self {
        let text = text.into();
        let lines = text.split('\n').count().max(1) as f32;
        let longest = text.split('\n').map(|l| l.chars().count()).max().unwrap_or(0) as f32;
        Self {
            text,
            size,
            text_color: 0xFFFFFF,
            stroke: 0.0,
            stroke_color: 0x000000,
            bold: false,
            italic: false,
            font_family: "Arial".to_string(),
            line_spacing: 0.0,
            text_width: longest * size * 0.5,
            text_height: lines * size,
            background: None,
            border: None,
        }
    }

    fn text_node(&self) -> TextNode {
        let mut node = TextNode::new();
        node.text_color = self.text_color;
        node.stroke_color = self.stroke_color;
        node.size = self.size;
        node.stroke = self.stroke;
        node.bold = self.bold;
        node.italic = self.italic;
        node.font_family.clone_from(&self.font_family);
        node
    }

    fn fill_text(&self, node: &mut TextNode, width: f32, height: f32) {
        node.width = width;
        node.height = height;
        let line_height = self.size + self.line_spacing;
        for (i, line) in self.text.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            node.draw_text(0.0, i as f32 * line_height, line, TextFormat::default());
        }
    }
}

impl Renderable for TextContent {
    fn measure_content_bounds(&self, explicit_width: f32, explicit_height: f32) -> Rectangle {
        Rectangle::new(
            0.0,
            0.0,
            or_auto(explicit_width, self.text_width),
            or_auto(explicit_height, self.text_height),
        )
    }

    fn update_render_node(&self, node: &mut Option<RenderNode>, params: &NodeParams) {
        let width = or_auto(params.explicit_width, self.text_width);
        let height = or_auto(params.explicit_height, self.text_height);

        if self.background.is_none() && self.border.is_none() {
            let mut text = match node.take() {
                Some(RenderNode::Text(text)) => text,
                _ => self.text_node(),
            };
            self.fill_text(&mut text, width, height);
            *node = Some(RenderNode::Text(text));
            return;
        }

        let area = Rectangle::new(0.0, 0.0, width, height);
        let mut graphics = GraphicsNode::new(params.cache_key);
        graphics.draw_path(GraphicsPath {
            shape: PathShape::Rect(area),
            fill: self.background.map(|color| FillStyle { color, alpha: 1.0 }),
            stroke: self.border.map(|color| StrokeStyle {
                thickness: 1.0,
                color,
                alpha: 1.0,
            }),
        });
        let mut text = self.text_node();
        self.fill_text(&mut text, width, height);

        let mut group = GroupNode::new();
        group.add_node(RenderNode::Graphics(graphics));
        group.add_node(RenderNode::Text(text));
        *node = Some(RenderNode::Group(group));
    }
}

/// Vector paths drawn in local space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphicsContent {
    pub paths: Vec<GraphicsPath>,
}

impl GraphicsContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Renderable for GraphicsContent {
    fn measure_content_bounds(&self, _explicit_width: f32, _explicit_height: f32) -> Rectangle {
        self.paths
            .iter()
            .fold(Rectangle::EMPTY, |acc, p| acc.union(&p.bounds()))
    }

    fn update_render_node(&self, node: &mut Option<RenderNode>, params: &NodeParams) {
        if self.paths.is_empty() {
            *node = None;
            return;
        }
        let mut graphics = match node.take() {
            Some(RenderNode::Graphics(g)) => g,
            _ => GraphicsNode::new(params.cache_key),
        };
        for path in &self.paths {
            graphics.draw_path(path.clone());
        }
        *node = Some(RenderNode::Graphics(graphics));
    }
}

/// What a display object draws. Only containers hold children.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayKind {
    /// Holds children and may draw vector graphics beneath them.
    Container(GraphicsContent),
    Bitmap(BitmapContent),
    Mesh(MeshContent),
    Text(TextContent),
    Graphics(GraphicsContent),
}

impl DisplayKind {
    pub fn container() -> Self {
        DisplayKind::Container(GraphicsContent::new())
    }

    pub fn is_container(&self) -> bool {
        matches!(self, DisplayKind::Container(_))
    }

    fn as_renderable(&self) -> &dyn Renderable {
        match self {
            DisplayKind::Container(g) | DisplayKind::Graphics(g) => g,
            DisplayKind::Bitmap(b) => b,
            DisplayKind::Mesh(m) => m,
            DisplayKind::Text(t) => t,
        }
    }
}

impl Renderable for DisplayKind {
    fn measure_content_bounds(&self, explicit_width: f32, explicit_height: f32) -> Rectangle {
        self.as_renderable()
            .measure_content_bounds(explicit_width, explicit_height)
    }

    fn update_render_node(&self, node: &mut Option<RenderNode>, params: &NodeParams) {
        self.as_renderable().update_render_node(node, params)
    }

    fn bitmap(&self) -> Option<BitmapId> {
        self.as_renderable().bitmap()
    }
}

fn or_auto(explicit: f32, measured: f32) -> f32 {
    if explicit.is_nan() {
        measured
    } else {
        explicit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap_data::{BitmapData, BitmapRegistry};

    fn params() -> NodeParams {
        NodeParams {
            explicit_width: f32::NAN,
            explicit_height: f32::NAN,
            texture_scale_factor: 1.0,
            cache_key: 7,
        }
    }

    fn texture(registry: &mut BitmapRegistry) -> Texture {
        let data = BitmapData::surface(64, 32);
        let id = registry.insert(data.clone());
        Texture::from_bitmap(id, &data)
    }

    #[test]
    fn test_bitmap_picks_node_by_fill() {
        let mut registry = BitmapRegistry::new();
        let mut content = BitmapContent::new(Some(texture(&mut registry)));
        let mut node = None;

        content.update_render_node(&mut node, &params());
        assert!(matches!(node, Some(RenderNode::NormalBitmap(_))));

        content.fill_mode = BitmapFillMode::Repeat;
        node.as_mut().unwrap().clean_before_render();
        content.update_render_node(&mut node, &params());
        match &node {
            Some(RenderNode::Bitmap(b)) => assert_eq!(b.draw_data.len(), 1),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_bitmap_bounds_follow_explicit_size() {
        let mut registry = BitmapRegistry::new();
        let content = BitmapContent::new(Some(texture(&mut registry)));
        assert_eq!(
            content.measure_content_bounds(f32::NAN, f32::NAN),
            Rectangle::new(0.0, 0.0, 64.0, 32.0)
        );
        assert_eq!(
            content.measure_content_bounds(100.0, f32::NAN),
            Rectangle::new(0.0, 0.0, 100.0, 32.0)
        );
    }

    #[test]
    fn test_text_with_background_becomes_group() {
        let mut text = TextContent::new("a\nbc", 20.0);
        let mut node = None;
        text.update_render_node(&mut node, &params());
        match &node {
            Some(RenderNode::Text(t)) => assert_eq!(t.draw_data.len(), 2),
            other => panic!("unexpected node {other:?}"),
        }

        text.background = Some(0x336699);
        text.update_render_node(&mut node, &params());
        match &node {
            Some(RenderNode::Group(g)) => {
                assert_eq!(g.children.len(), 2);
                assert_eq!(g.render_count(), 3);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_empty_graphics_has_no_node() {
        let graphics = GraphicsContent::new();
        let mut node = Some(RenderNode::Graphics(GraphicsNode::new(1)));
        graphics.update_render_node(&mut node, &params());
        assert!(node.is_none());
    }

    #[test]
    fn test_mesh_bounds_enclose_vertices() {
        let mut mesh = MeshContent::new(None);
        assert!(mesh.measure_content_bounds(f32::NAN, f32::NAN).is_empty());

        mesh.vertices = vec![2.0, -1.0, 10.0, 4.0, -3.0, 6.0];
        let bounds = mesh.measure_content_bounds(f32::NAN, f32::NAN);
        assert_eq!(bounds, Rectangle::new(-3.0, -1.0, 13.0, 7.0));
    }
}
