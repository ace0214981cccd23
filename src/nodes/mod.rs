//! Render nodes: renderer-independent descriptions of what one display
//! object draws.
//!
//! A node collects draw parameters between two calls to
//! [`RenderNode::clean_before_render`]. Display objects regenerate their
//! node only while their render flag is dirty.

mod bitmap;
mod graphics;
mod group;
mod mesh;
mod normal_bitmap;
mod text;

pub use bitmap::{update_texture_data, update_texture_data_with_scale9_grid, BitmapNode, ImageDraw, ImageNode};
pub use graphics::{FillStyle, GraphicsNode, GraphicsPath, PathShape, StrokeStyle};
pub use group::GroupNode;
pub use mesh::{vertex_bounds, MeshNode};
pub use normal_bitmap::{pack_uv, unpack_uv, NormalBitmapNode};
pub use text::{TextDraw, TextFormat, TextNode};

/// Numeric node tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RenderNodeType {
    Bitmap = 1,
    Text = 2,
    Graphics = 3,
    Group = 4,
    Mesh = 5,
    NormalBitmap = 6,
}

#[derive(Clone, Debug)]
pub enum RenderNode {
    Bitmap(BitmapNode),
    NormalBitmap(NormalBitmapNode),
    Mesh(MeshNode),
    Text(TextNode),
    Group(GroupNode),
    Graphics(GraphicsNode),
}

impl RenderNode {
    pub fn node_type(&self) -> RenderNodeType {
        match self {
            RenderNode::Bitmap(_) => RenderNodeType::Bitmap,
            RenderNode::NormalBitmap(_) => RenderNodeType::NormalBitmap,
            RenderNode::Mesh(_) => RenderNodeType::Mesh,
            RenderNode::Text(_) => RenderNodeType::Text,
            RenderNode::Group(_) => RenderNodeType::Group,
            RenderNode::Graphics(_) => RenderNodeType::Graphics,
        }
    }

    /// Reset the accumulated draw data. Groups delegate to their children.
    pub fn clean_before_render(&mut self) {
        match self {
            RenderNode::Bitmap(node) => node.clean_before_render(),
            RenderNode::NormalBitmap(node) => node.clean_before_render(),
            RenderNode::Mesh(node) => node.clean_before_render(),
            RenderNode::Text(node) => node.clean_before_render(),
            RenderNode::Group(node) => node.clean_before_render(),
            RenderNode::Graphics(node) => node.clean_before_render(),
        }
    }

    /// Number of draw operations recorded since the last clean.
    pub fn render_count(&self) -> usize {
        match self {
            RenderNode::Bitmap(node) => node.render_count,
            RenderNode::NormalBitmap(node) => node.render_count,
            RenderNode::Mesh(node) => node.render_count,
            RenderNode::Text(node) => node.render_count,
            RenderNode::Group(node) => node.render_count(),
            RenderNode::Graphics(node) => node.render_count,
        }
    }

    /// Whether the node would draw anything.
    pub fn is_empty(&self) -> bool {
        self.render_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap_data::{BitmapData, BitmapRegistry};

    fn all_nodes() -> Vec<RenderNode> {
        let mut registry = BitmapRegistry::new();
        let id = registry.insert(BitmapData::surface(8, 8));

        let mut bitmap = BitmapNode::new();
        bitmap.set_image(id, 8.0, 8.0, true, false);
        bitmap.draw_image(0.0, 0.0, 8.0, 8.0, 0.0, 0.0, 8.0, 8.0);

        let mut normal = NormalBitmapNode::new();
        normal.set_image(id, 8.0, 8.0, true, false);
        normal.draw_image(0.0, 0.0, 8.0, 8.0, 0.0, 0.0, 8.0, 8.0);

        let mut mesh = MeshNode::new();
        mesh.draw_mesh(0.0, 0.0, 8.0, 8.0, 0.0, 0.0, 8.0, 8.0);

        let mut text = TextNode::new();
        text.draw_text(0.0, 0.0, "hello", TextFormat::default());

        let mut graphics = GraphicsNode::new(1);
        graphics.draw_path(GraphicsPath::fill_rect(
            crate::geom::Rectangle::new(0.0, 0.0, 4.0, 4.0),
            0xFF0000,
            1.0,
        ));

        let mut group = GroupNode::new();
        group.add_node(RenderNode::Text(text.clone()));
        group.add_node(RenderNode::Graphics(graphics.clone()));

        vec![
            RenderNode::Bitmap(bitmap),
            RenderNode::NormalBitmap(normal),
            RenderNode::Mesh(mesh),
            RenderNode::Text(text),
            RenderNode::Graphics(graphics),
            RenderNode::Group(group),
        ]
    }

    #[test]
    fn test_clean_before_render_resets_every_kind() {
        for mut node in all_nodes() {
            assert!(node.render_count() > 0, "{:?}", node.node_type());
            node.clean_before_render();
            assert_eq!(node.render_count(), 0, "{:?}", node.node_type());
            assert!(node.is_empty());

            match &node {
                RenderNode::Bitmap(n) => assert!(n.draw_data.is_empty()),
                RenderNode::NormalBitmap(n) => assert!(n.image.is_none()),
                RenderNode::Mesh(n) => assert!(n.draw_data.is_empty()),
                RenderNode::Text(n) => assert!(n.draw_data.is_empty()),
                RenderNode::Graphics(n) => assert!(n.paths.is_empty()),
                RenderNode::Group(n) => assert_eq!(n.children.len(), 2),
            }
        }
    }

    #[test]
    fn test_group_sums_children() {
        let nodes = all_nodes();
        let group = nodes
            .iter()
            .find(|n| n.node_type() == RenderNodeType::Group)
            .unwrap();
        assert_eq!(group.render_count(), 2);
        assert_eq!(RenderNodeType::NormalBitmap as u8, 6);
    }
}
