use crate::display::BlendMode;
use crate::geom::Matrix;

use super::RenderNode;

/// Several nodes drawn together, e.g. a text field's background and its
/// glyphs.
#[derive(Clone, Debug, Default)]
pub struct GroupNode {
    /// Transform applied to every child before the owner's matrix.
    pub matrix: Option<Matrix>,
    pub blend_mode: Option<BlendMode>,
    pub children: Vec<RenderNode>,
}

impl GroupNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: RenderNode) {
        self.children.push(node);
    }

    /// Clears every child; the child list itself is kept.
    pub fn clean_before_render(&mut self) {
        for child in self.children.iter_mut().rev() {
            child.clean_before_render();
        }
    }

    pub fn render_count(&self) -> usize {
        self.children.iter().map(RenderNode::render_count).sum()
    }
}
