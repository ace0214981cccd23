/// Per-run overrides of a text node's default style.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextFormat {
    pub text_color: Option<u32>,
    pub stroke_color: Option<u32>,
    pub size: Option<f32>,
    pub stroke: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub font_family: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextDraw {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub format: TextFormat,
}

/// Positioned text runs. Shaping and glyph rasterization happen in the
/// platform layer, which re-rasterizes whenever `dirty_render` is set.
#[derive(Clone, Debug)]
pub struct TextNode {
    pub text_color: u32,
    pub stroke_color: u32,
    pub size: f32,
    pub stroke: f32,
    pub bold: bool,
    pub italic: bool,
    pub font_family: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub dirty_render: bool,
    pub draw_data: Vec<TextDraw>,
    pub(crate) render_count: usize,
}

impl Default for TextNode {
    fn default() -> Self {
        Self {
            text_color: 0xFFFFFF,
            stroke_color: 0x000000,
            size: 30.0,
            stroke: 0.0,
            bold: false,
            italic: false,
            font_family: "Arial".to_string(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            dirty_render: true,
            draw_data: Vec::new(),
            render_count: 0,
        }
    }
}

impl TextNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw_text(&mut self, x: f32, y: f32, text: impl Into<String>, format: TextFormat) {
        self.draw_data.push(TextDraw {
            x,
            y,
            text: text.into(),
            format,
        });
        self.render_count += 1;
        self.dirty_render = true;
    }

    pub fn clean_before_render(&mut self) {
        self.draw_data.clear();
        self.render_count = 0;
        self.dirty_render = true;
    }
}
