//! Stage and renderer configuration.

use crate::constants::{DEFAULT_BATCH_SIZE, MIN_SURFACE_SIZE};

/// Configuration shared by a [`Scene`](crate::Scene) and the renderers
/// that draw it.
///
/// Use the builder pattern to configure it:
///
/// ```ignore
/// StageConfig::new()
///     .width(800)
///     .height(600)
///     .canvas_scale(2.0, 2.0)
///     .batch_size(4096)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StageConfig {
    /// Stage width in logical pixels.
    pub width: u32,
    /// Stage height in logical pixels.
    pub height: u32,
    /// Horizontal scale between logical and surface pixels.
    pub canvas_scale_x: f32,
    /// Vertical scale between logical and surface pixels.
    pub canvas_scale_y: f32,
    /// Ratio between texture pixels and logical pixels.
    pub texture_scale_factor: f32,
    /// Vertex batch capacity in quads.
    pub batch_size: usize,
    /// Minimum edge length of cached-bitmap surfaces.
    pub min_surface_size: u32,
    /// Whether `shape_flag` hit tests read back pixels. When disabled they
    /// fall back to the geometric test.
    pub pixel_hit_test: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 800,
            canvas_scale_x: 1.0,
            canvas_scale_y: 1.0,
            texture_scale_factor: 1.0,
            batch_size: DEFAULT_BATCH_SIZE,
            min_surface_size: MIN_SURFACE_SIZE,
            pixel_hit_test: true,
        }
    }
}

impl StageConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stage width.
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the stage height.
    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    /// Set the canvas scale applied when rendering the stage and cached surfaces.
    pub fn canvas_scale(mut self, x: f32, y: f32) -> Self {
        self.canvas_scale_x = x;
        self.canvas_scale_y = y;
        self
    }

    /// Set the texture scale factor.
    pub fn texture_scale_factor(mut self, factor: f32) -> Self {
        self.texture_scale_factor = factor;
        self
    }

    /// Set the vertex batch capacity in quads.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the minimum cached-surface edge length.
    pub fn min_surface_size(mut self, size: u32) -> Self {
        self.min_surface_size = size;
        self
    }

    /// Enable or disable pixel-exact hit testing.
    pub fn pixel_hit_test(mut self, enabled: bool) -> Self {
        self.pixel_hit_test = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = StageConfig::new()
            .width(320)
            .height(240)
            .canvas_scale(2.0, 3.0)
            .batch_size(16);

        assert_eq!(config.width, 320);
        assert_eq!(config.height, 240);
        assert_eq!(config.canvas_scale_x, 2.0);
        assert_eq!(config.canvas_scale_y, 3.0);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.min_surface_size, MIN_SURFACE_SIZE);
    }
}
