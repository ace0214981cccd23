use wgpu::{BindGroupLayout, Device, RenderPipeline, Sampler};

use crate::batch::BatchVertex;
use crate::display::BlendMode;

use super::buffer::SURFACE_FORMAT;

const SHADER_SOURCE: &str = r#"
struct Screen {
    size: vec2<f32>,
    _padding: vec2<f32>,
}

@group(0) @binding(0) var t_source: texture_2d<f32>;
@group(0) @binding(1) var s_source: sampler;
@group(0) @binding(2) var<uniform> screen: Screen;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: u32,
    @location(2) alpha: f32,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) alpha: f32,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    // Pixels to NDC, y down.
    let ndc = vec2<f32>(
        in.position.x / screen.size.x * 2.0 - 1.0,
        1.0 - in.position.y / screen.size.y * 2.0
    );
    out.clip_position = vec4<f32>(ndc, 0.0, 1.0);
    out.uv = vec2<f32>(f32(in.uv & 0xFFFFu), f32(in.uv >> 16u)) / 65535.0;
    out.alpha = in.alpha;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Sources hold premultiplied color.
    return textureSample(t_source, s_source, in.uv) * in.alpha;
}
"#;

/// Uniform block of the batch shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ScreenUniform {
    pub size: [f32; 2],
    pub _padding: [f32; 2],
}

impl ScreenUniform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: [width as f32, height as f32],
            _padding: [0.0; 2],
        }
    }
}

/// Blend state for premultiplied sources.
fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::BlendFactor::{One, OneMinusSrcAlpha, SrcAlpha, Zero};

    let (src, dst) = match mode {
        BlendMode::Normal => (One, OneMinusSrcAlpha),
        BlendMode::Add => (One, One),
        BlendMode::Erase => (Zero, OneMinusSrcAlpha),
        BlendMode::DestinationIn => (Zero, SrcAlpha),
    };
    let component = wgpu::BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

/// Pipelines, layout and samplers of the batch renderer.
pub(crate) struct BatchPipelines {
    pub bind_group_layout: BindGroupLayout,
    normal: RenderPipeline,
    add: RenderPipeline,
    erase: RenderPipeline,
    destination_in: RenderPipeline,
    linear_sampler: Sampler,
    nearest_sampler: Sampler,
}

impl BatchPipelines {
    pub fn new(device: &Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Batch Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Batch Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Batch Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let create = |mode: BlendMode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Batch Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[BatchVertex::desc()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: SURFACE_FORMAT,
                        blend: Some(blend_state(mode)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        let sampler = |filter: wgpu::FilterMode, label: &str| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        };

        Self {
            normal: create(BlendMode::Normal),
            add: create(BlendMode::Add),
            erase: create(BlendMode::Erase),
            destination_in: create(BlendMode::DestinationIn),
            linear_sampler: sampler(wgpu::FilterMode::Linear, "Batch Linear Sampler"),
            nearest_sampler: sampler(wgpu::FilterMode::Nearest, "Batch Nearest Sampler"),
            bind_group_layout,
        }
    }

    pub fn pipeline(&self, mode: BlendMode) -> &RenderPipeline {
        match mode {
            BlendMode::Normal => &self.normal,
            BlendMode::Add => &self.add,
            BlendMode::Erase => &self.erase,
            BlendMode::DestinationIn => &self.destination_in,
        }
    }

    pub fn sampler(&self, smoothing: bool) -> &Sampler {
        if smoothing {
            &self.linear_sampler
        } else {
            &self.nearest_sampler
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_states_expect_premultiplied_sources() {
        let normal = blend_state(BlendMode::Normal);
        assert_eq!(normal.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(normal.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);

        let mask = blend_state(BlendMode::DestinationIn);
        assert_eq!(mask.alpha.src_factor, wgpu::BlendFactor::Zero);
        assert_eq!(mask.alpha.dst_factor, wgpu::BlendFactor::SrcAlpha);
    }

    #[test]
    fn test_screen_uniform_is_16_bytes() {
        assert_eq!(std::mem::size_of::<ScreenUniform>(), 16);
    }
}
