use wgpu::naga::ShaderStage;

use crate::compile::{
    compile_module, compile_scene_fragment, compile_vertex_shader, ShaderBuildError,
    UniformLocations,
};

use super::quad::FullscreenQuad;
use super::targets::TARGET_FORMAT;
use super::uniforms::uniform_layout;

/// Layout objects shared by all scene programs.
pub(crate) struct SceneLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub vertex_module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
}

impl SceneLayouts {
    pub fn new(device: &wgpu::Device) -> Result<Self, ShaderBuildError> {
        let uniform_layout = uniform_layout(device, "scene uniform layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let vertex_module = compile_vertex_shader(device)?;
        Ok(Self {
            uniform_layout,
            vertex_module,
            pipeline_layout,
        })
    }
}

/// A compiled, linked scene program plus the locations of its inputs.
pub(crate) struct ShaderProgram {
    pub label: String,
    pub pipeline: wgpu::RenderPipeline,
    pub locations: UniformLocations,
}

impl ShaderProgram {
    /// Compiles `fragment` against the shared vertex stage and links a pipeline
    /// that renders into an offscreen target.
    pub fn build(
        device: &wgpu::Device,
        layouts: &SceneLayouts,
        label: &str,
        fragment: &str,
    ) -> Result<Self, ShaderBuildError> {
        let fragment_module = compile_scene_fragment(device, label, fragment)?;
        let pipeline = link_fullscreen_pipeline(
            device,
            label,
            &layouts.pipeline_layout,
            &layouts.vertex_module,
            &fragment_module,
            TARGET_FORMAT,
        )?;
        let locations = UniformLocations::resolve(fragment);
        if locations.time.is_none() {
            tracing::debug!(scene = label, "scene never reads u_time; time uploads skipped");
        }
        Ok(Self {
            label: label.to_string(),
            pipeline,
            locations,
        })
    }
}

/// Compiles a generated compositor pass shader.
pub(crate) fn compile_pass_fragment(
    device: &wgpu::Device,
    label: &str,
    source: String,
) -> Result<wgpu::ShaderModule, ShaderBuildError> {
    compile_module(device, label, ShaderStage::Fragment, source)
}

/// Builds the render pipeline for a fullscreen-quad draw.
///
/// Pipeline creation is wrapped in a validation error scope so interface
/// mismatches between the stages fail here, the way a link step would.
pub(crate) fn link_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline, ShaderBuildError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("main"),
            buffers: &[FullscreenQuad::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
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
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(ShaderBuildError::Device {
            label: label.to_string(),
            message: error.to_string(),
        }),
        None => Ok(pipeline),
    }
}
