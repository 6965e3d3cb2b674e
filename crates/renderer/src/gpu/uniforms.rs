use bytemuck::{Pod, Zeroable};

/// Uniform block shared by scene programs and compositor passes.
///
/// Mirrors the std140 `SceneParams`/`PassParams` blocks declared in the GLSL
/// preludes: `vec2` resolution, `float` time, one float of padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct FrameUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub _padding0: f32,
}

pub(crate) const RESOLUTION_OFFSET: wgpu::BufferAddress = 0;
pub(crate) const TIME_OFFSET: wgpu::BufferAddress = 8;
pub(crate) const FRAME_UNIFORMS_SIZE: wgpu::BufferAddress =
    std::mem::size_of::<FrameUniforms>() as wgpu::BufferAddress;

impl FrameUniforms {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time: 0.0,
            _padding0: 0.0,
        }
    }
}

pub(crate) fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(FRAME_UNIFORMS_SIZE),
            },
            count: None,
        }],
    })
}

/// Allocates a uniform buffer plus its bind group, seeded with `initial`.
pub(crate) fn create_uniform_binding(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    initial: &FrameUniforms,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: FRAME_UNIFORMS_SIZE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    queue.write_buffer(&buffer, 0, bytemuck::bytes_of(initial));
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (buffer, bind_group)
}
