use wgpu::util::DeviceExt;

/// Two clip-space triangles tiling [-1, 1] x [-1, 1].
pub(crate) const FULLSCREEN_QUAD: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

pub(crate) const QUAD_VERTEX_COUNT: u32 = FULLSCREEN_QUAD.len() as u32;

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![crate::compile::POSITION_ATTRIBUTE => Float32x2];

/// Static vertex buffer shared by every scene and compositor pass.
#[derive(Clone)]
pub(crate) struct FullscreenQuad {
    buffer: wgpu::Buffer,
}

impl FullscreenQuad {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen quad"),
            contents: bytemuck::cast_slice(&FULLSCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &QUAD_ATTRIBUTES,
        }
    }

    /// Binds the quad and submits all six vertices.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.buffer.slice(..));
        pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(a: [f32; 2], b: [f32; 2], c: [f32; 2]) -> f32 {
        ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])) * 0.5
    }

    #[test]
    fn quad_is_two_triangles() {
        assert_eq!(QUAD_VERTEX_COUNT, 6);
        assert_eq!(FULLSCREEN_QUAD.len() % 3, 0);
    }

    #[test]
    fn quad_covers_clip_space_exactly() {
        let mut total = 0.0;
        for triangle in FULLSCREEN_QUAD.chunks(3) {
            let area = signed_area(triangle[0], triangle[1], triangle[2]);
            // Counter-clockwise, matching the pipelines' front face.
            assert!(area > 0.0);
            total += area;
        }
        assert!((total - 4.0).abs() < f32::EPSILON);

        for vertex in FULLSCREEN_QUAD {
            assert!(vertex.iter().all(|c| c.abs() == 1.0));
        }
        for corner in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(FULLSCREEN_QUAD.contains(&corner));
        }
    }
}
