//! Geometry for the instanced cell quad.

use bytemuck::{Pod, Zeroable};

use crate::util::Color;

pub const CLEAR_COLOR: Color = Color::rgb(0, 0, 0);

const CORNER_COLORS: [Color; 4] = [
    Color::rgb(255, 0, 0),
    Color::rgb(0, 255, 0),
    Color::rgb(0, 0, 255),
    Color::rgb(0, 255, 255),
];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Grid dimensions as seen by every shader stage.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GridUniforms {
    pub size: [f32; 2],
}

impl GridUniforms {
    pub fn new(grid_size: u32) -> Self {
        Self {
            size: [grid_size as f32, grid_size as f32],
        }
    }
}

/// One cell's footprint, centred on the origin with side 1.
#[derive(Clone, Debug)]
pub struct Quad {
    pub vertices: [Vertex; 4],
    pub indices: [u32; 6],
}

impl Quad {
    pub fn new() -> Self {
        let corners = [[0.5, 0.5], [-0.5, -0.5], [0.5, -0.5], [-0.5, 0.5]];
        let vertices = std::array::from_fn(|i| Vertex {
            position: [corners[i][0], corners[i][1], 0.0, 1.0],
            color: CORNER_COLORS[i].as_rgba_f32(),
        });
        Self {
            vertices,
            indices: [0, 1, 2, 1, 3, 0],
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

impl Default for Quad {
    fn default() -> Self {
        Self::new()
    }
}
