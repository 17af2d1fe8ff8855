//! # Vertex — Per-Corner Data Sent to the GPU
//!
//! Every sprite becomes a [`Quad`]: four vertices in a fixed corner order.
//! Each vertex carries a pixel-space position, a texture coordinate, and a
//! tint color, packed into a flat struct that is uploaded byte-for-byte.
//!
//! ## Memory Layout
//!
//! `#[repr(C)]` pins the field order and the `bytemuck` traits let a
//! `&[Vertex]` be viewed as `&[u8]` for upload without copying. The offsets
//! below are part of the contract with the shader and must not drift.
//!
//! ```text
//! Vertex (32 bytes per vertex)
//! ┌──────────────┬──────────────┬────────────────────────┐
//! │ position     │ uv           │ color                  │
//! │ [f32; 2]     │ [f32; 2]     │ [f32; 4]               │
//! │ offset 0     │ offset 8     │ offset 16              │
//! │ location(0)  │ location(1)  │ location(2)            │
//! └──────────────┴──────────────┴────────────────────────┘
//! ```
//!
//! ## Corner Order and Indices
//!
//! ```text
//!   0 ─── 2        vertices: top-left, bottom-left, top-right, bottom-right
//!   │ ╲   │        triangles: (0, 1, 2) and (2, 1, 3)
//!   │   ╲ │
//!   1 ─── 3
//! ```
//!
//! The six-index pattern is precomputed once per batch for its full
//! capacity; quad `n` uses the pattern offset by `4 * n`.

use bytemuck::{Pod, Zeroable};

use crate::error::{RenderError, RenderResult};

/// Per-vertex data for sprite quads. Position is in pixel space; the
/// shader only applies the projection (and optional static transform).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };

    pub const SIZE: u64 = std::mem::size_of::<Vertex>() as u64;
}

/// The four vertices of one sprite: top-left, bottom-left, top-right, bottom-right.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Quad {
    pub vertices: [Vertex; 4],
}

impl Quad {
    pub const TOP_LEFT: usize = 0;
    pub const BOTTOM_LEFT: usize = 1;
    pub const TOP_RIGHT: usize = 2;
    pub const BOTTOM_RIGHT: usize = 3;

    /// Corner positions in vertex order.
    pub fn positions(&self) -> [[f32; 2]; 4] {
        self.vertices.map(|v| v.position)
    }

    /// Corner texture coordinates in vertex order.
    pub fn uvs(&self) -> [[f32; 2]; 4] {
        self.vertices.map(|v| v.uv)
    }
}

/// Index pattern for a single quad.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Build the index pattern covering `quads` consecutive quads.
///
/// Fails with `AllocationFailure` instead of aborting when the index array
/// cannot be reserved.
pub fn quad_indices(quads: usize) -> RenderResult<Vec<u32>> {
    let len = quads
        .checked_mul(INDICES_PER_QUAD)
        .ok_or_else(|| RenderError::invalid(format!("{quads} quads overflow the index array")))?;
    let mut indices = Vec::new();
    indices.try_reserve_exact(len)?;
    for quad in 0..quads as u32 {
        let base = quad * VERTICES_PER_QUAD as u32;
        indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }
    Ok(indices)
}
