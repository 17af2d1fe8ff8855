//! # Static Batch — Bake Once, Draw Many
//!
//! A [`StaticBatch`] holds sprites that never change, such as a tile
//! background. Sprites are accumulated on the CPU, uploaded to a single GPU
//! buffer on the first present, and from then on every present is only a
//! draw with a fresh transform (typically the camera).
//!
//! ```text
//!  draw_static ×N        present_static #1        present_static #2..
//! ┌──────────────┐      ┌──────────────────┐     ┌──────────────────┐
//! │ CPU vertices │ ───▶ │ upload + draw    │ ──▶ │ draw only        │
//! │ (mutable)    │      │ is_uploaded=true │     │ (CPU side frozen)│
//! └──────────────┘      └──────────────────┘     └──────────────────┘
//! ```
//!
//! Inserting after the bake fails with [`RenderError::AlreadyBaked`].

use crate::backend::{DrawCall, GraphicsBackend};
use crate::batch::DrawState;
use crate::config::validate_sprite_capacity;
use crate::error::{RenderError, RenderResult};
use crate::stats::FrameStats;
use crate::texture::Texture;
use crate::vertex::{INDICES_PER_QUAD, Quad, VERTICES_PER_QUAD, Vertex, quad_indices};

/// A single-texture batch that is uploaded once and drawn many times.
pub struct StaticBatch<B: GraphicsBackend> {
    texture: Texture,
    vertices: Vec<Vertex>,
    capacity: usize,
    buffer: B::Buffer,
    indices: B::Buffer,
    is_uploaded: bool,
}

impl<B: GraphicsBackend> StaticBatch<B> {
    pub(crate) fn new(backend: &mut B, texture: Texture, capacity: usize) -> RenderResult<Self> {
        validate_sprite_capacity(capacity)?;
        let vertex_count = capacity * VERTICES_PER_QUAD;
        let mut vertices = Vec::new();
        vertices.try_reserve_exact(vertex_count)?;

        let buffer =
            backend.create_vertex_buffer("kiln static batch", vertex_count as u64 * Vertex::SIZE)?;
        let indices = backend.create_index_buffer("kiln static indices", &quad_indices(capacity)?)?;

        log::debug!(
            "created static batch for texture {} ({capacity} sprites)",
            texture.handle.index()
        );
        Ok(Self {
            texture,
            vertices,
            capacity,
            buffer,
            indices,
            is_uploaded: false,
        })
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn sprite_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_uploaded(&self) -> bool {
        self.is_uploaded
    }

    pub(crate) fn push(&mut self, quad: &Quad) -> RenderResult<()> {
        if self.is_uploaded {
            return Err(RenderError::AlreadyBaked);
        }
        if self.sprite_count() >= self.capacity {
            log::warn!(
                "static batch for texture {} is full",
                self.texture.handle.index()
            );
            return Err(RenderError::CapacityExceeded {
                texture: self.texture.handle,
                max_buckets: 1,
                max_sprites_per_bucket: self.capacity,
            });
        }
        self.vertices.extend_from_slice(&quad.vertices);
        Ok(())
    }

    /// Bake on first call, then draw.
    pub(crate) fn present(&mut self, backend: &mut B, state: &DrawState<'_, B>) -> RenderResult<FrameStats> {
        let mut stats = FrameStats::default();
        if !self.is_uploaded {
            let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
            if !bytes.is_empty() {
                backend.upload(&self.buffer, 0, bytes)?;
                stats.record_upload(bytes.len());
            }
            self.is_uploaded = true;
            log::debug!(
                "baked static batch for texture {}: {} sprites",
                self.texture.handle.index(),
                self.sprite_count()
            );
        }

        let count = self.sprite_count();
        if count > 0 {
            backend.draw(DrawCall {
                vertices: &self.buffer,
                indices: &self.indices,
                texture: self.texture.handle,
                index_count: (count * INDICES_PER_QUAD) as u32,
                transform: state.transform,
                shader: state.shader,
                blend: state.blend,
            })?;
            backend.submit()?;
            stats.record_draw();
            stats.record_submit();
        }
        Ok(stats)
    }
}
