//! # Bucket — One Texture's Sprites and Its Buffer Ring
//!
//! A bucket collects the quads of a single texture for the current frame in
//! a CPU-side vertex array, and owns a small ring of GPU vertex buffers it
//! uploads into.
//!
//! ```text
//! Bucket
//! ┌─────────────────────────────────────────────────────┐
//! │ texture: Some(tex) | None (free)                    │
//! │ vertices: [v0 v1 v2 v3 | v4 ... | ...]  capacity×4  │
//! │           └─ quad 0 ─┘ └ quad 1                     │
//! │ sprite_count: live quads this frame                 │
//! │                                                     │
//! │ ring[0]  buffer + (texture, count) it was filled    │
//! │ ring[1]  with, so a later draw of that generation   │
//! │ ring[2]  uses matching texture and vertex count     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! A bucket never mixes textures: `texture` is `None` exactly when
//! `sprite_count` is zero.

use crate::backend::GraphicsBackend;
use crate::error::RenderResult;
use crate::texture::TextureHandle;
use crate::vertex::{Quad, VERTICES_PER_QUAD, Vertex};

/// One GPU buffer in a bucket's ring and what was last uploaded into it.
pub(crate) struct Generation<B: GraphicsBackend> {
    pub buffer: B::Buffer,
    pub texture: Option<TextureHandle>,
    pub sprite_count: usize,
}

impl<B: GraphicsBackend> Generation<B> {
    /// Texture and quad count to draw from this generation, if it holds any.
    pub fn drawable(&self) -> Option<(TextureHandle, usize)> {
        match self.texture {
            Some(texture) if self.sprite_count > 0 => Some((texture, self.sprite_count)),
            _ => None,
        }
    }
}

pub(crate) struct Bucket<B: GraphicsBackend> {
    vertices: Vec<Vertex>,
    capacity: usize,
    texture: Option<TextureHandle>,
    sprite_count: usize,
    pub ring: Vec<Generation<B>>,
}

impl<B: GraphicsBackend> Bucket<B> {
    /// Allocate the CPU array and `generations` GPU buffers.
    ///
    /// Buffers created before a failure are dropped on the way out.
    pub fn new(
        backend: &mut B,
        label: &str,
        capacity: usize,
        generations: usize,
    ) -> RenderResult<Self> {
        let vertex_count = capacity * VERTICES_PER_QUAD;
        let mut vertices = Vec::new();
        vertices.try_reserve_exact(vertex_count)?;
        vertices.resize(vertex_count, Vertex::default());

        let size = vertex_count as u64 * Vertex::SIZE;
        let mut ring = Vec::with_capacity(generations);
        for _ in 0..generations {
            ring.push(Generation {
                buffer: backend.create_vertex_buffer(label, size)?,
                texture: None,
                sprite_count: 0,
            });
        }

        Ok(Self {
            vertices,
            capacity,
            texture: None,
            sprite_count: 0,
            ring,
        })
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn sprite_count(&self) -> usize {
        self.sprite_count
    }

    pub fn is_free(&self) -> bool {
        self.texture.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.sprite_count >= self.capacity
    }

    /// True if `texture` can be appended here right now.
    pub fn accepts(&self, texture: TextureHandle) -> bool {
        match self.texture {
            Some(current) => current == texture && !self.is_full(),
            None => true,
        }
    }

    /// Append a quad. The caller has checked [`accepts`](Self::accepts).
    pub fn push(&mut self, texture: TextureHandle, quad: &Quad) {
        debug_assert!(self.accepts(texture));
        let start = self.sprite_count * VERTICES_PER_QUAD;
        self.vertices[start..start + VERTICES_PER_QUAD].copy_from_slice(&quad.vertices);
        self.sprite_count += 1;
        self.texture = Some(texture);
    }

    /// The vertices of this frame's quads.
    pub fn live_vertices(&self) -> &[Vertex] {
        &self.vertices[..self.sprite_count * VERTICES_PER_QUAD]
    }

    /// Note that this frame's quads now live in ring generation `index`.
    pub fn record_fill(&mut self, index: usize) {
        let generation = &mut self.ring[index];
        generation.texture = self.texture;
        generation.sprite_count = self.sprite_count;
    }

    /// Free the bucket for the next frame.
    pub fn reset(&mut self) {
        self.texture = None;
        self.sprite_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Color, Vec2};
    use crate::testing::RecordingBackend;
    use crate::texture::Texture;
    use crate::transform::{DrawParams, build_quad};

    fn quad(x: f32) -> Quad {
        let tex = Texture::new(TextureHandle::new(1), 8, 8);
        build_quad(&tex, &DrawParams::at(Vec2::new(x, 0.0)).color(Color::RED))
    }

    #[test]
    fn creates_one_buffer_per_generation() {
        let mut backend = RecordingBackend::new();
        let bucket = Bucket::new(&mut backend, "test", 10, 3).unwrap();
        assert_eq!(bucket.ring.len(), 3);
        assert_eq!(backend.live_buffers(), 3);
        drop(bucket);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn failed_ring_releases_created_buffers() {
        let mut backend = RecordingBackend::new();
        backend.fail_vertex_buffers_after = Some(2);
        assert!(Bucket::new(&mut backend, "test", 10, 3).is_err());
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn push_appends_in_order_and_claims_texture() {
        let mut backend = RecordingBackend::new();
        let mut bucket = Bucket::new(&mut backend, "test", 2, 1).unwrap();
        let tex = TextureHandle::new(5);
        assert!(bucket.is_free());

        bucket.push(tex, &quad(0.0));
        bucket.push(tex, &quad(10.0));

        assert_eq!(bucket.texture(), Some(tex));
        assert_eq!(bucket.sprite_count(), 2);
        assert!(bucket.is_full());
        assert!(!bucket.accepts(tex));
        let live = bucket.live_vertices();
        assert_eq!(live.len(), 8);
        assert_eq!(live[0].position, [0.0, 0.0]);
        assert_eq!(live[4].position, [10.0, 0.0]);
    }

    #[test]
    fn never_accepts_a_second_texture() {
        let mut backend = RecordingBackend::new();
        let mut bucket = Bucket::new(&mut backend, "test", 4, 1).unwrap();
        bucket.push(TextureHandle::new(1), &quad(0.0));
        assert!(!bucket.accepts(TextureHandle::new(2)));
        assert!(bucket.accepts(TextureHandle::new(1)));
    }

    #[test]
    fn record_fill_then_reset() {
        let mut backend = RecordingBackend::new();
        let mut bucket = Bucket::new(&mut backend, "test", 4, 2).unwrap();
        let tex = TextureHandle::new(9);
        bucket.push(tex, &quad(0.0));
        bucket.record_fill(1);
        bucket.reset();

        assert!(bucket.is_free());
        assert_eq!(bucket.sprite_count(), 0);
        assert_eq!(bucket.ring[1].drawable(), Some((tex, 1)));
        assert_eq!(bucket.ring[0].drawable(), None);
    }
}
