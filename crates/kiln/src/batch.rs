//! # Sprite Batch — Texture Buckets and Buffer Rotation
//!
//! A [`SpriteBatch`] is a fixed array of [`Bucket`]s plus the bookkeeping
//! that decides, each frame, which GPU buffer generation is filled and
//! which is drawn.
//!
//! ## Bucket Assignment
//!
//! The first texture seen in a frame claims bucket 0, the next new texture
//! claims bucket 1, and so on. A texture whose bucket fills up claims the
//! next free bucket. Live buckets therefore always form a prefix of the
//! array, and cross-texture draw order follows first-touch order.
//!
//! ```text
//! draw A, A, B, A(full → spill), C
//!
//! bucket:   0      1      2      3
//!         ┌──────┬──────┬──────┬──────┐
//!         │ A ×N │ B ×1 │ A ×1 │ C ×1 │
//!         └──────┴──────┴──────┴──────┘
//! ```
//!
//! ## Buffer Rotation
//!
//! With double or triple buffering each bucket owns a ring of GPU buffers.
//! A flush uploads this frame's vertices into generation `fill` and draws
//! generation `draw`, which holds the previous frame's vertices:
//!
//! ```text
//! triple buffering, buffer_index advancing each present
//!
//! frame    F0(warm-up)  F1        F2        F3        F4
//! fill     0            1         2         0         1
//! draw     0            0         1         2         0
//!                       └─ F0's   └─ F1's   └─ F2's   └─ F3's
//! ```
//!
//! The first frame after creation is a warm-up: both indices collapse to
//! generation 0 so nothing is drawn from a generation that was never
//! filled. Single buffering always fills and draws generation 0.
//!
//! Each generation remembers the texture and sprite count it was filled
//! with, so a lagged draw always pairs vertices with their own texture.

use crate::backend::{DrawCall, GraphicsBackend};
use crate::blend::BlendMode;
use crate::bucket::Bucket;
use crate::config::BatchConfig;
use crate::error::{RenderError, RenderResult};
use crate::math::Mat4;
use crate::stats::FrameStats;
use crate::texture::TextureHandle;
use crate::vertex::{INDICES_PER_QUAD, Quad, quad_indices};

/// Identity of a batch within one renderer. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(pub(crate) u64);

/// Generation indices used by one flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameSlots {
    pub fill: usize,
    pub draw: usize,
}

/// Pipeline state shared by every draw of one flush.
pub(crate) struct DrawState<'a, B: GraphicsBackend> {
    pub transform: Mat4,
    pub shader: Option<&'a B::Shader>,
    pub blend: BlendMode,
}

/// A dynamic, texture-grouped batch of sprites.
///
/// Created by [`Renderer::create_batch`](crate::Renderer::create_batch);
/// dropping it releases every GPU buffer it owns.
pub struct SpriteBatch<B: GraphicsBackend> {
    id: BatchId,
    config: BatchConfig,
    buckets: Vec<Bucket<B>>,
    indices: B::Buffer,
    buffer_index: usize,
    frameskip: u32,
    /// Live bucket count recorded for each generation when it was filled.
    ring_extent: Vec<usize>,
}

impl<B: GraphicsBackend> SpriteBatch<B> {
    pub(crate) fn new(backend: &mut B, id: BatchId, config: BatchConfig) -> RenderResult<Self> {
        config.validate()?;
        let generations = config.buffering.generations();

        let mut buckets = Vec::new();
        buckets.try_reserve_exact(config.max_buckets)?;
        for i in 0..config.max_buckets {
            let label = format!("kiln batch {} bucket {i}", id.0);
            buckets.push(Bucket::new(
                backend,
                &label,
                config.max_sprites_per_bucket,
                generations,
            )?);
        }
        let indices = backend.create_index_buffer(
            "kiln batch indices",
            &quad_indices(config.max_sprites_per_bucket)?,
        )?;

        log::debug!(
            "created batch {}: {} buckets x {} sprites, {:?} buffering",
            id.0,
            config.max_buckets,
            config.max_sprites_per_bucket,
            config.buffering
        );

        Ok(Self {
            id,
            config,
            buckets,
            indices,
            buffer_index: 0,
            frameskip: 1,
            ring_extent: vec![0; generations],
        })
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Sprites accumulated since the last flush.
    pub fn sprite_count(&self) -> usize {
        self.buckets.iter().map(Bucket::sprite_count).sum()
    }

    /// Per-bucket sprite counts, in bucket order.
    pub fn bucket_sprite_counts(&self) -> Vec<usize> {
        self.buckets.iter().map(Bucket::sprite_count).collect()
    }

    /// Per-bucket assigned texture, `None` for free buckets.
    pub fn bucket_textures(&self) -> Vec<Option<TextureHandle>> {
        self.buckets.iter().map(Bucket::texture).collect()
    }

    pub fn buffer_index(&self) -> usize {
        self.buffer_index
    }

    /// True until the first present after creation has completed.
    pub fn is_warming_up(&self) -> bool {
        self.frameskip > 0
    }

    pub(crate) fn frame_slots(&self) -> FrameSlots {
        if !self.config.buffering.is_multi() || self.frameskip > 0 {
            return FrameSlots { fill: 0, draw: 0 };
        }
        let generations = self.config.buffering.generations();
        FrameSlots {
            fill: (self.buffer_index + 1) % generations,
            draw: self.buffer_index,
        }
    }

    /// Pick the bucket for the next `texture` sprite.
    ///
    /// `hint` is a bucket the caller last wrote this texture to; it is used
    /// when it still has room, otherwise the array is scanned for the first
    /// bucket with this texture and room, or the first free bucket.
    pub(crate) fn find_bucket(
        &self,
        texture: TextureHandle,
        hint: Option<usize>,
    ) -> RenderResult<usize> {
        if let Some(index) = hint {
            if let Some(bucket) = self.buckets.get(index) {
                if bucket.texture() == Some(texture) && !bucket.is_full() {
                    return Ok(index);
                }
            }
        }
        self.buckets
            .iter()
            .position(|bucket| bucket.accepts(texture))
            .ok_or_else(|| {
                log::warn!(
                    "batch {}: no bucket left for texture {}",
                    self.id.0,
                    texture.index()
                );
                RenderError::CapacityExceeded {
                    texture,
                    max_buckets: self.config.max_buckets,
                    max_sprites_per_bucket: self.config.max_sprites_per_bucket,
                }
            })
    }

    pub(crate) fn push(&mut self, bucket: usize, texture: TextureHandle, quad: &Quad) {
        self.buckets[bucket].push(texture, quad);
    }

    /// Upload live buckets into the fill generation and draw the draw
    /// generation. Buckets are reset only after the submit succeeds; on
    /// error the caller discards the recorded draws and the sprites stay.
    pub(crate) fn flush(&mut self, backend: &mut B, state: &DrawState<'_, B>) -> RenderResult<FrameStats> {
        let slots = self.frame_slots();
        let live = self.buckets.iter().take_while(|b| !b.is_free()).count();
        let extent = live
            .max(self.ring_extent[slots.fill])
            .max(self.ring_extent[slots.draw]);
        let mut stats = FrameStats::default();

        for bucket in &self.buckets[..live] {
            let bytes: &[u8] = bytemuck::cast_slice(bucket.live_vertices());
            backend.upload(&bucket.ring[slots.fill].buffer, 0, bytes)?;
            stats.record_upload(bytes.len());
        }

        for bucket in &mut self.buckets[..extent] {
            bucket.record_fill(slots.fill);
        }
        self.ring_extent[slots.fill] = live;

        for bucket in &self.buckets[..extent] {
            let generation = &bucket.ring[slots.draw];
            let Some((texture, count)) = generation.drawable() else {
                continue;
            };
            backend.draw(DrawCall {
                vertices: &generation.buffer,
                indices: &self.indices,
                texture,
                index_count: (count * INDICES_PER_QUAD) as u32,
                transform: state.transform,
                shader: state.shader,
                blend: state.blend,
            })?;
            stats.record_draw();
        }

        if stats.draw_calls > 0 {
            backend.submit()?;
            stats.record_submit();
        }

        for bucket in &mut self.buckets[..live] {
            bucket.reset();
        }

        log::trace!(
            "batch {} flush: fill {} draw {}, {} live buckets, {} draws",
            self.id.0,
            slots.fill,
            slots.draw,
            live,
            stats.draw_calls
        );
        Ok(stats)
    }

    /// Rotation bookkeeping after a successful flush.
    pub(crate) fn advance(&mut self) {
        if self.config.buffering.is_multi() && self.frameskip == 0 {
            self.buffer_index = (self.buffer_index + 1) % self.config.buffering.generations();
        }
        self.frameskip = self.frameskip.saturating_sub(1);
    }
}
