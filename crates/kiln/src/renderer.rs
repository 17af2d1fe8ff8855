//! # Renderer — The Context Every Draw Goes Through
//!
//! [`Renderer`] owns the graphics backend and every piece of cross-call
//! state the batching engine needs: the pixel projection, the current
//! shader and blend mode, the last-touched bucket cache, frame statistics,
//! and the single-slot last error.
//!
//! ```text
//!  draw(batch, tex, params)
//!        │ build_quad
//!        ▼
//!  lower_draw(batch, tex, quad) ──▶ cache hit? ──▶ bucket[i]
//!        │                      └─ scan ───────▶ bucket[j] / CapacityExceeded
//!        ▼
//!  present(batch) ──▶ flush: upload fill gen, draw draw gen, submit
//!                     advance ring
//! ```
//!
//! ## Last-Touched Cache
//!
//! Consecutive draws of one texture into one batch skip the bucket scan by
//! remembering `(batch, bucket, texture)`. The cache is cleared by every
//! flush and replaced when a different batch is touched. It picks the same
//! bucket the scan would, so results never depend on it.
//!
//! ## Last Error
//!
//! Every fallible call stores its error message in [`last_error`] on
//! failure and clears it on success.
//!
//! [`last_error`]: Renderer::last_error

use std::sync::atomic::{AtomicU64, Ordering};

use crate::backend::{DrawCall, GraphicsBackend};
use crate::batch::{BatchId, DrawState, SpriteBatch};
use crate::blend::BlendMode;
use crate::config::BatchConfig;
use crate::error::{RenderError, RenderResult};
use crate::math::{Mat4, pixel_projection};
use crate::static_batch::StaticBatch;
use crate::stats::FrameStats;
use crate::texture::{Texture, TextureHandle};
use crate::transform::{DrawParams, build_quad};
use crate::vertex::{INDICES_PER_QUAD, Quad, QUAD_INDICES, Vertex};

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(0);

/// Where the last accepted sprite went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrawCache {
    pub batch: BatchId,
    pub bucket: usize,
    pub texture: TextureHandle,
}

/// Renderer context: the backend plus all state shared between calls.
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    viewport: Option<(u32, u32)>,
    projection: Option<Mat4>,
    cache: Option<DrawCache>,
    shader: Option<B::Shader>,
    blend: BlendMode,
    last_error: Option<String>,
    stats: FrameStats,
    immediate_indices: Option<B::Buffer>,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            viewport: None,
            projection: None,
            cache: None,
            shader: None,
            blend: BlendMode::default(),
            last_error: None,
            stats: FrameStats::default(),
            immediate_indices: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Message of the most recent failed call, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Return the counters gathered so far and start over.
    pub fn take_stats(&mut self) -> FrameStats {
        std::mem::take(&mut self.stats)
    }

    fn track<T>(&mut self, result: RenderResult<T>) -> RenderResult<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.to_string()),
        }
        result
    }

    // ── Viewport, shader, blend ─────────────────────────────────────────

    /// Set the target size in pixels. Coordinates map `(0, 0)` to the
    /// top-left and `(width, height)` to the bottom-right.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let result = if width == 0 || height == 0 {
            Err(RenderError::invalid(format!(
                "viewport must be non-empty, got {width}x{height}"
            )))
        } else {
            self.viewport = Some((width, height));
            self.projection = Some(pixel_projection(width, height));
            Ok(())
        };
        self.track(result)
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    fn projection(&self) -> RenderResult<Mat4> {
        self.projection
            .ok_or_else(|| RenderError::NotInitialized("viewport has not been set".into()))
    }

    /// Compile a shader program through the backend.
    pub fn compile_shader(&mut self, label: &str, source: &str) -> RenderResult<B::Shader> {
        let result = self.backend.compile_shader(label, source);
        if let Err(e) = &result {
            log::warn!("shader '{label}' failed to compile: {e}");
        }
        self.track(result)
    }

    /// Draw with `shader` from now on; `None` restores the default sprite
    /// shader. Returns the previously active shader.
    pub fn use_shader(&mut self, shader: Option<B::Shader>) -> Option<B::Shader> {
        std::mem::replace(&mut self.shader, shader)
    }

    pub fn shader(&self) -> Option<&B::Shader> {
        self.shader.as_ref()
    }

    pub fn set_blend_mode(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    // ── Dynamic batches ─────────────────────────────────────────────────

    pub fn create_batch(&mut self, config: BatchConfig) -> RenderResult<SpriteBatch<B>> {
        let id = BatchId(NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed));
        let result = SpriteBatch::new(&mut self.backend, id, config);
        self.track(result)
    }

    /// Transform a sprite and add it to `batch`.
    pub fn draw(
        &mut self,
        batch: &mut SpriteBatch<B>,
        texture: &Texture,
        params: &DrawParams,
    ) -> RenderResult<()> {
        let quad = build_quad(texture, params);
        self.lower_draw(batch, texture.handle, &quad)
    }

    /// Add a pre-built quad to `batch`. Fails with `CapacityExceeded`,
    /// leaving the batch untouched, when no bucket can take it.
    pub fn lower_draw(
        &mut self,
        batch: &mut SpriteBatch<B>,
        texture: TextureHandle,
        quad: &Quad,
    ) -> RenderResult<()> {
        let result = self.place(batch, texture, quad);
        self.track(result)
    }

    fn place(
        &mut self,
        batch: &mut SpriteBatch<B>,
        texture: TextureHandle,
        quad: &Quad,
    ) -> RenderResult<()> {
        if self.cache.is_some_and(|c| c.batch != batch.id()) {
            self.cache = None;
        }
        let hint = self
            .cache
            .filter(|c| c.texture == texture)
            .map(|c| c.bucket);
        let bucket = batch.find_bucket(texture, hint)?;
        batch.push(bucket, texture, quad);
        self.cache = Some(DrawCache {
            batch: batch.id(),
            bucket,
            texture,
        });
        self.stats.record_sprite();
        Ok(())
    }

    /// Upload and draw `batch` without rotating its buffer ring.
    ///
    /// With double or triple buffering call [`present`](Self::present)
    /// once per frame instead; a second flush in the same frame overwrites
    /// the generation the first one filled.
    pub fn flush(&mut self, batch: &mut SpriteBatch<B>) -> RenderResult<()> {
        let result = self.flush_batch(batch);
        self.track(result)
    }

    /// Flush `batch` and advance its buffer ring.
    pub fn present(&mut self, batch: &mut SpriteBatch<B>) -> RenderResult<()> {
        let result = self.flush_batch(batch).map(|()| batch.advance());
        self.track(result)
    }

    fn flush_batch(&mut self, batch: &mut SpriteBatch<B>) -> RenderResult<()> {
        self.cache = None;
        let projection = self.projection()?;
        let state = DrawState {
            transform: projection,
            shader: self.shader.as_ref(),
            blend: self.blend,
        };
        match batch.flush(&mut self.backend, &state) {
            Ok(frame) => {
                self.stats.merge(frame);
                Ok(())
            }
            Err(e) => {
                self.backend.discard();
                Err(e)
            }
        }
    }

    // ── Static batches ──────────────────────────────────────────────────

    pub fn create_static(&mut self, texture: &Texture, capacity: usize) -> RenderResult<StaticBatch<B>> {
        let result = StaticBatch::new(&mut self.backend, *texture, capacity);
        self.track(result)
    }

    /// Transform a sprite and add it to `batch` using the batch's texture.
    pub fn draw_static(&mut self, batch: &mut StaticBatch<B>, params: &DrawParams) -> RenderResult<()> {
        let quad = build_quad(batch.texture(), params);
        self.lower_draw_static(batch, &quad)
    }

    pub fn lower_draw_static(&mut self, batch: &mut StaticBatch<B>, quad: &Quad) -> RenderResult<()> {
        let result = batch.push(quad);
        if result.is_ok() {
            self.stats.record_sprite();
        }
        self.track(result)
    }

    /// Bake `batch` on its first present, then draw it with
    /// `projection × transform`. `None` is the identity transform.
    pub fn present_static(
        &mut self,
        batch: &mut StaticBatch<B>,
        transform: Option<&Mat4>,
    ) -> RenderResult<()> {
        let result = self.present_static_inner(batch, transform);
        self.track(result)
    }

    fn present_static_inner(
        &mut self,
        batch: &mut StaticBatch<B>,
        transform: Option<&Mat4>,
    ) -> RenderResult<()> {
        let projection = self.projection()?;
        let model = transform.copied().unwrap_or(Mat4::IDENTITY);
        let state = DrawState {
            transform: projection * model,
            shader: self.shader.as_ref(),
            blend: self.blend,
        };
        match batch.present(&mut self.backend, &state) {
            Ok(frame) => {
                self.stats.merge(frame);
                Ok(())
            }
            Err(e) => {
                self.backend.discard();
                Err(e)
            }
        }
    }

    // ── Immediate path ──────────────────────────────────────────────────

    /// Draw one sprite right now through a throwaway buffer.
    pub fn draw_immediate(&mut self, texture: &Texture, params: &DrawParams) -> RenderResult<()> {
        let quad = build_quad(texture, params);
        self.lower_draw_immediate(texture.handle, &quad)
    }

    pub fn lower_draw_immediate(&mut self, texture: TextureHandle, quad: &Quad) -> RenderResult<()> {
        let result = self.immediate(texture, quad);
        if result.is_err() {
            self.backend.discard();
        }
        self.track(result)
    }

    fn immediate(&mut self, texture: TextureHandle, quad: &Quad) -> RenderResult<()> {
        let projection = self.projection()?;
        if self.immediate_indices.is_none() {
            let indices = self
                .backend
                .create_index_buffer("kiln immediate indices", &QUAD_INDICES)?;
            self.immediate_indices = Some(indices);
        }

        let bytes: &[u8] = bytemuck::cast_slice(&quad.vertices);
        let vertices = self
            .backend
            .create_vertex_buffer("kiln immediate", 4 * Vertex::SIZE)?;
        self.backend.upload(&vertices, 0, bytes)?;

        let Some(indices) = self.immediate_indices.as_ref() else {
            return Err(RenderError::NotInitialized("immediate index buffer".into()));
        };
        self.backend.draw(DrawCall {
            vertices: &vertices,
            indices,
            texture,
            index_count: INDICES_PER_QUAD as u32,
            transform: projection,
            shader: self.shader.as_ref(),
            blend: self.blend,
        })?;
        self.backend.submit()?;

        self.stats.record_upload(bytes.len());
        self.stats.record_sprite();
        self.stats.record_draw();
        self.stats.record_submit();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> Option<DrawCache> {
        self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Buffering;
    use crate::error::ErrorKind;
    use crate::math::{Color, Flip, Vec2};
    use crate::testing::{Event, RecordingBackend};

    fn tex(id: u32) -> Texture {
        Texture::new(TextureHandle::new(id), 32, 32)
    }

    fn renderer() -> Renderer<RecordingBackend> {
        let mut r = Renderer::new(RecordingBackend::new());
        r.set_viewport(640, 480).unwrap();
        r
    }

    fn sprite(x: f32) -> DrawParams {
        DrawParams::at(Vec2::new(x, 0.0))
    }

    #[test]
    fn same_texture_draws_share_one_bucket() {
        let mut r = renderer();
        let mut batch = r.create_batch(BatchConfig::new(4, 100)).unwrap();
        for i in 0..100 {
            r.draw(&mut batch, &tex(1), &sprite(i as f32)).unwrap();
        }
        assert_eq!(batch.bucket_sprite_counts(), vec![100, 0, 0, 0]);
        assert_eq!(r.stats().sprites, 100);
    }

    #[test]
    fn overflow_fails_without_touching_buckets() {
        let mut r = renderer();
        let mut batch = r.create_batch(BatchConfig::new(3, 5)).unwrap();
        for t in 1..=3 {
            for _ in 0..5 {
                r.draw(&mut batch, &tex(t), &sprite(0.0)).unwrap();
            }
        }
        let before = batch.bucket_sprite_counts();

        let err = r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        let err = r.draw(&mut batch, &tex(9), &sprite(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(batch.bucket_sprite_counts(), before);
        assert_eq!(r.stats().sprites, 15);
    }

    #[test]
    fn retry_after_present_succeeds() {
        let mut r = renderer();
        let mut batch = r.create_batch(BatchConfig::new(1, 1)).unwrap();
        r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap();
        assert!(r.draw(&mut batch, &tex(1), &sprite(1.0)).is_err());
        r.present(&mut batch).unwrap();
        r.draw(&mut batch, &tex(1), &sprite(1.0)).unwrap();
        assert_eq!(batch.sprite_count(), 1);
    }

    #[test]
    fn last_error_is_set_on_failure_and_cleared_on_success() {
        let mut r = renderer();
        let mut batch = r.create_batch(BatchConfig::new(1, 1)).unwrap();
        assert_eq!(r.last_error(), None);

        r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap();
        r.draw(&mut batch, &tex(2), &sprite(0.0)).unwrap_err();
        let message = r.last_error().unwrap();
        assert!(message.contains("texture 2"), "{message}");

        r.present(&mut batch).unwrap();
        assert_eq!(r.last_error(), None);
    }

    #[test]
    fn empty_present_twice_does_nothing() {
        let mut r = renderer();
        let mut batch = r.create_batch(BatchConfig::default()).unwrap();
        r.backend_mut().clear_events();
        r.present(&mut batch).unwrap();
        r.present(&mut batch).unwrap();
        assert!(r.backend().events.is_empty());
        assert_eq!(r.last_error(), None);
    }

    #[test]
    fn present_before_viewport_is_not_initialized() {
        let mut r = Renderer::new(RecordingBackend::new());
        let mut batch = r.create_batch(BatchConfig::new(1, 4)).unwrap();
        r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap();

        let err = r.present(&mut batch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert_eq!(batch.sprite_count(), 1);
        assert!(batch.is_warming_up());

        let err = r.draw_immediate(&tex(1), &sprite(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);

        let mut stat = r.create_static(&tex(1), 4).unwrap();
        let err = r.present_static(&mut stat, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert!(!stat.is_uploaded());
    }

    #[test]
    fn empty_viewport_is_invalid() {
        let mut r = Renderer::new(RecordingBackend::new());
        let err = r.set_viewport(0, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert_eq!(r.viewport(), None);
    }

    #[test]
    fn cache_remembers_last_bucket_until_flush() {
        let mut r = renderer();
        let mut batch = r.create_batch(BatchConfig::new(4, 8)).unwrap();
        r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap();
        r.draw(&mut batch, &tex(2), &sprite(0.0)).unwrap();
        assert_eq!(
            r.cache(),
            Some(DrawCache {
                batch: batch.id(),
                bucket: 1,
                texture: TextureHandle::new(2)
            })
        );

        r.present(&mut batch).unwrap();
        assert_eq!(r.cache(), None);
    }

    #[test]
    fn touching_another_batch_replaces_cache() {
        let mut r = renderer();
        let mut a = r.create_batch(BatchConfig::new(2, 8)).unwrap();
        let mut b = r.create_batch(BatchConfig::new(2, 8)).unwrap();
        assert_ne!(a.id(), b.id());

        r.draw(&mut a, &tex(1), &sprite(0.0)).unwrap();
        r.draw(&mut a, &tex(2), &sprite(0.0)).unwrap();
        r.draw(&mut b, &tex(2), &sprite(0.0)).unwrap();

        assert_eq!(b.bucket_sprite_counts(), vec![1, 0]);
        assert_eq!(r.cache().map(|c| (c.batch, c.bucket)), Some((b.id(), 0)));
        assert_eq!(a.bucket_sprite_counts(), vec![1, 1]);
    }

    #[test]
    fn cached_and_scanned_placement_agree() {
        let sequence = [1, 1, 2, 1, 1, 3, 2, 2, 1, 1, 1];

        let mut cached = renderer();
        let mut a = cached.create_batch(BatchConfig::new(8, 2)).unwrap();
        for t in sequence {
            cached.draw(&mut a, &tex(t), &sprite(0.0)).unwrap();
        }

        let mut scanned = renderer();
        let mut b = scanned.create_batch(BatchConfig::new(8, 2)).unwrap();
        for t in sequence {
            scanned.cache = None;
            scanned.draw(&mut b, &tex(t), &sprite(0.0)).unwrap();
        }

        assert_eq!(a.bucket_textures(), b.bucket_textures());
        assert_eq!(a.bucket_sprite_counts(), b.bucket_sprite_counts());
    }

    #[test]
    fn present_draws_buckets_in_first_touch_order() {
        let mut r = renderer();
        let mut batch = r
            .create_batch(BatchConfig::new(4, 8).buffering(Buffering::Single))
            .unwrap();
        r.draw(&mut batch, &tex(5), &sprite(0.0)).unwrap();
        r.draw(&mut batch, &tex(3), &sprite(0.0)).unwrap();
        r.draw(&mut batch, &tex(5), &sprite(32.0)).unwrap();
        r.present(&mut batch).unwrap();

        let draws = r.backend().last_submit().to_vec();
        let order: Vec<u32> = draws.iter().map(|d| d.texture.index()).collect();
        assert_eq!(order, vec![5, 3]);
        assert_eq!(draws[0].index_count, 12);
        assert_eq!(draws[0].vertices[4].position, [32.0, 0.0]);
        assert_eq!(draws[0].transform, pixel_projection(640, 480));
    }

    #[test]
    fn failed_flush_discards_and_keeps_sprites() {
        let mut r = renderer();
        let mut batch = r
            .create_batch(BatchConfig::new(2, 8).buffering(Buffering::Single))
            .unwrap();
        r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap();
        r.draw(&mut batch, &tex(2), &sprite(0.0)).unwrap();

        r.backend_mut().fail_draws = true;
        let err = r.present(&mut batch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GraphicsBackend);
        assert!(r.backend().submitted.is_empty());
        assert_eq!(r.backend().events.last(), Some(&Event::Discard));
        assert_eq!(batch.sprite_count(), 2);
        assert!(batch.is_warming_up());

        r.backend_mut().fail_draws = false;
        r.present(&mut batch).unwrap();
        assert_eq!(r.backend().last_submit().len(), 2);
    }

    #[test]
    fn static_batch_uploads_once_and_redraws_identical_geometry() {
        let mut r = renderer();
        let mut background = r.create_static(&tex(7), 16).unwrap();
        for i in 0..4 {
            r.draw_static(&mut background, &sprite(i as f32 * 32.0)).unwrap();
        }
        r.backend_mut().clear_events();

        r.present_static(&mut background, None).unwrap();
        assert_eq!(r.backend().upload_count(), 1);
        let first = r.backend().last_submit().to_vec();

        r.present_static(&mut background, None).unwrap();
        assert_eq!(r.backend().upload_count(), 1);
        let second = r.backend().last_submit().to_vec();

        assert_eq!(first, second);
        assert_eq!(first[0].index_count, 24);
        assert_eq!(first[0].texture, TextureHandle::new(7));
    }

    #[test]
    fn static_transform_multiplies_projection() {
        let mut r = renderer();
        let mut stat = r.create_static(&tex(1), 1).unwrap();
        r.draw_static(&mut stat, &sprite(0.0)).unwrap();
        let camera = Mat4::from_translation(glam::Vec3::new(-10.0, 5.0, 0.0));
        r.present_static(&mut stat, Some(&camera)).unwrap();
        assert_eq!(
            r.backend().last_submit()[0].transform,
            pixel_projection(640, 480) * camera
        );
    }

    #[test]
    fn baked_static_rejects_more_sprites() {
        let mut r = renderer();
        let mut stat = r.create_static(&tex(1), 4).unwrap();
        r.present_static(&mut stat, None).unwrap();
        let err = r.draw_static(&mut stat, &sprite(0.0)).unwrap_err();
        assert_eq!(err, RenderError::AlreadyBaked);
        assert!(r.last_error().is_some());
    }

    #[test]
    fn immediate_draw_uses_a_throwaway_buffer() {
        let mut r = renderer();
        let red = DrawParams::at(Vec2::new(5.0, 6.0))
            .color(Color::RED)
            .flip(Flip::Horizontal);
        r.draw_immediate(&tex(3), &red).unwrap();
        r.draw_immediate(&tex(3), &red).unwrap();

        let draws = r.backend().submitted_draws();
        assert_eq!(r.backend().submitted.len(), 2);
        assert_eq!(draws[0].index_count, 6);
        assert_eq!(draws[0].vertices[0].color, Color::RED.to_array());
        assert_eq!(draws[0].vertices[0].uv, [1.0, 0.0]);
        assert_ne!(draws[0].vertex_buffer, draws[1].vertex_buffer);
        assert_eq!(draws[0].index_buffer, draws[1].index_buffer);
        // only the shared index buffer survives
        assert_eq!(r.backend().live_buffers(), 1);
    }

    #[test]
    fn immediate_failure_releases_its_buffer() {
        let mut r = renderer();
        r.backend_mut().fail_uploads = true;
        let err = r.draw_immediate(&tex(1), &sprite(0.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GraphicsBackend);
        assert_eq!(r.backend().live_buffers(), 1);
        assert!(r.last_error().is_some());
    }

    #[test]
    fn shader_and_blend_are_carried_by_draws() {
        let mut r = renderer();
        let shader = r.compile_shader("glow", "// source").unwrap();
        let id = shader.id;
        assert!(r.use_shader(Some(shader)).is_none());
        r.set_blend_mode(BlendMode::Additive);
        r.draw_immediate(&tex(1), &sprite(0.0)).unwrap();

        let draw = &r.backend().last_submit()[0];
        assert_eq!(draw.shader, Some(id));
        assert_eq!(draw.blend, BlendMode::Additive);

        let previous = r.use_shader(None);
        assert_eq!(previous.map(|s| s.id), Some(id));
        r.draw_immediate(&tex(1), &sprite(0.0)).unwrap();
        assert_eq!(r.backend().last_submit()[0].shader, None);
    }

    #[test]
    fn shader_compile_failure_is_reported() {
        let mut r = renderer();
        r.backend_mut().fail_shaders = true;
        let err = r.compile_shader("broken", "fn").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::GraphicsBackend);
        assert!(r.last_error().is_some());
        assert!(r.shader().is_none());
    }

    #[test]
    fn take_stats_resets_counters() {
        let mut r = renderer();
        let mut batch = r
            .create_batch(BatchConfig::new(2, 4).buffering(Buffering::Single))
            .unwrap();
        r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap();
        r.draw(&mut batch, &tex(2), &sprite(0.0)).unwrap();
        r.present(&mut batch).unwrap();

        let stats = r.take_stats();
        assert_eq!(stats.sprites, 2);
        assert_eq!(stats.uploads, 2);
        assert_eq!(stats.uploaded_bytes, 2 * 4 * Vertex::SIZE);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.submits, 1);
        assert_eq!(*r.stats(), FrameStats::default());
    }

    #[test]
    fn long_running_stats_do_not_overflow() {
        let mut r = renderer();
        let mut batch = r.create_batch(BatchConfig::new(1, 4)).unwrap();
        r.stats.sprites = u64::MAX;
        r.stats.draw_calls = u64::MAX;
        r.draw(&mut batch, &tex(1), &sprite(0.0)).unwrap();
        r.present(&mut batch).unwrap();
        r.draw_immediate(&tex(1), &sprite(0.0)).unwrap();
        assert_eq!(r.stats().sprites, u64::MAX);
        assert_eq!(r.stats().draw_calls, u64::MAX);
    }

    #[test]
    fn dropping_batches_releases_their_buffers() {
        let mut r = renderer();
        let batch = r.create_batch(BatchConfig::new(3, 4)).unwrap();
        let stat = r.create_static(&tex(1), 4).unwrap();
        assert_eq!(r.backend().live_buffers(), 3 * 3 + 1 + 2);
        drop(batch);
        drop(stat);
        assert_eq!(r.backend().live_buffers(), 0);
    }
}
