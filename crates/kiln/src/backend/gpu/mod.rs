//! # wgpu Backend — Sprite Batches on a Real GPU
//!
//! [`WgpuBackend`] implements [`GraphicsBackend`] on top of a
//! `wgpu::Device` and `wgpu::Queue`, and adds what a game needs around the
//! batching core: textures, samplers, render targets, and a clear color.
//!
//! ## One Submit, One Render Pass
//!
//! ```text
//! upload()  ──▶ queue.write_buffer        (staged, runs before next submit)
//! draw()    ──▶ pending: pipeline, buffers, transform + texture bind groups
//! submit()  ──▶ encoder
//!                 └─ render pass on target (Clear if clear() was called,
//!                    else Load), every pending draw in order
//!               queue.submit
//! ```
//!
//! Each draw gets its own small uniform buffer holding its transform, so a
//! static batch drawn with a camera matrix and a dynamic batch drawn with
//! the plain projection can share one frame.
//!
//! ## Targets
//!
//! Draws land on the view set with [`set_target`](WgpuBackend::set_target):
//! normally the swapchain frame, or a [`RenderTarget`] created with
//! [`create_render_target`](WgpuBackend::create_render_target), whose
//! texture can then be drawn as a sprite itself.
//!
//! ## Errors
//!
//! Buffer sizes are checked against the device's `max_buffer_size` first,
//! then allocation runs inside out-of-memory and validation error scopes.
//! Shader and pipeline creation run inside a validation error scope. A
//! failure comes back as [`RenderError::GraphicsBackend`] and the partially
//! created object is dropped.

mod pipeline;
mod texture;

use std::path::Path;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::backend::{DrawCall, GraphicsBackend};
use crate::blend::BlendMode;
use crate::error::{RenderError, RenderResult};
use crate::math::Color;
use crate::texture::{Texture, TextureHandle};

use pipeline::SpritePipelines;
use texture::{TextureStore, validate_rgba};

pub use texture::{Filter, Sampling, Wrap};

/// A GPU buffer; dropping it releases the buffer once no pending draw uses it.
#[derive(Debug)]
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
}

impl GpuBuffer {
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// A compiled sprite shader. Dropping it releases the pipelines built
/// from it on the backend's next pipeline lookup.
#[derive(Debug)]
pub struct GpuShader {
    pub(crate) id: u64,
    pub(crate) module: wgpu::ShaderModule,
    pub(crate) alive: Arc<()>,
}

/// An offscreen color target that can also be drawn as a texture.
pub struct RenderTarget {
    pub texture: Texture,
    pub view: wgpu::TextureView,
}

struct PendingDraw {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
    transform: wgpu::BindGroup,
    texture: wgpu::BindGroup,
}

/// [`GraphicsBackend`] implementation on wgpu.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    pipelines: SpritePipelines,
    textures: TextureStore,
    target: Option<wgpu::TextureView>,
    clear: Option<Color>,
    pending: Vec<PendingDraw>,
    next_shader_id: u64,
}

impl WgpuBackend {
    /// Wrap an existing device. `format` is the format of every target the
    /// backend will draw to.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let pipelines = SpritePipelines::new(&device, format);
        Self {
            device,
            queue,
            format,
            pipelines,
            textures: TextureStore::default(),
            target: None,
            clear: None,
            pending: Vec::new(),
            next_shader_id: 0,
        }
    }

    /// Create a device without a window, drawing to RGBA8 sRGB targets.
    pub fn headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::backend(format!("no suitable GPU adapter: {e}")))?;
        log::info!("kiln using adapter {}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("kiln device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))
        .map_err(|e| RenderError::backend(format!("device request failed: {e}")))?;

        Ok(Self::new(device, queue, wgpu::TextureFormat::Rgba8UnormSrgb))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Draw subsequent submits into `view`; `None` detaches the target.
    pub fn set_target(&mut self, view: Option<wgpu::TextureView>) {
        self.target = view;
    }

    /// Clear the target to `color` at the start of the next submit.
    pub fn clear(&mut self, color: Color) {
        self.clear = Some(color);
    }

    // ── Textures ────────────────────────────────────────────────────────

    /// Upload RGBA8 pixels as a new sprite texture.
    pub fn create_texture_from_rgba(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> RenderResult<Texture> {
        validate_rgba(width, height, data)?;
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );
        Ok(self
            .textures
            .insert(&self.device, &self.pipelines.texture_layout, label, texture))
    }

    /// Decode an image file and upload it. Loading the same path twice
    /// returns the same texture.
    pub fn load_texture(&mut self, path: impl AsRef<Path>) -> RenderResult<Texture> {
        let path = path.as_ref();
        if let Some(texture) = self.textures.cached(path) {
            return Ok(texture);
        }
        let image = image::open(path)
            .map_err(|e| RenderError::invalid(format!("texture '{}': {e}", path.display())))?;
        let label = path.display().to_string();
        let texture = self.upload_image(&label, image)?;
        self.textures.remember(path, texture);
        Ok(texture)
    }

    /// Decode an encoded image (PNG or JPEG) held in memory and upload it.
    pub fn load_texture_from_memory(&mut self, label: &str, bytes: &[u8]) -> RenderResult<Texture> {
        let image = decode_image(label, bytes)?;
        self.upload_image(label, image)
    }

    fn upload_image(&mut self, label: &str, image: image::DynamicImage) -> RenderResult<Texture> {
        let image = image.to_rgba8();
        let (width, height) = image.dimensions();
        let texture = self.create_texture_from_rgba(label, width, height, image.as_raw())?;
        log::debug!("loaded texture '{label}' ({width}x{height})");
        Ok(texture)
    }

    /// Release a texture and forget any path it was loaded from. Drawing
    /// with the handle afterwards is an `InvalidParameter` error until the
    /// slot is reused.
    pub fn free_texture(&mut self, texture: TextureHandle) -> RenderResult<()> {
        self.textures.remove(texture)?;
        log::debug!("freed texture {}", texture.index());
        Ok(())
    }

    /// Number of live textures, render targets included.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn set_sampling(&mut self, texture: TextureHandle, sampling: Sampling) -> RenderResult<()> {
        self.textures
            .set_sampling(&self.device, &self.pipelines.texture_layout, texture, sampling)
    }

    /// Create an offscreen target in the backend's format.
    pub fn create_render_target(&mut self, width: u32, height: u32) -> RenderResult<RenderTarget> {
        if width == 0 || height == 0 {
            return Err(RenderError::invalid(format!(
                "render target must be non-empty, got {width}x{height}"
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("kiln render target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let texture = self.textures.insert(
            &self.device,
            &self.pipelines.texture_layout,
            "kiln render target",
            texture,
        );
        Ok(RenderTarget { texture, view })
    }

    /// Release a render target's texture. Detach it with `set_target(None)`
    /// first if it is the current target.
    pub fn destroy_render_target(&mut self, target: RenderTarget) -> RenderResult<()> {
        self.free_texture(target.texture.handle)
    }

    /// Copy a texture back to the CPU, for screenshots and output checks.
    pub fn read_pixels(&self, texture: TextureHandle) -> RenderResult<image::RgbaImage> {
        let entry = self.textures.get(texture)?;
        let (width, height) = (entry.width, entry.height);
        let unpadded = width * 4;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kiln readback"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kiln readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            entry.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| RenderError::backend(format!("readback wait: {e}")))?;
        rx.recv()
            .map_err(|e| RenderError::backend(format!("readback: {e}")))?
            .map_err(|e| RenderError::backend(format!("readback map: {e}")))?;

        let mut pixels = Vec::with_capacity(unpadded as usize * height as usize);
        {
            let data = slice.get_mapped_range();
            for row in 0..height as usize {
                let start = row * padded as usize;
                pixels.extend_from_slice(&data[start..start + unpadded as usize]);
            }
        }
        readback.unmap();

        let format = entry.texture.format();
        if matches!(
            format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        ) {
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::backend("readback size mismatch"))
    }

    /// Run `create` with out-of-memory and validation errors captured.
    fn allocation_scope<T>(
        &self,
        label: &str,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> RenderResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(err) => Err(RenderError::backend(format!("buffer '{label}': {err}"))),
            None => Ok(value),
        }
    }

    // ── Shaders ─────────────────────────────────────────────────────────

    /// Drop a custom shader and evict its pipelines now rather than on the
    /// next lookup.
    pub fn release_shader(&mut self, shader: GpuShader) {
        self.pipelines.forget(shader.id);
    }
}

fn decode_image(label: &str, bytes: &[u8]) -> RenderResult<image::DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| RenderError::invalid(format!("texture '{label}': {e}")))
}

/// Reject buffers the device cannot create before wgpu sees them.
fn check_buffer_size(label: &str, size: u64, max: u64) -> RenderResult<()> {
    if size > max {
        return Err(RenderError::backend(format!(
            "buffer '{label}' needs {size} bytes, device allows {max}"
        )));
    }
    Ok(())
}

impl GraphicsBackend for WgpuBackend {
    type Buffer = GpuBuffer;
    type Shader = GpuShader;

    fn create_vertex_buffer(&mut self, label: &str, size: u64) -> RenderResult<GpuBuffer> {
        check_buffer_size(label, size, self.device.limits().max_buffer_size)?;
        let buffer = self.allocation_scope(label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;
        Ok(GpuBuffer { buffer })
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> RenderResult<GpuBuffer> {
        let size = std::mem::size_of_val(indices) as u64;
        check_buffer_size(label, size, self.device.limits().max_buffer_size)?;
        let buffer = self.allocation_scope(label, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        })?;
        Ok(GpuBuffer { buffer })
    }

    fn upload(&mut self, buffer: &GpuBuffer, offset: u64, bytes: &[u8]) -> RenderResult<()> {
        let end = offset + bytes.len() as u64;
        if end > buffer.buffer.size() {
            return Err(RenderError::invalid(format!(
                "upload of {} bytes at {offset} overruns {}-byte buffer",
                bytes.len(),
                buffer.buffer.size()
            )));
        }
        self.queue.write_buffer(&buffer.buffer, offset, bytes);
        Ok(())
    }

    fn draw(&mut self, call: DrawCall<'_, Self>) -> RenderResult<()> {
        let texture = self.textures.get(call.texture)?.bind_group.clone();
        let pipeline = self.pipelines.get(&self.device, call.shader, call.blend)?;

        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("kiln draw transform"),
                contents: bytemuck::cast_slice(&call.transform.to_cols_array()),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let transform = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kiln draw transform"),
            layout: &self.pipelines.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });

        self.pending.push(PendingDraw {
            pipeline,
            vertices: call.vertices.buffer.clone(),
            indices: call.indices.buffer.clone(),
            index_count: call.index_count,
            transform,
            texture,
        });
        Ok(())
    }

    fn submit(&mut self) -> RenderResult<()> {
        if self.pending.is_empty() && self.clear.is_none() {
            return Ok(());
        }
        let Some(view) = self.target.as_ref() else {
            self.pending.clear();
            return Err(RenderError::NotInitialized("no render target set".into()));
        };
        let load = match self.clear.take() {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c.r as f64,
                g: c.g as f64,
                b: c.b as f64,
                a: c.a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kiln sprite encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("kiln sprite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &self.pending {
                pass.set_pipeline(&draw.pipeline);
                pass.set_bind_group(0, &draw.transform, &[]);
                pass.set_bind_group(1, &draw.texture, &[]);
                pass.set_vertex_buffer(0, draw.vertices.slice(..));
                pass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        self.pending.clear();
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }

    fn compile_shader(&mut self, label: &str, source: &str) -> RenderResult<GpuShader> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let candidate = self.pipelines.build(&self.device, &module, BlendMode::Normal);
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::backend(format!("shader '{label}': {err}")));
        }

        let id = self.next_shader_id;
        self.next_shader_id += 1;
        let shader = GpuShader {
            id,
            module,
            alive: Arc::new(()),
        };
        self.pipelines.insert(&shader, BlendMode::Normal, candidate);
        log::debug!("compiled shader '{label}' as {id}");
        Ok(shader)
    }
}
