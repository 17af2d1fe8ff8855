//! # Backend — The Graphics Pipeline Seam
//!
//! The batching core decides *what* to upload and draw; a
//! [`GraphicsBackend`] decides *how*. The core only ever asks for five
//! things: create a buffer, upload bytes into it, record an indexed draw,
//! submit the recorded draws, and compile a shader.
//!
//! ## Resource Lifetime
//!
//! `Buffer` and `Shader` are associated types whose `Drop` releases the GPU
//! object. Anything a backend caches per shader must not keep the shader
//! alive; the wgpu backend evicts such pipelines once the shader is gone.
//! A bucket that fails halfway through creating its ring simply drops the
//! buffers it already made; nothing needs an explicit destroy call.
//!
//! ## Recording vs Submitting
//!
//! [`draw`](GraphicsBackend::draw) only records. Uploads issued before a
//! [`submit`](GraphicsBackend::submit) are visible to every draw in that
//! submit, so the core always uploads first, then records draws, then
//! submits once per flush. If recording fails part-way the core calls
//! [`discard`](GraphicsBackend::discard) so no half-flushed frame reaches
//! the GPU.

pub mod gpu;

use glam::Mat4;

use crate::blend::BlendMode;
use crate::error::RenderResult;
use crate::texture::TextureHandle;

/// One recorded indexed draw.
pub struct DrawCall<'a, B: GraphicsBackend + ?Sized> {
    pub vertices: &'a B::Buffer,
    pub indices: &'a B::Buffer,
    pub texture: TextureHandle,
    /// Number of indices to draw from the start of `indices`.
    pub index_count: u32,
    /// Full vertex transform (projection × model).
    pub transform: Mat4,
    /// `None` draws with the backend's default sprite shader.
    pub shader: Option<&'a B::Shader>,
    pub blend: BlendMode,
}

/// The operations the batching core needs from a graphics pipeline.
pub trait GraphicsBackend {
    type Buffer;
    type Shader;

    /// Allocate an uninitialized vertex buffer of `size` bytes.
    fn create_vertex_buffer(&mut self, label: &str, size: u64) -> RenderResult<Self::Buffer>;

    /// Allocate an index buffer initialized with `indices`.
    fn create_index_buffer(&mut self, label: &str, indices: &[u32]) -> RenderResult<Self::Buffer>;

    /// Copy `bytes` into `buffer` starting at `offset`.
    fn upload(&mut self, buffer: &Self::Buffer, offset: u64, bytes: &[u8]) -> RenderResult<()>;

    /// Record an indexed triangle draw.
    fn draw(&mut self, call: DrawCall<'_, Self>) -> RenderResult<()>;

    /// Execute everything recorded since the last submit, in order.
    fn submit(&mut self) -> RenderResult<()>;

    /// Drop recorded draws without executing them.
    fn discard(&mut self);

    /// Compile a shader program. Nothing is leaked on failure.
    fn compile_shader(&mut self, label: &str, source: &str) -> RenderResult<Self::Shader>;
}
