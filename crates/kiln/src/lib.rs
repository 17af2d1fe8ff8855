//! # Kiln — Texture-Batched 2D Sprite Rendering
//!
//! Kiln collects per-frame sprite draws into texture-keyed buckets and
//! submits each bucket as one indexed draw. Every bucket rotates through
//! two or three GPU vertex buffers so the CPU can fill next frame's
//! geometry while the GPU still reads the previous one.
//!
//! ```text
//! Renderer::draw ──▶ transform ──▶ lower_draw ──▶ bucket (CPU vertices)
//!                                                     │
//! Renderer::present ◀─────────────────────────────────┘
//!     upload → ring[fill]   draw ← ring[draw]   advance ring
//! ```
//!
//! Besides dynamic [`SpriteBatch`]es there are baked [`StaticBatch`]es for
//! geometry that never changes and an immediate path for one-off sprites.
//!
//! The batching core talks to the GPU only through [`GraphicsBackend`];
//! [`WgpuBackend`] is the wgpu implementation. Start with
//! `use kiln::prelude::*`.

pub mod backend;
pub mod batch;
pub mod blend;
pub mod config;
pub mod error;
pub mod math;
pub mod prelude;
pub mod renderer;
pub mod static_batch;
pub mod stats;
pub mod texture;
pub mod transform;
pub mod vertex;

mod bucket;

#[cfg(test)]
mod testing;

pub use backend::gpu::WgpuBackend;
pub use backend::{DrawCall, GraphicsBackend};
pub use batch::{BatchId, SpriteBatch};
pub use blend::BlendMode;
pub use config::{BatchConfig, Buffering};
pub use error::{ErrorKind, RenderError, RenderResult};
pub use renderer::Renderer;
pub use static_batch::StaticBatch;
pub use stats::FrameStats;
pub use texture::{Texture, TextureHandle};
pub use transform::{DrawParams, build_quad};
pub use vertex::{Quad, Vertex};
