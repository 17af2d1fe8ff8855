//! Convenience re-exports — `use kiln::prelude::*` for the common items.

pub use crate::backend::GraphicsBackend;
pub use crate::backend::gpu::{Filter, RenderTarget, Sampling, WgpuBackend, Wrap};
pub use crate::batch::SpriteBatch;
pub use crate::blend::BlendMode;
pub use crate::config::{BatchConfig, Buffering};
pub use crate::error::{ErrorKind, RenderError, RenderResult};
pub use crate::math::{Color, Flip, Mat4, SourceRect, Vec2, pixel_projection};
pub use crate::renderer::Renderer;
pub use crate::static_batch::StaticBatch;
pub use crate::stats::FrameStats;
pub use crate::texture::{Texture, TextureHandle};
pub use crate::transform::DrawParams;
