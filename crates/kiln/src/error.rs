//! Error type shared by every renderer operation.
//!
//! Every fallible call returns [`RenderResult`]. Operations either apply
//! their whole effect or fail before touching shared state, so a failed
//! draw can simply be retried after a present or with a larger batch.

use std::collections::TryReserveError;
use std::fmt;

use crate::texture::TextureHandle;

pub type RenderResult<T> = Result<T, RenderError>;

/// Errors produced by batches, the renderer context, and graphics backends.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A caller-supplied value is out of range (zero capacity, empty viewport, ...).
    InvalidParameter(String),
    /// Host memory for vertex storage could not be reserved.
    AllocationFailure(String),
    /// No bucket can take another sprite for this texture.
    CapacityExceeded {
        texture: TextureHandle,
        max_buckets: usize,
        max_sprites_per_bucket: usize,
    },
    /// The graphics backend rejected a buffer, texture, shader, or submit.
    GraphicsBackend(String),
    /// Something required was never set up (viewport, render target, ...).
    NotInitialized(String),
    /// Insertion into a static batch that has already been uploaded.
    AlreadyBaked,
}

/// Fieldless discriminant of [`RenderError`], handy for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    AllocationFailure,
    CapacityExceeded,
    GraphicsBackend,
    NotInitialized,
    AlreadyBaked,
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            RenderError::AllocationFailure(_) => ErrorKind::AllocationFailure,
            RenderError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            RenderError::GraphicsBackend(_) => ErrorKind::GraphicsBackend,
            RenderError::NotInitialized(_) => ErrorKind::NotInitialized,
            RenderError::AlreadyBaked => ErrorKind::AlreadyBaked,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RenderError::InvalidParameter(msg.into())
    }

    pub(crate) fn backend(msg: impl Into<String>) -> Self {
        RenderError::GraphicsBackend(msg.into())
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidParameter(e) => write!(f, "invalid parameter: {e}"),
            RenderError::AllocationFailure(e) => write!(f, "allocation failed: {e}"),
            RenderError::CapacityExceeded {
                texture,
                max_buckets,
                max_sprites_per_bucket,
            } => write!(
                f,
                "no bucket available for texture {} ({max_buckets} buckets of {max_sprites_per_bucket} sprites)",
                texture.index()
            ),
            RenderError::GraphicsBackend(e) => write!(f, "graphics backend error: {e}"),
            RenderError::NotInitialized(e) => write!(f, "not initialized: {e}"),
            RenderError::AlreadyBaked => write!(f, "static batch is already uploaded"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<TryReserveError> for RenderError {
    fn from(e: TryReserveError) -> Self {
        RenderError::AllocationFailure(e.to_string())
    }
}
