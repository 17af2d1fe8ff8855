//! Texture identity as seen by the batching core.
//!
//! The core never touches pixel data. A texture is a backend-issued
//! [`TextureHandle`] plus the width and height read once at load time,
//! which size default quads and normalize source rectangles.

/// Handle to a texture owned by a graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u32);

impl TextureHandle {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

/// A loaded texture: handle plus cached dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Texture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub const fn new(handle: TextureHandle, width: u32, height: u32) -> Self {
        Self { handle, width, height }
    }
}
