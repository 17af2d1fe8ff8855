//! Math types and glam re-exports.
//!
//! Positions are in pixel space: origin at the top-left of the viewport, Y
//! pointing down. [`Color`], [`SourceRect`] and [`Flip`] are the per-sprite
//! parameters the transform engine consumes.

pub use glam::{Mat4, Vec2, Vec4};

use serde::{Deserialize, Serialize};

/// An RGBA color multiplier with floating-point components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const RED: Self = Self { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const GREEN: Self = Self { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    pub const BLUE: Self = Self { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };

    /// Create a color from RGB (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A sub-rectangle of a texture in pixels.
///
/// Normalized against the texture size to get UVs, so `(0, 0, w, h)` on a
/// `w × h` texture is the full unit square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// UV corners `(u1, v1, u2, v2)` for a texture of the given size.
    pub fn uv(&self, texture_width: u32, texture_height: u32) -> (f32, f32, f32, f32) {
        let tw = texture_width as f32;
        let th = texture_height as f32;
        (
            self.x as f32 / tw,
            self.y as f32 / th,
            (self.x + self.width) as f32 / tw,
            (self.y + self.height) as f32 / th,
        )
    }
}

/// Mirroring applied to a sprite's texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Flip {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

impl Flip {
    pub fn horizontal(self) -> bool {
        matches!(self, Flip::Horizontal | Flip::Both)
    }

    pub fn vertical(self) -> bool {
        matches!(self, Flip::Vertical | Flip::Both)
    }
}

/// Pixel-space orthographic projection: (0, 0) maps to the top-left corner
/// of the viewport and (width, height) to the bottom-right.
pub fn pixel_projection(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width as f32, height as f32, 0.0, -1.0, 1.0)
}
