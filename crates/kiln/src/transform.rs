//! # Transform — Sprite Parameters to Four Vertices
//!
//! [`build_quad`] turns one sprite's draw parameters into a [`Quad`] in
//! pixel space. It is a pure function: no allocation, no shared state.
//!
//! ## General Path
//!
//! ```text
//!   local corners          scale              rotate about position
//!   (relative to origin)
//!   (-ox, -oy) ─ (w-ox, ..)   × (sx, sy)   →  x' = x·cos − y·sin + px
//!        │            │                        y' = x·sin + y·cos + py
//!   (.., h-oy) ─ (w-ox, h-oy)
//! ```
//!
//! The origin is the pivot in source pixels; it lands on `position` and is
//! scaled along with the sprite. Y points down, so a positive rotation
//! turns the sprite clockwise on screen.
//!
//! ## Fast Path
//!
//! With no source rectangle, rotation, origin, scale, or flip the corners
//! are the axis-aligned texture-sized rectangle at `position` and UVs are
//! the unit square. No trigonometry. The general path produces bit-identical
//! corners for the same inputs (`sin 0 = 0`, `cos 0 = 1`), which the tests
//! check.

use crate::math::{Color, Flip, SourceRect, Vec2};
use crate::texture::Texture;
use crate::vertex::{Quad, Vertex};

/// Everything needed to place one sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    /// Where the origin lands, in pixels.
    pub position: Vec2,
    /// Sub-rectangle of the texture. `None` draws the whole texture.
    pub source: Option<SourceRect>,
    /// Radians, clockwise-positive.
    pub rotation: f32,
    /// Pivot offset in source pixels. `None` is the top-left corner.
    pub origin: Option<Vec2>,
    /// Non-uniform scale. `None` is `(1, 1)`.
    pub scale: Option<Vec2>,
    pub color: Color,
    pub flip: Flip,
}

impl DrawParams {
    /// Untransformed, untinted sprite at `position`.
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            source: None,
            rotation: 0.0,
            origin: None,
            scale: None,
            color: Color::WHITE,
            flip: Flip::None,
        }
    }

    pub fn source(mut self, source: SourceRect) -> Self {
        self.source = Some(source);
        self
    }

    pub fn rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    pub fn origin(mut self, origin: Vec2) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn scale(mut self, scale: Vec2) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn flip(mut self, flip: Flip) -> Self {
        self.flip = flip;
        self
    }

    fn is_plain(&self) -> bool {
        self.source.is_none()
            && self.rotation == 0.0
            && self.origin.is_none()
            && self.scale.is_none()
            && self.flip == Flip::None
    }
}

impl Default for DrawParams {
    fn default() -> Self {
        Self::at(Vec2::ZERO)
    }
}

/// Compute the four pixel-space vertices for a sprite.
pub fn build_quad(texture: &Texture, params: &DrawParams) -> Quad {
    if params.is_plain() {
        plain_quad(texture, params)
    } else {
        transformed_quad(texture, params)
    }
}

fn plain_quad(texture: &Texture, params: &DrawParams) -> Quad {
    let w = texture.width as f32;
    let h = texture.height as f32;
    let p = params.position;
    let corners = [
        p + Vec2::new(0.0, 0.0),
        p + Vec2::new(0.0, h),
        p + Vec2::new(w, 0.0),
        p + Vec2::new(w, h),
    ];
    assemble(corners, (0.0, 0.0, 1.0, 1.0), params.color)
}

pub(crate) fn transformed_quad(texture: &Texture, params: &DrawParams) -> Quad {
    let (w, h, mut uv) = match params.source {
        Some(src) => (
            src.width as f32,
            src.height as f32,
            src.uv(texture.width, texture.height),
        ),
        None => (texture.width as f32, texture.height as f32, (0.0, 0.0, 1.0, 1.0)),
    };

    if params.flip.horizontal() {
        std::mem::swap(&mut uv.0, &mut uv.2);
    }
    if params.flip.vertical() {
        std::mem::swap(&mut uv.1, &mut uv.3);
    }

    let scale = params.scale.unwrap_or(Vec2::ONE);
    let origin = params.origin.unwrap_or(Vec2::ZERO);

    // `0.0 - x` keeps an unset origin at +0.0 so the rotation-free result
    // matches the plain path bit for bit.
    let x0 = 0.0 - origin.x * scale.x;
    let y0 = 0.0 - origin.y * scale.y;
    let x1 = x0 + w * scale.x;
    let y1 = y0 + h * scale.y;

    let (sin, cos) = params.rotation.sin_cos();
    let p = params.position;
    let rotate = |x: f32, y: f32| p + Vec2::new(x * cos - y * sin, x * sin + y * cos);

    let corners = [rotate(x0, y0), rotate(x0, y1), rotate(x1, y0), rotate(x1, y1)];
    assemble(corners, uv, params.color)
}

fn assemble(corners: [Vec2; 4], (u1, v1, u2, v2): (f32, f32, f32, f32), color: Color) -> Quad {
    let color = color.to_array();
    let uvs = [[u1, v1], [u1, v2], [u2, v1], [u2, v2]];
    let mut quad = Quad::default();
    for (i, vertex) in quad.vertices.iter_mut().enumerate() {
        *vertex = Vertex {
            position: corners[i].to_array(),
            uv: uvs[i],
            color,
        };
    }
    quad
}
