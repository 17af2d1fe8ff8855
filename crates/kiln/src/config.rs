//! Batch configuration.
//!
//! [`BatchConfig`] fixes a batch's capacity for its whole lifetime. It can be
//! built in code or read from JSON (for example a settings file shipped next
//! to the game):
//!
//! ```json
//! { "max_buckets": 8, "max_sprites_per_bucket": 1000, "buffering": "Double" }
//! ```
//!
//! Missing fields fall back to [`BatchConfig::default`].

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::vertex::INDICES_PER_QUAD;

/// How many GPU buffer generations each bucket rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Buffering {
    /// One generation, filled and drawn in the same frame.
    Single,
    Double,
    #[default]
    Triple,
}

impl Buffering {
    pub fn generations(self) -> usize {
        match self {
            Buffering::Single => 1,
            Buffering::Double => 2,
            Buffering::Triple => 3,
        }
    }

    pub fn is_multi(self) -> bool {
        self.generations() > 1
    }
}

/// Capacity and buffering of a dynamic sprite batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of texture buckets; at most this many textures per frame.
    pub max_buckets: usize,
    /// Sprites each bucket holds before another bucket is claimed.
    pub max_sprites_per_bucket: usize,
    pub buffering: Buffering,
}

impl BatchConfig {
    pub fn new(max_buckets: usize, max_sprites_per_bucket: usize) -> Self {
        Self {
            max_buckets,
            max_sprites_per_bucket,
            buffering: Buffering::default(),
        }
    }

    pub fn buffering(mut self, buffering: Buffering) -> Self {
        self.buffering = buffering;
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json(source: &str) -> RenderResult<Self> {
        let config: Self = serde_json::from_str(source)
            .map_err(|e| RenderError::invalid(format!("batch config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.max_buckets == 0 {
            return Err(RenderError::invalid("max_buckets must be positive"));
        }
        validate_sprite_capacity(self.max_sprites_per_bucket)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(16, 1024)
    }
}

/// Reject capacities that are zero or whose index count would not fit in `u32`.
pub(crate) fn validate_sprite_capacity(max_sprites: usize) -> RenderResult<()> {
    if max_sprites == 0 {
        return Err(RenderError::invalid("sprite capacity must be positive"));
    }
    match max_sprites.checked_mul(INDICES_PER_QUAD) {
        Some(indices) if indices <= u32::MAX as usize => Ok(()),
        _ => Err(RenderError::invalid(format!(
            "sprite capacity {max_sprites} overflows 32-bit indices"
        ))),
    }
}
