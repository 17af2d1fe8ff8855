//! Blend modes carried by every draw call.

use serde::{Deserialize, Serialize};

/// How a sprite's color is combined with what is already in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// `src × src.a + dst × (1 − src.a)`
    #[default]
    Normal,
    /// `src + dst`
    Additive,
    /// `src × dst`
    Multiply,
}

impl BlendMode {
    pub(crate) fn to_wgpu(self) -> wgpu::BlendState {
        match self {
            BlendMode::Normal => wgpu::BlendState::ALPHA_BLENDING,
            BlendMode::Additive => {
                let add = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                wgpu::BlendState { color: add, alpha: add }
            }
            BlendMode::Multiply => {
                let mul = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Dst,
                    dst_factor: wgpu::BlendFactor::Zero,
                    operation: wgpu::BlendOperation::Add,
                };
                wgpu::BlendState { color: mul, alpha: mul }
            }
        }
    }
}
