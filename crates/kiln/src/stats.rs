//! Per-frame render statistics, accumulated by the renderer.

use serde::Serialize;

/// Counters for the work issued since the last [`take_stats`](crate::Renderer::take_stats).
///
/// Counters saturate instead of wrapping, so a caller that never takes the
/// stats only loses precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub draw_calls: u64,
    pub uploads: u64,
    pub uploaded_bytes: u64,
    /// Sprites accepted by `lower_draw*` calls.
    pub sprites: u64,
    pub submits: u64,
}

impl FrameStats {
    pub(crate) fn record_upload(&mut self, bytes: usize) {
        self.uploads = self.uploads.saturating_add(1);
        self.uploaded_bytes = self.uploaded_bytes.saturating_add(bytes as u64);
    }

    pub(crate) fn record_sprite(&mut self) {
        self.sprites = self.sprites.saturating_add(1);
    }

    pub(crate) fn record_draw(&mut self) {
        self.draw_calls = self.draw_calls.saturating_add(1);
    }

    pub(crate) fn record_submit(&mut self) {
        self.submits = self.submits.saturating_add(1);
    }

    pub(crate) fn merge(&mut self, other: FrameStats) {
        self.draw_calls = self.draw_calls.saturating_add(other.draw_calls);
        self.uploads = self.uploads.saturating_add(other.uploads);
        self.uploaded_bytes = self.uploaded_bytes.saturating_add(other.uploaded_bytes);
        self.sprites = self.sprites.saturating_add(other.sprites);
        self.submits = self.submits.saturating_add(other.submits);
    }

    /// JSON snapshot for an external diagnostics viewer.
    #[cfg(feature = "diagnostics")]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
