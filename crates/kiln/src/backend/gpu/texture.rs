//! # Texture Store — Sprite Textures on the GPU
//!
//! The batching core only sees [`TextureHandle`]s. The store behind the
//! wgpu backend owns the real `wgpu::Texture`s, one bind group per texture
//! (view + sampler, group 1 of the sprite pipeline), and the dimensions
//! returned to callers as a [`Texture`].
//!
//! ```text
//! TextureStore
//! ┌────────────────────────────────────────────────┐
//! │ entries: Slots<TextureEntry>                   │
//! │   [0] "player.png"       Handle(0)             │
//! │   [1] render target      Handle(1)             │
//! │   ...                                          │
//! │                                                │
//! │ path_cache: "player.png" → Texture(Handle(0))  │
//! │ samplers:   Sampling → wgpu::Sampler (shared)  │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! Changing a texture's [`Sampling`] rebuilds only its bind group; samplers
//! are shared between all textures with the same filter and wrap mode.
//!
//! Freeing a texture empties its slot and drops any path cache entry
//! pointing at it. The slot index is reused by the next insert, so a freed
//! handle must not be drawn with again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::texture::{Texture, TextureHandle};

/// Texel filtering for magnification and minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Filter {
    /// Crisp pixels.
    #[default]
    Nearest,
    Linear,
}

/// Addressing outside the `[0, 1]` UV range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Wrap {
    #[default]
    Clamp,
    Repeat,
    Mirror,
}

/// How a texture is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sampling {
    pub filter: Filter,
    pub wrap: Wrap,
}

impl Sampling {
    pub const fn new(filter: Filter, wrap: Wrap) -> Self {
        Self { filter, wrap }
    }

    fn descriptor(self) -> wgpu::SamplerDescriptor<'static> {
        let filter = match self.filter {
            Filter::Nearest => wgpu::FilterMode::Nearest,
            Filter::Linear => wgpu::FilterMode::Linear,
        };
        let address = match self.wrap {
            Wrap::Clamp => wgpu::AddressMode::ClampToEdge,
            Wrap::Repeat => wgpu::AddressMode::Repeat,
            Wrap::Mirror => wgpu::AddressMode::MirrorRepeat,
        };
        wgpu::SamplerDescriptor {
            label: Some("kiln sampler"),
            address_mode_u: address,
            address_mode_v: address,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        }
    }
}

pub(crate) struct TextureEntry {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

/// Slot storage that reuses the indices of removed values.
#[derive(Debug)]
pub(crate) struct Slots<T> {
    values: Vec<Option<T>>,
    free: Vec<u32>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Slots<T> {
    pub fn insert(&mut self, value: T) -> u32 {
        match self.free.pop() {
            Some(index) => {
                self.values[index as usize] = Some(value);
                index
            }
            None => {
                self.values.push(Some(value));
                (self.values.len() - 1) as u32
            }
        }
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.values.get(index as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.values.get_mut(index as usize).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, index: u32) -> Option<T> {
        let value = self.values.get_mut(index as usize)?.take()?;
        self.free.push(index);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.values.len() - self.free.len()
    }
}

#[derive(Default)]
pub(crate) struct TextureStore {
    entries: Slots<TextureEntry>,
    path_cache: HashMap<PathBuf, Texture>,
    samplers: HashMap<Sampling, wgpu::Sampler>,
}

fn unknown(handle: TextureHandle) -> RenderError {
    RenderError::invalid(format!("unknown texture {}", handle.index()))
}

impl TextureStore {
    pub fn get(&self, handle: TextureHandle) -> RenderResult<&TextureEntry> {
        self.entries.get(handle.index()).ok_or_else(|| unknown(handle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn cached(&self, path: &Path) -> Option<Texture> {
        self.path_cache.get(path).copied()
    }

    pub fn remember(&mut self, path: &Path, texture: Texture) {
        self.path_cache.insert(path.to_path_buf(), texture);
    }

    /// Take ownership of a GPU texture and hand out its handle.
    pub fn insert(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        texture: wgpu::Texture,
    ) -> Texture {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.sampler(device, Sampling::default());
        let bind_group = bind_group(device, layout, label, &view, &sampler);
        let size = texture.size();

        let index = self.entries.insert(TextureEntry {
            texture,
            view,
            bind_group,
            width: size.width,
            height: size.height,
        });
        Texture::new(TextureHandle::new(index), size.width, size.height)
    }

    /// Drop a texture. wgpu releases it once no submitted work uses it. The
    /// handle becomes invalid and may be handed out again by `insert`.
    pub fn remove(&mut self, handle: TextureHandle) -> RenderResult<()> {
        self.entries
            .remove(handle.index())
            .ok_or_else(|| unknown(handle))?;
        self.forget_paths(handle);
        Ok(())
    }

    fn forget_paths(&mut self, handle: TextureHandle) {
        self.path_cache.retain(|_, texture| texture.handle != handle);
    }

    pub fn set_sampling(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        handle: TextureHandle,
        sampling: Sampling,
    ) -> RenderResult<()> {
        let sampler = self.sampler(device, sampling);
        let entry = self
            .entries
            .get_mut(handle.index())
            .ok_or_else(|| unknown(handle))?;
        entry.bind_group = bind_group(device, layout, "kiln texture", &entry.view, &sampler);
        Ok(())
    }

    fn sampler(&mut self, device: &wgpu::Device, sampling: Sampling) -> wgpu::Sampler {
        self.samplers
            .entry(sampling)
            .or_insert_with(|| device.create_sampler(&sampling.descriptor()))
            .clone()
    }
}

fn bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Check that `data` is exactly `width × height` RGBA8 pixels.
pub(crate) fn validate_rgba(width: u32, height: u32, data: &[u8]) -> RenderResult<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::invalid(format!(
            "texture must be non-empty, got {width}x{height}"
        )));
    }
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(RenderError::invalid(format!(
            "expected {expected} bytes of RGBA8 data for {width}x{height}, got {}",
            data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn rgba_length_must_match_dimensions() {
        assert!(validate_rgba(2, 2, &[0; 16]).is_ok());
        assert!(validate_rgba(2, 2, &[0; 12]).is_err());
        assert!(validate_rgba(0, 2, &[]).is_err());
    }

    #[test]
    fn sampling_maps_to_wgpu_modes() {
        let desc = Sampling::new(Filter::Linear, Wrap::Repeat).descriptor();
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::Repeat);
        let desc = Sampling::default().descriptor();
        assert_eq!(desc.min_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::ClampToEdge);
    }

    #[test]
    fn unknown_handle_is_invalid() {
        let mut store = TextureStore::default();
        let err = store.get(TextureHandle::new(0)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = store.remove(TextureHandle::new(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut slots = Slots::default();
        let a = slots.insert("a");
        let b = slots.insert("b");
        assert_eq!(slots.remove(a), Some("a"));
        assert_eq!(slots.get(a), None);
        assert_eq!(slots.remove(a), None);
        assert_eq!(slots.len(), 1);

        let c = slots.insert("c");
        assert_eq!(c, a);
        assert_eq!(slots.get(c), Some(&"c"));
        assert_eq!(slots.get(b), Some(&"b"));
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn freeing_a_texture_evicts_its_path() {
        let mut store = TextureStore::default();
        let kept = Texture::new(TextureHandle::new(0), 8, 8);
        let freed = Texture::new(TextureHandle::new(1), 8, 8);
        store.remember(Path::new("kept.png"), kept);
        store.remember(Path::new("freed.png"), freed);
        store.remember(Path::new("alias.png"), freed);

        store.forget_paths(freed.handle);
        assert_eq!(store.cached(Path::new("kept.png")), Some(kept));
        assert_eq!(store.cached(Path::new("freed.png")), None);
        assert_eq!(store.cached(Path::new("alias.png")), None);
    }
}
