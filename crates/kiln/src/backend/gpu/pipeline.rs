//! # Pipeline — Sprite Render Pipelines per Shader and Blend Mode
//!
//! Every sprite draw uses the same vertex layout and bind group layouts;
//! only the shader module and the blend state vary. Pipelines are built on
//! first use for each `(shader, blend)` pair and cached.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ RenderPipeline                                              │
//! │                                                             │
//! │  Shader module ─── vs_main + fs_main (default or custom)    │
//! │  Vertex layout ─── Vertex { position, uv, color }           │
//! │  group 0: transform uniform (mat4x4, vertex-only)           │
//! │  group 1: texture + sampler (fragment-only)                 │
//! │  Blend ─── Normal | Additive | Multiply                     │
//! │  Primitive ─── TriangleList, no culling                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A custom shader must declare the same bindings and entry points as
//! `shader.wgsl`. Its cached pipelines hold only a weak reference to it, so
//! dropping the shader lets the next lookup evict them. Pipeline validation errors are caught with an error scope
//! and reported instead of panicking.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use crate::blend::BlendMode;
use crate::error::{RenderError, RenderResult};
use crate::vertex::Vertex;

use super::GpuShader;

type PipelineKey = (Option<u64>, BlendMode);

/// A cached value tied to the shader that built it. `owner` is `None` for
/// the default shader, which lives as long as the cache.
struct Owned<P> {
    value: P,
    owner: Option<Weak<()>>,
}

/// Drop every entry whose owning shader has been dropped.
fn prune<K: Eq + Hash, P>(cache: &mut HashMap<K, Owned<P>>) {
    cache.retain(|_, entry| {
        entry
            .owner
            .as_ref()
            .is_none_or(|owner| owner.strong_count() > 0)
    });
}

fn owner(shader: Option<&GpuShader>) -> Option<Weak<()>> {
    shader.map(|s| Arc::downgrade(&s.alive))
}

pub(crate) struct SpritePipelines {
    format: wgpu::TextureFormat,
    pub camera_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    default_shader: wgpu::ShaderModule,
    cache: HashMap<PipelineKey, Owned<wgpu::RenderPipeline>>,
}

impl SpritePipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let default_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("kiln sprite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kiln transform bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kiln texture bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kiln sprite pipeline layout"),
            bind_group_layouts: &[&camera_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        Self {
            format,
            camera_layout,
            texture_layout,
            layout,
            default_shader,
            cache: HashMap::new(),
        }
    }

    /// Pipeline for `shader` (default when `None`) and `blend`, built on
    /// first request. Pipelines of dropped shaders are evicted here.
    pub fn get(
        &mut self,
        device: &wgpu::Device,
        shader: Option<&GpuShader>,
        blend: BlendMode,
    ) -> RenderResult<wgpu::RenderPipeline> {
        prune(&mut self.cache);
        let key = (shader.map(|s| s.id), blend);
        if let Some(entry) = self.cache.get(&key) {
            return Ok(entry.value.clone());
        }

        let module = shader.map_or(&self.default_shader, |s| &s.module);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self.build(device, module, blend);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::backend(format!(
                "sprite pipeline ({blend:?}): {err}"
            )));
        }

        log::debug!("built sprite pipeline for shader {:?}, {blend:?}", key.0);
        self.cache.insert(
            key,
            Owned {
                value: pipeline.clone(),
                owner: owner(shader),
            },
        );
        Ok(pipeline)
    }

    /// Cache a pipeline built (and validated) elsewhere.
    pub fn insert(&mut self, shader: &GpuShader, blend: BlendMode, pipeline: wgpu::RenderPipeline) {
        prune(&mut self.cache);
        self.cache.insert(
            (Some(shader.id), blend),
            Owned {
                value: pipeline,
                owner: owner(Some(shader)),
            },
        );
    }

    /// Drop every cached pipeline built from `shader` right away.
    pub fn forget(&mut self, shader: u64) {
        self.cache.retain(|(id, _), _| *id != Some(shader));
    }

    /// Build without validation; callers wrap this in an error scope.
    pub fn build(
        &self,
        device: &wgpu::Device,
        module: &wgpu::ShaderModule,
        blend: BlendMode,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("kiln sprite pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(blend.to_wgpu()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}
