//! In-memory [`GraphicsBackend`] used by the unit tests.
//!
//! Records every call, keeps buffer contents so drawn geometry can be
//! inspected, tracks how many buffers are alive, and can be told to fail.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Mat4;

use crate::backend::{DrawCall, GraphicsBackend};
use crate::blend::BlendMode;
use crate::error::{RenderError, RenderResult};
use crate::texture::TextureHandle;
use crate::vertex::{INDICES_PER_QUAD, VERTICES_PER_QUAD, Vertex};

#[derive(Debug)]
pub(crate) struct RecordedBuffer {
    pub id: usize,
    live: Rc<Cell<usize>>,
}

impl Drop for RecordedBuffer {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug)]
pub(crate) struct RecordedShader {
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedDraw {
    pub vertex_buffer: usize,
    pub index_buffer: usize,
    pub texture: TextureHandle,
    pub index_count: u32,
    pub transform: Mat4,
    pub shader: Option<usize>,
    pub blend: BlendMode,
    /// Vertices covered by `index_count`, as they were when the draw was recorded.
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    CreateVertexBuffer { id: usize, size: u64 },
    CreateIndexBuffer { id: usize, count: usize },
    Upload { buffer: usize, offset: u64, len: usize },
    Draw(RecordedDraw),
    Submit,
    Discard,
    CompileShader { id: usize },
}

#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub events: Vec<Event>,
    contents: HashMap<usize, Vec<u8>>,
    next_id: usize,
    live: Rc<Cell<usize>>,
    pending: Vec<RecordedDraw>,
    pub submitted: Vec<Vec<RecordedDraw>>,
    /// Fail vertex buffer creation once this many have succeeded.
    pub fail_vertex_buffers_after: Option<usize>,
    vertex_buffers_created: usize,
    pub fail_uploads: bool,
    pub fail_draws: bool,
    pub fail_shaders: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_buffers(&self) -> usize {
        self.live.get()
    }

    pub fn uploads(&self) -> Vec<(usize, u64, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Upload { buffer, offset, len } => Some((*buffer, *offset, *len)),
                _ => None,
            })
            .collect()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads().len()
    }

    /// Every draw recorded so far, submitted or not.
    pub fn draws(&self) -> Vec<RecordedDraw> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Draw(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn submitted_draws(&self) -> Vec<RecordedDraw> {
        self.submitted.iter().flatten().cloned().collect()
    }

    pub fn last_submit(&self) -> &[RecordedDraw] {
        self.submitted.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn allocate(&mut self, size: usize) -> RecordedBuffer {
        let id = self.next_id;
        self.next_id += 1;
        self.contents.insert(id, vec![0; size]);
        self.live.set(self.live.get() + 1);
        RecordedBuffer {
            id,
            live: self.live.clone(),
        }
    }
}

impl GraphicsBackend for RecordingBackend {
    type Buffer = RecordedBuffer;
    type Shader = RecordedShader;

    fn create_vertex_buffer(&mut self, _label: &str, size: u64) -> RenderResult<RecordedBuffer> {
        if let Some(limit) = self.fail_vertex_buffers_after {
            if self.vertex_buffers_created >= limit {
                return Err(RenderError::backend("vertex buffer allocation refused"));
            }
        }
        self.vertex_buffers_created += 1;
        let buffer = self.allocate(size as usize);
        self.events.push(Event::CreateVertexBuffer { id: buffer.id, size });
        Ok(buffer)
    }

    fn create_index_buffer(&mut self, _label: &str, indices: &[u32]) -> RenderResult<RecordedBuffer> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let buffer = self.allocate(bytes.len());
        if let Some(data) = self.contents.get_mut(&buffer.id) {
            data.copy_from_slice(bytes);
        }
        self.events.push(Event::CreateIndexBuffer {
            id: buffer.id,
            count: indices.len(),
        });
        Ok(buffer)
    }

    fn upload(&mut self, buffer: &RecordedBuffer, offset: u64, bytes: &[u8]) -> RenderResult<()> {
        if self.fail_uploads {
            return Err(RenderError::backend("upload refused"));
        }
        let data = self
            .contents
            .get_mut(&buffer.id)
            .ok_or_else(|| RenderError::backend("unknown buffer"))?;
        let start = offset as usize;
        let end = start + bytes.len();
        if end > data.len() {
            return Err(RenderError::invalid("upload past end of buffer"));
        }
        data[start..end].copy_from_slice(bytes);
        self.events.push(Event::Upload {
            buffer: buffer.id,
            offset,
            len: bytes.len(),
        });
        Ok(())
    }

    fn draw(&mut self, call: DrawCall<'_, Self>) -> RenderResult<()> {
        if self.fail_draws {
            return Err(RenderError::backend("draw refused"));
        }
        let quads = call.index_count as usize / INDICES_PER_QUAD;
        let byte_len = quads * VERTICES_PER_QUAD * std::mem::size_of::<Vertex>();
        let data = &self.contents[&call.vertices.id];
        let vertices: Vec<Vertex> = data[..byte_len]
            .chunks_exact(std::mem::size_of::<Vertex>())
            .map(bytemuck::pod_read_unaligned::<Vertex>)
            .collect();
        let draw = RecordedDraw {
            vertex_buffer: call.vertices.id,
            index_buffer: call.indices.id,
            texture: call.texture,
            index_count: call.index_count,
            transform: call.transform,
            shader: call.shader.map(|s| s.id),
            blend: call.blend,
            vertices,
        };
        self.events.push(Event::Draw(draw.clone()));
        self.pending.push(draw);
        Ok(())
    }

    fn submit(&mut self) -> RenderResult<()> {
        self.events.push(Event::Submit);
        self.submitted.push(std::mem::take(&mut self.pending));
        Ok(())
    }

    fn discard(&mut self) {
        self.events.push(Event::Discard);
        self.pending.clear();
    }

    fn compile_shader(&mut self, _label: &str, _source: &str) -> RenderResult<RecordedShader> {
        if self.fail_shaders {
            return Err(RenderError::backend("shader failed to compile"));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(Event::CompileShader { id });
        Ok(RecordedShader { id })
    }
}
