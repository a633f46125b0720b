//! wgpu backend.
//!
//! wgpu fixes vertex layouts at pipeline creation and binds buffers per render
//! pass, so "configuring an attribute" records the binding into a
//! [`BoundVertexState`]. The renderer uses it twice: once to build the
//! pipeline's vertex layouts and once per pass to set the buffers.

use std::collections::{BTreeMap, HashMap};

use wgpu::util::DeviceExt;

use super::{
    check_range, AttributeFormat, BackendError, BufferDesc, BufferId, BufferKind, BufferUsage,
    GraphicsBackend, IndexFormat,
};

struct WgpuBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
    usage: BufferUsage,
    /// Logical size requested by the caller (the allocation may be padded).
    size: u64,
}

#[derive(Debug, Clone)]
struct VertexSlot {
    id: BufferId,
    buffer: wgpu::Buffer,
    attribute: wgpu::VertexAttribute,
    stride: u64,
}

/// Vertex/index bindings recorded by [`WgpuBackend`].
///
/// Slots are ordered by shader location; vertex buffer slot `i` is the `i`-th
/// configured location.
#[derive(Debug, Clone, Default)]
pub struct BoundVertexState {
    slots: BTreeMap<u32, VertexSlot>,
    index: Option<(BufferId, wgpu::Buffer, wgpu::IndexFormat)>,
}

impl BoundVertexState {
    /// Number of configured attribute slots.
    pub fn attribute_count(&self) -> usize {
        self.slots.len()
    }

    /// Shader locations in vertex-buffer-slot order.
    pub fn locations(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.keys().copied()
    }

    /// One non-interleaved layout per configured attribute, for
    /// `wgpu::VertexState::buffers`.
    pub fn vertex_buffer_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.slots
            .values()
            .map(|slot| wgpu::VertexBufferLayout {
                array_stride: slot.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: std::slice::from_ref(&slot.attribute),
            })
            .collect()
    }

    /// Sets vertex and index buffers on `pass`.
    pub fn apply(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (slot, bound) in self.slots.values().enumerate() {
            pass.set_vertex_buffer(slot as u32, bound.buffer.slice(..));
        }
        if let Some((_, buffer, format)) = &self.index {
            pass.set_index_buffer(buffer.slice(..), *format);
        }
    }

    fn forget(&mut self, id: BufferId) {
        self.slots.retain(|_, slot| slot.id != id);
        if self.index.as_ref().is_some_and(|(bound, _, _)| *bound == id) {
            self.index = None;
        }
    }
}

/// [`GraphicsBackend`] over a wgpu device/queue pair.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    buffers: HashMap<BufferId, WgpuBuffer>,
    next_id: u64,

    bound: BoundVertexState,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            next_id: 0,
            bound: BoundVertexState::default(),
        }
    }

    /// Bindings recorded by the last `configure_attribute`/`bind_index_buffer` calls.
    pub fn bound(&self) -> &BoundVertexState {
        &self.bound
    }

    /// Returns the wgpu buffer behind `id`.
    pub fn raw_buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id).map(|b| &b.buffer)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Copies `len` bytes of `id` starting at `offset` back to the host.
    ///
    /// Blocks until the GPU has finished all submitted work.
    pub fn read_buffer(&self, id: BufferId, offset: u64, len: u64) -> Result<Vec<u8>, BackendError> {
        let entry = self.entry(id)?;
        check_range(id, entry.size, offset, len)?;
        if len == 0 {
            return Ok(Vec::new());
        }

        // Copies must be 4-byte aligned; allocations are padded, so widening
        // the window stays inside the buffer.
        let start = offset - offset % wgpu::COPY_BUFFER_ALIGNMENT;
        let end = wgpu::util::align_to(offset + len, wgpu::COPY_BUFFER_ALIGNMENT);
        let copy_len = end - start;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ember readback staging"),
            size: copy_len,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ember readback encoder"),
            });
        encoder.copy_buffer_to_buffer(&entry.buffer, start, &staging, 0, copy_len);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| BackendError::ReadbackFailed(e.to_string()))?;

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BackendError::ReadbackFailed(e.to_string())),
            Err(e) => return Err(BackendError::ReadbackFailed(e.to_string())),
        }

        let skip = (offset - start) as usize;
        let data = slice.get_mapped_range()[skip..skip + len as usize].to_vec();
        staging.unmap();
        Ok(data)
    }

    fn entry(&self, id: BufferId) -> Result<&WgpuBuffer, BackendError> {
        self.buffers.get(&id).ok_or(BackendError::UnknownBuffer(id.0))
    }
}

fn usage_flags(kind: BufferKind, usage: BufferUsage) -> wgpu::BufferUsages {
    // COPY_SRC keeps every buffer readable for diagnostics.
    let base = match kind {
        BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
        BufferKind::Index => wgpu::BufferUsages::INDEX,
    } | wgpu::BufferUsages::COPY_SRC;

    match usage {
        BufferUsage::Dynamic => base | wgpu::BufferUsages::COPY_DST,
        BufferUsage::Static => base,
    }
}

fn vertex_format(format: AttributeFormat) -> Result<wgpu::VertexFormat, BackendError> {
    match format {
        AttributeFormat::Float32(1) => Ok(wgpu::VertexFormat::Float32),
        AttributeFormat::Float32(2) => Ok(wgpu::VertexFormat::Float32x2),
        AttributeFormat::Float32(3) => Ok(wgpu::VertexFormat::Float32x3),
        AttributeFormat::Float32(4) => Ok(wgpu::VertexFormat::Float32x4),
        AttributeFormat::Unorm8x4 => Ok(wgpu::VertexFormat::Unorm8x4),
        other => Err(BackendError::UnsupportedFormat(other)),
    }
}

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError> {
        let usage = usage_flags(desc.kind, desc.usage);

        let (buffer, size) = match (desc.usage, desc.contents) {
            (_, Some(contents)) => {
                // create_buffer_init pads to COPY_BUFFER_ALIGNMENT.
                let buffer = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(desc.label),
                        contents,
                        usage,
                    });
                (buffer, contents.len() as u64)
            }
            (BufferUsage::Static, None) => {
                return Err(BackendError::MissingContents(desc.label.to_string()));
            }
            (BufferUsage::Dynamic, None) => {
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(desc.label),
                    size: wgpu::util::align_to(desc.size, wgpu::COPY_BUFFER_ALIGNMENT),
                    usage,
                    mapped_at_creation: false,
                });
                (buffer, desc.size)
            }
        };

        let id = BufferId(self.next_id);
        self.next_id += 1;

        log::trace!("WgpuBackend: created buffer {:?} #{} ({} bytes)", desc.label, id.0, size);

        self.buffers.insert(
            id,
            WgpuBuffer {
                buffer,
                kind: desc.kind,
                usage: desc.usage,
                size,
            },
        );
        Ok(id)
    }

    fn upload_sub_range(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let entry = self.entry(buffer)?;
        if entry.usage == BufferUsage::Static {
            return Err(BackendError::ImmutableBuffer(buffer.0));
        }
        let len = data.len() as u64;
        check_range(buffer, entry.size, offset, len)?;

        if len == 0 {
            return Ok(());
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(BackendError::Unaligned {
                buffer: buffer.0,
                offset,
                len,
                align: wgpu::COPY_BUFFER_ALIGNMENT,
            });
        }

        self.queue.write_buffer(&entry.buffer, offset, data);
        Ok(())
    }

    fn configure_attribute(
        &mut self,
        location: u32,
        buffer: BufferId,
        format: AttributeFormat,
    ) -> Result<(), BackendError> {
        let entry = self.entry(buffer)?;
        if entry.kind != BufferKind::Vertex {
            return Err(BackendError::WrongKind {
                buffer: buffer.0,
                expected: "vertex",
            });
        }
        let slot = VertexSlot {
            id: buffer,
            buffer: entry.buffer.clone(),
            attribute: wgpu::VertexAttribute {
                format: vertex_format(format)?,
                offset: 0,
                shader_location: location,
            },
            stride: format.size_bytes(),
        };
        // A buffer feeds one location; rebinding under a new location moves it.
        self.bound
            .slots
            .retain(|&bound_at, slot| bound_at == location || slot.id != buffer);
        self.bound.slots.insert(location, slot);
        Ok(())
    }

    fn bind_index_buffer(
        &mut self,
        buffer: BufferId,
        format: IndexFormat,
    ) -> Result<(), BackendError> {
        let entry = self.entry(buffer)?;
        if entry.kind != BufferKind::Index {
            return Err(BackendError::WrongKind {
                buffer: buffer.0,
                expected: "index",
            });
        }
        let raw = entry.buffer.clone();
        let format = match format {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        };
        self.bound.index = Some((buffer, raw, format));
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), BackendError> {
        let entry = self
            .buffers
            .remove(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer.0))?;
        self.bound.forget(buffer);
        entry.buffer.destroy();
        Ok(())
    }
}
