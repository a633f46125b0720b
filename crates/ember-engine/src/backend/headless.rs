//! Host-memory backend.
//!
//! Buffers live in `Vec<u8>`s and every call is recorded, so tests can read
//! back exactly what a GPU would have received. Also used when no adapter is
//! available.

use std::collections::{BTreeMap, HashMap};

use super::{
    check_range, AttributeFormat, BackendError, BufferDesc, BufferId, BufferKind, BufferUsage,
    GraphicsBackend, IndexFormat,
};

/// A buffer held in host memory.
#[derive(Debug, Clone)]
pub struct HostBuffer {
    pub label: String,
    pub kind: BufferKind,
    pub usage: BufferUsage,
    pub data: Vec<u8>,
}

/// One recorded `upload_sub_range` call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UploadRecord {
    pub buffer: BufferId,
    pub offset: u64,
    pub len: u64,
}

/// Current configuration of one attribute slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeBinding {
    pub buffer: BufferId,
    pub format: AttributeFormat,
}

/// Backend keeping buffers in host memory.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    buffers: HashMap<BufferId, HostBuffer>,
    next_id: u64,

    attributes: BTreeMap<u32, AttributeBinding>,
    index_binding: Option<(BufferId, IndexFormat)>,

    uploads: Vec<UploadRecord>,
    created: usize,
    deleted: usize,

    /// Remaining successful creations before `create_buffer` starts failing.
    fail_after: Option<usize>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes buffer creation fail once `successes` more buffers were created.
    pub fn fail_creation_after(&mut self, successes: usize) {
        self.fail_after = Some(successes);
    }

    /// Returns the buffer behind `id`, if it is live.
    pub fn buffer(&self, id: BufferId) -> Option<&HostBuffer> {
        self.buffers.get(&id)
    }

    /// Returns `len` bytes of `id` starting at `offset`.
    pub fn read(&self, id: BufferId, offset: u64, len: u64) -> Result<&[u8], BackendError> {
        let buf = self.buffers.get(&id).ok_or(BackendError::UnknownBuffer(id.0))?;
        check_range(id, buf.data.len() as u64, offset, len)?;
        Ok(&buf.data[offset as usize..(offset + len) as usize])
    }

    /// Attribute slots configured so far, keyed by location.
    pub fn attributes(&self) -> &BTreeMap<u32, AttributeBinding> {
        &self.attributes
    }

    /// Currently bound index buffer.
    pub fn index_binding(&self) -> Option<(BufferId, IndexFormat)> {
        self.index_binding
    }

    /// Every upload issued, in call order.
    pub fn uploads(&self) -> &[UploadRecord] {
        &self.uploads
    }

    /// Forgets recorded uploads and bindings. Buffers are kept.
    pub fn clear_log(&mut self) {
        self.uploads.clear();
        self.attributes.clear();
        self.index_binding = None;
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn created_buffers(&self) -> usize {
        self.created
    }

    pub fn deleted_buffers(&self) -> usize {
        self.deleted
    }

    fn live(&self, id: BufferId) -> Result<&HostBuffer, BackendError> {
        self.buffers.get(&id).ok_or(BackendError::UnknownBuffer(id.0))
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError> {
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(BackendError::ResourceCreationFailed(format!(
                    "injected failure for '{}'",
                    desc.label
                )));
            }
            *remaining -= 1;
        }

        let data = match (desc.usage, desc.contents) {
            (_, Some(contents)) => contents.to_vec(),
            (BufferUsage::Static, None) => {
                return Err(BackendError::MissingContents(desc.label.to_string()));
            }
            (BufferUsage::Dynamic, None) => vec![0; desc.size as usize],
        };

        let id = BufferId(self.next_id);
        self.next_id += 1;

        log::trace!(
            "HeadlessBackend: creating buffer {:?} #{} ({} bytes)",
            desc.label,
            id.0,
            data.len()
        );

        self.buffers.insert(
            id,
            HostBuffer {
                label: desc.label.to_string(),
                kind: desc.kind,
                usage: desc.usage,
                data,
            },
        );
        self.created += 1;
        Ok(id)
    }

    fn upload_sub_range(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let buf = self
            .buffers
            .get_mut(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer.0))?;
        if buf.usage == BufferUsage::Static {
            return Err(BackendError::ImmutableBuffer(buffer.0));
        }
        check_range(buffer, buf.data.len() as u64, offset, data.len() as u64)?;

        let start = offset as usize;
        buf.data[start..start + data.len()].copy_from_slice(data);

        self.uploads.push(UploadRecord {
            buffer,
            offset,
            len: data.len() as u64,
        });
        Ok(())
    }

    fn configure_attribute(
        &mut self,
        location: u32,
        buffer: BufferId,
        format: AttributeFormat,
    ) -> Result<(), BackendError> {
        if self.live(buffer)?.kind != BufferKind::Vertex {
            return Err(BackendError::WrongKind {
                buffer: buffer.0,
                expected: "vertex",
            });
        }
        self.attributes
            .retain(|&bound_at, b| bound_at == location || b.buffer != buffer);
        self.attributes
            .insert(location, AttributeBinding { buffer, format });
        Ok(())
    }

    fn bind_index_buffer(
        &mut self,
        buffer: BufferId,
        format: IndexFormat,
    ) -> Result<(), BackendError> {
        if self.live(buffer)?.kind != BufferKind::Index {
            return Err(BackendError::WrongKind {
                buffer: buffer.0,
                expected: "index",
            });
        }
        self.index_binding = Some((buffer, format));
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), BackendError> {
        let buf = self
            .buffers
            .remove(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer.0))?;
        log::trace!("HeadlessBackend: deleting buffer {:?} #{}", buf.label, buffer.0);

        self.attributes.retain(|_, b| b.buffer != buffer);
        if self.index_binding.is_some_and(|(id, _)| id == buffer) {
            self.index_binding = None;
        }
        self.deleted += 1;
        Ok(())
    }
}
