//! Graphics backend abstraction.
//!
//! The buffer manager only needs a narrow capability set from the graphics
//! driver: create a buffer, upload a sub-range, point an attribute slot at a
//! buffer, bind an index buffer and delete a buffer. [`GraphicsBackend`]
//! captures exactly that.
//!
//! # Available backends
//!
//! - [`WgpuBackend`]: GPU buffers through wgpu
//! - [`HeadlessBackend`]: host-memory buffers for tests and GPU-less runs
//!
//! All calls must happen on the thread that owns the graphics context.

mod error;
mod headless;
mod wgpu_backend;

pub use error::BackendError;
pub use headless::{AttributeBinding, HeadlessBackend, HostBuffer, UploadRecord};
pub use wgpu_backend::{BoundVertexState, WgpuBackend};

/// Opaque identifier of a backend buffer.
///
/// Ids are never reused by a backend instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BufferId(pub(crate) u64);

impl BufferId {
    /// Raw numeric value, for diagnostics.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// What the buffer is read as by the pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Update frequency hint.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    /// Rewritten every frame through [`GraphicsBackend::upload_sub_range`].
    Dynamic,
    /// Contents supplied at creation and never written again.
    Static,
}

/// Buffer creation parameters.
#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub kind: BufferKind,
    pub usage: BufferUsage,
    /// Size in bytes. Ignored when `contents` is provided.
    pub size: u64,
    /// Initial contents (required for [`BufferUsage::Static`]).
    pub contents: Option<&'a [u8]>,
}

impl<'a> BufferDesc<'a> {
    /// Uninitialized buffer rewritten every frame.
    pub fn dynamic(label: &'a str, kind: BufferKind, size: u64) -> Self {
        Self {
            label,
            kind,
            usage: BufferUsage::Dynamic,
            size,
            contents: None,
        }
    }

    /// Immutable buffer initialized from `contents`.
    pub fn with_contents(label: &'a str, kind: BufferKind, contents: &'a [u8]) -> Self {
        Self {
            label,
            kind,
            usage: BufferUsage::Static,
            size: contents.len() as u64,
            contents: Some(contents),
        }
    }
}

/// Per-vertex attribute format.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AttributeFormat {
    /// `n` 32-bit floats, `n` in `1..=4`.
    Float32(u8),
    /// Four unsigned bytes normalized to `[0, 1]`.
    Unorm8x4,
}

impl AttributeFormat {
    /// Number of components read by the shader.
    pub fn components(self) -> u8 {
        match self {
            Self::Float32(n) => n,
            Self::Unorm8x4 => 4,
        }
    }

    /// Size of one element in bytes (the tightly packed stride).
    pub fn size_bytes(self) -> u64 {
        match self {
            Self::Float32(n) => u64::from(n) * 4,
            Self::Unorm8x4 => 4,
        }
    }
}

/// Index element type.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexFormat {
    Uint16,
}

/// Capability set consumed by [`RenderBuffers`](crate::buffers::RenderBuffers).
pub trait GraphicsBackend {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Allocates a buffer. Static buffers are initialized from `desc.contents`.
    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError>;

    /// Copies `data` into `buffer` starting at byte `offset`.
    ///
    /// Bytes outside `[offset, offset + data.len())` are left untouched.
    /// A zero-length upload is a no-op.
    fn upload_sub_range(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError>;

    /// Makes attribute slot `location` read tightly packed `format` elements
    /// from `buffer`, starting at offset 0.
    fn configure_attribute(
        &mut self,
        location: u32,
        buffer: BufferId,
        format: AttributeFormat,
    ) -> Result<(), BackendError>;

    /// Makes `buffer` the active index buffer.
    fn bind_index_buffer(
        &mut self,
        buffer: BufferId,
        format: IndexFormat,
    ) -> Result<(), BackendError>;

    /// Releases the buffer. The id must not be used afterwards.
    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), BackendError>;
}

impl<B: GraphicsBackend + ?Sized> GraphicsBackend for &mut B {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferId, BackendError> {
        (**self).create_buffer(desc)
    }

    fn upload_sub_range(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        (**self).upload_sub_range(buffer, offset, data)
    }

    fn configure_attribute(
        &mut self,
        location: u32,
        buffer: BufferId,
        format: AttributeFormat,
    ) -> Result<(), BackendError> {
        (**self).configure_attribute(location, buffer, format)
    }

    fn bind_index_buffer(
        &mut self,
        buffer: BufferId,
        format: IndexFormat,
    ) -> Result<(), BackendError> {
        (**self).bind_index_buffer(buffer, format)
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> Result<(), BackendError> {
        (**self).delete_buffer(buffer)
    }
}

/// Checks that `[offset, offset + len)` fits inside a buffer of `size` bytes.
pub(crate) fn check_range(
    buffer: BufferId,
    size: u64,
    offset: u64,
    len: u64,
) -> Result<(), BackendError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(BackendError::OutOfRange {
            buffer: buffer.0,
            offset,
            len,
            size,
        }),
    }
}
