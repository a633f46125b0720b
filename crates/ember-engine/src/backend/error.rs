//! Backend error types.

use thiserror::Error;

/// Errors reported by a [`GraphicsBackend`](super::GraphicsBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The id does not name a live buffer of this backend.
    #[error("unknown buffer id {0}")]
    UnknownBuffer(u64),

    /// An upload or readback fell outside the buffer.
    #[error("range {offset}+{len} exceeds buffer {buffer} of {size} bytes")]
    OutOfRange {
        buffer: u64,
        offset: u64,
        len: u64,
        size: u64,
    },

    /// A static buffer was written after creation.
    #[error("buffer {0} is static and cannot be updated")]
    ImmutableBuffer(u64),

    /// The buffer kind does not match the requested binding.
    #[error("buffer {buffer} cannot be bound as {expected}")]
    WrongKind { buffer: u64, expected: &'static str },

    /// Upload offset or length is not a multiple of the copy alignment.
    #[error("upload {offset}+{len} to buffer {buffer} is not {align}-byte aligned")]
    Unaligned {
        buffer: u64,
        offset: u64,
        len: u64,
        align: u64,
    },

    /// The backend cannot express the attribute format.
    #[error("unsupported attribute format {0:?}")]
    UnsupportedFormat(super::AttributeFormat),

    /// Static buffer created without initial contents.
    #[error("static buffer '{0}' needs initial contents")]
    MissingContents(String),

    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Failed to map a buffer for readback.
    #[error("buffer readback failed: {0}")]
    ReadbackFailed(String),
}
