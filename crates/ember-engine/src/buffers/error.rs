//! Buffer manager error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Which fixed-capacity store rejected an append.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CapacityKind {
    Vertices,
    RenderCalls,
}

impl std::fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertices => f.write_str("vertices"),
            Self::RenderCalls => f.write_str("render calls"),
        }
    }
}

/// Errors raised by the staging buffers and [`RenderBuffers`](super::RenderBuffers).
///
/// All of these are caller contract violations; none is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Append beyond the capacity fixed at initialization.
    #[error("capacity exceeded: {kind} limited to {capacity}")]
    CapacityExceeded { kind: CapacityKind, capacity: usize },

    /// `bind` supports zero or one texture channel.
    #[error("bind supports at most one texture channel, manager has {0}")]
    UnsupportedChannelCount(usize),

    /// Vertex texture coordinates do not match the channel layout.
    #[error("vertex carries {actual} texture coordinates, channels expect {expected}")]
    TexCoordMismatch { expected: usize, actual: usize },

    /// Texture channel dimensions must be in `1..=4`.
    #[error("texture channel {channel} has {dimensions} dimensions (expected 1..=4)")]
    InvalidChannelDimensions { channel: usize, dimensions: u8 },

    /// Rejected initialization parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("render buffers used before initialize")]
    UseBeforeInit,

    #[error("render buffers used after shutdown")]
    UseAfterShutdown,

    #[error("render buffers are already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BufferError::CapacityExceeded {
            kind: CapacityKind::Vertices,
            capacity: 4,
        };
        assert_eq!(err.to_string(), "capacity exceeded: vertices limited to 4");

        let err = BufferError::from(BackendError::UnknownBuffer(3));
        assert_eq!(err.to_string(), "unknown buffer id 3");
    }
}
