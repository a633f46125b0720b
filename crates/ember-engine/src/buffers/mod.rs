//! Particle render buffers.
//!
//! Responsibilities:
//! - stage per-vertex attributes in fixed-capacity CPU stores
//! - queue the frame's render calls in submission order
//! - upload only the filled prefix of each stream to its GPU buffer
//! - bind the streams and the static index buffer for drawing
//!
//! Layout is non-interleaved: one buffer per attribute stream, elements
//! tightly packed.

mod attribute;
mod config;
mod error;
mod index;
mod locations;
mod manager;
mod render_calls;
mod staging;
mod vertex;

pub use attribute::AttributeStore;
pub use config::RenderBuffersConfig;
pub use error::{BufferError, CapacityKind};
pub use index::{quad_indices, IndexBuffer, QUAD_INDICES, QUAD_VERTICES};
pub use locations::{AttributeLocations, FixedLocations};
pub use manager::{BufferHandles, FrameState, RenderBuffers, UploadStats};
pub use render_calls::{RenderCall, RenderCallQueue};
pub use staging::VertexStagingBuffer;
pub use vertex::{PackedColor, TexChannelSpec, Vertex};
