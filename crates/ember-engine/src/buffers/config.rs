use super::error::BufferError;
use super::index::QUAD_VERTICES;
use super::vertex::TexChannelSpec;

/// Initialization parameters for [`RenderBuffers`](super::RenderBuffers).
///
/// Every size here is a hard ceiling for the lifetime of the buffers.
#[derive(Debug, Clone)]
pub struct RenderBuffersConfig {
    /// Vertices that fit in one frame.
    pub max_vertices: usize,

    /// Texture channels carried per vertex.
    ///
    /// `bind` supports zero or one channel; extra channels are staged and
    /// uploaded but cannot be bound.
    pub tex_channels: Vec<TexChannelSpec>,

    /// Render calls that fit in one frame.
    pub max_render_calls: usize,

    /// Prefix for backend buffer labels.
    pub label: String,
}

impl Default for RenderBuffersConfig {
    fn default() -> Self {
        Self {
            max_vertices: 4 * 1024,
            tex_channels: vec![TexChannelSpec::new(2)],
            max_render_calls: 256,
            label: "ember particles".to_string(),
        }
    }
}

impl RenderBuffersConfig {
    /// Room for `max_quads` quad particles (four vertices each).
    ///
    /// Saturates on overflow; the oversized store is rejected at initialize.
    pub fn quads(max_quads: usize) -> Self {
        Self {
            max_vertices: max_quads.saturating_mul(QUAD_VERTICES),
            ..Self::default()
        }
    }

    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }

    pub fn with_tex_channels(mut self, channels: impl IntoIterator<Item = TexChannelSpec>) -> Self {
        self.tex_channels = channels.into_iter().collect();
        self
    }

    pub fn with_max_render_calls(mut self, max_render_calls: usize) -> Self {
        self.max_render_calls = max_render_calls;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Checks sizes and channel dimensions.
    pub fn validate(&self) -> Result<(), BufferError> {
        if self.max_vertices == 0 {
            return Err(BufferError::InvalidConfig("max_vertices must be non-zero".to_string()));
        }
        if self.max_render_calls == 0 {
            return Err(BufferError::InvalidConfig(
                "max_render_calls must be non-zero".to_string(),
            ));
        }
        if let Some((channel, spec)) = self
            .tex_channels
            .iter()
            .enumerate()
            .find(|(_, spec)| !spec.is_valid())
        {
            return Err(BufferError::InvalidChannelDimensions {
                channel,
                dimensions: spec.dimensions,
            });
        }
        Ok(())
    }
}
