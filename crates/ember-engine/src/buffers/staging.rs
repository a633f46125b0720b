use super::attribute::AttributeStore;
use super::error::{BufferError, CapacityKind};
use super::vertex::{PackedColor, TexChannelSpec, Vertex};

/// CPU staging area for one frame of particle vertices.
///
/// One [`AttributeStore`] per attribute class plus a running count. Appends
/// write at `count` and bump it; [`reset`](Self::reset) rewinds without
/// touching memory, since nothing past `count` is ever read.
#[derive(Debug, Clone)]
pub struct VertexStagingBuffer {
    positions: AttributeStore<f32>,
    colors: AttributeStore<PackedColor>,
    tex_channels: Vec<AttributeStore<f32>>,

    /// Sum of channel dimensions; the expected `tex_coords` length.
    tex_coords_per_vertex: usize,

    capacity: usize,
    count: usize,
}

impl VertexStagingBuffer {
    /// Allocates stores for `capacity` vertices and the given channels.
    ///
    /// Channel specs are expected to be validated by the caller.
    pub fn new(capacity: usize, tex_channels: &[TexChannelSpec]) -> Result<Self, BufferError> {
        Ok(Self {
            positions: AttributeStore::new(capacity, 3)?,
            colors: AttributeStore::new(capacity, 1)?,
            tex_channels: tex_channels
                .iter()
                .map(|spec| AttributeStore::new(capacity, spec.dimensions as usize))
                .collect::<Result<_, _>>()?,
            tex_coords_per_vertex: tex_channels.iter().map(|s| s.dimensions as usize).sum(),
            capacity,
            count: 0,
        })
    }

    /// Appends one vertex.
    ///
    /// Fails without writing anything when the buffer is full or when the
    /// vertex's texture coordinates do not match the channel layout.
    pub fn append_vertex(&mut self, v: &Vertex<'_>) -> Result<(), BufferError> {
        if self.count >= self.capacity {
            return Err(BufferError::CapacityExceeded {
                kind: CapacityKind::Vertices,
                capacity: self.capacity,
            });
        }
        if v.tex_coords.len() != self.tex_coords_per_vertex {
            return Err(BufferError::TexCoordMismatch {
                expected: self.tex_coords_per_vertex,
                actual: v.tex_coords.len(),
            });
        }

        let index = self.count;
        self.positions.write(index, &v.position);
        self.colors.write(index, std::slice::from_ref(&v.color));

        let mut rest = v.tex_coords;
        for channel in &mut self.tex_channels {
            let (src, tail) = rest.split_at(channel.width());
            channel.write(index, src);
            rest = tail;
        }

        self.count += 1;
        Ok(())
    }

    /// Rewinds to zero vertices. Storage is kept as is.
    #[inline]
    pub fn reset(&mut self) {
        self.count = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Position store (3 floats per vertex).
    #[inline]
    pub fn positions(&self) -> &AttributeStore<f32> {
        &self.positions
    }

    /// Color store (one packed word per vertex).
    #[inline]
    pub fn colors(&self) -> &AttributeStore<PackedColor> {
        &self.colors
    }

    /// Store of texture channel `index`.
    #[inline]
    pub fn tex_channel(&self, index: usize) -> Option<&AttributeStore<f32>> {
        self.tex_channels.get(index)
    }

    #[inline]
    pub fn tex_channel_count(&self) -> usize {
        self.tex_channels.len()
    }

    /// Staged positions of the current frame, one `[x, y, z]` per vertex.
    pub fn staged_positions(&self) -> &[[f32; 3]] {
        bytemuck::cast_slice(self.positions.elements(self.count))
    }

    /// Staged colors of the current frame.
    pub fn staged_colors(&self) -> &[PackedColor] {
        self.colors.elements(self.count)
    }
}
