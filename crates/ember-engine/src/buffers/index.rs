use crate::backend::{BufferDesc, BufferId, BufferKind, GraphicsBackend, IndexFormat};

use super::error::BufferError;

/// Indices of one quad as two triangles sharing the 0–2 diagonal.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Vertices per quad in the [`QUAD_INDICES`] topology.
pub const QUAD_VERTICES: usize = 4;

/// Builds the index list for `max_quads` consecutive quads.
///
/// Quad `q` uses vertices `4q..4q + 4`. Fails when the last vertex would not
/// fit a 16-bit index.
pub fn quad_indices(max_quads: usize) -> Result<Vec<u16>, BufferError> {
    let addressable = usize::from(u16::MAX) + 1;
    let max_vertices = max_quads
        .checked_mul(QUAD_VERTICES)
        .filter(|&n| n <= addressable)
        .ok_or_else(|| {
            BufferError::InvalidConfig(format!(
                "{max_quads} quads need more vertices than 16-bit indices address"
            ))
        })?;
    log::trace!("generating quad indices for {max_vertices} vertices");

    let mut indices = Vec::with_capacity(max_quads * QUAD_INDICES.len());
    for quad in 0..max_quads {
        let base = (quad * QUAD_VERTICES) as u16;
        indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }
    Ok(indices)
}

/// Immutable index list, uploaded once as static GPU content.
#[derive(Debug)]
pub struct IndexBuffer {
    indices: Box<[u16]>,
    gpu: BufferId,
}

impl IndexBuffer {
    pub const FORMAT: IndexFormat = IndexFormat::Uint16;

    /// Copies `indices` and uploads them to a new static index buffer.
    pub fn upload<B: GraphicsBackend>(
        backend: &mut B,
        label: &str,
        indices: &[u16],
    ) -> Result<Self, BufferError> {
        if indices.is_empty() {
            return Err(BufferError::InvalidConfig("index list is empty".to_string()));
        }

        let indices: Box<[u16]> = indices.into();
        let gpu = backend.create_buffer(&BufferDesc::with_contents(
            label,
            BufferKind::Index,
            bytemuck::cast_slice(&indices),
        ))?;

        Ok(Self { indices, gpu })
    }

    #[inline]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Highest vertex referenced, for validation against vertex capacity.
    #[inline]
    pub fn max_index(&self) -> u16 {
        self.indices.iter().copied().max().unwrap_or(0)
    }

    #[inline]
    pub fn buffer(&self) -> BufferId {
        self.gpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BufferUsage, HeadlessBackend};

    #[test]
    fn quads_are_offset_by_four() {
        let indices = quad_indices(2).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn quad_count_limited_by_u16() {
        assert_eq!(quad_indices(16384).unwrap().last(), Some(&65535));
        assert!(quad_indices(16385).is_err());
        assert!(quad_indices(usize::MAX).is_err());
    }

    #[test]
    fn upload_creates_static_buffer() {
        let mut backend = HeadlessBackend::new();
        let ib = IndexBuffer::upload(&mut backend, "idx", &QUAD_INDICES).unwrap();

        let host = backend.buffer(ib.buffer()).unwrap();
        assert_eq!(host.usage, BufferUsage::Static);
        assert_eq!(host.kind, BufferKind::Index);
        assert_eq!(host.data, bytemuck::cast_slice::<u16, u8>(&QUAD_INDICES));
        assert_eq!(ib.max_index(), 3);
    }

    #[test]
    fn empty_index_list_is_rejected() {
        let mut backend = HeadlessBackend::new();
        assert!(IndexBuffer::upload(&mut backend, "idx", &[]).is_err());
        assert_eq!(backend.live_buffers(), 0);
    }
}
