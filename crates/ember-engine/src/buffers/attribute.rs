use bytemuck::Pod;

use super::error::BufferError;

/// Fixed-capacity CPU array backing one vertex attribute stream.
///
/// Holds `capacity × width` scalars laid out attribute-major: element `i`
/// occupies `[i * width, (i + 1) * width)`.
///
/// Invariants:
/// - storage is allocated once in [`AttributeStore::new`] and never resized
/// - `width >= 1`
#[derive(Debug, Clone)]
pub struct AttributeStore<T> {
    data: Box<[T]>,
    width: usize,
}

impl<T: Pod> AttributeStore<T> {
    /// Allocates zeroed storage for `capacity` elements of `width` scalars.
    ///
    /// Fails when the store's size in bytes does not fit `usize`.
    pub fn new(capacity: usize, width: usize) -> Result<Self, BufferError> {
        debug_assert!(width > 0, "attribute width must be non-zero");
        let len = capacity
            .checked_mul(width)
            .filter(|len| len.checked_mul(std::mem::size_of::<T>()).is_some())
            .ok_or_else(|| {
                BufferError::InvalidConfig(format!(
                    "{capacity} elements of width {width} overflow the address space"
                ))
            })?;

        Ok(Self {
            data: vec![T::zeroed(); len].into_boxed_slice(),
            width,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len() / self.width
    }

    /// Scalars per element.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Bytes per element.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.width * std::mem::size_of::<T>()
    }

    /// Total allocation in bytes.
    #[inline]
    pub fn byte_capacity(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }

    /// Overwrites element `index` with `values`.
    ///
    /// # Panics
    /// Panics if `index >= capacity` or `values.len() != width`. Callers
    /// enforce both before writing.
    #[inline]
    pub fn write(&mut self, index: usize, values: &[T]) {
        let start = index * self.width;
        self.data[start..start + self.width].copy_from_slice(values);
    }

    /// The first `count` elements as scalars.
    #[inline]
    pub fn elements(&self, count: usize) -> &[T] {
        &self.data[..count * self.width]
    }

    /// The first `count` elements as raw bytes, ready for upload.
    #[inline]
    pub fn as_bytes(&self, count: usize) -> &[u8] {
        bytemuck::cast_slice(self.elements(count))
    }
}
