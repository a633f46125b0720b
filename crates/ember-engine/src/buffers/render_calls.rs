use super::error::{BufferError, CapacityKind};

/// Default draw-call descriptor: one material over a range of the index buffer.
///
/// [`RenderCallQueue`] never looks inside; producers with their own
/// descriptor type use that instead.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RenderCall {
    /// Material id understood by the draw-submission loop.
    pub material: u32,
    /// First index in the index buffer.
    pub start_index: u32,
    pub num_indices: u32,
}

impl RenderCall {
    #[inline]
    pub const fn new(material: u32, start_index: u32, num_indices: u32) -> Self {
        Self {
            material,
            start_index,
            num_indices,
        }
    }

    /// Index range for `draw_indexed`, clamped at `u32::MAX`.
    #[inline]
    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.start_index..self.start_index.saturating_add(self.num_indices)
    }
}

/// Fixed-capacity, insertion-ordered list of render calls for one frame.
///
/// Storage is reserved once; appends never reallocate.
#[derive(Debug, Clone)]
pub struct RenderCallQueue<R> {
    calls: Vec<R>,
    capacity: usize,
}

impl<R> RenderCallQueue<R> {
    pub fn new(capacity: usize) -> Self {
        Self {
            calls: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `call` after the ones already queued.
    pub fn append(&mut self, call: R) -> Result<(), BufferError> {
        if self.calls.len() >= self.capacity {
            return Err(BufferError::CapacityExceeded {
                kind: CapacityKind::RenderCalls,
                capacity: self.capacity,
            });
        }
        self.calls.push(call);
        Ok(())
    }

    /// Drops all queued calls, keeping the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.calls.clear();
    }

    /// Queued calls in insertion order.
    #[inline]
    pub fn as_slice(&self) -> &[R] {
        &self.calls
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut queue = RenderCallQueue::new(3);
        queue.append(RenderCall::new(2, 0, 6)).unwrap();
        queue.append(RenderCall::new(1, 6, 12)).unwrap();

        let materials: Vec<u32> = queue.as_slice().iter().map(|rc| rc.material).collect();
        assert_eq!(materials, vec![2, 1]);
        assert_eq!(queue.as_slice()[1].index_range(), 6..18);
    }

    #[test]
    fn index_range_clamps_at_u32_max() {
        let rc = RenderCall::new(0, u32::MAX - 2, 6);
        assert_eq!(rc.index_range(), u32::MAX - 2..u32::MAX);
    }

    #[test]
    fn rejects_past_capacity() {
        let mut queue = RenderCallQueue::new(1);
        queue.append(RenderCall::default()).unwrap();

        assert_eq!(
            queue.append(RenderCall::default()),
            Err(BufferError::CapacityExceeded {
                kind: CapacityKind::RenderCalls,
                capacity: 1
            })
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn reset_keeps_allocation() {
        let mut queue: RenderCallQueue<u64> = RenderCallQueue::new(4);
        for i in 0..4 {
            queue.append(i).unwrap();
        }
        queue.reset();

        assert!(queue.is_empty());
        assert!(queue.calls.capacity() >= 4);
        queue.append(9).unwrap();
        assert_eq!(queue.as_slice(), &[9]);
    }
}
