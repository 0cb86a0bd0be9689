use std::{mem, num::NonZeroUsize};

/// Accumulates items into fixed-size batches.
///
/// A full batch is handed back by [`Batcher::push`] as soon as the buffer
/// reaches capacity; [`Batcher::finish`] hands back whatever is left.
#[derive(Debug)]
pub struct Batcher<T> {
    capacity: NonZeroUsize,
    buffer: Vec<T>,
}

impl<T> Batcher<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            buffer: Vec::with_capacity(capacity.get()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Appends `item`, returning the full batch once capacity is reached.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.buffer.push(item);
        if self.buffer.len() >= self.capacity.get() {
            Some(mem::replace(
                &mut self.buffer,
                Vec::with_capacity(self.capacity.get()),
            ))
        } else {
            None
        }
    }

    /// Remaining items, or `None` when there is nothing to flush.
    pub fn finish(self) -> Option<Vec<T>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }
}

#[cfg(test)]
mod test {
    use super::Batcher;
    use std::num::NonZeroUsize;

    fn flush_sizes(items: usize, capacity: usize) -> Vec<usize> {
        let mut batcher = Batcher::new(NonZeroUsize::new(capacity).unwrap());
        let mut sizes = Vec::new();
        for i in 0..items {
            if let Some(batch) = batcher.push(i) {
                sizes.push(batch.len());
            }
        }
        if let Some(rest) = batcher.finish() {
            sizes.push(rest.len());
        }
        sizes
    }

    #[test]
    fn splits_into_full_batches_and_remainder() {
        assert_eq!(flush_sizes(2500, 1000), vec![1000, 1000, 500]);
    }

    #[test]
    fn exact_multiple_has_no_remainder() {
        assert_eq!(flush_sizes(2000, 1000), vec![1000, 1000]);
    }

    #[test]
    fn empty_input_never_flushes() {
        assert!(flush_sizes(0, 1000).is_empty());
    }

    #[test]
    fn preserves_order() {
        let mut batcher = Batcher::new(NonZeroUsize::new(3).unwrap());
        assert_eq!(batcher.push('a'), None);
        assert_eq!(batcher.push('b'), None);
        assert_eq!(batcher.len(), 2);
        assert_eq!(batcher.push('c'), Some(vec!['a', 'b', 'c']));
        assert!(batcher.is_empty());
        assert_eq!(batcher.push('d'), None);
        assert_eq!(batcher.finish(), Some(vec!['d']));
    }
}
