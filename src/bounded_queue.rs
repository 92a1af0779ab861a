use std::collections::VecDeque;

/// FIFO buffer shared by producers and consumers.
///
/// There is no locking and no capacity check here: callers hold the queue
/// lock around every call, and the free-slot permits keep `len()` within
/// `capacity()`.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        self.buffer.push_back(value);
    }

    /// Removes the head item, or returns `None` when the queue is empty.
    pub fn pop(&mut self) -> Option<T> {
        self.buffer.pop_front()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
