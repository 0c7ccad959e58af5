//! Bounded FIFO buffer.

use std::collections::VecDeque;

/// Keeps the most recent `capacity` items; the oldest is evicted on overflow.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T: Clone> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Up to `n` items, newest first.
    pub fn recent(&self, n: usize) -> Vec<T> {
        self.items.iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut buf = RingBuffer::new(3);
        for i in 0..5 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.recent(10), vec![4, 3, 2]);
        assert_eq!(buf.recent(1), vec![4]);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut buf = RingBuffer::new(0);
        buf.push(1);
        assert!(buf.is_empty());
    }
}
