//! Fixed-capacity circular buffer used as the DEFLATE sliding window.
//!
//! Once full, every push evicts the oldest element. `get` indexes from the
//! oldest retained element; `get_from_back` indexes from the most recent.

use num_traits::PrimInt;

pub struct CircularBuffer<T: PrimInt> {
    buffer: Vec<T>,
    capacity: usize,
    size: usize,
    read_idx: usize,
    write_idx: usize,
}

impl<T: PrimInt> CircularBuffer<T> {
    pub fn create(capacity: usize) -> Self {
        Self {
            buffer: vec![T::zero(); capacity],
            capacity,
            size: 0,
            read_idx: 0,
            write_idx: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Push a value, evicting the oldest element if already at capacity.
    pub fn push(&mut self, val: T) {
        self.buffer[self.write_idx] = val;
        self.write_idx += 1;
        if self.write_idx == self.capacity {
            self.write_idx = 0;
        }
        if self.size == self.capacity {
            self.read_idx += 1;
            if self.read_idx == self.capacity {
                self.read_idx = 0;
            }
        } else {
            self.size += 1;
        }
    }

    /// Value at `idx`, 0-based from the oldest retained element.
    pub fn get(&self, idx: usize) -> T {
        let mut real_idx = self.read_idx + idx;
        if real_idx >= self.capacity {
            real_idx -= self.capacity;
        }
        self.buffer[real_idx]
    }

    /// Value at `idx`, 0-based from the newest (most recently pushed) element.
    pub fn get_from_back(&self, idx: usize) -> T {
        self.get(self.size - idx - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_then_evicts() {
        let mut cb: CircularBuffer<u8> = CircularBuffer::create(4);
        for b in [1u8, 2, 3] {
            cb.push(b);
        }
        assert!(!cb.is_full());
        assert_eq!(cb.len(), 3);
        assert_eq!(cb.get(0), 1);
        assert_eq!(cb.get_from_back(0), 3);

        cb.push(4);
        assert!(cb.is_full());
        // now full: [1,2,3,4], push 5 evicts 1
        cb.push(5);
        assert_eq!(cb.len(), 4);
        assert_eq!(cb.get(0), 2);
        assert_eq!(cb.get(3), 5);
        assert_eq!(cb.get_from_back(0), 5);
        assert_eq!(cb.get_from_back(3), 2);
    }

    #[test]
    fn wraps_indefinitely() {
        let mut cb: CircularBuffer<u8> = CircularBuffer::create(3);
        for i in 0..100u8 {
            cb.push(i);
        }
        assert_eq!(cb.get_from_back(0), 99);
        assert_eq!(cb.get_from_back(1), 98);
        assert_eq!(cb.get_from_back(2), 97);
    }
}
