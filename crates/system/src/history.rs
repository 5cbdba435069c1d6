/// Fixed-capacity rolling history for one metric stream, used as the data
/// behind a scrolling graph.
///
/// Always holds exactly `capacity` values; it starts zero-filled and every
/// `push` overwrites the oldest slot.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots:  Vec<f64>,
    /// Index of the most recently written slot.
    cursor: usize,
}

impl RingBuffer {
    /// A zero-filled buffer. A capacity of `0` is treated as `1`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots:  vec![0.0; capacity],
            cursor: capacity - 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Overwrite the oldest sample with `value`.
    pub fn push(&mut self, value: f64) {
        self.cursor = (self.cursor + 1) % self.slots.len();
        self.slots[self.cursor] = value;
    }

    /// Most recently pushed value (`0.0` before the first push).
    pub fn latest(&self) -> f64 {
        self.slots[self.cursor]
    }

    /// Copy of the whole window, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        let start = (self.cursor + 1) % self.slots.len();
        self.slots[start..]
            .iter()
            .chain(self.slots[..start].iter())
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed_at_full_length() {
        let buf = RingBuffer::new(60);
        assert_eq!(buf.capacity(), 60);
        assert_eq!(buf.snapshot(), vec![0.0; 60]);
        assert_eq!(buf.latest(), 0.0);
    }

    #[test]
    fn exactly_capacity_pushes_come_back_in_order() {
        let mut buf = RingBuffer::new(5);
        for v in 1..=5 {
            buf.push(v as f64);
        }
        assert_eq!(buf.snapshot(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn overflow_evicts_the_earliest_values() {
        let mut buf = RingBuffer::new(4);
        for v in 1..=7 {
            buf.push(v as f64);
        }
        assert_eq!(buf.snapshot(), vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(buf.latest(), 7.0);
    }

    #[test]
    fn partial_fill_keeps_leading_zeros() {
        let mut buf = RingBuffer::new(4);
        buf.push(9.0);
        assert_eq!(buf.snapshot(), vec![0.0, 0.0, 0.0, 9.0]);
    }

    #[test]
    fn snapshot_is_detached_from_later_pushes() {
        let mut buf = RingBuffer::new(3);
        buf.push(1.0);
        let before = buf.snapshot();
        buf.push(2.0);
        assert_eq!(before, vec![0.0, 0.0, 1.0]);
        assert_eq!(buf.snapshot(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = RingBuffer::new(0);
        buf.push(3.0);
        assert_eq!(buf.snapshot(), vec![3.0]);
    }
}
