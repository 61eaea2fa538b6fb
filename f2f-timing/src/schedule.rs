use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

struct Entry<E> {
    deadline_ns: u64,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Entry<E> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline_ns == other.deadline_ns && self.seq == other.seq
    }
}

impl<E> Eq for Entry<E> {}

impl<E> PartialOrd for Entry<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Entry<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.deadline_ns, self.seq).cmp(&(other.deadline_ns, other.seq))
    }
}

/// Events waiting for a deadline on a cooperative loop.
///
/// Events with the same deadline come out in the order they were pushed.
pub struct DeferredQueue<E> {
    heap: BinaryHeap<Reverse<Entry<E>>>,
    next_seq: u64,
}

impl<E> DeferredQueue<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, deadline_ns: u64, event: E) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry {
            deadline_ns,
            seq,
            event,
        }));
    }

    /// Removes the earliest event whose deadline is `<= now_ns`.
    pub fn pop_due(&mut self, now_ns: u64) -> Option<E> {
        match self.heap.peek() {
            Some(Reverse(entry)) if entry.deadline_ns <= now_ns => {
                self.heap.pop().map(|Reverse(entry)| entry.event)
            }
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(entry)| entry.deadline_ns)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl<E> Default for DeferredQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_fires_before_its_deadline() {
        let mut q = DeferredQueue::new();
        q.push(3_000, "fixation");
        assert_eq!(q.pop_due(2_999), None);
        assert_eq!(q.next_deadline(), Some(3_000));
        assert_eq!(q.pop_due(3_000), Some("fixation"));
        assert!(q.is_empty());
    }

    #[test]
    fn earliest_first_then_fifo() {
        let mut q = DeferredQueue::new();
        q.push(50, 'c');
        q.push(10, 'a');
        q.push(10, 'b');
        let fired: Vec<_> = std::iter::from_fn(|| q.pop_due(100)).collect();
        assert_eq!(fired, ['a', 'b', 'c']);
        assert_eq!(q.next_deadline(), None);
    }
}
