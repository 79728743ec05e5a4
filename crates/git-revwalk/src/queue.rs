//! Commit queues: the ordering primitives the generator pipeline is
//! built out of (§4.2).
//!
//! Each queue wraps [`git_utils::collections::PriorityQueue`] with the
//! ordering key a given generator needs, so pipeline stages never touch
//! a raw heap directly. All three are stable under equal keys, matching
//! the underlying priority queue's insertion-order tie-break.

use git_hash::ObjectId;
use git_utils::collections::PriorityQueue;

/// Plain insertion-order queue, used by the pending-objects generator
/// (§4.3 step 1) where no reordering is wanted at all.
#[derive(Default)]
pub struct FifoQueue {
    inner: std::collections::VecDeque<ObjectId>,
}

impl FifoQueue {
    pub fn new() -> Self {
        Self {
            inner: std::collections::VecDeque::new(),
        }
    }

    pub fn push(&mut self, id: ObjectId) {
        self.inner.push_back(id);
    }

    pub fn pop(&mut self) -> Option<ObjectId> {
        self.inner.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Orders commits by descending commit time, ties broken by insertion
/// order. Backs `Sorting::COMMIT_TIME_DESC` (the default "git log" order,
/// §4.3 step 0).
pub struct DateQueue {
    inner: PriorityQueue<(i64, ObjectId)>,
}

impl DateQueue {
    pub fn new() -> Self {
        Self {
            inner: PriorityQueue::new(|a: &(i64, ObjectId), b: &(i64, ObjectId)| b.0.cmp(&a.0)),
        }
    }

    pub fn push(&mut self, commit_time: i64, id: ObjectId) {
        self.inner.put((commit_time, id));
    }

    pub fn pop(&mut self) -> Option<ObjectId> {
        self.inner.get().map(|(_, id)| id)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Default for DateQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Orders commits by descending generation number, ties broken by
/// descending commit time and then insertion order. Backs the
/// commit-graph-accelerated topo generator (§4.3 step 4b), which can
/// emit a commit as soon as every higher-generation candidate has
/// already been emitted or excluded.
pub struct GenerationQueue {
    inner: PriorityQueue<(u32, i64, ObjectId)>,
}

impl GenerationQueue {
    pub fn new() -> Self {
        Self {
            inner: PriorityQueue::new(
                |a: &(u32, i64, ObjectId), b: &(u32, i64, ObjectId)| {
                    b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1))
                },
            ),
        }
    }

    pub fn push(&mut self, generation: u32, commit_time: i64, id: ObjectId) {
        self.inner.put((generation, commit_time, id));
    }

    pub fn pop(&mut self) -> Option<ObjectId> {
        self.inner.get().map(|(_, _, id)| id)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Default for GenerationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        ObjectId::from_bytes(&bytes, git_hash::HashAlgorithm::Sha1).unwrap()
    }

    #[test]
    fn fifo_preserves_insertion_order() {
        let mut q = FifoQueue::new();
        q.push(id(1));
        q.push(id(2));
        assert_eq!(q.pop(), Some(id(1)));
        assert_eq!(q.pop(), Some(id(2)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn date_queue_orders_descending() {
        let mut q = DateQueue::new();
        q.push(100, id(1));
        q.push(300, id(2));
        q.push(200, id(3));
        assert_eq!(q.pop(), Some(id(2)));
        assert_eq!(q.pop(), Some(id(3)));
        assert_eq!(q.pop(), Some(id(1)));
    }

    #[test]
    fn date_queue_stable_on_ties() {
        let mut q = DateQueue::new();
        q.push(100, id(1));
        q.push(100, id(2));
        assert_eq!(q.pop(), Some(id(1)));
        assert_eq!(q.pop(), Some(id(2)));
    }

    #[test]
    fn generation_queue_orders_descending_then_by_time() {
        let mut q = GenerationQueue::new();
        q.push(1, 500, id(1));
        q.push(3, 100, id(2));
        q.push(3, 200, id(3));
        assert_eq!(q.pop(), Some(id(3)));
        assert_eq!(q.pop(), Some(id(2)));
        assert_eq!(q.pop(), Some(id(1)));
    }
}
