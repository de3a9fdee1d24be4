//! Bounded reader registry.
//!
//! Fixed-capacity ordered array of (task, delivery queue) pairs plus a
//! count. Slots at index `>= count` are absent whatever they contain.
//!
//! # Invariants
//!
//! - `count <= N`
//! - At most one entry per task (enforced by the caller holding the gate)
//! - Removal shifts later entries left, so relative order is stable and no
//!   stale or duplicated entry is left behind

use crate::platform::{QueueId, TaskId};

/// One registered reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderEntry {
    pub task: TaskId,
    pub queue: QueueId,
}

impl ReaderEntry {
    /// Vacant slot contents.
    pub const EMPTY: Self = Self {
        task: TaskId::NONE,
        queue: QueueId::NULL,
    };
}

/// Registry of readers with capacity `N`.
#[derive(Clone, Debug)]
pub struct ReaderRegistry<const N: usize> {
    slots: [ReaderEntry; N],
    count: usize,
}

impl<const N: usize> ReaderRegistry<N> {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            slots: [ReaderEntry::EMPTY; N],
            count: 0,
        }
    }

    /// Append a reader.
    ///
    /// Returns `false` if the registry is full. Does not check for an
    /// existing entry for `task`; see [`Handler::open_read`](crate::Handler::open_read).
    pub fn add(&mut self, task: TaskId, queue: QueueId) -> bool {
        if self.count == N {
            return false;
        }

        self.slots[self.count] = ReaderEntry { task, queue };
        self.count += 1;
        true
    }

    /// Remove the first entry owned by `task`. No-op if absent.
    ///
    /// Returns the removed entry.
    pub fn remove(&mut self, task: TaskId) -> Option<ReaderEntry> {
        let idx = self.position(task)?;
        let removed = self.slots[idx];

        // Shift the remaining readers left by one slot
        self.slots.copy_within(idx + 1..self.count, idx);
        self.count -= 1;
        self.slots[self.count] = ReaderEntry::EMPTY;

        Some(removed)
    }

    /// Delivery queue of the first entry owned by `task`.
    pub fn lookup(&self, task: TaskId) -> Option<QueueId> {
        self.position(task).map(|idx| self.slots[idx].queue)
    }

    #[inline]
    pub fn contains(&self, task: TaskId) -> bool {
        self.position(task).is_some()
    }

    fn position(&self, task: TaskId) -> Option<usize> {
        self.entries().iter().position(|entry| entry.task == task)
    }

    /// Active entries in insertion order.
    #[inline]
    pub fn entries(&self) -> &[ReaderEntry] {
        &self.slots[..self.count]
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ReaderEntry> {
        self.entries().iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for ReaderRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(n: u32) -> TaskId {
        TaskId::new(n)
    }

    fn queue(n: u16) -> QueueId {
        QueueId::new(n)
    }

    #[test]
    fn test_add_uses_first_slot() {
        let mut registry = ReaderRegistry::<2>::new();

        assert!(registry.add(task(1), queue(10)));
        assert_eq!(registry.entries()[0], ReaderEntry { task: task(1), queue: queue(10) });
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_fails_when_full() {
        let mut registry = ReaderRegistry::<2>::new();

        assert!(registry.add(task(1), queue(10)));
        assert!(registry.add(task(2), queue(20)));
        assert!(registry.is_full());
        assert!(!registry.add(task(3), queue(30)));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup(task(3)), None);
    }

    #[test]
    fn test_remove_compacts_in_order() {
        let mut registry = ReaderRegistry::<4>::new();
        for n in 1..=4 {
            registry.add(task(n), queue(n as u16 * 10));
        }

        let removed = registry.remove(task(2));
        assert_eq!(removed, Some(ReaderEntry { task: task(2), queue: queue(20) }));

        let order: Vec<u32> = registry.iter().map(|e| e.task.raw()).collect();
        assert_eq!(order, vec![1, 3, 4]);
        assert_eq!(registry.lookup(task(2)), None);
        assert_eq!(registry.lookup(task(1)), Some(queue(10)));
        assert_eq!(registry.lookup(task(3)), Some(queue(30)));
        assert_eq!(registry.lookup(task(4)), Some(queue(40)));
    }

    #[test]
    fn test_remove_last_and_only() {
        let mut registry = ReaderRegistry::<2>::new();
        registry.add(task(1), queue(10));
        registry.add(task(2), queue(20));

        registry.remove(task(2));
        assert_eq!(registry.len(), 1);
        registry.remove(task(1));
        assert!(registry.is_empty());

        // Slot 0 is reusable after full drain
        assert!(registry.add(task(3), queue(30)));
        assert_eq!(registry.entries()[0].task, task(3));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut registry = ReaderRegistry::<2>::new();
        registry.add(task(1), queue(10));

        assert_eq!(registry.remove(task(9)), None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(task(1)), Some(queue(10)));
    }

    #[test]
    fn test_duplicate_add_lookup_sees_first() {
        let mut registry = ReaderRegistry::<3>::new();
        registry.add(task(1), queue(10));
        registry.add(task(1), queue(11));

        assert_eq!(registry.lookup(task(1)), Some(queue(10)));
        registry.remove(task(1));
        assert_eq!(registry.lookup(task(1)), Some(queue(11)));
    }

    #[test]
    fn test_no_stale_tail_after_remove() {
        let mut registry = ReaderRegistry::<3>::new();
        registry.add(task(1), queue(10));
        registry.add(task(2), queue(20));
        registry.remove(task(1));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries(), &[ReaderEntry { task: task(2), queue: queue(20) }]);
        assert!(!registry.contains(task(1)));
    }

    #[test]
    fn test_random_sequences_respect_capacity() {
        // Deterministic pseudo-random add/remove mix against a Vec model
        let mut registry = ReaderRegistry::<5>::new();
        let mut model: Vec<(u32, u16)> = Vec::new();
        let mut seed: u32 = 0x2545_f491;

        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let t = seed % 8 + 1;

            if seed & 0x100 == 0 {
                if !model.iter().any(|&(mt, _)| mt == t) {
                    let q = (seed % 500 + 1) as u16;
                    let added = registry.add(task(t), queue(q));
                    assert_eq!(added, model.len() < 5);
                    if added {
                        model.push((t, q));
                    }
                }
            } else {
                registry.remove(task(t));
                model.retain(|&(mt, _)| mt != t);
            }

            assert!(registry.len() <= registry.capacity());
            assert_eq!(registry.len(), model.len());
            for t in 1..=8 {
                let expected = model.iter().find(|&&(mt, _)| mt == t).map(|&(_, q)| queue(q));
                assert_eq!(registry.lookup(task(t)), expected);
            }
        }
    }
}
