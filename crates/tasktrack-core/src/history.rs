//! Access history: deduplicated, most-recent-last.
//!
//! Each read of an item is recorded here. Re-reading an item moves it to
//! the tail instead of adding a second entry. Nothing is evicted except by
//! an explicit `forget`.
//!
//! Backed by a hash index from ID to slot plus a doubly-linked list kept in
//! a slot arena, so `record` and `forget` are O(1).

use crate::item::ItemId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Node {
    id: ItemId,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Ordered, deduplicated record of item accesses.
#[derive(Debug, Clone, Default)]
pub struct HistoryTracker {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<ItemId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Record an access; `id` becomes the most recent entry.
    pub fn record(&mut self, id: ItemId) {
        if let Some(slot) = self.index.remove(&id) {
            self.unlink(slot);
        }
        let slot = self.push_back(id);
        self.index.insert(id, slot);
    }

    /// Drop the entry for `id`. Returns whether one existed.
    pub fn forget(&mut self, id: ItemId) -> bool {
        match self.index.remove(&id) {
            Some(slot) => {
                self.unlink(slot);
                true
            }
            None => false,
        }
    }

    /// Entries oldest first, most recent last.
    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.node(cursor?)?;
            cursor = node.next;
            Some(node.id)
        })
    }

    /// Owned copy of the entries, oldest first.
    pub fn snapshot(&self) -> Vec<ItemId> {
        self.iter().collect()
    }

    fn node(&self, slot: usize) -> Option<&Node> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: usize) -> Option<&mut Node> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn push_back(&mut self, id: ItemId) -> usize {
        let node = Node {
            id,
            prev: self.tail,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.tail.and_then(|tail| self.node_mut(tail)) {
            Some(tail) => tail.next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        slot
    }

    fn unlink(&mut self, slot: usize) {
        let Some(node) = self.slots.get_mut(slot).and_then(Option::take) else {
            return;
        };

        match node.prev.and_then(|prev| self.node_mut(prev)) {
            Some(prev) => prev.next = node.next,
            None => self.head = node.next,
        }
        match node.next.and_then(|next| self.node_mut(next)) {
            Some(next) => next.prev = node.prev,
            None => self.tail = node.prev,
        }
        self.free.push(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(ids: &[ItemId]) -> HistoryTracker {
        let mut history = HistoryTracker::new();
        for id in ids {
            history.record(*id);
        }
        history
    }

    #[test]
    fn repeated_access_collapses_to_latest_position() {
        let history = tracker(&[1, 2, 3, 4, 1, 3, 2, 4]);
        assert_eq!(history.snapshot(), vec![1, 3, 2, 4]);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn forget_interior_keeps_order() {
        let mut history = tracker(&[1, 2, 3]);
        assert!(history.forget(2));
        assert_eq!(history.snapshot(), vec![1, 3]);
    }

    #[test]
    fn forget_head_and_tail_updates_boundaries() {
        let mut history = tracker(&[1, 2, 3]);
        assert!(history.forget(1));
        assert_eq!(history.snapshot(), vec![2, 3]);

        assert!(history.forget(3));
        assert_eq!(history.snapshot(), vec![2]);

        history.record(4);
        assert_eq!(history.snapshot(), vec![2, 4]);

        assert!(history.forget(2));
        assert!(history.forget(4));
        assert!(history.is_empty());
        assert_eq!(history.snapshot(), Vec::<ItemId>::new());
    }

    #[test]
    fn forget_missing_is_noop() {
        let mut history = tracker(&[1]);
        assert!(!history.forget(9));
        assert_eq!(history.snapshot(), vec![1]);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut history = tracker(&[1, 2, 3]);
        history.forget(2);
        history.record(5);
        history.record(1);
        assert_eq!(history.snapshot(), vec![3, 5, 1]);
        assert_eq!(history.slots.len(), 3);
    }

    #[test]
    fn snapshot_is_detached() {
        let history = tracker(&[1, 2]);
        let mut copy = history.snapshot();
        copy.push(99);
        assert_eq!(history.snapshot(), vec![1, 2]);
    }
}
