//! A `TaskStore` behind one coarse lock, for callers on several threads.
//!
//! Reads record history, so every operation (reads included) takes the
//! lock exclusively.

use crate::store::TaskStore;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SharedTaskStore {
    inner: Arc<Mutex<TaskStore>>,
}

impl SharedTaskStore {
    pub fn new(store: TaskStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<T>(&self, f: impl FnOnce(&mut TaskStore) -> T) -> T {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Recover the store if this is the last handle.
    pub fn try_into_inner(self) -> Result<TaskStore, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<TaskStore> for SharedTaskStore {
    fn from(store: TaskStore) -> Self {
        Self::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemId, ItemKind, Status};
    use std::collections::BTreeSet;
    use std::thread;

    #[test]
    fn concurrent_creates_get_distinct_ids() {
        let shared = SharedTaskStore::default();
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    (0..25)
                        .map(|n| {
                            shared.with(|store| {
                                store.create_task(format!("w{worker}-{n}"), "", Status::New)
                            })
                        })
                        .collect::<Vec<ItemId>>()
                })
            })
            .collect();

        let mut ids = BTreeSet::new();
        for handle in handles {
            for id in handle.join().expect("worker should finish") {
                assert!(ids.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(ids.len(), 100);

        let store = shared.try_into_inner().expect("last handle");
        assert_eq!(store.list(ItemKind::Task).len(), 100);
    }

    #[test]
    fn reads_through_the_lock_record_history() {
        let shared = SharedTaskStore::new(TaskStore::new());
        let id = shared.with(|store| store.create_task("t", "", Status::New));
        shared.with(|store| store.get(ItemKind::Task, id).map(|_| ())).expect("exists");
        assert_eq!(shared.with(|store| store.history_ids()), vec![id]);
    }
}
