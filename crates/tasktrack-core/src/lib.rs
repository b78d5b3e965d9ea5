//! # tasktrack-core
//!
//! Memory layer for hierarchical work items.
//!
//! This crate provides:
//! - `Item` with its three kinds: task, epic, subtask
//! - `TaskStore`, the single coordinator for create/read/update/delete
//! - derived epic status and time window, recomputed on every subtask change
//! - `ScheduleIndex`, an overlap-free index of scheduled items
//! - `HistoryTracker`, a deduplicated most-recent-last access list
//! - JSONL snapshot read/write and a lock-scoped mutation helper
//!
//! Transport, rendering and CLI concerns live in adapter crates
//! (`tasktrack-cli`).
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per record)
//!     ↕  from_lines / to_lines
//! TaskStore ──► items by kind ──► epic ⇐ derived from subtasks
//!           ├─► ScheduleIndex (tasks + subtasks with a window)
//!           └─► HistoryTracker (reads)
//! ```

pub mod atomic_store;
pub mod error;
pub mod history;
pub mod item;
pub mod jsonl;
pub mod schedule;
pub mod shared;
pub mod store;

pub use atomic_store::{
    AtomicStoreMutationError, LockError, LockHolder, load_store_or_empty, mutate_store_jsonl,
    store_lock_path,
};
pub use error::{ErrorKind, StoreError};
pub use history::HistoryTracker;
pub use item::{EpicBody, Item, ItemBody, ItemId, ItemKind, Status};
pub use jsonl::{
    ItemRecord, JsonlError, StoreLine, read_lines, read_lines_from_path, write_lines,
    write_lines_to_path,
};
pub use schedule::{ScheduleIndex, ScheduleKey, ScheduledWindow};
pub use shared::SharedTaskStore;
pub use store::{MAX_RESTORED_ID, TaskStore};
