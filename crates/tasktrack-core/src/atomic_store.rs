//! Read-modify-write of a JSONL store file under an exclusive lock file.
//!
//! The lock is `<store>.lock`, created with `create_new` and removed on drop.
//! It holds a small JSON record naming the holder, so a caller that finds the
//! lock taken can report which process has it and since when.

use crate::jsonl::JsonlError;
use crate::store::TaskStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "tasktrack::atomic_store";

pub fn store_lock_path(store_path: &Path) -> PathBuf {
    let mut path: OsString = store_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at: DateTime<Utc>,
}

impl LockHolder {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// Holder recorded in an existing lock file, if it is readable.
    pub fn read(lock_path: &Path) -> Option<Self> {
        let text = fs::read_to_string(lock_path).ok()?;
        serde_json::from_str(&text).ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("store lock busy: {}{}", .path.display(), held_by(.holder))]
    Busy {
        path: PathBuf,
        holder: Option<LockHolder>,
    },

    #[error("failed to acquire store lock {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn held_by(holder: &Option<LockHolder>) -> String {
    match holder {
        Some(h) => format!(" (held by pid {} since {})", h.pid, h.acquired_at.to_rfc3339()),
        None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AtomicStoreMutationError<E> {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Store(#[from] JsonlError),

    #[error("{0}")]
    Mutation(E),
}

/// Load the store at `path`, or an empty store if the file does not exist.
pub fn load_store_or_empty(path: impl AsRef<Path>) -> Result<TaskStore, JsonlError> {
    let path = path.as_ref();
    if path.exists() {
        TaskStore::load_jsonl(path)
    } else {
        Ok(TaskStore::new())
    }
}

/// Load, mutate and (maybe) save the store at `path` while holding its lock.
///
/// `mutator` returns the caller's value plus whether the store changed; only
/// a changed store is written back. A mutator error discards the in-memory
/// edits and leaves the file as it was.
pub fn mutate_store_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicStoreMutationError<E>>
where
    F: FnOnce(&mut TaskStore) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let lock = StoreLock::acquire(path)?;

    let mut store = load_store_or_empty(path)?;
    let (value, changed) = mutator(&mut store).map_err(AtomicStoreMutationError::Mutation)?;
    if changed {
        store.save_jsonl(path)?;
        tracing::debug!(
            target: LOG_TARGET,
            path = %path.display(),
            pid = lock.holder.pid,
            items = store.len(),
            "store persisted"
        );
    }
    Ok(value)
}

struct StoreLock {
    path: PathBuf,
    holder: LockHolder,
}

impl StoreLock {
    fn acquire(store_path: &Path) -> Result<Self, LockError> {
        let path = store_lock_path(store_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| lock_io(&path, e))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let holder = LockHolder::read(&path);
                tracing::warn!(target: LOG_TARGET, path = %path.display(), ?holder, "store lock busy");
                return Err(LockError::Busy { path, holder });
            }
            Err(err) => return Err(lock_io(&path, err)),
        };

        let holder = LockHolder::current();
        if let Err(err) = write_holder(&mut file, &holder) {
            let _ = fs::remove_file(&path);
            return Err(lock_io(&path, err));
        }
        Ok(Self { path, holder })
    }
}

fn lock_io(path: &Path, source: io::Error) -> LockError {
    LockError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn write_holder(file: &mut File, holder: &LockHolder) -> io::Result<()> {
    serde_json::to_writer(&mut *file, holder)?;
    file.write_all(b"\n")?;
    file.sync_all()
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
