//! JSONL storage: one line per record.
//!
//! A store snapshot is written as
//!
//! ```text
//! {"record":"meta","next_id":7}
//! {"record":"item","id":1,"kind":"task",...}
//! {"record":"item","id":2,"kind":"epic",...}
//! {"record":"history","ids":[2,1]}
//! ```
//!
//! Loading replays the items through `TaskStore` so every derived value
//! and the schedule are rebuilt rather than trusted from disk.

use crate::error::StoreError;
use crate::item::{Item, ItemId, ItemKind, Status};
use crate::store::TaskStore;
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One line of a store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum StoreLine {
    Meta { next_id: ItemId },
    Item(ItemRecord),
    History { ids: Vec<ItemId> },
}

/// Flat, serializable form of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration_secs: i64,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id(),
            kind: item.kind(),
            name: item.name().to_string(),
            description: item.description().to_string(),
            status: item.status(),
            parent_id: item.parent_id(),
            start_time: item.start_time(),
            duration_secs: item.duration().num_seconds(),
        }
    }
}

impl ItemRecord {
    /// Unscheduled item carrying this record's identity and content.
    fn to_item(&self) -> Result<Item, StoreError> {
        match self.kind {
            ItemKind::Task => Ok(Item::task(
                self.id,
                &self.name,
                &self.description,
                self.status,
            )),
            ItemKind::Epic => Ok(Item::epic(self.id, &self.name, &self.description)),
            ItemKind::Subtask => {
                let parent_id = self.parent_id.ok_or_else(|| {
                    StoreError::InvalidArgument(format!("subtask {} has no parent_id", self.id))
                })?;
                Item::subtask(
                    self.id,
                    parent_id,
                    &self.name,
                    &self.description,
                    self.status,
                )
            }
        }
    }

    fn window(&self) -> Result<Option<(Option<NaiveDateTime>, TimeDelta)>, StoreError> {
        if self.start_time.is_none() && self.duration_secs == 0 {
            return Ok(None);
        }
        let duration = TimeDelta::try_seconds(self.duration_secs).ok_or_else(|| {
            StoreError::InvalidArgument(format!(
                "item {}: duration {}s out of range",
                self.id, self.duration_secs
            ))
        })?;
        Ok(Some((self.start_time, duration)))
    }
}

impl TaskStore {
    /// Snapshot the store as JSONL lines: meta, items in ID order, history.
    pub fn to_lines(&self) -> Vec<StoreLine> {
        let mut items: Vec<&Item> = [ItemKind::Task, ItemKind::Epic, ItemKind::Subtask]
            .into_iter()
            .flat_map(|kind| self.list(kind))
            .collect();
        items.sort_by_key(|item| item.id());

        let mut lines = Vec::with_capacity(items.len() + 2);
        lines.push(StoreLine::Meta {
            next_id: self.next_id(),
        });
        lines.extend(items.into_iter().map(|item| StoreLine::Item(item.into())));
        lines.push(StoreLine::History {
            ids: self.history_ids(),
        });
        lines
    }

    /// Rebuild a store from snapshot lines.
    ///
    /// Duplicate item IDs resolve last-write-wins. Epic status and window
    /// on disk are ignored and re-derived. Time windows are replayed in ID
    /// order through the conflict check.
    pub fn from_lines(lines: impl IntoIterator<Item = StoreLine>) -> Result<Self, StoreError> {
        let mut next_id = 1;
        let mut records: BTreeMap<ItemId, ItemRecord> = BTreeMap::new();
        let mut history = Vec::new();
        for line in lines {
            match line {
                StoreLine::Meta { next_id: n } => next_id = next_id.max(n),
                StoreLine::Item(record) => {
                    records.insert(record.id, record);
                }
                StoreLine::History { ids } => history = ids,
            }
        }

        let mut store = TaskStore::new();
        for record in records.values().filter(|r| r.kind == ItemKind::Epic) {
            store.restore_item(record.to_item()?)?;
        }
        for record in records.values().filter(|r| r.kind != ItemKind::Epic) {
            store.restore_item(record.to_item()?)?;
            if let Some((start, duration)) = record.window()? {
                store.set_time_window(record.id, start, duration)?;
            }
        }
        store.reserve_ids(next_id)?;

        for id in history {
            store.record_access(id);
        }
        Ok(store)
    }

    /// Load store state from a JSONL file.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, JsonlError> {
        let lines = read_lines_from_path(path)?;
        Ok(Self::from_lines(lines)?)
    }

    /// Persist store state to a JSONL file.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), JsonlError> {
        write_lines_to_path(path, &self.to_lines())
    }
}

/// Read snapshot lines from a JSONL reader.
pub fn read_lines(reader: impl BufRead) -> Result<Vec<StoreLine>, JsonlError> {
    let mut lines = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JsonlError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed: StoreLine = serde_json::from_str(trimmed)
            .map_err(|e| JsonlError::Parse(line_no + 1, e.to_string()))?;
        lines.push(parsed);
    }
    Ok(lines)
}

/// Write snapshot lines to a JSONL writer.
pub fn write_lines(writer: &mut impl Write, lines: &[StoreLine]) -> Result<(), JsonlError> {
    for line in lines {
        let text =
            serde_json::to_string(line).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writeln!(writer, "{text}").map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read snapshot lines from a JSONL file path.
pub fn read_lines_from_path(path: impl AsRef<Path>) -> Result<Vec<StoreLine>, JsonlError> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).map_err(|e| JsonlError::Io(0, format!("{}: {e}", path.display())))?;
    validate_bytes(path, &bytes)?;
    read_lines(BufReader::new(bytes.as_slice()))
}

/// Write snapshot lines to a JSONL file path, replacing it atomically.
pub fn write_lines_to_path(path: impl AsRef<Path>, lines: &[StoreLine]) -> Result<(), JsonlError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| JsonlError::Io(0, format!("{parent:?}: {e}")))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), JsonlError> {
        let file = File::create(&tmp_path)
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        write_lines(&mut writer, lines)?;
        writer
            .flush()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        let file = writer
            .into_inner()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        JsonlError::Io(
            0,
            format!("{} -> {}: {e}", tmp_path.display(), path.display()),
        )
    })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent)
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", parent.display())))?;
        dir.sync_all()
            .map_err(|e| JsonlError::Io(0, format!("{}: {e}", parent.display())))?;
    }

    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_bytes(path: &Path, bytes: &[u8]) -> Result<(), JsonlError> {
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted store file: {0}")]
    Corrupt(String),

    #[error("cannot rebuild store: {0}")]
    Restore(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MAX_RESTORED_ID;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 15)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid fixture time")
    }

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "tasktrack-jsonl-{prefix}-{}-{unique}.jsonl",
            std::process::id()
        ))
    }

    fn sample_store() -> TaskStore {
        let mut store = TaskStore::new();
        let task = store.create_task("Task 1", "first", Status::InProgress);
        store
            .set_time_window(task, Some(at(10, 0)), TimeDelta::minutes(60))
            .expect("task window");
        let epic = store.create_epic("Epic 1", "");
        let s1 = store
            .create_subtask(epic, "Subtask 1", "", Status::New)
            .expect("s1");
        store
            .set_time_window(s1, Some(at(14, 0)), TimeDelta::minutes(45))
            .expect("s1 window");
        store
            .create_subtask(epic, "Subtask 2", "", Status::Done)
            .expect("s2");
        store.get(ItemKind::Subtask, s1).expect("s1");
        store.get(ItemKind::Task, task).expect("task");
        store
    }

    #[test]
    fn snapshot_rebuilds_equivalent_store() {
        let store = sample_store();
        let lines = store.to_lines();
        let restored = TaskStore::from_lines(lines.clone()).expect("restore");

        assert_eq!(restored.to_lines(), lines);
        assert_eq!(restored.next_id(), store.next_id());
        let epic = restored.item(ItemKind::Epic, 2).expect("epic");
        assert_eq!(epic.status(), Status::InProgress);
        assert_eq!(epic.end_time(), Some(at(14, 45)));
        assert_eq!(restored.history_ids(), vec![3, 1]);
    }

    #[test]
    fn counter_survives_deleting_the_newest_item() {
        let mut store = sample_store();
        let last = store.create_task("doomed", "", Status::New);
        store.delete(ItemKind::Task, last);

        let mut restored = TaskStore::from_lines(store.to_lines()).expect("restore");
        assert_eq!(restored.create_task("fresh", "", Status::New), last + 1);
    }

    #[test]
    fn subtask_with_unknown_parent_is_rejected() {
        let raw = r#"{"record":"item","id":2,"kind":"subtask","name":"orphan","parent_id":9}"#;
        let lines = read_lines(raw.as_bytes()).expect("line parses");
        let err = TaskStore::from_lines(lines).expect_err("parent missing");
        assert!(matches!(err, StoreError::NotFound { kind: ItemKind::Epic, id: 9 }));
    }

    #[test]
    fn overlapping_windows_on_disk_are_rejected() {
        let raw = concat!(
            r#"{"record":"item","id":1,"kind":"task","name":"a","start_time":"2025-09-15T09:00:00","duration_secs":7200}"#,
            "\n",
            r#"{"record":"item","id":2,"kind":"task","name":"b","start_time":"2025-09-15T10:00:00","duration_secs":3600}"#,
        );
        let lines = read_lines(raw.as_bytes()).expect("lines parse");
        let err = TaskStore::from_lines(lines).expect_err("windows overlap");
        assert!(matches!(err, StoreError::TimeConflict { id: 2, .. }));
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        for raw in [
            r#"{"record":"meta","next_id":18446744073709551615}"#,
            r#"{"record":"meta","next_id":9223372036854775808}"#,
            r#"{"record":"item","id":18446744073709551615,"kind":"task","name":"last"}"#,
            r#"{"record":"item","id":9223372036854775807,"kind":"epic","name":"edge"}"#,
        ] {
            let lines = read_lines(raw.as_bytes()).expect("line parses");
            let err = TaskStore::from_lines(lines).expect_err("id out of range");
            assert!(matches!(err, StoreError::InvalidArgument(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn highest_restorable_counter_keeps_allocating() {
        let raw = r#"{"record":"meta","next_id":9223372036854775807}"#;
        let lines = read_lines(raw.as_bytes()).expect("line parses");
        let mut store = TaskStore::from_lines(lines).expect("restore");
        let first = store.create_task("a", "", Status::New);
        let second = store.create_task("b", "", Status::New);
        assert_eq!(first, MAX_RESTORED_ID);
        assert_eq!(second, MAX_RESTORED_ID + 1);
    }

    #[test]
    fn read_lines_skips_comments_and_reports_line_numbers() {
        let raw = "# header\n\n{\"record\":\"meta\",\"next_id\":4}\nnot json\n";
        let err = read_lines(raw.as_bytes()).expect_err("line 4 is invalid");
        assert!(matches!(err, JsonlError::Parse(4, _)));
    }

    #[test]
    fn read_lines_from_path_rejects_nul_payload() {
        let path = temp_path("nul");
        fs::write(&path, b"{\"record\":\"meta\",\"next_id\":1}\n\0garbage")
            .expect("fixture should write");

        match read_lines_from_path(&path) {
            Err(JsonlError::Corrupt(message)) => assert!(message.contains("contains NUL")),
            other => panic!("expected corrupt store error, got {other:?}"),
        }

        let _ = fs::remove_file(path);
    }

    #[test]
    fn save_and_load_round_trip_through_file() {
        let path = temp_path("save-load");
        let store = sample_store();
        store.save_jsonl(&path).expect("save should succeed");

        let loaded = TaskStore::load_jsonl(&path).expect("load should succeed");
        assert_eq!(loaded.to_lines(), store.to_lines());

        let text = fs::read_to_string(&path).expect("file exists");
        assert!(text.starts_with("{\"record\":\"meta\""));

        let _ = fs::remove_file(path);
    }
}
