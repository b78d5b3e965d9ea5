use crate::config::Config;
use chrono::{NaiveDateTime, TimeDelta};
use serde_json::{Value, json};
use std::fmt::{Display, Write};
use std::path::PathBuf;
use tasktrack_core::{
    AtomicStoreMutationError, ErrorKind, Item, ItemBody, StoreError, TaskStore,
    load_store_or_empty, mutate_store_jsonl,
};

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 2;
pub const EXIT_INVALID_ARGUMENT: i32 = 3;
pub const EXIT_TIME_CONFLICT: i32 = 4;

/// Wire format for timestamps in JSON payloads.
const JSON_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::NotFound => EXIT_NOT_FOUND,
        ErrorKind::InvalidArgument => EXIT_INVALID_ARGUMENT,
        ErrorKind::TimeConflict => EXIT_TIME_CONFLICT,
    }
}

pub fn fail(code: i32, message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(code);
}

pub fn print_json(payload: &Value) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(EXIT_FAILURE, format!("json serialization: {e}")),
    }
}

pub fn minutes_or_exit(minutes: i64) -> TimeDelta {
    TimeDelta::try_minutes(minutes).unwrap_or_else(|| {
        fail(
            EXIT_INVALID_ARGUMENT,
            format!("duration out of range: {minutes} minutes"),
        )
    })
}

/// Resolved settings shared by every command.
pub struct Context {
    pub store_path: PathBuf,
    pub time_format: String,
}

impl Context {
    pub fn new(config: Config, store_override: Option<PathBuf>) -> Self {
        Self {
            store_path: store_override.unwrap_or(config.store),
            time_format: config.time_format,
        }
    }

    pub fn store_display(&self) -> String {
        self.store_path.display().to_string()
    }

    /// Read-only load; a missing store file reads as empty.
    pub fn load_store_or_exit(&self) -> TaskStore {
        load_store_or_empty(&self.store_path).unwrap_or_else(|e| {
            fail(
                EXIT_FAILURE,
                format!("failed to load {}: {e}", self.store_path.display()),
            )
        })
    }

    /// Run one lock-scoped mutation, exiting with the error's code on failure.
    pub fn mutate_or_exit<T>(
        &self,
        mutator: impl FnOnce(&mut TaskStore) -> Result<(T, bool), StoreError>,
    ) -> T {
        match mutate_store_jsonl(&self.store_path, mutator) {
            Ok(value) => value,
            Err(AtomicStoreMutationError::Mutation(err)) => fail(exit_code(err.kind()), err),
            Err(err) => fail(EXIT_FAILURE, err),
        }
    }

    pub fn parse_time_or_exit(&self, text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, &self.time_format).unwrap_or_else(|e| {
            fail(
                EXIT_INVALID_ARGUMENT,
                format!(
                    "invalid time `{text}` (expected format `{}`): {e}",
                    self.time_format
                ),
            )
        })
    }

    pub fn format_time(&self, time: NaiveDateTime) -> String {
        let mut out = String::new();
        if write!(out, "{}", time.format(&self.time_format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", time.format(JSON_TIME_FORMAT));
        }
        out
    }

    pub fn item_line(&self, item: &Item) -> String {
        let mut line = format!(
            "  - {} [{} {}] {}",
            item.id(),
            item.kind(),
            item.status(),
            item.name()
        );
        if let (Some(start), Some(end)) = (item.start_time(), item.end_time()) {
            let _ = write!(
                line,
                " @ {} .. {}",
                self.format_time(start),
                self.format_time(end)
            );
        }
        if let Some(parent_id) = item.parent_id() {
            let _ = write!(line, " (epic {parent_id})");
        }
        line
    }
}

pub fn item_json(item: &Item) -> Value {
    let mut value = json!({
        "id": item.id(),
        "kind": item.kind(),
        "name": item.name(),
        "description": item.description(),
        "status": item.status(),
        "startTime": item.start_time().map(json_time),
        "endTime": item.end_time().map(json_time),
        "durationMinutes": item.duration().num_minutes(),
    });
    match item.body() {
        ItemBody::Task => {}
        ItemBody::Epic(_) => {
            value["subtaskIds"] = json!(item.subtask_ids());
        }
        ItemBody::Subtask { parent_id } => {
            value["epicId"] = json!(parent_id);
        }
    }
    value
}

pub fn items_json(items: &[&Item]) -> Vec<Value> {
    items.iter().map(|item| item_json(item)).collect()
}

fn json_time(time: NaiveDateTime) -> String {
    time.format(JSON_TIME_FORMAT).to_string()
}
