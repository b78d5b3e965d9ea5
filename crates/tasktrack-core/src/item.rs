//! Item types: the three kinds of work item and their field-level rules.
//!
//! Every item shares the same base shape (id, name, description, status,
//! time window). The kind-specific payload lives in [`ItemBody`]:
//!
//! ```text
//! Task     plain item; status and window are set by the caller
//! Epic     owns an ordered list of subtask IDs; status and window are derived
//! Subtask  belongs to exactly one epic; changes re-derive the parent
//! ```

use crate::error::StoreError;
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Globally unique item identifier, shared by all kinds.
pub type ItemId = u64;

/// Workflow status of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }

    /// Aggregate status of an epic from its subtasks' statuses.
    ///
    /// No subtasks or all `New` gives `New`; all `Done` gives `Done`;
    /// any other mixture gives `InProgress`.
    pub fn aggregate(statuses: impl IntoIterator<Item = Status>) -> Status {
        let mut any = false;
        let mut all_new = true;
        let mut all_done = true;
        for status in statuses {
            any = true;
            all_new &= status == Status::New;
            all_done &= status == Status::Done;
        }

        if !any || all_new {
            Status::New
        } else if all_done {
            Status::Done
        } else {
            Status::InProgress
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(Status::New),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            _ => Err(format!(
                "unknown status `{s}` (expected NEW, IN_PROGRESS or DONE)"
            )),
        }
    }
}

/// Which of the three item maps an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Task,
    Epic,
    Subtask,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Task => "task",
            ItemKind::Epic => "epic",
            ItemKind::Subtask => "subtask",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task" | "tasks" => Ok(ItemKind::Task),
            "epic" | "epics" => Ok(ItemKind::Epic),
            "subtask" | "subtasks" => Ok(ItemKind::Subtask),
            _ => Err(format!(
                "unknown item kind `{s}` (expected task, epic or subtask)"
            )),
        }
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemBody {
    Task,
    Epic(EpicBody),
    Subtask { parent_id: ItemId },
}

/// Epic payload: ordered subtask IDs plus the derived end of the window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpicBody {
    subtask_ids: Vec<ItemId>,
    end_time: Option<NaiveDateTime>,
}

/// A work item of any kind.
///
/// Instances are created and destroyed only by `TaskStore`. The public
/// setters cover name, description and status; time windows change only
/// through the store so the schedule index never goes stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: ItemId,
    name: String,
    description: String,
    status: Status,
    start_time: Option<NaiveDateTime>,
    duration: TimeDelta,
    body: ItemBody,
}

impl Item {
    pub(crate) fn task(
        id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Self {
        Self::with_body(id, name, description, status, ItemBody::Task)
    }

    pub(crate) fn epic(id: ItemId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_body(
            id,
            name,
            description,
            Status::New,
            ItemBody::Epic(EpicBody::default()),
        )
    }

    /// Build a subtask, rejecting a parent reference to itself.
    pub(crate) fn subtask(
        id: ItemId,
        parent_id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Result<Self, StoreError> {
        if parent_id == id {
            return Err(StoreError::invalid(format!(
                "subtask {id} cannot be its own epic"
            )));
        }
        Ok(Self::with_body(
            id,
            name,
            description,
            status,
            ItemBody::Subtask { parent_id },
        ))
    }

    fn with_body(
        id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
        status: Status,
        body: ItemBody,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            status,
            start_time: None,
            duration: TimeDelta::zero(),
            body,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        match self.body {
            ItemBody::Task => ItemKind::Task,
            ItemBody::Epic(_) => ItemKind::Epic,
            ItemBody::Subtask { .. } => ItemKind::Subtask,
        }
    }

    pub fn body(&self) -> &ItemBody {
        &self.body
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    /// Window length; zero means unset.
    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    /// End of the window.
    ///
    /// Derived as `start + duration` for tasks and subtasks; epics carry the
    /// latest end among their subtasks.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        match &self.body {
            ItemBody::Epic(epic) => epic.end_time,
            _ => self
                .start_time
                .and_then(|start| start.checked_add_signed(self.duration)),
        }
    }

    /// Whether both halves of the time window are set.
    pub fn is_scheduled(&self) -> bool {
        self.start_time.is_some() && !self.duration.is_zero()
    }

    pub fn parent_id(&self) -> Option<ItemId> {
        match self.body {
            ItemBody::Subtask { parent_id } => Some(parent_id),
            _ => None,
        }
    }

    /// Copy of the epic's subtask IDs in insertion order (empty for other kinds).
    pub fn subtask_ids(&self) -> Vec<ItemId> {
        self.linked_subtasks().to_vec()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Set the status directly.
    ///
    /// No-op on epics, whose status is always derived. On a subtask this
    /// does not re-derive the parent; use `TaskStore::update_status` for that.
    pub fn set_status(&mut self, status: Status) {
        if !matches!(self.body, ItemBody::Epic(_)) {
            self.status = status;
        }
    }

    pub(crate) fn linked_subtasks(&self) -> &[ItemId] {
        match &self.body {
            ItemBody::Epic(epic) => &epic.subtask_ids,
            _ => &[],
        }
    }

    pub(crate) fn link_subtask(&mut self, subtask_id: ItemId) -> Result<(), StoreError> {
        let id = self.id;
        let ItemBody::Epic(epic) = &mut self.body else {
            return Err(StoreError::invalid(format!("item {id} is not an epic")));
        };
        if subtask_id == id {
            return Err(StoreError::invalid(format!(
                "epic {id} cannot contain itself as a subtask"
            )));
        }
        if !epic.subtask_ids.contains(&subtask_id) {
            epic.subtask_ids.push(subtask_id);
        }
        Ok(())
    }

    pub(crate) fn unlink_subtask(&mut self, subtask_id: ItemId) {
        if let ItemBody::Epic(epic) = &mut self.body {
            epic.subtask_ids.retain(|id| *id != subtask_id);
        }
    }

    /// Detach and return every subtask ID.
    pub(crate) fn take_subtasks(&mut self) -> Vec<ItemId> {
        match &mut self.body {
            ItemBody::Epic(epic) => std::mem::take(&mut epic.subtask_ids),
            _ => Vec::new(),
        }
    }

    pub(crate) fn set_derived_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Commit a caller-provided window (tasks and subtasks).
    pub(crate) fn set_window(&mut self, start_time: Option<NaiveDateTime>, duration: TimeDelta) {
        self.start_time = start_time;
        self.duration = duration;
    }

    /// Commit a window derived from subtasks (epics).
    pub(crate) fn set_derived_window(
        &mut self,
        start_time: Option<NaiveDateTime>,
        end_time: Option<NaiveDateTime>,
    ) {
        let ItemBody::Epic(epic) = &mut self.body else {
            return;
        };
        epic.end_time = end_time;
        self.start_time = start_time;
        self.duration = match (start_time, end_time) {
            (Some(start), Some(end)) => end - start,
            _ => TimeDelta::zero(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 15)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid fixture time")
    }

    #[test]
    fn aggregate_status_rules() {
        assert_eq!(Status::aggregate(std::iter::empty()), Status::New);
        assert_eq!(Status::aggregate([Status::New, Status::New]), Status::New);
        assert_eq!(Status::aggregate([Status::Done, Status::Done]), Status::Done);
        assert_eq!(
            Status::aggregate([Status::New, Status::Done]),
            Status::InProgress
        );
        assert_eq!(
            Status::aggregate([Status::InProgress]),
            Status::InProgress
        );
    }

    #[test]
    fn status_parses_loosely() {
        assert_eq!("in-progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("done".parse::<Status>(), Ok(Status::Done));
        assert!("finished".parse::<Status>().is_err());
    }

    #[test]
    fn subtask_rejects_self_parent() {
        let err = Item::subtask(3, 3, "s", "", Status::New).expect_err("self parent must fail");
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn epic_rejects_itself_as_subtask() {
        let mut epic = Item::epic(1, "e", "");
        let err = epic.link_subtask(1).expect_err("self link must fail");
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(epic.subtask_ids().is_empty());
    }

    #[test]
    fn subtask_ids_returns_a_copy() {
        let mut epic = Item::epic(1, "e", "");
        epic.link_subtask(2).expect("link 2");
        epic.link_subtask(3).expect("link 3");

        let mut ids = epic.subtask_ids();
        ids.clear();
        assert_eq!(epic.subtask_ids(), vec![2, 3]);
    }

    #[test]
    fn epic_status_cannot_be_set_directly() {
        let mut epic = Item::epic(1, "e", "");
        epic.set_status(Status::Done);
        assert_eq!(epic.status(), Status::New);
    }

    #[test]
    fn end_time_is_derived_for_tasks() {
        let mut task = Item::task(1, "t", "", Status::New);
        assert_eq!(task.end_time(), None);

        task.set_window(Some(at(9, 0)), TimeDelta::minutes(120));
        assert_eq!(task.end_time(), Some(at(11, 0)));
        assert!(task.is_scheduled());
    }

    #[test]
    fn derived_window_sets_epic_duration() {
        let mut epic = Item::epic(1, "e", "");
        epic.set_derived_window(Some(at(9, 0)), Some(at(12, 30)));
        assert_eq!(epic.duration(), TimeDelta::minutes(210));
        assert_eq!(epic.end_time(), Some(at(12, 30)));

        epic.set_derived_window(None, None);
        assert!(epic.duration().is_zero());
        assert_eq!(epic.end_time(), None);
    }
}
