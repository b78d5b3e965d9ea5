//! Canonical in-memory state for tasks, epics and subtasks.
//!
//! `TaskStore` is the only writer of item state. Every mutation goes
//! through it so that:
//! - epic status and time window are re-derived whenever a subtask changes
//! - the schedule index holds exactly the scheduled tasks and subtasks
//! - the access history never refers to a deleted item

use crate::error::StoreError;
use crate::history::HistoryTracker;
use crate::item::{Item, ItemId, ItemKind, Status};
use crate::schedule::ScheduleIndex;
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::BTreeMap;

const LOG_TARGET: &str = "tasktrack::store";

/// Highest ID counter a snapshot may carry. Counting up from here cannot
/// reach `ItemId::MAX` in practice, so allocation never wraps.
pub const MAX_RESTORED_ID: ItemId = i64::MAX as ItemId;

/// Items of all kinds plus their history and schedule.
#[derive(Debug, Clone)]
pub struct TaskStore {
    next_id: ItemId,
    tasks: BTreeMap<ItemId, Item>,
    epics: BTreeMap<ItemId, Item>,
    subtasks: BTreeMap<ItemId, Item>,
    history: HistoryTracker,
    schedule: ScheduleIndex,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self {
            next_id: 1,
            tasks: BTreeMap::new(),
            epics: BTreeMap::new(),
            subtasks: BTreeMap::new(),
            history: HistoryTracker::new(),
            schedule: ScheduleIndex::new(),
        }
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ID the next create will allocate.
    pub fn next_id(&self) -> ItemId {
        self.next_id
    }

    /// Total number of items of all kinds.
    pub fn len(&self) -> usize {
        self.tasks.len() + self.epics.len() + self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn items(&self, kind: ItemKind) -> &BTreeMap<ItemId, Item> {
        match kind {
            ItemKind::Task => &self.tasks,
            ItemKind::Epic => &self.epics,
            ItemKind::Subtask => &self.subtasks,
        }
    }

    fn items_mut(&mut self, kind: ItemKind) -> &mut BTreeMap<ItemId, Item> {
        match kind {
            ItemKind::Task => &mut self.tasks,
            ItemKind::Epic => &mut self.epics,
            ItemKind::Subtask => &mut self.subtasks,
        }
    }

    // ── Create ──

    pub fn create_task(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> ItemId {
        let id = self.allocate_id();
        self.tasks
            .insert(id, Item::task(id, name, description, status));
        tracing::debug!(target: LOG_TARGET, id, "created task");
        id
    }

    pub fn create_epic(&mut self, name: impl Into<String>, description: impl Into<String>) -> ItemId {
        let id = self.allocate_id();
        self.epics.insert(id, Item::epic(id, name, description));
        tracing::debug!(target: LOG_TARGET, id, "created epic");
        id
    }

    /// Create a subtask under `epic_id` and re-derive the epic.
    pub fn create_subtask(
        &mut self,
        epic_id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
        status: Status,
    ) -> Result<ItemId, StoreError> {
        if !self.epics.contains_key(&epic_id) {
            return Err(StoreError::NotFound {
                kind: ItemKind::Epic,
                id: epic_id,
            });
        }
        let id = self.allocate_id();
        self.attach_subtask(Item::subtask(id, epic_id, name, description, status)?)?;
        tracing::debug!(target: LOG_TARGET, id, epic_id, "created subtask");
        Ok(id)
    }

    fn attach_subtask(&mut self, subtask: Item) -> Result<(), StoreError> {
        let id = subtask.id();
        let epic_id = subtask.parent_id().ok_or_else(|| {
            StoreError::invalid(format!("item {id} is not a subtask"))
        })?;
        let epic = self.epics.get_mut(&epic_id).ok_or(StoreError::NotFound {
            kind: ItemKind::Epic,
            id: epic_id,
        })?;
        epic.link_subtask(id)?;
        self.subtasks.insert(id, subtask);
        self.refresh_epic(epic_id);
        Ok(())
    }

    /// Re-insert an item under its existing ID (snapshot restore).
    ///
    /// The item arrives unscheduled; epics must be restored before their
    /// subtasks. Bumps the ID counter past `item.id()`, which must be below
    /// `MAX_RESTORED_ID`.
    pub(crate) fn restore_item(&mut self, item: Item) -> Result<(), StoreError> {
        let id = item.id();
        if self.kind_of(id).is_some() {
            return Err(StoreError::invalid(format!("duplicate item id {id}")));
        }
        if id >= MAX_RESTORED_ID {
            return Err(StoreError::invalid(format!("item id {id} is out of range")));
        }
        match item.kind() {
            ItemKind::Task => {
                self.tasks.insert(id, item);
            }
            ItemKind::Epic => {
                self.epics.insert(id, item);
            }
            ItemKind::Subtask => self.attach_subtask(item)?,
        }
        self.next_id = self.next_id.max(id + 1);
        Ok(())
    }

    /// Raise the ID counter to at least `next_id`.
    pub(crate) fn reserve_ids(&mut self, next_id: ItemId) -> Result<(), StoreError> {
        if next_id > MAX_RESTORED_ID {
            return Err(StoreError::invalid(format!(
                "next_id {next_id} is out of range (max {MAX_RESTORED_ID})"
            )));
        }
        self.next_id = self.next_id.max(next_id);
        Ok(())
    }

    // ── Read ──

    /// Fetch an item of `kind` and record the access in history.
    pub fn get(&mut self, kind: ItemKind, id: ItemId) -> Result<&Item, StoreError> {
        if !self.items(kind).contains_key(&id) {
            return Err(StoreError::NotFound { kind, id });
        }
        self.history.record(id);
        self.items(kind)
            .get(&id)
            .ok_or(StoreError::NotFound { kind, id })
    }

    /// Fetch the live stored item for in-place edits and record the access.
    ///
    /// Edits made here bypass derivation: changing a subtask's status through
    /// this handle does not update its epic until the next store-driven
    /// change to that epic. Prefer `update_status`.
    pub fn get_mut(&mut self, kind: ItemKind, id: ItemId) -> Result<&mut Item, StoreError> {
        if !self.items(kind).contains_key(&id) {
            return Err(StoreError::NotFound { kind, id });
        }
        self.history.record(id);
        self.items_mut(kind)
            .get_mut(&id)
            .ok_or(StoreError::NotFound { kind, id })
    }

    /// Look up an item of `kind` without touching history.
    pub fn item(&self, kind: ItemKind, id: ItemId) -> Option<&Item> {
        self.items(kind).get(&id)
    }

    /// Look up an item of any kind without touching history.
    pub fn find(&self, id: ItemId) -> Option<&Item> {
        self.tasks
            .get(&id)
            .or_else(|| self.epics.get(&id))
            .or_else(|| self.subtasks.get(&id))
    }

    fn find_mut(&mut self, id: ItemId) -> Result<&mut Item, StoreError> {
        let kind = self.kind_of(id).ok_or(StoreError::UnknownItem(id))?;
        self.items_mut(kind)
            .get_mut(&id)
            .ok_or(StoreError::UnknownItem(id))
    }

    pub fn kind_of(&self, id: ItemId) -> Option<ItemKind> {
        if self.tasks.contains_key(&id) {
            Some(ItemKind::Task)
        } else if self.epics.contains_key(&id) {
            Some(ItemKind::Epic)
        } else if self.subtasks.contains_key(&id) {
            Some(ItemKind::Subtask)
        } else {
            None
        }
    }

    /// All items of `kind` in ID order. Does not touch history.
    pub fn list(&self, kind: ItemKind) -> Vec<&Item> {
        self.items(kind).values().collect()
    }

    /// Subtasks of an epic in insertion order. Does not touch history.
    pub fn subtasks_of(&self, epic_id: ItemId) -> Result<Vec<&Item>, StoreError> {
        let epic = self.epics.get(&epic_id).ok_or(StoreError::NotFound {
            kind: ItemKind::Epic,
            id: epic_id,
        })?;
        Ok(epic
            .linked_subtasks()
            .iter()
            .filter_map(|id| self.subtasks.get(id))
            .collect())
    }

    /// Accessed items, oldest access first.
    pub fn history(&self) -> Vec<&Item> {
        self.history.iter().filter_map(|id| self.find(id)).collect()
    }

    pub fn history_ids(&self) -> Vec<ItemId> {
        self.history.snapshot()
    }

    pub(crate) fn record_access(&mut self, id: ItemId) {
        if self.kind_of(id).is_some() {
            self.history.record(id);
        }
    }

    // ── Delete ──

    /// Delete one item. Returns `false` if no item of `kind` has this ID.
    ///
    /// Deleting an epic deletes all of its subtasks; deleting a subtask
    /// re-derives its epic.
    pub fn delete(&mut self, kind: ItemKind, id: ItemId) -> bool {
        match kind {
            ItemKind::Task => {
                if self.tasks.remove(&id).is_none() {
                    return false;
                }
                self.purge(id);
            }
            ItemKind::Subtask => {
                let Some(subtask) = self.subtasks.remove(&id) else {
                    return false;
                };
                self.purge(id);
                if let Some(epic_id) = subtask.parent_id() {
                    if let Some(epic) = self.epics.get_mut(&epic_id) {
                        epic.unlink_subtask(id);
                    }
                    self.refresh_epic(epic_id);
                }
            }
            ItemKind::Epic => {
                let Some(epic) = self.epics.get_mut(&id) else {
                    return false;
                };
                let children = epic.take_subtasks();
                for child in children {
                    self.subtasks.remove(&child);
                    self.purge(child);
                }
                self.epics.remove(&id);
                self.purge(id);
            }
        }
        tracing::debug!(target: LOG_TARGET, id, kind = %kind, "deleted item");
        true
    }

    /// Delete every item of `kind`.
    ///
    /// Clearing epics also clears all subtasks. Clearing subtasks resets
    /// every epic to its empty derived state.
    pub fn delete_all(&mut self, kind: ItemKind) {
        let mut removed: Vec<ItemId> = self.items(kind).keys().copied().collect();
        match kind {
            ItemKind::Task => self.tasks.clear(),
            ItemKind::Subtask => {
                self.subtasks.clear();
                let epic_ids: Vec<ItemId> = self.epics.keys().copied().collect();
                for epic_id in epic_ids {
                    if let Some(epic) = self.epics.get_mut(&epic_id) {
                        epic.take_subtasks();
                    }
                    self.refresh_epic(epic_id);
                }
            }
            ItemKind::Epic => {
                removed.extend(self.subtasks.keys().copied());
                self.epics.clear();
                self.subtasks.clear();
            }
        }
        for id in &removed {
            self.purge(*id);
        }
        tracing::debug!(target: LOG_TARGET, kind = %kind, count = removed.len(), "cleared items");
    }

    fn purge(&mut self, id: ItemId) {
        self.schedule.remove(id);
        self.history.forget(id);
    }

    // ── Update ──

    pub fn update_name(&mut self, id: ItemId, name: impl Into<String>) -> Result<(), StoreError> {
        self.find_mut(id)?.set_name(name);
        Ok(())
    }

    pub fn update_description(
        &mut self,
        id: ItemId,
        description: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.find_mut(id)?.set_description(description);
        Ok(())
    }

    /// Set the status of a task or subtask.
    ///
    /// A subtask change re-derives its epic. Epics are ignored: their status
    /// is derived only.
    pub fn update_status(&mut self, id: ItemId, status: Status) -> Result<(), StoreError> {
        let item = self.find_mut(id)?;
        match item.kind() {
            ItemKind::Epic => {
                tracing::debug!(target: LOG_TARGET, id, "epic status is derived; update ignored");
            }
            ItemKind::Task => item.set_status(status),
            ItemKind::Subtask => {
                item.set_status(status);
                if let Some(epic_id) = item.parent_id() {
                    self.refresh_epic_status(epic_id);
                }
            }
        }
        Ok(())
    }

    /// Set or clear the time window of a task or subtask.
    ///
    /// - `(None, zero)` clears the window and removes the item from the
    ///   schedule; clearing an unscheduled item is a no-op.
    /// - `(Some(start), duration > 0)` replaces the window if it does not
    ///   conflict with any other scheduled item.
    /// - anything else is rejected as a half-specified window.
    ///
    /// Epics derive their window from subtasks, so any call on an epic is a
    /// no-op. A rejected call leaves the item and the schedule unchanged.
    pub fn set_time_window(
        &mut self,
        id: ItemId,
        start_time: Option<NaiveDateTime>,
        duration: TimeDelta,
    ) -> Result<(), StoreError> {
        let item = self.find_mut(id)?;
        if item.kind() == ItemKind::Epic {
            return Ok(());
        }
        let parent_id = item.parent_id();

        if start_time.is_none() && duration.is_zero() {
            if !item.is_scheduled() {
                return Ok(());
            }
            item.set_window(None, TimeDelta::zero());
            self.schedule.remove(id);
            if let Some(epic_id) = parent_id {
                self.refresh_epic_window(epic_id);
            }
            tracing::debug!(target: LOG_TARGET, id, "cleared time window");
            return Ok(());
        }

        let (Some(start), false) = (start_time, duration.is_zero()) else {
            return Err(StoreError::invalid(
                "start time and duration must be given together",
            ));
        };
        if duration < TimeDelta::zero() {
            return Err(StoreError::invalid(format!(
                "duration must not be negative (got {duration})"
            )));
        }
        let end = start
            .checked_add_signed(duration)
            .ok_or_else(|| StoreError::invalid("time window end is out of range"))?;

        let previous = self.schedule.remove(id);
        if let Some(conflict) = self.schedule.conflict(start, end) {
            if let Some(previous) = previous {
                self.schedule.insert(previous.id, previous.start, previous.end);
            }
            tracing::warn!(
                target: LOG_TARGET,
                id,
                conflicting = conflict.id,
                %start,
                %end,
                "rejected overlapping time window"
            );
            return Err(StoreError::TimeConflict {
                id,
                start,
                end,
                conflicting: conflict.id,
            });
        }

        self.find_mut(id)?.set_window(Some(start), duration);
        self.schedule.insert(id, start, end);
        if let Some(epic_id) = parent_id {
            self.refresh_epic_window(epic_id);
        }
        tracing::debug!(target: LOG_TARGET, id, %start, %end, "scheduled item");
        Ok(())
    }

    // ── Schedule queries ──

    /// Scheduled tasks and subtasks in start order (or its reverse).
    pub fn list_by_priority(&self, ascending: bool) -> Vec<&Item> {
        let ids = if ascending {
            self.schedule.ascending()
        } else {
            self.schedule.descending()
        };
        ids.into_iter().filter_map(|id| self.find(id)).collect()
    }

    /// Whether `[start, start + duration]` would conflict with a scheduled item.
    pub fn is_overlapping(&self, start_time: Option<NaiveDateTime>, duration: TimeDelta) -> bool {
        self.schedule.overlaps(start_time, duration)
    }

    pub fn is_in_schedule(&self, id: ItemId) -> bool {
        self.schedule.contains(id)
    }

    // ── Derivation ──

    fn refresh_epic(&mut self, epic_id: ItemId) {
        self.refresh_epic_status(epic_id);
        self.refresh_epic_window(epic_id);
    }

    fn refresh_epic_status(&mut self, epic_id: ItemId) {
        let Some(epic) = self.epics.get_mut(&epic_id) else {
            return;
        };
        let subtasks = &self.subtasks;
        let status = Status::aggregate(
            epic.linked_subtasks()
                .iter()
                .filter_map(|id| subtasks.get(id))
                .map(Item::status),
        );
        epic.set_derived_status(status);
    }

    fn refresh_epic_window(&mut self, epic_id: ItemId) {
        let Some(epic) = self.epics.get_mut(&epic_id) else {
            return;
        };
        let children: Vec<&Item> = epic
            .linked_subtasks()
            .iter()
            .filter_map(|id| self.subtasks.get(id))
            .collect();
        let start = children.iter().filter_map(|s| s.start_time()).min();
        let end = children.iter().filter_map(|s| s.end_time()).max();
        epic.set_derived_window(start, end);
    }
}
