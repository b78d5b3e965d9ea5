//! Schedule index: scheduled items ordered by start time.
//!
//! Ordering is by start time, then by ID; an absent start sorts last.
//! Windows are closed intervals `[start, end]`, so two windows that touch
//! at an endpoint conflict. Every window admitted by `TaskStore` has passed
//! the conflict check, which keeps the index pairwise disjoint; conflict
//! lookups rely on that and only inspect the nearest preceding entry.

use crate::item::ItemId;
use chrono::{NaiveDateTime, TimeDelta};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Sort key: start time (absent last), then ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleKey {
    pub start: Option<NaiveDateTime>,
    pub id: ItemId,
}

impl Ord for ScheduleKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_start = match (self.start, other.start) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_start.then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for ScheduleKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One admitted window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledWindow {
    pub id: ItemId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleIndex {
    entries: BTreeMap<ScheduleKey, NaiveDateTime>,
    keys: HashMap<ItemId, ScheduleKey>,
}

impl ScheduleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Admit a window for `id`, replacing any previous window for it.
    ///
    /// Callers must check `conflict` first.
    pub fn insert(&mut self, id: ItemId, start: NaiveDateTime, end: NaiveDateTime) {
        self.remove(id);
        let key = ScheduleKey {
            start: Some(start),
            id,
        };
        self.entries.insert(key, end);
        self.keys.insert(id, key);
    }

    /// Remove the window for `id`, returning it if present.
    pub fn remove(&mut self, id: ItemId) -> Option<ScheduledWindow> {
        let key = self.keys.remove(&id)?;
        let end = self.entries.remove(&key)?;
        Some(ScheduledWindow {
            id,
            start: key.start?,
            end,
        })
    }

    /// First admitted window that intersects the closed interval `[start, end]`.
    pub fn conflict(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<ScheduledWindow> {
        let upper = ScheduleKey {
            start: Some(end),
            id: ItemId::MAX,
        };
        // Disjoint windows sorted by start are also sorted by end, so the
        // latest window starting at or before `end` reaches furthest.
        let (key, window_end) = self.entries.range(..=upper).next_back()?;
        let window_start = key.start?;
        if start <= *window_end && end >= window_start {
            Some(ScheduledWindow {
                id: key.id,
                start: window_start,
                end: *window_end,
            })
        } else {
            None
        }
    }

    /// Whether `[start, start + duration]` would conflict with an admitted window.
    ///
    /// An absent start or a zero duration never conflicts.
    pub fn overlaps(&self, start: Option<NaiveDateTime>, duration: TimeDelta) -> bool {
        let Some(start) = start else {
            return false;
        };
        if duration.is_zero() || self.is_empty() {
            return false;
        }
        let end = start.checked_add_signed(duration).unwrap_or(if duration < TimeDelta::zero() {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        });
        let (lo, hi) = if end < start { (end, start) } else { (start, end) };
        self.conflict(lo, hi).is_some()
    }

    pub fn ascending(&self) -> Vec<ItemId> {
        self.entries.keys().map(|key| key.id).collect()
    }

    pub fn descending(&self) -> Vec<ItemId> {
        self.entries.keys().rev().map(|key| key.id).collect()
    }
}
