//! The pending table: task id -> armed fire time.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::model::TaskId;

/// One armed occurrence of a task entering the target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    /// When the task becomes eligible for firing.
    pub fire_at: DateTime<Utc>,
    /// Cycle in which the entry was armed. Never fires in that same cycle.
    pub armed_cycle: u64,
}

/// Unordered map of armed tasks. Keys are unique; entries are never re-armed
/// while present.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<TaskId, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `id` unless it is already pending. Returns whether it was inserted.
    pub fn arm(&mut self, id: TaskId, fire_at: DateTime<Utc>, cycle: u64) -> bool {
        match self.entries.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    fire_at,
                    armed_cycle: cycle,
                });
                true
            }
        }
    }

    /// Collect the ids due at `now` during `cycle`, earliest first.
    ///
    /// Entries armed in `cycle` itself are excluded. Nothing is removed here.
    pub fn due(&self, now: DateTime<Utc>, cycle: u64) -> Vec<TaskId> {
        let mut due: Vec<(&TaskId, &PendingEntry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.fire_at <= now && entry.armed_cycle < cycle)
            .collect();
        due.sort_by(|a, b| a.1.fire_at.cmp(&b.1.fire_at).then_with(|| a.0.cmp(b.0)));
        due.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<PendingEntry> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &TaskId) -> Option<&PendingEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaskId, &PendingEntry)> {
        self.entries.iter()
    }
}
