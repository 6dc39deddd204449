//! Bounded, newest-first record of successful calculations.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Oldest entries beyond this bound are dropped.
pub const MAX_HISTORY_LENGTH: usize = 20;

/// One past calculation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub expression: String,
    pub result: String,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a history from stored entries, keeping the newest-first order
    /// and the length bound.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        Self {
            entries: entries.into_iter().take(MAX_HISTORY_LENGTH).collect(),
        }
    }

    /// Prepends a new entry and returns it.
    ///
    /// Ids come from the wall clock but never repeat or go backwards, even for
    /// several calculations within the same millisecond.
    pub fn push(&mut self, expression: &str, result: &str) -> &HistoryEntry {
        let timestamp_ms = now_ms();
        let id = match self.entries.front() {
            Some(latest) => timestamp_ms.max(latest.id + 1),
            None => timestamp_ms,
        };

        self.entries.push_front(HistoryEntry {
            id,
            expression: expression.to_string(),
            result: result.to_string(),
            timestamp_ms,
        });
        self.entries.truncate(MAX_HISTORY_LENGTH);

        &self.entries[0]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Entry by position, 0 being the newest.
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}
