//! Winner history, most recent first.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::WinnerRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinnerHistory {
    records: VecDeque<WinnerRecord>,
}

impl WinnerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, winner: WinnerRecord) {
        self.records.push_front(winner);
    }

    pub fn all(&self) -> impl Iterator<Item = &WinnerRecord> {
        self.records.iter()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&WinnerRecord> {
        self.records.front()
    }

    /// Winner names, most recent first.
    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name().to_string()).collect()
    }

    /// Only used by a full session reset.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
