//! Participant pool: everyone still eligible to win.

use serde::{Deserialize, Serialize};

use crate::error::{RaffleError, Result};
use crate::types::Participant;

/// Ordered pool of remaining participants.
///
/// Entries are never mutated in place. Removal is by position and keeps the
/// relative order of everyone else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantPool {
    entries: Vec<Participant>,
}

impl ParticipantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append names at the tail, keeping their order.
    pub fn append<I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = Participant>,
    {
        let before = self.entries.len();
        self.entries.extend(names);
        self.entries.len() - before
    }

    /// Remove the entry at `index`, shifting later entries left.
    pub fn remove_at(&mut self, index: usize) -> Result<Participant> {
        if index >= self.entries.len() {
            return Err(RaffleError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn at(&self, index: usize) -> Result<&Participant> {
        self.entries.get(index).ok_or(RaffleError::IndexOutOfBounds {
            index,
            len: self.entries.len(),
        })
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|p| p.name().to_string()).collect()
    }
}
