use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raffle participant: a trimmed, non-empty name.
///
/// Participants carry no identity beyond their text. Two entries with the same
/// name are still distinct pool entries, told apart only by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    /// Build a participant from raw text. Returns `None` if nothing is left after trimming.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn into_name(self) -> String {
        self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Participant {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle of a single draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawPhase {
    /// No animation running and no winner waiting to be acknowledged.
    #[default]
    Idle,
    /// Flicker ticks are running.
    Drawing,
    /// A winner was drawn and is waiting for the announcement to be dismissed.
    Resolved,
}

/// Status shown next to the participant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus {
    Complete,
    Drawing,
    NoParticipants,
    Ready,
}

impl RaffleStatus {
    /// Derive the status. A pending winner wins over everything else.
    pub fn derive(phase: DrawPhase, pool_empty: bool) -> Self {
        match phase {
            DrawPhase::Resolved => Self::Complete,
            DrawPhase::Drawing => Self::Drawing,
            DrawPhase::Idle if pool_empty => Self::NoParticipants,
            DrawPhase::Idle => Self::Ready,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Complete => "Complete",
            Self::Drawing => "Drawing",
            Self::NoParticipants => "No Participants",
            Self::Ready => "Ready",
        }
    }
}

impl fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A drawn winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub participant: Participant,
    /// Position the winner held in the pool at the moment of the draw.
    pub pool_index: usize,
    pub drawn_at: DateTime<Utc>,
}

impl WinnerRecord {
    pub fn new(participant: Participant, pool_index: usize) -> Self {
        Self {
            participant,
            pool_index,
            drawn_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        self.participant.name()
    }
}

/// `"1 participant"`, `"3 participants"`.
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}
