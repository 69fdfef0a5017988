//! Events pushed to the presentation layer.

use raffle_import::{FeedbackKind, ImportFeedback};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaffleEvent {
    /// Names were appended to the pool.
    ParticipantsAdded { added: usize, total: usize },
    /// A draw began.
    DrawStarted { pool_size: usize },
    /// Flicker tick: the name currently shown in the slot.
    Highlight { index: usize, name: String },
    /// The draw resolved. `remaining` is the pool size afterwards, `drawn` the history size.
    WinnerDrawn {
        name: String,
        index: usize,
        remaining: usize,
        drawn: usize,
    },
    /// The winner announcement was dismissed.
    WinnerDismissed,
    /// A running draw was cancelled before it resolved.
    DrawAborted,
    /// Pool and history were cleared.
    Reset,
    /// Upload result message.
    ImportFeedback { kind: FeedbackKind, message: String },
    /// The upload message timed out.
    FeedbackCleared,
}

impl From<ImportFeedback> for RaffleEvent {
    fn from(feedback: ImportFeedback) -> Self {
        Self::ImportFeedback {
            kind: feedback.kind,
            message: feedback.message,
        }
    }
}
