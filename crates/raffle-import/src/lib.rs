//! Name extraction: turns pasted text or CSV file content into participants.
//!
//! Free text is one name per line. CSV content goes through a small set of
//! heuristics that guess which column holds the name; there is no general
//! CSV quoting support.

pub mod csv;
pub mod file;
pub mod text;

pub use csv::{CsvImport, parse_csv};
pub use file::{ImportFormat, decode_bytes, read_file};
pub use text::parse_text;

use serde::{Deserialize, Serialize};

/// Whether an upload worked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Success,
    Error,
}

/// User-facing message produced by a CSV upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFeedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl ImportFeedback {
    pub fn imported(count: usize) -> Self {
        Self {
            kind: FeedbackKind::Success,
            message: format!("Successfully imported {count} names from CSV"),
        }
    }

    pub fn no_valid_names() -> Self {
        Self {
            kind: FeedbackKind::Error,
            message: "No valid names found in CSV file".to_string(),
        }
    }
}
