//! Reading name files from disk.

use std::path::Path;

use raffle_core::{Participant, RaffleError, Result};
use tracing::debug;

use crate::{csv::parse_csv, text::parse_text};

/// How a file's content should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Text,
    Csv,
}

impl ImportFormat {
    /// `.csv` files (any case) are CSV, everything else is one name per line.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Text,
        }
    }

    pub fn parse(&self, content: &str) -> Vec<Participant> {
        match self {
            Self::Text => parse_text(content),
            Self::Csv => parse_csv(content).names,
        }
    }
}

/// Decode file bytes as UTF-8 (lossy), dropping a leading byte-order mark.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&*text).to_string()
}

/// Read a whole file. Content is never streamed.
pub async fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(RaffleError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Not a file: {}", path.display()),
        )));
    }
    let bytes = tokio::fs::read(path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Read name file");
    Ok(bytes)
}
