use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaffleError {
    #[error("No names entered")]
    EmptyInput,

    #[error("No valid names found")]
    NoValidNames,

    #[error("Pool index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Import finished after the session was reset; result discarded")]
    StaleImport,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RaffleError>;
