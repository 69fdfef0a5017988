//! Core types, config, errors, participant pool and winner history for the raffle machine.

pub mod config;
pub mod error;
pub mod history;
pub mod pool;
pub mod types;

pub use error::{RaffleError, Result};
pub use history::WinnerHistory;
pub use pool::ParticipantPool;
pub use types::{DrawPhase, Participant, RaffleStatus, WinnerRecord};
