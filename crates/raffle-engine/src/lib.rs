//! Draw engine and session controller.
//!
//! [`RaffleSession`] is the synchronous state machine: pool, history, draw
//! phase and upload feedback. [`RaffleController`] drives it from a tokio
//! timer and broadcasts [`RaffleEvent`]s to whatever is rendering the raffle.

pub mod controller;
pub mod events;
pub mod session;
pub mod ticker;

pub use controller::RaffleController;
pub use events::RaffleEvent;
pub use session::{DrawSettings, ImportTicket, RaffleSession, SessionSnapshot, TickOutcome};
pub use ticker::DrawTicker;
