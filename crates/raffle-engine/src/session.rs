//! Raffle session: the participant pool, winner history and draw state machine.
//!
//! ```text
//! Idle --begin_draw--> Drawing --tick x tick_count--> Resolved --acknowledge--> Idle
//!                         |                              |
//!                         +--abort_draw--> Idle          +--begin_draw--> Drawing
//! ```
//!
//! The session never touches a clock; something else calls [`RaffleSession::tick`]
//! once per period. Randomness is passed in so tests can seed it.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use raffle_core::config::RaffleConfig;
use raffle_core::types::pluralize;
use raffle_core::{
    DrawPhase, Participant, ParticipantPool, RaffleError, RaffleStatus, Result, WinnerHistory,
    WinnerRecord,
};
use raffle_import::{ImportFeedback, decode_bytes, parse_csv, parse_text};

/// Timing knobs for one draw and for upload feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawSettings {
    pub tick_interval: Duration,
    /// Ticks per draw. The last one resolves the winner.
    pub tick_count: u32,
    pub feedback_ttl: Duration,
}

impl DrawSettings {
    pub fn from_config(config: &RaffleConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            tick_count: config.tick_count().max(1),
            feedback_ttl: config.feedback_ttl(),
        }
    }
}

impl Default for DrawSettings {
    fn default() -> Self {
        Self::from_config(&RaffleConfig::default())
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Cosmetic highlight, the pool is untouched.
    Flicker { index: usize, name: String },
    /// The draw finished with this winner.
    Resolved(WinnerRecord),
    /// No draw is running; the tick was ignored.
    Idle,
}

/// Proof of which session an async import was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportTicket {
    epoch: Uuid,
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub participant_count: usize,
    pub participants: Vec<String>,
    pub status: RaffleStatus,
    pub phase: DrawPhase,
    pub display_text: String,
    pub highlighted_index: Option<usize>,
    pub pending_winner: Option<WinnerRecord>,
    pub winners: Vec<WinnerRecord>,
    pub can_draw: bool,
    pub reset_allowed: bool,
    pub draw_label: &'static str,
    pub notice: Option<&'static str>,
    pub feedback: Option<ImportFeedback>,
}

pub struct RaffleSession {
    epoch: Uuid,
    settings: DrawSettings,
    pool: ParticipantPool,
    history: WinnerHistory,
    phase: DrawPhase,
    highlighted: Option<usize>,
    pending_winner: Option<WinnerRecord>,
    ticks_elapsed: u32,
    feedback: Option<ImportFeedback>,
}

impl Default for RaffleSession {
    fn default() -> Self {
        Self::new(DrawSettings::default())
    }
}

impl RaffleSession {
    pub fn new(settings: DrawSettings) -> Self {
        Self {
            epoch: Uuid::new_v4(),
            settings,
            pool: ParticipantPool::new(),
            history: WinnerHistory::new(),
            phase: DrawPhase::Idle,
            highlighted: None,
            pending_winner: None,
            ticks_elapsed: 0,
            feedback: None,
        }
    }

    pub fn settings(&self) -> &DrawSettings {
        &self.settings
    }

    // --- Adding participants ---

    /// Add one participant per non-blank line. Blank input leaves the pool alone.
    pub fn add_from_text(&mut self, text: &str) -> Result<usize> {
        let names = parse_text(text);
        if names.is_empty() {
            return Err(RaffleError::EmptyInput);
        }
        Ok(self.add_participants(names))
    }

    /// Add names extracted from CSV file content. Always sets upload feedback.
    pub fn add_from_csv(&mut self, bytes: &[u8]) -> Result<usize> {
        let import = parse_csv(&decode_bytes(bytes));
        self.feedback = Some(import.feedback());
        if import.is_empty() {
            warn!(rows = import.rows, "CSV import found no valid names");
            return Err(RaffleError::NoValidNames);
        }
        Ok(self.add_participants(import.names))
    }

    /// Append names to the pool.
    ///
    /// Allowed in every phase. During a draw the pool then grows before the
    /// animation ends, so later flicker ticks and the final pick sample the
    /// larger pool. Indices already handed out stay valid because appends
    /// never shift existing entries.
    pub fn add_participants(&mut self, names: Vec<Participant>) -> usize {
        let added = self.pool.append(names);
        info!(added, total = self.pool.size(), "Participants added");
        added
    }

    /// Ticket to present when an async read completes.
    pub fn import_ticket(&self) -> ImportTicket {
        ImportTicket { epoch: self.epoch }
    }

    /// Apply CSV content read asynchronously, unless the session was reset since
    /// the ticket was issued.
    pub fn apply_csv_import(&mut self, ticket: ImportTicket, bytes: &[u8]) -> Result<usize> {
        if ticket.epoch != self.epoch {
            warn!("Discarding CSV import for a reset session");
            return Err(RaffleError::StaleImport);
        }
        self.add_from_csv(bytes)
    }

    pub fn clear_feedback(&mut self) -> bool {
        self.feedback.take().is_some()
    }

    // --- Drawing ---

    pub fn can_draw(&self) -> bool {
        self.phase != DrawPhase::Drawing && !self.pool.is_empty()
    }

    /// Start a draw. Ignored (returns `false`) while drawing or with an empty pool.
    /// A pending winner is dismissed first.
    pub fn begin_draw(&mut self) -> bool {
        if !self.can_draw() {
            debug!(phase = ?self.phase, pool = self.pool.size(), "Draw request ignored");
            return false;
        }
        self.acknowledge_winner();
        self.phase = DrawPhase::Drawing;
        self.ticks_elapsed = 0;
        self.highlighted = None;
        info!(pool = self.pool.size(), ticks = self.settings.tick_count, "Draw started");
        true
    }

    /// Advance the running draw by one tick.
    ///
    /// Ticks before the last one only pick a random highlight. The last tick
    /// draws the winner with a fresh sample, removes it from the pool and
    /// records it in the history.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<TickOutcome> {
        if self.phase != DrawPhase::Drawing {
            return Ok(TickOutcome::Idle);
        }
        if self.pool.is_empty() {
            self.abort_draw();
            return Ok(TickOutcome::Idle);
        }

        self.ticks_elapsed += 1;
        if self.ticks_elapsed < self.settings.tick_count {
            let index = rng.random_range(0..self.pool.size());
            let name = self.pool.at(index)?.name().to_string();
            self.highlighted = Some(index);
            debug!(tick = self.ticks_elapsed, index, "Flicker");
            return Ok(TickOutcome::Flicker { index, name });
        }

        self.resolve(rng).map(TickOutcome::Resolved)
    }

    fn resolve<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<WinnerRecord> {
        let index = rng.random_range(0..self.pool.size());
        let winner = self.pool.remove_at(index)?;
        let record = WinnerRecord::new(winner, index);

        self.history.prepend(record.clone());
        self.pending_winner = Some(record.clone());
        self.highlighted = Some(index);
        self.phase = DrawPhase::Resolved;

        info!(
            winner = %record.participant,
            index,
            remaining = self.pool.size(),
            drawn = self.history.count(),
            "Winner drawn"
        );
        Ok(record)
    }

    /// Dismiss the winner announcement. Pool and history are unaffected.
    pub fn acknowledge_winner(&mut self) -> bool {
        if self.phase != DrawPhase::Resolved {
            return false;
        }
        self.phase = DrawPhase::Idle;
        self.pending_winner = None;
        self.highlighted = None;
        true
    }

    /// Stop a running draw without picking anyone.
    pub fn abort_draw(&mut self) -> bool {
        if self.phase != DrawPhase::Drawing {
            return false;
        }
        self.phase = DrawPhase::Idle;
        self.highlighted = None;
        self.ticks_elapsed = 0;
        info!("Draw aborted");
        true
    }

    /// Return to a fresh session. Safe in any state; outstanding import
    /// tickets become stale.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.history.clear();
        self.phase = DrawPhase::Idle;
        self.highlighted = None;
        self.pending_winner = None;
        self.ticks_elapsed = 0;
        self.feedback = None;
        self.epoch = Uuid::new_v4();
        info!("Session reset");
    }

    // --- Queries ---

    pub fn pool(&self) -> &ParticipantPool {
        &self.pool
    }

    pub fn history(&self) -> &WinnerHistory {
        &self.history
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn participant_count(&self) -> usize {
        self.pool.size()
    }

    pub fn status(&self) -> RaffleStatus {
        RaffleStatus::derive(self.phase, self.pool.is_empty())
    }

    pub fn pending_winner(&self) -> Option<&WinnerRecord> {
        self.pending_winner.as_ref()
    }

    pub fn feedback(&self) -> Option<&ImportFeedback> {
        self.feedback.as_ref()
    }

    pub fn ticks_elapsed(&self) -> u32 {
        self.ticks_elapsed
    }

    /// Winner names, most recent first.
    pub fn winner_list(&self) -> Vec<String> {
        self.history.names()
    }

    /// Winners numbered from 1, most recent first.
    pub fn numbered_winners(&self) -> impl Iterator<Item = (usize, &WinnerRecord)> {
        self.history.all().enumerate().map(|(i, r)| (i + 1, r))
    }

    /// Name in the slot: the flicker pick while drawing, the winner once resolved.
    pub fn current_highlighted_name(&self) -> Option<&str> {
        match self.phase {
            DrawPhase::Drawing => self
                .highlighted
                .and_then(|i| self.pool.at(i).ok())
                .map(|p| p.name()),
            DrawPhase::Resolved => self.pending_winner.as_ref().map(|w| w.name()),
            DrawPhase::Idle => None,
        }
    }

    pub fn display_text(&self) -> &str {
        self.current_highlighted_name().unwrap_or("Ready")
    }

    /// Reset is only offered once everyone has been drawn or nobody was added.
    pub fn reset_allowed(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn draw_action_label(&self) -> &'static str {
        if self.phase == DrawPhase::Drawing {
            "Drawing..."
        } else if self.pool.is_empty() {
            "No Participants"
        } else {
            "Draw Winner"
        }
    }

    /// Explanation shown when the pool is empty.
    pub fn pool_notice(&self) -> Option<&'static str> {
        if !self.pool.is_empty() {
            None
        } else if !self.history.is_empty() {
            Some("Raffle is complete - all participants have won!")
        } else {
            Some("No participants available for the raffle")
        }
    }

    pub fn participant_count_label(&self) -> String {
        format!("{} added", pluralize(self.pool.size(), "participant"))
    }

    pub fn winner_count_label(&self) -> String {
        pluralize(self.history.count(), "winner")
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            participant_count: self.pool.size(),
            participants: self.pool.names(),
            status: self.status(),
            phase: self.phase,
            display_text: self.display_text().to_string(),
            highlighted_index: self.highlighted,
            pending_winner: self.pending_winner.clone(),
            winners: self.history.all().cloned().collect(),
            can_draw: self.can_draw(),
            reset_allowed: self.reset_allowed(),
            draw_label: self.draw_action_label(),
            notice: self.pool_notice(),
            feedback: self.feedback.clone(),
        }
    }
}
