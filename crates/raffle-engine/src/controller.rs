//! Raffle controller: drives a [`RaffleSession`] from a tokio timer.
//!
//! The controller owns the session behind a mutex, at most one running
//! [`DrawTicker`], and a broadcast channel of [`RaffleEvent`]s. All methods
//! that start timers must be called from within a tokio runtime.

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use raffle_core::config::RaffleConfig;
use raffle_core::{DrawPhase, RaffleError, RaffleStatus, Result, WinnerRecord};

use crate::events::RaffleEvent;
use crate::session::{DrawSettings, RaffleSession, SessionSnapshot, TickOutcome};
use crate::ticker::DrawTicker;

const EVENT_CAPACITY: usize = 256;

struct Inner {
    session: RaffleSession,
    rng: StdRng,
    ticker: Option<DrawTicker>,
    /// Bumped on every draw start, abort and reset so a late tick from an old
    /// ticker cannot advance a newer draw.
    draw_seq: u64,
    /// Bumped on every new feedback message and reset.
    feedback_seq: u64,
}

/// Cloneable handle to one raffle session.
#[derive(Clone)]
pub struct RaffleController {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<RaffleEvent>,
}

impl RaffleController {
    /// Controller with an OS-seeded RNG.
    pub fn new(config: &RaffleConfig) -> Self {
        Self::with_rng(DrawSettings::from_config(config), StdRng::from_os_rng())
    }

    /// Controller with a fixed seed, for reproducible draws.
    pub fn with_seed(config: &RaffleConfig, seed: u64) -> Self {
        Self::with_rng(DrawSettings::from_config(config), StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(settings: DrawSettings, rng: StdRng) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                session: RaffleSession::new(settings),
                rng,
                ticker: None,
                draw_seq: 0,
                feedback_seq: 0,
            })),
            events,
        }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<RaffleEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    // --- Adding participants ---

    pub fn add_from_text(&self, text: &str) -> Result<usize> {
        let mut inner = self.lock();
        match inner.session.add_from_text(text) {
            Ok(added) => {
                emit(&self.events, RaffleEvent::ParticipantsAdded {
                    added,
                    total: inner.session.participant_count(),
                });
                Ok(added)
            }
            Err(e) => {
                debug!(%e, "Text submission ignored");
                Err(e)
            }
        }
    }

    /// Add names from CSV file content that is already in memory.
    pub fn add_from_csv(&self, bytes: &[u8]) -> Result<usize> {
        let mut inner = self.lock();
        let result = inner.session.add_from_csv(bytes);
        self.after_csv_import(&mut inner, result)
    }

    /// Read a CSV file and add its names. The read happens without holding
    /// the session; if the session is reset meanwhile the content is dropped
    /// and `RaffleError::StaleImport` is returned.
    pub async fn import_csv_file(&self, path: &Path) -> Result<usize> {
        info!(path = %path.display(), "Importing CSV file");
        self.import_csv_with(raffle_import::read_file(path)).await
    }

    /// Take an import ticket, await `read`, then apply the content only if the
    /// ticket still matches the session.
    async fn import_csv_with<F>(&self, read: F) -> Result<usize>
    where
        F: Future<Output = Result<Vec<u8>>>,
    {
        let ticket = self.lock().session.import_ticket();
        let bytes = read.await?;

        let mut inner = self.lock();
        let result = inner.session.apply_csv_import(ticket, &bytes);
        if matches!(result, Err(RaffleError::StaleImport)) {
            return result;
        }
        self.after_csv_import(&mut inner, result)
    }

    fn after_csv_import(&self, inner: &mut Inner, result: Result<usize>) -> Result<usize> {
        if let Some(feedback) = inner.session.feedback().cloned() {
            inner.feedback_seq += 1;
            emit(&self.events, feedback.into());
            self.schedule_feedback_clear(inner.feedback_seq, inner.session.settings().feedback_ttl);
        }
        if let Ok(added) = result {
            emit(&self.events, RaffleEvent::ParticipantsAdded {
                added,
                total: inner.session.participant_count(),
            });
        }
        result
    }

    fn schedule_feedback_clear(&self, seq: u64, ttl: std::time::Duration) {
        let weak = Arc::downgrade(&self.inner);
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut inner = lock_inner(&inner);
            if inner.feedback_seq == seq && inner.session.clear_feedback() {
                emit(&events, RaffleEvent::FeedbackCleared);
            }
        });
    }

    // --- Drawing ---

    /// Start a draw. Returns `false` (and changes nothing) while a draw is
    /// running or when the pool is empty.
    pub fn start_draw(&self) -> bool {
        let mut inner = self.lock();
        let had_pending = inner.session.pending_winner().is_some();
        if !inner.session.begin_draw() {
            return false;
        }
        if had_pending {
            emit(&self.events, RaffleEvent::WinnerDismissed);
        }

        inner.draw_seq += 1;
        let seq = inner.draw_seq;
        let period = inner.session.settings().tick_interval;
        let weak = Arc::downgrade(&self.inner);
        let events = self.events.clone();

        emit(&events, RaffleEvent::DrawStarted {
            pool_size: inner.session.participant_count(),
        });
        inner.ticker = Some(DrawTicker::spawn(period, move |_| on_tick(&weak, &events, seq)));
        true
    }

    /// Dismiss the winner announcement.
    pub fn acknowledge_winner(&self) -> bool {
        let mut inner = self.lock();
        let dismissed = inner.session.acknowledge_winner();
        if dismissed {
            emit(&self.events, RaffleEvent::WinnerDismissed);
        }
        dismissed
    }

    /// Cancel a running draw. Pool and history stay as they were.
    pub fn abort_draw(&self) -> bool {
        let mut inner = self.lock();
        if !inner.session.abort_draw() {
            return false;
        }
        inner.draw_seq += 1;
        inner.ticker = None;
        emit(&self.events, RaffleEvent::DrawAborted);
        true
    }

    /// Clear pool, history and any running draw or pending winner.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.ticker = None;
        inner.draw_seq += 1;
        inner.feedback_seq += 1;
        inner.session.reset();
        emit(&self.events, RaffleEvent::Reset);
    }

    // --- Queries ---

    pub fn participant_count(&self) -> usize {
        self.lock().session.participant_count()
    }

    pub fn status(&self) -> RaffleStatus {
        self.lock().session.status()
    }

    pub fn phase(&self) -> DrawPhase {
        self.lock().session.phase()
    }

    pub fn winner_list(&self) -> Vec<String> {
        self.lock().session.winner_list()
    }

    /// Winner records numbered from 1, most recent first.
    pub fn numbered_winners(&self) -> Vec<(usize, WinnerRecord)> {
        self.lock()
            .session
            .numbered_winners()
            .map(|(n, record)| (n, record.clone()))
            .collect()
    }

    pub fn current_highlighted_name(&self) -> Option<String> {
        self.lock().session.current_highlighted_name().map(str::to_string)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().session.snapshot()
    }

    /// Whether a tick loop is currently running.
    pub fn is_ticking(&self) -> bool {
        self.lock()
            .ticker
            .as_ref()
            .is_some_and(|t| !t.is_cancelled() && !t.is_finished())
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit(events: &broadcast::Sender<RaffleEvent>, event: RaffleEvent) {
    // No subscribers is fine.
    let receivers = events.send(event).unwrap_or(0);
    debug!(receivers, "Event emitted");
}

fn on_tick(
    weak: &Weak<Mutex<Inner>>,
    events: &broadcast::Sender<RaffleEvent>,
    seq: u64,
) -> ControlFlow<()> {
    let Some(inner) = weak.upgrade() else {
        return ControlFlow::Break(());
    };
    let mut guard = lock_inner(&inner);
    let inner = &mut *guard;
    if inner.draw_seq != seq {
        return ControlFlow::Break(());
    }

    match inner.session.tick(&mut inner.rng) {
        Ok(TickOutcome::Flicker { index, name }) => {
            emit(events, RaffleEvent::Highlight { index, name });
            ControlFlow::Continue(())
        }
        Ok(TickOutcome::Resolved(winner)) => {
            inner.ticker = None;
            emit(events, RaffleEvent::WinnerDrawn {
                name: winner.name().to_string(),
                index: winner.pool_index,
                remaining: inner.session.participant_count(),
                drawn: inner.session.history().count(),
            });
            ControlFlow::Break(())
        }
        Ok(TickOutcome::Idle) => {
            inner.ticker = None;
            ControlFlow::Break(())
        }
        Err(e) => {
            error!(%e, "Draw failed, aborting");
            inner.session.abort_draw();
            inner.ticker = None;
            emit(events, RaffleEvent::DrawAborted);
            warn!("Pool and history left unchanged");
            ControlFlow::Break(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config(tick_count: u32) -> RaffleConfig {
        RaffleConfig {
            draw: Some(raffle_core::config::DrawConfig {
                tick_interval_ms: 10,
                tick_count,
            }),
            ..Default::default()
        }
    }

    async fn next_winner(rx: &mut broadcast::Receiver<RaffleEvent>) -> String {
        loop {
            if let RaffleEvent::WinnerDrawn { name, .. } = rx.recv().await.unwrap() {
                return name;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_resolves_after_ticks() {
        let controller = RaffleController::with_seed(&fast_config(5), 1);
        let mut rx = controller.subscribe();
        controller.add_from_text("Ann\nBob\nCid").unwrap();

        assert!(controller.start_draw());
        assert_eq!(controller.status(), RaffleStatus::Drawing);

        let mut highlights = 0;
        let winner = loop {
            match rx.recv().await.unwrap() {
                RaffleEvent::Highlight { index, .. } => {
                    assert!(index < 3);
                    highlights += 1;
                }
                RaffleEvent::WinnerDrawn { name, remaining, drawn, .. } => {
                    assert_eq!(remaining, 2);
                    assert_eq!(drawn, 1);
                    break name;
                }
                _ => {}
            }
        };

        assert_eq!(highlights, 4);
        assert_eq!(controller.status(), RaffleStatus::Complete);
        assert_eq!(controller.winner_list(), vec![winner.clone()]);
        assert_eq!(controller.current_highlighted_name(), Some(winner));
        assert!(!controller.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let controller = RaffleController::with_seed(&fast_config(5), 2);
        let mut rx = controller.subscribe();
        controller.add_from_text("Ann\nBob").unwrap();

        assert!(controller.start_draw());
        assert!(!controller.start_draw());

        next_winner(&mut rx).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(controller.winner_list().len(), 1);
        assert_eq!(controller.participant_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_draw_duration() {
        let config = RaffleConfig::default();
        let controller = RaffleController::with_seed(&config, 3);
        let mut rx = controller.subscribe();
        controller.add_from_text("Ann\nBob").unwrap();

        let started = tokio::time::Instant::now();
        controller.start_draw();
        next_winner(&mut rx).await;
        let elapsed = started.elapsed();
        assert!(elapsed >= config.draw_duration());
        assert!(elapsed < config.draw_duration() + config.tick_interval());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stops_ticking() {
        let controller = RaffleController::with_seed(&fast_config(50), 4);
        controller.add_from_text("Ann\nBob").unwrap();
        controller.start_draw();

        tokio::time::sleep(Duration::from_millis(55)).await;
        assert!(controller.abort_draw());
        assert!(!controller.abort_draw());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(controller.phase(), DrawPhase::Idle);
        assert_eq!(controller.participant_count(), 2);
        assert!(controller.winner_list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_mid_draw() {
        let controller = RaffleController::with_seed(&fast_config(50), 5);
        controller.add_from_text("Ann\nBob").unwrap();
        controller.start_draw();
        tokio::time::sleep(Duration::from_millis(100)).await;

        controller.reset();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.participant_count, 0);
        assert!(snapshot.winners.is_empty());
        assert_eq!(snapshot.phase, DrawPhase::Idle);
        assert!(snapshot.pending_winner.is_none());
        assert!(!controller.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_reset_uses_fresh_ticker() {
        let controller = RaffleController::with_seed(&fast_config(5), 6);
        let mut rx = controller.subscribe();
        controller.add_from_text("Ann\nBob").unwrap();
        controller.start_draw();
        tokio::time::sleep(Duration::from_millis(15)).await;

        controller.reset();
        controller.add_from_text("Cid\nDee").unwrap();
        controller.start_draw();

        let winner = next_winner(&mut rx).await;
        assert!(winner == "Cid" || winner == "Dee");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(controller.winner_list().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_twice() {
        let controller = RaffleController::with_seed(&fast_config(2), 7);
        let mut rx = controller.subscribe();
        controller.add_from_text("Ann\nBob").unwrap();
        controller.start_draw();
        next_winner(&mut rx).await;

        assert!(controller.acknowledge_winner());
        assert!(!controller.acknowledge_winner());
        assert_eq!(controller.status(), RaffleStatus::Ready);
        assert_eq!(controller.winner_list().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redraw_dismisses_pending_winner() {
        let controller = RaffleController::with_seed(&fast_config(2), 11);
        let mut rx = controller.subscribe();
        controller.add_from_text("Ann\nBob").unwrap();
        controller.start_draw();
        next_winner(&mut rx).await;

        assert!(controller.start_draw());
        assert!(matches!(rx.recv().await.unwrap(), RaffleEvent::WinnerDismissed));
        assert!(matches!(
            rx.recv().await.unwrap(),
            RaffleEvent::DrawStarted { pool_size: 1 }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_numbered_winners_most_recent_first() {
        let controller = RaffleController::with_seed(&fast_config(2), 5);
        let mut rx = controller.subscribe();
        controller.add_from_text("Ann\nBob").unwrap();

        controller.start_draw();
        let first = next_winner(&mut rx).await;
        controller.start_draw();
        let second = next_winner(&mut rx).await;

        let numbered = controller.numbered_winners();
        assert_eq!(numbered.len(), 2);
        assert_eq!(numbered[0].0, 1);
        assert_eq!(numbered[0].1.name(), second);
        assert_eq!(numbered[1].0, 2);
        assert_eq!(numbered[1].1.name(), first);
    }

    #[tokio::test]
    async fn test_reset_during_file_read_discards_import() {
        let controller = RaffleController::new(&RaffleConfig::default());
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (content_tx, content_rx) = tokio::sync::oneshot::channel::<Vec<u8>>();

        let importer = controller.clone();
        let task = tokio::spawn(async move {
            importer
                .import_csv_with(async move {
                    let _ = started_tx.send(());
                    Ok(content_rx.await.unwrap_or_default())
                })
                .await
        });

        started_rx.await.unwrap();
        controller.reset();
        content_tx.send(b"Ann\nBob\n".to_vec()).unwrap();

        assert!(matches!(task.await.unwrap(), Err(RaffleError::StaleImport)));
        assert_eq!(controller.participant_count(), 0);
        assert!(controller.snapshot().feedback.is_none());
    }

    #[tokio::test]
    async fn test_file_read_without_reset_applies() {
        let controller = RaffleController::new(&RaffleConfig::default());
        let (content_tx, content_rx) = tokio::sync::oneshot::channel::<Vec<u8>>();

        let importer = controller.clone();
        let task = tokio::spawn(async move {
            importer
                .import_csv_with(async move { Ok(content_rx.await.unwrap_or_default()) })
                .await
        });

        content_tx.send(b"Ann\nBob\n".to_vec()).unwrap();
        assert_eq!(task.await.unwrap().unwrap(), 2);
        assert_eq!(controller.participant_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_csv_feedback_clears() {
        let controller = RaffleController::with_seed(&fast_config(2), 8);
        let mut rx = controller.subscribe();

        assert!(matches!(
            controller.add_from_csv(b"1,2\n3,4"),
            Err(RaffleError::NoValidNames)
        ));
        assert_eq!(
            rx.recv().await.unwrap(),
            RaffleEvent::ImportFeedback {
                kind: raffle_import::FeedbackKind::Error,
                message: "No valid names found in CSV file".into(),
            }
        );
        assert!(controller.snapshot().feedback.is_some());

        assert_eq!(rx.recv().await.unwrap(), RaffleEvent::FeedbackCleared);
        assert!(controller.snapshot().feedback.is_none());
        assert_eq!(controller.participant_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_feedback_not_cleared_early() {
        let controller = RaffleController::with_seed(&RaffleConfig::default(), 9);
        controller.add_from_csv(b"Ann").unwrap();
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        controller.add_from_csv(b"Bob").unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(controller.snapshot().feedback.is_some());
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert!(controller.snapshot().feedback.is_none());
        assert_eq!(controller.participant_count(), 2);
    }

    #[tokio::test]
    async fn test_import_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        std::fs::write(&path, "First Name,Last Name\nJohn,Doe\nDoe,John\n").unwrap();

        let controller = RaffleController::new(&RaffleConfig::default());
        assert_eq!(controller.import_csv_file(&path).await.unwrap(), 2);
        assert_eq!(
            controller.snapshot().participants,
            vec!["John Doe".to_string(), "Doe John".to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_text_emits_nothing() {
        let controller = RaffleController::new(&RaffleConfig::default());
        let mut rx = controller.subscribe();
        assert!(matches!(controller.add_from_text("\n  \n"), Err(RaffleError::EmptyInput)));
        assert!(rx.try_recv().is_err());
        assert!(!controller.start_draw());
    }
}
