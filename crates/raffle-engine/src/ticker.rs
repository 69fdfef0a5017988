//! Cancellable repeating timer for the draw animation.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(1);
const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Handle to a running tick loop. Dropping it stops the loop.
pub struct DrawTicker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DrawTicker {
    /// Call `on_tick` every `period` with a 1-based tick number until it
    /// returns `ControlFlow::Break` or the handle is cancelled.
    ///
    /// The first call happens one full period after spawning. Must be called
    /// from within a tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u32) -> ControlFlow<()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = period.clamp(MIN_PERIOD, MAX_PERIOD);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u32;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(ticks, "Ticker cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        ticks += 1;
                        if on_tick(ticks).is_break() {
                            debug!(ticks, "Ticker finished");
                            break;
                        }
                    }
                }
            }
        });

        Self { cancel, task }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DrawTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
