use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::ports::RandomSource;

const MARGIN_BASE_MS: f64 = 60_000.0;
const MARGIN_SPREAD: f64 = 3.0;

/// Draws the randomized lead time before expiry, in milliseconds.
///
/// Uniform in [60000, 240000): refreshing 1–4 minutes early desynchronizes
/// sessions sharing the same expiry policy.
fn refresh_margin_ms(random: &dyn RandomSource) -> i64 {
    ((1.0 + MARGIN_SPREAD * random.uniform()) * MARGIN_BASE_MS) as i64
}

/// Computes how long to wait before refreshing; zero when the expiry is
/// already inside the margin or in the past.
fn delay_until(expires_at: DateTime<Utc>, now: DateTime<Utc>, margin_ms: i64) -> Duration {
    let delay_ms = (expires_at - now).num_milliseconds() - margin_ms;
    u64::try_from(delay_ms).map_or(Duration::ZERO, Duration::from_millis)
}

/// Arms cancellable timers that re-drive the executor around a known
/// expiry.
pub struct RefreshScheduler {
    random: Arc<dyn RandomSource>,
    fired: mpsc::UnboundedSender<()>,
}

impl RefreshScheduler {
    /// Creates a scheduler reporting fired timers on the given channel.
    #[must_use]
    pub fn new(random: Arc<dyn RandomSource>, fired: mpsc::UnboundedSender<()>) -> Self {
        Self { random, fired }
    }

    /// Arms a timer firing inside the randomized margin window before
    /// `expires_at`; a past or imminent expiry fires immediately.
    #[must_use]
    pub fn arm(&self, expires_at: DateTime<Utc>) -> ScheduledTimer {
        let margin_ms = refresh_margin_ms(self.random.as_ref());
        let delay = delay_until(expires_at, Utc::now(), margin_ms);

        debug!(
            expires_at = %expires_at,
            margin_ms,
            delay_secs = delay.as_secs(),
            "arming refresh timer"
        );

        let fired = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(());
        });

        ScheduledTimer { handle }
    }
}

/// Ownership-scoped handle for the next pending refresh.
///
/// At most one is alive per session. Cancelling prevents the pending fire;
/// dropping the handle cancels it as well.
pub struct ScheduledTimer {
    handle: JoinHandle<()>,
}

impl ScheduledTimer {
    /// Prevents the timer from firing; no-op if already fired or already
    /// cancelled.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
