// Adaptive throttle for Slack history calls.
//
// `conversations.history` is a Tier 3 method (~50 calls/minute). We don't
// pace calls up front: the first rejection switches the throttle on, after
// which every call waits a fixed delay (60s / 50 = 1.2s). Slack sometimes
// lets us run faster than the published tier, so once a full cooldown window
// passes without another rejection the delay is lifted again.
//
// One Throttle is shared by every channel in a sync run — the budget belongs
// to the token, not to a channel.

use tokio::time::{Duration, Instant};
use tracing::{info, warn};

/// Delay inserted before every call while throttled.
pub const THROTTLE_DELAY: Duration = Duration::from_millis(1200);

/// How long without a rejection before the delay is lifted.
pub const THROTTLE_COOLDOWN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    cooldown: Duration,
    /// Set while throttled: when Slack last rejected us.
    rejected_at: Option<Instant>,
    /// Successful calls since the last rejection (for logging).
    successes_since_rejection: u64,
    /// Total rejections seen over the life of this throttle.
    rejections: u64,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(THROTTLE_DELAY, THROTTLE_COOLDOWN)
    }
}

impl Throttle {
    pub fn new(delay: Duration, cooldown: Duration) -> Self {
        Self {
            delay,
            cooldown,
            rejected_at: None,
            successes_since_rejection: 0,
            rejections: 0,
        }
    }

    /// Whether the throttle is currently on (without running the cooldown check).
    pub fn is_throttled(&self) -> bool {
        self.rejected_at.is_some()
    }

    /// Total rate-limit rejections recorded.
    pub fn rejections(&self) -> u64 {
        self.rejections
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decide whether the next call has to wait.
    ///
    /// Lifts the throttle first if the cooldown has passed since the last
    /// rejection, so the call right after the cooldown goes out immediately.
    pub fn should_wait(&mut self) -> bool {
        let Some(rejected_at) = self.rejected_at else {
            return false;
        };

        if rejected_at.elapsed() > self.cooldown {
            info!(
                successful_calls = self.successes_since_rejection,
                "Unthrottling"
            );
            self.rejected_at = None;
            return false;
        }

        true
    }

    /// Sleep for the throttle delay if throttled. Call before every API request.
    pub async fn wait(&mut self) {
        if self.should_wait() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Slack rejected a call. Turns the throttle on (or restarts the cooldown).
    pub fn record_rejection(&mut self) {
        if self.rejected_at.is_none() {
            warn!(
                delay_ms = self.delay.as_millis() as u64,
                "Slack throttled us, slowing down"
            );
        } else {
            warn!("Slack throttled us again, restarting cooldown");
        }
        self.rejected_at = Some(Instant::now());
        self.successes_since_rejection = 0;
        self.rejections += 1;
    }

    /// A call went through.
    pub fn record_success(&mut self) {
        self.successes_since_rejection += 1;
    }
}
