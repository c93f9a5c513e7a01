use std::time::Duration;
use tokio::time::Instant;

/// Cooldown before a new code can be requested.
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendCountdown {
    started_at: Instant,
    cooldown: Duration,
}

impl ResendCountdown {
    pub fn start(now: Instant) -> Self {
        Self {
            started_at: now,
            cooldown: RESEND_COOLDOWN,
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.cooldown
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }

    /// Whole seconds left, rounded up, for display.
    pub fn seconds_left(&self, now: Instant) -> u64 {
        let remaining = self.remaining(now);
        remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
    }

    pub fn can_resend(&self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    /// Restarts after a code was re-sent.
    pub fn restart(&mut self, now: Instant) {
        self.started_at = now;
    }
}
