use std::time::Duration;
use tokio::time::Instant;

/// Minimum spacing between two location uploads.
pub const MIN_UPLOAD_INTERVAL: Duration = Duration::from_secs(20);

/// Parameters handed to the platform location sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingProfile {
    pub time_interval: Duration,
    pub distance_interval_m: u32,
}

impl SamplingProfile {
    /// Balanced accuracy, a sample every 30 s or 50 m.
    pub const BALANCED: SamplingProfile = SamplingProfile {
        time_interval: Duration::from_secs(30),
        distance_interval_m: 50,
    };
}

/// Lets at most one upload through per window. The first sample always passes.
///
/// The window is kept for the life of the reporter, across stop and start.
#[derive(Debug, Clone)]
pub struct UploadThrottle {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl UploadThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    /// Returns true and records `now` if an upload may go out.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }
}

impl Default for UploadThrottle {
    fn default() -> Self {
        Self::new(MIN_UPLOAD_INTERVAL)
    }
}
