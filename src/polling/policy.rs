use std::time::Duration;

/// Refetch periods for the polling subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Single order detail.
    pub order: Duration,
    /// Order lists (customer, admin, delivery).
    pub list: Duration,
    /// Live delivery location.
    pub tracking: Duration,
}

impl PollPolicy {
    pub const ORDER_DETAIL: Duration = Duration::from_secs(10);
    pub const ORDER_LIST: Duration = Duration::from_secs(15);
    pub const TRACKING: Duration = Duration::from_secs(15);
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            order: Self::ORDER_DETAIL,
            list: Self::ORDER_LIST,
            tracking: Self::TRACKING,
        }
    }
}
