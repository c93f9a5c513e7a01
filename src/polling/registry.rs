use crate::clients::{ApiClient, OrderClient, OrderScope};
use crate::error::OrderError;
use crate::framework::{CacheEvent, CacheTag};
use crate::model::{Order, OrderId};
use crate::polling::{PollPolicy, Watch};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, Duration, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn, Instrument};

pub type OrderWatch = Watch<Order>;
pub type OrdersWatch = Watch<Vec<Order>>;

/// Result of asking to watch an order.
#[derive(Debug)]
pub enum WatchOutcome {
    Watching(OrderWatch),
    /// The cached order is already terminal; no subscription was created.
    Terminal(Order),
}

/// Why a poll loop woke up.
enum Wake {
    Tick,
    Invalidated,
    Ignore,
    Stop,
}

/// Starts polling subscriptions for order views.
///
/// Each watch runs as its own task. Two things make it refetch: its timer,
/// and any cache invalidation touching its tags (for example one triggered
/// by a push notification). Both go through the same cache entry, so
/// whichever response is newest wins.
#[derive(Clone)]
pub struct PollingRegistry {
    orders: OrderClient,
    policy: PollPolicy,
}

impl PollingRegistry {
    pub fn new(orders: OrderClient, policy: PollPolicy) -> Self {
        Self { orders, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Watches a single order until it reaches a terminal status.
    #[instrument(skip(self))]
    pub async fn watch_order(&self, id: OrderId) -> Result<WatchOutcome, OrderError> {
        if let Some(order) = self.orders.cached_order(&id).await? {
            if order.is_terminal() {
                info!(status = %order.status, "Order is terminal, not polling");
                return Ok(WatchOutcome::Terminal(order));
            }
        }

        let (tx, rx) = watch::channel(None);
        let events = self.orders.query_client().cache().subscribe();
        let span = tracing::info_span!("order_poll", order_id = %id);
        let handle = tokio::spawn(
            poll_order(self.orders.clone(), id, self.policy.order, tx, events).instrument(span),
        );
        Ok(WatchOutcome::Watching(Watch::new(rx, handle)))
    }

    /// Watches an order list.
    ///
    /// The timer only runs while at least one listed order is still moving;
    /// an empty or all-terminal list refreshes on invalidation alone.
    #[instrument(skip(self))]
    pub fn watch_orders(&self, scope: OrderScope) -> OrdersWatch {
        let (tx, rx) = watch::channel(None);
        let events = self.orders.query_client().cache().subscribe();
        let span = tracing::info_span!("orders_poll", scope = ?scope);
        let handle = tokio::spawn(
            poll_orders(self.orders.clone(), scope, self.policy.list, tx, events).instrument(span),
        );
        Watch::new(rx, handle)
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn classify(event: Result<CacheEvent, RecvError>, tags: &[CacheTag]) -> Wake {
    match event {
        Ok(event) if event.invalidates_any(tags) => Wake::Invalidated,
        Ok(_) => Wake::Ignore,
        Err(RecvError::Lagged(skipped)) => {
            // Missed events may have included ours.
            debug!(skipped, "Cache events lagged");
            Wake::Invalidated
        }
        Err(RecvError::Closed) => Wake::Stop,
    }
}

async fn poll_order(
    orders: OrderClient,
    id: OrderId,
    period: Duration,
    tx: watch::Sender<Option<Order>>,
    mut events: broadcast::Receiver<CacheEvent>,
) {
    let tags = [CacheTag::Order(id.clone())];
    let mut ticker = ticker(period);
    let mut first = true;
    debug!(period_secs = period.as_secs(), "Polling started");

    loop {
        let wake = tokio::select! {
            _ = ticker.tick() => Wake::Tick,
            event = events.recv() => classify(event, &tags),
            _ = tx.closed() => Wake::Stop,
        };
        let force = match wake {
            // The first tick may be served from a fresh cache entry.
            Wake::Tick => !std::mem::replace(&mut first, false),
            Wake::Invalidated => false,
            Wake::Ignore => continue,
            Wake::Stop => break,
        };

        match orders.get_order(&id, force).await {
            Ok(order) => {
                let terminal = order.is_terminal();
                let status = order.status;
                tx.send_replace(Some(order));
                if terminal {
                    info!(%status, "Order reached terminal status, polling stopped");
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Order poll failed"),
        }
    }
}

async fn poll_orders(
    orders: OrderClient,
    scope: OrderScope,
    period: Duration,
    tx: watch::Sender<Option<Vec<Order>>>,
    mut events: broadcast::Receiver<CacheEvent>,
) {
    let tags = [CacheTag::Orders];
    let mut ticker = ticker(period);
    let mut ticking = true;
    let mut first = true;

    loop {
        let wake = tokio::select! {
            _ = ticker.tick(), if ticking => Wake::Tick,
            event = events.recv() => classify(event, &tags),
            _ = tx.closed() => Wake::Stop,
        };
        let force = match wake {
            // The first tick may be served from a fresh cache entry.
            Wake::Tick => !std::mem::replace(&mut first, false),
            Wake::Invalidated => false,
            Wake::Ignore => continue,
            Wake::Stop => break,
        };

        match orders.list_orders(&scope, force).await {
            Ok(list) => {
                let active = list.iter().any(|o| !o.is_terminal());
                if active != ticking {
                    debug!(active, count = list.len(), "List polling toggled");
                    if active {
                        ticker.reset();
                    }
                    ticking = active;
                }
                tx.send_replace(Some(list));
            }
            Err(e) => warn!(error = %e, "Order list poll failed"),
        }
    }
}
