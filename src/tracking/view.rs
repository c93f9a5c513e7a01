use crate::clients::DeliveryClient;
use crate::model::{DeliveryLocation, OrderId};
use crate::polling::Watch;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, warn, Instrument};

/// Customer and admin side of live tracking: polls the last reported
/// location of an order.
#[derive(Clone)]
pub struct TrackingView {
    delivery: DeliveryClient,
    period: Duration,
}

impl TrackingView {
    pub fn new(delivery: DeliveryClient, period: Duration) -> Self {
        Self { delivery, period }
    }

    /// Starts polling. The watch stays `None` until a first location exists.
    pub fn watch(&self, order_id: OrderId) -> Watch<DeliveryLocation> {
        let (tx, rx) = watch::channel(None);
        let span = tracing::info_span!("tracking_poll", %order_id);
        let handle = tokio::spawn(
            poll_location(self.delivery.clone(), order_id, self.period, tx).instrument(span),
        );
        Watch::new(rx, handle)
    }
}

async fn poll_location(
    delivery: DeliveryClient,
    order_id: OrderId,
    period: Duration,
    tx: watch::Sender<Option<DeliveryLocation>>,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tx.closed() => break,
        }
        match delivery.delivery_location(&order_id, true).await {
            Ok(Some(location)) => {
                tx.send_replace(Some(location));
            }
            Ok(None) => debug!("No location reported yet"),
            Err(e) => warn!(error = %e, "Location poll failed"),
        }
    }
}

/// "Just now", "N min ago" or "N hr ago" for the last location update.
pub fn last_update_label(now: DateTime<Utc>, updated_at: DateTime<Utc>) -> String {
    let minutes = (now - updated_at).num_minutes();
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} min ago")
    } else {
        format!("{} hr ago", minutes / 60)
    }
}
