use delivery_sync::config::Config;
use delivery_sync::lifecycle::{setup_tracing, DeliverySystem};
use delivery_sync::model::OrderId;
use delivery_sync::polling::WatchOutcome;
use delivery_sync::tracking::last_update_label;
use tracing::{error, info};

const USAGE: &str = "usage: delivery-sync track <order_id>";

#[tokio::main]
async fn main() {
    setup_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let order_id = match args.as_slice() {
        [command, id] if command == "track" => OrderId::from(id.as_str()),
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(order_id).await {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Follows an order until it reaches a terminal status.
async fn run(order_id: OrderId) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let system = DeliverySystem::connect(&config)?;

    match system.polling.watch_order(order_id.clone()).await? {
        WatchOutcome::Terminal(order) => {
            info!(%order_id, status = %order.status, "Order already finished");
        }
        WatchOutcome::Watching(mut watch) => {
            let mut tracking = system.tracking.watch(order_id.clone());
            let mut last_status = None;
            loop {
                tokio::select! {
                    order = watch.changed() => {
                        let Some(order) = order else { break };
                        if last_status != Some(order.status) {
                            info!(%order_id, status = %order.status, eta = ?order.estimated_delivery_at, "Status");
                            last_status = Some(order.status);
                        }
                        if order.is_terminal() {
                            break;
                        }
                    }
                    Some(location) = tracking.changed() => {
                        info!(
                            lat = location.latitude,
                            lng = location.longitude,
                            updated = %last_update_label(chrono::Utc::now(), location.timestamp),
                            "Location"
                        );
                    }
                }
            }
        }
    }

    system.shutdown().await?;
    Ok(())
}
