use chrono::{Duration, TimeZone, Utc};
use delivery_sync::api::mock::MockTransport;
use delivery_sync::api::{Method, SessionStore, Target};
use delivery_sync::clients::OrderAction;
use delivery_sync::config::Config;
use delivery_sync::lifecycle::DeliverySystem;
use delivery_sync::model::{Order, OrderStatus, Role};
use delivery_sync::notifications::{AppState, PushKind, PushPayload, RouteOutcome};
use delivery_sync::polling::{PollPolicy, WatchOutcome};
use delivery_sync::workflow::{actions_for, EtaOption, StatusAction};
use serde_json::{json, Value};
use std::sync::Arc;

fn config() -> Config {
    Config {
        supabase_url: "https://abc.supabase.co".into(),
        supabase_anon_key: "anon".into(),
        google_maps_api_key: None,
        poll: PollPolicy::default(),
        location_throttle: std::time::Duration::from_secs(20),
    }
}

fn order_row(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "user_id": "user-1",
        "status": status,
        "total_paise": 45900,
        "order_items": [{
            "product_id": "p-1",
            "product_name": "Kashmiri Chilli Powder 200g",
            "quantity": 3,
            "unit_price_paise": 15300,
            "total_paise": 45900
        }],
        "shipping_address_line1": "12 MG Road",
        "shipping_city": "Pune",
        "shipping_state": "MH",
        "shipping_pincode": "411001",
        "created_at": "2026-10-19T10:00:00Z"
    })
}

fn start(mock: &MockTransport) -> DeliverySystem {
    DeliverySystem::new(&config(), Arc::new(mock.clone()), SessionStore::new()).unwrap()
}

/// Confirming with a 4 hour estimate sends exactly the status and the
/// resolved timestamp.
#[tokio::test]
async fn test_confirm_order_sends_status_and_eta() {
    let mock = MockTransport::new();
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
    let eta = now + Duration::hours(4);
    let mut confirmed = order_row("order-123", "confirmed");
    confirmed["estimated_delivery_at"] = json!(eta);
    mock.expect(Method::Patch, Target::Rest("orders".into()))
        .with_query("id", "eq.order-123")
        .return_ok(confirmed);

    let system = start(&mock);
    let order = system
        .orders
        .confirm_order(&"order-123".into(), EtaOption::InHours(4), now)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Confirmed);
    let sent = mock.requests();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].single);
    assert_eq!(
        sent[0].body,
        Some(json!({
            "status": "confirmed",
            "estimated_delivery_at": "2026-10-19T13:00:00Z"
        }))
    );

    system.shutdown().await.unwrap();
}

/// A full admin pass: confirm, dispatch. Every step is checked against the
/// status table first and the cached order is refreshed afterwards.
#[tokio::test]
async fn test_admin_flow_follows_status_table() {
    let mock = MockTransport::new();
    mock.expect(Method::Get, Target::Rest("orders".into()))
        .return_ok(order_row("order-1", "placed"));
    mock.expect(Method::Patch, Target::Rest("orders".into()))
        .return_ok(order_row("order-1", "confirmed"));
    mock.expect(Method::Get, Target::Rest("orders".into()))
        .return_ok(order_row("order-1", "confirmed"));
    mock.expect(Method::Post, Target::Rpc("assign_delivery_staff".into()))
        .return_ok(Value::Null);
    mock.expect(Method::Get, Target::Rest("orders".into()))
        .return_ok(order_row("order-1", "out_for_delivery"));

    let system = start(&mock);
    let id = "order-1".into();

    let order = system.orders.get_order(&id, false).await.unwrap();
    assert_eq!(
        actions_for(order.status, Role::Admin),
        &[StatusAction::Confirm, StatusAction::Cancel]
    );
    system
        .orders
        .apply_action(
            &order,
            Role::Admin,
            OrderAction::Confirm { eta: EtaOption::Skip, now: Utc::now() },
        )
        .await
        .unwrap();

    // The mutation made the cached copy stale.
    let order = system.orders.get_order(&id, false).await.unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    system
        .orders
        .apply_action(&order, Role::Admin, OrderAction::Dispatch { staff_id: "staff-1".into() })
        .await
        .unwrap();

    let order = system.orders.get_order(&id, false).await.unwrap();
    assert_eq!(order.status, OrderStatus::OutForDelivery);
    assert!(actions_for(order.status, Role::Admin).is_empty());
    assert_eq!(
        actions_for(order.status, Role::Delivery),
        &[StatusAction::MarkDelivered, StatusAction::MarkFailed]
    );

    mock.verify();
    system.shutdown().await.unwrap();
}

/// A foreground push makes the detail poller refetch without waiting for
/// its next tick, and the terminal result ends the subscription.
#[tokio::test(start_paused = true)]
async fn test_push_notification_wakes_poller() {
    let mock = MockTransport::new();
    mock.expect(Method::Get, Target::Rest("orders".into()))
        .return_ok(order_row("order-1", "out_for_delivery"));
    mock.expect(Method::Get, Target::Rest("orders".into()))
        .return_ok(order_row("order-1", "delivered"));

    let system = start(&mock);
    let WatchOutcome::Watching(mut watch) = system.polling.watch_order("order-1".into()).await.unwrap()
    else {
        panic!("order is not terminal yet");
    };
    assert_eq!(watch.changed().await.unwrap().status, OrderStatus::OutForDelivery);

    let started = tokio::time::Instant::now();
    let outcome = system
        .notifications
        .handle(
            PushPayload {
                kind: PushKind::OrderStatusUpdate,
                order_id: Some("order-1".into()),
            },
            AppState::Foreground,
        )
        .await
        .unwrap();
    assert!(matches!(outcome, RouteOutcome::Invalidated(_)));

    let order: Order = watch.changed().await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    // Terminal now: a new watch is refused outright.
    assert!(matches!(
        system.polling.watch_order("order-1".into()).await.unwrap(),
        WatchOutcome::Terminal(_)
    ));

    drop(watch);
    mock.verify();
    system.shutdown().await.unwrap();
}
