//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing_subscriber` formatter whose
//! level comes from `RUST_LOG`. Targets are hidden to keep lines short; the
//! structured fields (`order_id`, `status`, `version`, `key`) carry the context.
//!
//! ```bash
//! RUST_LOG=info delivery-sync track order-123
//!
//! # Cache hits, leases and throttled uploads
//! RUST_LOG=debug delivery-sync track order-123
//!
//! # Only the cache actor
//! RUST_LOG=delivery_sync::framework=debug delivery-sync track order-123
//! ```
//!
//! With `RUST_LOG=info`, following an order looks like:
//!
//! ```text
//! INFO Cache actor started
//! INFO Location reporter started
//! INFO Delivery system started url=https://abc.supabase.co places=false
//! INFO order_poll{order_id=order-123}: Order reached terminal status, polling stopped status=delivered
//! ```

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. Call once, at startup.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
