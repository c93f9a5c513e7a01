//! Push notification routing.
//!
//! A notification only ever says "something about this order changed". In
//! the foreground that becomes a cache invalidation (the poll tasks refetch
//! right away); from the background it becomes a navigation target.

pub mod router;

pub use router::*;

use crate::model::OrderId;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    OrderStatusUpdate,
    NewOrder,
    DeliveryAssigned,
    OrderCancelled,
    #[serde(other)]
    Other,
}

/// The `data` object of a push notification: `{ "type": ..., "order_id": ... }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "type")]
    pub kind: PushKind,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

impl PushPayload {
    /// Parses a notification's data object. Payloads without a `type` are
    /// not ours and yield `None`.
    pub fn parse(data: &Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }
}
