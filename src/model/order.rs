/// Represents a customer order as the backend reports it.
///
/// The client never owns an order: every [`Order`] value is a cached,
/// possibly stale copy of the row behind `/rest/v1/orders`. Mutations go
/// through [`OrderClient`](crate::clients::OrderClient) and come back through
/// the query cache.
use crate::model::{StaffId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an order.
///
/// ```text
/// placed → confirmed | cancelled
/// confirmed → out_for_delivery (dispatch)
/// out_for_delivery → delivered | delivery_failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Confirmed,
    OutForDelivery,
    Delivered,
    Cancelled,
    DeliveryFailed,
}

impl OrderStatus {
    /// Statuses from which no further transition is possible.
    ///
    /// This is the only terminal table in the crate; pollers, the status
    /// action table and the views all go through [`OrderStatus::is_terminal`].
    pub const TERMINAL: [OrderStatus; 3] = [
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::DeliveryFailed,
    ];

    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::DeliveryFailed,
    ];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// Wire name, as used in PostgREST filters and request bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::DeliveryFailed => "delivery_failed",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount in paise (1/100 rupee). All monetary fields use this unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paise(pub i64);

impl Display for Paise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}₹{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_paise: Paise,
    pub total_paise: Paise,
}

/// Shipping address captured at checkout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(rename = "shipping_address_line1")]
    pub line1: String,
    #[serde(rename = "shipping_address_line2", default)]
    pub line2: Option<String>,
    #[serde(rename = "shipping_city")]
    pub city: String,
    #[serde(rename = "shipping_state")]
    pub state: String,
    #[serde(rename = "shipping_pincode")]
    pub pincode: String,
    #[serde(rename = "shipping_latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "shipping_longitude", default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub status: OrderStatus,
    pub total_paise: Paise,
    #[serde(default, alias = "order_items")]
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub shipping: ShippingAddress,
    #[serde(default)]
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_otp: Option<String>,
    #[serde(default)]
    pub delivery_staff_id: Option<StaffId>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// One row of the append-only status audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusHistoryEntry {
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of a status change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: OrderStatus) -> Self {
        Self {
            status,
            estimated_delivery_at: None,
            admin_notes: None,
            cancellation_reason: None,
        }
    }
}
