use crate::model::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for delivery staff members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(pub String);

impl From<&str> for StaffId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for StaffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A delivery staff member.
///
/// The backend guarantees at most one active delivery per staff member;
/// the client only mirrors that through [`DeliveryStaff::can_deactivate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStaff {
    pub id: StaffId,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
    #[serde(default)]
    pub current_order_id: Option<OrderId>,
}

impl DeliveryStaff {
    pub fn can_deactivate(&self) -> bool {
        self.current_order_id.is_none()
    }
}

/// Payload for adding a staff member.
#[derive(Debug, Clone, Serialize)]
pub struct StaffCreate {
    pub name: String,
    pub phone: String,
}

/// Last reported position of a delivery in progress. Last value wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}
