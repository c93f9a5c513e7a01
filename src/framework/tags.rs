use crate::model::OrderId;
use serde_json::Value;
use std::fmt::Display;

/// Identifies one cached query: the endpoint name plus its arguments.
///
/// Arguments are stored as canonical JSON so that two calls with equal
/// arguments hit the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: &'static str,
    pub args: String,
}

impl CacheKey {
    pub fn new(endpoint: &'static str, args: &Value) -> Self {
        // Value maps are ordered, so the rendered string has sorted keys.
        Self {
            endpoint,
            args: args.to_string(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

/// Labels attached to cached entries. Invalidating a tag marks every entry
/// carrying it stale and wakes the pollers watching it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Orders,
    Order(OrderId),
    OrderHistory(OrderId),
    DeliveryStaff,
    DeliveryOrders,
    DeliveryLocation(OrderId),
}

impl CacheTag {
    /// Tags a status change on `id` has to invalidate.
    pub fn for_order_change(id: &OrderId) -> Vec<CacheTag> {
        vec![
            CacheTag::Orders,
            CacheTag::Order(id.clone()),
            CacheTag::OrderHistory(id.clone()),
        ]
    }
}

impl Display for CacheTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheTag::Orders => f.write_str("Orders"),
            CacheTag::Order(id) => write!(f, "Order:{id}"),
            CacheTag::OrderHistory(id) => write!(f, "OrderHistory:{id}"),
            CacheTag::DeliveryStaff => f.write_str("DeliveryStaff"),
            CacheTag::DeliveryOrders => f.write_str("DeliveryOrders"),
            CacheTag::DeliveryLocation(id) => write!(f, "DeliveryLocation:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_args_are_canonical() {
        let a = CacheKey::new("listOrders", &json!({ "status": "placed", "scope": "admin" }));
        let b = CacheKey::new("listOrders", &json!({ "scope": "admin", "status": "placed" }));
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::new("getOrder", &json!({ "scope": "admin", "status": "placed" })));
    }

    #[test]
    fn tag_display_matches_wire_names() {
        assert_eq!(CacheTag::Order("order-1".into()).to_string(), "Order:order-1");
    }
}
