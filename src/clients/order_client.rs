use crate::api::ApiRequest;
use crate::clients::{ApiClient, Query, QueryClient};
use crate::error::OrderError;
use crate::framework::{CacheKey, CacheTag};
use crate::model::{
    Order, OrderId, OrderStatus, OrderStatusHistoryEntry, Role, StaffId, StatusUpdate, UserId,
};
use crate::workflow::{self, EtaOption, StatusAction};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument};

const ORDER_COLUMNS: &str = "*,order_items(*)";

/// Which orders a list query returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum OrderScope {
    /// The signed-in customer's own orders.
    Customer { user_id: UserId },
    /// Every order, optionally narrowed to one status.
    Admin { status: Option<OrderStatus> },
    /// Orders assigned to a delivery staff member.
    Delivery { staff_id: StaffId },
}

/// Admin and customer status actions with the input each one needs.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    Confirm { eta: EtaOption, now: DateTime<Utc> },
    Cancel { reason: Option<String> },
    Dispatch { staff_id: StaffId },
}

impl OrderAction {
    pub fn status_action(&self) -> StatusAction {
        match self {
            OrderAction::Confirm { .. } => StatusAction::Confirm,
            OrderAction::Cancel { .. } => StatusAction::Cancel,
            OrderAction::Dispatch { .. } => StatusAction::Dispatch,
        }
    }
}

/// Client for order reads and order status changes.
///
/// Reads go through the query cache. Every status change waits for the
/// backend and then invalidates the order, its history and the lists.
#[derive(Clone)]
pub struct OrderClient {
    inner: QueryClient,
}

impl OrderClient {
    pub fn new(inner: QueryClient) -> Self {
        Self { inner }
    }

    pub fn order_key(id: &OrderId) -> CacheKey {
        CacheKey::new("getOrder", &json!({ "id": id }))
    }

    pub fn list_key(scope: &OrderScope) -> CacheKey {
        CacheKey::new("listOrders", &json!(scope))
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, id: &OrderId, force: bool) -> Result<Order, OrderError> {
        debug!("get_order called");
        let query = Query {
            key: Self::order_key(id),
            tags: vec![CacheTag::Order(id.clone())],
            request: ApiRequest::select("orders", ORDER_COLUMNS)
                .eq("id", id)
                .single(),
        };
        self.inner
            .query::<Order, OrderError>(query, force)
            .await
            .map_err(|e| match e {
                OrderError::Api(api) if api.status() == Some(406) => {
                    OrderError::NotFound(id.to_string())
                }
                other => other,
            })
    }

    /// Last fetched copy of an order, without touching the backend.
    pub async fn cached_order(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        self.inner.cached(Self::order_key(id)).await
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self, scope: &OrderScope, force: bool) -> Result<Vec<Order>, OrderError> {
        debug!("list_orders called");
        let mut request = ApiRequest::select("orders", ORDER_COLUMNS).order_by("created_at", true);
        let mut tags = vec![CacheTag::Orders];
        match scope {
            OrderScope::Customer { user_id } => request = request.eq("user_id", user_id),
            OrderScope::Admin { status: Some(status) } => request = request.eq("status", status),
            OrderScope::Admin { status: None } => {}
            OrderScope::Delivery { staff_id } => {
                request = request.eq("delivery_staff_id", staff_id);
                tags.push(CacheTag::DeliveryOrders);
            }
        }
        let query = Query {
            key: Self::list_key(scope),
            tags,
            request,
        };
        self.inner.query(query, force).await
    }

    #[instrument(skip(self))]
    pub async fn status_history(
        &self,
        id: &OrderId,
        force: bool,
    ) -> Result<Vec<OrderStatusHistoryEntry>, OrderError> {
        let query = Query {
            key: CacheKey::new("orderStatusHistory", &json!({ "id": id })),
            tags: vec![CacheTag::OrderHistory(id.clone())],
            request: ApiRequest::select("order_status_history", "status,created_at,notes")
                .eq("order_id", id)
                .order_by("created_at", false),
        };
        self.inner.query(query, force).await
    }

    /// Writes a status change and invalidates everything derived from the order.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: &OrderId,
        update: StatusUpdate,
    ) -> Result<Order, OrderError> {
        info!(status = %update.status, "Updating order status");
        let body = serde_json::to_value(&update).map_err(crate::api::ApiError::from)?;
        let request = ApiRequest::update("orders", body).eq("id", id).single();
        self.inner
            .mutate(request, CacheTag::for_order_change(id))
            .await
    }

    /// Confirms a placed order with the picked delivery estimate.
    #[instrument(skip(self, now))]
    pub async fn confirm_order<Tz: TimeZone>(
        &self,
        id: &OrderId,
        eta: EtaOption,
        now: DateTime<Tz>,
    ) -> Result<Order, OrderError> {
        let now_utc = now.with_timezone(&Utc);
        let estimated = eta.resolve(now);
        if estimated.is_some_and(|at| at <= now_utc) {
            return Err(OrderError::EtaInPast);
        }
        let mut update = StatusUpdate::new(OrderStatus::Confirmed);
        update.estimated_delivery_at = estimated;
        self.update_order_status(id, update).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: &OrderId, reason: Option<String>) -> Result<Order, OrderError> {
        let mut update = StatusUpdate::new(OrderStatus::Cancelled);
        update.cancellation_reason = reason;
        self.update_order_status(id, update).await
    }

    /// Assigns a staff member and moves the order out for delivery.
    ///
    /// The backend checks that the staff member is active and free; a busy
    /// staff member comes back as `STAFF_BUSY`.
    #[instrument(skip(self))]
    pub async fn dispatch_order(&self, id: &OrderId, staff_id: &StaffId) -> Result<(), OrderError> {
        info!("Dispatching order");
        let request = ApiRequest::rpc(
            "assign_delivery_staff",
            json!({ "p_order_id": id, "p_staff_id": staff_id }),
        );
        let mut tags = CacheTag::for_order_change(id);
        tags.extend([CacheTag::DeliveryStaff, CacheTag::DeliveryOrders]);
        self.inner
            .mutate::<serde_json::Value, OrderError>(request, tags)
            .await?;
        Ok(())
    }

    /// Checks `action` against the status table for `role`, then performs it.
    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status))]
    pub async fn apply_action(
        &self,
        order: &Order,
        role: Role,
        action: OrderAction,
    ) -> Result<(), OrderError> {
        workflow::apply(order.status, action.status_action(), role)?;
        match action {
            OrderAction::Confirm { eta, now } => {
                self.confirm_order(&order.id, eta, now).await?;
            }
            OrderAction::Cancel { reason } => {
                self.cancel_order(&order.id, reason).await?;
            }
            OrderAction::Dispatch { staff_id } => {
                self.dispatch_order(&order.id, &staff_id).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ApiClient for OrderClient {
    type Error = OrderError;

    fn query_client(&self) -> &QueryClient {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::{ApiError, Method, Target};
    use crate::framework::CacheActor;
    use crate::workflow::TransitionError;
    use serde_json::Value;
    use std::sync::Arc;

    fn setup() -> (MockTransport, OrderClient) {
        let mock = MockTransport::new();
        let (actor, cache) = CacheActor::new(16);
        tokio::spawn(actor.run());
        let client = OrderClient::new(QueryClient::new(Arc::new(mock.clone()), cache));
        (mock, client)
    }

    fn order_row(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "status": status,
            "total_paise": 45900,
            "order_items": [],
            "shipping_address_line1": "12 MG Road",
            "shipping_city": "Pune",
            "shipping_state": "MH",
            "shipping_pincode": "411001",
            "created_at": "2026-10-19T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_get_order_is_cached_until_invalidated() {
        let (mock, client) = setup();
        let id = OrderId::from("order-1");
        mock.expect(Method::Get, Target::Rest("orders".into()))
            .with_query("id", "eq.order-1")
            .return_ok(order_row("order-1", "placed"));
        mock.expect(Method::Get, Target::Rest("orders".into()))
            .with_query("id", "eq.order-1")
            .return_ok(order_row("order-1", "confirmed"));

        assert_eq!(client.get_order(&id, false).await.unwrap().status, OrderStatus::Placed);
        assert_eq!(client.get_order(&id, false).await.unwrap().status, OrderStatus::Placed);
        assert_eq!(mock.request_count(), 1);

        client.invalidate(vec![CacheTag::Order(id.clone())]).await.unwrap();
        assert_eq!(client.get_order(&id, false).await.unwrap().status, OrderStatus::Confirmed);
        mock.verify();
    }

    #[tokio::test]
    async fn test_missing_order_maps_to_not_found() {
        let (mock, client) = setup();
        mock.expect(Method::Get, Target::Rest("orders".into()))
            .return_err(ApiError::Backend {
                status: 406,
                code: Some("PGRST116".into()),
                message: "JSON object requested, multiple (or no) rows returned".into(),
            });

        let err = client.get_order(&"ghost".into(), false).await.unwrap_err();
        assert_eq!(err, OrderError::NotFound("ghost".into()));
    }

    #[tokio::test]
    async fn test_customer_cannot_confirm() {
        let (mock, client) = setup();
        let order: Order = serde_json::from_value(order_row("order-1", "placed")).unwrap();

        let err = client
            .apply_action(
                &order,
                Role::Customer,
                OrderAction::Confirm { eta: EtaOption::Skip, now: Utc::now() },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::Transition(TransitionError::NotAllowed { .. })));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_sends_reason() {
        let (mock, client) = setup();
        mock.expect(Method::Patch, Target::Rest("orders".into()))
            .with_query("id", "eq.order-1")
            .return_ok(order_row("order-1", "cancelled"));

        let order = client
            .cancel_order(&"order-1".into(), Some("Out of stock".into()))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        let sent = &mock.requests()[0];
        assert_eq!(
            sent.body,
            Some(json!({ "status": "cancelled", "cancellation_reason": "Out of stock" }))
        );
    }

    #[tokio::test]
    async fn test_dispatch_invalidates_staff_and_lists() {
        let (mock, client) = setup();
        let mut events = client.query_client().cache().subscribe();
        mock.expect(Method::Post, Target::Rpc("assign_delivery_staff".into()))
            .return_ok(Value::Null);

        client
            .dispatch_order(&"order-1".into(), &"staff-7".into())
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert!(event.invalidates_any(&[CacheTag::DeliveryStaff]));
        assert!(event.invalidates_any(&[CacheTag::Order("order-1".into())]));
        assert_eq!(
            mock.requests()[0].body,
            Some(json!({ "p_order_id": "order-1", "p_staff_id": "staff-7" }))
        );
    }

    #[test]
    fn test_list_keys_are_distinct_per_scope() {
        let keys = [
            OrderClient::list_key(&OrderScope::Customer { user_id: "user-1".into() }),
            OrderClient::list_key(&OrderScope::Customer { user_id: "user-2".into() }),
            OrderClient::list_key(&OrderScope::Admin { status: None }),
            OrderClient::list_key(&OrderScope::Admin { status: Some(OrderStatus::Placed) }),
            OrderClient::list_key(&OrderScope::Delivery { staff_id: "staff-1".into() }),
        ];
        for (i, a) in keys.iter().enumerate() {
            assert!(!a.args.is_empty());
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(
            keys[2],
            OrderClient::list_key(&OrderScope::Admin { status: None })
        );
    }
}
