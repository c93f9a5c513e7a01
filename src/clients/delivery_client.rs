use crate::api::ApiRequest;
use crate::clients::{ApiClient, Query, QueryClient};
use crate::error::DeliveryError;
use crate::framework::{CacheKey, CacheTag};
use crate::model::{
    DeliveryLocation, DeliveryStaff, Order, OrderId, OrderStatus, Role, StaffCreate, StaffId,
};
use crate::workflow::{self, StatusAction};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// Client for staff management and the delivery side of an order.
#[derive(Clone)]
pub struct DeliveryClient {
    inner: QueryClient,
}

impl DeliveryClient {
    pub fn new(inner: QueryClient) -> Self {
        Self { inner }
    }

    pub fn location_key(order_id: &OrderId) -> CacheKey {
        CacheKey::new("deliveryLocation", &json!({ "order_id": order_id }))
    }

    #[instrument(skip(self))]
    pub async fn list_staff(&self, force: bool) -> Result<Vec<DeliveryStaff>, DeliveryError> {
        debug!("list_staff called");
        let query = Query {
            key: CacheKey::new("listDeliveryStaff", &Value::Null),
            tags: vec![CacheTag::DeliveryStaff],
            request: ApiRequest::select("delivery_staff", "*").order_by("name", false),
        };
        self.inner.query(query, force).await
    }

    #[instrument(skip(self))]
    pub async fn create_staff(&self, staff: StaffCreate) -> Result<DeliveryStaff, DeliveryError> {
        info!(name = %staff.name, "Creating delivery staff");
        let body = serde_json::to_value(&staff).map_err(crate::api::ApiError::from)?;
        self.inner
            .mutate(
                ApiRequest::function("create-delivery-staff", body),
                vec![CacheTag::DeliveryStaff],
            )
            .await
    }

    /// Activates or deactivates a staff member.
    ///
    /// Deactivating someone who is on a delivery is refused before any
    /// request is sent.
    #[instrument(skip(self, staff), fields(staff_id = %staff.id))]
    pub async fn set_staff_active(
        &self,
        staff: &DeliveryStaff,
        active: bool,
    ) -> Result<DeliveryStaff, DeliveryError> {
        if !active {
            if let Some(order) = &staff.current_order_id {
                return Err(DeliveryError::StaffBusy {
                    staff: staff.id.to_string(),
                    order: order.to_string(),
                });
            }
        }
        info!(active, "Updating staff status");
        let request = ApiRequest::update("delivery_staff", json!({ "is_active": active }))
            .eq("id", &staff.id)
            .single();
        self.inner
            .mutate::<DeliveryStaff, DeliveryError>(request, vec![CacheTag::DeliveryStaff])
            .await
            .map_err(|e| match e {
                DeliveryError::Api(api) if api.status() == Some(406) => {
                    DeliveryError::StaffNotFound(staff.id.to_string())
                }
                other => other,
            })
    }

    /// Orders currently out for delivery with `staff_id`.
    #[instrument(skip(self))]
    pub async fn assigned_orders(
        &self,
        staff_id: &StaffId,
        force: bool,
    ) -> Result<Vec<Order>, DeliveryError> {
        let query = Query {
            key: CacheKey::new("assignedOrders", &json!({ "staff_id": staff_id })),
            tags: vec![CacheTag::DeliveryOrders, CacheTag::Orders],
            request: ApiRequest::select("orders", "*,order_items(*)")
                .eq("delivery_staff_id", staff_id)
                .eq("status", OrderStatus::OutForDelivery)
                .order_by("created_at", false),
        };
        self.inner.query(query, force).await
    }

    /// Uploads one location sample. Readers poll, so nothing is invalidated.
    #[instrument(skip(self, location))]
    pub async fn report_location(
        &self,
        order_id: &OrderId,
        location: &DeliveryLocation,
    ) -> Result<(), DeliveryError> {
        let request = ApiRequest::rpc(
            "update_delivery_location",
            json!({
                "p_order_id": order_id,
                "p_latitude": location.latitude,
                "p_longitude": location.longitude,
                "p_accuracy": location.accuracy,
                "p_recorded_at": location.timestamp,
            }),
        );
        self.inner
            .mutate::<Value, DeliveryError>(request, Vec::new())
            .await?;
        Ok(())
    }

    /// Latest reported location for an order, `None` before the first upload.
    #[instrument(skip(self))]
    pub async fn delivery_location(
        &self,
        order_id: &OrderId,
        force: bool,
    ) -> Result<Option<DeliveryLocation>, DeliveryError> {
        let query = Query {
            key: Self::location_key(order_id),
            tags: vec![CacheTag::DeliveryLocation(order_id.clone())],
            request: ApiRequest::rpc("get_delivery_location", json!({ "p_order_id": order_id })),
        };
        self.inner.query(query, force).await
    }

    /// Completes a delivery with the customer's OTP.
    #[instrument(skip(self, order, otp), fields(order_id = %order.id))]
    pub async fn verify_delivery_otp(&self, order: &Order, otp: &str) -> Result<(), DeliveryError> {
        self.finish_delivery(
            order,
            StatusAction::MarkDelivered,
            ApiRequest::function(
                "verify-delivery-otp",
                json!({ "order_id": order.id, "otp": otp }),
            ),
        )
        .await
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn mark_delivery_failed(&self, order: &Order, reason: &str) -> Result<(), DeliveryError> {
        self.finish_delivery(
            order,
            StatusAction::MarkFailed,
            ApiRequest::function(
                "mark-delivery-failed",
                json!({ "order_id": order.id, "reason": reason }),
            ),
        )
        .await
    }

    async fn finish_delivery(
        &self,
        order: &Order,
        action: StatusAction,
        request: ApiRequest,
    ) -> Result<(), DeliveryError> {
        if let Err(e) = workflow::apply(order.status, action, Role::Delivery) {
            debug!(error = %e, "Action not offered");
            return Err(DeliveryError::NotOutForDelivery(order.id.to_string()));
        }
        info!(action = ?action, "Finishing delivery");
        let mut tags = CacheTag::for_order_change(&order.id);
        tags.extend([
            CacheTag::DeliveryOrders,
            CacheTag::DeliveryStaff,
            CacheTag::DeliveryLocation(order.id.clone()),
        ]);
        self.inner
            .mutate::<Value, DeliveryError>(request, tags)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ApiClient for DeliveryClient {
    type Error = DeliveryError;

    fn query_client(&self) -> &QueryClient {
        &self.inner
    }
}
