use crate::api::SessionStore;
use crate::framework::{CacheClient, CacheError, CacheTag};
use crate::model::{OrderId, Role};
use crate::notifications::{PushKind, PushPayload};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Foreground,
    /// App was in the background and the user tapped the notification.
    Background,
}

/// Where a tapped notification should take the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    OrderDetail(OrderId),
    AdminOrderDetail(OrderId),
    DeliveryAssignment(OrderId),
    OrderList,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Invalidated(Vec<CacheTag>),
    Navigate(NavigationTarget),
    Ignored,
}

/// Turns push payloads into cache invalidations or navigation.
#[derive(Clone)]
pub struct NotificationRouter {
    cache: CacheClient,
    session: SessionStore,
}

impl NotificationRouter {
    pub fn new(cache: CacheClient, session: SessionStore) -> Self {
        Self { cache, session }
    }

    #[instrument(skip(self))]
    pub async fn handle(&self, payload: PushPayload, state: AppState) -> Result<RouteOutcome, CacheError> {
        if payload.kind == PushKind::Other {
            debug!("Ignoring notification");
            return Ok(RouteOutcome::Ignored);
        }

        match state {
            AppState::Foreground => {
                let tags = tags_for(&payload);
                let count = self.cache.invalidate(tags.clone()).await?;
                info!(count, "Notification invalidated cached queries");
                Ok(RouteOutcome::Invalidated(tags))
            }
            AppState::Background => {
                let role = self.session.role().await.unwrap_or(Role::Customer);
                Ok(RouteOutcome::Navigate(target_for(&payload, role)))
            }
        }
    }
}

fn tags_for(payload: &PushPayload) -> Vec<CacheTag> {
    let mut tags = match &payload.order_id {
        Some(id) => CacheTag::for_order_change(id),
        None => vec![CacheTag::Orders],
    };
    if matches!(payload.kind, PushKind::DeliveryAssigned | PushKind::OrderCancelled) {
        tags.push(CacheTag::DeliveryOrders);
    }
    tags
}

fn target_for(payload: &PushPayload, role: Role) -> NavigationTarget {
    let Some(id) = payload.order_id.clone() else {
        return NavigationTarget::OrderList;
    };
    match role {
        Role::Customer => NavigationTarget::OrderDetail(id),
        Role::Admin => NavigationTarget::AdminOrderDetail(id),
        Role::Delivery => NavigationTarget::DeliveryAssignment(id),
    }
}
