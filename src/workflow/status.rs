//! Role-gated order status actions.
//!
//! The backend enforces transitions; the client only offers the actions in
//! [`STATUS_ACTIONS`] for the order's current status and the viewer's role.

use crate::model::{OrderStatus, Role};
use thiserror::Error;

/// An operation a user can trigger on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusAction {
    Confirm,
    Cancel,
    Dispatch,
    MarkDelivered,
    MarkFailed,
}

impl StatusAction {
    /// Status the order is in once the backend accepts the action.
    pub fn target(self) -> OrderStatus {
        match self {
            StatusAction::Confirm => OrderStatus::Confirmed,
            StatusAction::Cancel => OrderStatus::Cancelled,
            StatusAction::Dispatch => OrderStatus::OutForDelivery,
            StatusAction::MarkDelivered => OrderStatus::Delivered,
            StatusAction::MarkFailed => OrderStatus::DeliveryFailed,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusAction::Confirm => "Confirm order",
            StatusAction::Cancel => "Cancel order",
            StatusAction::Dispatch => "Assign delivery",
            StatusAction::MarkDelivered => "Mark delivered",
            StatusAction::MarkFailed => "Delivery failed",
        }
    }
}

/// Actions offered per (status, role). Rows that are absent offer nothing.
pub const STATUS_ACTIONS: &[(OrderStatus, Role, &[StatusAction])] = &[
    (
        OrderStatus::Placed,
        Role::Admin,
        &[StatusAction::Confirm, StatusAction::Cancel],
    ),
    (
        OrderStatus::Confirmed,
        Role::Admin,
        &[StatusAction::Dispatch, StatusAction::Cancel],
    ),
    (OrderStatus::Placed, Role::Customer, &[StatusAction::Cancel]),
    (
        OrderStatus::OutForDelivery,
        Role::Delivery,
        &[StatusAction::MarkDelivered, StatusAction::MarkFailed],
    ),
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("{action:?} is not available to {role} on a {from} order")]
    NotAllowed {
        from: OrderStatus,
        action: StatusAction,
        role: Role,
    },

    #[error("order is already {0}")]
    Terminal(OrderStatus),
}

/// Actions the given role may take on an order in `status`.
pub fn actions_for(status: OrderStatus, role: Role) -> &'static [StatusAction] {
    if status.is_terminal() {
        return &[];
    }
    STATUS_ACTIONS
        .iter()
        .find(|(s, r, _)| *s == status && *r == role)
        .map(|(_, _, actions)| *actions)
        .unwrap_or(&[])
}

/// Validates `action` against the table and returns the resulting status.
pub fn apply(
    status: OrderStatus,
    action: StatusAction,
    role: Role,
) -> Result<OrderStatus, TransitionError> {
    if status.is_terminal() {
        return Err(TransitionError::Terminal(status));
    }
    if actions_for(status, role).contains(&action) {
        Ok(action.target())
    } else {
        Err(TransitionError::NotAllowed {
            from: status,
            action,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 3] = [Role::Customer, Role::Admin, Role::Delivery];

    #[test]
    fn terminal_orders_offer_nothing() {
        for status in OrderStatus::TERMINAL {
            for role in ROLES {
                assert!(actions_for(status, role).is_empty());
            }
        }
    }

    #[test]
    fn every_offered_action_follows_the_lifecycle() {
        for status in OrderStatus::ALL {
            for role in ROLES {
                for action in actions_for(status, role) {
                    let next = apply(status, *action, role).unwrap();
                    let legal = match status {
                        OrderStatus::Placed => {
                            matches!(next, OrderStatus::Confirmed | OrderStatus::Cancelled)
                        }
                        OrderStatus::Confirmed => {
                            matches!(next, OrderStatus::OutForDelivery | OrderStatus::Cancelled)
                        }
                        OrderStatus::OutForDelivery => {
                            matches!(next, OrderStatus::Delivered | OrderStatus::DeliveryFailed)
                        }
                        _ => false,
                    };
                    assert!(legal, "{status} -> {next} offered to {role}");
                }
            }
        }
    }

    #[test]
    fn customers_cannot_confirm() {
        assert_eq!(
            apply(OrderStatus::Placed, StatusAction::Confirm, Role::Customer),
            Err(TransitionError::NotAllowed {
                from: OrderStatus::Placed,
                action: StatusAction::Confirm,
                role: Role::Customer,
            })
        );
    }

    #[test]
    fn delivered_is_final() {
        assert_eq!(
            apply(OrderStatus::Delivered, StatusAction::MarkFailed, Role::Delivery),
            Err(TransitionError::Terminal(OrderStatus::Delivered))
        );
    }

    #[test]
    fn admin_dispatches_confirmed_orders() {
        assert_eq!(
            actions_for(OrderStatus::Confirmed, Role::Admin),
            &[StatusAction::Dispatch, StatusAction::Cancel]
        );
        assert!(actions_for(OrderStatus::Confirmed, Role::Delivery).is_empty());
    }
}
