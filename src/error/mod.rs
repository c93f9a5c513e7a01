//! Error types for the endpoint clients, plus the code → message catalog.
//!
//! Each client has its own error enum so callers can match on the failures
//! that matter to them. All of them expose `user_message()`, which goes
//! through [`messages::user_message`].

pub mod messages;

use crate::api::ApiError;
use crate::framework::CacheError;
use crate::workflow::TransitionError;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// The requested order was not found.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// The action is not offered for the order's status and the caller's role.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Confirmation needs an estimated delivery time in the future.
    #[error("Estimated delivery time is in the past")]
    EtaInPast,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl OrderError {
    pub fn code(&self) -> Option<&str> {
        match self {
            OrderError::NotFound(_) => Some("ORDER_NOT_FOUND"),
            OrderError::Transition(_) => Some("INVALID_STATUS_TRANSITION"),
            OrderError::EtaInPast => Some("ESTIMATED_DELIVERY_IN_PAST"),
            OrderError::Api(e) => e.code(),
            OrderError::Cache(_) => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        messages::user_message(self.code())
    }
}

/// Errors that can occur during delivery and staff operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    /// Deactivation refused while the staff member holds an active order.
    #[error("Staff member {staff} is on order {order}")]
    StaffBusy { staff: String, order: String },

    #[error("Staff member not found: {0}")]
    StaffNotFound(String),

    /// Delivery outcomes can only be recorded while the order is out for delivery.
    #[error("Order {0} is not out for delivery")]
    NotOutForDelivery(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl DeliveryError {
    pub fn code(&self) -> Option<&str> {
        match self {
            DeliveryError::StaffBusy { .. } => Some("STAFF_HAS_ACTIVE_ORDER"),
            DeliveryError::StaffNotFound(_) => Some("STAFF_NOT_FOUND"),
            DeliveryError::NotOutForDelivery(_) => Some("ORDER_NOT_OUT_FOR_DELIVERY"),
            DeliveryError::Api(e) => e.code(),
            DeliveryError::Cache(_) => None,
        }
    }

    pub fn user_message(&self) -> &'static str {
        messages::user_message(self.code())
    }
}

/// Errors that can occur during sign-in.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("Code must be {expected} digits")]
    MalformedCode { expected: usize },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    pub fn code(&self) -> Option<&str> {
        match self {
            AuthError::InvalidPhone(_) => Some("INVALID_PHONE"),
            AuthError::MalformedCode { .. } => Some("INVALID_OTP"),
            AuthError::Api(e) => e.code(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        messages::user_message(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_codes_flow_through_client_errors() {
        let err = DeliveryError::from(ApiError::Backend {
            status: 409,
            code: Some("STAFF_ALREADY_EXISTS".into()),
            message: "duplicate".into(),
        });
        assert_eq!(
            err.user_message(),
            "A delivery partner with this phone number already exists."
        );
    }

    #[test]
    fn network_errors_use_generic_message() {
        let err = OrderError::from(ApiError::Network("connection reset".into()));
        assert_eq!(err.user_message(), messages::GENERIC_ERROR);
    }
}
