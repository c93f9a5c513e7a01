//! Backend error codes → user-facing messages.
//!
//! The backend reports failures as string codes. Each dictionary covers one
//! area of the app; [`user_message`] searches them all and falls back to
//! [`GENERIC_ERROR`] for codes it does not know.

pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

pub const AUTH_MESSAGES: &[(&str, &str)] = &[
    ("INVALID_OTP", "The code you entered is incorrect."),
    ("OTP_EXPIRED", "This code has expired. Request a new one."),
    ("OTP_RATE_LIMITED", "Too many attempts. Please wait before trying again."),
    ("INVALID_PHONE", "Enter a valid 10-digit mobile number."),
    ("USER_BLOCKED", "This account has been blocked. Contact support."),
    ("UNAUTHORIZED", "Your session has expired. Please sign in again."),
];

pub const DELIVERY_MESSAGES: &[(&str, &str)] = &[
    ("INVALID_DELIVERY_OTP", "The delivery code does not match. Ask the customer to check again."),
    ("ORDER_NOT_ASSIGNED", "This order is not assigned to you."),
    ("ORDER_NOT_OUT_FOR_DELIVERY", "This order is not out for delivery."),
    ("STAFF_ALREADY_EXISTS", "A delivery partner with this phone number already exists."),
    ("STAFF_NOT_FOUND", "Delivery partner not found."),
    ("STAFF_INACTIVE", "This delivery partner is inactive."),
    ("STAFF_HAS_ACTIVE_ORDER", "This delivery partner is on an active delivery."),
    ("STAFF_BUSY", "This delivery partner already has an order in progress."),
];

pub const ADMIN_MESSAGES: &[(&str, &str)] = &[
    ("CANNOT_CHANGE_OWN_ROLE", "You cannot change your own role."),
    ("USER_NOT_FOUND", "User not found."),
    ("INVALID_ROLE", "That role does not exist."),
    ("FORBIDDEN", "You do not have permission to do this."),
];

pub const ORDER_MESSAGES: &[(&str, &str)] = &[
    ("ORDER_NOT_FOUND", "Order not found."),
    ("INVALID_STATUS_TRANSITION", "This order can no longer be moved to that status."),
    ("ORDER_ALREADY_CANCELLED", "This order has already been cancelled."),
    ("ESTIMATED_DELIVERY_IN_PAST", "The delivery time must be in the future."),
];

const DICTIONARIES: [&[(&str, &str)]; 4] =
    [AUTH_MESSAGES, DELIVERY_MESSAGES, ADMIN_MESSAGES, ORDER_MESSAGES];

/// Message for a known code, if any dictionary has it.
pub fn lookup(code: &str) -> Option<&'static str> {
    DICTIONARIES
        .iter()
        .flat_map(|dict| dict.iter())
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

/// Message for `code`, or the generic message for unknown/missing codes.
pub fn user_message(code: Option<&str>) -> &'static str {
    code.and_then(lookup).unwrap_or(GENERIC_ERROR)
}
