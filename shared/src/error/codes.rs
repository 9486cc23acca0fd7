//! Unified error codes for the cafeteria ordering platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Ordering window errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Menu item errors
//! - 7xxx: Inventory errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Guest token does not grant access to this order
    GuestAccessDenied = 2010,

    // ==================== 3xxx: Ordering window ====================
    /// Ordering is currently closed
    OrderingClosed = 3001,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is empty
    OrderEmpty = 4007,
    /// Customer could not be resolved
    CustomerNotFound = 4010,
    /// Order could not be persisted after all attempts
    OrderCreationFailed = 4020,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Payment intent could not be created
    PaymentIntentFailed = 5010,
    /// Payment has not succeeded yet
    PaymentNotSucceeded = 5011,
    /// Payment status transition not allowed
    PaymentInvalidTransition = 5012,
    /// Webhook signature verification failed
    WebhookSignatureInvalid = 5020,

    // ==================== 6xxx: Menu item ====================
    /// Menu item not found or inactive
    MenuItemUnavailable = 6001,
    /// Menu item is not offered at the selected location
    MenuItemNotAtLocation = 6002,
    /// Selected variation is invalid
    InvalidVariation = 6003,

    // ==================== 7xxx: Inventory ====================
    /// Not enough stock to fulfil the request
    InsufficientStock = 7001,
    /// Inventory record not found
    InventoryNotFound = 7002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::GuestAccessDenied => "Order not found for this guest",

            // Ordering window
            ErrorCode::OrderingClosed => "Ordering is currently unavailable",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::CustomerNotFound => "Customer not found",
            ErrorCode::OrderCreationFailed => "Could not complete order, please try again",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::PaymentIntentFailed => "Payment could not be initiated",
            ErrorCode::PaymentNotSucceeded => "Payment has not been completed",
            ErrorCode::PaymentInvalidTransition => "Payment status cannot be changed",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature is invalid",

            // Menu item
            ErrorCode::MenuItemUnavailable => "One or more items are invalid or unavailable",
            ErrorCode::MenuItemNotAtLocation => "Some items are not available at this location",
            ErrorCode::InvalidVariation => "Selected options are invalid",

            // Inventory
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::InventoryNotFound => "Inventory record not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a numeric value does not name an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => ErrorCode::Success,
            1 => ErrorCode::Unknown,
            2 => ErrorCode::ValidationFailed,
            3 => ErrorCode::NotFound,
            4 => ErrorCode::AlreadyExists,
            5 => ErrorCode::InvalidRequest,
            8 => ErrorCode::ValueOutOfRange,

            1001 => ErrorCode::NotAuthenticated,
            1003 => ErrorCode::TokenExpired,
            1004 => ErrorCode::TokenInvalid,

            2001 => ErrorCode::PermissionDenied,
            2010 => ErrorCode::GuestAccessDenied,

            3001 => ErrorCode::OrderingClosed,

            4001 => ErrorCode::OrderNotFound,
            4007 => ErrorCode::OrderEmpty,
            4010 => ErrorCode::CustomerNotFound,
            4020 => ErrorCode::OrderCreationFailed,

            5001 => ErrorCode::PaymentFailed,
            5010 => ErrorCode::PaymentIntentFailed,
            5011 => ErrorCode::PaymentNotSucceeded,
            5012 => ErrorCode::PaymentInvalidTransition,
            5020 => ErrorCode::WebhookSignatureInvalid,

            6001 => ErrorCode::MenuItemUnavailable,
            6002 => ErrorCode::MenuItemNotAtLocation,
            6003 => ErrorCode::InvalidVariation,

            7001 => ErrorCode::InsufficientStock,
            7002 => ErrorCode::InventoryNotFound,

            9001 => ErrorCode::InternalError,
            9002 => ErrorCode::DatabaseError,
            9003 => ErrorCode::NetworkError,
            9004 => ErrorCode::TimeoutError,
            9005 => ErrorCode::ConfigError,

            _ => return Err(InvalidErrorCode(value)),
        };
        Ok(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
