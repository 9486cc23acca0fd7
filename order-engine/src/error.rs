//! Error types for the order engine
//!
//! `StoreError` is what persistence backends return; `OrderError` is the
//! failure taxonomy of the engine operations. `From<OrderError> for AppError`
//! maps both onto the shared error codes for whatever API sits in front.

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::PaymentStatus;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::GuestTokenError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Persistence-layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (constraint name)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Guarded stock decrement found fewer units than requested
    #[error(
        "Insufficient stock for menu item {menu_item_id}: {available} available, {requested} requested"
    )]
    InsufficientStock {
        menu_item_id: Uuid,
        location_id: Uuid,
        available: i32,
        requested: i32,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Stored row violates an invariant the engine relies on
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error()
            && db_err.is_unique_violation()
        {
            return StoreError::UniqueViolation(
                db_err.constraint().unwrap_or("unknown").to_string(),
            );
        }
        StoreError::Database(e)
    }
}

/// One line of an inventory shortage report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub menu_item_id: Uuid,
    pub item_name: String,
    pub current_stock: i32,
    pub requested: i32,
}

impl std::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} available, {} requested)",
            self.item_name, self.current_stock, self.requested
        )
    }
}

fn join_display<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Order engine errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid order: {0}")]
    Validation(String),

    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Ordering is closed: {message}")]
    OrderingWindowClosed { message: String },

    #[error("Customer not found: {0}")]
    CustomerNotFound(Uuid),

    #[error("Menu items invalid or unavailable: {}", join_display(.menu_item_ids))]
    InvalidOrUnavailableItems { menu_item_ids: Vec<Uuid> },

    #[error("Invalid variation selection: {0}")]
    InvalidVariation(String),

    #[error("Items not available at this location: {}", .item_names.join(", "))]
    ItemsNotAvailableAtLocation { item_names: Vec<String> },

    #[error("Insufficient inventory: {}", join_display(.shortages))]
    InsufficientInventory { shortages: Vec<StockShortage> },

    /// Stock changed between the availability check and the guarded deduction
    #[error("Inventory changed while placing the order: {shortage}")]
    InventoryDeductionConflict { shortage: StockShortage },

    #[error("Payment intent creation failed: {0}")]
    PaymentIntentCreationFailed(String),

    #[error("Could not allocate an order number after {attempts} attempts")]
    OrderNumberCollisionExhausted { attempts: u32 },

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order access denied")]
    GuestAccessDenied,

    #[error("Payment has not succeeded (provider status: {status})")]
    PaymentNotSucceeded { status: String },

    #[error("Invalid payment transition: {} -> {}", .from.as_str(), .to.as_str())]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Invalid webhook: {0}")]
    InvalidWebhook(String),

    #[error(transparent)]
    Token(#[from] GuestTokenError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Catalog, inventory, settings or payment collaborator failed
    #[error("Collaborator error: {0}")]
    Collaborator(BoxError),
}

impl OrderError {
    /// True for both stock failure kinds (pre-check and guarded deduction)
    pub fn is_stock_shortage(&self) -> bool {
        matches!(
            self,
            Self::InsufficientInventory { .. } | Self::InventoryDeductionConflict { .. }
        )
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(msg) => AppError::validation(msg),
            OrderError::EmptyOrder => AppError::new(ErrorCode::OrderEmpty),
            OrderError::OrderingWindowClosed { message } => {
                AppError::with_message(ErrorCode::OrderingClosed, message)
            }
            OrderError::CustomerNotFound(id) => {
                AppError::new(ErrorCode::CustomerNotFound).with_detail("user_id", id.to_string())
            }
            OrderError::InvalidOrUnavailableItems { menu_item_ids } => {
                let ids: Vec<String> = menu_item_ids.iter().map(Uuid::to_string).collect();
                AppError::new(ErrorCode::MenuItemUnavailable).with_detail("menu_item_ids", ids)
            }
            OrderError::InvalidVariation(msg) => {
                AppError::with_message(ErrorCode::InvalidVariation, msg)
            }
            OrderError::ItemsNotAvailableAtLocation { item_names } => AppError::with_message(
                ErrorCode::MenuItemNotAtLocation,
                format!(
                    "Some items are not available at this location: {}",
                    item_names.join(", ")
                ),
            )
            .with_detail("items", item_names),
            OrderError::InsufficientInventory { shortages } => {
                let message = format!("Insufficient stock: {}", join_display(&shortages));
                AppError::with_message(ErrorCode::InsufficientStock, message)
                    .with_detail("shortages", serde_json::to_value(&shortages).unwrap_or_default())
            }
            OrderError::InventoryDeductionConflict { shortage } => {
                let message = format!("Insufficient stock: {shortage}");
                AppError::with_message(ErrorCode::InsufficientStock, message).with_detail(
                    "shortages",
                    serde_json::to_value(vec![shortage]).unwrap_or_default(),
                )
            }
            OrderError::PaymentIntentCreationFailed(reason) => {
                tracing::error!(reason = %reason, "Payment intent creation failed");
                AppError::new(ErrorCode::PaymentIntentFailed)
            }
            OrderError::OrderNumberCollisionExhausted { attempts } => {
                tracing::error!(attempts, "Order number allocation exhausted");
                AppError::new(ErrorCode::OrderCreationFailed)
            }
            OrderError::OrderNotFound(id) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", id.to_string())
            }
            // Same shape as not-found so tokens cannot probe for orders
            OrderError::GuestAccessDenied => AppError::new(ErrorCode::GuestAccessDenied),
            OrderError::PaymentNotSucceeded { status } => {
                AppError::new(ErrorCode::PaymentNotSucceeded).with_detail("status", status)
            }
            OrderError::InvalidPaymentTransition { from, to } => {
                AppError::new(ErrorCode::PaymentInvalidTransition)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
            OrderError::InvalidWebhook(msg) => {
                AppError::with_message(ErrorCode::WebhookSignatureInvalid, msg)
            }
            OrderError::Token(GuestTokenError::Expired) => AppError::token_expired(),
            OrderError::Token(e) => AppError::invalid_token(e.to_string()),
            OrderError::Store(e) => {
                tracing::error!(error = %e, "Order store error");
                AppError::new(ErrorCode::DatabaseError)
            }
            OrderError::Collaborator(e) => {
                tracing::error!(error = %e, "Order collaborator error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
