//! Collaborator interfaces of the order engine
//!
//! Everything the engine reads or writes goes through these traits:
//! - [`OrderingWindowProvider`]: is ordering open right now
//! - [`Catalog`]: menu items, locations, location links, users
//! - [`InventoryReader`]: bulk stock check before the transaction
//! - [`PaymentProvider`]: payment intents
//! - [`OrderStore`] / [`OrderTx`]: transactional persistence

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{InventoryLevel, Location, MenuItem, Order, PaymentStatus, UserProfile};
use uuid::Uuid;

use crate::error::{BoxError, StoreError};
use crate::settings::OrderingWindowStatus;

// ========== Ordering window ==========

#[async_trait]
pub trait OrderingWindowProvider: Send + Sync {
    async fn ordering_window(&self) -> Result<OrderingWindowStatus, BoxError>;
}

// ========== Catalog ==========

/// A (menu item, location) pair the item is offered at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuItemLocationLink {
    pub menu_item_id: Uuid,
    pub location_id: Uuid,
}

#[async_trait]
pub trait Catalog: Send + Sync {
    /// Menu items with their variation groups; inactive items included
    async fn find_menu_items_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, BoxError>;

    async fn find_location_by_id(&self, id: Uuid) -> Result<Option<Location>, BoxError>;

    /// Links of the given menu items to the given location
    async fn find_menu_item_location_links(
        &self,
        menu_item_ids: &[Uuid],
        location_id: Uuid,
    ) -> Result<Vec<MenuItemLocationLink>, BoxError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, BoxError>;
}

// ========== Inventory ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub menu_item_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityResult {
    pub menu_item_id: Uuid,
    pub available: bool,
    pub current_stock: i32,
    pub requested: i32,
}

#[async_trait]
pub trait InventoryReader: Send + Sync {
    /// One result per request. Callers aggregate per menu item first.
    async fn check_bulk_availability(
        &self,
        requests: &[AvailabilityRequest],
    ) -> Result<Vec<AvailabilityResult>, BoxError>;
}

/// A stock decrement applied inside the order transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryDeduction {
    pub menu_item_id: Uuid,
    pub location_id: Uuid,
    pub quantity: i32,
    pub order_id: Uuid,
    pub order_number: String,
    /// None for guest orders
    pub changed_by: Option<Uuid>,
}

// ========== Payments ==========

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentRequest {
    /// Amount in minor units (cents)
    pub amount: i64,
    pub currency: String,
    pub customer_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Provider-side status of a payment intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    Unknown(String),
}

impl PaymentIntentStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "requires_confirmation" => Self::RequiresConfirmation,
            "requires_action" => Self::RequiresAction,
            "processing" => Self::Processing,
            "requires_capture" => Self::RequiresCapture,
            "canceled" => Self::Canceled,
            "succeeded" => Self::Succeeded,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Succeeded => "succeeded",
            Self::Unknown(s) => s,
        }
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, BoxError>;

    /// Attach the order id to the intent metadata
    async fn update_payment_intent_metadata(
        &self,
        payment_intent_id: &str,
        order_id: Uuid,
    ) -> Result<(), BoxError>;

    async fn retrieve_payment_intent_status(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntentStatus, BoxError>;
}

// ========== Persistence ==========

/// Transactional order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn OrderTx>, StoreError>;

    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError>;

    async fn find_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Conditional status update; false if the order was not in `from`
    async fn transition_payment_status(
        &self,
        order_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, StoreError>;

    /// Record a processed webhook event; false if it was already recorded
    async fn record_webhook_event(&self, event_id: &str, event_type: &str)
    -> Result<bool, StoreError>;
}

/// One order transaction. Dropping without `commit` rolls back.
#[async_trait]
pub trait OrderTx: Send {
    /// Highest order number starting with `prefix`, compared numerically
    async fn latest_order_number(&mut self, prefix: &str) -> Result<Option<String>, StoreError>;

    /// Insert the order and its items. `UniqueViolation` on a duplicate number.
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// Guarded decrement plus `ORDER_DEDUCTION` history entry
    async fn deduct_inventory(
        &mut self,
        deduction: &InventoryDeduction,
    ) -> Result<InventoryLevel, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}
