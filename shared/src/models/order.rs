//! Order Model
//!
//! Orders carry snapshot copies of the customer, location and menu item data
//! they were created from. Snapshot fields are written once at creation and
//! never re-derived, so later catalog edits do not change historical orders.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }
}

/// Kitchen fulfillment status (orders and individual items)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "fulfillment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum FulfillmentStatus {
    #[default]
    Placed,
    PartiallyFulfilled,
    Fulfilled,
}

/// Who owns an order: a registered user or a guest identity, never both
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderOwner {
    Registered {
        user_id: Uuid,
    },
    Guest {
        email: String,
        first_name: String,
        last_name: String,
    },
}

impl OrderOwner {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Registered { user_id } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }

    pub fn guest_email(&self) -> Option<&str> {
        match self {
            Self::Registered { .. } => None,
            Self::Guest { email, .. } => Some(email),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}

/// A variation option chosen for an order item, with names frozen at purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedVariation {
    pub group_id: Uuid,
    pub group_name: String,
    pub option_id: Uuid,
    pub option_name: String,
    pub price_modifier: Decimal,
}

/// One line item within an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    /// Source menu item (None once the menu item has been deleted)
    pub menu_item_id: Option<Uuid>,
    pub quantity: i32,
    /// Base price plus variation modifiers, frozen at purchase
    pub price_at_purchase: Decimal,
    pub selected_variations: Vec<SelectedVariation>,
    pub customizations: Option<String>,
    pub special_requests: Option<String>,
    pub fulfillment_status: FulfillmentStatus,
    // Snapshot
    pub item_name: String,
    pub item_description: Option<String>,
    pub item_category: Option<String>,
    pub item_image_url: Option<String>,
    pub item_base_price: Decimal,
}

impl OrderItem {
    /// Line subtotal (price at purchase × quantity)
    pub fn subtotal(&self) -> Decimal {
        self.price_at_purchase * Decimal::from(self.quantity)
    }
}

/// Order entity (one checkout attempt)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    /// Human-readable number, `ORD-YYYYMMDD-NNNN`
    pub order_number: String,
    pub owner: OrderOwner,
    pub location_id: Option<Uuid>,
    /// Total amount in currency unit, rounded to cents
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub payment_intent_id: Option<String>,
    /// Calendar day the order was placed (UTC)
    pub order_date: NaiveDate,
    pub special_requests: Option<String>,
    pub delivery_notes: Option<String>,
    // Customer snapshot
    pub customer_name: Option<String>,
    pub customer_email: String,
    pub customer_department: Option<String>,
    // Location snapshot
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_phone: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of item subtotals (unrounded)
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}
