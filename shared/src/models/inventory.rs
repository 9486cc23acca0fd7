//! Inventory Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock level of one menu item at one location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryLevel {
    pub menu_item_id: Uuid,
    pub location_id: Uuid,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    /// Always `stock_quantity > 0` after a mutation
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

impl InventoryLevel {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }
}

/// Kind of inventory mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "inventory_change_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum InventoryChangeType {
    Restock,
    Adjustment,
    OrderDeduction,
}

/// Immutable audit record of one inventory mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryHistoryEntry {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub location_id: Uuid,
    pub change_type: InventoryChangeType,
    /// Signed delta (negative for deductions)
    pub quantity_change: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    /// User who triggered the change (None for guest orders)
    pub changed_by: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
