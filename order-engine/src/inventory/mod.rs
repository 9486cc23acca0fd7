//! Inventory management
//!
//! Administrative stock operations (restock, manual adjustment, low-stock
//! threshold) on top of an [`InventoryLedger`]. Order deductions do not go
//! through here; they run inside the order transaction via
//! [`OrderTx::deduct_inventory`](crate::orders::traits::OrderTx::deduct_inventory).
//!
//! Every stock mutation writes an immutable history entry and keeps
//! `is_available == (stock_quantity > 0)`.

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{InventoryChangeType, InventoryHistoryEntry, InventoryLevel};
use thiserror::Error;
use uuid::Uuid;

use crate::error::StoreError;
use crate::utils::validation::{MAX_NOTE_LEN, validate_optional_text};

/// Low-stock threshold for rows created by a first restock
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

/// Default page size for history queries
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Requested stock mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// Add units
    Restock(i32),
    /// Set the absolute count (stocktake)
    SetQuantity(i32),
}

impl StockChange {
    pub fn change_type(&self) -> InventoryChangeType {
        match self {
            Self::Restock(_) => InventoryChangeType::Restock,
            Self::SetQuantity(_) => InventoryChangeType::Adjustment,
        }
    }

    /// New stock level given the previous one
    pub fn apply_to(&self, previous: i32) -> i32 {
        match *self {
            Self::Restock(quantity) => previous.saturating_add(quantity),
            Self::SetQuantity(quantity) => quantity,
        }
    }
}

/// A stock mutation with its audit fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryChange {
    pub menu_item_id: Uuid,
    pub location_id: Uuid,
    pub change: StockChange,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// Storage for stock levels and their history
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Apply a change atomically, creating the row if needed, and record history
    async fn apply_change(&self, change: &InventoryChange) -> Result<InventoryLevel, StoreError>;

    async fn set_low_stock_threshold(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        threshold: i32,
    ) -> Result<InventoryLevel, StoreError>;

    async fn level(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
    ) -> Result<Option<InventoryLevel>, StoreError>;

    /// Newest first
    async fn history(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        limit: i64,
    ) -> Result<Vec<InventoryHistoryEntry>, StoreError>;

    /// Levels at or below their low-stock threshold at a location
    async fn low_stock(&self, location_id: Uuid) -> Result<Vec<InventoryLevel>, StoreError>;
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Invalid inventory change: {0}")]
    Validation(String),

    #[error("No inventory record for menu item {menu_item_id} at location {location_id}")]
    NotFound {
        menu_item_id: Uuid,
        location_id: Uuid,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(msg) => AppError::validation(msg),
            InventoryError::NotFound { .. } => AppError::new(ErrorCode::InventoryNotFound),
            InventoryError::Store(e) => {
                tracing::error!(error = %e, "Inventory store error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

/// Inventory administration service
#[derive(Clone)]
pub struct InventoryService {
    ledger: Arc<dyn InventoryLedger>,
}

impl InventoryService {
    pub fn new(ledger: Arc<dyn InventoryLedger>) -> Self {
        Self { ledger }
    }

    /// Add stock
    pub async fn restock(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        quantity: i32,
        changed_by: Option<Uuid>,
        notes: Option<String>,
    ) -> Result<InventoryLevel, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::Validation(format!(
                "restock quantity must be positive, got {quantity}"
            )));
        }
        self.apply(InventoryChange {
            menu_item_id,
            location_id,
            change: StockChange::Restock(quantity),
            changed_by,
            notes,
        })
        .await
    }

    /// Set the absolute stock count
    pub async fn adjust(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        new_quantity: i32,
        changed_by: Option<Uuid>,
        reason: Option<String>,
    ) -> Result<InventoryLevel, InventoryError> {
        if new_quantity < 0 {
            return Err(InventoryError::Validation(format!(
                "stock quantity cannot be negative, got {new_quantity}"
            )));
        }
        self.apply(InventoryChange {
            menu_item_id,
            location_id,
            change: StockChange::SetQuantity(new_quantity),
            changed_by,
            notes: reason,
        })
        .await
    }

    async fn apply(&self, change: InventoryChange) -> Result<InventoryLevel, InventoryError> {
        validate_optional_text(&change.notes, "notes", MAX_NOTE_LEN)
            .map_err(|e| InventoryError::Validation(e.to_string()))?;

        let level = self.ledger.apply_change(&change).await?;
        tracing::info!(
            menu_item_id = %change.menu_item_id,
            location_id = %change.location_id,
            change_type = ?change.change.change_type(),
            stock = level.stock_quantity,
            "Inventory updated"
        );
        if level.is_low_stock() {
            tracing::warn!(
                menu_item_id = %level.menu_item_id,
                location_id = %level.location_id,
                stock = level.stock_quantity,
                threshold = level.low_stock_threshold,
                "Low stock"
            );
        }
        Ok(level)
    }

    pub async fn set_low_stock_threshold(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        threshold: i32,
    ) -> Result<InventoryLevel, InventoryError> {
        if threshold < 0 {
            return Err(InventoryError::Validation(format!(
                "low stock threshold cannot be negative, got {threshold}"
            )));
        }
        self.ledger
            .set_low_stock_threshold(menu_item_id, location_id, threshold)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => InventoryError::NotFound {
                    menu_item_id,
                    location_id,
                },
                other => InventoryError::Store(other),
            })
    }

    pub async fn level(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
    ) -> Result<InventoryLevel, InventoryError> {
        self.ledger
            .level(menu_item_id, location_id)
            .await?
            .ok_or(InventoryError::NotFound {
                menu_item_id,
                location_id,
            })
    }

    pub async fn history(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<InventoryHistoryEntry>, InventoryError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 500);
        Ok(self.ledger.history(menu_item_id, location_id, limit).await?)
    }

    pub async fn low_stock(&self, location_id: Uuid) -> Result<Vec<InventoryLevel>, InventoryError> {
        Ok(self.ledger.low_stock(location_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, InventoryService, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let service = InventoryService::new(store.clone());
        (store, service, Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_stock_change_math() {
        assert_eq!(StockChange::Restock(5).apply_to(3), 8);
        assert_eq!(StockChange::SetQuantity(2).apply_to(30), 2);
        assert_eq!(
            StockChange::SetQuantity(0).change_type(),
            InventoryChangeType::Adjustment
        );
    }

    #[tokio::test]
    async fn test_restock_creates_row_and_history() {
        let (_store, service, item, location) = setup();

        let level = service.restock(item, location, 10, None, None).await.unwrap();
        assert_eq!(level.stock_quantity, 10);
        assert!(level.is_available);
        assert_eq!(level.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);

        let history = service.history(item, location, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_type, InventoryChangeType::Restock);
        assert_eq!(history[0].previous_quantity, 0);
        assert_eq!(history[0].new_quantity, 10);
        assert_eq!(history[0].quantity_change, 10);
    }

    #[tokio::test]
    async fn test_adjust_to_zero_marks_unavailable() {
        let (_store, service, item, location) = setup();
        let actor = Uuid::new_v4();
        service.restock(item, location, 4, Some(actor), None).await.unwrap();

        let level = service
            .adjust(item, location, 0, Some(actor), Some("Spoiled".to_string()))
            .await
            .unwrap();
        assert_eq!(level.stock_quantity, 0);
        assert!(!level.is_available);

        let history = service.history(item, location, None).await.unwrap();
        assert_eq!(history[0].change_type, InventoryChangeType::Adjustment);
        assert_eq!(history[0].quantity_change, -4);
        assert_eq!(history[0].changed_by, Some(actor));
        assert_eq!(history[0].notes.as_deref(), Some("Spoiled"));
    }

    #[tokio::test]
    async fn test_rejects_bad_quantities() {
        let (_store, service, item, location) = setup();
        assert!(matches!(
            service.restock(item, location, 0, None, None).await,
            Err(InventoryError::Validation(_))
        ));
        assert!(matches!(
            service.adjust(item, location, -1, None, None).await,
            Err(InventoryError::Validation(_))
        ));
        assert!(matches!(
            service.set_low_stock_threshold(item, location, -2).await,
            Err(InventoryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_threshold_and_low_stock() {
        let (_store, service, item, location) = setup();
        assert!(matches!(
            service.set_low_stock_threshold(item, location, 3).await,
            Err(InventoryError::NotFound { .. })
        ));

        service.restock(item, location, 10, None, None).await.unwrap();
        let level = service.set_low_stock_threshold(item, location, 12).await.unwrap();
        assert_eq!(level.low_stock_threshold, 12);
        assert!(level.is_low_stock());

        let low = service.low_stock(location).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].menu_item_id, item);
    }

    #[tokio::test]
    async fn test_missing_level() {
        let (_store, service, item, location) = setup();
        assert!(matches!(
            service.level(item, location).await,
            Err(InventoryError::NotFound { .. })
        ));
    }
}
