//! PostgreSQL backend
//!
//! Query functions live in the submodules and take a `&PgPool` or, inside
//! the order transaction, a `&mut PgConnection`. [`PgStore`] wires them into
//! the collaborator traits.

pub mod catalog;
pub mod inventory;
pub mod orders;
pub mod settings;
pub mod webhook_events;

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{
    InventoryHistoryEntry, InventoryLevel, Location, MenuItem, Order, PaymentStatus, UserProfile,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{BoxError, StoreError};
use crate::inventory::{InventoryChange, InventoryLedger};
use crate::orders::traits::{
    AvailabilityRequest, AvailabilityResult, Catalog, InventoryDeduction, InventoryReader,
    MenuItemLocationLink, OrderStore, OrderTx, OrderingWindowProvider,
};
use crate::settings::{OrderingSchedule, OrderingWindowStatus};

/// PostgreSQL implementation of every store trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!("Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }
}

// ========== Catalog ==========

#[async_trait]
impl Catalog for PgStore {
    async fn find_menu_items_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, BoxError> {
        Ok(catalog::find_menu_items_by_ids(&self.pool, ids).await?)
    }

    async fn find_location_by_id(&self, id: Uuid) -> Result<Option<Location>, BoxError> {
        Ok(catalog::find_location(&self.pool, id).await?)
    }

    async fn find_menu_item_location_links(
        &self,
        menu_item_ids: &[Uuid],
        location_id: Uuid,
    ) -> Result<Vec<MenuItemLocationLink>, BoxError> {
        Ok(catalog::find_location_links(&self.pool, menu_item_ids, location_id).await?)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, BoxError> {
        Ok(catalog::find_user(&self.pool, id).await?)
    }
}

// ========== Ordering window ==========

#[async_trait]
impl OrderingWindowProvider for PgStore {
    async fn ordering_window(&self) -> Result<OrderingWindowStatus, BoxError> {
        let rows = settings::load_ordering_settings(&self.pool).await?;
        let schedule = OrderingSchedule::from_settings(&rows)?;
        Ok(schedule.evaluate(Utc::now()))
    }
}

// ========== Inventory ==========

#[async_trait]
impl InventoryReader for PgStore {
    async fn check_bulk_availability(
        &self,
        requests: &[AvailabilityRequest],
    ) -> Result<Vec<AvailabilityResult>, BoxError> {
        Ok(inventory::check_bulk_availability(&self.pool, requests).await?)
    }
}

#[async_trait]
impl InventoryLedger for PgStore {
    async fn apply_change(&self, change: &InventoryChange) -> Result<InventoryLevel, StoreError> {
        inventory::apply_change(&self.pool, change).await
    }

    async fn set_low_stock_threshold(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        threshold: i32,
    ) -> Result<InventoryLevel, StoreError> {
        inventory::set_low_stock_threshold(&self.pool, menu_item_id, location_id, threshold)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("inventory {menu_item_id}/{location_id}")))
    }

    async fn level(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
    ) -> Result<Option<InventoryLevel>, StoreError> {
        Ok(inventory::find_level(&self.pool, menu_item_id, location_id).await?)
    }

    async fn history(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        limit: i64,
    ) -> Result<Vec<InventoryHistoryEntry>, StoreError> {
        Ok(inventory::history(&self.pool, menu_item_id, location_id, limit).await?)
    }

    async fn low_stock(&self, location_id: Uuid) -> Result<Vec<InventoryLevel>, StoreError> {
        Ok(inventory::low_stock(&self.pool, location_id).await?)
    }
}

// ========== Orders ==========

#[async_trait]
impl OrderStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn OrderTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgOrderTx { tx: Some(tx) }))
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        orders::find_by_id(&self.pool, order_id).await
    }

    async fn find_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        orders::find_by_payment_intent(&self.pool, payment_intent_id).await
    }

    async fn transition_payment_status(
        &self,
        order_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, StoreError> {
        Ok(orders::transition_payment_status(&self.pool, order_id, from, to).await?)
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, StoreError> {
        Ok(webhook_events::record(&self.pool, event_id, event_type, Utc::now().timestamp()).await?)
    }
}

/// Order transaction over a pooled connection.
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PgOrderTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgOrderTx {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx.as_deref_mut().ok_or_else(|| {
            StoreError::Database(sqlx::Error::Protocol(
                "order transaction already finished".to_string(),
            ))
        })
    }
}

#[async_trait]
impl OrderTx for PgOrderTx {
    async fn latest_order_number(&mut self, prefix: &str) -> Result<Option<String>, StoreError> {
        Ok(orders::latest_order_number(self.conn()?, prefix).await?)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        orders::insert(self.conn()?, order).await
    }

    async fn deduct_inventory(
        &mut self,
        deduction: &InventoryDeduction,
    ) -> Result<InventoryLevel, StoreError> {
        inventory::deduct(self.conn()?, deduction).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
