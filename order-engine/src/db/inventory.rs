//! Stock levels and inventory history

use std::collections::HashMap;

use shared::models::{InventoryChangeType, InventoryHistoryEntry, InventoryLevel};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::inventory::{DEFAULT_LOW_STOCK_THRESHOLD, InventoryChange};
use crate::orders::traits::{AvailabilityRequest, AvailabilityResult, InventoryDeduction};

const LEVEL_COLUMNS: &str =
    "menu_item_id, location_id, stock_quantity, low_stock_threshold, is_available, updated_at";

/// Stock check for a batch of (item, location, quantity) requests.
/// Untracked items are always available; a tracked item without a row has
/// stock 0.
pub async fn check_bulk_availability(
    pool: &PgPool,
    requests: &[AvailabilityRequest],
) -> Result<Vec<AvailabilityResult>, sqlx::Error> {
    if requests.is_empty() {
        return Ok(vec![]);
    }
    let item_ids: Vec<Uuid> = requests.iter().map(|r| r.menu_item_id).collect();
    let location_ids: Vec<Uuid> = requests.iter().map(|r| r.location_id).collect();

    let rows: Vec<(Uuid, Uuid, bool, i32)> = sqlx::query_as(
        "SELECT r.menu_item_id, r.location_id,
                COALESCE(m.track_inventory, TRUE),
                COALESCE(i.stock_quantity, 0)
         FROM UNNEST($1::uuid[], $2::uuid[]) AS r(menu_item_id, location_id)
         LEFT JOIN menu_items m ON m.id = r.menu_item_id
         LEFT JOIN inventory i
                ON i.menu_item_id = r.menu_item_id AND i.location_id = r.location_id",
    )
    .bind(&item_ids)
    .bind(&location_ids)
    .fetch_all(pool)
    .await?;

    let stock: HashMap<(Uuid, Uuid), (bool, i32)> = rows
        .into_iter()
        .map(|(item, location, tracked, quantity)| ((item, location), (tracked, quantity)))
        .collect();

    Ok(requests
        .iter()
        .map(|req| {
            let (tracked, current_stock) = stock
                .get(&(req.menu_item_id, req.location_id))
                .copied()
                .unwrap_or((true, 0));
            AvailabilityResult {
                menu_item_id: req.menu_item_id,
                available: !tracked || current_stock >= req.quantity,
                current_stock,
                requested: req.quantity,
            }
        })
        .collect())
}

/// Guarded decrement inside the order transaction.
///
/// The `stock_quantity >= $3` predicate makes the check and the write one
/// statement, so concurrent orders cannot take the same unit twice.
pub async fn deduct(
    conn: &mut PgConnection,
    deduction: &InventoryDeduction,
) -> Result<InventoryLevel, StoreError> {
    let updated: Option<InventoryLevel> = sqlx::query_as(&format!(
        "UPDATE inventory
         SET stock_quantity = stock_quantity - $3,
             is_available = (stock_quantity - $3) > 0,
             updated_at = now()
         WHERE menu_item_id = $1 AND location_id = $2 AND stock_quantity >= $3
         RETURNING {LEVEL_COLUMNS}"
    ))
    .bind(deduction.menu_item_id)
    .bind(deduction.location_id)
    .bind(deduction.quantity)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(level) = updated else {
        let available: Option<(i32,)> = sqlx::query_as(
            "SELECT stock_quantity FROM inventory WHERE menu_item_id = $1 AND location_id = $2",
        )
        .bind(deduction.menu_item_id)
        .bind(deduction.location_id)
        .fetch_optional(&mut *conn)
        .await?;
        return Err(StoreError::InsufficientStock {
            menu_item_id: deduction.menu_item_id,
            location_id: deduction.location_id,
            available: available.map_or(0, |r| r.0),
            requested: deduction.quantity,
        });
    };

    insert_history(
        &mut *conn,
        &NewHistoryEntry {
            menu_item_id: deduction.menu_item_id,
            location_id: deduction.location_id,
            change_type: InventoryChangeType::OrderDeduction,
            previous_quantity: level.stock_quantity + deduction.quantity,
            new_quantity: level.stock_quantity,
            changed_by: deduction.changed_by,
            order_id: Some(deduction.order_id),
            notes: Some(format!("Order {}", deduction.order_number)),
        },
    )
    .await?;

    Ok(level)
}

/// Restock or stocktake in its own transaction, creating the row on first use
pub async fn apply_change(
    pool: &PgPool,
    change: &InventoryChange,
) -> Result<InventoryLevel, StoreError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO inventory (menu_item_id, location_id, stock_quantity, low_stock_threshold, is_available)
         VALUES ($1, $2, 0, $3, FALSE)
         ON CONFLICT (menu_item_id, location_id) DO NOTHING",
    )
    .bind(change.menu_item_id)
    .bind(change.location_id)
    .bind(DEFAULT_LOW_STOCK_THRESHOLD)
    .execute(&mut *tx)
    .await?;

    let (previous,): (i32,) = sqlx::query_as(
        "SELECT stock_quantity FROM inventory
         WHERE menu_item_id = $1 AND location_id = $2
         FOR UPDATE",
    )
    .bind(change.menu_item_id)
    .bind(change.location_id)
    .fetch_one(&mut *tx)
    .await?;

    let new_quantity = change.change.apply_to(previous);
    let level: InventoryLevel = sqlx::query_as(&format!(
        "UPDATE inventory
         SET stock_quantity = $3, is_available = $3 > 0, updated_at = now()
         WHERE menu_item_id = $1 AND location_id = $2
         RETURNING {LEVEL_COLUMNS}"
    ))
    .bind(change.menu_item_id)
    .bind(change.location_id)
    .bind(new_quantity)
    .fetch_one(&mut *tx)
    .await?;

    insert_history(
        &mut *tx,
        &NewHistoryEntry {
            menu_item_id: change.menu_item_id,
            location_id: change.location_id,
            change_type: change.change.change_type(),
            previous_quantity: previous,
            new_quantity,
            changed_by: change.changed_by,
            order_id: None,
            notes: change.notes.clone(),
        },
    )
    .await?;

    tx.commit().await?;
    Ok(level)
}

pub async fn set_low_stock_threshold(
    pool: &PgPool,
    menu_item_id: Uuid,
    location_id: Uuid,
    threshold: i32,
) -> Result<Option<InventoryLevel>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE inventory SET low_stock_threshold = $3, updated_at = now()
         WHERE menu_item_id = $1 AND location_id = $2
         RETURNING {LEVEL_COLUMNS}"
    ))
    .bind(menu_item_id)
    .bind(location_id)
    .bind(threshold)
    .fetch_optional(pool)
    .await
}

pub async fn find_level(
    pool: &PgPool,
    menu_item_id: Uuid,
    location_id: Uuid,
) -> Result<Option<InventoryLevel>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {LEVEL_COLUMNS} FROM inventory WHERE menu_item_id = $1 AND location_id = $2"
    ))
    .bind(menu_item_id)
    .bind(location_id)
    .fetch_optional(pool)
    .await
}

/// Newest first
pub async fn history(
    pool: &PgPool,
    menu_item_id: Uuid,
    location_id: Uuid,
    limit: i64,
) -> Result<Vec<InventoryHistoryEntry>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, menu_item_id, location_id, change_type, quantity_change,
                previous_quantity, new_quantity, changed_by, order_id, notes, created_at
         FROM inventory_history
         WHERE menu_item_id = $1 AND location_id = $2
         ORDER BY created_at DESC
         LIMIT $3",
    )
    .bind(menu_item_id)
    .bind(location_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn low_stock(
    pool: &PgPool,
    location_id: Uuid,
) -> Result<Vec<InventoryLevel>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {LEVEL_COLUMNS} FROM inventory
         WHERE location_id = $1 AND stock_quantity <= low_stock_threshold
         ORDER BY stock_quantity"
    ))
    .bind(location_id)
    .fetch_all(pool)
    .await
}

struct NewHistoryEntry {
    menu_item_id: Uuid,
    location_id: Uuid,
    change_type: InventoryChangeType,
    previous_quantity: i32,
    new_quantity: i32,
    changed_by: Option<Uuid>,
    order_id: Option<Uuid>,
    notes: Option<String>,
}

async fn insert_history(conn: &mut PgConnection, entry: &NewHistoryEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO inventory_history
            (id, menu_item_id, location_id, change_type, quantity_change,
             previous_quantity, new_quantity, changed_by, order_id, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(Uuid::new_v4())
    .bind(entry.menu_item_id)
    .bind(entry.location_id)
    .bind(entry.change_type)
    .bind(entry.new_quantity - entry.previous_quantity)
    .bind(entry.previous_quantity)
    .bind(entry.new_quantity)
    .bind(entry.changed_by)
    .bind(entry.order_id)
    .bind(entry.notes.as_deref())
    .execute(conn)
    .await?;
    Ok(())
}
