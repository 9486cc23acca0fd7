//! In-memory store
//!
//! Implements every persistence trait over `parking_lot` maps. Transactions
//! behave like the PostgreSQL backend where the engine can observe it:
//! - order numbers are reserved at insert, so a clash is a `UniqueViolation`
//! - stock deductions are guarded and applied eagerly, then undone on
//!   rollback or drop
//! - orders and history entries become visible on commit

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::models::{
    InventoryChangeType, InventoryHistoryEntry, InventoryLevel, Location, MenuItem, Order,
    PaymentStatus, UserProfile,
};
use uuid::Uuid;

use crate::error::{BoxError, StoreError};
use crate::inventory::{DEFAULT_LOW_STOCK_THRESHOLD, InventoryChange, InventoryLedger};
use crate::orders::number::compare_order_numbers;
use crate::orders::traits::{
    AvailabilityRequest, AvailabilityResult, Catalog, InventoryDeduction, InventoryReader,
    MenuItemLocationLink, OrderStore, OrderTx,
};

const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

type StockKey = (Uuid, Uuid);

#[derive(Default)]
struct MemoryState {
    menu_items: HashMap<Uuid, MenuItem>,
    locations: HashMap<Uuid, Location>,
    links: HashSet<StockKey>,
    users: HashMap<Uuid, UserProfile>,
    inventory: HashMap<StockKey, InventoryLevel>,
    history: Vec<InventoryHistoryEntry>,
    orders: HashMap<Uuid, Order>,
    /// Committed and in-flight order numbers
    order_numbers: HashSet<String>,
    webhook_events: HashSet<String>,
}

impl MemoryState {
    fn restore_stock(&mut self, key: StockKey, quantity: i32) {
        if let Some(level) = self.inventory.get_mut(&key) {
            level.stock_quantity += quantity;
            level.is_available = level.stock_quantity > 0;
        }
    }
}

/// In-memory implementation of the catalog, inventory and order stores
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding ==========

    pub fn insert_menu_item(&self, item: MenuItem) {
        self.state.lock().menu_items.insert(item.id, item);
    }

    pub fn insert_location(&self, location: Location) {
        self.state.lock().locations.insert(location.id, location);
    }

    pub fn insert_user(&self, user: UserProfile) {
        self.state.lock().users.insert(user.id, user);
    }

    pub fn link_menu_item(&self, menu_item_id: Uuid, location_id: Uuid) {
        self.state.lock().links.insert((menu_item_id, location_id));
    }

    /// Set stock directly, without a history entry
    pub fn set_stock(&self, menu_item_id: Uuid, location_id: Uuid, quantity: i32) {
        let mut state = self.state.lock();
        let level = state
            .inventory
            .entry((menu_item_id, location_id))
            .or_insert_with(|| empty_level(menu_item_id, location_id));
        level.stock_quantity = quantity;
        level.is_available = quantity > 0;
        level.updated_at = Utc::now();
    }

    // ========== Inspection ==========

    pub fn stock(&self, menu_item_id: Uuid, location_id: Uuid) -> Option<i32> {
        self.state
            .lock()
            .inventory
            .get(&(menu_item_id, location_id))
            .map(|l| l.stock_quantity)
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().orders.values().cloned().collect()
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    pub fn inventory_history(&self, menu_item_id: Uuid, location_id: Uuid) -> Vec<InventoryHistoryEntry> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|h| h.menu_item_id == menu_item_id && h.location_id == location_id)
            .cloned()
            .collect()
    }
}

fn empty_level(menu_item_id: Uuid, location_id: Uuid) -> InventoryLevel {
    InventoryLevel {
        menu_item_id,
        location_id,
        stock_quantity: 0,
        low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        is_available: false,
        updated_at: Utc::now(),
    }
}

// ========== Catalog ==========

#[async_trait]
impl Catalog for MemoryStore {
    async fn find_menu_items_by_ids(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, BoxError> {
        let state = self.state.lock();
        Ok(ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| state.menu_items.get(id).cloned())
            .collect())
    }

    async fn find_location_by_id(&self, id: Uuid) -> Result<Option<Location>, BoxError> {
        Ok(self.state.lock().locations.get(&id).cloned())
    }

    async fn find_menu_item_location_links(
        &self,
        menu_item_ids: &[Uuid],
        location_id: Uuid,
    ) -> Result<Vec<MenuItemLocationLink>, BoxError> {
        let state = self.state.lock();
        Ok(menu_item_ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter(|id| state.links.contains(&(**id, location_id)))
            .map(|id| MenuItemLocationLink {
                menu_item_id: *id,
                location_id,
            })
            .collect())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, BoxError> {
        Ok(self.state.lock().users.get(&id).cloned())
    }
}

// ========== Inventory ==========

#[async_trait]
impl InventoryReader for MemoryStore {
    async fn check_bulk_availability(
        &self,
        requests: &[AvailabilityRequest],
    ) -> Result<Vec<AvailabilityResult>, BoxError> {
        let state = self.state.lock();
        Ok(requests
            .iter()
            .map(|req| {
                let tracked = state
                    .menu_items
                    .get(&req.menu_item_id)
                    .is_none_or(|m| m.track_inventory);
                let current_stock = state
                    .inventory
                    .get(&(req.menu_item_id, req.location_id))
                    .map_or(0, |l| l.stock_quantity);
                AvailabilityResult {
                    menu_item_id: req.menu_item_id,
                    available: !tracked || current_stock >= req.quantity,
                    current_stock,
                    requested: req.quantity,
                }
            })
            .collect())
    }
}

#[async_trait]
impl InventoryLedger for MemoryStore {
    async fn apply_change(&self, change: &InventoryChange) -> Result<InventoryLevel, StoreError> {
        let mut state = self.state.lock();
        let key = (change.menu_item_id, change.location_id);
        let level = state
            .inventory
            .entry(key)
            .or_insert_with(|| empty_level(change.menu_item_id, change.location_id));

        let previous = level.stock_quantity;
        let new_quantity = change.change.apply_to(previous);
        level.stock_quantity = new_quantity;
        level.is_available = new_quantity > 0;
        level.updated_at = Utc::now();
        let snapshot = level.clone();

        state.history.push(InventoryHistoryEntry {
            id: Uuid::new_v4(),
            menu_item_id: change.menu_item_id,
            location_id: change.location_id,
            change_type: change.change.change_type(),
            quantity_change: new_quantity - previous,
            previous_quantity: previous,
            new_quantity,
            changed_by: change.changed_by,
            order_id: None,
            notes: change.notes.clone(),
            created_at: snapshot.updated_at,
        });
        Ok(snapshot)
    }

    async fn set_low_stock_threshold(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        threshold: i32,
    ) -> Result<InventoryLevel, StoreError> {
        let mut state = self.state.lock();
        let level = state
            .inventory
            .get_mut(&(menu_item_id, location_id))
            .ok_or_else(|| StoreError::NotFound(format!("inventory {menu_item_id}/{location_id}")))?;
        level.low_stock_threshold = threshold;
        level.updated_at = Utc::now();
        Ok(level.clone())
    }

    async fn level(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
    ) -> Result<Option<InventoryLevel>, StoreError> {
        Ok(self.state.lock().inventory.get(&(menu_item_id, location_id)).cloned())
    }

    async fn history(
        &self,
        menu_item_id: Uuid,
        location_id: Uuid,
        limit: i64,
    ) -> Result<Vec<InventoryHistoryEntry>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|h| h.menu_item_id == menu_item_id && h.location_id == location_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn low_stock(&self, location_id: Uuid) -> Result<Vec<InventoryLevel>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .inventory
            .values()
            .filter(|l| l.location_id == location_id && l.is_low_stock())
            .cloned()
            .collect())
    }
}

// ========== Orders ==========

#[async_trait]
impl OrderStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn OrderTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            state: self.state.clone(),
            reserved_numbers: Vec::new(),
            pending_orders: Vec::new(),
            deducted: Vec::new(),
            pending_history: Vec::new(),
            finished: false,
        }))
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        Ok(self.state.lock().orders.get(&order_id).cloned())
    }

    async fn find_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .state
            .lock()
            .orders
            .values()
            .find(|o| o.payment_intent_id.as_deref() == Some(payment_intent_id))
            .cloned())
    }

    async fn transition_payment_status(
        &self,
        order_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock();
        match state.orders.get_mut(&order_id) {
            Some(order) if order.payment_status == from => {
                order.payment_status = to;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        _event_type: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.state.lock().webhook_events.insert(event_id.to_string()))
    }
}

/// In-memory order transaction
pub struct MemoryTx {
    state: Arc<Mutex<MemoryState>>,
    reserved_numbers: Vec<String>,
    pending_orders: Vec<Order>,
    deducted: Vec<(StockKey, i32)>,
    pending_history: Vec<InventoryHistoryEntry>,
    finished: bool,
}

impl MemoryTx {
    fn undo(&mut self) {
        let mut state = self.state.lock();
        for number in self.reserved_numbers.drain(..) {
            state.order_numbers.remove(&number);
        }
        for (key, quantity) in self.deducted.drain(..) {
            state.restore_stock(key, quantity);
        }
        self.pending_orders.clear();
        self.pending_history.clear();
        self.finished = true;
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.undo();
        }
    }
}

#[async_trait]
impl OrderTx for MemoryTx {
    async fn latest_order_number(&mut self, prefix: &str) -> Result<Option<String>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .order_numbers
            .iter()
            .filter(|n| n.starts_with(prefix))
            .max_by(|a, b| compare_order_numbers(a, b))
            .cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.order_numbers.insert(order.order_number.clone()) {
            return Err(StoreError::UniqueViolation(ORDER_NUMBER_CONSTRAINT.to_string()));
        }
        self.reserved_numbers.push(order.order_number.clone());
        self.pending_orders.push(order.clone());
        Ok(())
    }

    async fn deduct_inventory(
        &mut self,
        deduction: &InventoryDeduction,
    ) -> Result<InventoryLevel, StoreError> {
        let mut state = self.state.lock();
        let key = (deduction.menu_item_id, deduction.location_id);
        let available = state.inventory.get(&key).map_or(0, |l| l.stock_quantity);
        let level = match state.inventory.get_mut(&key) {
            Some(level) if level.stock_quantity >= deduction.quantity => level,
            _ => {
                return Err(StoreError::InsufficientStock {
                    menu_item_id: deduction.menu_item_id,
                    location_id: deduction.location_id,
                    available,
                    requested: deduction.quantity,
                });
            }
        };

        let previous = level.stock_quantity;
        level.stock_quantity -= deduction.quantity;
        level.is_available = level.stock_quantity > 0;
        level.updated_at = Utc::now();
        let snapshot = level.clone();

        self.deducted.push((key, deduction.quantity));
        self.pending_history.push(InventoryHistoryEntry {
            id: Uuid::new_v4(),
            menu_item_id: deduction.menu_item_id,
            location_id: deduction.location_id,
            change_type: InventoryChangeType::OrderDeduction,
            quantity_change: -deduction.quantity,
            previous_quantity: previous,
            new_quantity: snapshot.stock_quantity,
            changed_by: deduction.changed_by,
            order_id: Some(deduction.order_id),
            notes: Some(format!("Order {}", deduction.order_number)),
            created_at: snapshot.updated_at,
        });
        Ok(snapshot)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        for order in self.pending_orders.drain(..) {
            state.orders.insert(order.id, order);
        }
        state.history.append(&mut self.pending_history);
        self.reserved_numbers.clear();
        self.deducted.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.undo();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use shared::models::{FulfillmentStatus, OrderOwner};

    fn order(number: &str) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::new_v4(),
            order_number: number.to_string(),
            owner: OrderOwner::Registered {
                user_id: Uuid::new_v4(),
            },
            location_id: None,
            total_amount: Decimal::new(500, 2),
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Placed,
            payment_intent_id: Some("pi_1".to_string()),
            order_date: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
            special_requests: None,
            delivery_notes: None,
            customer_name: Some("Ana Lopez".to_string()),
            customer_email: "ana@example.org".to_string(),
            customer_department: None,
            location_name: None,
            location_address: None,
            location_phone: None,
            items: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn deduction(menu_item_id: Uuid, location_id: Uuid, quantity: i32) -> InventoryDeduction {
        InventoryDeduction {
            menu_item_id,
            location_id,
            quantity,
            order_id: Uuid::new_v4(),
            order_number: "ORD-20261017-0001".to_string(),
            changed_by: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_number_is_unique_violation() {
        let store = MemoryStore::new();
        let mut tx1 = store.begin().await.unwrap();
        let mut tx2 = store.begin().await.unwrap();

        tx1.insert_order(&order("ORD-20261017-0001")).await.unwrap();
        let err = tx2.insert_order(&order("ORD-20261017-0001")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_rollback_releases_number_and_stock() {
        let store = MemoryStore::new();
        let (item, location) = (Uuid::new_v4(), Uuid::new_v4());
        store.set_stock(item, location, 5);

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order("ORD-20261017-0001")).await.unwrap();
        tx.deduct_inventory(&deduction(item, location, 3)).await.unwrap();
        assert_eq!(store.stock(item, location), Some(2));
        tx.rollback().await.unwrap();

        assert_eq!(store.stock(item, location), Some(5));
        assert_eq!(store.order_count(), 0);
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.latest_order_number("ORD-20261017-").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryStore::new();
        let (item, location) = (Uuid::new_v4(), Uuid::new_v4());
        store.set_stock(item, location, 1);
        {
            let mut tx = store.begin().await.unwrap();
            tx.deduct_inventory(&deduction(item, location, 1)).await.unwrap();
        }
        assert_eq!(store.stock(item, location), Some(1));
        assert!(store.inventory_history(item, location).is_empty());
    }

    #[tokio::test]
    async fn test_guarded_deduction() {
        let store = MemoryStore::new();
        let (item, location) = (Uuid::new_v4(), Uuid::new_v4());
        store.set_stock(item, location, 2);

        let mut tx = store.begin().await.unwrap();
        let err = tx.deduct_inventory(&deduction(item, location, 3)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            }
        ));

        let level = tx.deduct_inventory(&deduction(item, location, 2)).await.unwrap();
        assert_eq!(level.stock_quantity, 0);
        assert!(!level.is_available);
        tx.commit().await.unwrap();

        let history = store.inventory_history(item, location);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_type, InventoryChangeType::OrderDeduction);
        assert_eq!(history[0].quantity_change, -2);
    }

    #[tokio::test]
    async fn test_latest_number_is_numeric_max() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for number in ["ORD-20261017-9999", "ORD-20261017-10000", "ORD-20261016-20000"] {
            tx.insert_order(&order(number)).await.unwrap();
        }
        assert_eq!(
            tx.latest_order_number("ORD-20261017-").await.unwrap().as_deref(),
            Some("ORD-20261017-10000")
        );
    }

    #[tokio::test]
    async fn test_payment_transition_is_conditional() {
        let store = MemoryStore::new();
        let o = order("ORD-20261017-0001");
        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&o).await.unwrap();
        tx.commit().await.unwrap();

        assert!(
            store
                .transition_payment_status(o.id, PaymentStatus::Pending, PaymentStatus::Completed)
                .await
                .unwrap()
        );
        assert!(
            !store
                .transition_payment_status(o.id, PaymentStatus::Pending, PaymentStatus::Completed)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_webhook_event_recorded_once() {
        let store = MemoryStore::new();
        assert!(store.record_webhook_event("evt_1", "payment_intent.succeeded").await.unwrap());
        assert!(!store.record_webhook_event("evt_1", "payment_intent.succeeded").await.unwrap());
    }
}
