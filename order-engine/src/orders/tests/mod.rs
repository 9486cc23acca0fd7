use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    InventoryLevel, Location, MenuItem, Order, PaymentStatus, UserProfile, VariationGroup,
    VariationOption, VariationType,
};
use uuid::Uuid;

use super::traits::*;
use super::*;
use crate::auth::{GuestTokenConfig, GuestTokenService};
use crate::error::{BoxError, OrderError, StoreError};
use crate::memory::{MemoryPayments, MemoryStore};
use crate::settings::OrderingWindowStatus;

mod test_access;
mod test_concurrency;

const TEST_TOKEN_SECRET: &str = "test-guest-secret-with-at-least-32-bytes";
const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

struct Fixture {
    store: Arc<MemoryStore>,
    payments: Arc<MemoryPayments>,
    engine: OrderEngine,
    location: Location,
    user: UserProfile,
}

fn token_service() -> GuestTokenService {
    GuestTokenService::new(GuestTokenConfig {
        secret: TEST_TOKEN_SECRET.to_string(),
        ..Default::default()
    })
}

fn build_engine(
    store: Arc<MemoryStore>,
    payments: Arc<MemoryPayments>,
    window: OrderingWindowStatus,
) -> OrderEngine {
    OrderEngine::new(
        Collaborators {
            ordering_window: Arc::new(window),
            catalog: store.clone(),
            inventory: store.clone(),
            payments,
            store,
        },
        token_service(),
        "usd",
    )
}

fn fixture_with_window(window: OrderingWindowStatus) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let payments = Arc::new(MemoryPayments::new());

    let location = Location {
        id: Uuid::new_v4(),
        name: "Main Cafeteria".to_string(),
        address: Some("Building A, Ground Floor".to_string()),
        phone: Some("555-0100".to_string()),
        is_active: true,
    };
    store.insert_location(location.clone());

    let user = UserProfile {
        id: Uuid::new_v4(),
        email: "nurse.kim@hospital.org".to_string(),
        first_name: "Jae".to_string(),
        last_name: "Kim".to_string(),
        department: Some("Cardiology".to_string()),
    };
    store.insert_user(user.clone());

    let engine = build_engine(store.clone(), payments.clone(), window);
    Fixture {
        store,
        payments,
        engine,
        location,
        user,
    }
}

fn fixture() -> Fixture {
    fixture_with_window(OrderingWindowStatus::open())
}

fn menu_item(name: &str, price_cents: i64, track_inventory: bool) -> MenuItem {
    MenuItem {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: Some(format!("{name} of the day")),
        category: Some("Mains".to_string()),
        image_url: None,
        price: Decimal::new(price_cents, 2),
        is_active: true,
        track_inventory,
        variation_groups: vec![],
    }
}

impl Fixture {
    /// Add an item offered at the fixture location; `stock` makes it tracked
    fn add_item(&self, name: &str, price_cents: i64, stock: Option<i32>) -> MenuItem {
        let item = menu_item(name, price_cents, stock.is_some());
        self.store.insert_menu_item(item.clone());
        self.store.link_menu_item(item.id, self.location.id);
        if let Some(quantity) = stock {
            self.store.set_stock(item.id, self.location.id, quantity);
        }
        item
    }

    /// Coffee with a single-select size group and a multi-select extras group
    fn add_coffee(&self) -> MenuItem {
        let mut item = menu_item("Coffee", 250, false);
        item.category = Some("Drinks".to_string());
        item.variation_groups = vec![
            VariationGroup {
                id: Uuid::new_v4(),
                name: "Size".to_string(),
                variation_type: VariationType::SingleSelect,
                display_order: 0,
                options: vec![
                    option("Small", 0),
                    option("Large", 75),
                ],
            },
            VariationGroup {
                id: Uuid::new_v4(),
                name: "Extras".to_string(),
                variation_type: VariationType::MultiSelect,
                display_order: 1,
                options: vec![option("Oat milk", 50), option("Vanilla", 35)],
            },
        ];
        self.store.insert_menu_item(item.clone());
        self.store.link_menu_item(item.id, self.location.id);
        item
    }

    fn registered(&self) -> Customer {
        Customer::Registered {
            user_id: self.user.id,
        }
    }

    fn cart(&self, items: Vec<OrderItemRequest>) -> CreateOrderRequest {
        CreateOrderRequest::new(Some(self.location.id), items)
    }

    fn stock(&self, item: &MenuItem) -> Option<i32> {
        self.store.stock(item.id, self.location.id)
    }
}

fn option(name: &str, modifier_cents: i64) -> VariationOption {
    VariationOption {
        id: Uuid::new_v4(),
        name: name.to_string(),
        price_modifier: Decimal::new(modifier_cents, 2),
        is_default: false,
        display_order: 0,
    }
}

fn guest() -> Customer {
    Customer::Guest {
        email: "visitor@example.org".to_string(),
        first_name: "Robin".to_string(),
        last_name: "Hale".to_string(),
    }
}

// ========================================================================
// Collaborator doubles
// ========================================================================

/// Order store whose inserts report a duplicate order number `n` times
struct CollidingStore {
    inner: Arc<MemoryStore>,
    collisions_left: Arc<AtomicU32>,
}

impl CollidingStore {
    fn new(inner: Arc<MemoryStore>, collisions: u32) -> Self {
        Self {
            inner,
            collisions_left: Arc::new(AtomicU32::new(collisions)),
        }
    }
}

struct CollidingTx {
    inner: Box<dyn OrderTx>,
    collisions_left: Arc<AtomicU32>,
}

#[async_trait]
impl OrderStore for CollidingStore {
    async fn begin(&self) -> Result<Box<dyn OrderTx>, StoreError> {
        Ok(Box::new(CollidingTx {
            inner: self.inner.begin().await?,
            collisions_left: self.collisions_left.clone(),
        }))
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        self.inner.find_order(order_id).await
    }

    async fn find_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        self.inner.find_order_by_payment_intent(payment_intent_id).await
    }

    async fn transition_payment_status(
        &self,
        order_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, StoreError> {
        self.inner.transition_payment_status(order_id, from, to).await
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, StoreError> {
        self.inner.record_webhook_event(event_id, event_type).await
    }
}

#[async_trait]
impl OrderTx for CollidingTx {
    async fn latest_order_number(&mut self, prefix: &str) -> Result<Option<String>, StoreError> {
        self.inner.latest_order_number(prefix).await
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let collide = self
            .collisions_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if collide {
            return Err(StoreError::UniqueViolation("orders_order_number_key".to_string()));
        }
        self.inner.insert_order(order).await
    }

    async fn deduct_inventory(
        &mut self,
        deduction: &InventoryDeduction,
    ) -> Result<InventoryLevel, StoreError> {
        self.inner.deduct_inventory(deduction).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}

/// Order store whose payment-intent lookups fail `n` times before delegating
struct FlakyLookupStore {
    inner: Arc<MemoryStore>,
    failures_left: AtomicU32,
}

impl FlakyLookupStore {
    fn new(inner: Arc<MemoryStore>, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl OrderStore for FlakyLookupStore {
    async fn begin(&self) -> Result<Box<dyn OrderTx>, StoreError> {
        self.inner.begin().await
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<Order>, StoreError> {
        self.inner.find_order(order_id).await
    }

    async fn find_order_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.find_order_by_payment_intent(payment_intent_id).await
    }

    async fn transition_payment_status(
        &self,
        order_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, StoreError> {
        self.inner.transition_payment_status(order_id, from, to).await
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, StoreError> {
        self.inner.record_webhook_event(event_id, event_type).await
    }
}

/// Inventory reader that reports everything in stock
struct AlwaysInStock;

#[async_trait]
impl InventoryReader for AlwaysInStock {
    async fn check_bulk_availability(
        &self,
        requests: &[AvailabilityRequest],
    ) -> Result<Vec<AvailabilityResult>, BoxError> {
        Ok(requests
            .iter()
            .map(|r| AvailabilityResult {
                menu_item_id: r.menu_item_id,
                available: true,
                current_stock: r.quantity,
                requested: r.quantity,
            })
            .collect())
    }
}

fn engine_with(
    fx: &Fixture,
    store: Arc<dyn OrderStore>,
    inventory: Arc<dyn InventoryReader>,
) -> OrderEngine {
    OrderEngine::new(
        Collaborators {
            ordering_window: Arc::new(OrderingWindowStatus::open()),
            catalog: fx.store.clone(),
            inventory,
            payments: fx.payments.clone(),
            store,
        },
        token_service(),
        "usd",
    )
}

/// Wait for the background metadata updates to finish
async fn settle_metadata(payments: &MemoryPayments, calls: usize) {
    let waited = tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while payments.metadata_calls() < calls {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "metadata update did not run");
}

fn assert_no_side_effects(fx: &Fixture) {
    assert_eq!(fx.store.order_count(), 0, "no order should be persisted");
}

fn expect_err<T: std::fmt::Debug>(result: Result<T, OrderError>) -> OrderError {
    match result {
        Ok(v) => panic!("expected an error, got {v:?}"),
        Err(e) => e,
    }
}
