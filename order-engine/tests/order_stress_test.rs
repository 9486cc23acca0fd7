//! Concurrent checkout stress test
//!
//! Many customers order at once against shared, scarce stock. Afterwards:
//! - every order number is distinct and carries today's prefix
//! - stock never went negative and matches the committed orders exactly
//! - each order total equals the sum of its lines

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use order_engine::auth::{GuestTokenConfig, GuestTokenService};
use order_engine::memory::{MemoryPayments, MemoryStore};
use order_engine::orders::number::{day_prefix, parse_sequence};
use order_engine::orders::{Collaborators, OrderItemRequest};
use order_engine::settings::OrderingWindowStatus;
use order_engine::{CreateOrderRequest, Customer, OrderEngine};
use rand::Rng;
use rust_decimal::Decimal;
use shared::models::{Location, MenuItem};
use uuid::Uuid;

const ORDER_COUNT: usize = 50;
const TRACKED_STOCK: i32 = 20;

fn menu() -> Vec<MenuItem> {
    const ITEMS: &[(&str, i64, bool)] = &[
        ("Grilled Cheese", 595, true),
        ("Tomato Soup", 375, true),
        ("Fruit Cup", 299, false),
        ("Iced Tea", 215, false),
        ("Brownie", 250, true),
    ];
    ITEMS
        .iter()
        .map(|(name, cents, tracked)| MenuItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            category: None,
            image_url: None,
            price: Decimal::new(*cents, 2),
            is_active: true,
            track_inventory: *tracked,
            variation_groups: vec![],
        })
        .collect()
}

fn random_cart(rng: &mut impl Rng, menu: &[MenuItem], location_id: Uuid) -> CreateOrderRequest {
    let lines = rng.gen_range(1..=3);
    let items = (0..lines)
        .map(|_| {
            let item = &menu[rng.gen_range(0..menu.len())];
            OrderItemRequest::new(item.id, rng.gen_range(1..=2))
        })
        .collect();
    CreateOrderRequest::new(Some(location_id), items)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_checkout_stress() {
    let store = Arc::new(MemoryStore::new());
    let payments = Arc::new(MemoryPayments::new());
    let location = Location {
        id: Uuid::new_v4(),
        name: "ED Kiosk".to_string(),
        address: None,
        phone: None,
        is_active: true,
    };
    store.insert_location(location.clone());

    let menu = menu();
    for item in &menu {
        store.insert_menu_item(item.clone());
        store.link_menu_item(item.id, location.id);
        if item.track_inventory {
            store.set_stock(item.id, location.id, TRACKED_STOCK);
        }
    }

    let engine = OrderEngine::new(
        Collaborators {
            ordering_window: Arc::new(OrderingWindowStatus::open()),
            catalog: store.clone(),
            inventory: store.clone(),
            payments: payments.clone(),
            store: store.clone(),
        },
        GuestTokenService::new(GuestTokenConfig {
            secret: "stress-test-secret-with-at-least-32-bytes".to_string(),
            ..Default::default()
        }),
        "usd",
    );

    let succeeded = Arc::new(AtomicUsize::new(0));
    let out_of_stock = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..ORDER_COUNT)
        .map(|idx| {
            let mut rng = rand::thread_rng();
            let request = random_cart(&mut rng, &menu, location.id);
            let customer = Customer::Guest {
                email: format!("visitor{idx}@example.org"),
                first_name: "Visitor".to_string(),
                last_name: format!("No. {idx}"),
            };
            let engine = engine.clone();
            let succeeded = succeeded.clone();
            let out_of_stock = out_of_stock.clone();
            tokio::spawn(async move {
                match engine.create_order(customer, request).await {
                    Ok(_) => {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) if e.is_stock_shortage() => {
                        out_of_stock.fetch_add(1, Ordering::SeqCst);
                    }
                    // Three collisions in a row is possible under this much contention
                    Err(order_engine::OrderError::OrderNumberCollisionExhausted { .. }) => {}
                    Err(e) => panic!("order {idx} failed: {e}"),
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let orders = store.orders();
    assert_eq!(orders.len(), succeeded.load(Ordering::SeqCst));
    assert!(succeeded.load(Ordering::SeqCst) > 0);
    println!(
        "{} succeeded, {} out of stock",
        succeeded.load(Ordering::SeqCst),
        out_of_stock.load(Ordering::SeqCst)
    );

    // Distinct numbers with today's prefix
    let today = chrono::Utc::now().date_naive();
    let prefix = day_prefix(today);
    let mut sequences = HashSet::new();
    for order in &orders {
        assert!(order.order_number.starts_with(&prefix));
        let seq = parse_sequence(&order.order_number, today).unwrap();
        assert!(sequences.insert(seq), "duplicate {}", order.order_number);
    }

    // Stock accounts for exactly the committed quantities
    let mut sold: HashMap<Uuid, i32> = HashMap::new();
    for order in &orders {
        for line in &order.items {
            if let Some(id) = line.menu_item_id {
                *sold.entry(id).or_default() += line.quantity;
            }
        }
        assert_eq!(order.total_amount, order.items_total());
    }
    for item in menu.iter().filter(|m| m.track_inventory) {
        let remaining = store.stock(item.id, location.id).unwrap();
        let taken = sold.get(&item.id).copied().unwrap_or(0);
        assert!(remaining >= 0);
        assert_eq!(remaining + taken, TRACKED_STOCK, "{}", item.name);
        assert_eq!(
            store.inventory_history(item.id, location.id).len(),
            orders
                .iter()
                .filter(|o| o.items.iter().any(|l| l.menu_item_id == Some(item.id)))
                .count()
        );
    }
}
