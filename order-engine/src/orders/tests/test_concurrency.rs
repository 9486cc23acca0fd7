use std::collections::HashSet;

use super::*;
use futures::future::join_all;

// ========================================================================
// Order number retry
// ========================================================================

#[tokio::test]
async fn test_collision_retries_and_reuses_intent() {
    let fx = fixture();
    let tea = fx.add_item("Tea", 150, None);
    let store = Arc::new(CollidingStore::new(fx.store.clone(), 2));
    let engine = engine_with(&fx, store, fx.store.clone());

    let created = engine
        .create_order(fx.registered(), fx.cart(vec![OrderItemRequest::new(tea.id, 1)]))
        .await
        .unwrap();

    assert_eq!(fx.store.order_count(), 1);
    // One intent for all three attempts
    assert_eq!(fx.payments.intent_count(), 1);
    settle_metadata(&fx.payments, 1).await;
    let intent_id = created.order.payment_intent_id.as_deref().unwrap();
    assert_eq!(fx.payments.intent(intent_id).unwrap().order_id, Some(created.order.id));
}

#[tokio::test]
async fn test_collision_exhaustion() {
    let fx = fixture();
    let soup = fx.add_item("Lentil Soup", 450, Some(6));
    let store = Arc::new(CollidingStore::new(fx.store.clone(), MAX_ORDER_NUMBER_ATTEMPTS));
    let engine = engine_with(&fx, store, fx.store.clone());

    let err = expect_err(
        engine
            .create_order(fx.registered(), fx.cart(vec![OrderItemRequest::new(soup.id, 2)]))
            .await,
    );
    assert!(matches!(
        err,
        OrderError::OrderNumberCollisionExhausted { attempts } if attempts == MAX_ORDER_NUMBER_ATTEMPTS
    ));
    assert_no_side_effects(&fx);
    assert_eq!(fx.stock(&soup), Some(6));
}

// ========================================================================
// Atomicity
// ========================================================================

#[tokio::test]
async fn test_failed_deduction_rolls_back_everything() {
    let fx = fixture();
    // Sorted so the plentiful item is deducted first
    let mut items = [
        fx.add_item("Chicken Wrap", 690, Some(10)),
        fx.add_item("Fruit Cup", 300, Some(0)),
    ];
    items.sort_by_key(|m| m.id);
    fx.store.set_stock(items[0].id, fx.location.id, 10);
    fx.store.set_stock(items[1].id, fx.location.id, 0);

    // Pre-check passes, guarded deduction of the second item fails
    let engine = engine_with(&fx, fx.store.clone(), Arc::new(AlwaysInStock));
    let err = expect_err(
        engine
            .create_order(
                fx.registered(),
                fx.cart(vec![
                    OrderItemRequest::new(items[0].id, 2),
                    OrderItemRequest::new(items[1].id, 1),
                ]),
            )
            .await,
    );

    match err {
        OrderError::InventoryDeductionConflict { shortage } => {
            assert_eq!(shortage.menu_item_id, items[1].id);
            assert_eq!(shortage.current_stock, 0);
            assert_eq!(shortage.requested, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_no_side_effects(&fx);
    assert_eq!(fx.stock(&items[0]), Some(10));
    assert!(fx.store.inventory_history(items[0].id, fx.location.id).is_empty());
}

// ========================================================================
// Concurrent checkouts
// ========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_orders_get_distinct_numbers() {
    let fx = fixture();
    let tea = fx.add_item("Tea", 150, None);

    let tasks = (0..2).map(|_| {
        let engine = fx.engine.clone();
        let request = fx.cart(vec![OrderItemRequest::new(tea.id, 1)]);
        let customer = fx.registered();
        tokio::spawn(async move { engine.create_order(customer, request).await })
    });
    let results = join_all(tasks).await;

    let numbers: HashSet<String> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap().order.order_number)
        .collect();
    assert_eq!(numbers.len(), 2);
    assert_eq!(fx.store.order_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fifty_simultaneous_orders_number_consecutively() {
    const ORDERS: usize = 50;
    let fx = fixture();
    let bagel = fx.add_item("Bagel", 225, None);

    let tasks = (0..ORDERS).map(|i| {
        let engine = fx.engine.clone();
        let request = fx.cart(vec![OrderItemRequest::new(bagel.id, 1)]);
        let customer = if i % 2 == 0 { fx.registered() } else { guest() };
        tokio::spawn(async move { engine.create_order(customer, request).await })
    });
    let results = join_all(tasks).await;

    let mut sequences: Vec<u64> = results
        .into_iter()
        .map(|r| {
            let order = r.unwrap().unwrap().order;
            number::parse_sequence(&order.order_number, order.order_date).unwrap()
        })
        .collect();
    sequences.sort_unstable();

    // Nothing rolled back, so no gaps either
    let expected: Vec<u64> = (1..=ORDERS as u64).collect();
    assert_eq!(sequences, expected);
    assert_eq!(fx.store.order_count(), ORDERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_sold_once() {
    let fx = fixture();
    let cake = fx.add_item("Carrot Cake", 420, Some(1));

    let tasks = (0..2).map(|i| {
        let engine = fx.engine.clone();
        let request = fx.cart(vec![OrderItemRequest::new(cake.id, 1)]);
        let customer = if i == 0 { fx.registered() } else { guest() };
        tokio::spawn(async move { engine.create_order(customer, request).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(failure.is_stock_shortage(), "unexpected error: {failure:?}");

    assert_eq!(fx.stock(&cake), Some(0));
    assert_eq!(fx.store.order_count(), 1);
    assert_eq!(fx.store.inventory_history(cake.id, fx.location.id).len(), 1);
}
