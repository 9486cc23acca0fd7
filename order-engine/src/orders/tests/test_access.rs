use super::*;
use crate::auth::GuestTokenError;

async fn guest_order(fx: &Fixture) -> CreatedOrder {
    let wrap = fx.add_item("Veggie Wrap", 595, None);
    fx.engine
        .create_order(guest(), fx.cart(vec![OrderItemRequest::new(wrap.id, 1)]))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_guest_lookup_with_token_and_email() {
    let fx = fixture();
    let created = guest_order(&fx).await;
    let token = created.access_token.as_deref().unwrap();

    let order = fx
        .engine
        .find_guest_order(token, "  Visitor@Example.ORG ")
        .await
        .unwrap();
    assert_eq!(order.id, created.order.id);
    assert_eq!(order.order_number, created.order.order_number);
}

#[tokio::test]
async fn test_guest_lookup_rejects_other_email() {
    let fx = fixture();
    let created = guest_order(&fx).await;
    let token = created.access_token.as_deref().unwrap();

    let err = expect_err(fx.engine.find_guest_order(token, "someone@example.org").await);
    assert!(matches!(err, OrderError::GuestAccessDenied));
}

#[tokio::test]
async fn test_guest_lookup_rejects_expired_token() {
    let fx = fixture();
    let created = guest_order(&fx).await;
    let expired = token_service()
        .issue_with_ttl(
            created.order.id,
            "visitor@example.org",
            chrono::Duration::hours(-1),
        )
        .unwrap();

    let err = expect_err(
        fx.engine
            .find_guest_order(&expired, "visitor@example.org")
            .await,
    );
    assert!(matches!(err, OrderError::Token(GuestTokenError::Expired)));
}

#[tokio::test]
async fn test_guest_lookup_rejects_garbage_token() {
    let fx = fixture();
    let err = expect_err(
        fx.engine
            .find_guest_order("not.a.token", "visitor@example.org")
            .await,
    );
    assert!(matches!(err, OrderError::Token(_)));
}

#[tokio::test]
async fn test_token_for_unknown_order() {
    let fx = fixture();
    let order_id = Uuid::new_v4();
    let token = token_service().issue(order_id, "visitor@example.org").unwrap();

    let err = expect_err(fx.engine.find_guest_order(&token, "visitor@example.org").await);
    assert!(matches!(err, OrderError::OrderNotFound(id) if id == order_id));
}

#[tokio::test]
async fn test_guest_token_cannot_open_registered_order() {
    let fx = fixture();
    let bagel = fx.add_item("Bagel", 225, None);
    let created = fx
        .engine
        .create_order(fx.registered(), fx.cart(vec![OrderItemRequest::new(bagel.id, 1)]))
        .await
        .unwrap();
    assert!(created.access_token.is_none());

    // Correctly signed token naming a registered user's order
    let token = token_service().issue(created.order.id, &fx.user.email).unwrap();
    let err = expect_err(fx.engine.find_guest_order(&token, &fx.user.email).await);
    assert!(matches!(err, OrderError::GuestAccessDenied));
}

#[tokio::test]
async fn test_user_lookup_is_owner_only() {
    let fx = fixture();
    let bagel = fx.add_item("Bagel", 225, None);
    let created = fx
        .engine
        .create_order(fx.registered(), fx.cart(vec![OrderItemRequest::new(bagel.id, 2)]))
        .await
        .unwrap();

    let order = fx
        .engine
        .find_user_order(created.order.id, fx.user.id)
        .await
        .unwrap();
    assert_eq!(order.total_amount, Decimal::new(450, 2));

    let err = expect_err(
        fx.engine
            .find_user_order(created.order.id, Uuid::new_v4())
            .await,
    );
    assert!(matches!(err, OrderError::OrderNotFound(_)));
}
