//! Order lookup for the owning customer

use shared::models::Order;
use uuid::Uuid;

use super::engine::OrderEngine;
use crate::error::{OrderError, OrderResult};

impl OrderEngine {
    /// Guest lookup: the token must be valid and issued for this email
    pub async fn find_guest_order(&self, token: &str, email: &str) -> OrderResult<Order> {
        let claims = self.tokens.verify(token)?;
        let order_id = claims.order_id()?;
        let email = email.trim();

        if !claims.email.eq_ignore_ascii_case(email) {
            tracing::warn!(%order_id, "Guest order lookup with mismatched email");
            return Err(OrderError::GuestAccessDenied);
        }

        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        match order.owner.guest_email() {
            Some(owner_email) if owner_email.eq_ignore_ascii_case(email) => Ok(order),
            _ => Err(OrderError::GuestAccessDenied),
        }
    }

    /// Registered lookup; other users' orders are reported as not found
    pub async fn find_user_order(&self, order_id: Uuid, user_id: Uuid) -> OrderResult<Order> {
        self.store
            .find_order(order_id)
            .await?
            .filter(|order| order.owner.user_id() == Some(user_id))
            .ok_or(OrderError::OrderNotFound(order_id))
    }
}
