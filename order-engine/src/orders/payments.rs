//! Payment status transitions
//!
//! `PENDING → COMPLETED | FAILED`, `COMPLETED → REFUNDED`. Every transition
//! is a conditional update on the current status, so client confirmation
//! and webhooks can race without double-applying.

use std::sync::Arc;

use serde_json::Value;
use shared::models::PaymentStatus;
use uuid::Uuid;

use super::traits::{OrderStore, PaymentIntentStatus, PaymentProvider};
use crate::error::{OrderError, OrderResult};
use crate::stripe::verify_webhook_signature;

/// Result of a client-side payment confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentConfirmation {
    Completed,
    /// Already completed (e.g. by the webhook); nothing changed
    AlreadyCompleted,
}

/// Result of processing one webhook event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied { order_id: Uuid, status: PaymentStatus },
    /// Order was not in the expected status
    NoChange { order_id: Uuid },
    /// Event id seen before
    Duplicate,
    /// Event type not handled or no matching order
    Ignored,
}

#[derive(Clone)]
pub struct PaymentEvents {
    store: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentProvider>,
    webhook_secret: String,
}

impl PaymentEvents {
    pub fn new(
        store: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentProvider>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            store,
            payments,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Client reports payment done; trust only the provider's status
    pub async fn confirm_payment(&self, order_id: Uuid) -> OrderResult<PaymentConfirmation> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        match order.payment_status {
            PaymentStatus::Completed => return Ok(PaymentConfirmation::AlreadyCompleted),
            PaymentStatus::Failed | PaymentStatus::Refunded => {
                return Err(OrderError::InvalidPaymentTransition {
                    from: order.payment_status,
                    to: PaymentStatus::Completed,
                });
            }
            PaymentStatus::Pending => {}
        }

        let payment_intent_id =
            order
                .payment_intent_id
                .as_deref()
                .ok_or_else(|| OrderError::PaymentNotSucceeded {
                    status: "no_payment_intent".to_string(),
                })?;
        let status = self
            .payments
            .retrieve_payment_intent_status(payment_intent_id)
            .await
            .map_err(OrderError::Collaborator)?;
        if status != PaymentIntentStatus::Succeeded {
            return Err(OrderError::PaymentNotSucceeded {
                status: status.as_str().to_string(),
            });
        }

        if self
            .store
            .transition_payment_status(order_id, PaymentStatus::Pending, PaymentStatus::Completed)
            .await?
        {
            tracing::info!(%order_id, "Payment confirmed");
            return Ok(PaymentConfirmation::Completed);
        }

        // Lost a race; see what won
        let current = self
            .store
            .find_order(order_id)
            .await?
            .map(|o| o.payment_status)
            .ok_or(OrderError::OrderNotFound(order_id))?;
        match current {
            PaymentStatus::Completed => Ok(PaymentConfirmation::AlreadyCompleted),
            from => Err(OrderError::InvalidPaymentTransition {
                from,
                to: PaymentStatus::Completed,
            }),
        }
    }

    /// Verify and process a raw webhook delivery
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> OrderResult<WebhookOutcome> {
        if let Err(e) = verify_webhook_signature(payload, signature, &self.webhook_secret) {
            tracing::warn!(error = e, "Webhook signature verification failed");
            return Err(OrderError::InvalidWebhook(e.to_string()));
        }

        let event: Value = serde_json::from_slice(payload)
            .map_err(|e| OrderError::InvalidWebhook(format!("malformed payload: {e}")))?;
        self.process_event(&event).await
    }

    /// Process an already-verified event
    pub async fn process_event(&self, event: &Value) -> OrderResult<WebhookOutcome> {
        let event_id = event["id"]
            .as_str()
            .ok_or_else(|| OrderError::InvalidWebhook("event missing id".to_string()))?;
        let event_type = event["type"].as_str().unwrap_or("");

        let (from, to) = match event_type {
            "payment_intent.succeeded" => (PaymentStatus::Pending, PaymentStatus::Completed),
            "payment_intent.payment_failed" => (PaymentStatus::Pending, PaymentStatus::Failed),
            "charge.refunded" => (PaymentStatus::Completed, PaymentStatus::Refunded),
            _ => {
                tracing::debug!(event_type, "Ignoring webhook event");
                return Ok(WebhookOutcome::Ignored);
            }
        };
        tracing::info!(event_id, event_type, "Received payment webhook");

        let object = &event["data"]["object"];
        let payment_intent_id = match event_type {
            "charge.refunded" => object["payment_intent"].as_str(),
            _ => object["id"].as_str(),
        };
        let Some(payment_intent_id) = payment_intent_id else {
            tracing::warn!(event_id, "Webhook event has no payment intent");
            return Ok(WebhookOutcome::Ignored);
        };

        let Some(order) = self
            .store
            .find_order_by_payment_intent(payment_intent_id)
            .await?
        else {
            tracing::warn!(event_id, payment_intent_id, "No order for payment intent");
            return Ok(WebhookOutcome::Ignored);
        };

        // Record after the transition: a failed delivery must stay retryable
        let applied = self
            .store
            .transition_payment_status(order.id, from, to)
            .await?;
        let first_delivery = self.store.record_webhook_event(event_id, event_type).await?;

        if applied {
            tracing::info!(order_id = %order.id, status = to.as_str(), "Payment status updated");
            Ok(WebhookOutcome::Applied {
                order_id: order.id,
                status: to,
            })
        } else if !first_delivery {
            tracing::info!(event_id, "Duplicate webhook event, skipping");
            Ok(WebhookOutcome::Duplicate)
        } else {
            tracing::info!(
                order_id = %order.id,
                current = order.payment_status.as_str(),
                target = to.as_str(),
                "Payment status unchanged"
            );
            Ok(WebhookOutcome::NoChange { order_id: order.id })
        }
    }
}
