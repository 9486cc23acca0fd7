//! In-memory payment provider
//!
//! Records every call and can be told to fail intent creation or metadata
//! updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::BoxError;
use crate::orders::traits::{
    PaymentIntent, PaymentIntentRequest, PaymentIntentStatus, PaymentProvider,
};

/// A payment intent created through [`MemoryPayments`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub customer_email: String,
    pub status: PaymentIntentStatus,
    pub order_id: Option<Uuid>,
}

#[derive(Default)]
pub struct MemoryPayments {
    intents: Mutex<HashMap<String, RecordedIntent>>,
    fail_create: AtomicBool,
    fail_metadata: AtomicBool,
    metadata_calls: AtomicUsize,
}

impl MemoryPayments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    /// Set the provider-side status, as if the customer had paid
    pub fn set_status(&self, payment_intent_id: &str, status: PaymentIntentStatus) {
        if let Some(intent) = self.intents.lock().get_mut(payment_intent_id) {
            intent.status = status;
        }
    }

    pub fn intent(&self, payment_intent_id: &str) -> Option<RecordedIntent> {
        self.intents.lock().get(payment_intent_id).cloned()
    }

    pub fn intent_count(&self) -> usize {
        self.intents.lock().len()
    }

    /// Metadata updates that have finished, successfully or not
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProvider for MemoryPayments {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, BoxError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err("payment provider unavailable".into());
        }
        let id = format!("pi_{}", Uuid::new_v4().simple());
        let client_secret = format!("{id}_secret_{}", Uuid::new_v4().simple());
        self.intents.lock().insert(
            id.clone(),
            RecordedIntent {
                id: id.clone(),
                amount: request.amount,
                currency: request.currency.clone(),
                customer_email: request.customer_email.clone(),
                status: PaymentIntentStatus::RequiresPaymentMethod,
                order_id: None,
            },
        );
        Ok(PaymentIntent { id, client_secret })
    }

    async fn update_payment_intent_metadata(
        &self,
        payment_intent_id: &str,
        order_id: Uuid,
    ) -> Result<(), BoxError> {
        let result: Result<(), BoxError> = if self.fail_metadata.load(Ordering::SeqCst) {
            Err("payment provider unavailable".into())
        } else {
            match self.intents.lock().get_mut(payment_intent_id) {
                Some(intent) => {
                    intent.order_id = Some(order_id);
                    Ok(())
                }
                None => Err(format!("No such payment_intent: {payment_intent_id}").into()),
            }
        };
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn retrieve_payment_intent_status(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntentStatus, BoxError> {
        self.intents
            .lock()
            .get(payment_intent_id)
            .map(|i| i.status.clone())
            .ok_or_else(|| format!("No such payment_intent: {payment_intent_id}").into())
    }
}
