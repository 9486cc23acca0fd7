//! Stripe integration via REST API (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::BoxError;
use crate::orders::traits::{
    PaymentIntent, PaymentIntentRequest, PaymentIntentStatus, PaymentProvider,
};

/// Maximum age of a webhook event (seconds)
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Stripe client for payment intents
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base)
    }
}

/// Turn a Stripe response into JSON, or an error carrying Stripe's message
async fn read_response(
    op: &str,
    resp: reqwest::Response,
) -> Result<serde_json::Value, BoxError> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;
    if !status.is_success() {
        let message = body["error"]["message"].as_str().unwrap_or("unknown error");
        return Err(format!("Stripe {op} failed ({status}): {message}").into());
    }
    Ok(body)
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, BoxError> {
        let amount = request.amount.to_string();
        let resp = self
            .http
            .post(self.url("payment_intents"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", request.currency.as_str()),
                ("receipt_email", request.customer_email.as_str()),
                ("automatic_payment_methods[enabled]", "true"),
                ("metadata[customer_email]", request.customer_email.as_str()),
            ])
            .send()
            .await?;
        let body = read_response("create_payment_intent", resp).await?;

        let id = body["id"]
            .as_str()
            .ok_or_else(|| format!("Stripe create_payment_intent returned no id: {body}"))?;
        let client_secret = body["client_secret"]
            .as_str()
            .ok_or("Stripe create_payment_intent returned no client_secret")?;

        Ok(PaymentIntent {
            id: id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    async fn update_payment_intent_metadata(
        &self,
        payment_intent_id: &str,
        order_id: Uuid,
    ) -> Result<(), BoxError> {
        let order_id = order_id.to_string();
        let resp = self
            .http
            .post(self.url(&format!("payment_intents/{payment_intent_id}")))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("metadata[order_id]", order_id.as_str())])
            .send()
            .await?;
        read_response("update_payment_intent", resp).await?;
        Ok(())
    }

    async fn retrieve_payment_intent_status(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntentStatus, BoxError> {
        let resp = self
            .http
            .get(self.url(&format!("payment_intents/{payment_intent_id}")))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        let body = read_response("retrieve_payment_intent", resp).await?;

        body["status"]
            .as_str()
            .map(PaymentIntentStatus::parse)
            .ok_or_else(|| format!("Stripe payment intent has no status: {body}").into())
    }
}

/// Verify a `Stripe-Signature` header against the raw payload
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

/// Same as [`verify_webhook_signature`] with an explicit current time
pub fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe sends one v1 per active secret during rotation
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}
