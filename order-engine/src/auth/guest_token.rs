//! Guest token service
//!
//! Signed, time-bound HS256 tokens that let a guest look up the one order
//! they placed. The token binds the order id and the guest email; lookups
//! must present both.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Token type marker, so access tokens from elsewhere are rejected
pub const GUEST_TOKEN_TYPE: &str = "guest_order";

/// Guest token configuration
#[derive(Debug, Clone)]
pub struct GuestTokenConfig {
    /// HMAC secret (at least 32 bytes outside development)
    pub secret: String,
    /// Token lifetime in hours
    pub ttl_hours: i64,
    pub issuer: String,
    pub audience: String,
}

impl Default for GuestTokenConfig {
    fn default() -> Self {
        Self {
            secret: "dev-GUEST_TOKEN_SECRET-not-for-production".to_string(),
            ttl_hours: 168,
            issuer: "order-engine".to_string(),
            audience: "guest-orders".to_string(),
        }
    }
}

/// Claims stored in a guest token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestClaims {
    /// Order ID
    pub sub: String,
    /// Guest email, lowercased
    pub email: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

impl GuestClaims {
    pub fn order_id(&self) -> Result<Uuid, GuestTokenError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| GuestTokenError::InvalidToken("subject is not an order id".to_string()))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GuestTokenError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

#[derive(Clone)]
pub struct GuestTokenService {
    config: GuestTokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for GuestTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestTokenService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .field("ttl_hours", &self.config.ttl_hours)
            .finish()
    }
}

impl GuestTokenService {
    pub fn new(config: GuestTokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a token for a guest order
    pub fn issue(&self, order_id: Uuid, email: &str) -> Result<String, GuestTokenError> {
        self.issue_with_ttl(order_id, email, Duration::hours(self.config.ttl_hours))
    }

    pub(crate) fn issue_with_ttl(
        &self,
        order_id: Uuid,
        email: &str,
        ttl: Duration,
    ) -> Result<String, GuestTokenError> {
        let now = Utc::now();
        let claims = GuestClaims {
            sub: order_id.to_string(),
            email: email.trim().to_lowercase(),
            token_type: GUEST_TOKEN_TYPE.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| GuestTokenError::GenerationFailed(e.to_string()))
    }

    /// Verify signature, expiry, issuer, audience and token type
    pub fn verify(&self, token: &str) -> Result<GuestClaims, GuestTokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data =
            decode::<GuestClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => GuestTokenError::Expired,
                    ErrorKind::InvalidSignature => GuestTokenError::InvalidSignature,
                    _ => GuestTokenError::InvalidToken(e.to_string()),
                }
            })?;

        if token_data.claims.token_type != GUEST_TOKEN_TYPE {
            return Err(GuestTokenError::InvalidToken(format!(
                "unexpected token type {}",
                token_data.claims.token_type
            )));
        }

        Ok(token_data.claims)
    }
}
