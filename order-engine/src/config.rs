//! Order engine configuration

use crate::auth::GuestTokenConfig;
use crate::error::BoxError;

const DEVELOPMENT: &str = "development";
const MIN_SECRET_LEN: usize = 32;

/// Order engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Environment: development | staging | production
    pub environment: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe REST base URL (overridable for stripe-mock)
    pub stripe_api_base: String,
    /// ISO currency code for payment intents
    pub payment_currency: String,
    /// HMAC secret for guest order tokens
    pub guest_token_secret: String,
    pub guest_token_ttl_hours: i64,
    pub guest_token_issuer: String,
    pub guest_token_audience: String,
    pub db_max_connections: u32,
    pub log_level: String,
    /// Daily rolling log files go here when set
    pub log_dir: Option<String>,
}

impl Config {
    /// Require a secret: must be set and non-empty outside development
    fn require_secret(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        environment: &str,
    ) -> Result<String, BoxError> {
        let val = match lookup(name) {
            Some(v) => v,
            None => {
                if environment != DEVELOPMENT {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != DEVELOPMENT {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Optional numeric variable; present but unparsable is an error
    fn parse_or<T: std::str::FromStr>(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        default: T,
    ) -> Result<T, BoxError> {
        match lookup(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| format!("{name} has invalid value {raw:?}").into()),
            None => Ok(default),
        }
    }

    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, BoxError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| DEVELOPMENT.into());

        let guest_token_secret = Self::require_secret(&lookup, "GUEST_TOKEN_SECRET", &environment)?;
        if environment != DEVELOPMENT && guest_token_secret.len() < MIN_SECRET_LEN {
            return Err(
                format!("GUEST_TOKEN_SECRET must be at least {MIN_SECRET_LEN} bytes").into(),
            );
        }

        let guest_token_ttl_hours = Self::parse_or(&lookup, "GUEST_TOKEN_TTL_HOURS", 168i64)?;
        if guest_token_ttl_hours <= 0 {
            return Err("GUEST_TOKEN_TTL_HOURS must be positive".into());
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").ok_or("DATABASE_URL must be set")?,
            stripe_secret_key: Self::require_secret(&lookup, "STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret(
                &lookup,
                "STRIPE_WEBHOOK_SECRET",
                &environment,
            )?,
            stripe_api_base: lookup("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".into()),
            payment_currency: lookup("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "usd".into()),
            guest_token_secret,
            guest_token_ttl_hours,
            guest_token_issuer: lookup("GUEST_TOKEN_ISSUER")
                .unwrap_or_else(|| "order-engine".into()),
            guest_token_audience: lookup("GUEST_TOKEN_AUDIENCE")
                .unwrap_or_else(|| "guest-orders".into()),
            db_max_connections: Self::parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32)?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: lookup("LOG_DIR").filter(|s| !s.is_empty()),
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT
    }

    pub fn guest_token_config(&self) -> GuestTokenConfig {
        GuestTokenConfig {
            secret: self.guest_token_secret.clone(),
            ttl_hours: self.guest_token_ttl_hours,
            issuer: self.guest_token_issuer.clone(),
            audience: self.guest_token_audience.clone(),
        }
    }
}
