//! `system_settings` reads

use std::collections::HashMap;

use sqlx::PgPool;

use crate::settings::{
    KEY_CLOSED_MESSAGE, KEY_CLOSES_AT, KEY_DAYS, KEY_ENABLED, KEY_OPENS_AT, KEY_TIMEZONE,
};

const ORDERING_KEYS: [&str; 6] = [
    KEY_ENABLED,
    KEY_TIMEZONE,
    KEY_DAYS,
    KEY_OPENS_AT,
    KEY_CLOSES_AT,
    KEY_CLOSED_MESSAGE,
];

/// Ordering window settings as a key → value map (absent keys use defaults)
pub async fn load_ordering_settings(pool: &PgPool) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM system_settings WHERE key = ANY($1)")
            .bind(&ORDERING_KEYS[..])
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}
