//! order-engine: connect, apply migrations and report the ordering window
//!
//! Run on deploy before the API processes start.

use order_engine::orders::traits::OrderingWindowProvider;
use order_engine::utils::logger::init_logger_with_file;
use order_engine::{BoxError, Config};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    init_logger_with_file(
        Some(&config.log_level),
        !config.is_development(),
        config.log_dir.as_deref(),
    );

    tracing::info!("Starting order-engine (env: {})", config.environment);

    let store = order_engine::db::PgStore::connect(&config.database_url, config.db_max_connections)
        .await?;

    let window = store.ordering_window().await?;
    if window.active {
        tracing::info!("Ordering is open");
    } else {
        tracing::info!(
            message = window.message.as_deref().unwrap_or_default(),
            "Ordering is closed"
        );
    }

    Ok(())
}
