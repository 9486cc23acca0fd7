//! Order transaction engine for the cafeteria ordering platform
//!
//! Turns a validated cart into a persisted, payable order:
//! ordering window → catalog and location checks → inventory check →
//! pricing → numbered order + payment intent + inventory deductions in one
//! transaction.
//!
//! Collaborators (catalog, inventory, payments, persistence) sit behind the
//! traits in [`orders::traits`]. [`db::PgStore`] is the PostgreSQL backend and
//! [`memory`] holds in-process implementations for tests and local runs.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod money;
pub mod orders;
pub mod pricing;
pub mod settings;
pub mod state;
pub mod stripe;
pub mod utils;

// Re-exports
pub use config::Config;
pub use error::{BoxError, OrderError, StoreError};
pub use orders::{CreateOrderRequest, CreatedOrder, Customer, OrderEngine, PaymentEvents};
pub use state::AppState;
