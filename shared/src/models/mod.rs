//! Data models
//!
//! Shared between the order engine and API consumers.
//! Flat DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are UUIDs.

pub mod inventory;
pub mod location;
pub mod menu_item;
pub mod order;
pub mod user;

// Re-exports
pub use inventory::*;
pub use location::*;
pub use menu_item::*;
pub use order::*;
pub use user::*;
