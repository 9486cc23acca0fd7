//! Shared types for the cafeteria ordering platform
//!
//! Domain models and the unified error system used by the order engine and
//! by whatever HTTP surface sits in front of it.

pub mod error;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};
