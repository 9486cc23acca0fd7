//! Location Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pickup/delivery location (cafeteria counter, ward kitchen, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
}
