//! Menu Item Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Selection mode of a variation group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "variation_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum VariationType {
    #[default]
    SingleSelect,
    MultiSelect,
}

/// Variation option (e.g. "Large", "Oat milk")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariationOption {
    pub id: Uuid,
    pub name: String,
    pub price_modifier: Decimal,
    pub is_default: bool,
    pub display_order: i32,
}

/// Variation group (e.g. "Size", "Extras")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariationGroup {
    pub id: Uuid,
    pub name: String,
    pub variation_type: VariationType,
    pub display_order: i32,
    pub options: Vec<VariationOption>,
}

impl VariationGroup {
    pub fn option(&self, option_id: Uuid) -> Option<&VariationOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// Menu item as read from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    /// Base price in currency unit
    pub price: Decimal,
    pub is_active: bool,
    /// Only tracked items are checked against and deducted from inventory
    pub track_inventory: bool,
    pub variation_groups: Vec<VariationGroup>,
}

impl MenuItem {
    pub fn variation_group(&self, group_id: Uuid) -> Option<&VariationGroup> {
        self.variation_groups.iter().find(|g| g.id == group_id)
    }
}
