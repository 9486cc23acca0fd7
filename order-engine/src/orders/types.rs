//! Request and result types for order creation

use serde::{Deserialize, Serialize};
use shared::models::Order;
use uuid::Uuid;

/// Who is placing the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Customer {
    /// Authenticated staff member; email and name come from the user record
    Registered { user_id: Uuid },
    Guest {
        email: String,
        first_name: String,
        last_name: String,
    },
}

impl Customer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Registered { user_id } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }
}

/// Options chosen from one variation group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationSelection {
    pub group_id: Uuid,
    pub option_ids: Vec<Uuid>,
}

/// One cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub selected_variations: Vec<VariationSelection>,
    #[serde(default)]
    pub customizations: Option<String>,
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl OrderItemRequest {
    pub fn new(menu_item_id: Uuid, quantity: i32) -> Self {
        Self {
            menu_item_id,
            quantity,
            selected_variations: Vec::new(),
            customizations: None,
            special_requests: None,
        }
    }

    pub fn with_variation(mut self, group_id: Uuid, option_ids: Vec<Uuid>) -> Self {
        self.selected_variations.push(VariationSelection {
            group_id,
            option_ids,
        });
        self
    }
}

/// Cart submitted for checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub location_id: Option<Uuid>,
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub delivery_notes: Option<String>,
    /// Order-level note, separate from per-item requests
    #[serde(default)]
    pub special_requests: Option<String>,
}

impl CreateOrderRequest {
    pub fn new(location_id: Option<Uuid>, items: Vec<OrderItemRequest>) -> Self {
        Self {
            location_id,
            items,
            delivery_notes: None,
            special_requests: None,
        }
    }
}

/// Result of a successful checkout
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order: Order,
    /// Client secret of the payment intent, for completing payment client-side
    pub client_secret: String,
    /// Guest access token (guest orders only)
    pub access_token: Option<String>,
}
