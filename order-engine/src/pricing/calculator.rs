use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use shared::models::{
    FulfillmentStatus, MenuItem, OrderItem, SelectedVariation, VariationType,
};
use thiserror::Error;
use uuid::Uuid;

use crate::money::round_money;
use crate::orders::OrderItemRequest;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Menu item {0} is not in the priced catalog")]
    UnknownMenuItem(Uuid),

    #[error("{item}: variation group {group_id} does not belong to this item")]
    UnknownGroup { item: String, group_id: Uuid },

    #[error("{item}: option {option_id} does not belong to group {group}")]
    UnknownOption {
        item: String,
        group: String,
        option_id: Uuid,
    },

    #[error("{item}: group {group} allows a single option")]
    TooManyOptions { item: String, group: String },

    #[error("{item}: option {option_id} selected more than once")]
    DuplicateOption { item: String, option_id: Uuid },

    #[error("{item}: group {group} selected more than once")]
    DuplicateGroup { item: String, group: String },
}

/// Priced items plus the rounded order total
#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
}

/// Price one cart line: base price plus every selected option's modifier
pub fn price_item(menu_item: &MenuItem, request: &OrderItemRequest) -> Result<OrderItem, PricingError> {
    let mut selected = Vec::new();
    let mut seen_groups = HashSet::new();
    let mut seen_options = HashSet::new();

    for selection in &request.selected_variations {
        let group = menu_item
            .variation_group(selection.group_id)
            .ok_or_else(|| PricingError::UnknownGroup {
                item: menu_item.name.clone(),
                group_id: selection.group_id,
            })?;

        if !seen_groups.insert(group.id) {
            return Err(PricingError::DuplicateGroup {
                item: menu_item.name.clone(),
                group: group.name.clone(),
            });
        }
        if group.variation_type == VariationType::SingleSelect && selection.option_ids.len() > 1 {
            return Err(PricingError::TooManyOptions {
                item: menu_item.name.clone(),
                group: group.name.clone(),
            });
        }

        for &option_id in &selection.option_ids {
            if !seen_options.insert(option_id) {
                return Err(PricingError::DuplicateOption {
                    item: menu_item.name.clone(),
                    option_id,
                });
            }
            let option = group.option(option_id).ok_or_else(|| PricingError::UnknownOption {
                item: menu_item.name.clone(),
                group: group.name.clone(),
                option_id,
            })?;
            selected.push(SelectedVariation {
                group_id: group.id,
                group_name: group.name.clone(),
                option_id: option.id,
                option_name: option.name.clone(),
                price_modifier: option.price_modifier,
            });
        }
    }

    let modifiers: Decimal = selected.iter().map(|v| v.price_modifier).sum();
    let price_at_purchase = menu_item.price + modifiers;

    Ok(OrderItem {
        id: Uuid::new_v4(),
        menu_item_id: Some(menu_item.id),
        quantity: request.quantity,
        price_at_purchase,
        selected_variations: selected,
        customizations: request.customizations.clone(),
        special_requests: request.special_requests.clone(),
        fulfillment_status: FulfillmentStatus::Placed,
        item_name: menu_item.name.clone(),
        item_description: menu_item.description.clone(),
        item_category: menu_item.category.clone(),
        item_image_url: menu_item.image_url.clone(),
        item_base_price: menu_item.price,
    })
}

/// Price every line; the total is summed exactly and rounded once
pub fn price_cart(
    menu_items: &HashMap<Uuid, MenuItem>,
    requests: &[OrderItemRequest],
) -> Result<PricedCart, PricingError> {
    let items = requests
        .iter()
        .map(|request| {
            let menu_item = menu_items
                .get(&request.menu_item_id)
                .ok_or(PricingError::UnknownMenuItem(request.menu_item_id))?;
            price_item(menu_item, request)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total: Decimal = items.iter().map(OrderItem::subtotal).sum();

    Ok(PricedCart {
        items,
        total_amount: round_money(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{VariationGroup, VariationOption};

    fn option(name: &str, modifier: Decimal) -> VariationOption {
        VariationOption {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price_modifier: modifier,
            is_default: false,
            display_order: 0,
        }
    }

    fn group(name: &str, variation_type: VariationType, options: Vec<VariationOption>) -> VariationGroup {
        VariationGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
            variation_type,
            display_order: 0,
            options,
        }
    }

    fn latte() -> MenuItem {
        MenuItem {
            id: Uuid::new_v4(),
            name: "Latte".to_string(),
            description: Some("Espresso and steamed milk".to_string()),
            category: Some("Drinks".to_string()),
            image_url: None,
            price: Decimal::new(350, 2),
            is_active: true,
            track_inventory: false,
            variation_groups: vec![
                group(
                    "Size",
                    VariationType::SingleSelect,
                    vec![
                        option("Regular", Decimal::ZERO),
                        option("Large", Decimal::new(50, 2)),
                    ],
                ),
                group(
                    "Extras",
                    VariationType::MultiSelect,
                    vec![
                        option("Oat milk", Decimal::new(40, 2)),
                        option("Extra shot", Decimal::new(75, 2)),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn test_base_price_only() {
        let item = latte();
        let priced = price_item(&item, &OrderItemRequest::new(item.id, 2)).unwrap();
        assert_eq!(priced.price_at_purchase, Decimal::new(350, 2));
        assert_eq!(priced.subtotal(), Decimal::new(700, 2));
        assert_eq!(priced.item_name, "Latte");
        assert_eq!(priced.item_base_price, Decimal::new(350, 2));
    }

    #[test]
    fn test_modifiers_added() {
        let item = latte();
        let size = &item.variation_groups[0];
        let extras = &item.variation_groups[1];
        let request = OrderItemRequest::new(item.id, 1)
            .with_variation(size.id, vec![size.options[1].id])
            .with_variation(extras.id, vec![extras.options[0].id, extras.options[1].id]);

        let priced = price_item(&item, &request).unwrap();
        // 3.50 + 0.50 + 0.40 + 0.75
        assert_eq!(priced.price_at_purchase, Decimal::new(515, 2));
        assert_eq!(priced.selected_variations.len(), 3);
        assert_eq!(priced.selected_variations[0].option_name, "Large");
    }

    #[test]
    fn test_single_select_rejects_two() {
        let item = latte();
        let size = &item.variation_groups[0];
        let request = OrderItemRequest::new(item.id, 1)
            .with_variation(size.id, vec![size.options[0].id, size.options[1].id]);
        assert!(matches!(
            price_item(&item, &request),
            Err(PricingError::TooManyOptions { .. })
        ));
    }

    #[test]
    fn test_unknown_group_and_option() {
        let item = latte();
        let request = OrderItemRequest::new(item.id, 1).with_variation(Uuid::new_v4(), vec![]);
        assert!(matches!(
            price_item(&item, &request),
            Err(PricingError::UnknownGroup { .. })
        ));

        let size = &item.variation_groups[0];
        let foreign = item.variation_groups[1].options[0].id;
        let request = OrderItemRequest::new(item.id, 1).with_variation(size.id, vec![foreign]);
        assert!(matches!(
            price_item(&item, &request),
            Err(PricingError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_duplicate_option() {
        let item = latte();
        let extras = &item.variation_groups[1];
        let oat = extras.options[0].id;
        let request = OrderItemRequest::new(item.id, 1).with_variation(extras.id, vec![oat, oat]);
        assert!(matches!(
            price_item(&item, &request),
            Err(PricingError::DuplicateOption { .. })
        ));
    }

    #[test]
    fn test_cart_total_rounded_once() {
        let mut item = latte();
        item.price = Decimal::new(3335, 3); // 3.335
        item.variation_groups.clear();
        let catalog = HashMap::from([(item.id, item.clone())]);

        let cart = price_cart(&catalog, &[OrderItemRequest::new(item.id, 3)]).unwrap();
        // 3 × 3.335 = 10.005 → 10.01
        assert_eq!(cart.total_amount, Decimal::new(1001, 2));
    }

    #[test]
    fn test_cart_unknown_item() {
        let catalog = HashMap::new();
        let missing = Uuid::new_v4();
        assert_eq!(
            price_cart(&catalog, &[OrderItemRequest::new(missing, 1)]),
            Err(PricingError::UnknownMenuItem(missing))
        );
    }
}
