//! Catalog reads: menu items with variations, locations, users

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::models::{Location, MenuItem, UserProfile, VariationGroup, VariationOption, VariationType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::orders::traits::MenuItemLocationLink;

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    category: Option<String>,
    image_url: Option<String>,
    price: Decimal,
    is_active: bool,
    track_inventory: bool,
}

#[derive(sqlx::FromRow)]
struct VariationGroupRow {
    id: Uuid,
    menu_item_id: Uuid,
    name: String,
    variation_type: VariationType,
    display_order: i32,
}

#[derive(sqlx::FromRow)]
struct VariationOptionRow {
    id: Uuid,
    group_id: Uuid,
    name: String,
    price_modifier: Decimal,
    is_default: bool,
    display_order: i32,
}

/// Menu items by id, inactive ones included, with groups and options in
/// display order
pub async fn find_menu_items_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<MenuItem>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let items: Vec<MenuItemRow> = sqlx::query_as(
        "SELECT id, name, description, category, image_url, price, is_active, track_inventory
         FROM menu_items WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let groups: Vec<VariationGroupRow> = sqlx::query_as(
        "SELECT id, menu_item_id, name, variation_type, display_order
         FROM variation_groups WHERE menu_item_id = ANY($1)
         ORDER BY display_order, name",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let group_ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
    let options: Vec<VariationOptionRow> = if group_ids.is_empty() {
        vec![]
    } else {
        sqlx::query_as(
            "SELECT id, group_id, name, price_modifier, is_default, display_order
             FROM variation_options WHERE group_id = ANY($1)
             ORDER BY display_order, name",
        )
        .bind(&group_ids)
        .fetch_all(pool)
        .await?
    };

    let mut options_by_group: HashMap<Uuid, Vec<VariationOption>> = HashMap::new();
    for o in options {
        options_by_group
            .entry(o.group_id)
            .or_default()
            .push(VariationOption {
                id: o.id,
                name: o.name,
                price_modifier: o.price_modifier,
                is_default: o.is_default,
                display_order: o.display_order,
            });
    }

    let mut groups_by_item: HashMap<Uuid, Vec<VariationGroup>> = HashMap::new();
    for g in groups {
        let options = options_by_group.remove(&g.id).unwrap_or_default();
        groups_by_item
            .entry(g.menu_item_id)
            .or_default()
            .push(VariationGroup {
                id: g.id,
                name: g.name,
                variation_type: g.variation_type,
                display_order: g.display_order,
                options,
            });
    }

    Ok(items
        .into_iter()
        .map(|m| MenuItem {
            variation_groups: groups_by_item.remove(&m.id).unwrap_or_default(),
            id: m.id,
            name: m.name,
            description: m.description,
            category: m.category,
            image_url: m.image_url,
            price: m.price,
            is_active: m.is_active,
            track_inventory: m.track_inventory,
        })
        .collect())
}

pub async fn find_location(pool: &PgPool, id: Uuid) -> Result<Option<Location>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, address, phone, is_active FROM locations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_location_links(
    pool: &PgPool,
    menu_item_ids: &[Uuid],
    location_id: Uuid,
) -> Result<Vec<MenuItemLocationLink>, sqlx::Error> {
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT menu_item_id, location_id FROM menu_item_locations
         WHERE menu_item_id = ANY($1) AND location_id = $2",
    )
    .bind(menu_item_ids)
    .bind(location_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(menu_item_id, location_id)| MenuItemLocationLink {
            menu_item_id,
            location_id,
        })
        .collect())
}

pub async fn find_user(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, first_name, last_name, department FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
