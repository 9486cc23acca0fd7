//! Orders and order items

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::models::{
    FulfillmentStatus, Order, OrderItem, OrderOwner, PaymentStatus, SelectedVariation,
};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::StoreError;

const ORDER_COLUMNS: &str = "id, order_number, user_id, guest_email, guest_first_name, guest_last_name,
    location_id, total_amount, payment_status, fulfillment_status, payment_intent_id, order_date,
    special_requests, delivery_notes, customer_name, customer_email, customer_department,
    location_name, location_address, location_phone, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Option<Uuid>,
    guest_email: Option<String>,
    guest_first_name: Option<String>,
    guest_last_name: Option<String>,
    location_id: Option<Uuid>,
    total_amount: Decimal,
    payment_status: PaymentStatus,
    fulfillment_status: FulfillmentStatus,
    payment_intent_id: Option<String>,
    order_date: NaiveDate,
    special_requests: Option<String>,
    delivery_notes: Option<String>,
    customer_name: Option<String>,
    customer_email: String,
    customer_department: Option<String>,
    location_name: Option<String>,
    location_address: Option<String>,
    location_phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    menu_item_id: Option<Uuid>,
    quantity: i32,
    price_at_purchase: Decimal,
    selected_variations: Json<Vec<SelectedVariation>>,
    customizations: Option<String>,
    special_requests: Option<String>,
    fulfillment_status: FulfillmentStatus,
    item_name: String,
    item_description: Option<String>,
    item_category: Option<String>,
    item_image_url: Option<String>,
    item_base_price: Decimal,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: r.id,
            menu_item_id: r.menu_item_id,
            quantity: r.quantity,
            price_at_purchase: r.price_at_purchase,
            selected_variations: r.selected_variations.0,
            customizations: r.customizations,
            special_requests: r.special_requests,
            fulfillment_status: r.fulfillment_status,
            item_name: r.item_name,
            item_description: r.item_description,
            item_category: r.item_category,
            item_image_url: r.item_image_url,
            item_base_price: r.item_base_price,
        }
    }
}

impl OrderRow {
    fn owner(&self) -> Result<OrderOwner, StoreError> {
        match (
            self.user_id,
            &self.guest_email,
            &self.guest_first_name,
            &self.guest_last_name,
        ) {
            (Some(user_id), None, None, None) => Ok(OrderOwner::Registered { user_id }),
            (None, Some(email), Some(first_name), Some(last_name)) => Ok(OrderOwner::Guest {
                email: email.clone(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
            }),
            _ => Err(StoreError::Corrupt(format!(
                "order {} has no single owner",
                self.id
            ))),
        }
    }

    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StoreError> {
        let owner = self.owner()?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            owner,
            location_id: self.location_id,
            total_amount: self.total_amount,
            payment_status: self.payment_status,
            fulfillment_status: self.fulfillment_status,
            payment_intent_id: self.payment_intent_id,
            order_date: self.order_date,
            special_requests: self.special_requests,
            delivery_notes: self.delivery_notes,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_department: self.customer_department,
            location_name: self.location_name,
            location_address: self.location_address,
            location_phone: self.location_phone,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Greatest order number with the given day prefix, compared numerically
/// (a longer suffix is a larger number)
pub async fn latest_order_number(
    conn: &mut PgConnection,
    prefix: &str,
) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT order_number FROM orders
         WHERE order_number LIKE $1
         ORDER BY length(order_number) DESC, order_number DESC
         LIMIT 1",
    )
    .bind(format!("{prefix}%"))
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| r.0))
}

/// Insert an order and its items. A duplicate order number surfaces as
/// `StoreError::UniqueViolation("orders_order_number_key")`.
pub async fn insert(conn: &mut PgConnection, order: &Order) -> Result<(), StoreError> {
    let (user_id, guest_email, guest_first_name, guest_last_name) = match &order.owner {
        OrderOwner::Registered { user_id } => (Some(*user_id), None, None, None),
        OrderOwner::Guest {
            email,
            first_name,
            last_name,
        } => (
            None,
            Some(email.as_str()),
            Some(first_name.as_str()),
            Some(last_name.as_str()),
        ),
    };

    sqlx::query(
        "INSERT INTO orders (id, order_number, user_id, guest_email, guest_first_name, guest_last_name,
            location_id, total_amount, payment_status, fulfillment_status, payment_intent_id, order_date,
            special_requests, delivery_notes, customer_name, customer_email, customer_department,
            location_name, location_address, location_phone, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22)",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(user_id)
    .bind(guest_email)
    .bind(guest_first_name)
    .bind(guest_last_name)
    .bind(order.location_id)
    .bind(order.total_amount)
    .bind(order.payment_status)
    .bind(order.fulfillment_status)
    .bind(order.payment_intent_id.as_deref())
    .bind(order.order_date)
    .bind(order.special_requests.as_deref())
    .bind(order.delivery_notes.as_deref())
    .bind(order.customer_name.as_deref())
    .bind(&order.customer_email)
    .bind(order.customer_department.as_deref())
    .bind(order.location_name.as_deref())
    .bind(order.location_address.as_deref())
    .bind(order.location_phone.as_deref())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for (position, item) in order.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, position, menu_item_id, quantity, price_at_purchase,
                selected_variations, customizations, special_requests, fulfillment_status,
                item_name, item_description, item_category, item_image_url, item_base_price)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(item.id)
        .bind(order.id)
        .bind(i32::try_from(position).unwrap_or(i32::MAX))
        .bind(item.menu_item_id)
        .bind(item.quantity)
        .bind(item.price_at_purchase)
        .bind(Json(&item.selected_variations))
        .bind(item.customizations.as_deref())
        .bind(item.special_requests.as_deref())
        .bind(item.fulfillment_status)
        .bind(&item.item_name)
        .bind(item.item_description.as_deref())
        .bind(item.item_category.as_deref())
        .bind(item.item_image_url.as_deref())
        .bind(item.item_base_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT id, menu_item_id, quantity, price_at_purchase, selected_variations, customizations,
                special_requests, fulfillment_status, item_name, item_description, item_category,
                item_image_url, item_base_price
         FROM order_items WHERE order_id = $1
         ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

async fn hydrate(pool: &PgPool, row: Option<OrderRow>) -> Result<Option<Order>, StoreError> {
    let Some(row) = row else {
        return Ok(None);
    };
    let items = load_items(pool, row.id).await?;
    row.into_order(items).map(Some)
}

pub async fn find_by_id(pool: &PgPool, order_id: Uuid) -> Result<Option<Order>, StoreError> {
    let row: Option<OrderRow> =
        sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(pool)
            .await?;
    hydrate(pool, row).await
}

pub async fn find_by_payment_intent(
    pool: &PgPool,
    payment_intent_id: &str,
) -> Result<Option<Order>, StoreError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_intent_id = $1"
    ))
    .bind(payment_intent_id)
    .fetch_optional(pool)
    .await?;
    hydrate(pool, row).await
}

/// `UPDATE … WHERE payment_status = from`; true if the row moved
pub async fn transition_payment_status(
    pool: &PgPool,
    order_id: Uuid,
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET payment_status = $3, updated_at = now()
         WHERE id = $1 AND payment_status = $2",
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
