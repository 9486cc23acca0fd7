//! Order creation
//!
//! `create_order` runs the pre-transaction checks in a fixed order, each
//! failing fast with its own error:
//!
//! 1. request shape
//! 2. ordering window
//! 3. customer (registered users must exist)
//! 4. location snapshot (a missing location is tolerated, see below)
//! 5. every requested menu item exists and is active
//! 6. every item is offered at the location
//! 7. tracked stock covers the aggregated quantities
//! 8. pricing
//!
//! Then one transaction creates the payment intent, allocates the order
//! number, inserts the order with its items and applies the guarded stock
//! deductions. A unique-constraint clash on the order number retries the
//! whole transaction with jitter; the payment intent is reused across
//! attempts.
//!
//! When the requested location does not exist the order is still placed,
//! without a location reference, location checks or stock deductions.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use shared::models::{
    FulfillmentStatus, Location, MenuItem, Order, OrderItem, OrderOwner, PaymentStatus,
};
use uuid::Uuid;

use super::number::{day_prefix, next_order_number};
use super::traits::{
    AvailabilityRequest, Catalog, InventoryDeduction, InventoryReader, OrderStore, OrderTx,
    OrderingWindowProvider, PaymentIntent, PaymentIntentRequest, PaymentProvider,
};
use super::types::{CreateOrderRequest, CreatedOrder, Customer};
use crate::auth::GuestTokenService;
use crate::error::{OrderError, OrderResult, StockShortage, StoreError};
use crate::money::{MAX_ORDER_TOTAL, to_minor_units};
use crate::pricing::{PricingError, price_cart};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, validate_email, validate_optional_text, validate_quantity,
    validate_required_text,
};

/// Transaction attempts before giving up on order number allocation
pub const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Upper bound of the random pause between attempts
const RETRY_JITTER_MAX_MS: u64 = 100;

const DEFAULT_CLOSED_MESSAGE: &str = "Ordering is currently closed";

/// Collaborators the engine is wired with
#[derive(Clone)]
pub struct Collaborators {
    pub ordering_window: Arc<dyn OrderingWindowProvider>,
    pub catalog: Arc<dyn Catalog>,
    pub inventory: Arc<dyn InventoryReader>,
    pub payments: Arc<dyn PaymentProvider>,
    pub store: Arc<dyn OrderStore>,
}

/// Order transaction engine
#[derive(Clone)]
pub struct OrderEngine {
    pub(super) ordering_window: Arc<dyn OrderingWindowProvider>,
    pub(super) catalog: Arc<dyn Catalog>,
    pub(super) inventory: Arc<dyn InventoryReader>,
    pub(super) payments: Arc<dyn PaymentProvider>,
    pub(super) store: Arc<dyn OrderStore>,
    pub(super) tokens: GuestTokenService,
    currency: String,
}

/// Customer fields copied onto the order
struct CustomerSnapshot {
    owner: OrderOwner,
    name: Option<String>,
    email: String,
    department: Option<String>,
}

/// Everything about the order that does not depend on the attempt
struct OrderDraft {
    order_id: Uuid,
    customer: CustomerSnapshot,
    location: Option<Location>,
    items: Vec<OrderItem>,
    total_amount: Decimal,
    amount_minor: i64,
    special_requests: Option<String>,
    delivery_notes: Option<String>,
    /// Tracked quantities per menu item, ascending id (empty without a location)
    deductions: BTreeMap<Uuid, i32>,
    item_names: HashMap<Uuid, String>,
}

impl OrderDraft {
    fn build_order(
        &self,
        order_number: String,
        payment_intent_id: &str,
        now: DateTime<Utc>,
    ) -> Order {
        Order {
            id: self.order_id,
            order_number,
            owner: self.customer.owner.clone(),
            location_id: self.location.as_ref().map(|l| l.id),
            total_amount: self.total_amount,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Placed,
            payment_intent_id: Some(payment_intent_id.to_string()),
            order_date: now.date_naive(),
            special_requests: self.special_requests.clone(),
            delivery_notes: self.delivery_notes.clone(),
            customer_name: self.customer.name.clone(),
            customer_email: self.customer.email.clone(),
            customer_department: self.customer.department.clone(),
            location_name: self.location.as_ref().map(|l| l.name.clone()),
            location_address: self.location.as_ref().and_then(|l| l.address.clone()),
            location_phone: self.location.as_ref().and_then(|l| l.phone.clone()),
            items: self.items.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn item_name(&self, menu_item_id: Uuid) -> String {
        self.item_names
            .get(&menu_item_id)
            .cloned()
            .unwrap_or_else(|| menu_item_id.to_string())
    }
}

/// Outcome of one transaction attempt
enum AttemptError {
    /// Order number taken by a concurrent transaction (constraint name)
    Collision(String),
    Failed(OrderError),
}

impl From<StoreError> for AttemptError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(constraint) => AttemptError::Collision(constraint),
            other => AttemptError::Failed(OrderError::Store(other)),
        }
    }
}

fn collaborator(e: crate::error::BoxError) -> OrderError {
    OrderError::Collaborator(e)
}

fn pricing_error(e: PricingError) -> OrderError {
    match e {
        PricingError::UnknownMenuItem(id) => OrderError::InvalidOrUnavailableItems {
            menu_item_ids: vec![id],
        },
        other => OrderError::InvalidVariation(other.to_string()),
    }
}

/// Request-shape validation, before any collaborator is consulted
fn validate_request(customer: &Customer, request: &CreateOrderRequest) -> OrderResult<()> {
    if request.items.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    for (index, item) in request.items.iter().enumerate() {
        validate_quantity(item.quantity, &format!("items[{index}].quantity"))?;
        validate_optional_text(
            &item.customizations,
            &format!("items[{index}].customizations"),
            MAX_NOTE_LEN,
        )?;
        validate_optional_text(
            &item.special_requests,
            &format!("items[{index}].special_requests"),
            MAX_NOTE_LEN,
        )?;
    }
    validate_optional_text(&request.delivery_notes, "delivery_notes", MAX_NOTE_LEN)?;
    validate_optional_text(&request.special_requests, "special_requests", MAX_NOTE_LEN)?;

    if let Customer::Guest {
        email,
        first_name,
        last_name,
    } = customer
    {
        validate_email(email.trim(), "email")?;
        validate_required_text(first_name, "first_name", MAX_NAME_LEN)?;
        validate_required_text(last_name, "last_name", MAX_NAME_LEN)?;
    }
    Ok(())
}

impl OrderEngine {
    pub fn new(
        collaborators: Collaborators,
        tokens: GuestTokenService,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            ordering_window: collaborators.ordering_window,
            catalog: collaborators.catalog,
            inventory: collaborators.inventory,
            payments: collaborators.payments,
            store: collaborators.store,
            tokens,
            currency: currency.into(),
        }
    }

    /// Turn a cart into a persisted, payable order
    pub async fn create_order(
        &self,
        customer: Customer,
        request: CreateOrderRequest,
    ) -> OrderResult<CreatedOrder> {
        validate_request(&customer, &request)?;

        let window = self
            .ordering_window
            .ordering_window()
            .await
            .map_err(collaborator)?;
        if !window.active {
            tracing::info!("Order rejected: ordering window closed");
            return Err(OrderError::OrderingWindowClosed {
                message: window
                    .message
                    .unwrap_or_else(|| DEFAULT_CLOSED_MESSAGE.to_string()),
            });
        }

        let customer = self.resolve_customer(&customer).await?;
        let location = self.resolve_location(request.location_id).await?;

        // Distinct ids, first-seen order
        let mut seen = HashSet::new();
        let menu_item_ids: Vec<Uuid> = request
            .items
            .iter()
            .map(|i| i.menu_item_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let menu_items = self.load_active_menu_items(&menu_item_ids).await?;

        let mut tracked = BTreeMap::new();
        if let Some(location) = &location {
            self.check_location_links(&menu_item_ids, &menu_items, location.id)
                .await?;

            for item in &request.items {
                let is_tracked = menu_items
                    .get(&item.menu_item_id)
                    .is_some_and(|m| m.track_inventory);
                if is_tracked {
                    let total: &mut i32 = tracked.entry(item.menu_item_id).or_default();
                    *total = total.saturating_add(item.quantity);
                }
            }
            self.check_inventory(&tracked, &menu_items, location.id)
                .await?;
        }

        let cart = price_cart(&menu_items, &request.items).map_err(pricing_error)?;
        if cart.total_amount < Decimal::ZERO {
            return Err(OrderError::Validation(format!(
                "order total {} is negative",
                cart.total_amount
            )));
        }
        if cart.total_amount > MAX_ORDER_TOTAL {
            return Err(OrderError::Validation(format!(
                "order total {} exceeds the maximum of {MAX_ORDER_TOTAL}",
                cart.total_amount
            )));
        }
        let amount_minor = to_minor_units(cart.total_amount).ok_or_else(|| {
            OrderError::Validation(format!("order total {} out of range", cart.total_amount))
        })?;

        let order_id = Uuid::new_v4();
        // Minted before the transaction so a failure leaves nothing behind
        let access_token = match &customer.owner {
            OrderOwner::Guest { email, .. } => Some(self.tokens.issue(order_id, email)?),
            OrderOwner::Registered { .. } => None,
        };

        let draft = OrderDraft {
            order_id,
            customer,
            location,
            items: cart.items,
            total_amount: cart.total_amount,
            amount_minor,
            special_requests: request.special_requests,
            delivery_notes: request.delivery_notes,
            deductions: tracked,
            item_names: menu_items
                .values()
                .map(|m| (m.id, m.name.clone()))
                .collect(),
        };

        let (order, intent) = self.persist_with_retry(&draft).await?;

        // Best effort and off the request path: the order is already committed
        let payments = self.payments.clone();
        let payment_intent_id = intent.id.clone();
        let order_id = order.id;
        tokio::spawn(async move {
            if let Err(e) = payments
                .update_payment_intent_metadata(&payment_intent_id, order_id)
                .await
            {
                tracing::warn!(
                    %order_id,
                    %payment_intent_id,
                    error = %e,
                    "Failed to attach order id to payment intent"
                );
            }
        });

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            items = order.items.len(),
            guest = order.owner.is_guest(),
            "Order created"
        );

        Ok(CreatedOrder {
            order,
            client_secret: intent.client_secret,
            access_token,
        })
    }

    async fn resolve_customer(&self, customer: &Customer) -> OrderResult<CustomerSnapshot> {
        match customer {
            Customer::Registered { user_id } => {
                let user = self
                    .catalog
                    .find_user_by_id(*user_id)
                    .await
                    .map_err(collaborator)?
                    .ok_or(OrderError::CustomerNotFound(*user_id))?;
                Ok(CustomerSnapshot {
                    owner: OrderOwner::Registered { user_id: user.id },
                    name: Some(user.full_name()),
                    email: user.email,
                    department: user.department,
                })
            }
            Customer::Guest {
                email,
                first_name,
                last_name,
            } => {
                let (email, first_name, last_name) = (
                    email.trim().to_string(),
                    first_name.trim().to_string(),
                    last_name.trim().to_string(),
                );
                Ok(CustomerSnapshot {
                    name: Some(format!("{first_name} {last_name}")),
                    email: email.clone(),
                    department: None,
                    owner: OrderOwner::Guest {
                        email,
                        first_name,
                        last_name,
                    },
                })
            }
        }
    }

    async fn resolve_location(&self, location_id: Option<Uuid>) -> OrderResult<Option<Location>> {
        let Some(location_id) = location_id else {
            return Ok(None);
        };
        let location = self
            .catalog
            .find_location_by_id(location_id)
            .await
            .map_err(collaborator)?;
        if location.is_none() {
            tracing::warn!(%location_id, "Location not found, placing order without location");
        }
        Ok(location)
    }

    /// All requested items must exist and be active; inactive counts as missing
    async fn load_active_menu_items(
        &self,
        menu_item_ids: &[Uuid],
    ) -> OrderResult<HashMap<Uuid, MenuItem>> {
        let menu_items: HashMap<Uuid, MenuItem> = self
            .catalog
            .find_menu_items_by_ids(menu_item_ids)
            .await
            .map_err(collaborator)?
            .into_iter()
            .filter(|m| m.is_active)
            .map(|m| (m.id, m))
            .collect();

        if menu_items.len() != menu_item_ids.len() {
            let missing: Vec<Uuid> = menu_item_ids
                .iter()
                .filter(|id| !menu_items.contains_key(id))
                .copied()
                .collect();
            tracing::info!(missing = missing.len(), "Order rejected: unavailable menu items");
            return Err(OrderError::InvalidOrUnavailableItems {
                menu_item_ids: missing,
            });
        }
        Ok(menu_items)
    }

    async fn check_location_links(
        &self,
        menu_item_ids: &[Uuid],
        menu_items: &HashMap<Uuid, MenuItem>,
        location_id: Uuid,
    ) -> OrderResult<()> {
        let linked: HashSet<Uuid> = self
            .catalog
            .find_menu_item_location_links(menu_item_ids, location_id)
            .await
            .map_err(collaborator)?
            .into_iter()
            .filter(|link| link.location_id == location_id)
            .map(|link| link.menu_item_id)
            .collect();

        let item_names: Vec<String> = menu_item_ids
            .iter()
            .filter(|id| !linked.contains(id))
            .filter_map(|id| menu_items.get(id).map(|m| m.name.clone()))
            .collect();
        if !item_names.is_empty() {
            tracing::info!(%location_id, "Order rejected: items not offered at location");
            return Err(OrderError::ItemsNotAvailableAtLocation { item_names });
        }
        Ok(())
    }

    /// Aggregated stock check for tracked items
    async fn check_inventory(
        &self,
        tracked: &BTreeMap<Uuid, i32>,
        menu_items: &HashMap<Uuid, MenuItem>,
        location_id: Uuid,
    ) -> OrderResult<()> {
        if tracked.is_empty() {
            return Ok(());
        }
        let requests: Vec<AvailabilityRequest> = tracked
            .iter()
            .map(|(&menu_item_id, &quantity)| AvailabilityRequest {
                menu_item_id,
                location_id,
                quantity,
            })
            .collect();

        let shortages: Vec<StockShortage> = self
            .inventory
            .check_bulk_availability(&requests)
            .await
            .map_err(collaborator)?
            .into_iter()
            .filter(|r| !r.available)
            .map(|r| StockShortage {
                menu_item_id: r.menu_item_id,
                item_name: menu_items
                    .get(&r.menu_item_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| r.menu_item_id.to_string()),
                current_stock: r.current_stock,
                requested: r.requested,
            })
            .collect();

        if !shortages.is_empty() {
            tracing::info!(%location_id, shortages = shortages.len(), "Order rejected: insufficient stock");
            return Err(OrderError::InsufficientInventory { shortages });
        }
        Ok(())
    }

    async fn persist_with_retry(&self, draft: &OrderDraft) -> OrderResult<(Order, PaymentIntent)> {
        let mut intent = None;

        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            match self.persist_attempt(draft, &mut intent).await {
                Ok(order) => {
                    if attempt > 1 {
                        tracing::info!(attempt, order_number = %order.order_number, "Order number allocated after retry");
                    }
                    let intent = intent.ok_or_else(|| {
                        OrderError::PaymentIntentCreationFailed("intent missing after commit".into())
                    })?;
                    return Ok((order, intent));
                }
                Err(AttemptError::Collision(constraint)) => {
                    tracing::warn!(attempt, %constraint, "Order number collision");
                    if attempt < MAX_ORDER_NUMBER_ATTEMPTS {
                        let jitter = rand::thread_rng().gen_range(0..=RETRY_JITTER_MAX_MS);
                        tokio::time::sleep(Duration::from_millis(jitter)).await;
                    }
                }
                Err(AttemptError::Failed(e)) => {
                    if let Some(intent) = &intent {
                        tracing::warn!(payment_intent_id = %intent.id, error = %e, "Order failed after payment intent creation");
                    }
                    return Err(e);
                }
            }
        }

        tracing::error!(
            order_id = %draft.order_id,
            attempts = MAX_ORDER_NUMBER_ATTEMPTS,
            "Order number allocation exhausted"
        );
        Err(OrderError::OrderNumberCollisionExhausted {
            attempts: MAX_ORDER_NUMBER_ATTEMPTS,
        })
    }

    /// One transaction; commits on success, rolls back on any error
    async fn persist_attempt(
        &self,
        draft: &OrderDraft,
        intent: &mut Option<PaymentIntent>,
    ) -> Result<Order, AttemptError> {
        let mut tx = self.store.begin().await?;

        match self.write_order(tx.as_mut(), draft, intent).await {
            Ok(order) => {
                tx.commit().await?;
                Ok(order)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Order transaction rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn write_order(
        &self,
        tx: &mut dyn OrderTx,
        draft: &OrderDraft,
        intent: &mut Option<PaymentIntent>,
    ) -> Result<Order, AttemptError> {
        let payment_intent_id = match intent {
            Some(existing) => existing.id.clone(),
            None => {
                let created = self
                    .payments
                    .create_payment_intent(&PaymentIntentRequest {
                        amount: draft.amount_minor,
                        currency: self.currency.clone(),
                        customer_email: draft.customer.email.clone(),
                    })
                    .await
                    .map_err(|e| {
                        AttemptError::Failed(OrderError::PaymentIntentCreationFailed(
                            e.to_string(),
                        ))
                    })?;
                let id = created.id.clone();
                *intent = Some(created);
                id
            }
        };

        let now = Utc::now();
        let date = now.date_naive();
        let latest = tx.latest_order_number(&day_prefix(date)).await?;
        let order_number = next_order_number(date, latest.as_deref());

        let order = draft.build_order(order_number, &payment_intent_id, now);
        tx.insert_order(&order).await?;

        if let Some(location) = &draft.location {
            for (&menu_item_id, &quantity) in &draft.deductions {
                let deduction = InventoryDeduction {
                    menu_item_id,
                    location_id: location.id,
                    quantity,
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                    changed_by: order.owner.user_id(),
                };
                tx.deduct_inventory(&deduction).await.map_err(|e| match e {
                    StoreError::InsufficientStock {
                        available,
                        requested,
                        ..
                    } => {
                        tracing::warn!(%menu_item_id, available, requested, "Stock changed during order placement");
                        AttemptError::Failed(OrderError::InventoryDeductionConflict {
                            shortage: StockShortage {
                                menu_item_id,
                                item_name: draft.item_name(menu_item_id),
                                current_stock: available,
                                requested,
                            },
                        })
                    }
                    other => AttemptError::from(other),
                })?;
            }
        }

        Ok(order)
    }
}
