//! Order placement and payment lifecycle

mod access;
mod engine;
pub mod number;
mod payments;
pub mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use engine::{Collaborators, MAX_ORDER_NUMBER_ATTEMPTS, OrderEngine};
pub use payments::{PaymentConfirmation, PaymentEvents, WebhookOutcome};
pub use types::{
    CreateOrderRequest, CreatedOrder, Customer, OrderItemRequest, VariationSelection,
};
