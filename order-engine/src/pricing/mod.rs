//! Cart pricing
//!
//! Resolves variation selections against the catalog and produces priced
//! order items with their snapshots.

mod calculator;

pub use calculator::{PricedCart, PricingError, price_cart, price_item};
