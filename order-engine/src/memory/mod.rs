//! In-process collaborators
//!
//! Used by the test suites and for running the engine without PostgreSQL or
//! Stripe.

mod payments;
mod store;

pub use payments::{MemoryPayments, RecordedIntent};
pub use store::{MemoryStore, MemoryTx};
