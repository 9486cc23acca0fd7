//! Application state: the engine services wired over their backends

use std::sync::Arc;

use crate::auth::GuestTokenService;
use crate::config::Config;
use crate::db::PgStore;
use crate::error::BoxError;
use crate::inventory::{InventoryLedger, InventoryService};
use crate::orders::{Collaborators, OrderEngine, PaymentEvents};
use crate::stripe::StripeClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: OrderEngine,
    pub payment_events: PaymentEvents,
    pub inventory: InventoryService,
}

impl AppState {
    /// Production wiring: PostgreSQL for every store, Stripe for payments
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store = Arc::new(PgStore::connect(&config.database_url, config.db_max_connections).await?);
        let payments = Arc::new(StripeClient::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
        ));

        let collaborators = Collaborators {
            ordering_window: store.clone(),
            catalog: store.clone(),
            inventory: store.clone(),
            payments,
            store: store.clone(),
        };
        Ok(Self::assemble(config, collaborators, store))
    }

    /// Wire the services over arbitrary collaborators
    pub fn assemble(
        config: &Config,
        collaborators: Collaborators,
        ledger: Arc<dyn InventoryLedger>,
    ) -> Self {
        let payment_events = PaymentEvents::new(
            collaborators.store.clone(),
            collaborators.payments.clone(),
            config.stripe_webhook_secret.clone(),
        );
        let engine = OrderEngine::new(
            collaborators,
            GuestTokenService::new(config.guest_token_config()),
            config.payment_currency.clone(),
        );

        Self {
            engine,
            payment_events,
            inventory: InventoryService::new(ledger),
        }
    }
}
