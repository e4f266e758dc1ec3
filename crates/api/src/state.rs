//! Shared application state for the Axum router.

use std::sync::Arc;

use bounce_common::config::AppConfig;
use bounce_engine::registry::SenderRegistry;

use crate::confirm::SubscriptionConfirmer;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SenderRegistry>,
    pub confirmer: Arc<dyn SubscriptionConfirmer>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        registry: Arc<SenderRegistry>,
        confirmer: Arc<dyn SubscriptionConfirmer>,
        config: AppConfig,
    ) -> Self {
        Self {
            registry,
            confirmer,
            config,
        }
    }
}
