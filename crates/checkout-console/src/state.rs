//! Application State

use std::sync::Arc;

use tokio::sync::RwLock;

use checkout_core::{
    BackendClient, CheckoutInitiator, ConsoleConfig, HostedWidgetFactory, MemoryAttemptStore,
    PaymentFlow, VerificationDispatcher,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Operator settings, replaceable at runtime
    pub config: Arc<RwLock<ConsoleConfig>>,

    /// Shared connection pool for backend calls
    pub http: reqwest::Client,

    /// Widgets waiting for the browser page
    pub widgets: Arc<HostedWidgetFactory>,

    pub initiator: CheckoutInitiator,

    pub dispatcher: VerificationDispatcher,

    /// Payment attempts seen this session
    pub attempts: Arc<MemoryAttemptStore>,
}

impl AppState {
    pub fn new(config: ConsoleConfig) -> Self {
        let http = reqwest::Client::new();
        let widgets = Arc::new(HostedWidgetFactory::new());

        Self {
            config: Arc::new(RwLock::new(config)),
            initiator: CheckoutInitiator::new(widgets.clone()),
            dispatcher: VerificationDispatcher::with_client(http.clone()),
            http,
            widgets,
            attempts: Arc::new(MemoryAttemptStore::new()),
        }
    }

    /// Backend client for the current settings
    pub async fn backend(&self) -> BackendClient {
        let config = self.config.read().await.clone();
        BackendClient::with_client(self.http.clone(), config)
    }

    pub async fn flow(&self) -> PaymentFlow<MemoryAttemptStore> {
        PaymentFlow::new(
            self.backend().await,
            self.initiator.clone(),
            self.dispatcher.clone(),
            self.attempts.clone(),
        )
    }
}
