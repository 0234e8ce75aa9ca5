use std::sync::Arc;

use crate::config::Config;
use crate::providers::ProviderGateway;
use crate::settings::ProviderSettings;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ProviderGateway>,
    /// Runtime provider configuration, shared with the gateway. Mutated by
    /// the admin endpoints, read on every generation call.
    pub settings: Arc<ProviderSettings>,
    pub config: Config,
}
