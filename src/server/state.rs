use std::sync::Arc;

use super::config::ServerConfig;
use super::provider::ProviderClient;

/// Shared state of the auth routes.
#[derive(Clone)]
pub struct EndpointState {
    pub(super) config: Arc<ServerConfig>,
    pub(super) provider: Arc<ProviderClient>,
}

impl EndpointState {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let provider = ProviderClient::new(&config);
        Self::with_provider(config, provider)
    }

    #[must_use]
    pub fn with_provider(config: ServerConfig, provider: ProviderClient) -> Self {
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
        }
    }
}
