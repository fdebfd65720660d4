use std::collections::HashMap;
use std::sync::Arc;

use relaygate_domain::{GatewayError, ProviderType, Result};

use super::ports::ProviderAdapter;

/// Adapter lookup keyed by provider type.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderType, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for the same provider.
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider_type(), adapter);
    }

    pub fn get(&self, provider: ProviderType) -> Result<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned().ok_or_else(|| {
            GatewayError::Configuration(format!("provider {} is not registered", provider.slug()))
        })
    }

    pub fn providers(&self) -> Vec<ProviderType> {
        let mut providers: Vec<_> = self.adapters.keys().copied().collect();
        providers.sort();
        providers
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").field("providers", &self.providers()).finish()
    }
}
