//! Casino tag → feed adapter dispatch.

use std::{collections::HashMap, sync::Arc, time::Duration};

use casino_feed::{
    models::casino::CasinoId,
    providers::{FeedProvider, ProviderError, csv_feed::CsvFeedProvider},
};

/// Adapters available to the orchestrator, keyed by casino.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<CasinoId, Arc<dyn FeedProvider>>,
}

impl AdapterRegistry {
    /// An empty registry; every tenant resolves to unsupported.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped adapters, with `fetch_timeout` applied to each HTTP client.
    pub fn with_defaults(fetch_timeout: Duration) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        registry.register(
            CasinoId::Stake,
            Arc::new(CsvFeedProvider::with_timeout(fetch_timeout)?),
        );
        Ok(registry)
    }

    /// Installs `provider` for `casino`, returning the adapter it replaced.
    pub fn register(
        &mut self,
        casino: CasinoId,
        provider: Arc<dyn FeedProvider>,
    ) -> Option<Arc<dyn FeedProvider>> {
        self.adapters.insert(casino, provider)
    }

    /// Resolves a tenant's free-form casino tag (case-insensitive).
    pub fn resolve(&self, tag: &str) -> Option<(CasinoId, Arc<dyn FeedProvider>)> {
        let casino = CasinoId::from_tag(tag)?;
        self.adapters
            .get(&casino)
            .map(|provider| (casino, Arc::clone(provider)))
    }

    /// Casinos with an installed adapter.
    pub fn casinos(&self) -> impl Iterator<Item = CasinoId> + '_ {
        self.adapters.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_stake_in_any_case() {
        let registry = AdapterRegistry::with_defaults(Duration::from_secs(5)).unwrap();
        assert_eq!(registry.resolve(" STAKE ").map(|(c, _)| c), Some(CasinoId::Stake));
        assert!(registry.resolve("roobet").is_none());
        assert_eq!(registry.casinos().collect::<Vec<_>>(), vec![CasinoId::Stake]);
    }

    #[test]
    fn known_casino_without_adapter_is_unsupported() {
        assert!(AdapterRegistry::new().resolve("stake").is_none());
    }
}
