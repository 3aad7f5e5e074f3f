//! Directory of registered provider stores.
//!
//! Built explicitly at process start; resolves a provider id, a
//! colon-separated list, or `all` to the matching stores. With no id the
//! highest-priority provider is the default.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::store::MessageStore;

#[derive(Default)]
pub struct ProviderRegistry {
    stores: Vec<Arc<MessageStore>>,
    by_id: HashMap<String, Arc<MessageStore>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider store. Registration order is preserved for
    /// enumeration; a duplicate id replaces the earlier registration.
    pub fn register(&mut self, store: Arc<MessageStore>) {
        let id = store.provider_id().to_string();
        tracing::info!("registered message provider {}", id);
        self.stores.retain(|s| s.provider_id() != id);
        self.stores.push(store.clone());
        self.by_id.insert(id, store);
    }

    /// All registered stores, in registration order.
    pub fn stores(&self) -> &[Arc<MessageStore>] {
        &self.stores
    }

    /// The store for the given provider id.
    pub fn store(&self, provider_id: &str) -> Result<Arc<MessageStore>, Error> {
        self.by_id
            .get(provider_id)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(provider_id.to_string()))
    }

    /// The highest-priority store, used when no provider is named.
    pub fn default_store(&self) -> Option<Arc<MessageStore>> {
        self.stores.iter().max_by_key(|s| s.provider().priority()).cloned()
    }

    /// Resolves a provider selector to stores.
    ///
    /// `None` yields the default store; `all` yields every store;
    /// otherwise the selector is a colon-separated id list with unknown
    /// ids skipped.
    pub fn resolve(&self, selector: Option<&str>) -> Vec<Arc<MessageStore>> {
        match selector {
            None => self.default_store().into_iter().collect(),
            Some(s) if s.eq_ignore_ascii_case("all") => self.stores.to_vec(),
            Some(s) => s
                .split(':')
                .filter_map(|id| match self.store(id) {
                    Ok(store) => Some(store),
                    Err(_) => {
                        tracing::warn!("skipping unknown provider id {}", id);
                        None
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MessageCache;
    use crate::model::Message;
    use crate::store::{MessageProvider, Watermark};
    use async_trait::async_trait;

    struct StubProvider {
        id: &'static str,
        priority: i32,
    }

    #[async_trait]
    impl MessageProvider for StubProvider {
        fn provider_id(&self) -> &str {
            self.id
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn languages(&self) -> &[&str] {
            &["da", "en"]
        }

        async fn watermarks(&self) -> Result<Option<Vec<Watermark>>, Error> {
            Ok(None)
        }

        async fn load(&self) -> Result<Vec<Message>, Error> {
            Ok(Vec::new())
        }
    }

    fn registry() -> ProviderRegistry {
        let cache = Arc::new(MessageCache::default());
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(MessageStore::new(
            Arc::new(StubProvider { id: "dk", priority: 200 }),
            cache.clone(),
        )));
        registry.register(Arc::new(MessageStore::new(
            Arc::new(StubProvider { id: "se", priority: 100 }),
            cache,
        )));
        registry
    }

    #[test]
    fn test_lookup_by_id() {
        let registry = registry();
        assert_eq!(registry.store("se").unwrap().provider_id(), "se");
        assert!(matches!(registry.store("nope"), Err(Error::UnknownProvider(_))));
    }

    #[test]
    fn test_default_is_highest_priority() {
        let registry = registry();
        assert_eq!(registry.default_store().unwrap().provider_id(), "dk");
    }

    #[test]
    fn test_resolve_selectors() {
        let registry = registry();
        assert_eq!(registry.resolve(None).len(), 1);
        assert_eq!(registry.resolve(Some("all")).len(), 2);

        let picked = registry.resolve(Some("se:nope:dk"));
        let ids: Vec<&str> = picked.iter().map(|s| s.provider_id()).collect();
        assert_eq!(ids, vec!["se", "dk"]);
    }

    #[test]
    fn test_language_fallback() {
        let provider = StubProvider { id: "dk", priority: 1 };
        assert_eq!(provider.language(Some("EN")), "en");
        assert_eq!(provider.language(Some("fr")), "da");
        assert_eq!(provider.language(None), "da");
    }
}
