//! Append-only adapter registry with concurrent access
//!
//! Registration happens during discovery, possibly from several workers at once.
//! Lookups and invocations are safe to run concurrently with each other and with
//! registration. A catalog key, once registered, is never replaced.

use crate::adapter::Adapter;
use crate::descriptor::AdapterRecord;
use crate::error::{BridgeError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Registry metadata
#[derive(Debug, Clone, Serialize)]
pub struct RegistryMetadata {
    /// Number of registered adapters
    pub adapter_count: usize,

    /// Distinct provider keys with at least one adapter
    pub provider_count: usize,

    /// Time of the last successful registration
    #[serde(skip)]
    pub last_updated: Option<SystemTime>,
}

/// Catalog entry as returned by [`AdapterRegistry::list`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub catalog_key: String,
    pub summary: String,
}

/// Map from catalog key to adapter
pub struct AdapterRegistry {
    adapters: DashMap<String, Adapter>,
    last_updated: std::sync::RwLock<Option<SystemTime>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: DashMap::new(),
            last_updated: std::sync::RwLock::new(None),
        }
    }

    /// Add an adapter under its catalog key. An occupied key is a conflict and the
    /// existing adapter is kept.
    pub fn register(&self, adapter: Adapter) -> Result<()> {
        match self.adapters.entry(adapter.catalog_key().to_string()) {
            Entry::Occupied(existing) => {
                warn!(
                    "Catalog key '{}' already registered by '{}', rejecting '{}'",
                    existing.key(),
                    existing.get().record().provider_key,
                    adapter.record().provider_key
                );
                Err(BridgeError::conflict(existing.key().clone()))
            }
            Entry::Vacant(slot) => {
                debug!("Registered adapter '{}'", slot.key());
                slot.insert(adapter);
                if let Ok(mut last) = self.last_updated.write() {
                    *last = Some(SystemTime::now());
                }
                Ok(())
            }
        }
    }

    /// Invoke the adapter registered under `catalog_key`
    pub async fn invoke(&self, catalog_key: &str, args: Map<String, Value>) -> String {
        // Clone out of the map so no shard lock is held while the call runs
        let adapter = self.adapters.get(catalog_key).map(|entry| entry.value().clone());
        match adapter {
            Some(adapter) => adapter.invoke(args).await,
            None => {
                warn!("Invocation of unknown catalog key '{}'", catalog_key);
                format!("Error executing {}: unknown catalog key", catalog_key)
            }
        }
    }

    /// Catalog keys and summaries, sorted by key, optionally filtered by key prefix
    pub fn list(&self, prefix: Option<&str>) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> = self
            .adapters
            .iter()
            .filter(|entry| prefix.map_or(true, |p| entry.key().starts_with(p)))
            .map(|entry| CatalogEntry {
                catalog_key: entry.key().clone(),
                summary: entry.value().record().summary.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.catalog_key.cmp(&b.catalog_key));
        entries
    }

    /// Full record (parameters and input schema) of one adapter
    pub fn get(&self, catalog_key: &str) -> Option<AdapterRecord> {
        self.adapters.get(catalog_key).map(|entry| entry.value().record().clone())
    }

    pub fn contains(&self, catalog_key: &str) -> bool {
        self.adapters.contains_key(catalog_key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.adapters.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn metadata(&self) -> RegistryMetadata {
        let providers: BTreeSet<String> = self
            .adapters
            .iter()
            .map(|entry| entry.value().record().provider_key.clone())
            .collect();
        RegistryMetadata {
            adapter_count: self.adapters.len(),
            provider_count: providers.len(),
            last_updated: self.last_updated.read().ok().and_then(|last| *last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterSynthesizer;
    use crate::client::{AnonymousCredentials, ClientCache};
    use crate::descriptor::{OperationDescriptor, OperationTarget};
    use crate::result::ResultNormalizer;
    use crate::schema::SchemaNormalizer;
    use std::sync::Arc;

    fn adapter(key: &str, provider: &str, summary: &str) -> Adapter {
        let cache = Arc::new(ClientCache::new(Arc::new(AnonymousCredentials)));
        let descriptor = OperationDescriptor::new("op", vec![], false, summary, OperationTarget::root("op")).unwrap();
        let normalized = SchemaNormalizer::new().normalize_operation(&descriptor);
        AdapterSynthesizer::new(cache, ResultNormalizer::default()).synthesize(normalized, key.to_string(), provider)
    }

    #[test]
    fn test_conflicting_registration_keeps_first() {
        let registry = AdapterRegistry::new();
        registry.register(adapter("Maps_get", "maps", "first")).unwrap();

        let err = registry.register(adapter("Maps_get", "other", "second")).unwrap_err();
        assert!(matches!(err, BridgeError::RegistrationConflict { ref catalog_key } if catalog_key == "Maps_get"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Maps_get").unwrap().summary, "first");
        assert_eq!(registry.get("Maps_get").unwrap().provider_key, "maps");
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let registry = AdapterRegistry::new();
        registry.register(adapter("Translate_list", "translate", "t")).unwrap();
        registry.register(adapter("Maps_geocode", "maps", "g")).unwrap();
        registry.register(adapter("Maps_directions", "maps", "d")).unwrap();

        let keys: Vec<String> = registry.list(None).into_iter().map(|e| e.catalog_key).collect();
        assert_eq!(keys, vec!["Maps_directions", "Maps_geocode", "Translate_list"]);

        let maps = registry.list(Some("Maps_"));
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].summary, "d");

        let metadata = registry.metadata();
        assert_eq!(metadata.adapter_count, 3);
        assert_eq!(metadata.provider_count, 2);
        assert!(metadata.last_updated.is_some());
    }

    #[tokio::test]
    async fn test_unknown_key_invocation_is_a_string() {
        let registry = AdapterRegistry::new();
        let text = registry.invoke("Nope_x", Map::new()).await;
        assert_eq!(text, "Error executing Nope_x: unknown catalog key");
    }

    #[test]
    fn test_concurrent_registration_of_same_key() {
        let registry = Arc::new(AdapterRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register(adapter("Same_key", &format!("p{}", i), "")).is_ok())
            })
            .collect();
        let accepted = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();
        assert_eq!(accepted, 1);
        assert_eq!(registry.len(), 1);
    }
}
