//! Process-wide, lazily populated cache of provider clients
//!
//! One client per provider key, built on first use. Concurrent first uses of the same
//! key await one shared construction and all see its outcome. A failed construction
//! is dropped from the cache, so a later call starts a new attempt.

use crate::client::credentials::{Credentials, CredentialProvider, EnvCredentialProvider};
use crate::client::provider::{ClientFactory, ProviderClient};
use crate::error::{BridgeError, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one construction attempt; the error is the failure message
type Construction = Shared<BoxFuture<'static, std::result::Result<Arc<dyn ProviderClient>, String>>>;

enum Slot {
    Pending(Construction),
    Ready(Arc<dyn ProviderClient>),
}

/// Client cache keyed by provider key
pub struct ClientCache {
    factories: DashMap<String, Arc<dyn ClientFactory>>,
    clients: DashMap<String, Slot>,
    constructions: DashMap<String, Arc<AtomicUsize>>,
    credentials: Arc<dyn CredentialProvider>,
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new(Arc::new(EnvCredentialProvider::default()))
    }
}

impl ClientCache {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            factories: DashMap::new(),
            clients: DashMap::new(),
            constructions: DashMap::new(),
            credentials,
        }
    }

    /// Register how to build the client for a provider key. The first factory wins.
    pub fn register_factory(&self, provider_key: &str, factory: Arc<dyn ClientFactory>) {
        if self.factories.contains_key(provider_key) {
            debug!("Client factory for '{}' already registered", provider_key);
            return;
        }
        self.factories.entry(provider_key.to_string()).or_insert(factory);
    }

    pub fn has_factory(&self, provider_key: &str) -> bool {
        self.factories.contains_key(provider_key)
    }

    /// Return the cached client for `provider_key`, building it on first use
    pub async fn get_or_create(&self, provider_key: &str) -> Result<Arc<dyn ProviderClient>> {
        // The entry guard is released before awaiting the construction
        let construction = match self.clients.entry(provider_key.to_string()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Ready(client) => return Ok(client.clone()),
                Slot::Pending(construction) => construction.clone(),
            },
            Entry::Vacant(entry) => {
                let construction = self.start_construction(provider_key)?;
                entry.insert(Slot::Pending(construction.clone()));
                construction
            }
        };

        match construction.clone().await {
            Ok(client) => {
                if let Some(mut slot) = self.clients.get_mut(provider_key) {
                    if matches!(&*slot, Slot::Pending(pending) if pending.ptr_eq(&construction)) {
                        *slot = Slot::Ready(client.clone());
                    }
                }
                Ok(client)
            }
            Err(message) => {
                self.clients.remove_if(provider_key, |_, slot| {
                    matches!(slot, Slot::Pending(pending) if pending.ptr_eq(&construction))
                });
                Err(BridgeError::client_construction(provider_key, message))
            }
        }
    }

    fn start_construction(&self, provider_key: &str) -> Result<Construction> {
        let factory = self
            .factories
            .get(provider_key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BridgeError::client_construction(provider_key, "no client factory registered"))?;

        let counter = self
            .constructions
            .entry(provider_key.to_string())
            .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
            .clone();

        Ok(Self::construct(provider_key.to_string(), factory, self.credentials.clone(), counter)
            .boxed()
            .shared())
    }

    async fn construct(
        provider_key: String,
        factory: Arc<dyn ClientFactory>,
        credentials: Arc<dyn CredentialProvider>,
        counter: Arc<AtomicUsize>,
    ) -> std::result::Result<Arc<dyn ProviderClient>, String> {
        counter.fetch_add(1, Ordering::SeqCst);

        let scopes = factory.scopes();
        let credentials: Credentials = credentials
            .credentials(&provider_key, &scopes)
            .await
            .map_err(|e| format!("credentials unavailable: {}", e))?;

        match factory.build(&provider_key, credentials).await {
            Ok(client) => {
                info!("Constructed client for provider '{}'", provider_key);
                Ok(client)
            }
            Err(e) => {
                warn!("Failed to construct client for provider '{}': {}", provider_key, e);
                Err(match e {
                    BridgeError::ClientConstruction { message, .. } => message,
                    other => other.to_string(),
                })
            }
        }
    }

    /// Number of construction attempts made for a provider key
    pub fn constructions(&self, provider_key: &str) -> usize {
        self.constructions
            .get(provider_key)
            .map(|count| count.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn is_cached(&self, provider_key: &str) -> bool {
        self.clients
            .get(provider_key)
            .map(|slot| matches!(&*slot, Slot::Ready(_)))
            .unwrap_or(false)
    }

    /// Number of constructed clients
    pub fn len(&self) -> usize {
        self.clients
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached client. Factories stay registered.
    pub fn clear(&self) {
        let dropped = self.len();
        self.clients.clear();
        debug!("Cleared {} cached clients", dropped);
    }
}
