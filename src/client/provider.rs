//! Provider-native clients as seen by adapters

use crate::client::credentials::Credentials;
use crate::error::{BridgeError, Result};
use crate::result::RawResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A live handle on a provider (or one of its sub-resources)
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Step into a named sub-resource
    fn resource(&self, name: &str) -> Result<Arc<dyn ProviderClient>> {
        Err(BridgeError::validation(format!("Client has no sub-resource '{}'", name)))
    }

    /// Call a method with provider-native argument names
    async fn invoke(&self, method: &str, args: Map<String, Value>) -> Result<RawResult>;
}

/// Builds the root client of a provider
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Credential scopes the provider needs
    fn scopes(&self) -> Vec<String> {
        Vec::new()
    }

    async fn build(&self, provider_key: &str, credentials: Credentials) -> Result<Arc<dyn ProviderClient>>;
}

/// Walk an accessor chain from the root client
pub fn resolve_resource(root: Arc<dyn ProviderClient>, accessor_chain: &[String]) -> Result<Arc<dyn ProviderClient>> {
    let mut current = root;
    for accessor in accessor_chain {
        current = current.resource(accessor)?;
    }
    Ok(current)
}
