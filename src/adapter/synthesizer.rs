//! Builds callable adapters from normalized operations
//!
//! An adapter accepts a flat argument map keyed by exposed parameter names, resolves
//! the provider client through the cache, walks the accessor chain, calls the
//! operation with provider-native names, and hands the raw result to the result
//! normalizer. It always yields a string; failures become
//! `Error executing <catalogKey>: <message>`.

use crate::client::{resolve_resource, ClientCache};
use crate::descriptor::{AdapterRecord, OperationTarget};
use crate::error::Result;
use crate::result::ResultNormalizer;
use crate::schema::NormalizedOperation;
use crate::utils::name_sanitizer::ParameterNameMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reserved argument whose object value is merged into the top-level arguments
pub const WRAPPER_ARGUMENT: &str = "kwargs";

/// Immutable state bound into an adapter at synthesis time
struct Binding {
    target: OperationTarget,
    name_map: ParameterNameMap,
    /// Provider-native name and value of every non-null optional default
    defaults: Vec<(String, Value)>,
    cache: Arc<ClientCache>,
    results: ResultNormalizer,
}

/// A callable catalog entry
#[derive(Clone)]
pub struct Adapter {
    record: Arc<AdapterRecord>,
    binding: Arc<Binding>,
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("catalog_key", &self.record.catalog_key)
            .field("target", &self.binding.target)
            .finish()
    }
}

impl Adapter {
    pub fn record(&self) -> &AdapterRecord {
        &self.record
    }

    pub fn catalog_key(&self) -> &str {
        &self.record.catalog_key
    }

    /// Invoke with caller-supplied arguments; never fails, errors are rendered as text
    pub async fn invoke(&self, args: Map<String, Value>) -> String {
        debug!("Invoking adapter '{}'", self.record.catalog_key);
        match self.try_invoke(args).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Adapter '{}' failed: {}", self.record.catalog_key, e);
                format!("Error executing {}: {}", self.record.catalog_key, e)
            }
        }
    }

    async fn try_invoke(&self, args: Map<String, Value>) -> Result<String> {
        let native_args = self.native_arguments(args);

        let root = self.binding.cache.get_or_create(&self.record.provider_key).await?;
        let resource = resolve_resource(root, &self.binding.target.accessor_chain)?;
        let raw = resource.invoke(&self.binding.target.method, native_args).await?;

        self.binding.results.normalize(raw).await
    }

    /// Flatten the wrapper, map exposed names back to provider names and fill defaults
    pub fn native_arguments(&self, args: Map<String, Value>) -> Map<String, Value> {
        let flattened = self.flatten_wrapper(args);

        let mut native = Map::with_capacity(flattened.len());
        for (name, value) in flattened {
            let native_name = self.binding.name_map.original_for(&name).unwrap_or(name.as_str()).to_string();
            native.insert(native_name, value);
        }

        for (name, default) in &self.binding.defaults {
            if !native.contains_key(name) {
                native.insert(name.clone(), default.clone());
            }
        }
        native
    }

    /// Merge a `kwargs` object one level deep; explicit top-level arguments win
    fn flatten_wrapper(&self, mut args: Map<String, Value>) -> Map<String, Value> {
        if self.binding.name_map.original_for(WRAPPER_ARGUMENT).is_some() {
            return args;
        }
        match args.remove(WRAPPER_ARGUMENT) {
            Some(Value::Object(inner)) => {
                for (name, value) in inner {
                    args.entry(name).or_insert(value);
                }
                args
            }
            Some(other) => {
                args.insert(WRAPPER_ARGUMENT.to_string(), other);
                args
            }
            None => args,
        }
    }
}

/// Produces adapters bound to a client cache and result normalizer
#[derive(Clone)]
pub struct AdapterSynthesizer {
    cache: Arc<ClientCache>,
    results: ResultNormalizer,
}

impl AdapterSynthesizer {
    pub fn new(cache: Arc<ClientCache>, results: ResultNormalizer) -> Self {
        Self { cache, results }
    }

    /// Build the adapter for one operation. The operation is consumed so every adapter
    /// owns its own copy of the target and name mapping.
    pub fn synthesize(&self, operation: NormalizedOperation, catalog_key: String, provider_key: &str) -> Adapter {
        let defaults = operation
            .parameters
            .iter()
            .filter(|p| !p.required)
            .filter_map(|p| {
                let value = p.default_value.as_ref().filter(|v| !v.is_null())?;
                let native = operation.name_map.original_for(&p.exposed_name).unwrap_or(p.exposed_name.as_str());
                Some((native.to_string(), value.clone()))
            })
            .collect();

        let record = AdapterRecord {
            catalog_key,
            qualified_name: operation.qualified_name,
            parameters: operation.parameters,
            provider_key: provider_key.to_string(),
            summary: operation.summary,
            input_schema: operation.input_schema,
        };

        Adapter {
            record: Arc::new(record),
            binding: Arc::new(Binding {
                target: operation.target,
                name_map: operation.name_map,
                defaults,
                cache: self.cache.clone(),
                results: self.results.clone(),
            }),
        }
    }
}
