//! Discovery orchestration
//!
//! Runs the extract, normalize, sanitize, synthesize and register pipeline for every
//! configured provider on a bounded pool of concurrent workers. A provider that fails
//! (or panics) is reported and does not affect the others.

use crate::adapter::AdapterSynthesizer;
use crate::client::ClientCache;
use crate::error::{BridgeError, Result};
use crate::extractor::{PreparedProvider, ProviderSource, SkippedOperation};
use crate::registry::overrides::SummaryOverrides;
use crate::registry::service::AdapterRegistry;
use crate::result::ResultNormalizer;
use crate::schema::SchemaNormalizer;
use crate::utils::name_sanitizer::{catalog_key_for, DEFAULT_MAX_KEY_LENGTH, MIN_KEY_LENGTH};
use futures_util::{stream, FutureExt, StreamExt};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome of discovering one provider
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderOutcome {
    /// Provider name as configured
    pub provider: String,
    /// Client cache identity, once known
    pub provider_key: Option<String>,
    /// Catalog keys registered for this provider
    pub registered: Vec<String>,
    /// Catalog keys rejected because they were already registered
    pub conflicts: Vec<String>,
    /// Operations that could not be described
    pub skipped: Vec<SkippedOperation>,
    /// Set when the provider as a whole failed
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ProviderOutcome {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of one discovery run
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// One entry per provider, sorted by provider name
    pub providers: Vec<ProviderOutcome>,
    pub duration_ms: u64,
}

impl DiscoveryReport {
    pub fn total_registered(&self) -> usize {
        self.providers.iter().map(|p| p.registered.len()).sum()
    }

    pub fn total_conflicts(&self) -> usize {
        self.providers.iter().map(|p| p.conflicts.len()).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.providers.iter().map(|p| p.skipped.len()).sum()
    }

    pub fn failed_providers(&self) -> Vec<&ProviderOutcome> {
        self.providers.iter().filter(|p| p.is_failed()).collect()
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderOutcome> {
        self.providers.iter().find(|p| p.provider == name)
    }
}

/// Drives discovery into an [`AdapterRegistry`]
pub struct DiscoveryOrchestrator {
    registry: Arc<AdapterRegistry>,
    cache: Arc<ClientCache>,
    normalizer: SchemaNormalizer,
    synthesizer: AdapterSynthesizer,
    overrides: SummaryOverrides,
    workers: usize,
    max_key_length: usize,
}

impl DiscoveryOrchestrator {
    pub fn new(registry: Arc<AdapterRegistry>, cache: Arc<ClientCache>) -> Self {
        let synthesizer = AdapterSynthesizer::new(cache.clone(), ResultNormalizer::default());
        Self {
            registry,
            cache,
            normalizer: SchemaNormalizer::new(),
            synthesizer,
            overrides: SummaryOverrides::empty(),
            workers: crate::config::DEFAULT_WORKERS,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Limit catalog keys to `max_key_length` characters; the limit must leave room for
    /// a prefix, the hash and a suffix
    pub fn with_max_key_length(mut self, max_key_length: usize) -> Result<Self> {
        if max_key_length < MIN_KEY_LENGTH {
            return Err(BridgeError::config(format!(
                "max key length {} is below the minimum of {}",
                max_key_length, MIN_KEY_LENGTH
            )));
        }
        self.max_key_length = max_key_length;
        Ok(self)
    }

    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.synthesizer = AdapterSynthesizer::new(self.cache.clone(), ResultNormalizer::new(page_cap));
        self
    }

    pub fn with_overrides(mut self, overrides: SummaryOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    /// Discover every source with at most `workers` providers in flight
    pub async fn discover(&self, sources: Vec<Arc<dyn ProviderSource>>) -> DiscoveryReport {
        let started = Instant::now();
        info!(
            "Discovering {} providers with {} workers",
            sources.len(),
            self.workers
        );

        let mut providers: Vec<ProviderOutcome> = stream::iter(sources)
            .map(|source| self.discover_isolated(source))
            .buffer_unordered(self.workers)
            .collect()
            .await;
        providers.sort_by(|a, b| a.provider.cmp(&b.provider));

        let report = DiscoveryReport {
            providers,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "Discovery finished: {} adapters registered, {} conflicts, {} skipped, {} providers failed in {}ms",
            report.total_registered(),
            report.total_conflicts(),
            report.total_skipped(),
            report.failed_providers().len(),
            report.duration_ms
        );
        report
    }

    async fn discover_isolated(&self, source: Arc<dyn ProviderSource>) -> ProviderOutcome {
        let name = source.name();
        let started = Instant::now();

        let mut outcome = match AssertUnwindSafe(self.discover_provider(&name, source)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Discovery of provider '{}' panicked", name);
                ProviderOutcome {
                    provider: name.clone(),
                    error: Some("provider panicked during discovery".to_string()),
                    ..ProviderOutcome::default()
                }
            }
        };
        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    async fn discover_provider(&self, name: &str, source: Arc<dyn ProviderSource>) -> ProviderOutcome {
        let mut outcome = ProviderOutcome {
            provider: name.to_string(),
            ..ProviderOutcome::default()
        };

        let prepared = match source.prepare().await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("Discovery of provider '{}' failed: {}", name, e);
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };

        self.register_prepared(prepared, &mut outcome);
        info!(
            "Registered {} adapters for '{}' ({} conflicts, {} skipped)",
            outcome.registered.len(),
            name,
            outcome.conflicts.len(),
            outcome.skipped.len()
        );
        outcome
    }

    fn register_prepared(&self, prepared: PreparedProvider, outcome: &mut ProviderOutcome) {
        let PreparedProvider {
            provider_key,
            catalog_prefix,
            extraction,
            factory,
        } = prepared;

        self.cache.register_factory(&provider_key, factory);
        outcome.provider_key = Some(provider_key.clone());
        outcome.skipped = extraction.skipped;

        for mut descriptor in extraction.operations {
            if let Some(summary) = self.overrides.lookup(&provider_key, &descriptor.qualified_name) {
                descriptor.summary = summary.to_string();
            }

            let normalized = self.normalizer.normalize_operation(&descriptor);
            let catalog_key = catalog_key_for(&catalog_prefix, &normalized.qualified_name, self.max_key_length);
            let adapter = self.synthesizer.synthesize(normalized, catalog_key.clone(), &provider_key);

            match self.registry.register(adapter) {
                Ok(()) => outcome.registered.push(catalog_key),
                Err(BridgeError::RegistrationConflict { catalog_key }) => outcome.conflicts.push(catalog_key),
                Err(e) => {
                    warn!("Failed to register '{}': {}", catalog_key, e);
                    outcome.skipped.push(SkippedOperation {
                        qualified_name: descriptor.qualified_name,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
