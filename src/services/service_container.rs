//! Service container holding the shared catalog services

use crate::client::{ClientCache, ClientFactory, EnvCredentialProvider};
use crate::config::Config;
use crate::error::Result;
use crate::extractor::{DocumentLoader, DocumentProvider, ProviderSource, ReflectiveProvider, ReflectiveSurface};
use crate::registry::{AdapterRegistry, DiscoveryOrchestrator, DiscoveryReport, SummaryOverrides};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registry, client cache and orchestrator built from one configuration
pub struct ServiceContainer {
    config: Config,
    registry: Arc<AdapterRegistry>,
    cache: Arc<ClientCache>,
    loader: Arc<DocumentLoader>,
    orchestrator: DiscoveryOrchestrator,
}

impl ServiceContainer {
    /// Wire every service from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(AdapterRegistry::new());
        let credentials = Arc::new(EnvCredentialProvider::new(config.discovery.credential_prefix.clone()));
        let cache = Arc::new(ClientCache::new(credentials));

        let http = reqwest::Client::builder().use_rustls_tls().build()?;
        let loader = Arc::new(DocumentLoader::new(http).with_url_template(config.discovery.document_url_template.clone()));

        let overrides = match &config.discovery.docs_dir {
            Some(dir) => SummaryOverrides::load(dir),
            None => SummaryOverrides::empty(),
        };

        let orchestrator = DiscoveryOrchestrator::new(registry.clone(), cache.clone())
            .with_workers(config.discovery.workers)
            .with_max_key_length(config.catalog.max_key_length)?
            .with_page_cap(config.catalog.page_cap)
            .with_overrides(overrides);

        debug!("Service container initialized");
        Ok(Self {
            config,
            registry,
            cache,
            loader,
            orchestrator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    /// Sources for every configured document provider; invalid entries are skipped
    pub fn document_sources(&self) -> Vec<Arc<dyn ProviderSource>> {
        self.config
            .providers
            .iter()
            .filter_map(|provider| match provider.location() {
                Ok(location) => {
                    let source = DocumentProvider::new(location, self.loader.clone())
                        .with_denylist(self.config.discovery.denylist());
                    let source = match &provider.prefix {
                        Some(prefix) => source.with_prefix(prefix.clone()),
                        None => source,
                    };
                    Some(Arc::new(source) as Arc<dyn ProviderSource>)
                }
                Err(e) => {
                    warn!("Skipping provider '{}': {}", provider.name, e);
                    None
                }
            })
            .collect()
    }

    /// A reflective provider using the configured denylist
    pub fn reflective_source(
        &self,
        surface: Arc<dyn ReflectiveSurface>,
        factory: Arc<dyn ClientFactory>,
    ) -> ReflectiveProvider {
        ReflectiveProvider::new(surface, factory).with_denylist(self.config.discovery.denylist())
    }

    /// Discover the configured document providers plus any extra sources
    pub async fn discover(&self, extra_sources: Vec<Arc<dyn ProviderSource>>) -> DiscoveryReport {
        let mut sources = self.document_sources();
        sources.extend(extra_sources);
        info!("🔍 Starting discovery of {} providers", sources.len());
        self.orchestrator.discover(sources).await
    }

    /// Drop cached clients
    pub fn shutdown(&self) {
        self.cache.clear();
        info!("Service container shut down");
    }
}
