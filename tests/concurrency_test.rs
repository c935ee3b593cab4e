//! Concurrent first use of adapters sharing one provider client

use async_trait::async_trait;
use capbridge::client::{AnonymousCredentials, ClientCache, ClientFactory, Credentials, ProviderClient};
use capbridge::extractor::{MemberInfo, ProviderSource, ReflectiveProvider, ReflectiveSurface};
use capbridge::registry::{AdapterRegistry, DiscoveryOrchestrator};
use capbridge::result::RawResult;
use capbridge::Result;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Maps;

impl ReflectiveSurface for Maps {
    fn type_name(&self) -> &str {
        "MapsClient"
    }

    fn members(&self) -> Vec<MemberInfo> {
        vec![
            MemberInfo::function("geocode", vec![]).with_doc("Geocode an address."),
            MemberInfo::function("route", vec![]),
            MemberInfo::function("_private", vec![]),
            MemberInfo::function("from_service_account_file", vec![]),
            MemberInfo::property("transport"),
        ]
    }
}

struct MapsClient;

#[async_trait]
impl ProviderClient for MapsClient {
    async fn invoke(&self, method: &str, _args: Map<String, Value>) -> Result<RawResult> {
        Ok(RawResult::Value(json!({ "method": method })))
    }
}

#[derive(Default)]
struct SlowFactory {
    built: AtomicUsize,
}

#[async_trait]
impl ClientFactory for SlowFactory {
    async fn build(&self, _provider_key: &str, _credentials: Credentials) -> Result<Arc<dyn ProviderClient>> {
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MapsClient))
    }
}

#[tokio::test]
async fn test_concurrent_invocations_share_one_client() {
    let cache = Arc::new(ClientCache::new(Arc::new(AnonymousCredentials)));
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(AdapterRegistry::new()), cache.clone());
    let factory = Arc::new(SlowFactory::default());

    let source: Arc<dyn ProviderSource> = Arc::new(ReflectiveProvider::new(Arc::new(Maps), factory.clone()));
    let report = orchestrator.discover(vec![source]).await;
    assert_eq!(report.total_registered(), 2);
    assert_eq!(orchestrator.registry().keys(), vec!["Maps_geocode", "Maps_route"]);
    assert_eq!(orchestrator.registry().get("Maps_geocode").unwrap().summary, "Geocode an address.");

    let registry = orchestrator.registry().clone();
    let calls = (0..40).map(|i| {
        let registry = registry.clone();
        async move {
            let key = if i % 2 == 0 { "Maps_geocode" } else { "Maps_route" };
            registry.invoke(key, Map::new()).await
        }
    });
    let outputs = join_all(calls).await;

    assert!(outputs.iter().all(|output| output.contains("\"method\"")));
    assert_eq!(factory.built.load(Ordering::SeqCst), 1);
    assert_eq!(cache.constructions("MapsClient"), 1);
}

#[tokio::test]
async fn test_registry_metadata_tracks_providers() {
    let cache = Arc::new(ClientCache::new(Arc::new(AnonymousCredentials)));
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(AdapterRegistry::new()), cache);
    let source: Arc<dyn ProviderSource> =
        Arc::new(ReflectiveProvider::new(Arc::new(Maps), Arc::new(SlowFactory::default())));
    orchestrator.discover(vec![source]).await;

    let metadata = orchestrator.registry().metadata();
    assert_eq!(metadata.adapter_count, 2);
    assert_eq!(metadata.provider_count, 1);
    assert!(metadata.last_updated.is_some());
}
