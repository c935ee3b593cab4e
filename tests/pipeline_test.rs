//! End-to-end discovery and invocation through the orchestrator

use async_trait::async_trait;
use capbridge::client::{AnonymousCredentials, ClientCache, ClientFactory, Credentials, ProviderClient};
use capbridge::descriptor::{DefaultValue, SourceType};
use capbridge::extractor::{
    DocumentLoader, DocumentLocation, DocumentProvider, MemberInfo, ParamInfo, ProviderSource,
    ReflectiveProvider, ReflectiveSurface,
};
use capbridge::registry::{AdapterRegistry, DiscoveryOrchestrator};
use capbridge::result::RawResult;
use capbridge::utils::name_sanitizer::short_hash;
use capbridge::{BridgeError, Result};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

type Calls = Arc<Mutex<Vec<(String, Map<String, Value>)>>>;

struct Surface {
    type_name: String,
    members: Vec<MemberInfo>,
}

impl ReflectiveSurface for Surface {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn members(&self) -> Vec<MemberInfo> {
        self.members.clone()
    }
}

/// Records every call; `fail` raises, `get` echoes its id, everything else returns "ok"
struct RecordingClient {
    calls: Calls,
}

#[async_trait]
impl ProviderClient for RecordingClient {
    async fn invoke(&self, method: &str, args: Map<String, Value>) -> Result<RawResult> {
        self.calls.lock().unwrap().push((method.to_string(), args.clone()));
        match method {
            "fail" => Err(BridgeError::invocation(method, "backend exploded")),
            "get" => Ok(RawResult::Value(args.get("id").cloned().unwrap_or(Value::Null))),
            _ => Ok(RawResult::Value(json!("ok"))),
        }
    }
}

struct RecordingFactory {
    calls: Calls,
}

#[async_trait]
impl ClientFactory for RecordingFactory {
    async fn build(&self, _provider_key: &str, _credentials: Credentials) -> Result<Arc<dyn ProviderClient>> {
        Ok(Arc::new(RecordingClient {
            calls: self.calls.clone(),
        }))
    }
}

fn orchestrator() -> DiscoveryOrchestrator {
    DiscoveryOrchestrator::new(
        Arc::new(AdapterRegistry::new()),
        Arc::new(ClientCache::new(Arc::new(AnonymousCredentials))),
    )
}

fn provider(type_name: &str, members: Vec<MemberInfo>, calls: &Calls) -> Arc<dyn ProviderSource> {
    Arc::new(ReflectiveProvider::new(
        Arc::new(Surface {
            type_name: type_name.to_string(),
            members,
        }),
        Arc::new(RecordingFactory { calls: calls.clone() }),
    ))
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn test_discover_and_invoke_scalar_operation() {
    let calls: Calls = Arc::default();
    let members = vec![
        MemberInfo::function("get", vec![ParamInfo::required("id", SourceType::Int)]),
        MemberInfo::function(
            "list",
            vec![ParamInfo::optional("filter", SourceType::Str, DefaultValue::Json(json!("")))],
        ),
    ];
    let orchestrator = orchestrator();
    let report = orchestrator.discover(vec![provider("RecordClient", members, &calls)]).await;

    assert_eq!(report.total_registered(), 2);
    let registry = orchestrator.registry();
    assert_eq!(registry.keys(), vec!["Record_get".to_string(), "Record_list".to_string()]);

    let get = registry.get("Record_get").unwrap();
    assert_eq!(get.input_schema["required"], json!(["id"]));
    assert_eq!(get.input_schema["properties"]["id"]["type"], "integer");

    let output = registry.invoke("Record_get", args(json!({"id": 5}))).await;
    assert_eq!(output, "5");

    let recorded = calls.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "get");
    assert_eq!(recorded[0].1.get("id"), Some(&json!(5)));
}

#[tokio::test]
async fn test_optional_default_is_filled_on_invoke() {
    let calls: Calls = Arc::default();
    let members = vec![MemberInfo::function(
        "list",
        vec![ParamInfo::optional("filter", SourceType::Str, DefaultValue::Json(json!("")))],
    )];
    let orchestrator = orchestrator();
    orchestrator.discover(vec![provider("RecordClient", members, &calls)]).await;

    let output = orchestrator.registry().invoke("Record_list", Map::new()).await;
    assert_eq!(output, "ok");
    assert_eq!(calls.lock().unwrap()[0].1.get("filter"), Some(&json!("")));
}

#[tokio::test]
async fn test_long_invalid_name_is_bounded_and_invocable() {
    let calls: Calls = Arc::default();
    let name = format!("a{}bcdefghij", "!".repeat(80));
    assert_eq!(name.len(), 90);

    let orchestrator = orchestrator();
    let report = orchestrator
        .discover(vec![provider("ThingClient", vec![MemberInfo::function(name.clone(), vec![])], &calls)])
        .await;

    let key = report.provider("ThingClient").unwrap().registered[0].clone();
    assert!(key.len() <= 64);
    assert!(key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    assert!(key.contains(&short_hash(&format!("Thing_{}", name))));

    let output = orchestrator.registry().invoke(&key, Map::new()).await;
    assert_eq!(output, "ok");
    assert_eq!(calls.lock().unwrap()[0].0, name);
}

#[tokio::test]
async fn test_failing_call_returns_error_text() {
    let calls: Calls = Arc::default();
    let orchestrator = orchestrator();
    orchestrator
        .discover(vec![provider("RecordClient", vec![MemberInfo::function("fail", vec![])], &calls)])
        .await;

    let output = orchestrator.registry().invoke("Record_fail", Map::new()).await;
    assert!(output.contains("Record_fail"));
    assert!(output.contains("backend exploded"));
}

#[tokio::test]
async fn test_unreachable_provider_does_not_block_others() {
    let calls: Calls = Arc::default();
    let operation = || vec![MemberInfo::function("ping", vec![])];
    let unreachable: Arc<dyn ProviderSource> = Arc::new(DocumentProvider::new(
        DocumentLocation::Url("http://127.0.0.1:1/unreachable.json".to_string()),
        Arc::new(DocumentLoader::default()),
    ));

    let orchestrator = orchestrator().with_workers(2);
    let report = orchestrator
        .discover(vec![
            provider("OneClient", operation(), &calls),
            provider("TwoClient", operation(), &calls),
            unreachable,
            provider("FourClient", operation(), &calls),
            provider("FiveClient", operation(), &calls),
        ])
        .await;

    assert_eq!(report.providers.len(), 5);
    let failed = report.failed_providers();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].provider, "http://127.0.0.1:1/unreachable.json");

    let keys = orchestrator.registry().keys();
    assert_eq!(keys, vec!["Five_ping", "Four_ping", "One_ping", "Two_ping"]);
}

#[tokio::test]
async fn test_wrapper_arguments_are_flattened() {
    let calls: Calls = Arc::default();
    let members = vec![MemberInfo::function("get", vec![ParamInfo::required("id", SourceType::Int)])];
    let orchestrator = orchestrator();
    orchestrator.discover(vec![provider("RecordClient", members, &calls)]).await;

    let output = orchestrator
        .registry()
        .invoke("Record_get", args(json!({"kwargs": {"id": 7}})))
        .await;
    assert_eq!(output, "7");
}

#[tokio::test]
async fn test_two_providers_same_prefix_conflict() {
    let calls: Calls = Arc::default();
    let orchestrator = orchestrator().with_workers(1);
    let report = orchestrator
        .discover(vec![
            provider("RecordClient", vec![MemberInfo::function("get", vec![])], &calls),
            provider("RecordService", vec![MemberInfo::function("get", vec![])], &calls),
        ])
        .await;

    assert_eq!(report.total_registered(), 1);
    assert_eq!(report.total_conflicts(), 1);
    assert_eq!(orchestrator.registry().len(), 1);
}
