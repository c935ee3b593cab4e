//! Executes operations of an interface-description document over HTTP

use crate::client::credentials::Credentials;
use crate::client::provider::{ClientFactory, ProviderClient};
use crate::error::{BridgeError, Result};
use crate::result::RawResult;
use async_trait::async_trait;
use reqwest::{Client, Method};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Argument carrying the JSON request body
pub const BODY_ARGUMENT: &str = "body";

/// Base URL of the service described by a document: `rootUrl + servicePath`, or `baseUrl`
pub fn service_base_url(document: &Value) -> Option<String> {
    if let Some(root) = document.get("rootUrl").and_then(Value::as_str) {
        let service_path = document.get("servicePath").and_then(Value::as_str).unwrap_or("");
        return Some(format!("{}{}", root, service_path));
    }
    document.get("baseUrl").and_then(Value::as_str).map(str::to_string)
}

/// Builds [`RestResourceClient`]s for one document
pub struct RestClientFactory {
    document: Arc<Value>,
}

impl RestClientFactory {
    pub fn new(document: Arc<Value>) -> Self {
        Self { document }
    }

    fn declared_scopes(&self) -> Vec<String> {
        self.document
            .pointer("/auth/oauth2/scopes")
            .and_then(Value::as_object)
            .map(|scopes| scopes.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ClientFactory for RestClientFactory {
    fn scopes(&self) -> Vec<String> {
        self.declared_scopes()
    }

    async fn build(&self, provider_key: &str, credentials: Credentials) -> Result<Arc<dyn ProviderClient>> {
        let base_url = service_base_url(&self.document)
            .ok_or_else(|| BridgeError::client_construction(provider_key, "document declares no rootUrl or baseUrl"))?;
        Url::parse(&base_url).map_err(|e| {
            BridgeError::client_construction(provider_key, format!("invalid base URL '{}': {}", base_url, e))
        })?;

        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| BridgeError::client_construction(provider_key, format!("failed to create HTTP client: {}", e)))?;

        Ok(Arc::new(RestResourceClient {
            shared: Arc::new(RestShared {
                http,
                base_url,
                document: self.document.clone(),
                credentials,
            }),
            resource_path: Vec::new(),
        }))
    }
}

struct RestShared {
    http: Client,
    base_url: String,
    document: Arc<Value>,
    credentials: Credentials,
}

/// Client positioned at one resource of the document
pub struct RestResourceClient {
    shared: Arc<RestShared>,
    resource_path: Vec<String>,
}

impl RestResourceClient {
    fn node(&self) -> Option<&Value> {
        let mut node = self.shared.document.as_ref();
        for name in &self.resource_path {
            node = node.get("resources")?.get(name)?;
        }
        Some(node)
    }

    fn display_path(&self, method: &str) -> String {
        let mut parts = self.resource_path.clone();
        parts.push(method.to_string());
        parts.join(".")
    }

    fn build_url(&self, method_id: &str, spec: &Value, args: &mut Map<String, Value>) -> Result<Url> {
        let template = spec
            .get("path")
            .or_else(|| spec.get("flatPath"))
            .and_then(Value::as_str)
            .ok_or_else(|| BridgeError::invocation(method_id, "method declares no path"))?;

        let declared = spec.get("parameters").and_then(Value::as_object);
        let mut path = template.to_string();
        let mut query: Vec<(String, String)> = Vec::new();

        if let Some(declared) = declared {
            for (name, param) in declared {
                let Some(value) = args.remove(name) else { continue };
                if value.is_null() {
                    continue;
                }
                if param.get("location").and_then(Value::as_str) == Some("path") {
                    let reserved = format!("{{+{}}}", name);
                    let simple = format!("{{{}}}", name);
                    let text = scalar_text(&value);
                    path = path
                        .replace(&reserved, &encode_reserved(&text))
                        .replace(&simple, &urlencoding::encode(&text));
                } else {
                    push_query(&mut query, name, &value);
                }
            }
        }

        // Undeclared arguments travel as query parameters
        let extra: Vec<String> = args.keys().filter(|k| k.as_str() != BODY_ARGUMENT).cloned().collect();
        for name in extra {
            if let Some(value) = args.remove(&name) {
                if !value.is_null() {
                    push_query(&mut query, &name, &value);
                }
            }
        }

        if path.contains('{') {
            return Err(BridgeError::invocation(
                method_id,
                format!("missing path parameter in '{}'", path),
            ));
        }

        let full = format!(
            "{}/{}",
            self.shared.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&full).map_err(|e| BridgeError::invocation(method_id, format!("invalid URL '{}': {}", full, e)))?;

        if let Some(key) = &self.shared.credentials.api_key {
            query.push(("key".to_string(), key.expose_secret().clone()));
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `{+name}` expansion keeps `/` and `:` literal and percent-encodes the rest
fn encode_reserved(text: &str) -> String {
    urlencoding::encode(text)
        .replace("%2F", "/")
        .replace("%3A", ":")
}

fn push_query(query: &mut Vec<(String, String)>, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                query.push((name.to_string(), scalar_text(item)));
            }
        }
        other => query.push((name.to_string(), scalar_text(other))),
    }
}

#[async_trait]
impl ProviderClient for RestResourceClient {
    fn resource(&self, name: &str) -> Result<Arc<dyn ProviderClient>> {
        let exists = self
            .node()
            .and_then(|node| node.get("resources"))
            .and_then(|resources| resources.get(name))
            .is_some();
        if !exists {
            return Err(BridgeError::validation(format!(
                "Unknown resource '{}'",
                self.display_path(name)
            )));
        }

        let mut resource_path = self.resource_path.clone();
        resource_path.push(name.to_string());
        Ok(Arc::new(RestResourceClient {
            shared: self.shared.clone(),
            resource_path,
        }))
    }

    async fn invoke(&self, method: &str, mut args: Map<String, Value>) -> Result<RawResult> {
        let display = self.display_path(method);
        let spec = self
            .node()
            .and_then(|node| node.get("methods"))
            .and_then(|methods| methods.get(method))
            .ok_or_else(|| BridgeError::validation(format!("Unknown method '{}'", display)))?;

        let method_id = spec.get("id").and_then(Value::as_str).unwrap_or(display.as_str()).to_string();
        let http_method = spec.get("httpMethod").and_then(Value::as_str).unwrap_or("GET");
        let http_method = Method::from_bytes(http_method.to_uppercase().as_bytes())
            .map_err(|e| BridgeError::invocation(&method_id, format!("unsupported HTTP method: {}", e)))?;

        let body = args.remove(BODY_ARGUMENT).filter(|b| !b.is_null());
        let url = self.build_url(&method_id, spec, &mut args)?;
        debug!("Executing {} {} for '{}'", http_method, url, method_id);

        let mut request = self.shared.http.request(http_method, url);
        if let Some(auth) = self.shared.credentials.authorization_header() {
            request = request.header("Authorization", auth);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(BridgeError::invocation(
                method_id,
                format!("HTTP request failed with status {}: {}", status, text.trim()),
            ));
        }
        if text.trim().is_empty() {
            return Ok(RawResult::Null);
        }
        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(value) => RawResult::from(value),
            Err(_) => RawResult::Value(Value::String(text)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::provider::resolve_resource;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn document(root: &str) -> Value {
        json!({
            "name": "library",
            "version": "v1",
            "rootUrl": format!("{}/", root),
            "servicePath": "library/v1/",
            "resources": {
                "shelves": {
                    "methods": {
                        "get": {
                            "id": "library.shelves.get",
                            "path": "shelves/{shelfId}",
                            "httpMethod": "GET",
                            "parameters": {
                                "shelfId": { "type": "string", "location": "path", "required": true },
                                "view": { "type": "string", "location": "query" }
                            }
                        }
                    },
                    "resources": {
                        "books": {
                            "methods": {
                                "create": {
                                    "id": "library.shelves.books.create",
                                    "path": "{+parent}/books",
                                    "httpMethod": "POST",
                                    "parameters": {
                                        "parent": { "type": "string", "location": "path", "required": true }
                                    },
                                    "request": { "$ref": "Book" }
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    async fn root_client(server: &MockServer, credentials: Credentials) -> Arc<dyn ProviderClient> {
        RestClientFactory::new(Arc::new(document(&server.uri())))
            .build("library:v1", credentials)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_path_and_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/v1/shelves/fiction%20A"))
            .and(query_param("view", "FULL"))
            .and(header("Authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "shelves/1"})))
            .mount(&server)
            .await;

        let root = root_client(&server, Credentials::anonymous().with_access_token("token-1")).await;
        let shelves = resolve_resource(root, &["shelves".to_string()]).unwrap();

        let mut args = Map::new();
        args.insert("shelfId".into(), json!("fiction A"));
        args.insert("view".into(), json!("FULL"));
        let result = shelves.invoke("get", args).await.unwrap();
        match result {
            RawResult::Value(value) => assert_eq!(value["name"], "shelves/1"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reserved_expansion_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/library/v1/shelves/1/books"))
            .and(query_param("key", "k-123"))
            .and(body_json(json!({"title": "Dune"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"title": "Dune"})))
            .mount(&server)
            .await;

        let root = root_client(&server, Credentials::anonymous().with_api_key("k-123")).await;
        let books = resolve_resource(root, &["shelves".to_string(), "books".to_string()]).unwrap();

        let mut args = Map::new();
        args.insert("parent".into(), json!("shelves/1"));
        args.insert("body".into(), json!({"title": "Dune"}));
        assert!(books.invoke("create", args).await.is_ok());
    }

    #[tokio::test]
    async fn test_reserved_expansion_encodes_unsafe_characters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/library/v1/shelves/a%20b%3Fc%23d/books"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let root = root_client(&server, Credentials::anonymous()).await;
        let books = resolve_resource(root, &["shelves".to_string(), "books".to_string()]).unwrap();

        let mut args = Map::new();
        args.insert("parent".into(), json!("shelves/a b?c#d"));
        assert!(books.invoke("create", args).await.is_ok());

        assert_eq!(encode_reserved("projects/p-1/locations/us:east"), "projects/p-1/locations/us:east");
        assert_eq!(encode_reserved("a&b=c"), "a%26b%3Dc");
    }

    #[tokio::test]
    async fn test_http_error_status_is_invocation_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("shelf not found"))
            .mount(&server)
            .await;

        let root = root_client(&server, Credentials::anonymous()).await;
        let shelves = root.resource("shelves").unwrap();
        let mut args = Map::new();
        args.insert("shelfId".into(), json!("9"));
        let err = shelves.invoke("get", args).await.err().unwrap();
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("shelf not found"));
    }

    #[tokio::test]
    async fn test_unknown_resource_and_missing_path_param() {
        let server = MockServer::start().await;
        let root = root_client(&server, Credentials::anonymous()).await;
        assert!(root.resource("authors").is_err());

        let shelves = root.resource("shelves").unwrap();
        let err = shelves.invoke("get", Map::new()).await.err().unwrap();
        assert!(err.to_string().contains("missing path parameter"));
    }

    #[tokio::test]
    async fn test_document_without_base_url_fails_construction() {
        let factory = RestClientFactory::new(Arc::new(json!({"name": "x"})));
        let err = factory.build("x:v1", Credentials::anonymous()).await.err().unwrap();
        assert!(matches!(err, BridgeError::ClientConstruction { .. }));
    }
}
