//! Locating and loading interface-description documents

use crate::error::{BridgeError, Result};
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Public discovery directory; `{name}` and `{version}` are substituted
pub const DEFAULT_DOCUMENT_URL_TEMPLATE: &str = "https://www.googleapis.com/discovery/v1/apis/{name}/{version}/rest";

/// Where a document comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentLocation {
    /// Already parsed
    Inline(Value),
    /// JSON or YAML file
    File(PathBuf),
    Url(String),
    /// Resolved through the loader's URL template
    Api { name: String, version: String },
}

impl DocumentLocation {
    pub fn api(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Api {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse a `name:version` pair
    pub fn parse_api(spec: &str) -> Option<Self> {
        let (name, version) = spec.trim().split_once(':')?;
        let (name, version) = (name.trim(), version.trim());
        if name.is_empty() || version.is_empty() || version.contains(':') {
            return None;
        }
        Some(Self::api(name, version))
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentLocation::Inline(_) => write!(f, "<inline document>"),
            DocumentLocation::File(path) => write!(f, "{}", path.display()),
            DocumentLocation::Url(url) => write!(f, "{}", url),
            DocumentLocation::Api { name, version } => write!(f, "{}:{}", name, version),
        }
    }
}

/// Fetches and parses documents
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    http: Client,
    url_template: String,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl DocumentLoader {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            url_template: DEFAULT_DOCUMENT_URL_TEMPLATE.to_string(),
        }
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    pub fn resolve_url(&self, name: &str, version: &str) -> String {
        self.url_template
            .replace("{name}", &urlencoding::encode(name))
            .replace("{version}", &urlencoding::encode(version))
    }

    pub async fn load(&self, location: &DocumentLocation) -> Result<Value> {
        let label = location.to_string();
        let document = match location {
            DocumentLocation::Inline(document) => document.clone(),
            DocumentLocation::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    BridgeError::discovery(&label, format!("failed to read '{}': {}", path.display(), e))
                })?;
                Self::parse(&label, &content)?
            }
            DocumentLocation::Url(url) => self.fetch(&label, url).await?,
            DocumentLocation::Api { name, version } => {
                let url = self.resolve_url(name, version);
                self.fetch(&label, &url).await?
            }
        };

        if !document.is_object() {
            return Err(BridgeError::discovery(label, "document is not an object"));
        }
        Ok(document)
    }

    async fn fetch(&self, label: &str, url: &str) -> Result<Value> {
        info!("Fetching interface document for '{}' from {}", label, url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::discovery(label, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::discovery(label, format!("fetch failed with status {}", status)));
        }

        let content = response
            .text()
            .await
            .map_err(|e| BridgeError::discovery(label, format!("failed to read body: {}", e)))?;
        debug!("Fetched {} bytes for '{}'", content.len(), label);
        Self::parse(label, &content)
    }

    /// Parse JSON, falling back to YAML
    pub fn parse(label: &str, content: &str) -> Result<Value> {
        if let Ok(value) = serde_json::from_str::<Value>(content) {
            return Ok(value);
        }
        serde_yaml::from_str::<Value>(content)
            .map_err(|e| BridgeError::discovery(label, format!("failed to parse document: {}", e)))
    }
}
