//! Extraction from interface-description documents
//!
//! A document declares `methods` and nested `resources`, each method with a
//! `parameters` map (`type`, `required`, `default`, `repeated`, `location`,
//! `description`), an optional `parameterOrder`, and an optional `request` entry that
//! marks a request body.

use crate::client::RestClientFactory;
use crate::descriptor::{
    DefaultValue, OperationDescriptor, OperationTarget, ParameterDescriptor, SourceType, QUALIFIED_NAME_SEPARATOR,
};
use crate::error::{BridgeError, Result};
use crate::extractor::source::{DocumentLoader, DocumentLocation};
use crate::extractor::{DescriptorExtractor, Denylist, Extraction, PreparedProvider, ProviderSource};
use crate::utils::name_sanitizer::title_case_api_name;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Describes every method of a parsed document
pub struct DocumentExtractor {
    name: String,
    document: Arc<Value>,
    denylist: Denylist,
}

impl DocumentExtractor {
    pub fn new(name: impl Into<String>, document: Arc<Value>) -> Self {
        Self {
            name: name.into(),
            document,
            denylist: Denylist::default(),
        }
    }

    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    /// Private (`_`-prefixed) and denylisted names are not operations
    fn is_excluded(&self, name: &str) -> bool {
        if name.starts_with('_') {
            return true;
        }
        if self.denylist.is_denied(name) {
            debug!("Denylisted entry '{}' in document '{}'", name, self.name);
            return true;
        }
        false
    }

    fn walk(&self, node: &Map<String, Value>, chain: &[String], extraction: &mut Extraction) -> Result<()> {
        if let Some(methods) = node.get("methods") {
            let methods = methods
                .as_object()
                .ok_or_else(|| self.malformed(chain, "'methods' is not an object"))?;
            for (method_name, spec) in sorted_entries(methods) {
                if self.is_excluded(method_name) {
                    continue;
                }
                let qualified_name = Self::qualified_name(chain, method_name);
                match self.describe(method_name, spec, chain, &qualified_name) {
                    Ok(descriptor) => extraction.operations.push(descriptor),
                    Err(reason) => extraction.skip(&self.name, qualified_name, reason),
                }
            }
        }

        if let Some(resources) = node.get("resources") {
            let resources = resources
                .as_object()
                .ok_or_else(|| self.malformed(chain, "'resources' is not an object"))?;
            for (resource_name, resource) in sorted_entries(resources) {
                if self.is_excluded(resource_name) {
                    continue;
                }
                let mut nested = chain.to_vec();
                nested.push(resource_name.clone());
                match resource.as_object() {
                    Some(resource) => self.walk(resource, &nested, extraction)?,
                    None => extraction.skip(
                        &self.name,
                        nested.join(QUALIFIED_NAME_SEPARATOR),
                        "resource is not an object",
                    ),
                }
            }
        }
        Ok(())
    }

    fn malformed(&self, chain: &[String], message: &str) -> BridgeError {
        let location = if chain.is_empty() { "<root>".to_string() } else { chain.join(".") };
        BridgeError::discovery(&self.name, format!("malformed document at {}: {}", location, message))
    }

    fn describe(
        &self,
        method_name: &str,
        spec: &Value,
        chain: &[String],
        qualified_name: &str,
    ) -> std::result::Result<OperationDescriptor, String> {
        let spec = spec.as_object().ok_or("method is not an object")?;

        let declared = match spec.get("parameters") {
            None => Map::new(),
            Some(Value::Object(params)) => params.clone(),
            Some(_) => return Err("'parameters' is not an object".to_string()),
        };

        let parameters = Self::ordered_names(spec, &declared)
            .into_iter()
            .filter_map(|name| declared.get(&name).map(|schema| Self::parameter(&name, schema)))
            .collect();

        let summary = spec.get("description").and_then(Value::as_str).unwrap_or("").trim();
        let accepts_body = spec.contains_key("request");
        let target = OperationTarget::nested(chain.to_vec(), method_name);

        OperationDescriptor::new(qualified_name, parameters, accepts_body, summary, target).map_err(|e| e.to_string())
    }

    /// `parameterOrder` first, then the remaining parameters by name
    fn ordered_names(spec: &Map<String, Value>, declared: &Map<String, Value>) -> Vec<String> {
        let mut names: Vec<String> = spec
            .get("parameterOrder")
            .and_then(Value::as_array)
            .map(|order| {
                order
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|name| declared.contains_key(*name))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut rest: Vec<String> = declared.keys().filter(|k| !names.contains(*k)).cloned().collect();
        rest.sort();
        names.extend(rest);
        names
    }

    fn parameter(name: &str, schema: &Value) -> ParameterDescriptor {
        let type_name = schema.get("type").and_then(Value::as_str).unwrap_or("");
        let element = SourceType::from_schema_type(type_name);
        let source_type = if schema.get("repeated").and_then(Value::as_bool).unwrap_or(false) {
            SourceType::List
        } else {
            element
        };

        let required = schema.get("required").and_then(Value::as_bool).unwrap_or(false);
        let descriptor = if required {
            ParameterDescriptor::required(name, source_type)
        } else {
            let default = schema.get("default").cloned().map(DefaultValue::Json);
            ParameterDescriptor::optional(name, source_type, default)
        };

        match schema.get("description").and_then(Value::as_str) {
            Some(description) => descriptor.with_description(description.trim()),
            None => descriptor,
        }
    }

    fn qualified_name(chain: &[String], name: &str) -> String {
        let mut parts = chain.to_vec();
        parts.push(name.to_string());
        parts.join(QUALIFIED_NAME_SEPARATOR)
    }
}

impl DescriptorExtractor for DocumentExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self) -> Result<Extraction> {
        let root = self
            .document
            .as_object()
            .ok_or_else(|| BridgeError::discovery(&self.name, "document is not an object"))?;

        if !root.contains_key("methods") && !root.contains_key("resources") {
            warn!("Document for '{}' declares no methods or resources", self.name);
        }

        let mut extraction = Extraction::default();
        self.walk(root, &[], &mut extraction)?;
        info!(
            "Extracted {} operations from document '{}' ({} skipped)",
            extraction.operations.len(),
            self.name,
            extraction.skipped.len()
        );
        Ok(extraction)
    }
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// A document-described remote API
pub struct DocumentProvider {
    location: DocumentLocation,
    loader: Arc<DocumentLoader>,
    prefix: Option<String>,
    denylist: Denylist,
}

impl DocumentProvider {
    pub fn new(location: DocumentLocation, loader: Arc<DocumentLoader>) -> Self {
        Self {
            location,
            loader,
            prefix: None,
            denylist: Denylist::default(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Replace the denylist applied to method and resource names
    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    fn provider_key(&self, document: &Value) -> String {
        if let DocumentLocation::Api { name, version } = &self.location {
            return format!("{}:{}", name, version);
        }
        let name = document.get("name").and_then(Value::as_str);
        let version = document.get("version").and_then(Value::as_str);
        match (name, version) {
            (Some(name), Some(version)) => format!("{}:{}", name, version),
            (Some(name), None) => name.to_string(),
            _ => self.location.to_string(),
        }
    }

    fn catalog_prefix(&self, document: &Value) -> String {
        if let Some(prefix) = &self.prefix {
            return prefix.clone();
        }
        let api_name = match &self.location {
            DocumentLocation::Api { name, .. } => Some(name.as_str()),
            _ => document.get("name").and_then(Value::as_str),
        };
        api_name.map(title_case_api_name).unwrap_or_default()
    }
}

#[async_trait]
impl ProviderSource for DocumentProvider {
    fn name(&self) -> String {
        self.location.to_string()
    }

    async fn prepare(&self) -> Result<PreparedProvider> {
        let document = Arc::new(self.loader.load(&self.location).await?);
        let provider_key = self.provider_key(&document);
        let extraction = DocumentExtractor::new(&provider_key, document.clone())
            .with_denylist(self.denylist.clone())
            .extract()?;

        Ok(PreparedProvider {
            catalog_prefix: self.catalog_prefix(&document),
            provider_key,
            extraction,
            factory: Arc::new(RestClientFactory::new(document)),
        })
    }
}
