//! Descriptor extraction
//!
//! Extractors turn a provider (a reflective client surface, or an interface-description
//! document) into [`OperationDescriptor`]s. Operations that cannot be described are
//! skipped and reported, never fatal for the rest of the provider.

pub mod document;
pub mod reflective;
pub mod source;

use crate::client::ClientFactory;
use crate::descriptor::OperationDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub use document::{DocumentExtractor, DocumentProvider};
pub use reflective::{MemberInfo, MemberKind, ParamInfo, ReflectiveExtractor, ReflectiveProvider, ReflectiveSurface};
pub use source::{DocumentLoader, DocumentLocation, DEFAULT_DOCUMENT_URL_TEMPLATE};

/// Factory constructors, path helpers and lifecycle hooks of typical client libraries
pub const DEFAULT_DENYLIST: &[&str] = &[
    "from_service_account_file",
    "from_service_account_info",
    "from_service_account_json",
    "get_mtls_endpoint_and_cert_source",
    "common_*_path",
    "parse_common_*_path",
    "create_session",
    "termination_signal_handler",
    "cancellation_signal_handler",
    "clear_experience_id",
    "get_experience_id",
    "set_experience_id",
];

/// An operation that was seen but not described
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedOperation {
    pub qualified_name: String,
    pub reason: String,
}

/// Output of one extraction run
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub operations: Vec<OperationDescriptor>,
    pub skipped: Vec<SkippedOperation>,
}

impl Extraction {
    /// Record a skipped operation and log it
    pub fn skip(&mut self, provider: &str, qualified_name: impl Into<String>, reason: impl Into<String>) {
        let skipped = SkippedOperation {
            qualified_name: qualified_name.into(),
            reason: reason.into(),
        };
        warn!(
            "Skipping operation '{}' of '{}': {}",
            skipped.qualified_name, provider, skipped.reason
        );
        self.skipped.push(skipped);
    }
}

/// Enumerates the operations of one provider
pub trait DescriptorExtractor: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Describe every operation; fails only when the provider as a whole is unusable
    fn extract(&self) -> Result<Extraction>;
}

/// A provider ready for adapter synthesis
pub struct PreparedProvider {
    /// Client cache identity
    pub provider_key: String,
    /// Prefix for catalog keys
    pub catalog_prefix: String,
    pub extraction: Extraction,
    pub factory: Arc<dyn ClientFactory>,
}

/// A configured capability source handed to the discovery orchestrator
#[async_trait]
pub trait ProviderSource: Send + Sync {
    /// Name for logs before the provider is prepared
    fn name(&self) -> String;

    /// Fetch whatever the provider needs and extract its operations
    async fn prepare(&self) -> Result<PreparedProvider>;
}

/// Member names excluded from extraction; `*` matches any run of characters
#[derive(Debug, Clone)]
pub struct Denylist {
    exact: Vec<String>,
    patterns: Vec<Regex>,
}

static DEFAULT: Lazy<Denylist> = Lazy::new(|| Denylist::from_names(DEFAULT_DENYLIST.iter().copied()));

impl Default for Denylist {
    fn default() -> Self {
        DEFAULT.clone()
    }
}

impl Denylist {
    pub fn empty() -> Self {
        Self {
            exact: Vec::new(),
            patterns: Vec::new(),
        }
    }

    pub fn from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Self {
        let mut denylist = Self::empty();
        denylist.extend(names);
        denylist
    }

    pub fn extend<'a, I: IntoIterator<Item = &'a str>>(&mut self, names: I) {
        for name in names {
            if name.contains('*') {
                let pattern = name.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
                match Regex::new(&format!("^{}$", pattern)) {
                    Ok(regex) => self.patterns.push(regex),
                    Err(e) => warn!("Ignoring invalid denylist pattern '{}': {}", name, e),
                }
            } else {
                self.exact.push(name.to_string());
            }
        }
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.exact.iter().any(|n| n == name) || self.patterns.iter().any(|p| p.is_match(name))
    }
}
