//! Environment variable integration for capbridge configuration

use crate::config::{Config, ProviderConfig};
use crate::error::{BridgeError, Result};
use crate::extractor::DocumentLocation;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Environment variable names used by capbridge
pub struct EnvVars;

impl EnvVars {
    pub const ENVIRONMENT: &'static str = "CAPBRIDGE_ENV";
    pub const CONFIG_PATH: &'static str = "CAPBRIDGE_CONFIG_PATH";
    pub const WORKERS: &'static str = "CAPBRIDGE_WORKERS";
    pub const PAGE_CAP: &'static str = "CAPBRIDGE_PAGE_CAP";
    pub const MAX_KEY_LENGTH: &'static str = "CAPBRIDGE_MAX_KEY_LENGTH";
    pub const REMOTE_APIS: &'static str = "CAPBRIDGE_REMOTE_APIS";
    pub const DOCUMENT_URL_TEMPLATE: &'static str = "CAPBRIDGE_DOCUMENT_URL_TEMPLATE";
    pub const DOCS_DIR: &'static str = "CAPBRIDGE_DOCS_DIR";
}

/// Environment configuration overrides
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOverrides {
    pub config_path: Option<PathBuf>,
    pub workers: Option<usize>,
    pub page_cap: Option<usize>,
    pub max_key_length: Option<usize>,
    /// Parsed `name:version` entries
    pub remote_apis: Vec<ProviderConfig>,
    pub document_url_template: Option<String>,
    pub docs_dir: Option<PathBuf>,
}

impl EnvironmentOverrides {
    /// Load environment variable overrides
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load overrides through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut overrides = EnvironmentOverrides::default();

        if let Some(path) = get(EnvVars::CONFIG_PATH) {
            debug!("Environment override: {}={}", EnvVars::CONFIG_PATH, path);
            overrides.config_path = Some(PathBuf::from(path));
        }

        overrides.workers = Self::parse_number(EnvVars::WORKERS, get(EnvVars::WORKERS))?;
        overrides.page_cap = Self::parse_number(EnvVars::PAGE_CAP, get(EnvVars::PAGE_CAP))?;
        overrides.max_key_length = Self::parse_number(EnvVars::MAX_KEY_LENGTH, get(EnvVars::MAX_KEY_LENGTH))?;

        if let Some(apis) = get(EnvVars::REMOTE_APIS) {
            overrides.remote_apis = Self::parse_remote_apis(&apis);
        }

        overrides.document_url_template = get(EnvVars::DOCUMENT_URL_TEMPLATE);
        overrides.docs_dir = get(EnvVars::DOCS_DIR).map(PathBuf::from);

        Ok(overrides)
    }

    fn parse_number<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match value {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| BridgeError::config(format!("Invalid {} environment variable '{}': {}", name, raw, e))),
        }
    }

    /// Parse `name:version[,name:version...]`; malformed entries are skipped with a warning
    pub fn parse_remote_apis(value: &str) -> Vec<ProviderConfig> {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match DocumentLocation::parse_api(entry) {
                Some(DocumentLocation::Api { name, version }) => Some(ProviderConfig::api(name, version)),
                _ => {
                    warn!(
                        "Skipping malformed {} entry '{}' (expected name:version)",
                        EnvVars::REMOTE_APIS,
                        entry
                    );
                    None
                }
            })
            .collect()
    }

    /// Apply environment overrides to a config
    pub fn apply_to_config(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            info!("Environment override: discovery.workers = {}", workers);
            config.discovery.workers = workers;
        }
        if let Some(page_cap) = self.page_cap {
            info!("Environment override: catalog.page_cap = {}", page_cap);
            config.catalog.page_cap = page_cap;
        }
        if let Some(max_key_length) = self.max_key_length {
            info!("Environment override: catalog.max_key_length = {}", max_key_length);
            config.catalog.max_key_length = max_key_length;
        }
        if let Some(ref template) = self.document_url_template {
            config.discovery.document_url_template = template.clone();
        }
        if let Some(ref docs_dir) = self.docs_dir {
            config.discovery.docs_dir = Some(docs_dir.clone());
        }
        for provider in &self.remote_apis {
            if !config.add_provider(provider.clone()) {
                debug!("Remote API '{}' already configured", provider.name);
            }
        }
    }

    /// Get the effective config file path (with environment override)
    pub fn get_config_path(&self, default_path: &std::path::Path) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| default_path.to_path_buf())
    }

    /// Check if any environment overrides are active
    pub fn has_overrides(&self) -> bool {
        !self.get_override_summary().is_empty()
    }

    /// Get summary of active overrides for logging
    pub fn get_override_summary(&self) -> Vec<String> {
        let mut summary = Vec::new();

        if let Some(ref path) = self.config_path {
            summary.push(format!("{}={:?}", EnvVars::CONFIG_PATH, path));
        }
        if let Some(workers) = self.workers {
            summary.push(format!("{}={}", EnvVars::WORKERS, workers));
        }
        if let Some(page_cap) = self.page_cap {
            summary.push(format!("{}={}", EnvVars::PAGE_CAP, page_cap));
        }
        if let Some(max_key_length) = self.max_key_length {
            summary.push(format!("{}={}", EnvVars::MAX_KEY_LENGTH, max_key_length));
        }
        if !self.remote_apis.is_empty() {
            summary.push(format!("{}=<{} apis>", EnvVars::REMOTE_APIS, self.remote_apis.len()));
        }
        if self.document_url_template.is_some() {
            summary.push(EnvVars::DOCUMENT_URL_TEMPLATE.to_string());
        }
        if let Some(ref docs_dir) = self.docs_dir {
            summary.push(format!("{}={:?}", EnvVars::DOCS_DIR, docs_dir));
        }

        summary
    }
}
