//! Configuration management for capbridge

use crate::config::environment::EnvironmentOverrides;
use crate::error::{BridgeError, Result};
use crate::extractor::{Denylist, DocumentLocation, DEFAULT_DOCUMENT_URL_TEMPLATE};
use crate::result::DEFAULT_PAGE_CAP;
use crate::utils::name_sanitizer::DEFAULT_MAX_KEY_LENGTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of providers discovered concurrently
pub const DEFAULT_WORKERS: usize = 10;

/// Smallest accepted catalog key length
pub const MIN_CONFIGURED_KEY_LENGTH: usize = 24;

// Default functions for serde
fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_document_url_template() -> String {
    DEFAULT_DOCUMENT_URL_TEMPLATE.to_string()
}

fn default_credential_prefix() -> String {
    crate::client::credentials::DEFAULT_CREDENTIAL_PREFIX.to_string()
}

fn default_max_key_length() -> usize {
    DEFAULT_MAX_KEY_LENGTH
}

fn default_page_cap() -> usize {
    DEFAULT_PAGE_CAP
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Document-described providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Logging configuration
    pub logging: Option<LoggingConfig>,
}

/// Discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Providers discovered concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// URL template for `name:version` documents
    #[serde(default = "default_document_url_template")]
    pub document_url_template: String,
    /// Member names denied on top of the built-in list (`*` wildcards allowed)
    #[serde(default)]
    pub denylist: Vec<String>,
    /// Directory holding `overrides.json` and markdown summaries
    #[serde(default)]
    pub docs_dir: Option<PathBuf>,
    /// Environment prefix for provider credentials
    #[serde(default = "default_credential_prefix")]
    pub credential_prefix: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            document_url_template: default_document_url_template(),
            denylist: Vec::new(),
            docs_dir: None,
            credential_prefix: default_credential_prefix(),
        }
    }
}

impl DiscoveryConfig {
    /// Built-in denylist extended with the configured names
    pub fn denylist(&self) -> Denylist {
        let mut denylist = Denylist::default();
        denylist.extend(self.denylist.iter().map(String::as_str));
        denylist
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Maximum catalog key length
    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,
    /// Items materialized from a paged result
    #[serde(default = "default_page_cap")]
    pub page_cap: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_key_length: default_max_key_length(),
            page_cap: default_page_cap(),
        }
    }
}

/// One document-described provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API name (`translate`)
    pub name: String,
    /// API version (`v2`); with `name`, resolves through the URL template
    #[serde(default)]
    pub version: Option<String>,
    /// Explicit document URL
    #[serde(default)]
    pub url: Option<String>,
    /// Local document (JSON or YAML)
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Catalog prefix; defaults to the title-cased API name
    #[serde(default)]
    pub prefix: Option<String>,
}

impl ProviderConfig {
    pub fn api(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            url: None,
            path: None,
            prefix: None,
        }
    }

    /// Where to load the document from: path, then URL, then `name:version`
    pub fn location(&self) -> Result<DocumentLocation> {
        if let Some(path) = &self.path {
            return Ok(DocumentLocation::File(path.clone()));
        }
        if let Some(url) = &self.url {
            return Ok(DocumentLocation::Url(url.clone()));
        }
        match &self.version {
            Some(version) => Ok(DocumentLocation::api(&self.name, version)),
            None => Err(BridgeError::config(format!(
                "Provider '{}' needs a version, url or path",
                self.name
            ))),
        }
    }

    fn same_api(&self, other: &ProviderConfig) -> bool {
        self.name == other.name && self.version == other.version
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json, text)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(BridgeError::config(format!(
                "Invalid log level '{}'. Valid levels: {}",
                self.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["json", "text"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(BridgeError::config(format!(
                "Invalid log format '{}'. Valid formats: {}",
                self.format,
                valid_formats.join(", ")
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load .env files from the working directory in order of precedence
    pub fn load_env_files() {
        Self::load_env_files_from(Path::new("."));
    }

    /// Load `.env`, `.env.<env>` and `.env.local` from `dir`. Variables already set in
    /// the process environment are kept.
    pub fn load_env_files_from(dir: &Path) {
        let env = std::env::var(crate::config::EnvVars::ENVIRONMENT)
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "development".to_string());

        // dotenvy never replaces a variable that is already set, so earlier files win
        let env_specific_file = format!(".env.{}", env);
        let env_files = [".env", env_specific_file.as_str(), ".env.local"];

        for env_file in env_files {
            match dotenvy::from_filename(dir.join(env_file)) {
                Ok(_) => {
                    tracing::info!("Loaded environment variables from {}", env_file);
                }
                Err(e) if e.not_found() => {
                    tracing::debug!("No {} file found, skipping", env_file);
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", env_file, e);
                }
            }
        }

        tracing::debug!("Environment: {}", env);
    }

    /// Load configuration from file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_env_files();

        let mut config = if path.as_ref().exists() {
            Self::from_file(path.as_ref())?
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.as_ref().display());
            Self::default()
        };

        // Precedence: .env < file < environment
        config.apply_environment_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file without applying overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| BridgeError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        let overrides = EnvironmentOverrides::load()?;
        if overrides.has_overrides() {
            tracing::info!("Environment overrides: {}", overrides.get_override_summary().join(", "));
        }
        overrides.apply_to_config(self);
        Ok(())
    }

    /// Add a provider unless the same API is already configured
    pub fn add_provider(&mut self, provider: ProviderConfig) -> bool {
        if self.providers.iter().any(|p| p.same_api(&provider)) {
            return false;
        }
        self.providers.push(provider);
        true
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.discovery.workers == 0 {
            return Err(BridgeError::config("discovery.workers must be at least 1"));
        }
        if self.catalog.page_cap == 0 {
            return Err(BridgeError::config("catalog.page_cap must be at least 1"));
        }
        if self.catalog.max_key_length < MIN_CONFIGURED_KEY_LENGTH {
            return Err(BridgeError::config(format!(
                "catalog.max_key_length must be at least {}",
                MIN_CONFIGURED_KEY_LENGTH
            )));
        }
        if !self.discovery.document_url_template.contains("{name}") {
            return Err(BridgeError::config(
                "discovery.document_url_template must contain a {name} placeholder",
            ));
        }

        for (index, provider) in self.providers.iter().enumerate() {
            if provider.name.trim().is_empty() {
                return Err(BridgeError::config(format!("providers[{}] has an empty name", index)));
            }
            provider.location()?;
        }

        if let Some(ref logging) = self.logging {
            logging.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.discovery.workers, DEFAULT_WORKERS);
        assert_eq!(config.catalog.max_key_length, 64);
        assert_eq!(config.catalog.page_cap, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
discovery:
  workers: 4
  denylist: ["delete_*"]
catalog:
  max_key_length: 48
providers:
  - name: translate
    version: v2
  - name: library
    path: ./library.yaml
    prefix: Lib
logging:
  level: debug
  format: json
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.discovery.workers, 4);
        assert_eq!(config.catalog.max_key_length, 48);
        assert_eq!(config.catalog.page_cap, DEFAULT_PAGE_CAP);
        assert_eq!(config.providers.len(), 2);
        assert!(matches!(config.providers[1].location().unwrap(), DocumentLocation::File(_)));
        assert!(config.discovery.denylist().is_denied("delete_cluster"));
        assert!(config.discovery.denylist().is_denied("from_service_account_file"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.discovery.workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.catalog.max_key_length = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.providers.push(ProviderConfig {
            name: " ".into(),
            version: Some("v1".into()),
            url: None,
            path: None,
            prefix: None,
        });
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.providers.push(ProviderConfig {
            name: "orphan".into(),
            version: None,
            url: None,
            path: None,
            prefix: None,
        });
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging = Some(LoggingConfig {
            level: "loud".into(),
            format: "text".into(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_add_provider_deduplicates() {
        let mut config = Config::default();
        assert!(config.add_provider(ProviderConfig::api("translate", "v2")));
        assert!(!config.add_provider(ProviderConfig::api("translate", "v2")));
        assert!(config.add_provider(ProviderConfig::api("translate", "v3")));
        assert_eq!(config.providers.len(), 2);
    }
}
