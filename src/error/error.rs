//! Error types and handling for capbridge

use thiserror::Error;

/// Result type alias for capbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for capbridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Provider unreachable, malformed description, or unintrospectable operation
    #[error("Discovery error: {provider}: {message}")]
    Discovery { provider: String, message: String },

    /// Catalog key already present in the registry
    #[error("Registration conflict: catalog key '{catalog_key}' is already registered")]
    RegistrationConflict { catalog_key: String },

    /// Credential or configuration failure while building a provider client
    #[error("Client construction error: {provider_key}: {message}")]
    ClientConstruction { provider_key: String, message: String },

    /// Failure while executing an adapter
    #[error("Invocation error: {catalog_key}: {message}")]
    Invocation { catalog_key: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BridgeError {
    /// Create a discovery error
    pub fn discovery<P: Into<String>, S: Into<String>>(provider: P, message: S) -> Self {
        Self::Discovery {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a registration conflict error
    pub fn conflict<S: Into<String>>(catalog_key: S) -> Self {
        Self::RegistrationConflict {
            catalog_key: catalog_key.into(),
        }
    }

    /// Create a client construction error
    pub fn client_construction<K: Into<String>, S: Into<String>>(provider_key: K, message: S) -> Self {
        Self::ClientConstruction {
            provider_key: provider_key.into(),
            message: message.into(),
        }
    }

    /// Create an invocation error
    pub fn invocation<K: Into<String>, S: Into<String>>(catalog_key: K, message: S) -> Self {
        Self::Invocation {
            catalog_key: catalog_key.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Http(_) | BridgeError::Io(_) | BridgeError::ClientConstruction { .. }
        )
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            BridgeError::Discovery { .. } => "discovery",
            BridgeError::RegistrationConflict { .. } => "registration_conflict",
            BridgeError::ClientConstruction { .. } => "client_construction",
            BridgeError::Invocation { .. } => "invocation",
            BridgeError::Config { .. } => "config",
            BridgeError::Validation { .. } => "validation",
            BridgeError::Io(_) => "io",
            BridgeError::Serde(_) => "serialization",
            BridgeError::Yaml(_) => "yaml",
            BridgeError::Http(_) => "http",
            BridgeError::Internal(_) => "internal",
        }
    }
}

impl Clone for BridgeError {
    fn clone(&self) -> Self {
        match self {
            BridgeError::Discovery { provider, message } => BridgeError::Discovery {
                provider: provider.clone(),
                message: message.clone(),
            },
            BridgeError::RegistrationConflict { catalog_key } => BridgeError::RegistrationConflict {
                catalog_key: catalog_key.clone(),
            },
            BridgeError::ClientConstruction { provider_key, message } => BridgeError::ClientConstruction {
                provider_key: provider_key.clone(),
                message: message.clone(),
            },
            BridgeError::Invocation { catalog_key, message } => BridgeError::Invocation {
                catalog_key: catalog_key.clone(),
                message: message.clone(),
            },
            BridgeError::Config { message } => BridgeError::Config { message: message.clone() },
            BridgeError::Validation { message } => BridgeError::Validation { message: message.clone() },

            // For non-cloneable types, convert to string representation
            BridgeError::Io(e) => BridgeError::internal_text(format!("IO error: {}", e)),
            BridgeError::Serde(e) => BridgeError::internal_text(format!("Serialization error: {}", e)),
            BridgeError::Yaml(e) => BridgeError::internal_text(format!("YAML error: {}", e)),
            BridgeError::Http(e) => BridgeError::internal_text(format!("HTTP error: {}", e)),
            BridgeError::Internal(e) => BridgeError::internal_text(format!("{}", e)),
        }
    }
}

impl BridgeError {
    fn internal_text(message: String) -> Self {
        BridgeError::Internal(anyhow::anyhow!(message))
    }
}
