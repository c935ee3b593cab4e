//! Credentials handed to client factories

use crate::error::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::env;
use tracing::debug;

/// Default environment prefix used by [`EnvCredentialProvider`]
pub const DEFAULT_CREDENTIAL_PREFIX: &str = "CAPBRIDGE";

/// Credentials for one provider
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// OAuth bearer token
    pub access_token: Option<Secret<String>>,
    /// API key
    pub api_key: Option<Secret<String>>,
    /// Scopes the credentials were obtained for
    pub scopes: Vec<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(Secret::new(token.into()));
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.access_token.is_none() && self.api_key.is_none()
    }

    /// `Authorization` header value, if a bearer token is present
    pub fn authorization_header(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }
}

/// Source of provider credentials
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self, provider_key: &str, scopes: &[String]) -> Result<Credentials>;
}

/// Reads credentials from the environment.
///
/// For provider `maps:v1` and prefix `CAPBRIDGE` the lookup order is
/// `CAPBRIDGE_MAPS_V1_ACCESS_TOKEN`, then `CAPBRIDGE_ACCESS_TOKEN` (same for `_API_KEY`).
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    prefix: String,
}

impl Default for EnvCredentialProvider {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_PREFIX)
    }
}

impl EnvCredentialProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn provider_segment(provider_key: &str) -> String {
        provider_key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }

    fn lookup(&self, provider_key: &str, suffix: &str) -> Option<String> {
        let specific = format!("{}_{}_{}", self.prefix, Self::provider_segment(provider_key), suffix);
        let global = format!("{}_{}", self.prefix, suffix);
        env::var(&specific)
            .ok()
            .or_else(|| env::var(&global).ok())
            .filter(|value| !value.is_empty())
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    async fn credentials(&self, provider_key: &str, scopes: &[String]) -> Result<Credentials> {
        let mut credentials = Credentials {
            scopes: scopes.to_vec(),
            ..Credentials::default()
        };
        if let Some(token) = self.lookup(provider_key, "ACCESS_TOKEN") {
            credentials = credentials.with_access_token(token);
        }
        if let Some(key) = self.lookup(provider_key, "API_KEY") {
            credentials = credentials.with_api_key(key);
        }
        debug!(
            "Resolved credentials for '{}' (anonymous: {})",
            provider_key,
            credentials.is_anonymous()
        );
        Ok(credentials)
    }
}

/// Always returns anonymous credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousCredentials;

#[async_trait]
impl CredentialProvider for AnonymousCredentials {
    async fn credentials(&self, _provider_key: &str, scopes: &[String]) -> Result<Credentials> {
        Ok(Credentials {
            scopes: scopes.to_vec(),
            ..Credentials::default()
        })
    }
}
