//! Provider clients: construction, caching and remote execution

pub mod cache;
pub mod credentials;
pub mod provider;
pub mod rest;

pub use cache::ClientCache;
pub use credentials::{AnonymousCredentials, CredentialProvider, Credentials, EnvCredentialProvider};
pub use provider::{resolve_resource, ClientFactory, ProviderClient};
pub use rest::{RestClientFactory, RestResourceClient};
