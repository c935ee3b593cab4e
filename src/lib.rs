//! capbridge - Expose service-client libraries as a catalog of callable tools
//!
//! This crate discovers the operations of service clients (either described by a
//! discovery document or by a reflective surface), normalizes their parameters into
//! JSON Schema, and registers one invocable adapter per operation under a sanitized,
//! length-bounded catalog key.

pub mod adapter;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod extractor;
pub mod registry;
pub mod result;
pub mod schema;
pub mod services;
pub mod startup;
pub mod utils;

pub use adapter::{Adapter, AdapterSynthesizer};
pub use client::{ClientCache, ClientFactory, Credentials, ProviderClient};
pub use config::Config;
pub use descriptor::{AdapterRecord, OperationDescriptor, ParameterDescriptor, SourceType};
pub use error::{BridgeError, Result};
pub use extractor::{DocumentProvider, ProviderSource, ReflectiveProvider, ReflectiveSurface};
pub use registry::{AdapterRegistry, DiscoveryOrchestrator, DiscoveryReport};
pub use result::{RawResult, ResultNormalizer};
pub use services::ServiceContainer;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
