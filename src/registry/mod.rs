//! Adapter registry and discovery orchestration

pub mod orchestrator;
pub mod overrides;
pub mod service;

pub use orchestrator::{DiscoveryOrchestrator, DiscoveryReport, ProviderOutcome};
pub use overrides::{SummaryOverrides, OVERRIDES_MANIFEST};
pub use service::{AdapterRegistry, CatalogEntry, RegistryMetadata};
