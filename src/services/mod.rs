//! Service wiring for capbridge
//!
//! Builds the registry, client cache, document loader and discovery orchestrator
//! from a validated configuration.

pub mod service_container;

pub use service_container::ServiceContainer;
