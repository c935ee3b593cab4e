//! Configuration module for capbridge
//!
//! This module provides configuration management and loading utilities.

mod config;
pub mod environment;

pub use config::{
    CatalogConfig, Config, DiscoveryConfig, LoggingConfig, ProviderConfig, DEFAULT_WORKERS,
    MIN_CONFIGURED_KEY_LENGTH,
};
pub use environment::{EnvVars, EnvironmentOverrides};
