//! Shared utilities for capbridge
//!
//! This module contains identifier handling shared by the extractor, the schema
//! normalizer and the discovery orchestrator.

pub mod name_sanitizer;

pub use name_sanitizer::{
    catalog_key_for,
    sanitize_catalog_key,
    sanitize_parameter_name,
    ParameterNameMap,
};
