//! Error handling module for capbridge
//!
//! This module provides the error taxonomy shared by discovery, registration and invocation.

mod error;

// Re-export the main error types and utilities
pub use error::{BridgeError, Result};
