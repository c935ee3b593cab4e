//! Descriptor model: passive descriptions of operations, parameters and adapters

pub mod types;

pub use types::*;
