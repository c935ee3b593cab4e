//! Adapter synthesis

pub mod synthesizer;

pub use synthesizer::{Adapter, AdapterSynthesizer, WRAPPER_ARGUMENT};
