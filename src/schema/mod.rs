//! Schema normalization for discovered operations

pub mod normalizer;

pub use normalizer::{NormalizedOperation, SchemaNormalizer, TypeMapping, DEFAULT_BODY_PARAM};
