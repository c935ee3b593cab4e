//! Result normalization

pub mod normalizer;
pub mod types;

pub use normalizer::{ResultClass, ResultNormalizer, DEFAULT_PAGE_CAP};
pub use types::{CanonicalMessage, ItemStream, RawResult};
