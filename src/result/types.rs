//! Raw provider results as handed to the result normalizer

use crate::error::Result;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::fmt;

/// Lazily produced sequence of result items (a pager)
pub type ItemStream = BoxStream<'static, Result<RawResult>>;

/// A structured message type that knows its own canonical JSON form
pub trait CanonicalMessage: Send + Sync {
    /// Message type name, used for logging
    fn type_name(&self) -> &str;

    /// Canonical JSON serialization of the message
    fn to_canonical_json(&self) -> Result<String>;
}

/// Whatever a provider operation returned
pub enum RawResult {
    Null,
    /// Scalar or finite aggregate
    Value(Value),
    /// Bounded/paged sequence; may be arbitrarily long
    Paged(ItemStream),
    Message(Box<dyn CanonicalMessage>),
    /// Anything else; only its string form is available
    Opaque(Box<dyn fmt::Display + Send + Sync>),
}

impl RawResult {
    /// Wrap an already-materialized iterator as a paged result
    pub fn paged_from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = RawResult>,
        I::IntoIter: Send + 'static,
    {
        RawResult::Paged(stream::iter(items.into_iter().map(Ok)).boxed())
    }

    pub fn paged(stream: ItemStream) -> Self {
        RawResult::Paged(stream)
    }

    pub fn message<M: CanonicalMessage + 'static>(message: M) -> Self {
        RawResult::Message(Box::new(message))
    }

    pub fn opaque<D: fmt::Display + Send + Sync + 'static>(value: D) -> Self {
        RawResult::Opaque(Box::new(value))
    }
}

impl From<Value> for RawResult {
    fn from(value: Value) -> Self {
        if value.is_null() {
            RawResult::Null
        } else {
            RawResult::Value(value)
        }
    }
}

impl fmt::Debug for RawResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawResult::Null => write!(f, "Null"),
            RawResult::Value(v) => f.debug_tuple("Value").field(v).finish(),
            RawResult::Paged(_) => write!(f, "Paged(..)"),
            RawResult::Message(m) => write!(f, "Message({})", m.type_name()),
            RawResult::Opaque(o) => write!(f, "Opaque({})", o),
        }
    }
}
