//! Converts heterogeneous provider results into canonical text

use crate::error::Result;
use crate::result::types::{ItemStream, RawResult};
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

/// Default number of items materialized from a paged result
pub const DEFAULT_PAGE_CAP: usize = 20;

/// Classification of a raw result, in the order it is tested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Paged,
    Message,
    Aggregate,
    Scalar,
    Opaque,
}

/// Result normalizer
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    page_cap: usize,
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_CAP)
    }
}

impl ResultNormalizer {
    pub fn new(page_cap: usize) -> Self {
        Self { page_cap: page_cap.max(1) }
    }

    pub fn page_cap(&self) -> usize {
        self.page_cap
    }

    /// Single source of truth for the classification order:
    /// paged, message, aggregate, scalar, then opaque.
    pub fn classify(raw: &RawResult) -> ResultClass {
        if matches!(raw, RawResult::Paged(_)) {
            return ResultClass::Paged;
        }
        if matches!(raw, RawResult::Message(_)) {
            return ResultClass::Message;
        }
        match raw {
            RawResult::Value(Value::Object(_)) | RawResult::Value(Value::Array(_)) => ResultClass::Aggregate,
            RawResult::Value(_) | RawResult::Null => ResultClass::Scalar,
            _ => ResultClass::Opaque,
        }
    }

    /// Normalize a raw result into text
    pub async fn normalize(&self, raw: RawResult) -> Result<String> {
        let class = Self::classify(&raw);
        debug!("Normalizing result classified as {:?}", class);

        match (class, raw) {
            (ResultClass::Paged, RawResult::Paged(stream)) => Ok(self.materialize(stream).await),
            (ResultClass::Message, RawResult::Message(message)) => message.to_canonical_json(),
            (ResultClass::Aggregate, RawResult::Value(value)) => Ok(serde_json::to_string_pretty(&value)?),
            (ResultClass::Scalar, raw) => Ok(Self::scalar_text(&raw)),
            (_, raw) => Ok(Self::best_effort_text(&raw)),
        }
    }

    /// Pull at most `page_cap` items and render them as a JSON array
    async fn materialize(&self, stream: ItemStream) -> String {
        let mut items = Vec::with_capacity(self.page_cap);
        let mut limited = stream.take(self.page_cap);

        while let Some(item) = limited.next().await {
            match item {
                Ok(raw) => items.push(Self::item_value(raw)),
                Err(e) => {
                    warn!("Paged result failed after {} items: {}", items.len(), e);
                    return format!("Error iterating pages: {}", e);
                }
            }
        }

        match serde_json::to_string_pretty(&Value::Array(items)) {
            Ok(text) => text,
            Err(e) => format!("Error iterating pages: {}", e),
        }
    }

    /// JSON value for a single page item; items never recurse into nested pagers
    fn item_value(raw: RawResult) -> Value {
        match raw {
            RawResult::Null => Value::Null,
            RawResult::Value(value) => value,
            RawResult::Message(message) => match message.to_canonical_json() {
                Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
                Err(e) => Value::String(format!("<unserializable {}: {}>", message.type_name(), e)),
            },
            RawResult::Opaque(value) => Value::String(value.to_string()),
            RawResult::Paged(_) => Value::String("<paged result>".to_string()),
        }
    }

    fn scalar_text(raw: &RawResult) -> String {
        match raw {
            RawResult::Null => "null".to_string(),
            RawResult::Value(Value::String(s)) => s.clone(),
            RawResult::Value(value) => value.to_string(),
            other => Self::best_effort_text(other),
        }
    }

    fn best_effort_text(raw: &RawResult) -> String {
        match raw {
            RawResult::Opaque(value) => value.to_string(),
            other => format!("{:?}", other),
        }
    }
}
