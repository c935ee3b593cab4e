//! Descriptor types shared by extraction, normalization and synthesis

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Provider-native type tag of a parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SourceType {
    Str,
    Int,
    Float,
    Bool,
    List,
    Map,
    NoneType,
    /// `Optional[T]`
    Optional(Box<SourceType>),
    /// `Union[A, B, ...]`, possibly including `NoneType`
    Union(Vec<SourceType>),
    /// A structured request/message type (request-body shaped aggregate)
    Message(String),
    /// Any other provider-specific type
    Opaque(String),
    /// No annotation available
    Unannotated,
}

impl SourceType {
    /// Map a JSON-schema style type name (as used by interface-description documents)
    pub fn from_schema_type(type_name: &str) -> Self {
        match type_name {
            "string" => SourceType::Str,
            "integer" => SourceType::Int,
            "number" => SourceType::Float,
            "boolean" => SourceType::Bool,
            "array" => SourceType::List,
            "object" => SourceType::Map,
            "null" => SourceType::NoneType,
            "any" | "" => SourceType::Unannotated,
            other => SourceType::Opaque(other.to_string()),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Str => write!(f, "str"),
            SourceType::Int => write!(f, "int"),
            SourceType::Float => write!(f, "float"),
            SourceType::Bool => write!(f, "bool"),
            SourceType::List => write!(f, "list"),
            SourceType::Map => write!(f, "dict"),
            SourceType::NoneType => write!(f, "None"),
            SourceType::Optional(inner) => write!(f, "Optional[{}]", inner),
            SourceType::Union(members) => {
                let names: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "Union[{}]", names.join(", "))
            }
            SourceType::Message(name) | SourceType::Opaque(name) => write!(f, "{}", name),
            SourceType::Unannotated => write!(f, "<unannotated>"),
        }
    }
}

/// Default value as declared by the provider
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// A JSON-representable default
    Json(Value),
    /// A provider-native default that has no portable representation
    Opaque(String),
}

/// Description of a single operation parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    /// Parameter name, unique within its operation
    pub name: String,
    /// Provider-native type tag
    pub source_type: SourceType,
    /// Whether the caller must supply the parameter
    pub required: bool,
    /// Declared default; always present (possibly null) when `required` is false
    pub default_value: Option<DefaultValue>,
    /// Optional human-readable description
    pub description: Option<String>,
}

impl ParameterDescriptor {
    /// Create a required parameter
    pub fn required(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
            required: true,
            default_value: None,
            description: None,
        }
    }

    /// Create an optional parameter; a missing default becomes an explicit null
    pub fn optional(name: impl Into<String>, source_type: SourceType, default_value: Option<DefaultValue>) -> Self {
        Self {
            name: name.into(),
            source_type,
            required: false,
            default_value: Some(default_value.unwrap_or(DefaultValue::Json(Value::Null))),
            description: None,
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Where an operation lives on the provider client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationTarget {
    /// Sub-resource accessors to walk from the root client, outermost first
    pub accessor_chain: Vec<String>,
    /// Method name on the final resource
    pub method: String,
}

impl OperationTarget {
    pub fn root(method: impl Into<String>) -> Self {
        Self {
            accessor_chain: Vec::new(),
            method: method.into(),
        }
    }

    pub fn nested(accessor_chain: Vec<String>, method: impl Into<String>) -> Self {
        Self {
            accessor_chain,
            method: method.into(),
        }
    }
}

/// Provider-agnostic description of one discovered operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    /// Provider-scoped name, nested levels joined with `_`
    pub qualified_name: String,
    /// Ordered parameters, names unique
    pub parameters: Vec<ParameterDescriptor>,
    /// Whether the operation takes an additional free-form payload
    pub accepts_body: bool,
    /// Summary, may be empty
    pub summary: String,
    /// Reference back to the provider-native callable
    pub target: OperationTarget,
}

/// Separator used when concatenating nested resource names
pub const QUALIFIED_NAME_SEPARATOR: &str = "_";

impl OperationDescriptor {
    /// Create a descriptor, rejecting duplicate parameter names
    pub fn new(
        qualified_name: impl Into<String>,
        parameters: Vec<ParameterDescriptor>,
        accepts_body: bool,
        summary: impl Into<String>,
        target: OperationTarget,
    ) -> Result<Self> {
        let qualified_name = qualified_name.into();
        let mut seen = HashSet::new();
        for param in &parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(BridgeError::validation(format!(
                    "Duplicate parameter '{}' in operation '{}'",
                    param.name, qualified_name
                )));
            }
        }

        Ok(Self {
            qualified_name,
            parameters,
            accepts_body,
            summary: summary.into(),
            target,
        })
    }
}

/// Portable type vocabulary exposed in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortableType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
    Any,
}

impl PortableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortableType::String => "string",
            PortableType::Integer => "integer",
            PortableType::Float => "float",
            PortableType::Boolean => "boolean",
            PortableType::Array => "array",
            PortableType::Object => "object",
            PortableType::Any => "any",
        }
    }

    /// JSON Schema fragment for this type
    pub fn json_schema(&self) -> Value {
        match self {
            PortableType::String => serde_json::json!({ "type": "string" }),
            PortableType::Integer => serde_json::json!({ "type": "integer" }),
            PortableType::Float => serde_json::json!({ "type": "number" }),
            PortableType::Boolean => serde_json::json!({ "type": "boolean" }),
            PortableType::Array => serde_json::json!({ "type": "array" }),
            PortableType::Object => serde_json::json!({ "type": "object" }),
            PortableType::Any => serde_json::json!({}),
        }
    }
}

impl fmt::Display for PortableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter as exposed by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedParameter {
    /// Sanitized identifier, unique within the adapter
    pub exposed_name: String,
    pub portable_type: PortableType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Catalog entry for one synthesized adapter; immutable once registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterRecord {
    /// Sanitized, bounded, globally unique key
    pub catalog_key: String,
    /// Name of the operation within its provider
    pub qualified_name: String,
    pub parameters: Vec<NormalizedParameter>,
    /// Client cache identity
    pub provider_key: String,
    pub summary: String,
    /// JSON Schema for the argument map
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}
