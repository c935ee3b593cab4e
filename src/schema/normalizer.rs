//! Reduces provider-native parameter types to the portable type vocabulary
//!
//! Precedence for each parameter type:
//! 1. a portable primitive maps to itself
//! 2. an optional/union of portable types maps to the underlying type and makes the
//!    parameter optional
//! 3. anything else maps to `object` when it is a request-message aggregate, else `any`

use crate::descriptor::{
    DefaultValue, NormalizedParameter, OperationDescriptor, OperationTarget, ParameterDescriptor,
    PortableType, SourceType,
};
use crate::utils::name_sanitizer::ParameterNameMap;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Default name of the synthetic free-form payload parameter
pub const DEFAULT_BODY_PARAM: &str = "body";

const BODY_DESCRIPTION: &str = "The request body as a JSON object.";

/// An operation after type normalization and parameter-name sanitization
#[derive(Debug, Clone)]
pub struct NormalizedOperation {
    pub qualified_name: String,
    pub summary: String,
    pub parameters: Vec<NormalizedParameter>,
    /// Exposed name -> provider name
    pub name_map: ParameterNameMap,
    pub target: OperationTarget,
    /// JSON Schema of the argument map
    pub input_schema: Value,
}

/// Result of mapping a single source type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    pub portable_type: PortableType,
    /// Whether the type admits "no value"
    pub nullable: bool,
}

impl TypeMapping {
    fn of(portable_type: PortableType) -> Self {
        Self { portable_type, nullable: false }
    }

    fn nullable(portable_type: PortableType) -> Self {
        Self { portable_type, nullable: true }
    }
}

/// Schema normalizer
#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    body_param_name: String,
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaNormalizer {
    pub fn new() -> Self {
        Self {
            body_param_name: DEFAULT_BODY_PARAM.to_string(),
        }
    }

    /// Use a different name for the synthetic payload parameter
    pub fn with_body_param_name(mut self, name: impl Into<String>) -> Self {
        self.body_param_name = name.into();
        self
    }

    pub fn body_param_name(&self) -> &str {
        &self.body_param_name
    }

    /// Map a provider-native type onto the portable vocabulary. Never fails.
    pub fn map_type(source_type: &SourceType) -> TypeMapping {
        if let Some(primitive) = Self::primitive(source_type) {
            return TypeMapping::of(primitive);
        }

        match source_type {
            SourceType::NoneType => TypeMapping::nullable(PortableType::Any),
            SourceType::Optional(inner) => {
                let mapped = Self::map_type(inner);
                TypeMapping::nullable(mapped.portable_type)
            }
            SourceType::Union(members) => Self::map_union(members),
            SourceType::Message(_) => TypeMapping::of(PortableType::Object),
            _ => TypeMapping::of(PortableType::Any),
        }
    }

    fn primitive(source_type: &SourceType) -> Option<PortableType> {
        match source_type {
            SourceType::Str => Some(PortableType::String),
            SourceType::Int => Some(PortableType::Integer),
            SourceType::Float => Some(PortableType::Float),
            SourceType::Bool => Some(PortableType::Boolean),
            SourceType::List => Some(PortableType::Array),
            SourceType::Map => Some(PortableType::Object),
            _ => None,
        }
    }

    fn map_union(members: &[SourceType]) -> TypeMapping {
        let mut nullable = false;
        let mut mapped: Vec<PortableType> = Vec::new();
        for member in members {
            if matches!(member, SourceType::NoneType) {
                nullable = true;
                continue;
            }
            let mapping = Self::map_type(member);
            nullable |= mapping.nullable;
            if !mapped.contains(&mapping.portable_type) {
                mapped.push(mapping.portable_type);
            }
        }

        let portable_type = match mapped.as_slice() {
            [single] => *single,
            _ => PortableType::Any,
        };

        TypeMapping { portable_type, nullable }
    }

    /// Coerce a declared default into a portable value; non-portable defaults become null
    pub fn portable_default(default_value: &DefaultValue) -> Value {
        match default_value {
            DefaultValue::Json(value) => value.clone(),
            DefaultValue::Opaque(text) => {
                debug!("Dropping non-portable default value: {}", text);
                Value::Null
            }
        }
    }

    /// Normalize one parameter under the given exposed name
    pub fn normalize_parameter(&self, param: &ParameterDescriptor, exposed_name: &str) -> NormalizedParameter {
        let mapping = Self::map_type(&param.source_type);
        let required = param.required && !mapping.nullable;

        let default_value = match &param.default_value {
            Some(default) => Some(Self::portable_default(default)),
            None if !required => Some(Value::Null),
            None => None,
        };

        NormalizedParameter {
            exposed_name: exposed_name.to_string(),
            portable_type: mapping.portable_type,
            required,
            default_value,
            description: param.description.clone(),
        }
    }

    /// Normalize a whole operation, appending the payload parameter when the operation
    /// accepts a body
    pub fn normalize_operation(&self, descriptor: &OperationDescriptor) -> NormalizedOperation {
        let (exposed_names, mut name_map) =
            ParameterNameMap::build(descriptor.parameters.iter().map(|p| p.name.as_str()));

        let mut parameters: Vec<NormalizedParameter> = descriptor
            .parameters
            .iter()
            .zip(exposed_names.iter())
            .map(|(param, exposed)| self.normalize_parameter(param, exposed))
            .collect();

        if descriptor.accepts_body {
            if name_map.original_for(&self.body_param_name).is_some() {
                debug!(
                    "Operation '{}' already declares '{}', not adding a synthetic payload parameter",
                    descriptor.qualified_name, self.body_param_name
                );
            } else {
                name_map.insert_identity(&self.body_param_name);
                parameters.push(NormalizedParameter {
                    exposed_name: self.body_param_name.clone(),
                    portable_type: PortableType::Object,
                    required: false,
                    default_value: Some(Value::Null),
                    description: Some(BODY_DESCRIPTION.to_string()),
                });
            }
        }

        let input_schema = Self::input_schema(&parameters);

        NormalizedOperation {
            qualified_name: descriptor.qualified_name.clone(),
            summary: descriptor.summary.clone(),
            parameters,
            name_map,
            target: descriptor.target.clone(),
            input_schema,
        }
    }

    /// JSON Schema object describing the argument map
    pub fn input_schema(parameters: &[NormalizedParameter]) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in parameters {
            let mut schema = param.portable_type.json_schema();
            if let Some(obj) = schema.as_object_mut() {
                if let Some(description) = &param.description {
                    obj.insert("description".to_string(), json!(description));
                }
                if let Some(default) = &param.default_value {
                    if !default.is_null() {
                        obj.insert("default".to_string(), default.clone());
                    }
                }
            }
            properties.insert(param.exposed_name.clone(), schema);
            if param.required {
                required.push(param.exposed_name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_source_types() -> Vec<SourceType> {
        vec![
            SourceType::Str,
            SourceType::Int,
            SourceType::Float,
            SourceType::Bool,
            SourceType::List,
            SourceType::Map,
            SourceType::NoneType,
            SourceType::Optional(Box::new(SourceType::Int)),
            SourceType::Optional(Box::new(SourceType::Message("ListRequest".into()))),
            SourceType::Union(vec![SourceType::Str, SourceType::NoneType]),
            SourceType::Union(vec![SourceType::Str, SourceType::Int]),
            SourceType::Union(vec![]),
            SourceType::Message("CreateClusterRequest".into()),
            SourceType::Opaque("google.api_core.retry.Retry".into()),
            SourceType::Unannotated,
        ]
    }

    #[test]
    fn test_every_source_type_maps_to_a_portable_type() {
        for source in all_source_types() {
            let mapping = SchemaNormalizer::map_type(&source);
            assert!(matches!(
                mapping.portable_type,
                PortableType::String
                    | PortableType::Integer
                    | PortableType::Float
                    | PortableType::Boolean
                    | PortableType::Array
                    | PortableType::Object
                    | PortableType::Any
            ));
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(SchemaNormalizer::map_type(&SourceType::Int), TypeMapping::of(PortableType::Integer));
        assert_eq!(
            SchemaNormalizer::map_type(&SourceType::Union(vec![SourceType::Str, SourceType::NoneType])),
            TypeMapping::nullable(PortableType::String)
        );
        assert_eq!(
            SchemaNormalizer::map_type(&SourceType::Message("Req".into())),
            TypeMapping::of(PortableType::Object)
        );
        assert_eq!(
            SchemaNormalizer::map_type(&SourceType::Opaque("Retry".into())),
            TypeMapping::of(PortableType::Any)
        );
        assert_eq!(
            SchemaNormalizer::map_type(&SourceType::Union(vec![SourceType::Str, SourceType::Int])),
            TypeMapping::of(PortableType::Any)
        );
    }

    #[test]
    fn test_optional_type_makes_parameter_optional() {
        let normalizer = SchemaNormalizer::new();
        let param = ParameterDescriptor::required("page_size", SourceType::Optional(Box::new(SourceType::Int)));
        let normalized = normalizer.normalize_parameter(&param, "page_size");
        assert!(!normalized.required);
        assert_eq!(normalized.portable_type, PortableType::Integer);
        assert_eq!(normalized.default_value, Some(Value::Null));
    }

    #[test]
    fn test_opaque_default_coerced_to_null() {
        let normalizer = SchemaNormalizer::new();
        let param = ParameterDescriptor::optional(
            "retry",
            SourceType::Opaque("Retry".into()),
            Some(DefaultValue::Opaque("<object object at 0x7f>".into())),
        );
        let normalized = normalizer.normalize_parameter(&param, "retry");
        assert_eq!(normalized.default_value, Some(Value::Null));
        assert_eq!(normalized.portable_type, PortableType::Any);
    }

    #[test]
    fn test_body_parameter_appended() {
        let normalizer = SchemaNormalizer::new();
        let descriptor = OperationDescriptor::new(
            "projects_insert",
            vec![ParameterDescriptor::required("project.id", SourceType::Str)],
            true,
            "Insert a project",
            OperationTarget::nested(vec!["projects".into()], "insert"),
        )
        .unwrap();

        let normalized = normalizer.normalize_operation(&descriptor);
        assert_eq!(normalized.parameters.len(), 2);
        assert_eq!(normalized.parameters[0].exposed_name, "project_id");
        assert_eq!(normalized.parameters[1].exposed_name, "body");
        assert_eq!(normalized.parameters[1].portable_type, PortableType::Object);
        assert_eq!(normalized.name_map.original_for("project_id"), Some("project.id"));
        assert_eq!(normalized.name_map.original_for("body"), Some("body"));

        let schema = &normalized.input_schema;
        assert_eq!(schema["properties"]["body"]["type"], "object");
        assert_eq!(schema["required"], json!(["project_id"]));
    }

    #[test]
    fn test_existing_body_parameter_not_duplicated() {
        let normalizer = SchemaNormalizer::new();
        let descriptor = OperationDescriptor::new(
            "send",
            vec![ParameterDescriptor::required("body", SourceType::Map)],
            true,
            "",
            OperationTarget::root("send"),
        )
        .unwrap();

        let normalized = normalizer.normalize_operation(&descriptor);
        assert_eq!(normalized.parameters.len(), 1);
    }

    #[test]
    fn test_nested_optional_in_union_is_nullable() {
        let nested = SourceType::Union(vec![SourceType::Str, SourceType::Optional(Box::new(SourceType::Str))]);
        assert_eq!(
            SchemaNormalizer::map_type(&nested),
            TypeMapping {
                portable_type: PortableType::String,
                nullable: true
            }
        );

        let normalized = SchemaNormalizer::new().normalize_parameter(&ParameterDescriptor::required("name", nested), "name");
        assert!(!normalized.required);
        assert_eq!(normalized.default_value, Some(Value::Null));
    }
}
