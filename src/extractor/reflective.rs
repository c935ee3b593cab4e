//! Extraction from self-describing client surfaces

use crate::client::ClientFactory;
use crate::descriptor::{
    DefaultValue, OperationDescriptor, OperationTarget, ParameterDescriptor, SourceType, QUALIFIED_NAME_SEPARATOR,
};
use crate::error::Result;
use crate::extractor::{DescriptorExtractor, Denylist, Extraction, PreparedProvider, ProviderSource};
use crate::utils::name_sanitizer::derive_service_prefix;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Receiver parameter names stripped from every callable
pub const DEFAULT_INJECTED_PARAMS: &[&str] = &["self", "cls"];

/// Nesting limit for sub-resources; surfaces may be cyclic
pub const MAX_RESOURCE_DEPTH: usize = 16;

/// A client type that can describe its own members
pub trait ReflectiveSurface: Send + Sync {
    /// Type name of the client, e.g. `ClusterManagerClient`
    fn type_name(&self) -> &str;

    fn members(&self) -> Vec<MemberInfo>;
}

/// What kind of member a client exposes
#[derive(Clone)]
pub enum MemberKind {
    Function,
    Property,
    Constant,
    /// Accessor returning a nested resource
    Resource(Arc<dyn ReflectiveSurface>),
}

/// One parameter of a callable member
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub source_type: SourceType,
    /// `None` means the parameter has no default and is required
    pub default: Option<DefaultValue>,
    pub description: Option<String>,
}

impl ParamInfo {
    pub fn required(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
            default: None,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, source_type: SourceType, default: DefaultValue) -> Self {
        Self {
            name: name.into(),
            source_type,
            default: Some(default),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One member of a reflective surface
#[derive(Clone)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    pub doc: Option<String>,
    /// Parameter list, or the reason it cannot be introspected
    pub params: std::result::Result<Vec<ParamInfo>, String>,
    pub accepts_body: bool,
}

impl MemberInfo {
    pub fn function(name: impl Into<String>, params: Vec<ParamInfo>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Function,
            doc: None,
            params: Ok(params),
            accepts_body: false,
        }
    }

    /// A callable whose signature is not available
    pub fn opaque_function(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Function,
            doc: None,
            params: Err(reason.into()),
            accepts_body: false,
        }
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
            doc: None,
            params: Ok(Vec::new()),
            accepts_body: false,
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            kind: MemberKind::Constant,
            ..Self::property(name)
        }
    }

    pub fn resource(name: impl Into<String>, surface: Arc<dyn ReflectiveSurface>) -> Self {
        Self {
            kind: MemberKind::Resource(surface),
            ..Self::property(name)
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_body(mut self) -> Self {
        self.accepts_body = true;
        self
    }
}

/// Describes the callable members of a [`ReflectiveSurface`]
pub struct ReflectiveExtractor {
    surface: Arc<dyn ReflectiveSurface>,
    denylist: Denylist,
    injected_params: Vec<String>,
}

impl ReflectiveExtractor {
    pub fn new(surface: Arc<dyn ReflectiveSurface>) -> Self {
        Self {
            surface,
            denylist: Denylist::default(),
            injected_params: DEFAULT_INJECTED_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    /// Treat a leading parameter with this name as supplied by the adapter
    pub fn with_injected_param(mut self, name: impl Into<String>) -> Self {
        self.injected_params.push(name.into());
        self
    }

    fn walk(&self, surface: &dyn ReflectiveSurface, chain: &[String], depth: usize, extraction: &mut Extraction) {
        let mut members = surface.members();
        members.sort_by(|a, b| a.name.cmp(&b.name));

        for member in members {
            if member.name.starts_with('_') {
                continue;
            }
            if self.denylist.is_denied(&member.name) {
                debug!("Denylisted member '{}' of '{}'", member.name, surface.type_name());
                continue;
            }

            let qualified_name = Self::qualified_name(chain, &member.name);
            match &member.kind {
                MemberKind::Function => {
                    if let Some(descriptor) = self.describe(&member, chain, &qualified_name, extraction) {
                        extraction.operations.push(descriptor);
                    }
                }
                MemberKind::Resource(nested) => {
                    if depth >= MAX_RESOURCE_DEPTH {
                        extraction.skip(self.name(), qualified_name, "resource nesting too deep");
                        continue;
                    }
                    let mut nested_chain = chain.to_vec();
                    nested_chain.push(member.name.clone());
                    self.walk(nested.as_ref(), &nested_chain, depth + 1, extraction);
                }
                MemberKind::Property | MemberKind::Constant => {}
            }
        }
    }

    fn describe(
        &self,
        member: &MemberInfo,
        chain: &[String],
        qualified_name: &str,
        extraction: &mut Extraction,
    ) -> Option<OperationDescriptor> {
        let params = match &member.params {
            Ok(params) => params.as_slice(),
            Err(reason) => {
                extraction.skip(self.name(), qualified_name, format!("signature unavailable: {}", reason));
                return None;
            }
        };

        let params = match params.first() {
            Some(first) if self.injected_params.iter().any(|n| n == &first.name) => &params[1..],
            _ => params,
        };

        let parameters = params
            .iter()
            .map(|param| {
                let descriptor = match &param.default {
                    None => ParameterDescriptor::required(&param.name, param.source_type.clone()),
                    Some(default) => {
                        ParameterDescriptor::optional(&param.name, param.source_type.clone(), Some(default.clone()))
                    }
                };
                match &param.description {
                    Some(description) => descriptor.with_description(description),
                    None => descriptor,
                }
            })
            .collect();

        let summary = member.doc.as_deref().map(str::trim).unwrap_or_default();
        let target = OperationTarget::nested(chain.to_vec(), &member.name);

        match OperationDescriptor::new(qualified_name, parameters, member.accepts_body, summary, target) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                extraction.skip(self.name(), qualified_name, e.to_string());
                None
            }
        }
    }

    fn qualified_name(chain: &[String], name: &str) -> String {
        if chain.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", chain.join(QUALIFIED_NAME_SEPARATOR), QUALIFIED_NAME_SEPARATOR, name)
        }
    }
}

impl DescriptorExtractor for ReflectiveExtractor {
    fn name(&self) -> &str {
        self.surface.type_name()
    }

    fn extract(&self) -> Result<Extraction> {
        let mut extraction = Extraction::default();
        self.walk(self.surface.as_ref(), &[], 0, &mut extraction);
        info!(
            "Extracted {} operations from '{}' ({} skipped)",
            extraction.operations.len(),
            self.name(),
            extraction.skipped.len()
        );
        Ok(extraction)
    }
}

/// A reflective client together with the factory that builds it
pub struct ReflectiveProvider {
    surface: Arc<dyn ReflectiveSurface>,
    factory: Arc<dyn ClientFactory>,
    prefix: Option<String>,
    denylist: Denylist,
    injected_params: Vec<String>,
}

impl ReflectiveProvider {
    pub fn new(surface: Arc<dyn ReflectiveSurface>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            surface,
            factory,
            prefix: None,
            denylist: Denylist::default(),
            injected_params: Vec::new(),
        }
    }

    /// Use a fixed catalog prefix instead of one derived from the type name
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Deny additional member names on top of the defaults
    pub fn with_denied<'a, I: IntoIterator<Item = &'a str>>(mut self, names: I) -> Self {
        self.denylist.extend(names);
        self
    }

    /// Replace the denylist, defaults included
    pub fn with_denylist(mut self, denylist: Denylist) -> Self {
        self.denylist = denylist;
        self
    }

    pub fn with_injected_param(mut self, name: impl Into<String>) -> Self {
        self.injected_params.push(name.into());
        self
    }

    fn extractor(&self) -> ReflectiveExtractor {
        self.injected_params.iter().fold(
            ReflectiveExtractor::new(self.surface.clone()).with_denylist(self.denylist.clone()),
            |extractor, name| extractor.with_injected_param(name.clone()),
        )
    }
}

#[async_trait]
impl ProviderSource for ReflectiveProvider {
    fn name(&self) -> String {
        self.surface.type_name().to_string()
    }

    async fn prepare(&self) -> Result<PreparedProvider> {
        let type_name = self.surface.type_name();
        let extraction = self.extractor().extract()?;
        Ok(PreparedProvider {
            provider_key: type_name.to_string(),
            catalog_prefix: self.prefix.clone().unwrap_or_else(|| derive_service_prefix(type_name)),
            extraction,
            factory: self.factory.clone(),
        })
    }
}
