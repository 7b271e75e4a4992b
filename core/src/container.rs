//! The loaded mediation configuration the debugger addresses into.
//!
//! Built by the engine's configuration loader; the debug plane only reads it.

use crate::error::DebugError;
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    NamedSequence,
    ProxySequence,
    ApiResourceSequence,
    Template,
    Connector,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::NamedSequence => "sequence",
            ContainerKind::ProxySequence => "proxy",
            ContainerKind::ApiResourceSequence => "api",
            ContainerKind::Template => "template",
            ContainerKind::Connector => "connector",
        }
    }
}

/// Which sub-sequence of a proxy or API resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceFlow {
    In,
    Out,
    Fault,
}

/// Wire-level flow type of a debug point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceType {
    Named,
    #[serde(rename = "PROXY_INSEQ")]
    ProxyIn,
    #[serde(rename = "PROXY_OUTSEQ")]
    ProxyOut,
    #[serde(rename = "PROXY_FAULTSEQ")]
    ProxyFault,
    #[serde(rename = "API_INSEQ")]
    ApiIn,
    #[serde(rename = "API_OUTSEQ")]
    ApiOut,
    #[serde(rename = "API_FAULTSEQ")]
    ApiFault,
    Template,
    Connector,
}

impl SequenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceType::Named => "NAMED",
            SequenceType::ProxyIn => "PROXY_INSEQ",
            SequenceType::ProxyOut => "PROXY_OUTSEQ",
            SequenceType::ProxyFault => "PROXY_FAULTSEQ",
            SequenceType::ApiIn => "API_INSEQ",
            SequenceType::ApiOut => "API_OUTSEQ",
            SequenceType::ApiFault => "API_FAULTSEQ",
            SequenceType::Template => "TEMPLATE",
            SequenceType::Connector => "CONNECTOR",
        }
    }

    /// The container kind this type addresses, with its sub-sequence if any.
    pub fn selects(&self) -> (ContainerKind, Option<SequenceFlow>) {
        match self {
            SequenceType::Named => (ContainerKind::NamedSequence, None),
            SequenceType::ProxyIn => (ContainerKind::ProxySequence, Some(SequenceFlow::In)),
            SequenceType::ProxyOut => (ContainerKind::ProxySequence, Some(SequenceFlow::Out)),
            SequenceType::ProxyFault => (ContainerKind::ProxySequence, Some(SequenceFlow::Fault)),
            SequenceType::ApiIn => (ContainerKind::ApiResourceSequence, Some(SequenceFlow::In)),
            SequenceType::ApiOut => (ContainerKind::ApiResourceSequence, Some(SequenceFlow::Out)),
            SequenceType::ApiFault => {
                (ContainerKind::ApiResourceSequence, Some(SequenceFlow::Fault))
            }
            SequenceType::Template => (ContainerKind::Template, None),
            SequenceType::Connector => (ContainerKind::Connector, None),
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SequenceType {
    type Err = DebugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NAMED" => SequenceType::Named,
            "PROXY_INSEQ" => SequenceType::ProxyIn,
            "PROXY_OUTSEQ" => SequenceType::ProxyOut,
            "PROXY_FAULTSEQ" => SequenceType::ProxyFault,
            "API_INSEQ" => SequenceType::ApiIn,
            "API_OUTSEQ" => SequenceType::ApiOut,
            "API_FAULTSEQ" => SequenceType::ApiFault,
            "TEMPLATE" => SequenceType::Template,
            "CONNECTOR" => SequenceType::Connector,
            other => {
                return Err(DebugError::InvalidField {
                    field: "sequence-type",
                    reason: format!("unknown sequence type `{other}`"),
                });
            }
        })
    }
}

/// In/out/fault sub-sequences shared by proxies and API resources.
#[derive(Debug, Clone, Default)]
pub struct FlowSequences {
    pub in_sequence: Option<Arc<Step>>,
    pub out_sequence: Option<Arc<Step>>,
    pub fault_sequence: Option<Arc<Step>>,
}

impl FlowSequences {
    pub fn get(&self, flow: SequenceFlow) -> Option<&Arc<Step>> {
        match flow {
            SequenceFlow::In => self.in_sequence.as_ref(),
            SequenceFlow::Out => self.out_sequence.as_ref(),
            SequenceFlow::Fault => self.fault_sequence.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyService {
    pub name: String,
    pub sequences: FlowSequences,
}

impl ProxyService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequences: FlowSequences::default(),
        }
    }

    pub fn with_sequence(mut self, flow: SequenceFlow, root: Arc<Step>) -> Self {
        set_flow(&mut self.sequences, flow, root);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResource {
    /// URI template or URL mapping the resource dispatches on.
    pub mapping: String,
    pub methods: Vec<String>,
    pub sequences: FlowSequences,
}

impl ApiResource {
    pub fn new<I, S>(mapping: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mapping: mapping.into(),
            methods: methods.into_iter().map(Into::into).collect(),
            sequences: FlowSequences::default(),
        }
    }

    pub fn with_sequence(mut self, flow: SequenceFlow, root: Arc<Step>) -> Self {
        set_flow(&mut self.sequences, flow, root);
        self
    }

    pub fn matches(&self, mapping: &str, method: &str) -> bool {
        self.mapping == mapping && self.methods.iter().any(|m| m == method)
    }
}

#[derive(Debug, Clone)]
pub struct Api {
    pub name: String,
    pub resources: Vec<ApiResource>,
}

impl Api {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
        }
    }

    pub fn with_resource(mut self, resource: ApiResource) -> Self {
        self.resources.push(resource);
        self
    }

    /// First resource whose mapping and method both match.
    pub fn resource(&self, mapping: &str, method: &str) -> Option<&ApiResource> {
        self.resources.iter().find(|r| r.matches(mapping, method))
    }
}

fn set_flow(sequences: &mut FlowSequences, flow: SequenceFlow, root: Arc<Step>) {
    match flow {
        SequenceFlow::In => sequences.in_sequence = Some(root),
        SequenceFlow::Out => sequences.out_sequence = Some(root),
        SequenceFlow::Fault => sequences.fault_sequence = Some(root),
    }
}

/// Every addressable container of one loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct MediationConfig {
    sequences: HashMap<String, Arc<Step>>,
    proxies: HashMap<String, ProxyService>,
    apis: HashMap<String, Api>,
    templates: HashMap<String, Arc<Step>>,
}

impl MediationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence(mut self, name: impl Into<String>, root: Arc<Step>) -> Self {
        self.sequences.insert(name.into(), root);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyService) -> Self {
        self.proxies.insert(proxy.name.clone(), proxy);
        self
    }

    pub fn with_api(mut self, api: Api) -> Self {
        self.apis.insert(api.name.clone(), api);
        self
    }

    pub fn with_template(mut self, name: impl Into<String>, root: Arc<Step>) -> Self {
        self.templates.insert(name.into(), root);
        self
    }

    pub fn sequence(&self, name: &str) -> Option<&Arc<Step>> {
        self.sequences.get(name)
    }

    pub fn proxy(&self, name: &str) -> Option<&ProxyService> {
        self.proxies.get(name)
    }

    pub fn api(&self, name: &str) -> Option<&Api> {
        self.apis.get(name)
    }

    pub fn template(&self, name: &str) -> Option<&Arc<Step>> {
        self.templates.get(name)
    }
}
