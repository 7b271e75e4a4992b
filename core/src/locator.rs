//! One locator per addressable container kind.

use crate::container::{ContainerKind, MediationConfig, SequenceType};
use crate::error::{DebugError, DebugResult};
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Namespace under which connector operations are registered as templates.
pub const CONNECTOR_NAMESPACE: &str = "org.wso2.carbon.connector";

/// Finds the root composite step of one container.
pub trait ContainerLocator {
    fn kind(&self) -> ContainerKind;

    /// The key reported in events and errors.
    fn key(&self) -> &str;

    fn sequence_type(&self) -> SequenceType;

    fn locate(&self, config: &MediationConfig) -> DebugResult<Arc<Step>>;
}

fn flow_mismatch(key: &str, sequence_type: SequenceType) -> DebugError {
    DebugError::SequenceNotFound {
        key: key.to_string(),
        sequence_type: sequence_type.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSequence {
    pub name: String,
    pub sequence_type: SequenceType,
}

impl ContainerLocator for NamedSequence {
    fn kind(&self) -> ContainerKind {
        ContainerKind::NamedSequence
    }

    fn key(&self) -> &str {
        &self.name
    }

    fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    fn locate(&self, config: &MediationConfig) -> DebugResult<Arc<Step>> {
        if self.sequence_type.selects().0 != ContainerKind::NamedSequence {
            return Err(flow_mismatch(&self.name, self.sequence_type));
        }
        config
            .sequence(&self.name)
            .cloned()
            .ok_or_else(|| DebugError::ContainerNotFound {
                kind: "sequence",
                key: self.name.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySequence {
    pub proxy: String,
    pub sequence_type: SequenceType,
}

impl ContainerLocator for ProxySequence {
    fn kind(&self) -> ContainerKind {
        ContainerKind::ProxySequence
    }

    fn key(&self) -> &str {
        &self.proxy
    }

    fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    fn locate(&self, config: &MediationConfig) -> DebugResult<Arc<Step>> {
        let flow = match self.sequence_type.selects() {
            (ContainerKind::ProxySequence, Some(flow)) => flow,
            _ => return Err(flow_mismatch(&self.proxy, self.sequence_type)),
        };
        let proxy = config
            .proxy(&self.proxy)
            .ok_or_else(|| DebugError::ContainerNotFound {
                kind: "proxy",
                key: self.proxy.clone(),
            })?;
        proxy
            .sequences
            .get(flow)
            .cloned()
            .ok_or_else(|| flow_mismatch(&self.proxy, self.sequence_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResourceSequence {
    pub api: String,
    pub mapping: String,
    pub method: String,
    pub sequence_type: SequenceType,
}

impl ContainerLocator for ApiResourceSequence {
    fn kind(&self) -> ContainerKind {
        ContainerKind::ApiResourceSequence
    }

    fn key(&self) -> &str {
        &self.api
    }

    fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    fn locate(&self, config: &MediationConfig) -> DebugResult<Arc<Step>> {
        let flow = match self.sequence_type.selects() {
            (ContainerKind::ApiResourceSequence, Some(flow)) => flow,
            _ => return Err(flow_mismatch(&self.api, self.sequence_type)),
        };
        let api = config
            .api(&self.api)
            .ok_or_else(|| DebugError::ContainerNotFound {
                kind: "api",
                key: self.api.clone(),
            })?;
        let resource =
            api.resource(&self.mapping, &self.method)
                .ok_or_else(|| DebugError::ResourceNotFound {
                    api: self.api.clone(),
                    mapping: self.mapping.clone(),
                    method: self.method.clone(),
                })?;
        resource
            .sequences
            .get(flow)
            .cloned()
            .ok_or_else(|| flow_mismatch(&self.api, self.sequence_type))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
}

impl ContainerLocator for Template {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Template
    }

    fn key(&self) -> &str {
        &self.name
    }

    fn sequence_type(&self) -> SequenceType {
        SequenceType::Template
    }

    fn locate(&self, config: &MediationConfig) -> DebugResult<Arc<Step>> {
        config
            .template(&self.name)
            .cloned()
            .ok_or_else(|| DebugError::ContainerNotFound {
                kind: "template",
                key: self.name.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub connector: String,
    pub operation: String,
}

impl Connector {
    pub fn template_key(&self) -> String {
        format!("{CONNECTOR_NAMESPACE}.{}.{}", self.connector, self.operation)
    }
}

impl ContainerLocator for Connector {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Connector
    }

    fn key(&self) -> &str {
        &self.connector
    }

    fn sequence_type(&self) -> SequenceType {
        SequenceType::Connector
    }

    fn locate(&self, config: &MediationConfig) -> DebugResult<Arc<Step>> {
        let key = self.template_key();
        config
            .template(&key)
            .cloned()
            .ok_or(DebugError::ContainerNotFound {
                kind: "connector",
                key,
            })
    }
}

/// A container address as carried by a debug point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    Sequence(NamedSequence),
    Proxy(ProxySequence),
    Api(ApiResourceSequence),
    Template(Template),
    Connector(Connector),
}

impl Container {
    fn locator(&self) -> &dyn ContainerLocator {
        match self {
            Container::Sequence(c) => c,
            Container::Proxy(c) => c,
            Container::Api(c) => c,
            Container::Template(c) => c,
            Container::Connector(c) => c,
        }
    }
}

impl ContainerLocator for Container {
    fn kind(&self) -> ContainerKind {
        self.locator().kind()
    }

    fn key(&self) -> &str {
        self.locator().key()
    }

    fn sequence_type(&self) -> SequenceType {
        self.locator().sequence_type()
    }

    fn locate(&self, config: &MediationConfig) -> DebugResult<Arc<Step>> {
        self.locator().locate(config)
    }
}
