//! Scoped properties of an in-flight message.

use crate::error::DebugError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Engine-scope key that selects the outbound message formatter.
pub const MESSAGE_TYPE: &str = "messageType";
/// Engine-scope key mirrored from [`MESSAGE_TYPE`].
pub const CONTENT_TYPE: &str = "ContentType";
/// Transport header mirrored from [`MESSAGE_TYPE`].
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Independent property namespaces attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyScope {
    /// Bulk-read aggregate of `Engine` and `Message`.
    All,
    /// Engine-level message context (`axis2`).
    Engine,
    /// Mediation-level properties (`synapse` / `default`).
    Message,
    /// Options of the outbound call (`axis2-client`).
    ClientOptions,
    /// Transport headers (`transport`).
    Transport,
    /// Per-operation metadata (`operation`).
    Operation,
}

impl PropertyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyScope::All => "all",
            PropertyScope::Engine => "axis2",
            PropertyScope::Message => "synapse",
            PropertyScope::ClientOptions => "axis2-client",
            PropertyScope::Transport => "transport",
            PropertyScope::Operation => "operation",
        }
    }

    /// Key wrapping a bulk read of this scope.
    fn bulk_label(&self) -> &'static str {
        match self {
            PropertyScope::All | PropertyScope::Message => "synapse-properties",
            PropertyScope::Engine => "axis2-properties",
            PropertyScope::ClientOptions => "axis2Client-properties",
            PropertyScope::Transport => "axis2Transport-properties",
            PropertyScope::Operation => "axis2Operation-properties",
        }
    }
}

impl fmt::Display for PropertyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyScope {
    type Err = DebugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(PropertyScope::All),
            "axis2" => Ok(PropertyScope::Engine),
            "synapse" | "default" => Ok(PropertyScope::Message),
            "axis2-client" => Ok(PropertyScope::ClientOptions),
            "transport" => Ok(PropertyScope::Transport),
            "operation" => Ok(PropertyScope::Operation),
            other => Err(DebugError::InvalidField {
                field: "context",
                reason: format!("unknown property context `{other}`"),
            }),
        }
    }
}

/// An in-flight message as seen by mediators and the debugger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageContext {
    pub message_id: String,
    pub payload: Value,
    properties: Map<String, Value>,
    engine: Map<String, Value>,
    client_options: Map<String, Value>,
    operation: Map<String, Value>,
    /// Created on first write; a message may arrive without headers.
    transport_headers: Option<Map<String, Value>>,
}

impl MessageContext {
    pub fn new(payload: Value) -> Self {
        Self {
            message_id: format!("urn:uuid:{}", Uuid::new_v4()),
            payload,
            ..Self::default()
        }
    }

    pub fn with_transport_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.transport_headers = Some(
            headers
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        );
        self
    }

    pub fn has_transport_headers(&self) -> bool {
        self.transport_headers.is_some()
    }

    fn store(&self, scope: PropertyScope) -> Option<&Map<String, Value>> {
        match scope {
            PropertyScope::Message => Some(&self.properties),
            PropertyScope::Engine => Some(&self.engine),
            PropertyScope::ClientOptions => Some(&self.client_options),
            PropertyScope::Operation => Some(&self.operation),
            PropertyScope::Transport => self.transport_headers.as_ref(),
            PropertyScope::All => None,
        }
    }

    /// Raw lookup. `All` searches `Message` first, then `Engine`.
    pub fn property(&self, scope: PropertyScope, name: &str) -> Option<&Value> {
        match scope {
            PropertyScope::All => self
                .properties
                .get(name)
                .or_else(|| self.engine.get(name)),
            _ => self.store(scope).and_then(|store| store.get(name)),
        }
    }

    /// `{"<name>": <value>}`, with `null` for an absent property.
    pub fn get_property(&self, scope: PropertyScope, name: &str) -> Value {
        let mut response = Map::new();
        response.insert(
            name.to_string(),
            self.property(scope, name).cloned().unwrap_or(Value::Null),
        );
        Value::Object(response)
    }

    /// Every entry of `scope`, wrapped under the scope's label.
    ///
    /// `All` yields an array of the engine and message objects.
    pub fn get_properties(&self, scope: PropertyScope) -> Value {
        let labelled = |scope: PropertyScope| {
            let mut wrapper = Map::new();
            wrapper.insert(
                scope.bulk_label().to_string(),
                Value::Object(self.store(scope).cloned().unwrap_or_default()),
            );
            Value::Object(wrapper)
        };

        match scope {
            PropertyScope::All => Value::Array(vec![
                labelled(PropertyScope::Engine),
                labelled(PropertyScope::Message),
            ]),
            _ => labelled(scope),
        }
    }

    /// Writes `name` into `scope`. Writing to `All` is a no-op.
    pub fn set_property(&mut self, scope: PropertyScope, name: &str, value: Value) {
        match scope {
            PropertyScope::Message => {
                self.properties.insert(name.to_string(), value);
            }
            PropertyScope::Engine => {
                if name == MESSAGE_TYPE {
                    self.engine.insert(CONTENT_TYPE.to_string(), value.clone());
                    if let Some(headers) = self.transport_headers.as_mut() {
                        headers.insert(CONTENT_TYPE_HEADER.to_string(), header_value(&value));
                    }
                }
                self.engine.insert(name.to_string(), value);
            }
            PropertyScope::ClientOptions => {
                self.client_options.insert(name.to_string(), value);
            }
            PropertyScope::Operation => {
                self.operation.insert(name.to_string(), value);
            }
            PropertyScope::Transport => {
                self.transport_headers
                    .get_or_insert_with(Map::new)
                    .insert(name.to_string(), header_value(&value));
            }
            PropertyScope::All => {
                tracing::debug!(property = name, "ignoring write to the aggregate scope");
            }
        }
    }

    /// Removes `name` from `scope`, returning the previous value.
    ///
    /// Scopes without a removal path leave the message untouched.
    pub fn remove_property(&mut self, scope: PropertyScope, name: &str) -> Option<Value> {
        match scope {
            PropertyScope::Message => self.properties.remove(name),
            PropertyScope::Engine => self.engine.remove(name),
            PropertyScope::Transport => self
                .transport_headers
                .as_mut()
                .and_then(|headers| headers.remove(name)),
            PropertyScope::ClientOptions | PropertyScope::Operation | PropertyScope::All => {
                tracing::debug!(%scope, property = name, "scope has no removal path");
                None
            }
        }
    }
}

/// Transport headers are string-valued.
fn header_value(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}
