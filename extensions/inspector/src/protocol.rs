//! Decoding of command-channel lines.
//!
//! One JSON object per line, for example:
//!
//! ```text
//! {"command":"set","command-argument":"breakpoint","mediation-component":"sequence",
//!  "sequence":{"sequence-key":"seq1","sequence-type":"NAMED","mediator-position":"0"}}
//! ```

use mediary_core::{
    ApiResourceSequence, Connector, Container, DebugError, DebugPoint, DebugResult, NamedSequence,
    PointKind, PropertyScope, ProxySequence, SequenceType, StepPath, Template,
};
use serde_json::{Map, Value};

type Object = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Arm(DebugPoint),
    Disarm(DebugPoint),
    SetProperty {
        scope: PropertyScope,
        name: String,
        value: Value,
    },
    ClearProperty {
        scope: PropertyScope,
        name: String,
    },
    GetProperty {
        scope: PropertyScope,
        name: String,
    },
    GetProperties {
        scope: PropertyScope,
    },
    Resume,
}

impl Command {
    /// The wire verb, used for logging.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Arm(_) | Command::SetProperty { .. } => "set",
            Command::Disarm(_) | Command::ClearProperty { .. } => "clear",
            Command::GetProperty { .. } | Command::GetProperties { .. } => "get",
            Command::Resume => "resume",
        }
    }

    pub fn decode(line: &str) -> DebugResult<Self> {
        let parsed: Value =
            serde_json::from_str(line).map_err(|e| DebugError::Parse(e.to_string()))?;
        let Value::Object(object) = parsed else {
            return Err(DebugError::Parse("expected a JSON object".to_string()));
        };

        let command = str_field(&object, "command")?;
        match command {
            "resume" => Ok(Command::Resume),
            "set" | "clear" => {
                let set = command == "set";
                match argument(&object)? {
                    "breakpoint" => point(&object, PointKind::Breakpoint, set),
                    "skip" => point(&object, PointKind::SkipPoint, set),
                    "property" => property_change(&object, set),
                    other => Err(DebugError::UnknownCommand(format!("{command} {other}"))),
                }
            }
            "get" => match argument(&object)? {
                "property" => Ok(Command::GetProperty {
                    scope: scope(&object)?,
                    name: property_name(&object)?,
                }),
                "properties" => Ok(Command::GetProperties {
                    scope: scope(&object)?,
                }),
                other => Err(DebugError::UnknownCommand(format!("get {other}"))),
            },
            other => Err(DebugError::UnknownCommand(other.to_string())),
        }
    }
}

fn str_field<'a>(object: &'a Object, field: &'static str) -> DebugResult<&'a str> {
    match object.get(field) {
        None => Err(DebugError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(DebugError::InvalidField {
            field,
            reason: "expected a string".to_string(),
        }),
    }
}

fn object_field<'a>(object: &'a Object, field: &'static str) -> DebugResult<&'a Object> {
    match object.get(field) {
        None => Err(DebugError::MissingField(field)),
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(DebugError::InvalidField {
            field,
            reason: "expected an object".to_string(),
        }),
    }
}

/// `command-argument`, with `argument` accepted as an alias.
fn argument(object: &Object) -> DebugResult<&str> {
    match str_field(object, "command-argument") {
        Err(DebugError::MissingField(_)) => {
            str_field(object, "argument").map_err(|e| match e {
                DebugError::MissingField(_) => DebugError::MissingField("command-argument"),
                other => other,
            })
        }
        found => found,
    }
}

fn scope(object: &Object) -> DebugResult<PropertyScope> {
    str_field(object, "context")?.parse()
}

fn property_name(object: &Object) -> DebugResult<String> {
    let property = object_field(object, "property")?;
    Ok(str_field(property, "property-name")?.to_string())
}

fn property_change(object: &Object, set: bool) -> DebugResult<Command> {
    let scope = scope(object)?;
    let property = object_field(object, "property")?;
    let name = str_field(property, "property-name")?.to_string();

    if !set {
        return Ok(Command::ClearProperty { scope, name });
    }
    let value = property
        .get("property-value")
        .cloned()
        .ok_or(DebugError::MissingField("property-value"))?;
    Ok(Command::SetProperty { scope, name, value })
}

fn position(object: &Object) -> DebugResult<StepPath> {
    str_field(object, "mediator-position")?.parse()
}

fn sequence_type(object: &Object) -> DebugResult<SequenceType> {
    str_field(object, "sequence-type")?.parse()
}

fn point(object: &Object, kind: PointKind, set: bool) -> DebugResult<Command> {
    let component = str_field(object, "mediation-component")?;
    let (container, path) = match component {
        "sequence" => sequence_container(object_field(object, "sequence")?)?,
        "proxy" => nested_container(object, "proxy")?,
        "api" => nested_container(object, "api")?,
        "template" => {
            let args = object_field(object, "template")?;
            let template = Template {
                name: str_field(args, "template-key")?.to_string(),
            };
            (Container::Template(template), position(args)?)
        }
        "connector" => {
            let args = object_field(object, "connector")?;
            let connector = Connector {
                connector: str_field(args, "connector-key")?.to_string(),
                operation: str_field(args, "method-name")?.to_string(),
            };
            (Container::Connector(connector), position(args)?)
        }
        other => {
            return Err(DebugError::InvalidField {
                field: "mediation-component",
                reason: format!("unknown component `{other}`"),
            });
        }
    };

    let point = DebugPoint::new(kind, container, path);
    Ok(if set {
        Command::Arm(point)
    } else {
        Command::Disarm(point)
    })
}

/// `proxy` and `api` components carry their payload either inside a
/// `sequence` wrapper or directly at the top level.
fn nested_container(object: &Object, component: &'static str) -> DebugResult<(Container, StepPath)> {
    let args = match object.get("sequence") {
        Some(_) => object_field(object, "sequence")?,
        None => object,
    };
    if !args.contains_key(component) {
        return Err(DebugError::MissingField(component));
    }
    sequence_container(args)
}

/// A `sequence` payload addresses a named sequence, or carries a nested
/// `proxy` or `api` object.
fn sequence_container(args: &Object) -> DebugResult<(Container, StepPath)> {
    if args.contains_key("proxy") {
        let proxy = object_field(args, "proxy")?;
        let container = Container::Proxy(ProxySequence {
            proxy: str_field(proxy, "proxy-key")?.to_string(),
            sequence_type: sequence_type(proxy)?,
        });
        return Ok((container, position(proxy)?));
    }

    if args.contains_key("api") {
        let api = object_field(args, "api")?;
        let resource = object_field(api, "resource")?;
        let mapping = match str_field(resource, "uri-template") {
            Err(DebugError::MissingField(_)) => str_field(resource, "url-mapping")?,
            found => found?,
        };
        let container = Container::Api(ApiResourceSequence {
            api: str_field(api, "api-key")?.to_string(),
            mapping: mapping.to_string(),
            method: str_field(resource, "method")?.to_string(),
            sequence_type: sequence_type(api)?,
        });
        return Ok((container, position(api)?));
    }

    let container = Container::Sequence(NamedSequence {
        name: str_field(args, "sequence-key")?.to_string(),
        sequence_type: sequence_type(args)?,
    });
    Ok((container, position(args)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> DebugResult<Command> {
        Command::decode(&value.to_string())
    }

    #[test]
    fn decodes_named_sequence_breakpoint() {
        let command = decode(json!({
            "command": "set",
            "command-argument": "breakpoint",
            "mediation-component": "sequence",
            "sequence": {
                "sequence-key": "seq1",
                "sequence-type": "NAMED",
                "mediator-position": "0 2"
            }
        }))
        .unwrap();

        let Command::Arm(point) = command else {
            panic!("expected arm, got {command:?}");
        };
        assert_eq!(point.kind, PointKind::Breakpoint);
        assert_eq!(point.descriptor(), "NAMED seq1 0 2 ");
    }

    #[test]
    fn accepts_argument_alias() {
        let command = decode(json!({
            "command": "clear",
            "argument": "skip",
            "mediation-component": "template",
            "template": {"template-key": "retry", "mediator-position": "1"}
        }))
        .unwrap();
        assert!(matches!(command, Command::Disarm(ref p) if p.kind == PointKind::SkipPoint));
    }

    #[test]
    fn decodes_api_resource_with_url_mapping() {
        let command = decode(json!({
            "command": "set",
            "command-argument": "skip",
            "mediation-component": "sequence",
            "sequence": {
                "api": {
                    "api-key": "orders",
                    "sequence-type": "API_INSEQ",
                    "mediator-position": "3",
                    "resource": {"url-mapping": "/items/*", "method": "POST"}
                }
            }
        }))
        .unwrap();

        let Command::Arm(point) = command else {
            panic!("expected arm");
        };
        assert_eq!(
            point.container,
            Container::Api(ApiResourceSequence {
                api: "orders".into(),
                mapping: "/items/*".into(),
                method: "POST".into(),
                sequence_type: SequenceType::ApiIn,
            })
        );
    }

    #[test]
    fn decodes_proxy_and_connector_points() {
        let proxy = decode(json!({
            "command": "set",
            "command-argument": "breakpoint",
            "mediation-component": "sequence",
            "sequence": {"proxy": {
                "proxy-key": "echo", "sequence-type": "PROXY_OUTSEQ", "mediator-position": "0"
            }}
        }))
        .unwrap();
        assert!(matches!(proxy, Command::Arm(ref p) if p.key() == "echo"));

        let connector = decode(json!({
            "command": "set",
            "command-argument": "breakpoint",
            "mediation-component": "connector",
            "connector": {"connector-key": "gmail", "method-name": "send", "mediator-position": "0"}
        }))
        .unwrap();
        assert!(matches!(connector, Command::Arm(ref p) if p.descriptor() == "CONNECTOR gmail 0 "));
    }

    #[test]
    fn decodes_property_commands() {
        assert_eq!(
            decode(json!({
                "command": "get",
                "command-argument": "property",
                "context": "synapse",
                "property": {"property-name": "X"}
            }))
            .unwrap(),
            Command::GetProperty {
                scope: PropertyScope::Message,
                name: "X".into()
            }
        );
        assert_eq!(
            decode(json!({"command": "get", "command-argument": "properties", "context": "all"}))
                .unwrap(),
            Command::GetProperties {
                scope: PropertyScope::All
            }
        );
        assert_eq!(
            decode(json!({
                "command": "set",
                "command-argument": "property",
                "context": "transport",
                "property": {"property-name": "X-Trace", "property-value": "abc"}
            }))
            .unwrap(),
            Command::SetProperty {
                scope: PropertyScope::Transport,
                name: "X-Trace".into(),
                value: json!("abc")
            }
        );
    }

    #[test]
    fn classifies_failures() {
        assert!(matches!(
            Command::decode("{not json"),
            Err(DebugError::Parse(_))
        ));
        assert!(matches!(
            decode(json!({"argument": "skip"})),
            Err(DebugError::MissingField("command"))
        ));
        assert!(matches!(
            decode(json!({"command": "exit"})),
            Err(DebugError::UnknownCommand(_))
        ));
        assert!(matches!(
            decode(json!({"command": "set", "command-argument": "watch"})),
            Err(DebugError::UnknownCommand(_))
        ));
        assert!(matches!(
            decode(json!({"command": "get", "command-argument": "watch"})),
            Err(DebugError::UnknownCommand(_))
        ));
        assert!(matches!(
            decode(json!({"command": "get", "command-argument": "properties"})),
            Err(DebugError::MissingField("context"))
        ));
        assert!(matches!(
            decode(json!({
                "command": "set",
                "command-argument": "property",
                "context": "synapse",
                "property": {"property-name": "X"}
            })),
            Err(DebugError::MissingField("property-value"))
        ));
        assert!(matches!(
            decode(json!({
                "command": "set",
                "command-argument": "breakpoint",
                "mediation-component": "sequence",
                "sequence": {"sequence-key": "s", "sequence-type": "NAMED", "mediator-position": ""}
            })),
            Err(DebugError::InvalidField { field: "mediator-position", .. })
        ));
    }

    #[test]
    fn proxy_and_api_components_address_their_sequences() {
        let top_level = decode(json!({
            "command": "set",
            "command-argument": "breakpoint",
            "mediation-component": "proxy",
            "proxy": {"proxy-key": "echo", "sequence-type": "PROXY_INSEQ", "mediator-position": "1"}
        }))
        .unwrap();
        assert!(matches!(top_level, Command::Arm(ref p) if p.descriptor() == "PROXY_INSEQ echo 1 "));

        let wrapped = decode(json!({
            "command": "clear",
            "command-argument": "skip",
            "mediation-component": "api",
            "sequence": {"api": {
                "api-key": "orders",
                "sequence-type": "API_OUTSEQ",
                "mediator-position": "0",
                "resource": {"uri-template": "/items/{id}", "method": "GET"}
            }}
        }))
        .unwrap();
        assert!(matches!(wrapped, Command::Disarm(ref p) if p.key() == "orders"));

        assert!(matches!(
            decode(json!({
                "command": "set",
                "command-argument": "breakpoint",
                "mediation-component": "api",
                "proxy": {"proxy-key": "echo", "sequence-type": "PROXY_INSEQ", "mediator-position": "1"}
            })),
            Err(DebugError::MissingField("api"))
        ));
    }
}
