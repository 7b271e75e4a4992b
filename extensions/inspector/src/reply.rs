use serde_json::Value;
use std::fmt;

/// What goes back on the command channel for one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Failed,
    /// Property reads. Rendered compactly so the response stays one line.
    Json(Value),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str("ok"),
            Reply::Failed => f.write_str("failed"),
            Reply::Json(value) => write!(f, "{value}"),
        }
    }
}
