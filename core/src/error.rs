use thiserror::Error;

pub type DebugResult<T> = Result<T, DebugError>;

/// Every way a debug interaction can fail.
///
/// None of these ever reach the mediation engine; they end as a `failed`
/// acknowledgment or a log line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugError {
    #[error("Malformed debug command: {0}")]
    Parse(String),

    #[error("Debug command is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Debug command field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Unknown debug command `{0}`")]
    UnknownCommand(String),

    #[error("No {kind} named `{key}`")]
    ContainerNotFound { kind: &'static str, key: String },

    #[error("API `{api}` has no resource matching {method} {mapping}")]
    ResourceNotFound {
        api: String,
        mapping: String,
        method: String,
    },

    #[error("`{key}` has no {sequence_type} sequence")]
    SequenceNotFound { key: String, sequence_type: String },

    #[error("No step at position [{path}] in `{key}`")]
    StepNotFound { key: String, path: String },

    #[error("A {kind} is already armed at [{path}] in `{key}`")]
    AlreadyArmed {
        kind: &'static str,
        key: String,
        path: String,
    },

    #[error("No {kind} is armed at [{path}] in `{key}`")]
    NotArmed {
        kind: &'static str,
        key: String,
        path: String,
    },

    #[error("No mediation flow is suspended")]
    NotSuspended,

    #[error("Debug channel failure: {0}")]
    ChannelFailure(String),
}

impl DebugError {
    /// Whether the client should receive a `failed` acknowledgment.
    ///
    /// Syntactic problems (unparsable line, absent or malformed field) are
    /// only logged.
    pub fn is_acknowledged(&self) -> bool {
        !matches!(
            self,
            DebugError::Parse(_)
                | DebugError::MissingField(_)
                | DebugError::InvalidField { .. }
                | DebugError::ChannelFailure(_)
        )
    }
}
