use crate::container::SequenceType;
use crate::locator::{Container, ContainerLocator};
use crate::path::StepPath;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointKind {
    Breakpoint,
    SkipPoint,
}

impl PointKind {
    /// Human-readable name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Breakpoint => "breakpoint",
            PointKind::SkipPoint => "skip point",
        }
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-armed point: which container, which step inside it, which kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugPoint {
    pub kind: PointKind,
    pub container: Container,
    pub path: StepPath,
}

impl DebugPoint {
    pub fn new(kind: PointKind, container: Container, path: StepPath) -> Self {
        Self {
            kind,
            container,
            path,
        }
    }

    pub fn key(&self) -> &str {
        self.container.key()
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.container.sequence_type()
    }

    /// `<SEQUENCE_TYPE> <key> <pos0> <pos1> ... ` as carried by events.
    pub fn descriptor(&self) -> String {
        format!(
            "{} {} {}",
            self.sequence_type(),
            self.key(),
            self.path.to_event_string()
        )
    }
}
