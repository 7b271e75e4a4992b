//! Structural step addresses and their resolution.

use crate::error::{DebugError, DebugResult};
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Root-relative child indices locating a step inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepPath(Vec<usize>);

impl StepPath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Event rendering: every index followed by a single space.
    pub fn to_event_string(&self) -> String {
        self.0.iter().map(|i| format!("{i} ")).collect()
    }
}

impl From<Vec<usize>> for StepPath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl FromStr for StepPath {
    type Err = DebugError;

    /// Parses a whitespace-separated `mediator-position` value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let indices = s
            .split_whitespace()
            .map(|token| {
                token.parse::<usize>().map_err(|_| DebugError::InvalidField {
                    field: "mediator-position",
                    reason: format!("`{token}` is not a non-negative integer"),
                })
            })
            .collect::<DebugResult<Vec<_>>>()?;

        if indices.is_empty() {
            return Err(DebugError::InvalidField {
                field: "mediator-position",
                reason: "no positions given".to_string(),
            });
        }
        Ok(Self(indices))
    }
}

impl fmt::Display for StepPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for index in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{index}")?;
            first = false;
        }
        Ok(())
    }
}

/// Walks `path` down from a container's root composite step.
///
/// Returns `None` when an index is out of range or a step along the way is
/// atomic. Pure: repeated calls against an unchanged tree yield the same step.
pub fn resolve(root: &Arc<Step>, path: &StepPath) -> Option<Arc<Step>> {
    let (first, rest) = path.indices().split_first()?;
    let mut current = root.child(*first)?;
    for index in rest {
        current = current.child(*index)?;
    }
    Some(Arc::clone(current))
}
