use crate::marker::DebugMarkers;
use crate::property::MessageContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub type StepError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
pub enum StepResult {
    Next,
    Terminate,
    Error(StepError),
}

/// The processing logic of an atomic step.
///
/// Implemented by the mediation engine's mediators (log, transform, send, ...).
#[async_trait]
pub trait Mediator: Send + Sync {
    fn label(&self) -> &str;
    async fn mediate(&self, msg: &mut MessageContext) -> StepResult;
}

/// Identity of one concrete step instance inside a loaded tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(Uuid);

impl StepId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub enum StepBody {
    Atomic(Box<dyn Mediator>),
    Composite(Vec<Arc<Step>>),
}

/// One node of a container's step tree.
pub struct Step {
    id: StepId,
    label: String,
    markers: DebugMarkers,
    body: StepBody,
}

impl Step {
    pub fn atomic<M: Mediator + 'static>(mediator: M) -> Arc<Self> {
        Arc::new(Self {
            id: StepId::new(),
            label: mediator.label().to_string(),
            markers: DebugMarkers::default(),
            body: StepBody::Atomic(Box::new(mediator)),
        })
    }

    pub fn composite(label: impl Into<String>, children: Vec<Arc<Step>>) -> Arc<Self> {
        Arc::new(Self {
            id: StepId::new(),
            label: label.into(),
            markers: DebugMarkers::default(),
            body: StepBody::Composite(children),
        })
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn markers(&self) -> &DebugMarkers {
        &self.markers
    }

    pub fn body(&self) -> &StepBody {
        &self.body
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.body, StepBody::Composite(_))
    }

    /// Children of a composite step; atomic steps have none.
    pub fn children(&self) -> &[Arc<Step>] {
        match &self.body {
            StepBody::Composite(children) => children,
            StepBody::Atomic(_) => &[],
        }
    }

    pub fn child(&self, index: usize) -> Option<&Arc<Step>> {
        self.children().get(index)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("markers", &self.markers)
            .field("children", &self.children().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Mediator for Noop {
        fn label(&self) -> &str {
            "noop"
        }

        async fn mediate(&self, _msg: &mut MessageContext) -> StepResult {
            StepResult::Next
        }
    }

    #[test]
    fn atomic_steps_have_no_children() {
        let step = Step::atomic(Noop);
        assert!(!step.is_composite());
        assert!(step.children().is_empty());
        assert!(step.child(0).is_none());
        assert_eq!(step.label(), "noop");
    }

    #[test]
    fn composite_children_are_indexed_in_order() {
        let first = Step::atomic(Noop);
        let second = Step::atomic(Noop);
        let seq = Step::composite("seq", vec![first.clone(), second.clone()]);

        assert!(seq.is_composite());
        assert_eq!(seq.child(0).map(|s| s.id()), Some(first.id()));
        assert_eq!(seq.child(1).map(|s| s.id()), Some(second.id()));
        assert!(seq.child(2).is_none());
    }
}
