use chrono::{DateTime, Utc};
use mediary_core::Receiver;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one message's pass through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(Uuid);

impl FlowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a live flow. A terminated flow has no session at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Running,
    Suspended,
    Resumed,
}

#[derive(Debug, Clone)]
pub(crate) struct FlowSession {
    pub(crate) state: FlowState,
    pub(crate) start_receiver: Option<Receiver>,
    pub(crate) callback_receiver: Option<Receiver>,
    pub(crate) opened_at: DateTime<Utc>,
}

impl FlowSession {
    pub(crate) fn new() -> Self {
        Self {
            state: FlowState::Running,
            start_receiver: None,
            callback_receiver: None,
            opened_at: Utc::now(),
        }
    }

    pub(crate) fn snapshot(&self, id: FlowId) -> FlowSnapshot {
        FlowSnapshot {
            id,
            state: self.state,
            start_receiver: self.start_receiver.clone(),
            callback_receiver: self.callback_receiver.clone(),
            opened_at: self.opened_at,
        }
    }
}

/// Read-only view of a live flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub id: FlowId,
    pub state: FlowState,
    pub start_receiver: Option<Receiver>,
    pub callback_receiver: Option<Receiver>,
    pub opened_at: DateTime<Utc>,
}
