use crate::point::DebugPoint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Represents a source of events (e.g., a broadcast subscription).
#[async_trait]
pub trait EventSource<E>: Send + Sync {
    /// Returns the next event, or None if the source is exhausted/closed.
    async fn next_event(&mut self) -> Option<E>;
}

/// Represents a sink for events (e.g., the client's event socket, a log).
#[async_trait]
pub trait EventSink<E>: Send + Sync {
    type Error: Send + Sync + 'static;

    /// Sends an event to the sink.
    async fn send_event(&self, event: E) -> Result<(), Self::Error>;
}

/// The entry point through which a message reached the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Receiver {
    /// Main mediation entry.
    Synapse,
    /// Response path of a non-blocking outbound call.
    Callback,
    /// Proxy service entry.
    ProxyService,
    Other(String),
}

impl Receiver {
    pub fn as_str(&self) -> &str {
        match self {
            Receiver::Synapse => "synapse",
            Receiver::Callback => "synapse-callback",
            Receiver::ProxyService => "proxy-service",
            Receiver::Other(name) => name,
        }
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notifications written to the event channel, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    Started { receiver: Receiver },
    SuspendedBreakpoint { point: Arc<DebugPoint> },
    ResumedClient,
    PassedSkipPoint { point: Arc<DebugPoint> },
    ContinuedCallback { receiver: Receiver },
    Terminated {
        start: Option<Receiver>,
        callback: Option<Receiver>,
    },
}

impl DebugEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DebugEvent::Started { .. } => "started",
            DebugEvent::SuspendedBreakpoint { .. } => "suspended breakpoint",
            DebugEvent::ResumedClient => "resumed client",
            DebugEvent::PassedSkipPoint { .. } => "passed skippoint",
            DebugEvent::ContinuedCallback { .. } => "continued callback",
            DebugEvent::Terminated { .. } => "terminated",
        }
    }
}

fn or_null(receiver: &Option<Receiver>) -> &str {
    receiver.as_ref().map_or("null", Receiver::as_str)
}

impl fmt::Display for DebugEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugEvent::Started { receiver } | DebugEvent::ContinuedCallback { receiver } => {
                write!(f, "{} {receiver}", self.name())
            }
            DebugEvent::SuspendedBreakpoint { point } | DebugEvent::PassedSkipPoint { point } => {
                write!(f, "{} {}", self.name(), point.descriptor())
            }
            DebugEvent::ResumedClient => f.write_str(self.name()),
            DebugEvent::Terminated { start, callback } => {
                write!(f, "{} {} {}", self.name(), or_null(start), or_null(callback))
            }
        }
    }
}
