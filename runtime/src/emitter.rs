use async_trait::async_trait;
use mediary_core::{DebugEvent, EventSource};
use tokio::sync::broadcast;

/// Fan-out of lifecycle events to whoever is attached to the event channel.
///
/// Emitting never blocks the flow; with no subscriber the event is dropped.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<DebugEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn emit(&self, event: DebugEvent) {
        tracing::debug!(event = %event, "debug event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

pub struct EventStream {
    receiver: broadcast::Receiver<DebugEvent>,
}

#[async_trait]
impl EventSource<DebugEvent> for EventStream {
    async fn next_event(&mut self) -> Option<DebugEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
