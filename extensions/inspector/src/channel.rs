//! Line-oriented command and event channel loops.
//!
//! Both loops are generic over tokio's async I/O traits so they run the same
//! over TCP sockets and in-memory duplex pipes.

use crate::dispatcher::Dispatcher;
use async_trait::async_trait;
use mediary_core::{DebugError, DebugEvent, DebugResult, EventSink, EventSource};
use mediary_runtime::FlowController;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Reads commands until the client goes away, answering each on `writer`.
///
/// However the loop ends, every suspended flow is released afterwards so
/// mediation never stays parked on a dead channel.
pub async fn serve_commands<R, W>(
    reader: R,
    mut writer: W,
    dispatcher: &Dispatcher,
    controller: &FlowController,
) -> DebugResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let result = command_loop(reader, &mut writer, dispatcher).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "command channel failed");
    }
    let released = controller.release_all();
    if released > 0 {
        tracing::warn!(released, "released suspended flows after command channel closed");
    }
    result
}

async fn command_loop<R, W>(reader: R, writer: &mut W, dispatcher: &Dispatcher) -> DebugResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| DebugError::ChannelFailure(e.to_string()))?;
        let Some(line) = line else {
            tracing::info!("debug client closed the command channel");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        tracing::debug!(command = %line, "debug command received");
        if let Some(reply) = dispatcher.dispatch(&line) {
            write_line(writer, &reply.to_string())
                .await
                .map_err(|e| DebugError::ChannelFailure(e.to_string()))?;
        }
    }
}

/// Writes each event as one line.
pub struct LineEventSink<W> {
    writer: Mutex<W>,
}

impl<W> LineEventSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> EventSink<DebugEvent> for LineEventSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    type Error = std::io::Error;

    async fn send_event(&self, event: DebugEvent) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        write_line(&mut *writer, &event.to_string()).await
    }
}

/// Pumps events from `source` into `sink` until either side closes.
pub async fn forward_events<S, K>(mut source: S, sink: &K) -> DebugResult<()>
where
    S: EventSource<DebugEvent>,
    K: EventSink<DebugEvent, Error = std::io::Error>,
{
    while let Some(event) = source.next_event().await {
        sink.send_event(event).await.map_err(|e| {
            tracing::error!(error = %e, "event channel write failed");
            DebugError::ChannelFailure(e.to_string())
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediary_core::{MediationConfig, MessageContext, Receiver, Step};
    use mediary_runtime::{ControllerConfig, EventEmitter, MediationEngine};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, duplex};

    fn engine() -> Arc<MediationEngine> {
        let controller = Arc::new(FlowController::new(
            ControllerConfig::default(),
            EventEmitter::new(16),
        ));
        Arc::new(MediationEngine::new(
            MediationConfig::new().with_sequence("seq1", Step::composite("seq1", vec![])),
            controller,
        ))
    }

    #[tokio::test]
    async fn replies_follow_commands_and_malformed_lines_are_skipped() {
        let engine = engine();
        let dispatcher = Dispatcher::new(engine.clone());
        let (client, server) = duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, mut client_write) = tokio::io::split(client);

        let serve = tokio::spawn(async move {
            serve_commands(server_read, server_write, &dispatcher, engine.controller()).await
        });

        client_write
            .write_all(b"garbage\n\n{\"command\":\"resume\"}\n")
            .await
            .unwrap();
        let mut replies = BufReader::new(client_read).lines();
        assert_eq!(replies.next_line().await.unwrap().as_deref(), Some("failed"));

        client_write.shutdown().await.unwrap();
        assert!(serve.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn closing_the_command_channel_releases_parked_flows() {
        let engine = engine();
        let controller = engine.controller().clone();
        let dispatcher = Dispatcher::new(engine.clone());
        let (client, server) = duplex(1024);
        let (server_read, server_write) = tokio::io::split(server);

        let flow = controller.open_flow();
        let worker = {
            let controller = controller.clone();
            tokio::spawn(async move {
                let mut msg = MessageContext::new(json!("parked"));
                controller.on_flow_start(flow, Receiver::Synapse, &mut msg).await;
                msg
            })
        };
        while !controller.is_suspended() {
            tokio::task::yield_now().await;
        }

        drop(client);
        serve_commands(server_read, server_write, &dispatcher, &controller)
            .await
            .unwrap();

        assert_eq!(worker.await.unwrap().payload, json!("parked"));
        assert!(!controller.is_suspended());
    }

    #[tokio::test]
    async fn events_are_written_one_per_line() {
        let emitter = EventEmitter::new(8);
        let source = emitter.subscribe();
        let (client, server) = duplex(1024);
        let sink = LineEventSink::new(server);

        emitter.emit(DebugEvent::Started {
            receiver: Receiver::Synapse,
        });
        emitter.emit(DebugEvent::ResumedClient);
        drop(emitter);

        forward_events(source, &sink).await.unwrap();
        drop(sink);

        let mut lines = BufReader::new(client).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("started synapse"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("resumed client"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }
}
