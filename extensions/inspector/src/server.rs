use crate::channel::{LineEventSink, forward_events, serve_commands};
use crate::config::DebugConfig;
use crate::dispatcher::Dispatcher;
use anyhow::Context;
use mediary_runtime::MediationEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// TCP front of the debug plane: one listener for commands, one for events.
///
/// A single client is served at a time. When it goes away the server
/// releases anything it left suspended and waits for the next one.
pub struct DebugServer {
    engine: Arc<MediationEngine>,
    command_listener: TcpListener,
    event_listener: TcpListener,
    shutdown: watch::Sender<bool>,
}

impl DebugServer {
    pub async fn bind(config: &DebugConfig, engine: Arc<MediationEngine>) -> anyhow::Result<Self> {
        let command_listener = TcpListener::bind(config.command_addr())
            .await
            .with_context(|| format!("binding command channel on {}", config.command_addr()))?;
        let event_listener = TcpListener::bind(config.event_addr())
            .await
            .with_context(|| format!("binding event channel on {}", config.event_addr()))?;
        let (shutdown, _) = watch::channel(false);

        let server = Self {
            engine,
            command_listener,
            event_listener,
            shutdown,
        };
        tracing::info!(
            command = %server.command_addr()?,
            event = %server.event_addr()?,
            "debug server listening"
        );
        Ok(server)
    }

    pub fn command_addr(&self) -> anyhow::Result<SocketAddr> {
        self.command_listener
            .local_addr()
            .context("reading command channel address")
    }

    pub fn event_addr(&self) -> anyhow::Result<SocketAddr> {
        self.event_listener
            .local_addr()
            .context("reading event channel address")
    }

    pub fn engine(&self) -> &Arc<MediationEngine> {
        &self.engine
    }

    /// Accepts clients until [`DebugServer::shutdown`] is called.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let mut stop = self.shutdown.subscribe();
        loop {
            if *stop.borrow() {
                break;
            }

            let (commands, command_peer) = tokio::select! {
                accepted = self.command_listener.accept() => accepted.context("accepting command channel")?,
                _ = stop.changed() => break,
            };
            let (events, event_peer) = tokio::select! {
                accepted = self.event_listener.accept() => accepted.context("accepting event channel")?,
                _ = stop.changed() => break,
            };
            tracing::info!(%command_peer, %event_peer, "debug client attached");

            self.run_session(commands, events, &mut stop).await;
            tracing::info!(%command_peer, "debug client detached");
        }

        let released = self.engine.controller().release_all();
        tracing::info!(released, "debug server stopped");
        Ok(())
    }

    /// Closes both channels. Suspended flows are released.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    async fn run_session(
        &self,
        commands: TcpStream,
        events: TcpStream,
        stop: &mut watch::Receiver<bool>,
    ) {
        let controller = self.engine.controller().clone();
        // Subscribe before the first command is read so nothing the client
        // provokes can be emitted ahead of the subscription.
        let source = controller.emitter().subscribe();
        let sink = LineEventSink::new(events);
        let dispatcher = Dispatcher::new(self.engine.clone());
        let (reader, writer) = commands.into_split();

        tokio::select! {
            result = serve_commands(reader, writer, &dispatcher, &controller) => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "command channel ended with an error");
                }
            }
            result = forward_events(source, &sink) => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "event channel ended with an error");
                }
            }
            _ = stop.changed() => {
                tracing::info!("debug session interrupted by shutdown");
            }
        }

        let released = controller.release_all();
        if released > 0 {
            tracing::warn!(released, "released suspended flows at end of debug session");
        }
    }
}
