//! Debug plane front end.
//!
//! Decodes line-delimited JSON commands, routes them to the mediation
//! engine's registry and flow controller, and narrates lifecycle events on a
//! second channel. [`DebugServer`] wires both channels to TCP.
//!
//! ```no_run
//! use mediary_core::MediationConfig;
//! use mediary_inspector::{DebugConfig, DebugServer, telemetry};
//! use mediary_runtime::{EventEmitter, FlowController, MediationEngine};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! telemetry::init_stdout_tracing();
//! let config = DebugConfig::load(None)?;
//! let controller = Arc::new(FlowController::new(
//!     config.controller_config(),
//!     EventEmitter::new(config.event_buffer),
//! ));
//! let engine = Arc::new(MediationEngine::new(MediationConfig::new(), controller));
//! let server = DebugServer::bind(&config, engine).await?;
//! server.serve().await
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod reply;
pub mod server;
pub mod telemetry;

pub use channel::{LineEventSink, forward_events, serve_commands};
pub use config::DebugConfig;
pub use dispatcher::Dispatcher;
pub use protocol::Command;
pub use reply::Reply;
pub use server::DebugServer;
