use crate::protocol::Command;
use crate::reply::Reply;
use mediary_core::DebugResult;
use mediary_runtime::MediationEngine;
use std::sync::Arc;

/// Routes decoded commands to the registry, the controller and the
/// suspended message.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    engine: Arc<MediationEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<MediationEngine>) -> Self {
        Self { engine }
    }

    /// Handles one command line.
    ///
    /// Returns `None` when the line is dropped without acknowledgment.
    pub fn dispatch(&self, line: &str) -> Option<Reply> {
        let command = match Command::decode(line) {
            Ok(command) => command,
            Err(e) if e.is_acknowledged() => {
                tracing::warn!(error = %e, "rejecting debug command");
                return Some(Reply::Failed);
            }
            Err(e) => {
                tracing::error!(error = %e, "dropping malformed debug command");
                return None;
            }
        };

        let verb = command.verb();
        match self.execute(command) {
            Ok(reply) => {
                tracing::debug!(command = verb, "debug command handled");
                Some(reply)
            }
            Err(e) => {
                tracing::warn!(command = verb, error = %e, "debug command failed");
                Some(Reply::Failed)
            }
        }
    }

    fn execute(&self, command: Command) -> DebugResult<Reply> {
        let controller = self.engine.controller();
        match command {
            Command::Arm(point) => {
                tracing::info!(kind = %point.kind, key = point.key(), "arming debug point");
                self.engine.registry().arm(&self.engine.config(), point)?;
                Ok(Reply::Ok)
            }
            Command::Disarm(point) => {
                tracing::info!(kind = %point.kind, key = point.key(), "clearing debug point");
                self.engine.registry().disarm(&self.engine.config(), &point)?;
                Ok(Reply::Ok)
            }
            Command::Resume => {
                let flow = controller.resume()?;
                tracing::info!(flow_id = %flow, "resume requested");
                Ok(Reply::Ok)
            }
            Command::SetProperty { scope, name, value } => {
                controller.with_suspended_message(|msg| msg.set_property(scope, &name, value))?;
                tracing::debug!(%scope, property = %name, "property set");
                Ok(Reply::Ok)
            }
            Command::ClearProperty { scope, name } => {
                let removed =
                    controller.with_suspended_message(|msg| msg.remove_property(scope, &name))?;
                tracing::debug!(%scope, property = %name, removed = removed.is_some(), "property cleared");
                Ok(Reply::Ok)
            }
            Command::GetProperty { scope, name } => {
                let value = controller.with_suspended_message(|msg| msg.get_property(scope, &name))?;
                Ok(Reply::Json(value))
            }
            Command::GetProperties { scope } => {
                let value = controller.with_suspended_message(|msg| msg.get_properties(scope))?;
                Ok(Reply::Json(value))
            }
        }
    }
}
