//! A reference mediation engine.
//!
//! Walks a container's step tree in order and reports every flow point to
//! the [`FlowController`]. Real deployments embed their own engine; this one
//! exists so the debug plane can be driven end to end.

use crate::controller::FlowController;
use crate::session::FlowId;
use mediary_core::{
    Container, ContainerLocator, DebugPointRegistry, DebugResult, MediationConfig, MessageContext,
    PointKind, Receiver, Step, StepBody, StepResult,
};
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::Instrument;

/// Type alias for async boxed futures used in the recursive step walk.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Every step returned `Next`.
    Completed,
    /// A step ended the flow early.
    Terminated,
    Faulted(String),
}

impl From<StepResult> for FlowOutcome {
    fn from(result: StepResult) -> Self {
        match result {
            StepResult::Next => FlowOutcome::Completed,
            StepResult::Terminate => FlowOutcome::Terminated,
            StepResult::Error(e) => FlowOutcome::Faulted(e.to_string()),
        }
    }
}

pub struct MediationEngine {
    config: RwLock<Arc<MediationConfig>>,
    registry: Arc<DebugPointRegistry>,
    controller: Arc<FlowController>,
}

impl fmt::Debug for MediationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediationEngine")
            .field("registry", &self.registry)
            .field("suspended", &self.controller.is_suspended())
            .finish_non_exhaustive()
    }
}

impl MediationEngine {
    pub fn new(config: MediationConfig, controller: Arc<FlowController>) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            registry: Arc::new(DebugPointRegistry::new()),
            controller,
        }
    }

    /// The configuration currently in force.
    pub fn config(&self) -> Arc<MediationConfig> {
        Arc::clone(&self.config.read())
    }

    pub fn registry(&self) -> &Arc<DebugPointRegistry> {
        &self.registry
    }

    pub fn controller(&self) -> &Arc<FlowController> {
        &self.controller
    }

    /// Swaps in a rebuilt configuration. Armed points belong to the old
    /// step trees and are dropped.
    pub fn reload(&self, config: MediationConfig) {
        let dropped = self.registry.len();
        *self.config.write() = Arc::new(config);
        self.registry.invalidate();
        tracing::info!(dropped_points = dropped, "mediation configuration reloaded");
    }

    /// Runs `msg` through `container` as a new flow entering at `receiver`.
    pub async fn mediate(
        &self,
        receiver: Receiver,
        container: &Container,
        msg: &mut MessageContext,
    ) -> DebugResult<FlowOutcome> {
        let root = container.locate(&self.config())?;
        let flow = self.controller.open_flow();
        let span = tracing::info_span!("mediation", flow_id = %flow, container = container.key());

        let outcome = async {
            self.controller.on_flow_start(flow, receiver, msg).await;
            let outcome = self.run(flow, &root, msg).await;
            self.controller.on_flow_terminate(flow);
            outcome
        }
        .instrument(span)
        .await;
        Ok(outcome)
    }

    /// Continues a flow on the response path of an outbound call.
    pub async fn resume_callback(
        &self,
        receiver: Receiver,
        container: &Container,
        msg: &mut MessageContext,
    ) -> DebugResult<FlowOutcome> {
        let root = container.locate(&self.config())?;
        let flow = self.controller.open_flow();
        let span = tracing::info_span!("callback", flow_id = %flow, container = container.key());

        let outcome = async {
            self.controller.on_callback_resumed(flow, receiver);
            let outcome = self.run(flow, &root, msg).await;
            self.controller.on_flow_terminate(flow);
            outcome
        }
        .instrument(span)
        .await;
        Ok(outcome)
    }

    async fn run(&self, flow: FlowId, root: &Arc<Step>, msg: &mut MessageContext) -> FlowOutcome {
        let outcome = FlowOutcome::from(self.walk(flow, root, msg).await);
        if let FlowOutcome::Faulted(reason) = &outcome {
            tracing::error!(flow_id = %flow, %reason, "mediation faulted");
        }
        outcome
    }

    /// Skip points win over breakpoints: a skipped step is never suspended at.
    fn walk<'a>(
        &'a self,
        flow: FlowId,
        step: &'a Arc<Step>,
        msg: &'a mut MessageContext,
    ) -> BoxFuture<'a, StepResult> {
        Box::pin(async move {
            let markers = step.markers();

            if markers.is_armed(PointKind::SkipPoint) {
                if let Some(point) = self.registry.lookup(step.id(), PointKind::SkipPoint) {
                    self.controller.on_skip_point_passed(flow, point);
                    return StepResult::Next;
                }
            }

            if markers.is_armed(PointKind::Breakpoint) {
                if let Some(point) = self.registry.lookup(step.id(), PointKind::Breakpoint) {
                    self.controller.on_breakpoint_hit(flow, point, msg).await;
                }
            }

            match step.body() {
                StepBody::Atomic(mediator) => mediator.mediate(msg).await,
                StepBody::Composite(children) => {
                    for child in children {
                        match self.walk(flow, child, msg).await {
                            StepResult::Next => {}
                            other => return other,
                        }
                    }
                    StepResult::Next
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerConfig;
    use crate::emitter::EventEmitter;

    #[test]
    fn debug_output_reports_registry_and_suspension() {
        let controller = Arc::new(FlowController::new(
            ControllerConfig::default(),
            EventEmitter::default(),
        ));
        let engine = MediationEngine::new(MediationConfig::new(), controller);
        let rendered = format!("{engine:?}");
        assert!(rendered.starts_with("MediationEngine"));
        assert!(rendered.contains("suspended: false"));
    }
}
