//! The Flow Suspension Controller.
//!
//! The engine calls in at five flow points. Two of them (`on_flow_start` and
//! `on_breakpoint_hit`) park the calling task on a oneshot resume signal
//! while the command channel task inspects and mutates the parked message.
//! The wire protocol carries no flow identifier, so at most one flow is
//! suspended at a time; later suspension attempts are refused and those
//! flows keep running.

use crate::emitter::EventEmitter;
use crate::session::{FlowId, FlowSession, FlowSnapshot, FlowState};
use mediary_core::{DebugError, DebugEvent, DebugPoint, DebugResult, MessageContext, Receiver};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Whether `on_flow_start` suspends the flow.
    pub suspend_on_start: bool,
    /// Upper bound on a single suspension; `None` waits indefinitely.
    pub suspend_timeout: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            suspend_on_start: true,
            suspend_timeout: None,
        }
    }
}

/// Why a suspended flow continued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeCause {
    Client,
    /// The command channel went away.
    Released,
    TimedOut,
}

struct Resumption {
    cause: ResumeCause,
    message: MessageContext,
}

/// The parked message and the signal that un-parks it.
struct Suspension {
    flow: FlowId,
    message: MessageContext,
    resume: oneshot::Sender<Resumption>,
}

impl Suspension {
    fn release(self, cause: ResumeCause) {
        let flow = self.flow;
        if self
            .resume
            .send(Resumption {
                cause,
                message: self.message,
            })
            .is_err()
        {
            tracing::warn!(flow_id = %flow, "suspended flow vanished before resume");
        }
    }
}

pub struct FlowController {
    config: ControllerConfig,
    emitter: EventEmitter,
    sessions: RwLock<HashMap<FlowId, FlowSession>>,
    suspended: Mutex<Option<Suspension>>,
}

impl FlowController {
    pub fn new(config: ControllerConfig, emitter: EventEmitter) -> Self {
        Self {
            config,
            emitter,
            sessions: RwLock::new(HashMap::new()),
            suspended: Mutex::new(None),
        }
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Registers a new flow in `Running` state.
    pub fn open_flow(&self) -> FlowId {
        let id = FlowId::new();
        self.sessions.write().insert(id, FlowSession::new());
        tracing::debug!(flow_id = %id, "flow opened");
        id
    }

    fn update<F: FnOnce(&mut FlowSession)>(&self, flow: FlowId, f: F) {
        match self.sessions.write().get_mut(&flow) {
            Some(session) => f(session),
            None => tracing::warn!(flow_id = %flow, "flow point reported for unknown flow"),
        }
    }

    pub fn flow_state(&self, flow: FlowId) -> Option<FlowState> {
        self.sessions.read().get(&flow).map(|s| s.state)
    }

    pub fn sessions(&self) -> Vec<FlowSnapshot> {
        self.sessions
            .read()
            .iter()
            .map(|(id, session)| session.snapshot(*id))
            .collect()
    }

    /// The flow currently parked, if any.
    pub fn suspended_flow(&self) -> Option<FlowId> {
        self.suspended.lock().as_ref().map(|s| s.flow)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.lock().is_some()
    }

    pub async fn on_flow_start(&self, flow: FlowId, receiver: Receiver, msg: &mut MessageContext) {
        self.update(flow, |s| s.start_receiver = Some(receiver.clone()));
        tracing::info!(flow_id = %flow, %receiver, "mediation flow started");

        if !self.config.suspend_on_start {
            self.emitter.emit(DebugEvent::Started { receiver });
            return;
        }

        let signal = self.park(flow, msg);
        self.emitter.emit(DebugEvent::Started { receiver });
        if let Some(signal) = signal {
            self.wait(flow, msg, signal).await;
        }
    }

    pub async fn on_breakpoint_hit(
        &self,
        flow: FlowId,
        point: Arc<DebugPoint>,
        msg: &mut MessageContext,
    ) {
        let Some(signal) = self.park(flow, msg) else {
            return;
        };
        tracing::info!(flow_id = %flow, point = %point.descriptor(), "breakpoint hit");
        self.emitter.emit(DebugEvent::SuspendedBreakpoint { point });
        self.wait(flow, msg, signal).await;
    }

    pub fn on_skip_point_passed(&self, flow: FlowId, point: Arc<DebugPoint>) {
        tracing::debug!(flow_id = %flow, point = %point.descriptor(), "skip point passed");
        self.emitter.emit(DebugEvent::PassedSkipPoint { point });
    }

    pub fn on_callback_resumed(&self, flow: FlowId, receiver: Receiver) {
        self.update(flow, |s| s.callback_receiver = Some(receiver.clone()));
        self.emitter.emit(DebugEvent::ContinuedCallback { receiver });
    }

    pub fn on_flow_terminate(&self, flow: FlowId) {
        let session = self.sessions.write().remove(&flow);
        let (start, callback) = match session {
            Some(session) => {
                tracing::debug!(
                    flow_id = %flow,
                    elapsed_ms = (chrono::Utc::now() - session.opened_at).num_milliseconds(),
                    "flow terminated"
                );
                (session.start_receiver, session.callback_receiver)
            }
            None => {
                tracing::warn!(flow_id = %flow, "terminating unknown flow");
                (None, None)
            }
        };
        self.emitter.emit(DebugEvent::Terminated { start, callback });
    }

    /// Resumes the suspended flow on behalf of the client.
    pub fn resume(&self) -> DebugResult<FlowId> {
        let suspension = self.suspended.lock().take().ok_or(DebugError::NotSuspended)?;
        let flow = suspension.flow;
        suspension.release(ResumeCause::Client);
        Ok(flow)
    }

    /// Resumes every suspended flow without client involvement.
    pub fn release_all(&self) -> usize {
        let taken = self.suspended.lock().take();
        match taken {
            Some(suspension) => {
                tracing::warn!(flow_id = %suspension.flow, "releasing suspended flow");
                suspension.release(ResumeCause::Released);
                1
            }
            None => 0,
        }
    }

    /// Runs `f` against the message of the suspended flow.
    pub fn with_suspended_message<R>(
        &self,
        f: impl FnOnce(&mut MessageContext) -> R,
    ) -> DebugResult<R> {
        let mut slot = self.suspended.lock();
        let suspension = slot.as_mut().ok_or(DebugError::NotSuspended)?;
        Ok(f(&mut suspension.message))
    }

    /// Takes the suspension slot. The message moves into the slot so the
    /// command task can reach it while the flow is parked.
    fn park(&self, flow: FlowId, msg: &mut MessageContext) -> Option<oneshot::Receiver<Resumption>> {
        let mut slot = self.suspended.lock();
        if let Some(active) = slot.as_ref() {
            tracing::warn!(
                flow_id = %flow,
                suspended = %active.flow,
                "another flow is already suspended; continuing without suspension"
            );
            return None;
        }

        let (resume, signal) = oneshot::channel();
        *slot = Some(Suspension {
            flow,
            message: std::mem::take(msg),
            resume,
        });
        drop(slot);

        self.update(flow, |s| s.state = FlowState::Suspended);
        Some(signal)
    }

    async fn wait(
        &self,
        flow: FlowId,
        msg: &mut MessageContext,
        mut signal: oneshot::Receiver<Resumption>,
    ) {
        let mut guard = AbandonGuard {
            controller: self,
            flow,
            armed: true,
        };

        let outcome = match self.config.suspend_timeout {
            None => (&mut signal).await.ok(),
            Some(limit) => {
                let waited = tokio::time::timeout(limit, &mut signal).await;
                match waited {
                    Ok(received) => received.ok(),
                    Err(_) => self.expire(flow, signal).await,
                }
            }
        };

        let cause = match outcome {
            Some(Resumption { cause, message }) => {
                *msg = message;
                cause
            }
            None => {
                tracing::error!(flow_id = %flow, "resume signal dropped; message state lost");
                ResumeCause::Released
            }
        };

        match cause {
            ResumeCause::Client => tracing::info!(flow_id = %flow, "resumed by client"),
            ResumeCause::Released => tracing::warn!(flow_id = %flow, "resumed after channel loss"),
            ResumeCause::TimedOut => tracing::warn!(flow_id = %flow, "suspension timed out"),
        }

        guard.armed = false;
        self.update(flow, |s| s.state = FlowState::Resumed);
        self.emitter.emit(DebugEvent::ResumedClient);
        self.update(flow, |s| s.state = FlowState::Running);
    }

    /// Reclaims the slot after a timeout, unless a resume won the race.
    async fn expire(
        &self,
        flow: FlowId,
        signal: oneshot::Receiver<Resumption>,
    ) -> Option<Resumption> {
        let own = {
            let mut slot = self.suspended.lock();
            match slot.as_ref() {
                Some(s) if s.flow == flow => slot.take(),
                _ => None,
            }
        };
        match own {
            Some(suspension) => Some(Resumption {
                cause: ResumeCause::TimedOut,
                message: suspension.message,
            }),
            None => signal.await.ok(),
        }
    }
}

/// Cleans up after a parked flow whose task was dropped mid-wait, so the
/// slot is free for the next flow and no session is left behind.
struct AbandonGuard<'a> {
    controller: &'a FlowController,
    flow: FlowId,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let abandoned = {
            let mut slot = self.controller.suspended.lock();
            match slot.as_ref() {
                Some(s) if s.flow == self.flow => slot.take(),
                _ => None,
            }
        };
        self.controller.sessions.write().remove(&self.flow);
        if abandoned.is_some() {
            tracing::warn!(flow_id = %self.flow, "suspended flow was dropped; slot reclaimed");
        }
    }
}

impl std::fmt::Debug for FlowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowController")
            .field("config", &self.config)
            .field("sessions", &self.sessions.read().len())
            .field("suspended", &self.suspended_flow())
            .finish()
    }
}
