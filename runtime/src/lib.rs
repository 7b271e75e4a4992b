pub mod controller;
pub mod emitter;
pub mod engine;
pub mod session;

pub use controller::{ControllerConfig, FlowController, ResumeCause};
pub use emitter::{EventEmitter, EventStream};
pub use engine::{FlowOutcome, MediationEngine};
pub use session::{FlowId, FlowSnapshot, FlowState};
