pub mod container;
pub mod error;
pub mod event;
pub mod locator;
pub mod marker;
pub mod path;
pub mod point;
pub mod property;
pub mod registry;
pub mod step;

pub use container::{
    Api, ApiResource, ContainerKind, FlowSequences, MediationConfig, ProxyService, SequenceFlow,
    SequenceType,
};
pub use error::{DebugError, DebugResult};
pub use event::{DebugEvent, EventSink, EventSource, Receiver};
pub use locator::{
    ApiResourceSequence, Connector, Container, ContainerLocator, NamedSequence, ProxySequence,
    Template,
};
pub use marker::DebugMarkers;
pub use path::{StepPath, resolve};
pub use point::{DebugPoint, PointKind};
pub use property::{MessageContext, PropertyScope};
pub use registry::DebugPointRegistry;
pub use step::{Mediator, Step, StepBody, StepError, StepId, StepResult};
