use async_trait::async_trait;
use mediary_core::{
    Container, MediationConfig, Mediator, MessageContext, NamedSequence, PropertyScope, Receiver,
    SequenceType, Step, StepResult,
};
use mediary_inspector::{DebugConfig, DebugServer};
use mediary_runtime::{ControllerConfig, EventEmitter, FlowController, FlowOutcome, MediationEngine};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

struct Stamp(&'static str);

#[async_trait]
impl Mediator for Stamp {
    fn label(&self) -> &str {
        self.0
    }

    async fn mediate(&self, msg: &mut MessageContext) -> StepResult {
        msg.set_property(PropertyScope::Message, self.0, json!("stamped"));
        StepResult::Next
    }
}

struct Client {
    replies: Lines<BufReader<OwnedReadHalf>>,
    commands: OwnedWriteHalf,
    events: Lines<BufReader<TcpStream>>,
}

impl Client {
    async fn connect(server: &DebugServer) -> Self {
        let command = TcpStream::connect(server.command_addr().unwrap()).await.unwrap();
        let events = TcpStream::connect(server.event_addr().unwrap()).await.unwrap();
        let (read, commands) = command.into_split();
        Self {
            replies: BufReader::new(read).lines(),
            commands,
            events: BufReader::new(events).lines(),
        }
    }

    async fn send(&mut self, command: serde_json::Value) -> String {
        self.commands
            .write_all(format!("{command}\n").as_bytes())
            .await
            .unwrap();
        self.replies.next_line().await.unwrap().unwrap()
    }

    async fn event(&mut self) -> String {
        self.events.next_line().await.unwrap().unwrap()
    }
}

async fn start_server() -> (Arc<DebugServer>, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let config = DebugConfig {
        command_port: 0,
        event_port: 0,
        suspend_on_start: false,
        ..DebugConfig::default()
    };
    let controller = Arc::new(FlowController::new(
        ControllerConfig {
            suspend_on_start: config.suspend_on_start,
            suspend_timeout: None,
        },
        EventEmitter::new(config.event_buffer),
    ));
    let mediation = MediationConfig::new().with_sequence(
        "seq1",
        Step::composite("seq1", vec![Step::atomic(Stamp("first")), Step::atomic(Stamp("second"))]),
    );
    let engine = Arc::new(MediationEngine::new(mediation, controller));

    let server = Arc::new(DebugServer::bind(&config, engine).await.unwrap());
    let serving = {
        let server = server.clone();
        tokio::spawn(async move { server.serve().await })
    };
    (server, serving)
}

fn seq1() -> Container {
    Container::Sequence(NamedSequence {
        name: "seq1".into(),
        sequence_type: SequenceType::Named,
    })
}

fn spawn_flow(server: &DebugServer) -> tokio::task::JoinHandle<(FlowOutcome, MessageContext)> {
    let engine = server.engine().clone();
    tokio::spawn(async move {
        let mut msg = MessageContext::new(json!({"order": 7}));
        let outcome = engine
            .mediate(Receiver::Synapse, &seq1(), &mut msg)
            .await
            .unwrap();
        (outcome, msg)
    })
}

#[tokio::test]
async fn test_breakpoint_session_over_tcp() {
    let (server, serving) = start_server().await;
    let mut client = Client::connect(&server).await;

    let arm = json!({
        "command": "set",
        "command-argument": "breakpoint",
        "mediation-component": "sequence",
        "sequence": {"sequence-key": "seq1", "sequence-type": "NAMED", "mediator-position": "1"}
    });
    assert_eq!(client.send(arm).await, "ok");

    let flow = spawn_flow(&server);
    assert_eq!(client.event().await, "started synapse");
    assert_eq!(client.event().await, "suspended breakpoint NAMED seq1 1 ");

    let get_first = json!({
        "command": "get",
        "command-argument": "property",
        "context": "synapse",
        "property": {"property-name": "first"}
    });
    assert_eq!(client.send(get_first).await, r#"{"first":"stamped"}"#);

    let set = json!({
        "command": "set",
        "command-argument": "property",
        "context": "default",
        "property": {"property-name": "approved", "property-value": "yes"}
    });
    assert_eq!(client.send(set).await, "ok");

    assert_eq!(client.send(json!({"command": "resume"})).await, "ok");
    assert_eq!(client.event().await, "resumed client");
    assert_eq!(client.event().await, "terminated synapse null");

    let (outcome, msg) = flow.await.unwrap();
    assert_eq!(outcome, FlowOutcome::Completed);
    assert_eq!(msg.property(PropertyScope::Message, "approved"), Some(&json!("yes")));
    assert_eq!(msg.property(PropertyScope::Message, "second"), Some(&json!("stamped")));

    assert_eq!(client.send(json!({"command": "resume"})).await, "failed");

    server.shutdown();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_disconnect_releases_suspended_flow() {
    let (server, serving) = start_server().await;
    let mut client = Client::connect(&server).await;

    let arm = json!({
        "command": "set",
        "command-argument": "breakpoint",
        "mediation-component": "sequence",
        "sequence": {"sequence-key": "seq1", "sequence-type": "NAMED", "mediator-position": "0"}
    });
    assert_eq!(client.send(arm).await, "ok");

    let flow = spawn_flow(&server);
    assert_eq!(client.event().await, "started synapse");
    assert_eq!(client.event().await, "suspended breakpoint NAMED seq1 0 ");

    drop(client);
    let (outcome, msg) = flow.await.unwrap();
    assert_eq!(outcome, FlowOutcome::Completed);
    assert_eq!(msg.payload, json!({"order": 7}));
    assert!(!server.engine().controller().is_suspended());

    server.shutdown();
    serving.await.unwrap().unwrap();
}
