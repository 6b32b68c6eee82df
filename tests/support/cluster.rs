#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use alertwire::client::{TimelineConsumer, TimelineHandler};
use alertwire::config::{Config, Role};
use alertwire::error::ClientError;
use alertwire::events::Event;
use alertwire::gateway::run_server_with_listener;
use alertwire::observability::NoopObserver;
use alertwire::task::Submission;
use alertwire::transport::SseClient;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// One running hop on an ephemeral port.
pub struct Node {
    pub role: Role,
    pub port: u16,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Node {
    pub async fn start(role: Role, upstream: Option<String>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral listener should bind");
        let port = listener
            .local_addr()
            .expect("listener should expose local address")
            .port();

        let mut config = Config::default();
        config.server.role = role;
        config.server.port = port;
        config.server.upstream_url = upstream;
        config.relay.retry_ms = 50;
        config.validate().expect("test config should validate");

        let shutdown = CancellationToken::new();
        let stop = shutdown.clone().cancelled_owned();
        let handle = tokio::spawn(async move {
            run_server_with_listener(listener, Arc::new(config), Arc::new(NoopObserver), stop).await
        });

        wait_until_ready(port).await;
        Self {
            role,
            port,
            shutdown,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    pub fn client(&self) -> SseClient {
        SseClient::new(&self.base_url(), Duration::from_secs(2)).expect("client should build")
    }

    pub fn consumer(&self) -> TimelineConsumer<SseClient> {
        TimelineConsumer::new(self.client(), 3, Duration::from_millis(50))
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.handle.abort();
    }
}

async fn wait_until_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("server did not become ready on port {port}");
}

/// worker <- coordinator <- gateway, each in its own server.
pub struct Cluster {
    pub worker: Node,
    pub coordinator: Node,
    pub gateway: Node,
}

impl Cluster {
    pub async fn start() -> Self {
        let worker = Node::start(Role::Worker, None).await;
        let coordinator = Node::start(Role::Coordinator, Some(worker.base_url())).await;
        let gateway = Node::start(Role::Gateway, Some(coordinator.base_url())).await;
        Self {
            worker,
            coordinator,
            gateway,
        }
    }

    pub async fn submit_at_gateway(&self, alert: Value) -> String {
        self.gateway
            .client()
            .submit(&Submission { alert, agent: None })
            .await
            .expect("gateway should accept the alert")
    }
}

/// Handler that keeps everything it is told.
#[derive(Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub completed: bool,
    pub errors: Vec<String>,
}

impl TimelineHandler for Recorder {
    fn on_event(&mut self, event: &Event) {
        self.events.push(event.clone());
    }

    fn on_complete(&mut self, _event: &Event) {
        self.completed = true;
    }

    fn on_error(&mut self, error: &ClientError) {
        self.errors.push(error.to_string());
    }
}

pub fn echo_step(tag: &str) -> Value {
    json!({"invoke": [{"capability": "echo", "input": {"tag": tag}}]})
}

/// Three capability calls, then an explicit determination.
pub fn three_step_alert() -> Value {
    json!({
        "alert_id": "SURV-1042",
        "script": [
            echo_step("trades"),
            echo_step("orders"),
            echo_step("news"),
            {"answer": {"determination": "close", "confidence": 0.9, "summary": "no pattern"}}
        ]
    })
}

/// Second capability fails.
pub fn failing_alert() -> Value {
    json!({
        "alert_id": "SURV-1043",
        "script": [
            echo_step("trades"),
            {"invoke": [{"capability": "fail", "input": {"message": "market data feed offline"}}]},
            echo_step("never")
        ]
    })
}

pub fn ids(events: &[Event]) -> Vec<u64> {
    events.iter().map(|event| event.event_id).collect()
}
