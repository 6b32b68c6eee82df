use super::handlers::{handle_events, handle_health, handle_status, handle_submit};
use super::{AppState, MAX_BODY_SIZE, REQUEST_TIMEOUT_SECS};

use crate::agent::{ReasoningLoop, builtin_planners, builtin_registry};
use crate::config::{Config, Role};
use crate::observability::Observer;
use crate::relay::{HopSettings, HttpUpstream, LocalUpstream, RelayHop, Upstream};
use crate::task::{TaskRegistry, TaskRunner};
use crate::transport::SseClient;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Bind `server.host:server.port` and serve until ctrl-c.
pub async fn run_server(config: Arc<Config>, observer: Arc<dyn Observer>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("parse server bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    run_server_with_listener(listener, config, observer, shutdown_signal()).await
}

/// Serve from a pre-bound listener until `shutdown` resolves.
pub async fn run_server_with_listener(
    listener: tokio::net::TcpListener,
    config: Arc<Config>,
    observer: Arc<dyn Observer>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let actual = listener
        .local_addr()
        .context("get server listener local address")?;

    let state = build_state(&config, observer)?;
    let sweeper = spawn_sweeper(Arc::clone(&state.registry), config.sweep_interval());
    print_banner(&state, &config, actual);

    let app = build_app(state, &config.server.cors_origins);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("serve HTTP");
    sweeper.abort();
    served
}

/// Wire registry, upstream and hop for the configured role.
pub fn build_state(config: &Config, observer: Arc<dyn Observer>) -> Result<AppState> {
    let role = config.server.role;
    let registry = Arc::new(TaskRegistry::new(config.retention()));

    let upstream: Arc<dyn Upstream> = if role.is_relay() {
        let url = config
            .server
            .upstream_url
            .as_deref()
            .with_context(|| format!("role {role} requires server.upstream_url"))?;
        let client = SseClient::new(url, config.upstream_connect_timeout())
            .with_context(|| format!("create upstream client for {url}"))?;
        Arc::new(HttpUpstream::new(
            client,
            Arc::clone(&registry),
            Arc::clone(&observer),
            role.to_string(),
            role.source(),
        ))
    } else {
        let controller = ReasoningLoop::new(
            Arc::new(builtin_planners()),
            Arc::new(builtin_registry()),
            Arc::clone(&observer),
            config.agent.max_iterations,
        );
        let runner = TaskRunner::new(
            Arc::clone(&registry),
            Arc::new(controller),
            Arc::clone(&observer),
            config.agent.default_agent.clone(),
            config.agent.signal_buffer,
        );
        Arc::new(LocalUpstream::new(Arc::new(runner)))
    };

    let settings = HopSettings {
        name: role.to_string(),
        source: role.source(),
        keep_alive: config.keep_alive(),
        subscriber_buffer: config.relay.subscriber_buffer,
    };
    let hop = Arc::new(RelayHop::new(
        settings,
        Arc::clone(&registry),
        upstream,
        observer,
    ));

    Ok(AppState {
        role,
        hop,
        registry,
        retry_ms: config.relay.retry_ms,
    })
}

/// Periodically drop finished tasks past their retention window.
pub fn spawn_sweeper(registry: Arc<TaskRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = registry.evict_expired();
            if !evicted.is_empty() {
                tracing::debug!(count = evicted.len(), "evicted expired tasks");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "ctrl-c handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

fn print_banner(state: &AppState, config: &Config, addr: SocketAddr) {
    println!("alertwire {} listening on {addr}", state.role);
    if state.role != Role::Worker
        && let Some(upstream) = &config.server.upstream_url
    {
        println!("  upstream {upstream}");
    }
    println!("  POST /tasks");
    println!("  GET  /tasks/{{id}}");
    println!("  GET  /tasks/{{id}}/events -> text/event-stream");
    println!("  GET  /health");
}

pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/tasks", post(handle_submit))
        .route("/tasks/{id}", get(handle_status))
        .route("/tasks/{id}/events", get(handle_events))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ));

    if !cors_origins.is_empty() {
        let origins: Vec<_> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::HeaderName::from_static("last-event-id"),
                ]),
        );
    }

    app
}
