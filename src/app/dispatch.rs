use crate::cli::{Cli, Commands};
use crate::client::{PrintHandler, TimelineConsumer, describe};
use crate::config::{Config, Role};
use crate::observability::Observer;
use crate::task::Submission;
use crate::transport::SseClient;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Parse `<json>` or `@path` into an alert document.
pub fn read_alert(arg: &str) -> Result<serde_json::Value> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => {
            let path = shellexpand::tilde(path);
            std::fs::read_to_string(path.as_ref())
                .with_context(|| format!("read alert file {path}"))?
        }
        None => arg.to_string(),
    };
    serde_json::from_str(&raw).context("alert is not valid JSON")
}

fn client(config: &Config) -> Result<SseClient> {
    SseClient::new(
        &config.client.base_url,
        Duration::from_secs(config.client.connect_timeout_secs),
    )
    .with_context(|| format!("create client for {}", config.client.base_url))
}

/// Apply `serve` flags on top of the loaded config and re-validate.
pub fn apply_serve_overrides(
    mut config: Config,
    role: Option<Role>,
    host: Option<String>,
    port: Option<u16>,
    upstream: Option<String>,
) -> Result<Config> {
    if let Some(role) = role {
        config.server.role = role;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(upstream) = upstream {
        config.server.upstream_url = Some(upstream);
    }
    config.validate()?;
    Ok(config)
}

async fn submit(config: &Config, alert: &str, agent: Option<String>) -> Result<String> {
    let submission = Submission {
        alert: read_alert(alert)?,
        agent,
    };
    let task_id = client(config)?
        .submit(&submission)
        .await
        .context("submit alert")?;
    Ok(task_id)
}

async fn watch(config: &Config, task_id: &str, after: u64) -> Result<()> {
    let consumer = TimelineConsumer::from_config(&config.client)?;
    let timeline = consumer
        .connect_after(task_id, after, &mut PrintHandler)
        .await?;
    if let Some(terminal) = timeline.terminal() {
        info!(task_id, events = timeline.events.len(), "{}", describe(terminal));
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config, observer: Arc<dyn Observer>) -> Result<()> {
    match cli.command {
        Commands::Serve {
            role,
            port,
            host,
            upstream,
        } => {
            let config = apply_serve_overrides(config, role, host, port, upstream)?;
            info!(
                role = %config.server.role,
                "Starting alertwire on {}:{}",
                config.server.host,
                config.server.port
            );
            crate::gateway::run_server(Arc::new(config), observer).await
        }

        Commands::Submit { alert, agent } => {
            let task_id = submit(&config, &alert, agent).await?;
            println!("{task_id}");
            Ok(())
        }

        Commands::Watch { task_id, after } => watch(&config, &task_id, after).await,

        Commands::Status { task_id } => {
            let consumer = TimelineConsumer::from_config(&config.client)?;
            let snapshot = consumer.fetch_status(&task_id).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }

        Commands::Run { alert, agent } => {
            let task_id = submit(&config, &alert, agent).await?;
            println!("task {task_id}");
            watch(&config, &task_id, 0).await
        }
    }
}
