pub mod log;
pub mod noop;
pub mod traits;

pub use self::log::LogObserver;
pub use noop::NoopObserver;
pub use traits::{Observer, ObserverEvent};

use crate::config::ObservabilityConfig;
use anyhow::Context;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse `observability.level`; unknown values mean `info`.
pub fn log_level(config: &ObservabilityConfig) -> Level {
    config.level.trim().parse::<Level>().unwrap_or(Level::INFO)
}

/// Install the process-wide `fmt` subscriber.
pub fn init_tracing(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(config))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("install tracing subscriber")
}

/// Factory: create the right observer from config
pub fn create_observer(config: &ObservabilityConfig) -> Arc<dyn Observer> {
    match config.backend.as_str() {
        "log" => Arc::new(LogObserver::new()),
        "none" | "noop" => Arc::new(NoopObserver),
        _ => {
            tracing::warn!(
                "Unknown observability backend '{}', falling back to noop",
                config.backend
            );
            Arc::new(NoopObserver)
        }
    }
}
