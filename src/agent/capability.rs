use crate::events::{Signal, SignalSender};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of a capability invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityOutput {
    pub value: Value,
    /// One-line human summary carried on `tool_completed`.
    pub summary: String,
}

impl CapabilityOutput {
    pub fn new(value: Value, summary: impl Into<String>) -> Self {
        Self {
            value,
            summary: summary.into(),
        }
    }
}

/// Description of a capability for planners.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,
}

/// Per-invocation context handed to a capability.
#[derive(Clone)]
pub struct CapabilityContext {
    pub task_id: String,
    pub progress: ProgressReporter,
}

/// Lets a running capability publish `tool_progress` events.
#[derive(Clone)]
pub struct ProgressReporter {
    name: String,
    signals: SignalSender,
}

impl ProgressReporter {
    pub fn new(name: impl Into<String>, signals: SignalSender) -> Self {
        Self {
            name: name.into(),
            signals,
        }
    }

    pub async fn report(&self, message: impl Into<String>, fraction: Option<f64>) {
        self.signals
            .emit(Signal::CapabilityProgress {
                name: self.name.clone(),
                message: message.into(),
                fraction: fraction.map(|f| f.clamp(0.0, 1.0)),
            })
            .await;
    }
}

/// Core capability trait: implement for any unit of data-interpretation work.
pub trait Capability: Send + Sync {
    /// Capability name (used by planners and on the wire)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Run the capability with given input
    fn invoke<'a>(
        &'a self,
        input: Value,
        ctx: &'a CapabilityContext,
    ) -> BoxFuture<'a, anyhow::Result<CapabilityOutput>>;

    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// Central registry of capability instances.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. Replaces any existing one with the same name.
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        let capability: Arc<dyn Capability> = Arc::from(capability);
        self.capabilities
            .insert(capability.name().to_string(), capability);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    /// Return sorted list of registered capability names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn specs(&self) -> Vec<CapabilitySpec> {
        let mut specs: Vec<CapabilitySpec> = self
            .capabilities
            .values()
            .map(|capability| capability.spec())
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }
}
