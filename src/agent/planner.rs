use crate::events::{Determination, TerminationReason};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One capability call requested by a planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityCall {
    pub capability: String,
    #[serde(default)]
    pub input: Value,
}

/// What the reasoning phase decided to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Dispatch zero or more capabilities, then reason again.
    /// An empty list means there is nothing left to call.
    Invoke(Vec<CapabilityCall>),
    /// Delegate to a different specialized planner.
    Handoff { to: String, reason: String },
    /// Stop calling capabilities and respond.
    Finish,
    /// Respond with this determination right away.
    Answer(Determination),
}

/// Output of a completed capability call, visible to later decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub capability: String,
    pub output: Value,
    pub summary: String,
}

/// Accumulated context handed to planners. Opaque to the streaming layer.
#[derive(Debug, Clone)]
pub struct ReasoningContext {
    pub task_id: String,
    pub alert: Value,
    /// Planner currently in charge.
    pub agent: String,
    /// Completed `Reasoning -> Dispatch` cycles.
    pub iteration: u32,
    /// Decisions made so far, across every planner that took part.
    pub decisions: usize,
    pub observations: Vec<Observation>,
}

impl ReasoningContext {
    pub fn new(task_id: impl Into<String>, alert: Value, agent: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            alert,
            agent: agent.into(),
            iteration: 0,
            decisions: 0,
            observations: Vec::new(),
        }
    }
}

/// Decides which capabilities to run and produces the final determination.
pub trait Planner: Send + Sync {
    fn name(&self) -> &str;

    fn decide<'a>(&'a self, ctx: &'a ReasoningContext) -> BoxFuture<'a, anyhow::Result<Decision>>;

    /// Produce a determination when the loop stops without an explicit answer.
    fn respond<'a>(
        &'a self,
        ctx: &'a ReasoningContext,
        reason: TerminationReason,
    ) -> BoxFuture<'a, anyhow::Result<Determination>>;
}

/// Named planners available for routing and hand-off.
#[derive(Default, Clone)]
pub struct PlannerSet {
    planners: HashMap<String, Arc<dyn Planner>>,
}

impl PlannerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, planner: Arc<dyn Planner>) {
        self.planners.insert(planner.name().to_string(), planner);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Planner>> {
        self.planners.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.planners.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.planners.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
