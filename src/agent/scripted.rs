use super::planner::{CapabilityCall, Decision, Planner, PlannerSet, ReasoningContext};
use crate::events::{Determination, TerminationReason};
use anyhow::Context;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// One step of `alert.script`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    Invoke(Vec<CapabilityCall>),
    Handoff {
        to: String,
        #[serde(default)]
        reason: String,
    },
    Answer(Determination),
    Finish,
    /// Makes the planner itself fail.
    Error(String),
}

/// Deterministic planner that follows the steps listed in `alert.script`.
///
/// The cursor is the number of decisions already made for the task, so several
/// scripted planners handing off to each other walk one shared script.
pub struct ScriptedPlanner {
    name: String,
}

impl ScriptedPlanner {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn script(alert: &Value) -> anyhow::Result<Vec<ScriptStep>> {
        match alert.get("script") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(script) => serde_json::from_value(script.clone()).context("invalid alert script"),
        }
    }
}

impl Planner for ScriptedPlanner {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide<'a>(&'a self, ctx: &'a ReasoningContext) -> BoxFuture<'a, anyhow::Result<Decision>> {
        Box::pin(async move {
            let script = Self::script(&ctx.alert)?;
            let decision = match script.into_iter().nth(ctx.decisions) {
                None => Decision::Invoke(Vec::new()),
                Some(ScriptStep::Invoke(calls)) => Decision::Invoke(calls),
                Some(ScriptStep::Handoff { to, reason }) => Decision::Handoff { to, reason },
                Some(ScriptStep::Answer(determination)) => Decision::Answer(determination),
                Some(ScriptStep::Finish) => Decision::Finish,
                Some(ScriptStep::Error(message)) => anyhow::bail!("{message}"),
            };
            Ok(decision)
        })
    }

    fn respond<'a>(
        &'a self,
        ctx: &'a ReasoningContext,
        reason: TerminationReason,
    ) -> BoxFuture<'a, anyhow::Result<Determination>> {
        Box::pin(async move {
            Ok(Determination {
                determination: "needs_review".to_string(),
                confidence: None,
                summary: format!(
                    "{} observation(s) after {} iteration(s); stopped: {reason}",
                    ctx.observations.len(),
                    ctx.iteration
                ),
            })
        })
    }
}

/// Planners available to every worker: `scripted` plus a `specialist` hand-off target.
pub fn builtin_planners() -> PlannerSet {
    let mut planners = PlannerSet::new();
    planners.register(Arc::new(ScriptedPlanner::new("scripted")));
    planners.register(Arc::new(ScriptedPlanner::new("specialist")));
    planners
}
