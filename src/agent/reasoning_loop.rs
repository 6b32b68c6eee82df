use super::capability::CapabilityRegistry;
use super::invoker::CapabilityInvoker;
use super::planner::{CapabilityCall, Decision, Observation, PlannerSet, ReasoningContext};
use crate::events::{Determination, Signal, SignalSender, TerminationReason};
use crate::observability::Observer;
use serde_json::Value;
use std::sync::Arc;
use strum::Display;

/// Upper bound applied to any configured `max_iterations`.
pub const MAX_ITERATIONS_HARD_CAP: u32 = 100;

/// Controller phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoopPhase {
    Reasoning,
    Dispatch,
    Responding,
    TerminalComplete,
    TerminalFailed,
}

impl LoopPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::TerminalComplete | Self::TerminalFailed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub phase: LoopPhase,
    pub termination_reason: TerminationReason,
    pub iterations: u32,
}

/// Bounded `Reasoning -> Dispatch -> Reasoning ... -> Responding` state machine.
///
/// Every path ends in exactly one terminal signal: `Completed` from the
/// responding phase, or a failure. Capability failures are terminal through
/// the invoker's own `CapabilityFailed` signal, so the loop adds nothing.
pub struct ReasoningLoop {
    planners: Arc<PlannerSet>,
    capabilities: Arc<CapabilityRegistry>,
    observer: Arc<dyn Observer>,
    max_iterations: u32,
}

impl ReasoningLoop {
    pub fn new(
        planners: Arc<PlannerSet>,
        capabilities: Arc<CapabilityRegistry>,
        observer: Arc<dyn Observer>,
        max_iterations: u32,
    ) -> Self {
        Self {
            planners,
            capabilities,
            observer,
            max_iterations: max_iterations.min(MAX_ITERATIONS_HARD_CAP),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn planners(&self) -> &PlannerSet {
        &self.planners
    }

    #[allow(clippy::too_many_lines)]
    pub async fn run(
        &self,
        task_id: &str,
        alert: Value,
        agent: &str,
        signals: SignalSender,
    ) -> LoopOutcome {
        signals
            .emit(Signal::AnalysisStarted {
                agent: agent.to_string(),
                max_iterations: self.max_iterations,
            })
            .await;

        let Some(mut planner) = self.planners.get(agent) else {
            signals
                .emit(Signal::Failed {
                    stage: "routing".to_string(),
                    message: format!("unknown agent {agent}"),
                })
                .await;
            return LoopOutcome {
                phase: LoopPhase::TerminalFailed,
                termination_reason: TerminationReason::Error,
                iterations: 0,
            };
        };

        let invoker = CapabilityInvoker::new(
            task_id,
            Arc::clone(&self.capabilities),
            signals.clone(),
            Arc::clone(&self.observer),
        );
        let mut ctx = ReasoningContext::new(task_id, alert, agent);
        let mut phase = LoopPhase::Reasoning;
        let mut pending: Vec<CapabilityCall> = Vec::new();
        let mut reason = TerminationReason::ToolCallsExhausted;
        let mut answer: Option<Determination> = None;

        while !phase.is_terminal() {
            tracing::trace!(task_id, phase = %phase, iteration = ctx.iteration, "reasoning loop step");
            phase = match phase {
                LoopPhase::Reasoning => {
                    if ctx.iteration >= self.max_iterations {
                        tracing::info!(task_id, max_iterations = self.max_iterations, "iteration limit reached");
                        reason = TerminationReason::IterationLimitReached;
                        LoopPhase::Responding
                    } else {
                        signals
                            .emit(Signal::Thinking {
                                agent: ctx.agent.clone(),
                                iteration: ctx.iteration,
                            })
                            .await;
                        match planner.decide(&ctx).await {
                            Err(error) => {
                                signals
                                    .emit(Signal::Failed {
                                        stage: "reasoning".to_string(),
                                        message: format!("{error:#}"),
                                    })
                                    .await;
                                LoopPhase::TerminalFailed
                            }
                            Ok(decision) => {
                                ctx.decisions += 1;
                                match decision {
                                    Decision::Invoke(calls) if calls.is_empty() => {
                                        reason = TerminationReason::ToolCallsExhausted;
                                        LoopPhase::Responding
                                    }
                                    Decision::Invoke(calls) => {
                                        ctx.iteration += 1;
                                        pending = calls;
                                        LoopPhase::Dispatch
                                    }
                                    Decision::Finish => {
                                        reason = TerminationReason::ToolCallsExhausted;
                                        LoopPhase::Responding
                                    }
                                    Decision::Answer(determination) => {
                                        reason = TerminationReason::ExplicitAnswer;
                                        answer = Some(determination);
                                        LoopPhase::Responding
                                    }
                                    Decision::Handoff { to, reason: why } => {
                                        match self.planners.get(&to) {
                                            Some(next) => {
                                                let from = std::mem::replace(&mut ctx.agent, to.clone());
                                                signals
                                                    .emit(Signal::Routed {
                                                        from: from.clone(),
                                                        to: to.clone(),
                                                        reason: why,
                                                    })
                                                    .await;
                                                signals.emit(Signal::HandedOff { from, to }).await;
                                                planner = next;
                                                ctx.iteration += 1;
                                                LoopPhase::Reasoning
                                            }
                                            None => {
                                                signals
                                                    .emit(Signal::Failed {
                                                        stage: "routing".to_string(),
                                                        message: format!("unknown agent {to}"),
                                                    })
                                                    .await;
                                                LoopPhase::TerminalFailed
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                LoopPhase::Dispatch => {
                    let mut next = LoopPhase::Reasoning;
                    for call in std::mem::take(&mut pending) {
                        match invoker.invoke(&call.capability, call.input).await {
                            Ok(output) => ctx.observations.push(Observation {
                                capability: call.capability,
                                output: output.value,
                                summary: output.summary,
                            }),
                            Err(_) => {
                                next = LoopPhase::TerminalFailed;
                                break;
                            }
                        }
                    }
                    next
                }
                LoopPhase::Responding => {
                    let determination = match answer.take() {
                        Some(determination) => Ok(determination),
                        None => planner.respond(&ctx, reason).await,
                    };
                    match determination {
                        Ok(determination) => {
                            signals
                                .emit(Signal::Completed {
                                    determination,
                                    reason,
                                    iterations: ctx.iteration,
                                })
                                .await;
                            LoopPhase::TerminalComplete
                        }
                        Err(error) => {
                            signals
                                .emit(Signal::Failed {
                                    stage: "responding".to_string(),
                                    message: format!("{error:#}"),
                                })
                                .await;
                            LoopPhase::TerminalFailed
                        }
                    }
                }
                LoopPhase::TerminalComplete | LoopPhase::TerminalFailed => phase,
            };
        }

        LoopOutcome {
            phase,
            termination_reason: if phase == LoopPhase::TerminalFailed {
                TerminationReason::Error
            } else {
                reason
            },
            iterations: ctx.iteration,
        }
    }
}
