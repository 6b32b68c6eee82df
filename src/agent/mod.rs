//! Reasoning loop controller, planners and capabilities.

pub mod builtin;
pub mod capability;
pub mod invoker;
pub mod planner;
pub mod reasoning_loop;
pub mod scripted;

pub use builtin::builtin_registry;
pub use capability::{
    Capability, CapabilityContext, CapabilityOutput, CapabilityRegistry, CapabilitySpec,
    ProgressReporter,
};
pub use invoker::CapabilityInvoker;
pub use planner::{CapabilityCall, Decision, Observation, Planner, PlannerSet, ReasoningContext};
pub use reasoning_loop::{LoopOutcome, LoopPhase, MAX_ITERATIONS_HARD_CAP, ReasoningLoop};
pub use scripted::{ScriptStep, ScriptedPlanner, builtin_planners};
