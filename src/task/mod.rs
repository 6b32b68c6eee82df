//! Task lifecycle state, the per-process task registry, and the worker-side runner.

pub mod registry;
pub mod runner;
pub mod state;

pub use registry::{LogSlice, TaskRegistry, TaskSnapshot};
pub use runner::{Submission, TaskRunner};
pub use state::TaskState;
