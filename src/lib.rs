#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

//! Real-time progress streaming for long-running alert triage tasks.
//!
//! A bounded reasoning loop on the worker emits lifecycle events; each hop
//! (worker, coordinator, gateway) keeps an ordered per-task log and relays it
//! to any number of SSE subscribers, which resume by `Last-Event-ID`.

pub mod agent;
pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod observability;
pub mod relay;
pub mod task;
pub mod transport;

pub use config::Config;
pub use error::{Result, WireError};
