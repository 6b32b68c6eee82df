//! Axum HTTP surface shared by all three roles: submit, subscribe, status, health.
//!
//! - Request body size limit (64KB)
//! - Request timeout (30s) on everything except the open event stream body
//! - Optional CORS for browser consumers

mod handlers;
mod server;
mod sse;

pub use server::{build_app, build_state, run_server, run_server_with_listener, spawn_sweeper};
pub use sse::build_sse_response;

use crate::config::Role;
use crate::relay::RelayHop;
use crate::task::TaskRegistry;
use std::sync::Arc;

/// Maximum request body size (64KB) ; alerts are small JSON documents
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) ; covers time to first byte, not stream lifetime
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub role: Role,
    pub hop: Arc<RelayHop>,
    pub registry: Arc<TaskRegistry>,
    /// `retry:` hint written into every frame
    pub retry_ms: u64,
}
