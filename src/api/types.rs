//! Request/response shapes for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;
use crate::store::MemoryEntry;
use crate::task::Task;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Client whose queue and memory the command touches; server default
    /// when omitted.
    pub client_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub client_id: String,
    /// Agent the task was queued for
    pub agent: String,
    pub task: Task,
}

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub client_id: String,
    pub metrics: MetricsSnapshot,
    /// Newest conversation entries, oldest first
    pub recent_memory: Vec<MemoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
