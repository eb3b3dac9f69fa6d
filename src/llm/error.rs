//! Error taxonomy for LLM calls.

use thiserror::Error;

/// Errors surfaced by an [`super::LlmClient`].
///
/// The interpreter treats every variant the same way (fall back to the
/// deterministic default task); the split exists for logging and tests.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl LlmError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
