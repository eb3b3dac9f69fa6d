//! LLM client module.
//!
//! A trait-based abstraction over chat-completion providers, with an
//! OpenAI-compatible endpoint as the primary implementation. The interpreter
//! only needs plain text in, plain text out; everything richer (tool calls,
//! vision) is out of scope here.

mod error;
mod openai;

pub use error::LlmError;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chat-completion provider seam.
///
/// Implementations must be cheap to share (`Arc<dyn LlmClient>`); tests
/// substitute deterministic stubs.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a message sequence and return the raw completion text.
    async fn chat(&self, messages: &[ChatMessage], temperature: f32) -> Result<String, LlmError>;
}
