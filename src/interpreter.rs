//! Command interpreter: free text in, structured task out.
//!
//! Builds a prompt from the client's recent memory, calls the completion
//! endpoint, and parses a strict-JSON decision `{agent, task, priority}`
//! followed by free-form reasoning. Every failure mode (network, bad JSON,
//! missing keys) degrades to a deterministic fallback decision addressed to
//! the Manager Agent; the caller never sees an error.
//!
//! Side effects on success are independent and non-transactional: the memory
//! append, the reasoning-log append, and the optional secondary enqueue each
//! happen on their own. A crash between them leaves partial state but never
//! corrupts the returned decision.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::llm::{ChatMessage, LlmClient};
use crate::store::{ClientStore, MemoryEntry, Role, SharedQueue};
use crate::task::{Priority, Task, TaskKind};

/// Agent that receives fallback tasks.
pub const DEFAULT_AGENT: &str = "Manager Agent";

/// Sampling temperature for interpretation calls.
const TEMPERATURE: f32 = 0.2;

/// Memory entries containing any of these terms are preferred as context.
const CONTEXT_KEYWORDS: &[&str] = &["campaign", "lead", "client", "sales", "growth"];

/// How many memory entries ride along with each interpretation.
const CONTEXT_WINDOW: usize = 5;

const BUSINESS_PHASE: &str = "growth";
const SEASONALITY: &str = "Q3 planning";

/// Why an interpretation attempt failed. Callers of [`CommandInterpreter::interpret`]
/// never see this; the middleware uses the strict variant to decide whether
/// to merge a decision.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("completion call failed: {0}")]
    Llm(#[from] crate::llm::LlmError),

    #[error("decision validation failed: {0}")]
    Validation(String),
}

/// The interpreter's verdict: which agent runs what.
#[derive(Debug, Clone)]
pub struct Decision {
    pub agent: String,
    pub task: Task,
}

/// Wire shape of the model's JSON head. Serde enforces the required keys.
#[derive(Debug, Deserialize)]
struct RawDecision {
    agent: String,
    task: String,
    priority: i64,
    #[serde(default)]
    kind: Option<TaskKind>,
    #[serde(default)]
    self_improvement_task: Option<RawSecondary>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawSecondary {
    agent: String,
    task: String,
    #[serde(default)]
    priority: Option<i64>,
}

/// Translates operator text into routed tasks.
pub struct CommandInterpreter {
    llm: Arc<dyn LlmClient>,
    data_dir: PathBuf,
    queue: SharedQueue,
}

impl CommandInterpreter {
    pub fn new(llm: Arc<dyn LlmClient>, data_dir: impl Into<PathBuf>, queue: SharedQueue) -> Self {
        Self {
            llm,
            data_dir: data_dir.into(),
            queue,
        }
    }

    /// Interpret operator text for a client. Infallible: failures yield the
    /// deterministic fallback decision.
    pub async fn interpret(&self, text: &str, client_id: &str) -> Decision {
        match self.interpret_strict(text, client_id).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!("Interpretation error: {}", e);
                Self::fallback(text)
            }
        }
    }

    /// The fallback decision: route the raw input to the default agent.
    pub fn fallback(text: &str) -> Decision {
        Decision {
            agent: DEFAULT_AGENT.to_string(),
            task: Task::with_kind(
                format!("Unable to interpret: {}", text),
                Priority::LOW,
                TaskKind::Other,
            ),
        }
    }

    /// Interpret without the fallback: errors surface to the caller.
    pub async fn interpret_strict(
        &self,
        text: &str,
        client_id: &str,
    ) -> Result<Decision, InterpretError> {
        let store = ClientStore::new(self.data_dir.clone(), client_id);
        let memory = store.load_memory();
        let context = relevant_memory(&memory, CONTEXT_WINDOW);

        let mut messages = vec![ChatMessage::system(system_prompt())];
        for entry in &context {
            messages.push(match entry.role {
                Role::User => ChatMessage::user(&entry.content),
                Role::Assistant => ChatMessage::assistant(&entry.content),
            });
        }
        messages.push(ChatMessage::user(text));

        let raw = self.llm.chat(&messages, TEMPERATURE).await?;
        tracing::debug!("Raw completion: {}", raw);

        let (json_head, reasoning) = split_json_head(&raw);
        let decision: RawDecision = serde_json::from_str(json_head)
            .map_err(|e| InterpretError::Validation(e.to_string()))?;

        // Record the exchange; each effect stands alone.
        store.append_memory(Role::User, text);
        store.append_memory(Role::Assistant, json_head);
        store.log_reasoning(text, json_head, reasoning);

        if let Some(secondary) = &decision.self_improvement_task {
            let task = Task::new(
                secondary.task.clone(),
                Priority::new(secondary.priority.unwrap_or(1)),
            );
            self.queue.enqueue(&secondary.agent, task, client_id);
            store.log_action(
                "Command Interpreter",
                &format!("Queued self-improvement task: {}", secondary.task),
            );
        }

        let kind = decision
            .kind
            .unwrap_or_else(|| TaskKind::classify(&decision.task));
        let mut task = Task::with_kind(decision.task, Priority::new(decision.priority), kind);
        task.extra = decision.extra;

        Ok(Decision {
            agent: decision.agent,
            task,
        })
    }
}

fn system_prompt() -> String {
    format!(
        "You are the autonomous operations chief of a business, routing tasks \
across named agents with context awareness and precision.\n\n\
Business Phase: {}\nSeasonality: {}\n\n\
Respond ONLY with a strict JSON object like:\n\
{{\n  \"agent\": \"Marketing Agent\",\n  \"task\": \"Create Instagram campaign targeting tech founders\",\n  \"priority\": 2,\n  \"self_improvement_task\": {{\n      \"agent\": \"Manager Agent\",\n      \"task\": \"Review routing strategy for better seasonal alignment\",\n      \"priority\": 1\n  }}\n}}\n\n\
AFTER the JSON, provide a short reasoning for your decision.",
        BUSINESS_PHASE, SEASONALITY
    )
}

/// Pick the context window: the newest entries mentioning an allowlisted
/// keyword, or simply the newest entries when none match.
fn relevant_memory(memory: &[MemoryEntry], window: usize) -> Vec<MemoryEntry> {
    let relevant: Vec<&MemoryEntry> = memory
        .iter()
        .filter(|m| {
            let content = m.content.to_lowercase();
            CONTEXT_KEYWORDS.iter().any(|k| content.contains(k))
        })
        .collect();
    let pick: Vec<&MemoryEntry> = if relevant.is_empty() {
        memory.iter().collect()
    } else {
        relevant
    };
    pick.iter()
        .rev()
        .take(window)
        .rev()
        .map(|m| (*m).clone())
        .collect()
}

/// Split a completion into its JSON head and trailing reasoning text.
///
/// Brace depth is tracked (string-aware) so a nested `self_improvement_task`
/// object does not end the head early. Without any braces the whole text is
/// treated as the head and will fail validation downstream.
fn split_json_head(raw: &str) -> (&str, &str) {
    let start = match raw.find('{') {
        Some(i) => i,
        None => return (raw, ""),
    };
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + i + 1;
                    return (&raw[start..end], raw[end..].trim());
                }
            }
            _ => {}
        }
    }
    (raw, "")
}
