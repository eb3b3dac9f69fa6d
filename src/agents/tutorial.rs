//! Tutorial agent: step-by-step guides kept in the client's tutorial library.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Tutorial Agent";
const TUTORIALS_DOC: &str = "tutorials.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorialEntry {
    pub topic: String,
    pub steps: Vec<String>,
    pub created_at: String,
}

pub struct TutorialAgent;

#[async_trait]
impl Agent for TutorialAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "TutorialAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["create_tutorial", "outline_steps", "store_tutorial"],
            handled_kinds: &[TaskKind::Tutorial],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::Tutorial => self.create_tutorial(&task.text, ctx).await,
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl TutorialAgent {
    async fn create_tutorial(&self, topic: &str, ctx: &AgentContext) -> Result<(), AgentError> {
        let prompt = format!(
            "Outline a short step-by-step tutorial for: {}. One step per line.",
            topic
        );
        let steps = match ctx.interpreter.interpret_strict(&prompt, ctx.client_id()).await {
            Ok(decision) => decision
                .task
                .text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(e) => {
                ctx.store
                    .log_action(NAME, &format!("Outline via interpreter failed: {}", e));
                Self::outline_steps(topic)
            }
        };

        let entry = TutorialEntry {
            topic: topic.to_string(),
            steps,
            created_at: Utc::now().to_rfc3339(),
        };
        let mut tutorials: Vec<TutorialEntry> = ctx.store.read_json(TUTORIALS_DOC);
        tutorials.push(entry);
        ctx.store.write_json(TUTORIALS_DOC, &tutorials)?;
        ctx.store
            .log_action(NAME, &format!("Tutorial stored: {}", topic));
        Ok(())
    }

    /// Fallback scaffold when no interpreter is reachable.
    fn outline_steps(topic: &str) -> Vec<String> {
        vec![
            format!("Introduce the goal: {}", topic),
            "Walk through the setup".to_string(),
            "Demonstrate the main workflow".to_string(),
            "Summarize and link further resources".to_string(),
        ]
    }
}
