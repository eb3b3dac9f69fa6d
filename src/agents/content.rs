//! Content agent: drafts, lead magnets, and the content calendar.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Content Agent";
const CALENDAR_DOC: &str = "content_calendar.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub title: String,
    pub file: String,
    pub created_at: String,
}

pub struct ContentAgent;

#[async_trait]
impl Agent for ContentAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "ContentAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["generate_content", "create_lead_magnet", "record_calendar_entry"],
            handled_kinds: &[TaskKind::DraftContent, TaskKind::LeadMagnet],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::DraftContent => self.generate_content(&task.text, "draft", ctx).await,
            TaskKind::LeadMagnet => self.generate_content(&task.text, "lead_magnet", ctx).await,
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl ContentAgent {
    /// Draft via the interpreter when it is reachable; otherwise leave a
    /// placeholder so the calendar entry still exists.
    async fn generate_content(
        &self,
        topic: &str,
        prefix: &str,
        ctx: &AgentContext,
    ) -> Result<(), AgentError> {
        let prompt = format!(
            "Write content for: {}. Format: newsletter, blog, or video script. \
Add SEO keywords, CTA, and metadata.",
            topic
        );
        let draft = match ctx.interpreter.interpret_strict(&prompt, ctx.client_id()).await {
            Ok(decision) => decision.task.text,
            Err(e) => {
                ctx.store
                    .log_action(NAME, &format!("Drafting via interpreter failed: {}", e));
                "Draft pending...".to_string()
            }
        };

        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let file = format!("content/{}_{}.txt", prefix, stamp);
        let path = ctx.store.doc_path(&file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AgentError::failed(e.to_string()))?;
        }
        std::fs::write(&path, &draft).map_err(|e| AgentError::failed(e.to_string()))?;

        let mut calendar: Vec<CalendarEntry> = ctx.store.read_json(CALENDAR_DOC);
        calendar.push(CalendarEntry {
            title: topic.to_string(),
            file: file.clone(),
            created_at: Utc::now().to_rfc3339(),
        });
        ctx.store.write_json(CALENDAR_DOC, &calendar)?;
        ctx.store.log_action(NAME, &format!("Saved draft: {}", file));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;
    use crate::task::Priority;

    #[tokio::test]
    async fn draft_lands_on_disk_and_in_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("write a launch newsletter", Priority::NORMAL);

        ContentAgent.run_task(&mut task, &ctx).await.unwrap();

        let calendar: Vec<CalendarEntry> = ctx.store.read_json(CALENDAR_DOC);
        assert_eq!(calendar.len(), 1);
        let body = std::fs::read_to_string(ctx.store.doc_path(&calendar[0].file)).unwrap();
        // Offline interpreter leaves the placeholder.
        assert_eq!(body, "Draft pending...");
    }

    #[tokio::test]
    async fn lead_magnet_uses_its_own_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("create a lead magnet pdf", Priority::NORMAL);

        ContentAgent.run_task(&mut task, &ctx).await.unwrap();

        let calendar: Vec<CalendarEntry> = ctx.store.read_json(CALENDAR_DOC);
        assert!(calendar[0].file.starts_with("content/lead_magnet_"));
    }
}
