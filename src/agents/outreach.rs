//! Outreach agent: cold/warm prospect messaging built from pain-point cues.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::store::Role;
use crate::task::{Task, TaskKind};

use super::sales::Pricing;
use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Outreach Agent";
const OUTREACH_DOC: &str = "outreach_messages.json";

/// Pain-point cue -> hook line.
const PROSPECT_CUES: &[(&str, &str)] = &[
    (
        "no time",
        "Get your time back by automating the work of an entire team.",
    ),
    (
        "no clients",
        "That's exactly what we fix: the pipeline fills while you sleep.",
    ),
    (
        "slow growth",
        "Accelerate traction without extra effort on your side.",
    ),
    (
        "ads don't work",
        "We replace ad spend with outreach, content, and inbound automation.",
    ),
    (
        "not enough leads",
        "Leads get generated, scored, and booked, all hands off.",
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub body: String,
    pub created_at: String,
}

pub struct OutreachAgent;

#[async_trait]
impl Agent for OutreachAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "OutreachAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["generate_prospect_message", "collect_hooks", "load_pricing"],
            handled_kinds: &[TaskKind::Outreach],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::Outreach => self.generate_prospect_message(ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl OutreachAgent {
    fn generate_prospect_message(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let memory = ctx.store.load_memory();
        let pain_points: Vec<String> = memory
            .iter()
            .rev()
            .take(10)
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.to_lowercase())
            .collect();

        let mut hooks = Vec::new();
        for message in &pain_points {
            for (cue, line) in PROSPECT_CUES {
                if message.contains(cue) {
                    hooks.push(*line);
                }
            }
        }

        let pricing: Pricing = ctx.store.read_json("pricing.json");
        let pricing_lines: Vec<String> = pricing
            .iter()
            .map(|(tier, info)| {
                format!("{} - ${}/mo: {}", tier, info.price, info.features.join(", "))
            })
            .collect();

        let body = if hooks.is_empty() {
            format!("Quick intro to what we offer:\n{}", pricing_lines.join("\n"))
        } else {
            format!(
                "{}\n\nQuick intro to what we offer:\n{}",
                hooks.join("\n"),
                pricing_lines.join("\n")
            )
        };

        let mut messages: Vec<OutreachMessage> = ctx.store.read_json(OUTREACH_DOC);
        messages.push(OutreachMessage {
            body: body.clone(),
            created_at: Utc::now().to_rfc3339(),
        });
        ctx.store.write_json(OUTREACH_DOC, &messages)?;
        ctx.store
            .log_action(NAME, &format!("Generated prospect message:\n{}", body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;
    use crate::task::Priority;

    #[tokio::test]
    async fn hooks_match_recent_pain_points() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        ctx.store
            .append_memory(Role::User, "honestly I have no time for marketing");

        let mut task = Task::new("Increase outreach", Priority::HIGH);
        OutreachAgent.run_task(&mut task, &ctx).await.unwrap();

        let messages: Vec<OutreachMessage> = ctx.store.read_json(OUTREACH_DOC);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].body.contains("Get your time back"));
    }

    #[tokio::test]
    async fn message_is_generated_even_without_cues() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("outreach push", Priority::NORMAL);
        OutreachAgent.run_task(&mut task, &ctx).await.unwrap();
        let messages: Vec<OutreachMessage> = ctx.store.read_json(OUTREACH_DOC);
        assert_eq!(messages.len(), 1);
    }
}
