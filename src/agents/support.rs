//! Support & retention agent: ticket log, escalation, churn prevention.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::metrics::Counter;
use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "SupportRetention Agent";
const TICKETS_DOC: &str = "support_tickets.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub task: String,
    pub timestamp: String,
    pub status: String,
    pub priority: u8,
}

pub struct SupportRetentionAgent;

#[async_trait]
impl Agent for SupportRetentionAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "SupportRetentionAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["handle_ticket", "escalate_urgent", "prevent_churn"],
            handled_kinds: &[TaskKind::SupportTicket, TaskKind::RetainClient],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::SupportTicket => self.handle_ticket(task, ctx),
            TaskKind::RetainClient => self.prevent_churn(ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl SupportRetentionAgent {
    fn handle_ticket(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let ticket = Ticket {
            task: task.text.clone(),
            timestamp: Utc::now().to_rfc3339(),
            status: "open".to_string(),
            priority: task.priority.value(),
        };
        let urgent = task.text.to_lowercase().contains("urgent") || ticket.priority >= 3;

        let mut tickets: Vec<Ticket> = ctx.store.read_json(TICKETS_DOC);
        tickets.push(ticket);
        ctx.store.write_json(TICKETS_DOC, &tickets)?;
        ctx.store
            .log_action(NAME, &format!("Ticket logged: {}", task.text));

        if urgent {
            ctx.enqueue(
                "Manager Agent",
                Task::with_kind(
                    format!("Urgent support ticket: {}", task.text),
                    Priority::HIGH,
                    TaskKind::Delegate,
                ),
            );
        }
        Ok(())
    }

    fn prevent_churn(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let tickets: Vec<Ticket> = ctx.store.read_json(TICKETS_DOC);
        let open = tickets.iter().filter(|t| t.status == "open").count();
        ctx.store.log_action(
            NAME,
            &format!("Churn check: {} open ticket(s) on record", open),
        );
        ctx.enqueue(
            "Email Agent",
            Task::with_kind("Process inbox", Priority::NORMAL, TaskKind::ProcessInbox),
        );
        ctx.metrics.incr(Counter::ClientSatisfaction);
        Ok(())
    }
}
