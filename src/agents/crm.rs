//! CRM agent: owner of the client's `leads.json` document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::metrics::Counter;
use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Crm Agent";
const LEADS_DOC: &str = "leads.json";

/// One sales lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub email: String,
    pub source: String,
    pub status: String,
    pub score: u32,
    pub notes: Vec<String>,
}

impl Lead {
    fn new(email: &str, source: &str) -> Self {
        Self {
            email: email.to_string(),
            source: source.to_string(),
            status: "new".to_string(),
            score: 1,
            notes: Vec::new(),
        }
    }
}

pub struct CrmAgent;

#[async_trait]
impl Agent for CrmAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "CrmAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["add_lead", "update_lead_status", "add_note_to_lead"],
            handled_kinds: &[TaskKind::AddLead, TaskKind::UpdateLead, TaskKind::LogNote],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::AddLead => self.add_lead(task, ctx),
            TaskKind::UpdateLead => self.update_lead_status(task, ctx),
            TaskKind::LogNote => self.add_note_to_lead(task, ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl CrmAgent {
    fn load_leads(&self, ctx: &AgentContext) -> Vec<Lead> {
        ctx.store.read_json(LEADS_DOC)
    }

    fn save_leads(&self, ctx: &AgentContext, leads: &[Lead]) -> Result<(), AgentError> {
        ctx.store.write_json(LEADS_DOC, &leads)?;
        Ok(())
    }

    fn add_lead(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let email = task
            .field("email")
            .ok_or_else(|| AgentError::failed("add lead task missing email field"))?;
        let source = task.field("source").unwrap_or("unknown");

        let mut leads = self.load_leads(ctx);
        if leads.iter().any(|l| l.email == email) {
            ctx.store
                .log_action(NAME, &format!("Lead already exists: {}", email));
            return Ok(());
        }

        let mut lead = Lead::new(email, source);
        if let Some(score) = task.field("score").and_then(|s| s.parse().ok()) {
            lead.score = score;
        }
        if let Some(note) = task.field("note") {
            lead.notes.push(note.to_string());
        }
        leads.push(lead);
        self.save_leads(ctx, &leads)?;
        ctx.metrics.incr(Counter::LeadsGenerated);
        ctx.store
            .log_action(NAME, &format!("Added new lead: {}", email));

        ctx.enqueue(
            "Sales Agent",
            Task::with_kind(format!("Pitch lead: {}", email), Priority::NORMAL, TaskKind::Pitch)
                .with_field("email", email),
        );
        Ok(())
    }

    fn update_lead_status(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let email = task
            .field("email")
            .ok_or_else(|| AgentError::failed("update lead task missing email field"))?;
        let status = task.field("status").unwrap_or("contacted");

        let mut leads = self.load_leads(ctx);
        match leads.iter_mut().find(|l| l.email == email) {
            Some(lead) => {
                lead.status = status.to_string();
                self.save_leads(ctx, &leads)?;
                ctx.store.log_action(
                    NAME,
                    &format!("Updated lead status: {} -> {}", email, status),
                );
            }
            None => {
                ctx.store
                    .log_action(NAME, &format!("Lead not found: {}", email));
            }
        }
        Ok(())
    }

    fn add_note_to_lead(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let email = task
            .field("email")
            .ok_or_else(|| AgentError::failed("log note task missing email field"))?;
        let note = task.field("note").unwrap_or(&task.text);

        let mut leads = self.load_leads(ctx);
        match leads.iter_mut().find(|l| l.email == email) {
            Some(lead) => {
                lead.notes.push(note.to_string());
                self.save_leads(ctx, &leads)?;
                ctx.store
                    .log_action(NAME, &format!("Added note to lead: {}", email));
            }
            None => {
                ctx.store
                    .log_action(NAME, &format!("Lead not found for note: {}", email));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;

    #[tokio::test]
    async fn add_lead_creates_entry_and_sales_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("add lead", Priority::NORMAL).with_field("email", "a@b.com");

        CrmAgent.run_task(&mut task, &ctx).await.unwrap();

        let leads: Vec<Lead> = ctx.store.read_json(LEADS_DOC);
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].email, "a@b.com");
        assert_eq!(leads[0].status, "new");
        assert_eq!(leads[0].score, 1);

        let doc = ctx.queue.dequeue_all("acme");
        let sales = &doc["Sales Agent"];
        assert_eq!(sales.len(), 1);
        assert!(sales[0].task.text.contains("a@b.com"));
    }

    #[tokio::test]
    async fn duplicate_lead_is_not_added_twice() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("add lead", Priority::NORMAL).with_field("email", "a@b.com");

        CrmAgent.run_task(&mut task, &ctx).await.unwrap();
        CrmAgent.run_task(&mut task, &ctx).await.unwrap();

        let leads: Vec<Lead> = ctx.store.read_json(LEADS_DOC);
        assert_eq!(leads.len(), 1);
        // Only the first add produced a follow-up.
        assert_eq!(ctx.queue.dequeue_all("acme")["Sales Agent"].len(), 1);
    }

    #[tokio::test]
    async fn update_status_rewrites_existing_lead() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut add = Task::new("add lead", Priority::NORMAL).with_field("email", "a@b.com");
        CrmAgent.run_task(&mut add, &ctx).await.unwrap();

        let mut update = Task::new("update lead", Priority::NORMAL)
            .with_field("email", "a@b.com")
            .with_field("status", "qualified");
        CrmAgent.run_task(&mut update, &ctx).await.unwrap();

        let leads: Vec<Lead> = ctx.store.read_json(LEADS_DOC);
        assert_eq!(leads[0].status, "qualified");
    }

    #[tokio::test]
    async fn add_lead_without_email_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("add lead", Priority::NORMAL);
        assert!(CrmAgent.run_task(&mut task, &ctx).await.is_err());
    }
}
