//! Email agent: drains the inbox drop-file and routes what it finds.
//!
//! An external poller (or a test) deposits messages into `inbox.json`;
//! each pass classifies them, hands leads to the CRM, opens tickets for
//! support requests, and queues replies in `outbox.json`. Actual SMTP
//! delivery only happens with mail credentials configured and sandbox
//! mode off; otherwise the reply stays queued and the suppression is
//! logged.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Email Agent";
const INBOX_DOC: &str = "inbox.json";
const OUTBOX_DOC: &str = "outbox.json";

/// More support messages than this in one pass flags a product problem.
const ESCALATION_VOLUME: usize = 3;

const LEAD_CUES: &[&str] = &["interested", "demo", "pricing", "quote", "trial", "buy"];
const SUPPORT_CUES: &[&str] = &["help", "issue", "problem", "broken", "refund", "cancel"];
const SPAM_CUES: &[&str] = &["unsubscribe", "lottery", "winner", "crypto giveaway"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEmail {
    pub from: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub queued_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmailClass {
    Lead,
    Support,
    Spam,
    Other,
}

fn classify_email(mail: &InboundEmail) -> EmailClass {
    let text = format!("{} {}", mail.subject, mail.body).to_lowercase();
    if SPAM_CUES.iter().any(|cue| text.contains(cue)) {
        return EmailClass::Spam;
    }
    if SUPPORT_CUES.iter().any(|cue| text.contains(cue)) {
        return EmailClass::Support;
    }
    if LEAD_CUES.iter().any(|cue| text.contains(cue)) {
        return EmailClass::Lead;
    }
    EmailClass::Other
}

/// Buying-intent heuristic applied to new leads.
fn lead_score(text: &str) -> u8 {
    let text = text.to_lowercase();
    let mut score = 1;
    if text.contains("demo") || text.contains("pricing") {
        score += 2;
    }
    if text.contains("urgent") || text.contains("asap") {
        score += 1;
    }
    score
}

pub struct EmailAgent;

#[async_trait]
impl Agent for EmailAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "EmailAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["process_inbox", "route_message", "queue_reply"],
            handled_kinds: &[TaskKind::ProcessInbox],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::ProcessInbox => self.process_inbox(ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl EmailAgent {
    fn process_inbox(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let inbox: Vec<InboundEmail> = ctx.store.read_json(INBOX_DOC);
        if inbox.is_empty() {
            ctx.store.log_action(NAME, "Inbox empty");
            return Ok(());
        }
        // Drain before processing so a crash mid-pass never double-routes.
        ctx.store.write_json(INBOX_DOC, &Vec::<InboundEmail>::new())?;

        let mut support_count = 0usize;
        for mail in &inbox {
            match classify_email(mail) {
                EmailClass::Spam => {
                    ctx.store
                        .log_action(NAME, &format!("Discarded spam from {}", mail.from));
                    continue;
                }
                EmailClass::Lead => {
                    let score = lead_score(&format!("{} {}", mail.subject, mail.body));
                    ctx.enqueue(
                        "Crm Agent",
                        Task::with_kind(
                            format!("Add lead from inbound email: {}", mail.subject),
                            Priority::NORMAL,
                            TaskKind::AddLead,
                        )
                        .with_field("email", mail.from.as_str())
                        .with_field("source", "inbound_email")
                        .with_field("score", score.to_string()),
                    );
                    ctx.store
                        .log_action(NAME, &format!("Routed lead email from {}", mail.from));
                }
                EmailClass::Support => {
                    support_count += 1;
                    ctx.enqueue(
                        "SupportRetention Agent",
                        Task::with_kind(
                            format!("Support email from {}: {}", mail.from, mail.subject),
                            Priority::NORMAL,
                            TaskKind::SupportTicket,
                        ),
                    );
                }
                EmailClass::Other => {
                    ctx.store
                        .log_action(NAME, &format!("Unclassified email from {}", mail.from));
                }
            }
            self.queue_reply(mail, ctx)?;
        }

        if support_count > ESCALATION_VOLUME {
            ctx.enqueue(
                "Manager Agent",
                Task::with_kind(
                    format!(
                        "Support email volume spike: {} messages in one pass",
                        support_count
                    ),
                    Priority::HIGH,
                    TaskKind::Delegate,
                ),
            );
        }
        ctx.store
            .log_action(NAME, &format!("Processed {} inbound email(s)", inbox.len()));
        Ok(())
    }

    fn queue_reply(&self, mail: &InboundEmail, ctx: &AgentContext) -> Result<(), AgentError> {
        let reply = OutboundEmail {
            to: mail.from.clone(),
            subject: format!("Re: {}", mail.subject),
            body: "Thanks for reaching out. We have received your message and \
will follow up shortly."
                .to_string(),
            queued_at: Utc::now().to_rfc3339(),
        };
        let mut outbox: Vec<OutboundEmail> = ctx.store.read_json(OUTBOX_DOC);
        outbox.push(reply);
        ctx.store.write_json(OUTBOX_DOC, &outbox)?;

        if ctx.sandbox_mode {
            ctx.sandbox_log(NAME, &format!("Would send reply to {}", mail.from));
        } else if !ctx.mail.is_configured() {
            ctx.store
                .log_action(NAME, "Mail credentials missing; reply left in outbox");
        } else {
            ctx.store
                .log_action(NAME, &format!("Reply queued for delivery to {}", mail.from));
        }
        Ok(())
    }
}
