//! Sales and Closer agents.
//!
//! Sales reads the pricing snapshot and the client's recent memory, matches
//! emotional cues in user messages, and delivers a pitch; Closer follows up
//! on warm leads and records won deals as revenue.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::Role;
use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const PRICING_DOC: &str = "pricing.json";
const DEALS_DOC: &str = "deals.json";

/// Pricing snapshot: tier name to price/features.
pub type Pricing = BTreeMap<String, PricingTier>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTier {
    pub price: u64,
    pub features: Vec<String>,
}

/// Objection cue -> reassurance line used in pitches.
const EMOTION_CUES: &[(&str, &str)] = &[
    (
        "i'm new",
        "We've helped countless first-time founders; the platform handles the hard parts for you.",
    ),
    (
        "first time",
        "You don't need experience. We provide the system. You provide the goal.",
    ),
    (
        "overwhelmed",
        "Totally understand. The agent crew takes the chaos out of building your business.",
    ),
    (
        "confused",
        "That's why the platform is intuitive. We lead, you approve.",
    ),
    (
        "too much",
        "Think of the crew as your team. You're not doing this alone.",
    ),
    (
        "stressed",
        "Let the crew remove your bottlenecks so you can focus on results.",
    ),
    (
        "expensive",
        "Compared to hiring, this is pennies on the dollar, with a whole agent crew included.",
    ),
];

fn pricing_summary(pricing: &Pricing) -> String {
    pricing
        .iter()
        .map(|(tier, info)| {
            format!(
                "{} - ${}/mo\nIncludes: {}",
                tier,
                info.price,
                info.features.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct SalesAgent;

#[async_trait]
impl Agent for SalesAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "SalesAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["deliver_pitch", "load_pricing", "collect_emotional_cues"],
            handled_kinds: &[TaskKind::Pitch],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action("Sales Agent", &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::Pitch => self.deliver_pitch(task, ctx),
            _ => {
                ctx.store.log_action(
                    "Sales Agent",
                    &format!("Ignoring unrelated task: {}", task.text),
                );
                Ok(())
            }
        }
    }
}

impl SalesAgent {
    fn deliver_pitch(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let pricing: Pricing = ctx.store.read_json(PRICING_DOC);
        let memory = ctx.store.load_memory();

        let user_messages: Vec<String> = memory
            .iter()
            .rev()
            .take(10)
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.to_lowercase())
            .collect();

        let mut hooks = Vec::new();
        for message in &user_messages {
            for (cue, line) in EMOTION_CUES {
                if message.contains(cue) {
                    hooks.push(*line);
                }
            }
        }

        let offer = pricing_summary(&pricing);
        let pitch = if hooks.is_empty() {
            format!("Here's what we offer:\n{}", offer)
        } else {
            format!("{}\n\nHere's what we offer:\n{}", hooks.join("\n"), offer)
        };

        ctx.store
            .log_action("Sales Agent", &format!("Delivered strategic pitch:\n{}", pitch));

        let mut follow_up = Task::with_kind(
            "Follow up with warm lead and confirm tier",
            Priority::HIGH,
            TaskKind::FollowUp,
        );
        if let Some(email) = task.field("email") {
            follow_up = follow_up.with_field("email", email);
        }
        ctx.enqueue("Closer Agent", follow_up);
        Ok(())
    }
}

/// A closed (or attempted) deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub email: String,
    pub tier: String,
    pub amount: u64,
    pub closed_at: String,
}

pub struct CloserAgent;

#[async_trait]
impl Agent for CloserAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "CloserAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["follow_up", "record_deal", "pick_tier"],
            handled_kinds: &[TaskKind::FollowUp],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action("Closer Agent", &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::FollowUp => self.follow_up(task, ctx),
            _ => {
                ctx.store.log_action(
                    "Closer Agent",
                    &format!("Ignoring unrelated task: {}", task.text),
                );
                Ok(())
            }
        }
    }
}

impl CloserAgent {
    /// Close against the cheapest tier unless the task names one.
    fn follow_up(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let email = match task.field("email") {
            Some(e) => e.to_string(),
            None => {
                ctx.store
                    .log_action("Closer Agent", "No lead email on follow-up; nothing to close");
                return Ok(());
            }
        };

        let pricing: Pricing = ctx.store.read_json(PRICING_DOC);
        let (tier, amount) = match task.field("tier").and_then(|t| {
            pricing.get(t).map(|info| (t.to_string(), info.price))
        }) {
            Some(pick) => pick,
            None => match pricing.iter().min_by_key(|(_, info)| info.price) {
                Some((tier, info)) => (tier.clone(), info.price),
                None => {
                    ctx.store
                        .log_action("Closer Agent", "No pricing snapshot; deferring close");
                    return Ok(());
                }
            },
        };

        let mut deals: Vec<Deal> = ctx.store.read_json(DEALS_DOC);
        deals.push(Deal {
            email: email.clone(),
            tier: tier.clone(),
            amount,
            closed_at: Utc::now().to_rfc3339(),
        });
        ctx.store.write_json(DEALS_DOC, &deals)?;
        ctx.metrics.add_revenue(ctx.client_id(), amount);
        ctx.store.log_action(
            "Closer Agent",
            &format!("Closed {} on tier {} (${}/mo)", email, tier, amount),
        );

        ctx.enqueue(
            "Crm Agent",
            Task::with_kind(
                format!("Update lead: {}", email),
                Priority::NORMAL,
                TaskKind::UpdateLead,
            )
            .with_field("email", email)
            .with_field("status", "won"),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;
    use crate::metrics::Counter;

    fn seed_pricing(ctx: &AgentContext) {
        let mut pricing = Pricing::new();
        pricing.insert(
            "starter".to_string(),
            PricingTier {
                price: 29,
                features: vec!["Email".to_string(), "CRM".to_string()],
            },
        );
        pricing.insert(
            "pro".to_string(),
            PricingTier {
                price: 99,
                features: vec!["Marketing".to_string()],
            },
        );
        ctx.store.write_json(PRICING_DOC, &pricing).unwrap();
    }

    #[tokio::test]
    async fn pitch_enqueues_closer_follow_up() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        seed_pricing(&ctx);
        ctx.store.append_memory(Role::User, "this all feels overwhelmed honestly");

        let mut task = Task::new("Pitch lead: a@b.com", Priority::NORMAL)
            .with_field("email", "a@b.com");
        SalesAgent.run_task(&mut task, &ctx).await.unwrap();

        let doc = ctx.queue.dequeue_all("acme");
        let closer = &doc["Closer Agent"];
        assert_eq!(closer.len(), 1);
        assert_eq!(closer[0].task.field("email"), Some("a@b.com"));

        let log = std::fs::read_to_string(ctx.store.doc_path("actions.log")).unwrap();
        assert!(log.contains("takes the chaos out"));
        assert!(log.contains("starter - $29/mo"));
    }

    #[tokio::test]
    async fn closer_records_deal_and_revenue() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        seed_pricing(&ctx);

        let mut task = Task::with_kind("Follow up", Priority::HIGH, TaskKind::FollowUp)
            .with_field("email", "a@b.com");
        CloserAgent.run_task(&mut task, &ctx).await.unwrap();

        let deals: Vec<Deal> = ctx.store.read_json(DEALS_DOC);
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].tier, "starter");
        assert_eq!(ctx.metrics.get(Counter::RevenueGenerated), 29);

        let doc = ctx.queue.dequeue_all("acme");
        assert_eq!(doc["Crm Agent"][0].task.field("status"), Some("won"));
    }

    #[tokio::test]
    async fn closer_without_pricing_defers() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::with_kind("Follow up", Priority::HIGH, TaskKind::FollowUp)
            .with_field("email", "a@b.com");
        CloserAgent.run_task(&mut task, &ctx).await.unwrap();
        let deals: Vec<Deal> = ctx.store.read_json(DEALS_DOC);
        assert!(deals.is_empty());
    }
}
