//! Client onboarding agent: seeds a new client's storage, subscription, and
//! initial task set for their tier.

use async_trait::async_trait;
use chrono::Utc;

use crate::metrics::Counter;
use crate::store::MemoryEntry;
use crate::task::{Priority, Task, TaskKind};

use super::subscription::Subscription;
use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "ClientOnboarding Agent";

/// Agents activated per plan tier.
const TIER_AGENTS: &[(&str, &[&str])] = &[
    ("starter", &["Email Agent", "SupportRetention Agent"]),
    ("pro", &["Email Agent", "Crm Agent", "Marketing Agent"]),
    (
        "enterprise",
        &[
            "Email Agent",
            "Crm Agent",
            "Marketing Agent",
            "Manager Agent",
            "Visuals Agent",
            "Closer Agent",
        ],
    ),
];

pub struct ClientOnboardingAgent;

#[async_trait]
impl Agent for ClientOnboardingAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "ClientOnboardingAgent",
            interface_version: INTERFACE_VERSION,
            operations: &[
                "setup_client_storage",
                "assign_subscription",
                "seed_initial_tasks",
            ],
            handled_kinds: &[TaskKind::Onboard],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::Onboard => {
                let plan = task.field("plan").unwrap_or("starter").to_lowercase();
                self.setup_client_storage(ctx)?;
                self.assign_subscription(&plan, ctx)?;
                self.seed_initial_tasks(&plan, ctx);
                ctx.metrics.incr(Counter::ClientsOnboarded);
                ctx.store
                    .log_action(NAME, &format!("Completed onboarding for plan: {}", plan));
                Ok(())
            }
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl ClientOnboardingAgent {
    /// Make sure the baseline documents exist without clobbering them.
    fn setup_client_storage(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        if !ctx.store.doc_path("memory.json").exists() {
            ctx.store
                .write_json("memory.json", &Vec::<MemoryEntry>::new())?;
        }
        if !ctx.store.doc_path("agent_queue.json").exists() {
            ctx.store
                .write_json("agent_queue.json", &serde_json::Map::new())?;
        }
        Ok(())
    }

    fn assign_subscription(&self, plan: &str, ctx: &AgentContext) -> Result<(), AgentError> {
        let sub = Subscription {
            plan: plan.to_string(),
            renewal_date: Utc::now().to_rfc3339(),
        };
        ctx.store.write_json("subscription.json", &sub)?;
        Ok(())
    }

    /// One welcome task per tier agent, plus the first weekly campaign for
    /// tiers that include marketing.
    fn seed_initial_tasks(&self, plan: &str, ctx: &AgentContext) {
        let agents = TIER_AGENTS
            .iter()
            .find(|(tier, _)| *tier == plan)
            .map(|(_, agents)| *agents)
            .unwrap_or(TIER_AGENTS[0].1);

        for agent in agents {
            ctx.metrics.incr(Counter::AgentsGenerated);
            ctx.store
                .log_action(NAME, &format!("Activated agent for plan {}: {}", plan, agent));
        }
        if agents.contains(&"Marketing Agent") {
            ctx.enqueue(
                "Marketing Agent",
                Task::with_kind("auto weekly campaign", Priority::LOW, TaskKind::Campaign),
            );
        }
        ctx.enqueue(
            "Email Agent",
            Task::with_kind("Process inbox", Priority::LOW, TaskKind::ProcessInbox),
        );
    }
}
