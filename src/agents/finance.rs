//! Financial allocation agent: approves, denies, or delays budget requests.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "FinancialAllocation Agent";
const DECISIONS_DOC: &str = "budget_decisions.json";

/// Revenue below this puts spending on hold.
const RESERVE_FLOOR: u64 = 100;
/// Failure rate above this delays new spending.
const FAILURE_CEILING: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Deny,
    Delay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetDecision {
    pub request: String,
    pub verdict: Verdict,
    pub reason: String,
    pub decided_at: String,
}

pub struct FinancialAllocationAgent;

#[async_trait]
impl Agent for FinancialAllocationAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "FinancialAllocationAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["evaluate_allocation", "record_decision", "notify_requester"],
            handled_kinds: &[TaskKind::AllocateBudget],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::AllocateBudget => self.evaluate_allocation(task, ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl FinancialAllocationAgent {
    /// Deterministic policy over the live metrics; the verdict and reason
    /// land in the decision log.
    fn evaluate_allocation(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let snapshot = ctx.metrics.snapshot();
        let (verdict, reason) = if snapshot.tasks_failed > FAILURE_CEILING {
            (
                Verdict::Delay,
                format!(
                    "Failure count {} above ceiling; stabilize before spending",
                    snapshot.tasks_failed
                ),
            )
        } else if snapshot.revenue_generated < RESERVE_FLOOR {
            (
                Verdict::Delay,
                format!(
                    "Revenue ${} below reserve floor ${}",
                    snapshot.revenue_generated, RESERVE_FLOOR
                ),
            )
        } else {
            (Verdict::Approve, "Within budget policy".to_string())
        };

        let decision = BudgetDecision {
            request: task.text.clone(),
            verdict,
            reason: reason.clone(),
            decided_at: Utc::now().to_rfc3339(),
        };
        let mut decisions: Vec<BudgetDecision> = ctx.store.read_json(DECISIONS_DOC);
        decisions.push(decision);
        ctx.store.write_json(DECISIONS_DOC, &decisions)?;
        ctx.store
            .log_action(NAME, &format!("Allocation verdict {:?}: {}", verdict, reason));

        if verdict == Verdict::Approve {
            // Marked funded so the campaign does not ask for approval again.
            ctx.enqueue(
                "Marketing Agent",
                Task::with_kind(
                    format!("Budget approved: {}", task.text),
                    Priority::NORMAL,
                    TaskKind::Campaign,
                )
                .with_field("funded", "true"),
            );
        }
        Ok(())
    }
}
