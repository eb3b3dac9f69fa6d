//! Manager agent: business-phase state machine and delegation.
//!
//! Default recipient of interpreter fallbacks, so it tolerates any task
//! kind: every run monitors performance, evaluates a phase transition, and
//! delegates the next step for the current phase.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::metrics::Counter;
use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Manager Agent";
const PHASE_DOC: &str = "phase.json";

/// Lifecycle phase of a client's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessPhase {
    Setup,
    Promotion,
    Sales,
    Onboarding,
    ClientOps,
}

impl BusinessPhase {
    fn next(self) -> Option<BusinessPhase> {
        match self {
            Self::Setup => Some(Self::Promotion),
            Self::Promotion => Some(Self::Sales),
            Self::Sales => Some(Self::Onboarding),
            Self::Onboarding => Some(Self::ClientOps),
            Self::ClientOps => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Promotion => "promotion",
            Self::Sales => "sales",
            Self::Onboarding => "onboarding",
            Self::ClientOps => "client_ops",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhaseDoc {
    phase: BusinessPhase,
}

impl Default for PhaseDoc {
    fn default() -> Self {
        Self {
            phase: BusinessPhase::Setup,
        }
    }
}

/// Failures above this trigger a support investigation.
const FAILURE_ALERT_THRESHOLD: u64 = 5;
/// Leads below this trigger an outreach push.
const LEAD_FLOOR: u64 = 10;
/// Onboarded clients needed before the phase advances.
const PHASE_ADVANCE_CLIENTS: u64 = 5;

pub struct ManagerAgent;

#[async_trait]
impl Agent for ManagerAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "ManagerAgent",
            interface_version: INTERFACE_VERSION,
            operations: &[
                "monitor_performance",
                "evaluate_phase_transition",
                "delegate_for_phase",
            ],
            handled_kinds: &[TaskKind::Delegate, TaskKind::Other],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        self.monitor_performance(ctx);
        let phase = self.evaluate_phase_transition(ctx)?;
        self.delegate_for_phase(phase, ctx);
        Ok(())
    }
}

impl ManagerAgent {
    fn monitor_performance(&self, ctx: &AgentContext) {
        let snapshot = ctx.metrics.snapshot();
        if snapshot.tasks_failed > FAILURE_ALERT_THRESHOLD {
            ctx.enqueue(
                "SupportRetention Agent",
                Task::with_kind("Investigate failures", Priority::HIGH, TaskKind::SupportTicket),
            );
        }
        if snapshot.leads_generated < LEAD_FLOOR {
            ctx.enqueue(
                "Outreach Agent",
                Task::with_kind("Increase outreach", Priority::HIGH, TaskKind::Outreach),
            );
        }
        let review = serde_json::to_string(&snapshot).unwrap_or_default();
        ctx.store
            .log_action(NAME, &format!("Performance Review: {}", review));
    }

    fn evaluate_phase_transition(&self, ctx: &AgentContext) -> Result<BusinessPhase, AgentError> {
        let mut doc: PhaseDoc = ctx.store.read_json(PHASE_DOC);
        let onboarded = ctx.metrics.get(Counter::ClientsOnboarded);
        if onboarded >= PHASE_ADVANCE_CLIENTS {
            if let Some(next) = doc.phase.next() {
                doc.phase = next;
                ctx.store.write_json(PHASE_DOC, &doc)?;
                ctx.store.log_action(
                    NAME,
                    &format!("Phase transitioned to: {}", doc.phase.label()),
                );
            }
        }
        Ok(doc.phase)
    }

    fn delegate_for_phase(&self, phase: BusinessPhase, ctx: &AgentContext) {
        let (agent, task) = match phase {
            BusinessPhase::Setup => (
                "Outreach Agent",
                Task::with_kind("Identify market niches via outreach", Priority::NORMAL, TaskKind::Outreach),
            ),
            BusinessPhase::Promotion => (
                "Marketing Agent",
                Task::with_kind("Run lead gen campaign", Priority::NORMAL, TaskKind::Campaign),
            ),
            BusinessPhase::Sales => (
                "Sales Agent",
                Task::with_kind("Close active leads", Priority::HIGH, TaskKind::Pitch),
            ),
            BusinessPhase::Onboarding => (
                "ClientOnboarding Agent",
                Task::with_kind("Onboard new clients", Priority::NORMAL, TaskKind::Onboard),
            ),
            BusinessPhase::ClientOps => (
                "SupportRetention Agent",
                Task::with_kind(
                    "Optimize existing client performance",
                    Priority::NORMAL,
                    TaskKind::RetainClient,
                ),
            ),
        };
        ctx.enqueue(agent, task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;

    #[tokio::test]
    async fn setup_phase_delegates_outreach() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("Unable to interpret: gibberish", Priority::LOW);

        ManagerAgent.run_task(&mut task, &ctx).await.unwrap();

        let doc = ctx.queue.dequeue_all("acme");
        // Lead floor unmet, plus the setup-phase delegation.
        assert_eq!(doc["Outreach Agent"].len(), 2);
    }

    #[tokio::test]
    async fn phase_advances_once_clients_onboarded() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        for _ in 0..PHASE_ADVANCE_CLIENTS {
            ctx.metrics.incr(Counter::ClientsOnboarded);
        }

        let mut task = Task::new("review performance", Priority::LOW);
        ManagerAgent.run_task(&mut task, &ctx).await.unwrap();

        let doc: PhaseDoc = ctx.store.read_json(PHASE_DOC);
        assert_eq!(doc.phase, BusinessPhase::Promotion);
        let queued = ctx.queue.dequeue_all("acme");
        assert!(queued.contains_key("Marketing Agent"));
    }

    #[tokio::test]
    async fn high_failure_count_escalates_to_support() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        for _ in 0..=FAILURE_ALERT_THRESHOLD {
            ctx.metrics.record_error();
        }

        let mut task = Task::new("review", Priority::LOW);
        ManagerAgent.run_task(&mut task, &ctx).await.unwrap();

        let doc = ctx.queue.dequeue_all("acme");
        assert!(doc["SupportRetention Agent"]
            .iter()
            .any(|t| t.task.text.contains("Investigate failures")));
    }
}
