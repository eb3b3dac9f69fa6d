//! Subscription agent: plan changes, renewals, and cancellations.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Subscription Agent";
const SUBSCRIPTION_DOC: &str = "subscription.json";

/// Plan table: (name, monthly price in dollars).
const PLANS: &[(&str, u64)] = &[("starter", 29), ("pro", 99), ("enterprise", 249)];

fn plan_price(plan: &str) -> Option<u64> {
    PLANS.iter().find(|(name, _)| *name == plan).map(|(_, p)| *p)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: String,
    pub renewal_date: String,
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            plan: "starter".to_string(),
            renewal_date: Utc::now().to_rfc3339(),
        }
    }
}

pub struct SubscriptionAgent;

#[async_trait]
impl Agent for SubscriptionAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "SubscriptionAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["handle_plan_change", "process_renewal", "cancel_subscription"],
            handled_kinds: &[TaskKind::PlanChange, TaskKind::Renewal, TaskKind::CancelPlan],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::PlanChange => self.handle_plan_change(task, ctx),
            TaskKind::Renewal => self.process_renewal(ctx),
            TaskKind::CancelPlan => self.cancel_subscription(ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl SubscriptionAgent {
    fn handle_plan_change(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let mut sub: Subscription = ctx.store.read_json(SUBSCRIPTION_DOC);
        let target = match task.field("plan") {
            Some(p) => p.to_lowercase(),
            None => {
                ctx.store
                    .log_action(NAME, "No target plan named; staying on current plan");
                return Ok(());
            }
        };
        let Some(price) = plan_price(&target) else {
            ctx.store
                .log_action(NAME, &format!("Unknown plan requested: {}", target));
            return Ok(());
        };

        let current_price = plan_price(&sub.plan).unwrap_or(0);
        let upgrading = price > current_price;
        sub.plan = target.clone();
        sub.renewal_date = Utc::now().to_rfc3339();
        ctx.store.write_json(SUBSCRIPTION_DOC, &sub)?;

        if upgrading {
            ctx.metrics.add_revenue(ctx.client_id(), price);
            ctx.store
                .log_action(NAME, &format!("Upgraded client to {}", target));
            ctx.enqueue(
                "Manager Agent",
                Task::with_kind(
                    format!("Client upgraded to {}. Activate relevant agents.", target),
                    Priority::NORMAL,
                    TaskKind::Delegate,
                ),
            );
        } else {
            ctx.store
                .log_action(NAME, &format!("Downgraded client to {}", target));
            ctx.enqueue(
                "Manager Agent",
                Task::with_kind(
                    format!("Client downgraded to {}. Adjust agents accordingly.", target),
                    Priority::NORMAL,
                    TaskKind::Delegate,
                ),
            );
        }
        Ok(())
    }

    fn process_renewal(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let mut sub: Subscription = ctx.store.read_json(SUBSCRIPTION_DOC);
        if sub.plan == "cancelled" {
            ctx.store
                .log_action(NAME, "Cancelled subscription cannot renew");
            return Ok(());
        }
        sub.renewal_date = Utc::now().to_rfc3339();
        ctx.store.write_json(SUBSCRIPTION_DOC, &sub)?;
        if let Some(price) = plan_price(&sub.plan) {
            ctx.metrics.add_revenue(ctx.client_id(), price);
        }
        ctx.store
            .log_action(NAME, &format!("Subscription renewed for plan: {}", sub.plan));
        Ok(())
    }

    fn cancel_subscription(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let mut sub: Subscription = ctx.store.read_json(SUBSCRIPTION_DOC);
        sub.plan = "cancelled".to_string();
        sub.renewal_date = Utc::now().to_rfc3339();
        ctx.store.write_json(SUBSCRIPTION_DOC, &sub)?;
        ctx.store
            .log_action(NAME, "Subscription cancelled by client request");
        ctx.enqueue(
            "SupportRetention Agent",
            Task::with_kind(
                "Follow up with client on cancellation to gather feedback and attempt recovery.",
                Priority::NORMAL,
                TaskKind::RetainClient,
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;
    use crate::metrics::Counter;

    #[tokio::test]
    async fn upgrade_records_revenue_and_notifies_manager() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("upgrade my plan", Priority::NORMAL).with_field("plan", "pro");

        SubscriptionAgent.run_task(&mut task, &ctx).await.unwrap();

        let sub: Subscription = ctx.store.read_json(SUBSCRIPTION_DOC);
        assert_eq!(sub.plan, "pro");
        assert_eq!(ctx.metrics.get(Counter::RevenueGenerated), 99);
        assert!(ctx.queue.dequeue_all("acme").contains_key("Manager Agent"));
    }

    #[tokio::test]
    async fn downgrade_does_not_add_revenue() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        ctx.store
            .write_json(
                SUBSCRIPTION_DOC,
                &Subscription {
                    plan: "enterprise".to_string(),
                    renewal_date: Utc::now().to_rfc3339(),
                },
            )
            .unwrap();

        let mut task = Task::new("downgrade plan", Priority::NORMAL).with_field("plan", "starter");
        SubscriptionAgent.run_task(&mut task, &ctx).await.unwrap();

        assert_eq!(ctx.metrics.get(Counter::RevenueGenerated), 0);
        let sub: Subscription = ctx.store.read_json(SUBSCRIPTION_DOC);
        assert_eq!(sub.plan, "starter");
    }

    #[tokio::test]
    async fn cancel_sets_plan_and_queues_retention() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("cancel my subscription", Priority::NORMAL);

        SubscriptionAgent.run_task(&mut task, &ctx).await.unwrap();

        let sub: Subscription = ctx.store.read_json(SUBSCRIPTION_DOC);
        assert_eq!(sub.plan, "cancelled");
        assert!(ctx
            .queue
            .dequeue_all("acme")
            .contains_key("SupportRetention Agent"));
    }

    #[tokio::test]
    async fn renewal_charges_current_plan() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("renew subscription", Priority::LOW);

        SubscriptionAgent.run_task(&mut task, &ctx).await.unwrap();

        // Default plan is starter.
        assert_eq!(ctx.metrics.get(Counter::RevenueGenerated), 29);
    }
}
