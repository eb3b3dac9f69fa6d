//! Analyst agent: threshold insights and the scaling report.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;
use crate::task::{Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Analyst Agent";
const REPORTS_DOC: &str = "reports.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingReport {
    pub leads: u64,
    pub clients: u64,
    pub revenue: u64,
    pub tasks_failed: u64,
    pub recommendation: String,
    pub generated_at: String,
}

pub struct AnalystAgent;

#[async_trait]
impl Agent for AnalystAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "AnalystAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["analyze_performance", "generate_scaling_report", "collect_insights"],
            handled_kinds: &[TaskKind::Analyze, TaskKind::Report],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::Analyze => {
                self.analyze_performance(ctx);
                Ok(())
            }
            TaskKind::Report => self.generate_scaling_report(ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl AnalystAgent {
    fn insights(snapshot: &MetricsSnapshot) -> Vec<&'static str> {
        let mut insights = Vec::new();
        if snapshot.leads_generated < 50 {
            insights.push("Lead volume is low. Suggest increasing outreach or content campaigns.");
        }
        if snapshot.tasks_failed > 5 {
            insights.push("High task failure rate. Suggest reviewing failing agent logic.");
        }
        if snapshot.clients_onboarded < 3 {
            insights.push("Client acquisition is below goal. Review onboarding and CRM effectiveness.");
        }
        if snapshot.revenue_generated < 1000 {
            insights.push("Revenue is below threshold. Recommend monetization review.");
        }
        insights
    }

    fn analyze_performance(&self, ctx: &AgentContext) {
        let snapshot = ctx.metrics.snapshot();
        for insight in Self::insights(&snapshot) {
            ctx.store.log_action(NAME, &format!("Insight: {}", insight));
        }
    }

    fn generate_scaling_report(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let snapshot = ctx.metrics.snapshot();
        let report = ScalingReport {
            leads: snapshot.leads_generated,
            clients: snapshot.clients_onboarded,
            revenue: snapshot.revenue_generated,
            tasks_failed: snapshot.tasks_failed,
            recommendation:
                "Expand paid channels, optimize onboarding, and review underperforming agents."
                    .to_string(),
            generated_at: Utc::now().to_rfc3339(),
        };
        let mut reports: Vec<ScalingReport> = ctx.store.read_json(REPORTS_DOC);
        reports.push(report);
        ctx.store.write_json(REPORTS_DOC, &reports)?;
        ctx.store.log_action(NAME, "Scaling report generated");
        Ok(())
    }
}
