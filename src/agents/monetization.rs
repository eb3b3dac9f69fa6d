//! Monetization agent: pricing review, the revenue forecast, and client
//! segments.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Monetization Agent";
const REVIEWS_DOC: &str = "pricing_reviews.json";
const FORECAST_DOC: &str = "forecast.json";
const SEGMENTS_DOC: &str = "segments.json";

/// Monthly revenue separating high-value clients from the rest.
const SEGMENT_THRESHOLD: u64 = 500;
/// Month-over-month growth applied to the forecast.
const GROWTH_FACTOR: f64 = 1.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingReview {
    pub average_revenue_per_client: u64,
    pub clients: u64,
    pub recommendation: String,
    pub reviewed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub average_revenue_per_client: u64,
    pub monthly_revenue_forecast: u64,
    pub projected_growth_rate: String,
    pub leads_considered: u64,
    pub generated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSegments {
    pub high_value: Vec<String>,
    pub low_value: Vec<String>,
    pub threshold: u64,
    pub segmented_at: String,
}

pub struct MonetizationAgent;

#[async_trait]
impl Agent for MonetizationAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "MonetizationAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["analyze_pricing", "generate_forecast", "segment_clients"],
            handled_kinds: &[
                TaskKind::AnalyzePricing,
                TaskKind::Forecast,
                TaskKind::SegmentClients,
            ],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::AnalyzePricing => self.analyze_pricing(ctx),
            TaskKind::Forecast => self.generate_forecast(ctx),
            TaskKind::SegmentClients => self.segment_clients(ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl MonetizationAgent {
    fn revenue_stats(ctx: &AgentContext) -> (u64, u64) {
        let snapshot = ctx.metrics.snapshot();
        let clients = snapshot.revenue_by_client.len() as u64;
        let average = if clients == 0 {
            0
        } else {
            snapshot.revenue_generated / clients
        };
        (average, clients)
    }

    fn analyze_pricing(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let (average, clients) = Self::revenue_stats(ctx);
        let recommendation = if average < SEGMENT_THRESHOLD {
            "Average revenue per client is low. Consider raising entry pricing or bundling tiers."
        } else {
            "Average revenue per client is healthy. Consider a premium tier for heavy users."
        };

        let mut reviews: Vec<PricingReview> = ctx.store.read_json(REVIEWS_DOC);
        reviews.push(PricingReview {
            average_revenue_per_client: average,
            clients,
            recommendation: recommendation.to_string(),
            reviewed_at: Utc::now().to_rfc3339(),
        });
        ctx.store.write_json(REVIEWS_DOC, &reviews)?;
        ctx.store
            .log_action(NAME, &format!("Pricing review: {}", recommendation));

        ctx.enqueue(
            "Manager Agent",
            Task::with_kind(
                "Evaluate new pricing strategy across tiers",
                Priority::NORMAL,
                TaskKind::Delegate,
            ),
        );
        Ok(())
    }

    fn generate_forecast(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let snapshot = ctx.metrics.snapshot();
        let (average, clients) = Self::revenue_stats(ctx);
        let forecast = Forecast {
            average_revenue_per_client: average,
            monthly_revenue_forecast: ((average * clients) as f64 * GROWTH_FACTOR) as u64,
            projected_growth_rate: "10-15%".to_string(),
            leads_considered: snapshot.leads_generated,
            generated_at: Utc::now().to_rfc3339(),
        };

        let mut forecasts: Vec<Forecast> = ctx.store.read_json(FORECAST_DOC);
        forecasts.push(forecast.clone());
        ctx.store.write_json(FORECAST_DOC, &forecasts)?;
        ctx.store.log_action(
            NAME,
            &format!(
                "Forecast: ${}/mo across {} clients",
                forecast.monthly_revenue_forecast, clients
            ),
        );
        Ok(())
    }

    /// Split known clients at the revenue threshold; the high side gets an
    /// upsell pitch, the low side a retention check-in.
    fn segment_clients(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let snapshot = ctx.metrics.snapshot();
        let mut segments = ClientSegments {
            threshold: SEGMENT_THRESHOLD,
            segmented_at: Utc::now().to_rfc3339(),
            ..ClientSegments::default()
        };
        for (client, revenue) in &snapshot.revenue_by_client {
            if *revenue >= SEGMENT_THRESHOLD {
                segments.high_value.push(client.clone());
            } else {
                segments.low_value.push(client.clone());
            }
        }
        ctx.store.write_json(SEGMENTS_DOC, &segments)?;

        for client in &segments.high_value {
            ctx.enqueue(
                "Sales Agent",
                Task::with_kind(
                    format!("Pitch an upgrade to high-value client: {}", client),
                    Priority::NORMAL,
                    TaskKind::Pitch,
                ),
            );
        }
        for client in &segments.low_value {
            ctx.enqueue(
                "SupportRetention Agent",
                Task::with_kind(
                    format!("Check in with {}; churn risk at current spend", client),
                    Priority::NORMAL,
                    TaskKind::RetainClient,
                ),
            );
        }
        ctx.store.log_action(
            NAME,
            &format!(
                "Segmented {} high-value and {} low-value clients",
                segments.high_value.len(),
                segments.low_value.len()
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;

    #[tokio::test]
    async fn forecast_projects_growth_over_current_revenue() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        ctx.metrics.add_revenue("acme", 300);
        ctx.metrics.add_revenue("globex", 500);

        let mut task = Task::new("forecast revenue for next month", Priority::NORMAL);
        MonetizationAgent.run_task(&mut task, &ctx).await.unwrap();

        let forecasts: Vec<Forecast> = ctx.store.read_json(FORECAST_DOC);
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].average_revenue_per_client, 400);
        assert_eq!(forecasts[0].monthly_revenue_forecast, 880);
    }

    #[tokio::test]
    async fn forecast_without_clients_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");

        let mut task = Task::new("forecast revenue", Priority::NORMAL);
        MonetizationAgent.run_task(&mut task, &ctx).await.unwrap();

        let forecasts: Vec<Forecast> = ctx.store.read_json(FORECAST_DOC);
        assert_eq!(forecasts[0].monthly_revenue_forecast, 0);
    }

    #[tokio::test]
    async fn segments_split_at_threshold_and_queue_follow_ups() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        ctx.metrics.add_revenue("acme", 700);
        ctx.metrics.add_revenue("globex", 120);

        let mut task = Task::new("segment clients by revenue", Priority::NORMAL);
        MonetizationAgent.run_task(&mut task, &ctx).await.unwrap();

        let segments: ClientSegments = ctx.store.read_json(SEGMENTS_DOC);
        assert_eq!(segments.high_value, vec!["acme"]);
        assert_eq!(segments.low_value, vec!["globex"]);

        let doc = ctx.queue.dequeue_all("acme");
        assert!(doc.contains_key("Sales Agent"));
        assert!(doc.contains_key("SupportRetention Agent"));
    }

    #[tokio::test]
    async fn pricing_review_notifies_manager() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");

        let mut task = Task::new("analyze pricing tiers", Priority::NORMAL);
        MonetizationAgent.run_task(&mut task, &ctx).await.unwrap();

        let reviews: Vec<PricingReview> = ctx.store.read_json(REVIEWS_DOC);
        assert_eq!(reviews.len(), 1);
        assert!(reviews[0].recommendation.contains("raising entry pricing"));
        assert!(ctx.queue.dequeue_all("acme").contains_key("Manager Agent"));
    }
}
