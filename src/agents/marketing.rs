//! Marketing agent: campaign briefs and the weekly auto-trigger.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::task::{Priority, Task, TaskKind};

use super::crm::Lead;
use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Marketing Agent";
const LAST_CAMPAIGN_DOC: &str = "last_campaign.json";
const CAMPAIGNS_DOC: &str = "campaigns.json";

/// Minimum gap between auto-triggered campaigns.
const AUTO_CAMPAIGN_GAP_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBrief {
    pub audience: String,
    pub goal: String,
    pub channels: Vec<String>,
    pub budget: String,
    pub headline: String,
    pub cta: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LastCampaign {
    last_run: Option<String>,
}

pub struct MarketingAgent;

#[async_trait]
impl Agent for MarketingAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "MarketingAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["propose_campaign", "check_auto_trigger", "detect_common_source"],
            handled_kinds: &[TaskKind::Campaign],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::Campaign if task.text.to_lowercase().contains("auto") => {
                self.check_auto_trigger(ctx)
            }
            TaskKind::Campaign => self.propose_campaign(task, ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl MarketingAgent {
    /// Most common lead source, used as the campaign audience.
    fn detect_common_source(&self, ctx: &AgentContext) -> Option<String> {
        let leads: Vec<Lead> = ctx.store.read_json("leads.json");
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for lead in &leads {
            *counts.entry(lead.source.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by_key(|(_, n)| *n)
            .map(|(source, _)| source.to_string())
    }

    fn propose_campaign(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let audience = self
            .detect_common_source(ctx)
            .unwrap_or_else(|| "general SMBs".to_string());

        let brief = CampaignBrief {
            audience: audience.clone(),
            goal: "generate qualified leads".to_string(),
            channels: vec![
                "email".to_string(),
                "instagram".to_string(),
                "linkedin".to_string(),
            ],
            budget: "$500".to_string(),
            headline: task.text.clone(),
            cta: "Claim your free AI business audit now".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let mut campaigns: Vec<CampaignBrief> = ctx.store.read_json(CAMPAIGNS_DOC);
        campaigns.push(brief.clone());
        ctx.store.write_json(CAMPAIGNS_DOC, &campaigns)?;
        ctx.store.write_json(
            LAST_CAMPAIGN_DOC,
            &LastCampaign {
                last_run: Some(Utc::now().to_rfc3339()),
            },
        )?;
        ctx.store.log_action(
            NAME,
            &format!("Proposed campaign for audience: {}", audience),
        );

        // A campaign that came back funded must not re-enter the approval
        // queue, or one approval would cycle forever.
        if task.field("funded").is_none() {
            ctx.enqueue(
                "FinancialAllocation Agent",
                Task::with_kind(
                    format!("Approve marketing campaign budget: {}", brief.headline),
                    Priority::NORMAL,
                    TaskKind::AllocateBudget,
                ),
            );
        }
        ctx.enqueue(
            "Visuals Agent",
            Task::with_kind(
                format!("Design campaign visuals for: {}", brief.headline),
                Priority::NORMAL,
                TaskKind::DesignVisuals,
            ),
        );
        Ok(())
    }

    /// Propose a campaign if none ran in the last week.
    fn check_auto_trigger(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let last: LastCampaign = ctx.store.read_json(LAST_CAMPAIGN_DOC);
        let due = match last
            .last_run
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            Some(ts) => Utc::now() - ts.with_timezone(&Utc) >= Duration::days(AUTO_CAMPAIGN_GAP_DAYS),
            None => true,
        };
        if due {
            let task = Task::with_kind("Weekly growth campaign", Priority::NORMAL, TaskKind::Campaign);
            self.propose_campaign(&task, ctx)
        } else {
            ctx.store
                .log_action(NAME, "Auto campaign not due yet; skipping");
            Ok(())
        }
    }
}
