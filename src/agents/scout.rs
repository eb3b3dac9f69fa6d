//! Scout agent: niche research reports and the weekly scouting cadence.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::Counter;
use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Scout Agent";
const REPORTS_DOC: &str = "scout_reports.json";
const LAST_RUN_DOC: &str = "scout_last_run.json";

/// Minimum gap between auto-scheduled scouting passes.
const AUTO_SCOUT_GAP_DAYS: i64 = 7;

/// Niche catalog: (name, demand score, platforms worth watching).
const NICHES: &[(&str, u8, &[&str])] = &[
    ("coaching", 8, &["linkedin", "youtube"]),
    ("e-commerce", 9, &["instagram", "tiktok"]),
    ("local services", 6, &["google", "facebook"]),
    ("saas tools", 7, &["linkedin", "x"]),
];

/// How many ranked niches a report carries.
const REPORT_DEPTH: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NichePick {
    pub name: String,
    pub demand_score: u8,
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutReport {
    pub niches: Vec<NichePick>,
    pub recommendation: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LastRun {
    last_run: Option<String>,
}

pub struct ScoutAgent;

#[async_trait]
impl Agent for ScoutAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "ScoutAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["scout_market", "check_auto_scout", "rank_niches"],
            handled_kinds: &[TaskKind::ScoutMarket],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::ScoutMarket if task.text.to_lowercase().contains("auto") => {
                self.check_auto_scout(ctx)
            }
            TaskKind::ScoutMarket => self.scout_market(ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl ScoutAgent {
    fn rank_niches() -> Vec<NichePick> {
        let mut picks: Vec<NichePick> = NICHES
            .iter()
            .map(|(name, score, platforms)| NichePick {
                name: name.to_string(),
                demand_score: *score,
                platforms: platforms.iter().map(|p| p.to_string()).collect(),
            })
            .collect();
        picks.sort_by(|a, b| b.demand_score.cmp(&a.demand_score));
        picks.truncate(REPORT_DEPTH);
        picks
    }

    fn scout_market(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let niches = Self::rank_niches();
        let top = niches[0].name.clone();
        let report = ScoutReport {
            niches,
            recommendation: format!(
                "Start outreach in {} first; the demand signal is strongest there.",
                top
            ),
            created_at: Utc::now().to_rfc3339(),
        };

        let mut reports: Vec<ScoutReport> = ctx.store.read_json(REPORTS_DOC);
        reports.push(report);
        ctx.store.write_json(REPORTS_DOC, &reports)?;
        ctx.store.write_json(
            LAST_RUN_DOC,
            &LastRun {
                last_run: Some(Utc::now().to_rfc3339()),
            },
        )?;
        ctx.metrics.incr(Counter::LeadsGenerated);
        ctx.store
            .log_action(NAME, &format!("Scouted market; top niche: {}", top));

        ctx.enqueue(
            "Outreach Agent",
            Task::with_kind(
                format!("Begin outreach push in the {} niche", top),
                Priority::NORMAL,
                TaskKind::Outreach,
            ),
        );
        Ok(())
    }

    /// Scout if no pass ran in the last week.
    fn check_auto_scout(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let last: LastRun = ctx.store.read_json(LAST_RUN_DOC);
        let due = match last
            .last_run
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            Some(ts) => Utc::now() - ts.with_timezone(&Utc) >= Duration::days(AUTO_SCOUT_GAP_DAYS),
            None => true,
        };
        if due {
            self.scout_market(ctx)
        } else {
            ctx.store
                .log_action(NAME, "Auto scout not due yet; skipping");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testutil::context_in;

    #[tokio::test]
    async fn report_ranks_by_demand_and_queues_outreach() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");
        let mut task = Task::new("scout new market niches", Priority::NORMAL);

        ScoutAgent.run_task(&mut task, &ctx).await.unwrap();

        let reports: Vec<ScoutReport> = ctx.store.read_json(REPORTS_DOC);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].niches.len(), 3);
        assert_eq!(reports[0].niches[0].name, "e-commerce");
        assert_eq!(ctx.metrics.get(Counter::LeadsGenerated), 1);
        assert!(ctx.queue.dequeue_all("acme").contains_key("Outreach Agent"));
    }

    #[tokio::test]
    async fn auto_scout_respects_weekly_gap() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context_in(&dir, "acme");

        let mut auto_task = Task::new("auto scout pass", Priority::NORMAL);
        ScoutAgent.run_task(&mut auto_task, &ctx).await.unwrap();
        let reports: Vec<ScoutReport> = ctx.store.read_json(REPORTS_DOC);
        assert_eq!(reports.len(), 1);

        // Immediately after a pass, the cadence is not due.
        let mut again = Task::new("auto scout pass", Priority::NORMAL);
        ScoutAgent.run_task(&mut again, &ctx).await.unwrap();
        let reports: Vec<ScoutReport> = ctx.store.read_json(REPORTS_DOC);
        assert_eq!(reports.len(), 1);
    }
}
