//! Socials agent: post plans and the weekly auto-post cadence.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Role;
use crate::task::{Priority, Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Socials Agent";
const POSTS_DOC: &str = "social_posts.json";
const LAST_POST_DOC: &str = "socials_last_post.json";

/// Minimum gap between auto-scheduled posts.
const AUTO_POST_GAP_DAYS: i64 = 7;

const PLATFORMS: &[&str] = &["instagram", "linkedin", "x"];
const RECOMMENDED_TIME: &str = "09:00";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPlan {
    pub topic: String,
    /// Two caption variants per post, so an operator can pick one.
    pub captions: Vec<String>,
    pub platforms: Vec<String>,
    pub recommended_time: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LastPost {
    last_posted: Option<String>,
}

pub struct SocialsAgent;

#[async_trait]
impl Agent for SocialsAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "SocialsAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["plan_post", "check_auto_post", "pick_topic"],
            handled_kinds: &[TaskKind::SchedulePost],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::SchedulePost if task.text.to_lowercase().contains("auto") => {
                self.check_auto_post(ctx)
            }
            TaskKind::SchedulePost => self.plan_post(&task.text, ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl SocialsAgent {
    /// Topic from the newest user message, or the task text itself.
    fn pick_topic(&self, fallback: &str, ctx: &AgentContext) -> String {
        ctx.store
            .load_memory()
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    fn plan_post(&self, text: &str, ctx: &AgentContext) -> Result<(), AgentError> {
        let topic = self.pick_topic(text, ctx);
        let plan = PostPlan {
            topic: topic.clone(),
            captions: vec![
                format!("How we think about {}", topic),
                format!("{}: one lesson from this week", topic),
            ],
            platforms: PLATFORMS.iter().map(|p| p.to_string()).collect(),
            recommended_time: RECOMMENDED_TIME.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let mut posts: Vec<PostPlan> = ctx.store.read_json(POSTS_DOC);
        posts.push(plan);
        ctx.store.write_json(POSTS_DOC, &posts)?;
        ctx.store.write_json(
            LAST_POST_DOC,
            &LastPost {
                last_posted: Some(Utc::now().to_rfc3339()),
            },
        )?;
        ctx.store
            .log_action(NAME, &format!("Planned post on: {}", topic));

        ctx.enqueue(
            "Visuals Agent",
            Task::with_kind(
                format!("Design social visuals for: {}", topic),
                Priority::NORMAL,
                TaskKind::DesignVisuals,
            ),
        );
        Ok(())
    }

    /// Plan a post if none went out in the last week.
    fn check_auto_post(&self, ctx: &AgentContext) -> Result<(), AgentError> {
        let last: LastPost = ctx.store.read_json(LAST_POST_DOC);
        let due = match last
            .last_posted
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            Some(ts) => Utc::now() - ts.with_timezone(&Utc) >= Duration::days(AUTO_POST_GAP_DAYS),
            None => true,
        };
        if due {
            self.plan_post("Weekly update from the workshop", ctx)
        } else {
            ctx.store.log_action(NAME, "Auto post not due yet; skipping");
            Ok(())
        }
    }
}
