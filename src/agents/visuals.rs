//! Visuals agent: turns design requests into briefs for the asset pipeline.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "Visuals Agent";
const BRIEFS_DOC: &str = "visuals_briefs.json";

const FORMATS: &[(&str, &str)] = &[
    ("banner", "1200x628 social banner"),
    ("logo", "square logo mark"),
    ("thumbnail", "1280x720 video thumbnail"),
    ("infographic", "vertical infographic"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualBrief {
    pub request: String,
    pub format: String,
    pub palette: String,
    pub created_at: String,
}

pub struct VisualsAgent;

#[async_trait]
impl Agent for VisualsAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "VisualsAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["create_brief", "pick_format", "store_brief"],
            handled_kinds: &[TaskKind::DesignVisuals],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::DesignVisuals => self.create_brief(&task.text, ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl VisualsAgent {
    fn pick_format(request: &str) -> &'static str {
        let request = request.to_lowercase();
        FORMATS
            .iter()
            .find(|(cue, _)| request.contains(cue))
            .map(|(_, format)| *format)
            .unwrap_or("1080x1080 social post")
    }

    fn create_brief(&self, request: &str, ctx: &AgentContext) -> Result<(), AgentError> {
        let brief = VisualBrief {
            request: request.to_string(),
            format: Self::pick_format(request).to_string(),
            palette: "brand default".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        let mut briefs: Vec<VisualBrief> = ctx.store.read_json(BRIEFS_DOC);
        briefs.push(brief);
        ctx.store.write_json(BRIEFS_DOC, &briefs)?;
        ctx.store
            .log_action(NAME, &format!("Visual brief stored: {}", request));
        Ok(())
    }
}
