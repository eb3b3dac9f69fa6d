//! Web builder agent: site scaffolds and (sandbox-gated) publishing.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskKind};

use super::{Agent, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};

const NAME: &str = "WebBuilder Agent";
const SITES_DOC: &str = "sites.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub pages: Vec<String>,
    pub status: String,
    pub updated_at: String,
}

pub struct WebBuilderAgent;

#[async_trait]
impl Agent for WebBuilderAgent {
    fn manifest(&self) -> AgentManifest {
        AgentManifest {
            type_name: "WebBuilderAgent",
            interface_version: INTERFACE_VERSION,
            operations: &["scaffold_site", "publish_site", "record_site"],
            handled_kinds: &[TaskKind::BuildSite, TaskKind::PublishSite],
            logs_actions: true,
        }
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        ctx.store
            .log_action(NAME, &format!("Running task: {}", task.text));
        match task.kind {
            TaskKind::BuildSite => self.scaffold_site(task, ctx),
            TaskKind::PublishSite => self.publish_site(task, ctx),
            _ => {
                ctx.store
                    .log_action(NAME, &format!("Ignoring unrelated task: {}", task.text));
                Ok(())
            }
        }
    }
}

impl WebBuilderAgent {
    fn site_name(task: &Task, ctx: &AgentContext) -> String {
        task.field("site")
            .map(String::from)
            .unwrap_or_else(|| format!("{}-site", ctx.client_id()))
    }

    fn scaffold_site(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let name = Self::site_name(task, ctx);
        let mut sites: Vec<Site> = ctx.store.read_json(SITES_DOC);
        if sites.iter().any(|s| s.name == name) {
            ctx.store
                .log_action(NAME, &format!("Site already scaffolded: {}", name));
            return Ok(());
        }
        sites.push(Site {
            name: name.clone(),
            pages: vec![
                "index".to_string(),
                "pricing".to_string(),
                "about".to_string(),
                "contact".to_string(),
            ],
            status: "draft".to_string(),
            updated_at: Utc::now().to_rfc3339(),
        });
        ctx.store.write_json(SITES_DOC, &sites)?;
        ctx.store
            .log_action(NAME, &format!("Site scaffolded: {}", name));
        Ok(())
    }

    /// Publishing is the one outward action here, so it honors the sandbox
    /// flag; the site record still moves to `published`.
    fn publish_site(&self, task: &Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let name = Self::site_name(task, ctx);
        let mut sites: Vec<Site> = ctx.store.read_json(SITES_DOC);
        let Some(site) = sites.iter_mut().find(|s| s.name == name) else {
            ctx.store
                .log_action(NAME, &format!("No scaffold to publish for: {}", name));
            return Ok(());
        };
        site.status = "published".to_string();
        site.updated_at = Utc::now().to_rfc3339();
        ctx.store.write_json(SITES_DOC, &sites)?;

        if ctx.sandbox_mode {
            ctx.sandbox_log(NAME, &format!("Would deploy site: {}", name));
        } else {
            ctx.store
                .log_action(NAME, &format!("Site published: {}", name));
        }
        Ok(())
    }
}
