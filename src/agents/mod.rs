//! The agent crew.
//!
//! Every agent consumes tasks from its own per-client queue. An agent holds
//! no state between passes beyond what it re-reads from disk; construction
//! is cheap and happens fresh for each dispatch pass.
//!
//! # Generic contract
//! - log receipt of the task
//! - match on the task kind and run zero or more handlers
//! - read/write the agent's own client documents
//! - enqueue follow-up tasks onto other agents' queues
//!
//! Outward actions (email delivery, site publish) are gated on credentials
//! and the sandbox flag; without them the agent performs the mocked variant
//! and logs it.

mod analyst;
mod content;
mod crm;
mod email;
mod finance;
mod manager;
mod marketing;
mod monetization;
mod onboarding;
mod outreach;
mod sales;
mod scout;
mod socials;
mod subscription;
mod support;
mod tutorial;
mod visuals;
mod webbuilder;

pub use analyst::AnalystAgent;
pub use content::ContentAgent;
pub use crm::CrmAgent;
pub use email::EmailAgent;
pub use finance::FinancialAllocationAgent;
pub use manager::ManagerAgent;
pub use marketing::MarketingAgent;
pub use monetization::MonetizationAgent;
pub use onboarding::ClientOnboardingAgent;
pub use outreach::OutreachAgent;
pub use sales::{CloserAgent, SalesAgent};
pub use scout::ScoutAgent;
pub use socials::SocialsAgent;
pub use subscription::SubscriptionAgent;
pub use support::SupportRetentionAgent;
pub use tutorial::TutorialAgent;
pub use visuals::VisualsAgent;
pub use webbuilder::WebBuilderAgent;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::MailConfig;
use crate::interpreter::CommandInterpreter;
use crate::metrics::Metrics;
use crate::store::{ClientStore, SharedQueue, StoreError};
use crate::task::{Task, TaskKind};

/// Interface version agents are written against. Bumped when the required
/// operation set changes; the registry rejects stale manifests.
pub const INTERFACE_VERSION: u32 = 1;

/// Static self-description an agent registers with.
///
/// The registry's conformance check runs against this, not against source
/// text: the manifest names the type, the interface version it implements,
/// its handler operations, and the task kinds it accepts.
#[derive(Debug, Clone, Copy)]
pub struct AgentManifest {
    /// Rust type name; must carry the `Agent` suffix
    pub type_name: &'static str,
    pub interface_version: u32,
    /// Names of the handler operations behind `run_task`
    pub operations: &'static [&'static str],
    /// Task kinds this agent acts on
    pub handled_kinds: &'static [TaskKind],
    /// Whether the agent writes to the client action log
    pub logs_actions: bool,
}

impl AgentManifest {
    /// Display name used as the queue key: `CrmAgent` becomes `Crm Agent`.
    pub fn display_name(&self) -> String {
        match self.type_name.strip_suffix("Agent") {
            Some(stem) if !stem.is_empty() => format!("{} Agent", stem),
            _ => self.type_name.to_string(),
        }
    }
}

/// Errors raised by an agent's task handler.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Failed(String),
}

impl AgentError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Everything an agent may touch while running a task.
///
/// Owned per client per pass; the shared pieces (queue, metrics,
/// interpreter) arrive as `Arc` handles.
#[derive(Clone)]
pub struct AgentContext {
    pub store: ClientStore,
    pub queue: SharedQueue,
    pub metrics: Arc<Metrics>,
    pub interpreter: Arc<CommandInterpreter>,
    pub sandbox_mode: bool,
    pub mail: MailConfig,
}

impl AgentContext {
    pub fn client_id(&self) -> &str {
        self.store.client_id()
    }

    /// Enqueue a follow-up task for another agent of this client.
    pub fn enqueue(&self, agent_name: &str, task: Task) {
        self.queue.enqueue(agent_name, task, self.client_id());
    }

    /// Log an outward action that sandbox mode suppressed.
    pub fn sandbox_log(&self, agent: &str, action: &str) {
        self.store
            .log_action(agent, &format!("[SANDBOX] {}", action));
    }
}

/// A handler bound to a name, consuming tasks from its own queue.
#[async_trait]
pub trait Agent: Send + Sync {
    fn manifest(&self) -> AgentManifest;

    /// Run one task to completion.
    ///
    /// Errors are caught by the dispatch loop: logged, counted, and the task
    /// is still considered consumed. A task the agent does not recognize is
    /// not an error; it is logged and dropped.
    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError>;
}

/// Constructor signature the registry works with.
pub type AgentBuilder = fn() -> Arc<dyn Agent>;

/// The built-in crew, in registration order.
pub fn builtin_agents() -> Vec<AgentBuilder> {
    vec![
        || Arc::new(AnalystAgent),
        || Arc::new(ClientOnboardingAgent),
        || Arc::new(CloserAgent),
        || Arc::new(ContentAgent),
        || Arc::new(CrmAgent),
        || Arc::new(EmailAgent),
        || Arc::new(FinancialAllocationAgent),
        || Arc::new(ManagerAgent),
        || Arc::new(MarketingAgent),
        || Arc::new(MonetizationAgent),
        || Arc::new(OutreachAgent),
        || Arc::new(SalesAgent),
        || Arc::new(ScoutAgent),
        || Arc::new(SocialsAgent),
        || Arc::new(SubscriptionAgent),
        || Arc::new(SupportRetentionAgent),
        || Arc::new(TutorialAgent),
        || Arc::new(VisualsAgent),
        || Arc::new(WebBuilderAgent),
    ]
}
