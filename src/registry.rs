//! Agent registry: explicit registration, conformance scoring, and the
//! interpreter middleware.
//!
//! Registration is static (a list of constructors), not filesystem
//! discovery. Each candidate's manifest is scored against four independent
//! checks; a score of at least [`PASS_SCORE`] admits it, and a failing
//! candidate is logged with the specific reasons and skipped. One bad
//! manifest never blocks the rest of the crew.
//!
//! Cross-cutting interpretation is composition, not subclassing: admitted
//! agents can be wrapped in [`Interpreted`], a decorator that runs the
//! command interpreter over the task text before delegating.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{Agent, AgentBuilder, AgentContext, AgentError, AgentManifest, INTERFACE_VERSION};
use crate::interpreter::CommandInterpreter;
use crate::store::ClientStore;
use crate::task::Task;

/// Checks a manifest must pass (out of [`MAX_SCORE`]) to be admitted.
pub const PASS_SCORE: u32 = 3;
pub const MAX_SCORE: u32 = 4;

/// Outcome of scoring one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceReport {
    pub score: u32,
    pub reasons: Vec<String>,
}

impl ConformanceReport {
    pub fn passed(&self) -> bool {
        self.score >= PASS_SCORE
    }
}

/// Score a manifest: four deterministic boolean checks.
///
/// Identical manifests always produce identical scores and reason lists.
pub fn evaluate_conformance(manifest: &AgentManifest) -> ConformanceReport {
    let mut score = 0;
    let mut reasons = Vec::new();

    if manifest.interface_version == INTERFACE_VERSION {
        score += 1;
    } else {
        reasons.push(format!(
            "Interface version {} does not match required {}",
            manifest.interface_version, INTERFACE_VERSION
        ));
    }

    if manifest.type_name.ends_with("Agent") && manifest.type_name.len() > "Agent".len() {
        score += 1;
    } else {
        reasons.push("Type name missing the Agent suffix".to_string());
    }

    if manifest.operations.len() >= 3 {
        score += 1;
    } else {
        reasons.push("Fewer than 3 operations declared".to_string());
    }

    if manifest.logs_actions {
        score += 1;
    } else {
        reasons.push("Does not log actions".to_string());
    }

    ConformanceReport { score, reasons }
}

/// Admitted agents for one client, keyed by display name.
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    /// Build the registry from a constructor list.
    ///
    /// When `interpreter` is given, each admitted agent is composed with the
    /// interpretation middleware. Admissions and rejections are recorded in
    /// the client's action log.
    pub fn load(
        builders: &[AgentBuilder],
        store: &ClientStore,
        interpreter: Option<Arc<CommandInterpreter>>,
    ) -> Self {
        let mut agents: BTreeMap<String, Arc<dyn Agent>> = BTreeMap::new();
        for builder in builders {
            let agent = builder();
            let manifest = agent.manifest();
            let report = evaluate_conformance(&manifest);
            let name = manifest.display_name();
            if !report.passed() {
                store.log_action(
                    manifest.type_name,
                    &format!(
                        "Skipped (score {}/{}): {}",
                        report.score,
                        MAX_SCORE,
                        report.reasons.join(" | ")
                    ),
                );
                continue;
            }
            let admitted: Arc<dyn Agent> = match &interpreter {
                Some(interpreter) => Arc::new(Interpreted {
                    inner: agent,
                    interpreter: Arc::clone(interpreter),
                }),
                None => agent,
            };
            store.log_action(
                manifest.type_name,
                &format!("Loaded agent with score {}/{}", report.score, MAX_SCORE),
            );
            agents.insert(name, admitted);
        }
        Self { agents }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Agent>> {
        self.agents.get(name)
    }

    /// Iterate in deterministic (name) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Agent>)> {
        self.agents.iter()
    }
}

/// Decorator that runs the command interpreter over the task text before
/// delegating to the wrapped agent.
///
/// Interpreter failure is logged and the task proceeds unmodified; a merged
/// decision may rewrite the task's text, priority, kind, and fields.
pub struct Interpreted {
    inner: Arc<dyn Agent>,
    interpreter: Arc<CommandInterpreter>,
}

#[async_trait]
impl Agent for Interpreted {
    fn manifest(&self) -> AgentManifest {
        self.inner.manifest()
    }

    async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
        let name = self.manifest().display_name();
        ctx.store
            .log_action(&name, &format!("Received task: {}", task.text));
        match self
            .interpreter
            .interpret_strict(&task.text, ctx.client_id())
            .await
        {
            Ok(decision) => {
                ctx.store.log_action(
                    &name,
                    &format!("Interpreter decision: {} -> {}", decision.agent, decision.task.text),
                );
                task.merge_decision(
                    decision.task.text,
                    decision.task.priority,
                    decision.task.kind,
                    decision.task.extra,
                );
            }
            Err(e) => {
                ctx.store
                    .log_action(&name, &format!("Interpreter failed: {}", e));
            }
        }
        self.inner.run_task(task, ctx).await
    }
}
