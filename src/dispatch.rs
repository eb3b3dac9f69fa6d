//! Dispatch loop: one pass loads the agent crew, runs every due task, and
//! drains the queues.
//!
//! Strictly sequential: one task at a time, to completion, before the next.
//! A failing task is logged, counted, and never retried; nothing in a pass
//! is allowed to abort the pass. The continuous mode repeats passes over
//! every client directory on a fixed sleep interval, with no jitter and no
//! backoff.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::agents::{builtin_agents, AgentBuilder, AgentContext};
use crate::config::{Config, MailConfig};
use crate::interpreter::CommandInterpreter;
use crate::metrics::{Counter, Metrics};
use crate::registry::AgentRegistry;
use crate::store::{list_clients, ClientStore, SharedQueue};

/// Outcome of a single dispatch pass.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub client_id: String,
    pub agents_with_work: usize,
    pub tasks_run: usize,
    pub tasks_failed: usize,
}

/// Owns one client universe of passes.
pub struct Dispatcher {
    builders: Vec<AgentBuilder>,
    queue: SharedQueue,
    metrics: Arc<Metrics>,
    interpreter: Arc<CommandInterpreter>,
    data_dir: PathBuf,
    sandbox_mode: bool,
    mail: MailConfig,
    interval: Duration,
    default_client: String,
    /// Compose every agent with the interpreter middleware
    wrap_with_interpreter: bool,
}

impl Dispatcher {
    pub fn new(
        config: &Config,
        queue: SharedQueue,
        metrics: Arc<Metrics>,
        interpreter: Arc<CommandInterpreter>,
    ) -> Self {
        Self {
            builders: builtin_agents(),
            queue,
            metrics,
            interpreter,
            data_dir: config.data_dir.clone(),
            sandbox_mode: config.sandbox_mode,
            mail: config.mail.clone(),
            interval: Duration::from_secs(config.loop_interval_secs.max(1)),
            default_client: config.default_client.clone(),
            wrap_with_interpreter: false,
        }
    }

    /// Enable the interpreter middleware for every admitted agent.
    pub fn with_interpreter_middleware(mut self, enabled: bool) -> Self {
        self.wrap_with_interpreter = enabled;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_builders(mut self, builders: Vec<AgentBuilder>) -> Self {
        self.builders = builders;
        self
    }

    fn context_for(&self, client_id: &str) -> AgentContext {
        AgentContext {
            store: ClientStore::new(self.data_dir.clone(), client_id),
            queue: Arc::clone(&self.queue),
            metrics: Arc::clone(&self.metrics),
            interpreter: Arc::clone(&self.interpreter),
            sandbox_mode: self.sandbox_mode,
            mail: self.mail.clone(),
        }
    }

    /// Run one dispatch pass for a client.
    ///
    /// For each admitted agent: swap out its queued list, stable-sort by
    /// descending priority (ties keep enqueue order), and run every task.
    pub async fn run_once(&self, client_id: &str) -> RunReport {
        let run_id = Uuid::new_v4();
        let ctx = self.context_for(client_id);

        let interpreter = self
            .wrap_with_interpreter
            .then(|| Arc::clone(&self.interpreter));
        let registry = AgentRegistry::load(&self.builders, &ctx.store, interpreter);

        let mut report = RunReport {
            run_id,
            client_id: client_id.to_string(),
            agents_with_work: 0,
            tasks_run: 0,
            tasks_failed: 0,
        };

        for (name, agent) in registry.iter() {
            let mut tasks = self.queue.take_for_agent(name, client_id);
            if tasks.is_empty() {
                continue;
            }
            report.agents_with_work += 1;
            tasks.sort_by(|a, b| b.priority.cmp(&a.priority));

            for entry in &mut tasks {
                report.tasks_run += 1;
                match agent.run_task(&mut entry.task, &ctx).await {
                    Ok(()) => self.metrics.incr(Counter::TasksProcessed),
                    Err(e) => {
                        ctx.store
                            .log_action(name, &format!("Task error: {}", e));
                        self.metrics.record_error();
                        report.tasks_failed += 1;
                    }
                }
            }
        }

        ctx.store.log_action(
            "Dispatch Loop",
            &format!("Completed run for client: {}", client_id),
        );
        tracing::debug!(run = %run_id, client = client_id, tasks = report.tasks_run, "pass complete");
        report
    }

    /// Run passes for every known client, then the default client if it has
    /// no directory yet.
    pub async fn run_all_clients(&self) {
        let mut clients = list_clients(&self.data_dir);
        if !clients.iter().any(|c| c == &self.default_client) {
            clients.push(self.default_client.clone());
        }
        for client_id in clients {
            self.run_once(&client_id).await;
        }
        self.metrics.persist(&self.data_dir.join("metrics.json"));
    }

    /// Continuous mode: pass, sleep, repeat. Terminates only with the process.
    pub async fn run_forever(&self) {
        loop {
            self.run_all_clients().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agent, AgentError, AgentManifest, INTERFACE_VERSION};
    use crate::store::QueueStore;
    use crate::task::{Priority, Task, TaskKind};
    use async_trait::async_trait;

    /// Test agent that records execution order in the action log and can be
    /// told to fail. Each test runs in its own tempdir, so the log is
    /// isolated per test.
    struct ProbeAgent;

    #[async_trait]
    impl Agent for ProbeAgent {
        fn manifest(&self) -> AgentManifest {
            AgentManifest {
                type_name: "ProbeAgent",
                interface_version: INTERFACE_VERSION,
                operations: &["record", "fail", "noop"],
                handled_kinds: &[TaskKind::Other],
                logs_actions: true,
            }
        }

        async fn run_task(&self, task: &mut Task, ctx: &AgentContext) -> Result<(), AgentError> {
            ctx.store
                .log_action("Probe Agent", &format!("Running task: {}", task.text));
            if task.text.contains("boom") {
                return Err(AgentError::failed("boom"));
            }
            Ok(())
        }
    }

    fn ran_tasks(dir: &tempfile::TempDir, client_id: &str) -> Vec<String> {
        let store = ClientStore::new(dir.path(), client_id);
        let log = std::fs::read_to_string(store.doc_path("actions.log")).unwrap_or_default();
        log.lines()
            .filter_map(|l| l.split("Running task: ").nth(1))
            .map(|s| s.to_string())
            .collect()
    }

    fn dispatcher_in(dir: &tempfile::TempDir) -> (Dispatcher, SharedQueue, Arc<Metrics>) {
        let queue: SharedQueue = Arc::new(QueueStore::new(dir.path()));
        let metrics = Arc::new(Metrics::new());
        let interpreter = Arc::new(CommandInterpreter::new(
            Arc::new(crate::agents::testutil::OfflineLlm),
            dir.path(),
            Arc::clone(&queue),
        ));
        let config = Config {
            api_key: String::new(),
            model: "test".to_string(),
            data_dir: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            api_token: None,
            sandbox_mode: true,
            loop_interval_secs: 1,
            default_client: "default".to_string(),
            mail: MailConfig::default(),
        };
        let dispatcher = Dispatcher::new(&config, Arc::clone(&queue), Arc::clone(&metrics), interpreter)
            .with_builders(vec![|| Arc::new(ProbeAgent)]);
        (dispatcher, queue, metrics)
    }

    #[tokio::test]
    async fn queue_is_empty_after_pass_even_with_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, queue, _) = dispatcher_in(&dir);
        queue.enqueue("Probe Agent", Task::new("boom", Priority::LOW), "acme");
        queue.enqueue("Probe Agent", Task::new("fine", Priority::LOW), "acme");

        let report = dispatcher.run_once("acme").await;
        assert_eq!(report.tasks_run, 2);
        assert_eq!(report.tasks_failed, 1);
        assert!(queue.dequeue_all("acme").get("Probe Agent").is_none());
    }

    #[tokio::test]
    async fn tasks_run_in_stable_descending_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, queue, _) = dispatcher_in(&dir);
        queue.enqueue("Probe Agent", Task::new("low one", Priority::LOW), "acme");
        queue.enqueue("Probe Agent", Task::new("high", Priority::HIGH), "acme");
        queue.enqueue("Probe Agent", Task::new("low two", Priority::LOW), "acme");

        dispatcher.run_once("acme").await;
        assert_eq!(ran_tasks(&dir, "acme"), vec!["high", "low one", "low two"]);
    }

    #[tokio::test]
    async fn failing_task_counts_once_and_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, queue, metrics) = dispatcher_in(&dir);
        queue.enqueue("Probe Agent", Task::new("boom", Priority::LOW), "acme");

        dispatcher.run_once("acme").await;
        assert_eq!(metrics.get(Counter::TasksFailed), 1);

        // A second pass finds nothing; the failed task was consumed.
        let report = dispatcher.run_once("acme").await;
        assert_eq!(report.tasks_run, 0);
        assert_eq!(metrics.get(Counter::TasksFailed), 1);
    }

    #[tokio::test]
    async fn approved_budget_settles_instead_of_cycling() {
        let dir = tempfile::tempdir().unwrap();
        let queue: SharedQueue = Arc::new(QueueStore::new(dir.path()));
        let metrics = Arc::new(Metrics::new());
        let interpreter = Arc::new(CommandInterpreter::new(
            Arc::new(crate::agents::testutil::OfflineLlm),
            dir.path(),
            Arc::clone(&queue),
        ));
        let config = Config {
            api_key: String::new(),
            model: "test".to_string(),
            data_dir: dir.path().to_path_buf(),
            host: "127.0.0.1".to_string(),
            port: 0,
            api_token: None,
            sandbox_mode: true,
            loop_interval_secs: 1,
            default_client: "default".to_string(),
            mail: MailConfig::default(),
        };
        let dispatcher =
            Dispatcher::new(&config, Arc::clone(&queue), Arc::clone(&metrics), interpreter);

        metrics.add_revenue("acme", 500);
        queue.enqueue(
            "FinancialAllocation Agent",
            Task::with_kind(
                "Approve campaign budget",
                Priority::NORMAL,
                TaskKind::AllocateBudget,
            ),
            "acme",
        );

        for _ in 0..4 {
            dispatcher.run_once("acme").await;
        }

        // One approval, one campaign, and the work settles.
        let store = ClientStore::new(dir.path(), "acme");
        let campaigns: Vec<serde_json::Value> = store.read_json("campaigns.json");
        assert_eq!(campaigns.len(), 1);
        let decisions: Vec<serde_json::Value> = store.read_json("budget_decisions.json");
        assert_eq!(decisions.len(), 1);
        assert!(queue.dequeue_all("acme").is_empty());
    }

    #[tokio::test]
    async fn empty_queue_pass_logs_completion_once() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, _, metrics) = dispatcher_in(&dir);

        let report = dispatcher.run_once("acme").await;
        assert_eq!(report.agents_with_work, 0);
        assert_eq!(metrics.get(Counter::TasksFailed), 0);

        let store = ClientStore::new(dir.path(), "acme");
        let log = std::fs::read_to_string(store.doc_path("actions.log")).unwrap();
        let completed = log
            .lines()
            .filter(|l| l.contains("Completed run"))
            .count();
        assert_eq!(completed, 1);
    }
}
