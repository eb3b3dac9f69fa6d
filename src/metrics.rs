//! Process-wide operational counters.
//!
//! The counters live in an explicit `Metrics` context owned by the
//! application and passed by `Arc`, not in module-level state. Counters are
//! atomic; the per-client revenue map sits behind a `RwLock`. Values reset on
//! process restart unless a snapshot has been persisted.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// Counter names understood by [`Metrics::incr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    TasksProcessed,
    TasksFailed,
    AgentsGenerated,
    ClientsOnboarded,
    RevenueGenerated,
    ClientSatisfaction,
    LeadsGenerated,
}

/// Shared metrics context.
#[derive(Debug, Default)]
pub struct Metrics {
    tasks_processed: AtomicU64,
    tasks_failed: AtomicU64,
    agents_generated: AtomicU64,
    clients_onboarded: AtomicU64,
    revenue_generated: AtomicU64,
    client_satisfaction: AtomicU64,
    leads_generated: AtomicU64,
    revenue_by_client: RwLock<BTreeMap<String, u64>>,
}

/// Serializable point-in-time view of the counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub tasks_processed: u64,
    pub tasks_failed: u64,
    pub agents_generated: u64,
    pub clients_onboarded: u64,
    pub revenue_generated: u64,
    pub client_satisfaction: u64,
    pub leads_generated: u64,
    pub revenue_by_client: BTreeMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::TasksProcessed => &self.tasks_processed,
            Counter::TasksFailed => &self.tasks_failed,
            Counter::AgentsGenerated => &self.agents_generated,
            Counter::ClientsOnboarded => &self.clients_onboarded,
            Counter::RevenueGenerated => &self.revenue_generated,
            Counter::ClientSatisfaction => &self.client_satisfaction,
            Counter::LeadsGenerated => &self.leads_generated,
        }
    }

    /// Increment a counter by one.
    pub fn incr(&self, counter: Counter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by an arbitrary amount.
    pub fn add(&self, counter: Counter, amount: u64) {
        self.counter(counter).fetch_add(amount, Ordering::Relaxed);
    }

    /// Record a task execution failure.
    pub fn record_error(&self) {
        self.incr(Counter::TasksFailed);
    }

    /// Record revenue both globally and against a client.
    pub fn add_revenue(&self, client_id: &str, amount: u64) {
        self.add(Counter::RevenueGenerated, amount);
        if let Ok(mut map) = self.revenue_by_client.write() {
            *map.entry(client_id.to_string()).or_insert(0) += amount;
        }
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counter(counter).load(Ordering::Relaxed)
    }

    /// Take a consistent-enough snapshot for reporting.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_processed: self.get(Counter::TasksProcessed),
            tasks_failed: self.get(Counter::TasksFailed),
            agents_generated: self.get(Counter::AgentsGenerated),
            clients_onboarded: self.get(Counter::ClientsOnboarded),
            revenue_generated: self.get(Counter::RevenueGenerated),
            client_satisfaction: self.get(Counter::ClientSatisfaction),
            leads_generated: self.get(Counter::LeadsGenerated),
            revenue_by_client: self
                .revenue_by_client
                .read()
                .map(|m| m.clone())
                .unwrap_or_default(),
        }
    }

    /// Persist a snapshot to a flat JSON file. Failures are logged, not raised.
    pub fn persist(&self, path: &Path) {
        let snapshot = self.snapshot();
        let body = match serde_json::to_string_pretty(&snapshot) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Failed to serialize metrics snapshot: {}", e);
                return;
            }
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(path, body) {
            tracing::error!("Failed to persist metrics snapshot: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_and_snapshot() {
        let metrics = Metrics::new();
        metrics.incr(Counter::TasksProcessed);
        metrics.incr(Counter::TasksProcessed);
        metrics.record_error();
        let snap = metrics.snapshot();
        assert_eq!(snap.tasks_processed, 2);
        assert_eq!(snap.tasks_failed, 1);
        assert_eq!(snap.leads_generated, 0);
    }

    #[test]
    fn revenue_is_tracked_per_client_and_globally() {
        let metrics = Metrics::new();
        metrics.add_revenue("acme", 99);
        metrics.add_revenue("acme", 29);
        metrics.add_revenue("globex", 249);
        let snap = metrics.snapshot();
        assert_eq!(snap.revenue_generated, 377);
        assert_eq!(snap.revenue_by_client["acme"], 128);
        assert_eq!(snap.revenue_by_client["globex"], 249);
    }

    #[test]
    fn persist_writes_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let metrics = Metrics::new();
        metrics.incr(Counter::ClientsOnboarded);
        metrics.persist(&path);
        let loaded: MetricsSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.clients_onboarded, 1);
    }
}
