//! Per-client task queue, persisted as `agent_queue.json`.
//!
//! The document maps agent display names to ordered task lists. Every
//! operation is a whole-document read-modify-write; the process is
//! single-threaded at each call site, so there is no file locking. A
//! concurrent writer process would lose updates (last writer wins).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::task::{QueuedTask, Task};

use super::ClientStore;

/// Queue document shape on disk.
pub type QueueDocument = BTreeMap<String, Vec<QueuedTask>>;

/// Handle to the queue files under one data root.
#[derive(Debug, Clone)]
pub struct QueueStore {
    data_dir: PathBuf,
}

/// Shared queue handle passed into agent contexts.
pub type SharedQueue = Arc<QueueStore>;

impl QueueStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn store(&self, client_id: &str) -> ClientStore {
        ClientStore::new(self.data_dir.clone(), client_id)
    }

    /// Append a task to an agent's list and persist the whole document.
    ///
    /// A log line records the enqueue in the client's action log.
    pub fn enqueue(&self, agent_name: &str, task: Task, client_id: &str) {
        let store = self.store(client_id);
        let mut queue: QueueDocument = store.read_json("agent_queue.json");
        let summary = task.text.clone();
        queue
            .entry(agent_name.to_string())
            .or_default()
            .push(QueuedTask::new(task));
        if let Err(e) = store.write_json("agent_queue.json", &queue) {
            tracing::error!("Failed to update task queue for {}: {}", agent_name, e);
            return;
        }
        store.log_action(agent_name, &format!("Queued task: {}", summary));
    }

    /// Load the whole queue document; missing or corrupt files read as empty.
    pub fn dequeue_all(&self, client_id: &str) -> QueueDocument {
        self.store(client_id).read_json("agent_queue.json")
    }

    /// Snapshot-and-swap: remove and return one agent's list, persisting the
    /// document without it before the caller starts processing.
    ///
    /// Tasks enqueued for the same agent while the snapshot is being worked
    /// land in a fresh list and survive to the next pass.
    pub fn take_for_agent(&self, agent_name: &str, client_id: &str) -> Vec<QueuedTask> {
        let store = self.store(client_id);
        let mut queue: QueueDocument = store.read_json("agent_queue.json");
        let taken = match queue.remove(agent_name) {
            Some(tasks) if !tasks.is_empty() => tasks,
            _ => return Vec::new(),
        };
        if let Err(e) = store.write_json("agent_queue.json", &queue) {
            tracing::error!("Failed to drain task queue for {}: {}", agent_name, e);
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;

    fn queue_in(dir: &tempfile::TempDir) -> QueueStore {
        QueueStore::new(dir.path())
    }

    #[test]
    fn enqueue_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(&dir);
        queue.enqueue("Crm Agent", Task::new("add lead one", Priority::LOW), "acme");
        queue.enqueue("Crm Agent", Task::new("add lead two", Priority::LOW), "acme");
        let doc = queue.dequeue_all("acme");
        let tasks = &doc["Crm Agent"];
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task.text, "add lead one");
        assert_eq!(tasks[1].task.text, "add lead two");
    }

    #[test]
    fn dequeue_all_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(queue_in(&dir).dequeue_all("nobody").is_empty());
    }

    #[test]
    fn dequeue_all_swallows_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::new(dir.path(), "acme");
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.doc_path("agent_queue.json"), "][").unwrap();
        assert!(queue_in(&dir).dequeue_all("acme").is_empty());
    }

    #[test]
    fn take_for_agent_leaves_other_agents_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(&dir);
        queue.enqueue("Crm Agent", Task::new("add lead", Priority::LOW), "acme");
        queue.enqueue("Sales Agent", Task::new("pitch lead", Priority::HIGH), "acme");

        let taken = queue.take_for_agent("Crm Agent", "acme");
        assert_eq!(taken.len(), 1);

        let doc = queue.dequeue_all("acme");
        assert!(!doc.contains_key("Crm Agent"));
        assert_eq!(doc["Sales Agent"].len(), 1);
    }

    #[test]
    fn enqueue_during_snapshot_survives() {
        let dir = tempfile::tempdir().unwrap();
        let queue = queue_in(&dir);
        queue.enqueue("Crm Agent", Task::new("first", Priority::LOW), "acme");

        let snapshot = queue.take_for_agent("Crm Agent", "acme");
        assert_eq!(snapshot.len(), 1);

        // Arrives while the snapshot is still being processed.
        queue.enqueue("Crm Agent", Task::new("second", Priority::LOW), "acme");

        let next = queue.take_for_agent("Crm Agent", "acme");
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].task.text, "second");
    }
}
