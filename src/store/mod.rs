//! Per-client persistent store.
//!
//! Every client owns a directory under the data root holding small JSON
//! documents (`memory.json`, `agent_queue.json`, `leads.json`, ...) plus two
//! append-only text logs. There are no transactions: each write replaces the
//! whole file, and corrupt or missing reads degrade to a default value.

mod memory;
mod queue;

pub use memory::{MemoryEntry, Role, MAX_MEMORY};
pub use queue::{QueueStore, SharedQueue};

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize {doc}: {source}")]
    Serialize {
        doc: String,
        source: serde_json::Error,
    },
}

/// Handle to one client's directory.
#[derive(Debug, Clone)]
pub struct ClientStore {
    root: PathBuf,
    client_id: String,
}

impl ClientStore {
    pub fn new(data_dir: impl Into<PathBuf>, client_id: impl Into<String>) -> Self {
        Self {
            root: data_dir.into(),
            client_id: client_id.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Directory holding this client's documents.
    pub fn dir(&self) -> PathBuf {
        self.root.join("clients").join(&self.client_id)
    }

    /// Path of a named document in this client's directory.
    pub fn doc_path(&self, name: &str) -> PathBuf {
        self.dir().join(name)
    }

    /// Read a JSON document, degrading to the default on absence or corruption.
    ///
    /// Corruption is logged and swallowed; callers always get a usable value.
    pub fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.doc_path(name);
        let body = match std::fs::read_to_string(&path) {
            Ok(b) => b,
            Err(_) => return T::default(),
        };
        match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Corrupt document {}: {}", path.display(), e);
                T::default()
            }
        }
    }

    /// Replace a JSON document wholesale.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialize {
            doc: name.to_string(),
            source: e,
        })?;
        let path = self.doc_path(name);
        ensure_parent(&path)?;
        std::fs::write(&path, body).map_err(|e| StoreError::Io { path, source: e })
    }

    /// Append one line to the per-client action log and mirror it to tracing.
    ///
    /// Log failures must never take an agent down, so they are only traced.
    pub fn log_action(&self, agent: &str, message: &str) {
        let line = format!("[{}] {}: {}\n", Utc::now().to_rfc3339(), agent, message);
        if let Err(e) = self.append_text("actions.log", &line) {
            tracing::error!("Failed to log action for {}: {}", agent, e);
        }
        tracing::info!(client = %self.client_id, "{}: {}", agent, message);
    }

    /// Append an interpreter exchange to the reasoning log.
    pub fn log_reasoning(&self, input: &str, decision: &str, reasoning: &str) {
        let block = format!(
            "[{}] INPUT: {}\nDECISION: {}\nREASONING: {}\n\n",
            Utc::now().to_rfc3339(),
            input,
            decision,
            reasoning
        );
        if let Err(e) = self.append_text("gpt_reasons.log", &block) {
            tracing::error!("Failed to append reasoning log: {}", e);
        }
    }

    fn append_text(&self, name: &str, text: &str) -> Result<(), StoreError> {
        use std::io::Write;
        let path = self.doc_path(name);
        ensure_parent(&path)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::Io {
                path: path.clone(),
                source: e,
            })?;
        file.write_all(text.as_bytes())
            .map_err(|e| StoreError::Io { path, source: e })
    }
}

fn ensure_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// List client ids that currently have a directory under the data root.
pub fn list_clients(data_dir: &Path) -> Vec<String> {
    let clients_dir = data_dir.join("clients");
    let mut out = Vec::new();
    let entries = match std::fs::read_dir(&clients_dir) {
        Ok(e) => e,
        Err(_) => return out,
    };
    for entry in entries.flatten() {
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                out.push(name.to_string());
            }
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_missing_document_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::new(dir.path(), "acme");
        let leads: Vec<serde_json::Value> = store.read_json("leads.json");
        assert!(leads.is_empty());
    }

    #[test]
    fn read_corrupt_document_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::new(dir.path(), "acme");
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.doc_path("leads.json"), "{not json").unwrap();
        let leads: Vec<serde_json::Value> = store.read_json("leads.json");
        assert!(leads.is_empty());
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::new(dir.path(), "acme");
        store
            .write_json("leads.json", &vec![json!({"email": "a@b.com"})])
            .unwrap();
        let leads: Vec<serde_json::Value> = store.read_json("leads.json");
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0]["email"], "a@b.com");
    }

    #[test]
    fn action_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::new(dir.path(), "acme");
        store.log_action("Crm Agent", "Added new lead: a@b.com");
        store.log_action("Crm Agent", "Added new lead: c@d.com");
        let log = std::fs::read_to_string(store.doc_path("actions.log")).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.contains("Crm Agent: Added new lead: a@b.com"));
    }

    #[test]
    fn list_clients_returns_sorted_ids() {
        let dir = tempfile::tempdir().unwrap();
        for id in ["globex", "acme"] {
            ClientStore::new(dir.path(), id)
                .write_json("memory.json", &Vec::<MemoryEntry>::new())
                .unwrap();
        }
        assert_eq!(list_clients(dir.path()), vec!["acme", "globex"]);
    }
}
