//! Bounded conversation memory.
//!
//! One `memory.json` per client: an ordered sequence of role-tagged entries
//! capped at [`MAX_MEMORY`]. Saving trims from the front, so the oldest
//! entries are evicted first.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ClientStore;

/// Cap on stored entries; older entries are dropped first.
pub const MAX_MEMORY: usize = 100;

/// Speaker of a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversational exchange half.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl MemoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl ClientStore {
    /// Load the memory log, trimmed to the newest [`MAX_MEMORY`] entries.
    pub fn load_memory(&self) -> Vec<MemoryEntry> {
        let mut entries: Vec<MemoryEntry> = self.read_json("memory.json");
        if entries.len() > MAX_MEMORY {
            entries.drain(..entries.len() - MAX_MEMORY);
        }
        entries
    }

    /// Persist the memory log, enforcing the cap.
    pub fn save_memory(&self, mut entries: Vec<MemoryEntry>) {
        if entries.len() > MAX_MEMORY {
            entries.drain(..entries.len() - MAX_MEMORY);
        }
        if let Err(e) = self.write_json("memory.json", &entries) {
            tracing::error!("Failed to save memory for {}: {}", self.client_id(), e);
        }
    }

    /// Append one entry and persist.
    pub fn append_memory(&self, role: Role, content: impl Into<String>) {
        let mut entries = self.load_memory();
        entries.push(MemoryEntry::new(role, content));
        self.save_memory(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::new(dir.path(), "acme");
        store.append_memory(Role::User, "hello");
        store.append_memory(Role::Assistant, "hi there");
        let entries = store.load_memory();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[1].content, "hi there");
    }

    #[test]
    fn memory_never_exceeds_cap() {
        let dir = tempfile::tempdir().unwrap();
        let store = ClientStore::new(dir.path(), "acme");
        let entries: Vec<MemoryEntry> = (0..MAX_MEMORY)
            .map(|i| MemoryEntry::new(Role::User, format!("entry {}", i)))
            .collect();
        store.save_memory(entries);

        // Entry 101 evicts entry 0.
        store.append_memory(Role::User, "entry 100");
        let entries = store.load_memory();
        assert_eq!(entries.len(), MAX_MEMORY);
        assert_eq!(entries[0].content, "entry 1");
        assert_eq!(entries.last().unwrap().content, "entry 100");
    }
}
