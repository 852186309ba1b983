// huntwarden/src/npc/memory.rs
//
// Per-NPC conversation memory. Each NPC keeps a bounded ring of entries;
// the oldest are evicted once `capacity` is reached.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

pub const DEFAULT_CAPACITY: usize = 200;
pub const DEFAULT_RECENT:   usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MemoryEntry {
    pub memory:    String,
    pub timestamp: DateTime<Utc>,
}

pub struct MemoryService {
    capacity: usize,
    memories: DashMap<String, VecDeque<MemoryEntry>>,
}

impl MemoryService {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), memories: DashMap::new() }
    }

    pub fn store(&self, npc_id: &str, memory: impl Into<String>) {
        let mut ring = self.memories.entry(npc_id.to_string()).or_default();
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(MemoryEntry { memory: memory.into(), timestamp: Utc::now() });
    }

    /// The last `n` memories, oldest first.
    pub fn recent(&self, npc_id: &str, n: usize) -> Vec<String> {
        self.memories.get(npc_id)
            .map(|ring| {
                let skip = ring.len().saturating_sub(n);
                ring.iter().skip(skip).map(|e| e.memory.clone()).collect()
            })
            .unwrap_or_default()
    }

    pub fn entries(&self, npc_id: &str) -> Vec<MemoryEntry> {
        self.memories.get(npc_id)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn n_npcs(&self) -> usize { self.memories.len() }
}

impl Default for MemoryService {
    fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_returns_tail_in_order() {
        let m = MemoryService::default();
        for i in 0..8 {
            m.store("sphinx", format!("m{i}"));
        }
        assert_eq!(m.recent("sphinx", DEFAULT_RECENT), vec!["m3", "m4", "m5", "m6", "m7"]);
        assert_eq!(m.recent("sphinx", 50).len(), 8);
        assert!(m.recent("nobody", 5).is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let m = MemoryService::new(3);
        for i in 0..5 {
            m.store("owl", format!("m{i}"));
        }
        let all: Vec<String> = m.entries("owl").into_iter().map(|e| e.memory).collect();
        assert_eq!(all, vec!["m2", "m3", "m4"]);
        assert_eq!(m.n_npcs(), 1);
    }
}
