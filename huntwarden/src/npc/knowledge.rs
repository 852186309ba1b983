// huntwarden/src/npc/knowledge.rs
//
// Domain → facts store shared by every NPC.

use std::collections::BTreeMap;

use parking_lot::RwLock;

#[derive(Default)]
pub struct KnowledgeBase {
    facts: RwLock<BTreeMap<String, Vec<String>>>,
}

impl KnowledgeBase {
    pub fn new() -> Self { Self::default() }

    pub fn add(&self, domain: &str, facts: impl IntoIterator<Item = String>) -> usize {
        let mut map = self.facts.write();
        let entry = map.entry(domain.to_string()).or_default();
        entry.extend(facts);
        entry.len()
    }

    pub fn get(&self, domain: &str) -> Vec<String> {
        self.facts.read().get(domain).cloned().unwrap_or_default()
    }

    /// Case-insensitive substring match across every domain, in domain order.
    pub fn search(&self, query: &str) -> Vec<String> {
        let q = query.to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        self.facts.read().values()
            .flatten()
            .filter(|f| f.to_lowercase().contains(&q))
            .cloned()
            .collect()
    }

    /// Facts sharing at least one word of four or more letters with `text`.
    pub fn relevant(&self, text: &str, limit: usize) -> Vec<String> {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 4)
            .map(str::to_lowercase)
            .collect();
        if words.is_empty() {
            return Vec::new();
        }
        self.facts.read().values()
            .flatten()
            .filter(|f| {
                let lf = f.to_lowercase();
                words.iter().any(|w| lf.contains(w.as_str()))
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn n_domains(&self) -> usize { self.facts.read().len() }
}
