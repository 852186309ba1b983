// huntwarden/src/npc/mod.rs
//
// NPC guardians: in-character dialogue backed by per-NPC memory and a shared
// knowledge base.
//
// Each turn:
//   1. recall the NPC's last 5 memories and facts matching the message
//   2. build the persona prompt and ask the chat provider
//   3. on provider failure, answer with a deterministic in-character line
//   4. remember both sides of the exchange

pub mod knowledge;
pub mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clue::llm::{Completion, LlmProvider};
use crate::config::LlmConfig;
use crate::otel::HuntwardenMetrics;

pub use knowledge::KnowledgeBase;
pub use memory::{MemoryService, DEFAULT_RECENT};

const MAX_FACTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationRequest {
    pub player_id: String,
    pub message:   String,
    #[serde(default)]
    pub persona:   Option<String>,
    #[serde(default)]
    pub context:   Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationReply {
    pub npc_id:        String,
    pub response:      String,
    pub source:        String,
    pub memories_used: usize,
    pub facts_used:    Vec<String>,
}

pub struct NpcGuardian {
    pub memory:    MemoryService,
    pub knowledge: KnowledgeBase,
    provider:      Arc<dyn LlmProvider>,
    llm:           LlmConfig,
    metrics:       Arc<HuntwardenMetrics>,
}

pub fn persona_prompt(
    npc_id:   &str,
    persona:  &str,
    memories: &[String],
    facts:    &[String],
    req:      &ConversationRequest,
) -> String {
    let bullet = |items: &[String], empty: &str| {
        if items.is_empty() {
            format!("- {}", empty)
        } else {
            items.iter().map(|s| format!("- {}", s)).collect::<Vec<_>>().join("\n")
        }
    };
    format!(
        "You are {npc_id}, {persona}, guarding a treasure hunt checkpoint. Stay in character, \
         never reveal answers outright, and reply in at most three sentences.\n\
         \n\
         RECENT MEMORIES:\n{memories}\n\
         \n\
         WHAT YOU KNOW:\n{facts}\n\
         \n\
         CONTEXT: {context}\n\
         \n\
         Player {player} says: \"{message}\"",
        memories = bullet(memories, "You have not spoken with anyone yet."),
        facts    = bullet(facts, "Nothing specific."),
        context  = req.context.as_deref().unwrap_or("none"),
        player   = req.player_id,
        message  = req.message,
    )
}

/// In-character reply used when the chat provider is unavailable.
pub fn fallback_reply(npc_id: &str, facts: &[String]) -> String {
    match facts.first() {
        Some(fact) => format!("{npc_id} strokes its beard. \"They say this much: {fact}\""),
        None       => format!("{npc_id} regards you in silence. \"Seek further, traveller, and return when you know more.\""),
    }
}

impl NpcGuardian {
    pub fn new(provider: Arc<dyn LlmProvider>, llm: LlmConfig, metrics: Arc<HuntwardenMetrics>) -> Self {
        Self {
            memory:    MemoryService::default(),
            knowledge: KnowledgeBase::new(),
            provider,
            llm,
            metrics,
        }
    }

    pub async fn converse(&self, npc_id: &str, req: &ConversationRequest) -> ConversationReply {
        HuntwardenMetrics::incr(&self.metrics.npc_conversations);

        let memories = self.memory.recent(npc_id, DEFAULT_RECENT);
        let facts    = self.knowledge.relevant(&req.message, MAX_FACTS);
        let persona  = req.persona.as_deref().unwrap_or("an ancient guardian");
        let prompt   = persona_prompt(npc_id, persona, &memories, &facts, req);

        let (reply, source) = match self.provider.complete(&Completion::new(prompt, &self.llm)).await {
            Ok(text) => (text, self.provider.name()),
            Err(e) => {
                HuntwardenMetrics::incr(&self.metrics.llm_failures);
                warn!(npc_id, "npc dialogue fell back: {}", e);
                (fallback_reply(npc_id, &facts), "fallback")
            }
        };

        self.memory.store(npc_id, format!("{}: {}", req.player_id, req.message));
        self.memory.store(npc_id, format!("{}: {}", npc_id, reply));
        info!(npc_id, player_id = %req.player_id, source, "npc conversation turn");

        ConversationReply {
            npc_id:        npc_id.to_string(),
            response:      reply,
            source:        source.to_string(),
            memories_used: memories.len(),
            facts_used:    facts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clue::llm::testing::StaticProvider;

    fn request(msg: &str) -> ConversationRequest {
        ConversationRequest { player_id: "p1".into(), message: msg.into(), persona: None, context: None }
    }

    #[test]
    fn prompt_lists_memories_and_facts() {
        let p = persona_prompt("Sphinx", "a riddling sphinx",
                               &["p1: hello".to_string()], &[], &request("where is the key?"));
        assert!(p.starts_with("You are Sphinx, a riddling sphinx"));
        assert!(p.contains("RECENT MEMORIES:\n- p1: hello\n"));
        assert!(p.contains("WHAT YOU KNOW:\n- Nothing specific.\n"));
        assert!(p.ends_with("Player p1 says: \"where is the key?\""));
    }

    #[tokio::test]
    async fn fallback_reply_uses_knowledge_and_remembers_both_sides() {
        let npc = NpcGuardian::new(StaticProvider::failing("openai"), LlmConfig::default(), HuntwardenMetrics::new());
        npc.knowledge.add("temple", vec!["The temple key rests beneath the altar stone.".to_string()]);

        let r = npc.converse("Sphinx", &request("Where is the temple key?")).await;
        assert_eq!(r.source, "fallback");
        assert!(r.response.contains("beneath the altar stone"));
        assert_eq!(r.memories_used, 0);

        let mem = npc.memory.recent("Sphinx", 5);
        assert_eq!(mem.len(), 2);
        assert_eq!(mem[0], "p1: Where is the temple key?");
        assert!(mem[1].starts_with("Sphinx: "));
    }

    #[tokio::test]
    async fn provider_reply_is_used() {
        let npc = NpcGuardian::new(StaticProvider::ok("openai", "Answer my riddle first."),
                                   LlmConfig::default(), HuntwardenMetrics::new());
        npc.converse("Owl", &request("hi")).await;
        let r = npc.converse("Owl", &request("again")).await;
        assert_eq!(r.response, "Answer my riddle first.");
        assert_eq!(r.source, "openai");
        assert_eq!(r.memories_used, 2);
    }
}
