// huntwarden/src/clue/puzzle.rs
//
// Standalone puzzle generation. Gemini is asked first at low temperature,
// OpenAI second; a per-type template covers both failing. The puzzle text is
// signed the same way clues are.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clue::generator::ClueGenerator;
use crate::clue::llm::Completion;
use crate::clue::proof;
use crate::clue::prompt;
use crate::clue::text::normalize;
use crate::clue::types::{ClueLocation, CryptoProof};
use crate::otel::HuntwardenMetrics;

const PUZZLE_TEMPERATURE: f32 = 0.3;
const MAX_PUZZLE_LENGTH:  usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct PuzzleRequest {
    pub puzzle_type:      String,
    pub complexity:       String,
    pub theme:            String,
    #[serde(default)]
    pub location_context: ClueLocation,
}

#[derive(Debug, Clone, Serialize)]
pub struct Puzzle {
    pub puzzle:               String,
    pub puzzle_type:          String,
    pub complexity:           String,
    pub difficulty:           f64,
    pub solution_hint:        String,
    pub source:               String,
    pub generation_timestamp: String,
    pub crypto_proof:         CryptoProof,
}

pub fn complexity_level(complexity: &str) -> f64 {
    match complexity.to_ascii_lowercase().as_str() {
        "easy" | "low"      => 0.3,
        "hard" | "high"     => 0.8,
        "expert" | "extreme" => 0.9,
        _                   => 0.5,
    }
}

fn template(puzzle_type: &str, theme: &str, place: &str) -> String {
    match puzzle_type {
        "logical" => format!(
            "Three {theme} explorers reached {place} before you. The first never lies, the second \
             always lies, and the third alternates. Ask one question to learn which path hides the treasure."
        ),
        "mathematical" => format!(
            "At {place}, count the steps on the main approach, multiply by the number of doors you can \
             see, and walk that many paces north to continue your {theme} quest."
        ),
        "pattern" => format!(
            "The markers around {place} repeat a sequence: circle, square, triangle, circle, square... \
             Find the next shape carved into stone to reveal the {theme} path."
        ),
        "cipher" | "cryptographic" => format!(
            "A {theme} message is painted near {place}: each letter is shifted three places forward. \
             Decode it to learn where to search next."
        ),
        _ => format!(
            "Explore {place} and find the object that does not belong with the {theme} story around it."
        ),
    }
}

fn solution_hint(puzzle_type: &str) -> &'static str {
    match puzzle_type {
        "logical"                  => "Ask what another explorer would say, then choose the opposite.",
        "mathematical"             => "Count carefully; only doors facing the square matter.",
        "pattern"                  => "The sequence cycles every three symbols.",
        "cipher" | "cryptographic" => "Shift each letter three places back.",
        _                          => "Compare every object with the theme.",
    }
}

impl ClueGenerator {
    pub async fn generate_puzzle(&self, req: &PuzzleRequest) -> Puzzle {
        let puzzle_type = req.puzzle_type.to_ascii_lowercase();
        let prompt = prompt::puzzle_prompt(&puzzle_type, &req.complexity, &req.theme, &req.location_context);
        let completion = Completion::new(prompt, &self.llm)
            .with_system(prompt::PUZZLE_SYSTEM)
            .with_temperature(PUZZLE_TEMPERATURE);

        let mut text = None;
        for provider in [&self.providers.gemini, &self.providers.openai] {
            match provider.complete(&completion).await {
                Ok(t) => {
                    text = Some((normalize(&t, Some(MAX_PUZZLE_LENGTH)), provider.name()));
                    break;
                }
                Err(e) => {
                    HuntwardenMetrics::incr(&self.metrics().llm_failures);
                    warn!(provider = provider.name(), "puzzle generation failed: {}", e);
                }
            }
        }
        let (puzzle, source) = text.unwrap_or_else(|| {
            let place = req.location_context.display_name();
            (template(&puzzle_type, &req.theme, place), "template")
        });

        let ts = Utc::now().to_rfc3339();
        let crypto_proof = proof::sign(&puzzle, &req.location_context, &ts, self.secret());
        info!(puzzle_type = %puzzle_type, source, "puzzle generated");

        Puzzle {
            puzzle,
            solution_hint:        solution_hint(&puzzle_type).to_string(),
            difficulty:           complexity_level(&req.complexity),
            complexity:           req.complexity.clone(),
            puzzle_type,
            source:               source.to_string(),
            generation_timestamp: ts,
            crypto_proof,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::clue::cache::MemoryCache;
    use crate::clue::llm::testing::{offline, StaticProvider};
    use crate::clue::llm::Providers;
    use crate::config::{ClueConfig, LlmConfig};

    fn generator(providers: Providers) -> ClueGenerator {
        ClueGenerator::new(providers, Arc::new(MemoryCache::new()),
                           LlmConfig::default(), ClueConfig::default(), HuntwardenMetrics::new())
    }

    fn request(kind: &str) -> PuzzleRequest {
        PuzzleRequest {
            puzzle_type:      kind.into(),
            complexity:       "hard".into(),
            theme:            "egyptian".into(),
            location_context: ClueLocation { name: Some("Obelisk".into()), ..Default::default() },
        }
    }

    #[tokio::test]
    async fn gemini_answers_first() {
        let gemini = StaticProvider::ok("gemini", "Which shadow is longest at noon?");
        let openai = StaticProvider::ok("openai", "unused");
        let g = generator(Providers { openai: openai.clone(), gemini });
        let p = g.generate_puzzle(&request("logical")).await;
        assert_eq!(p.source, "gemini");
        assert_eq!(p.difficulty, 0.8);
        assert_eq!(openai.calls(), 0);
        assert!(proof::verify(&p.crypto_proof, g.secret()));
    }

    #[tokio::test]
    async fn openai_is_second_choice() {
        let g = generator(Providers {
            openai: StaticProvider::ok("openai", "Sum the carved numbers."),
            gemini: StaticProvider::failing("gemini"),
        });
        let p = g.generate_puzzle(&request("mathematical")).await;
        assert_eq!(p.source, "openai");
        assert_eq!(p.puzzle, "Sum the carved numbers.");
    }

    #[tokio::test]
    async fn template_when_offline() {
        let p = generator(offline()).generate_puzzle(&request("Cipher")).await;
        assert_eq!(p.source, "template");
        assert_eq!(p.puzzle_type, "cipher");
        assert!(p.puzzle.contains("Obelisk"));
        assert_eq!(p.solution_hint, "Shift each letter three places back.");
    }
}
