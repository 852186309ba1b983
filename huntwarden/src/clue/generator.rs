// huntwarden/src/clue/generator.rs
//
// Contextual clue generation pipeline:
//
//   1. cache lookup            clue:md5(lat_lon_level_theme)
//   2. location analysis       landmarks / history / culture / features
//   3. clue-type selection     level bands, then learning style
//   4. variant fan-out         OpenAI × num_variants (riddle, puzzle, cryptographic)
//                              + Gemini (puzzle); all in flight at once
//   5. scoring + selection     highest quality wins; fallback text if none
//   6. integrity proof         sha256 hash + HMAC + location commitment
//   7. cache store             SETEX CACHE_TTL
//
// Provider and cache failures are logged and skipped, so generation itself
// never fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::clue::cache::{cache_key, ClueCache};
use crate::clue::llm::{Completion, Providers};
use crate::clue::prompt::{self, ClueContext};
use crate::clue::text::normalize;
use crate::clue::types::{ClueRequest, ClueType, GeneratedClue, LocationAnalysis, PlayerProfile};
use crate::clue::{proof, scoring};
use crate::config::{ClueConfig, LlmConfig};
use crate::geo::round4;
use crate::otel::HuntwardenMetrics;

const FALLBACK_DIFFICULTY: f64 = 0.3;
const MAX_TEMPERATURE:     f32 = 1.0;

#[derive(Debug, Clone)]
struct Variant {
    text:   String,
    source: &'static str,
    model:  String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClueStats {
    pub total_generations: u64,
    pub cache_hits:        u64,
    pub cache_hit_rate:    f64,
    pub average_quality:   f64,
    pub most_common_type:  Option<ClueType>,
    pub cache_backend:     &'static str,
}

pub struct ClueGenerator {
    pub(crate) providers: Providers,
    pub(crate) llm:       LlmConfig,
    pub(crate) cfg:       ClueConfig,
    cache:                Arc<dyn ClueCache>,
    metrics:              Arc<HuntwardenMetrics>,
    quality:              Mutex<(f64, u64)>,
    type_counts:          Mutex<HashMap<ClueType, u64>>,
}

impl ClueGenerator {
    pub fn new(
        providers: Providers,
        cache:     Arc<dyn ClueCache>,
        llm:       LlmConfig,
        cfg:       ClueConfig,
        metrics:   Arc<HuntwardenMetrics>,
    ) -> Self {
        Self {
            providers,
            llm,
            cfg,
            cache,
            metrics,
            quality:     Mutex::new((0.0, 0)),
            type_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn secret(&self) -> &str { &self.cfg.clue_secret_key }

    pub(crate) fn metrics(&self) -> &HuntwardenMetrics { &self.metrics }

    pub async fn generate(&self, req: &ClueRequest) -> GeneratedClue {
        HuntwardenMetrics::incr(&self.metrics.clue_generations);
        let loc = &req.location_data;
        let key = cache_key(loc.lat, loc.lon, req.player_level, &req.hunt_theme);

        match self.cache.get(&key).await {
            Ok(Some(hit)) => {
                HuntwardenMetrics::incr(&self.metrics.clue_cache_hits);
                info!(key = %key, "clue cache hit");
                return hit;
            }
            Ok(None) => {}
            Err(e) => warn!(backend = self.cache.backend(), "clue cache read failed: {}", e),
        }

        let player    = PlayerProfile::from_request(req.player_level, req.player_profile.as_ref());
        let analysis  = LocationAnalysis::of(loc);
        let clue_type = ClueType::select(&player);
        let ctx = ClueContext {
            theme:          &req.hunt_theme,
            difficulty:     &req.difficulty,
            previous_clues: &req.previous_clues,
            max_length:     self.cfg.max_clue_length,
        };
        let prompt = prompt::clue_prompt(clue_type, loc, &analysis, &player, &ctx);

        let variants = self.variants(clue_type, &prompt).await;
        let mut best = self.select(clue_type, variants, &player, req);

        let ts = Utc::now().to_rfc3339();
        best.crypto_proof = Some(proof::sign(&best.text, loc, &ts, &self.cfg.clue_secret_key));
        best.generation_timestamp = ts;

        if let Err(e) = self.cache.set(&key, &best, Duration::from_secs(self.cfg.cache_ttl_secs)).await {
            warn!(backend = self.cache.backend(), "clue cache write failed: {}", e);
        }
        self.record(&best);

        info!(
            clue_type = %best.clue_type,
            source    = %best.source,
            quality   = best.quality_score,
            "clue generated"
        );
        best
    }

    async fn variants(&self, clue_type: ClueType, prompt: &str) -> Vec<Variant> {
        let mut set = JoinSet::new();

        if matches!(clue_type, ClueType::Riddle | ClueType::Puzzle | ClueType::Cryptographic) {
            for i in 0..self.cfg.num_variants {
                let temp = (self.llm.temperature + 0.1 * i as f32).min(MAX_TEMPERATURE);
                let req = Completion::new(prompt, &self.llm)
                    .with_system(prompt::CLUE_SYSTEM)
                    .with_temperature(temp);
                let provider = self.providers.openai.clone();
                let model = self.llm.openai_model.clone();
                set.spawn(async move {
                    (provider.name(), model, provider.complete(&req).await)
                });
            }
        }
        if clue_type == ClueType::Puzzle {
            let req = Completion::new(prompt, &self.llm).with_system(prompt::CLUE_SYSTEM);
            let provider = self.providers.gemini.clone();
            let model = self.llm.gemini_model.clone();
            set.spawn(async move {
                (provider.name(), model, provider.complete(&req).await)
            });
        }

        let mut out = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((source, model, Ok(text))) => out.push(Variant {
                    text: normalize(&text, Some(self.cfg.max_clue_length)),
                    source,
                    model,
                }),
                Ok((source, _, Err(e))) => {
                    HuntwardenMetrics::incr(&self.metrics.llm_failures);
                    warn!(provider = source, "clue variant failed: {}", e);
                }
                Err(e) => warn!("clue variant task aborted: {}", e),
            }
        }
        out
    }

    fn select(&self, clue_type: ClueType, variants: Vec<Variant>, player: &PlayerProfile, req: &ClueRequest) -> GeneratedClue {
        let mut scored = variants.into_iter().map(|v| {
            let difficulty = scoring::estimate_difficulty(&v.text, player.level);
            self.scored(clue_type, v.text, v.source, v.model, difficulty, player, req)
        });
        let first = scored.next().unwrap_or_else(|| {
            let text = clue_type.fallback_text().to_string();
            self.scored(clue_type, text, "fallback", "template".into(), FALLBACK_DIFFICULTY, player, req)
        });
        let best = scored.fold(first, |best, c| if c.quality_score > best.quality_score { c } else { best });

        if best.quality_score < self.cfg.min_clue_quality {
            warn!(quality = best.quality_score, min = self.cfg.min_clue_quality, "best clue variant below quality floor");
        }
        best
    }

    #[allow(clippy::too_many_arguments)]
    fn scored(
        &self,
        clue_type:  ClueType,
        text:       String,
        source:     &str,
        model:      String,
        difficulty: f64,
        player:     &PlayerProfile,
        req:        &ClueRequest,
    ) -> GeneratedClue {
        let quality = scoring::quality(&text, difficulty, player, &req.previous_clues);
        GeneratedClue {
            length:               text.chars().count(),
            text,
            clue_type,
            source:               source.to_string(),
            difficulty:           round4(difficulty),
            quality_score:        round4(quality),
            generation_timestamp: String::new(),
            model_used:           model,
            crypto_proof:         None,
        }
    }

    fn record(&self, clue: &GeneratedClue) {
        {
            let mut q = self.quality.lock();
            q.0 += clue.quality_score;
            q.1 += 1;
        }
        *self.type_counts.lock().entry(clue.clue_type).or_insert(0) += 1;
    }

    pub fn stats(&self) -> ClueStats {
        let requests = HuntwardenMetrics::get(&self.metrics.clue_generations);
        let hits     = HuntwardenMetrics::get(&self.metrics.clue_cache_hits);
        let (q_sum, q_n) = *self.quality.lock();
        let most_common_type = self.type_counts.lock().iter()
            .max_by_key(|(_, n)| **n)
            .map(|(t, _)| *t);
        ClueStats {
            total_generations: requests.saturating_sub(hits),
            cache_hits:        hits,
            cache_hit_rate:    round4(self.metrics.cache_hit_rate()),
            average_quality:   if q_n > 0 { round4(q_sum / q_n as f64) } else { 0.0 },
            most_common_type,
            cache_backend:     self.cache.backend(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clue::cache::MemoryCache;
    use crate::clue::llm::testing::{offline, StaticProvider};
    use crate::clue::types::{ClueLocation, PreviousClue};

    fn generator(providers: Providers) -> ClueGenerator {
        ClueGenerator::new(
            providers,
            Arc::new(MemoryCache::new()),
            LlmConfig::default(),
            ClueConfig::default(),
            HuntwardenMetrics::new(),
        )
    }

    fn request(level: u32) -> ClueRequest {
        ClueRequest {
            hunt_theme:     "pirates".into(),
            difficulty:     "medium".into(),
            player_level:   level,
            location_data:  ClueLocation {
                lat: 40.7128, lon: -74.006, name: Some("Battery Park".into()),
                landmarks: vec!["castle".into()], ..Default::default()
            },
            previous_clues: vec![PreviousClue { text: "Seek the old cannon".into() }],
            player_profile: None,
        }
    }

    #[tokio::test]
    async fn offline_providers_fall_back_and_sign() {
        let g = generator(offline());
        let clue = g.generate(&request(1)).await;
        assert_eq!(clue.clue_type, ClueType::Riddle);
        assert_eq!(clue.source, "fallback");
        assert_eq!(clue.text, ClueType::Riddle.fallback_text());
        assert_eq!(clue.difficulty, FALLBACK_DIFFICULTY);
        let p = clue.crypto_proof.as_ref().unwrap();
        assert!(proof::verify_clue(&clue.text, &request(1).location_data, p, g.secret()));
        assert_eq!(HuntwardenMetrics::get(&g.metrics.llm_failures), 3);
    }

    #[tokio::test]
    async fn second_request_is_a_cache_hit() {
        let g = generator(offline());
        let first = g.generate(&request(1)).await;
        let second = g.generate(&request(1)).await;
        assert_eq!(first, second);

        let stats = g.stats();
        assert_eq!(stats.total_generations, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_hit_rate, 0.5);
        assert_eq!(stats.most_common_type, Some(ClueType::Riddle));
        assert_eq!(stats.cache_backend, "memory");
    }

    #[tokio::test]
    async fn puzzles_fan_out_to_both_providers() {
        let openai = StaticProvider::ok("openai", "Find the hidden   anchor where gulls gather?");
        let gemini = StaticProvider::ok("gemini", "Count the windows.");
        let g = generator(Providers { openai: openai.clone(), gemini: gemini.clone() });

        let clue = g.generate(&request(4)).await;
        assert_eq!(clue.clue_type, ClueType::Puzzle);
        assert_eq!(openai.calls(), 3);
        assert_eq!(gemini.calls(), 1);
        // Questions, mystery and exploration vocabulary beat the plain variant.
        assert_eq!(clue.source, "openai");
        assert_eq!(clue.text, "Find the hidden anchor where gulls gather?");
        assert_eq!(clue.model_used, "gpt-4");
    }

    #[tokio::test]
    async fn visual_clues_skip_providers() {
        let openai = StaticProvider::ok("openai", "unused");
        let g = generator(Providers { openai: openai.clone(), gemini: StaticProvider::failing("gemini") });
        let clue = g.generate(&request(8)).await;
        assert_eq!(clue.clue_type, ClueType::Visual);
        assert_eq!(openai.calls(), 0);
        assert_eq!(clue.source, "fallback");
    }

    #[tokio::test]
    async fn long_variants_are_truncated() {
        let long = "explore ".repeat(100);
        let g = generator(Providers {
            openai: StaticProvider::ok("openai", &long),
            gemini: StaticProvider::failing("gemini"),
        });
        let clue = g.generate(&request(1)).await;
        assert_eq!(clue.length, ClueConfig::default().max_clue_length);
        assert!(clue.text.ends_with("..."));
    }
}
