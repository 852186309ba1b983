// huntwarden/src/clue/narrative.rs
//
// Story arcs and difficulty adjustment.
//
// A narrative is one chapter per hunt location, staged
// introduction → rising_action → climax → resolution. Chapter texts are
// requested concurrently; each falls back to a stage template on its own.
//
// Difficulty adjustment is rule-based (success rate, solving time, trend)
// and asks the LLM only for the wording of the suggestion.

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::clue::generator::ClueGenerator;
use crate::clue::llm::Completion;
use crate::clue::prompt;
use crate::clue::scoring::ideal_difficulty;
use crate::clue::text::normalize;
use crate::clue::types::PlayerProfile;
use crate::geo::round4;
use crate::otel::HuntwardenMetrics;

const MAX_CHAPTER_LENGTH: usize = 600;

// ── Narrative ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NarrativeProfile {
    pub archetype:       Option<String>,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NarrativeRequest {
    pub hunt_id:        String,
    #[serde(default)]
    pub theme:          Option<String>,
    #[serde(default)]
    pub locations:      Vec<String>,
    #[serde(default)]
    pub story_elements: Vec<String>,
    #[serde(default)]
    pub player_profile: NarrativeProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub index:    usize,
    pub location: String,
    pub stage:    &'static str,
    pub text:     String,
    pub source:   String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Narrative {
    pub hunt_id:     String,
    pub title:       String,
    pub theme:       String,
    pub protagonist: String,
    pub companion:   &'static str,
    pub chapters:    Vec<Chapter>,
}

pub fn stage(index: usize, total: usize) -> &'static str {
    if index == 0 {
        "introduction"
    } else if index + 1 == total {
        "resolution"
    } else if total >= 4 && index + 2 == total {
        "climax"
    } else {
        "rising_action"
    }
}

/// NPC role that accompanies the player at this point of the hunt.
fn companion(completion_rate: f64) -> &'static str {
    if completion_rate < 0.3 {
        "mentor"
    } else if completion_rate < 0.7 {
        "companion"
    } else {
        "final_adversary"
    }
}

fn chapter_template(stage: &str, theme: &str, location: &str) -> String {
    match stage {
        "introduction" => format!(
            "Your {theme} journey begins at {location}. A weathered note hints that something was hidden here long ago."
        ),
        "climax" => format!(
            "At {location} every {theme} thread comes together. One last riddle stands between you and the prize."
        ),
        "resolution" => format!(
            "At {location} the {theme} mystery finally gives up its secret, and the treasure is yours."
        ),
        _ => format!(
            "The trail leads on to {location}. New {theme} signs suggest you are not the only one searching."
        ),
    }
}

fn title_case(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(first) => first.to_uppercase().chain(c).collect(),
        None        => String::new(),
    }
}

impl ClueGenerator {
    pub async fn build_narrative(&self, req: &NarrativeRequest) -> Narrative {
        let theme = req.theme.clone()
            .or_else(|| req.story_elements.first().cloned())
            .unwrap_or_else(|| "adventure".into());
        let locations = if req.locations.is_empty() {
            vec!["the starting point".to_string()]
        } else {
            req.locations.clone()
        };
        let total = locations.len();

        let mut set = JoinSet::new();
        for (i, location) in locations.iter().enumerate() {
            let stage = stage(i, total);
            let p = prompt::chapter_prompt(&theme, i + 1, total, stage, location, &req.story_elements);
            let completion = Completion::new(p, &self.llm).with_system(prompt::NARRATIVE_SYSTEM);
            let provider = self.providers.openai.clone();
            set.spawn(async move { (i, provider.name(), provider.complete(&completion).await) });
        }

        let mut texts: Vec<Option<(String, &'static str)>> = vec![None; total];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((i, source, Ok(text))) => texts[i] = Some((normalize(&text, Some(MAX_CHAPTER_LENGTH)), source)),
                Ok((_, source, Err(e))) => {
                    HuntwardenMetrics::incr(&self.metrics().llm_failures);
                    warn!(provider = source, "chapter generation failed: {}", e);
                }
                Err(e) => warn!("chapter task aborted: {}", e),
            }
        }

        let chapters: Vec<Chapter> = locations.into_iter().zip(texts).enumerate()
            .map(|(i, (location, text))| {
                let stage = stage(i, total);
                let (text, source) = text
                    .unwrap_or_else(|| (chapter_template(stage, &theme, &location), "template"));
                Chapter { index: i + 1, location, stage, text, source: source.to_string() }
            })
            .collect();

        info!(hunt_id = %req.hunt_id, chapters = chapters.len(), "narrative built");
        Narrative {
            hunt_id:     req.hunt_id.clone(),
            title:       format!("The {} of {}", title_case(&theme), chapters[0].location),
            protagonist: req.player_profile.archetype.clone().unwrap_or_else(|| "Adventurer".into()),
            companion:   companion(req.player_profile.completion_rate),
            theme,
            chapters,
        }
    }
}

// ── Difficulty adjustment ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DifficultyRequest {
    pub player_level:       u32,
    pub success_rate:       f64,
    #[serde(default = "default_solving_time")]
    pub avg_solving_time:   f64,
    #[serde(default = "default_trend")]
    pub recent_trend:       String,
    #[serde(default = "default_difficulty")]
    pub current_difficulty: f64,
    #[serde(default)]
    pub game_context:       Option<String>,
}

fn default_solving_time() -> f64 { 180.0 }
fn default_trend() -> String { "stable".into() }
fn default_difficulty() -> f64 { 0.5 }

#[derive(Debug, Clone, Serialize)]
pub struct DifficultyAdjustment {
    pub current_difficulty:     f64,
    pub recommended_difficulty: f64,
    pub ideal_difficulty:       f64,
    pub adjustment:             f64,
    pub direction:              &'static str,
    pub reasons:                Vec<String>,
    pub suggestion:             String,
    pub source:                 String,
}

/// Rule-based step: fast, accurate players go up; struggling players go down.
pub fn recommend(req: &DifficultyRequest) -> (f64, Vec<String>) {
    let mut delta = 0.0;
    let mut reasons = Vec::new();
    if req.success_rate > 0.8 && req.avg_solving_time < 120.0 {
        delta += 0.1;
        reasons.push("high_success_fast_solves".to_string());
    }
    if req.success_rate < 0.4 {
        delta -= 0.1;
        reasons.push("low_success_rate".to_string());
    } else if req.avg_solving_time > 300.0 {
        delta -= 0.1;
        reasons.push("slow_solving_times".to_string());
    }
    match req.recent_trend.as_str() {
        "improving" => { delta += 0.05; reasons.push("improving_trend".to_string()); }
        "declining" => { delta -= 0.05; reasons.push("declining_trend".to_string()); }
        _ => {}
    }
    (round4((req.current_difficulty + delta).clamp(0.1, 0.9)), reasons)
}

impl ClueGenerator {
    pub async fn adjust_difficulty(&self, req: &DifficultyRequest) -> DifficultyAdjustment {
        let (recommended, reasons) = recommend(req);
        let adjustment = round4(recommended - req.current_difficulty);
        let direction = if adjustment > 0.0 {
            "increase"
        } else if adjustment < 0.0 {
            "decrease"
        } else {
            "maintain"
        };

        let player = PlayerProfile {
            success_rate: req.success_rate,
            ..PlayerProfile::from_request(req.player_level, None)
        };

        let p = prompt::difficulty_prompt(
            req.player_level,
            req.success_rate,
            req.avg_solving_time,
            &req.recent_trend,
            req.current_difficulty,
            req.game_context.as_deref().unwrap_or("treasure hunt"),
        );
        let (suggestion, source) = match self.providers.openai.complete(&Completion::new(p, &self.llm)).await {
            Ok(text) => (normalize(&text, Some(self.cfg.max_clue_length)), self.providers.openai.name()),
            Err(e) => {
                HuntwardenMetrics::incr(&self.metrics().llm_failures);
                warn!("difficulty suggestion failed: {}", e);
                (format!("{} difficulty to {:.2} for level {}.", title_case(direction), recommended, req.player_level),
                 "template")
            }
        };

        DifficultyAdjustment {
            current_difficulty:     req.current_difficulty,
            recommended_difficulty: recommended,
            ideal_difficulty:       round4(ideal_difficulty(&player)),
            adjustment,
            direction,
            reasons,
            suggestion,
            source:                 source.to_string(),
        }
    }
}
