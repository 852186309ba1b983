// huntwarden/src/clue/types.rs
//
// Request and result types for clue generation, plus the two pieces of
// request analysis that happen before any prompt is built: location context
// and clue-type selection.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Request ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClueLocation {
    pub lat:           f64,
    pub lon:           f64,
    pub name:          Option<String>,
    pub landmarks:     Vec<String>,
    pub history:       Option<String>,
    pub culture:       Option<String>,
    pub features:      Vec<String>,
    pub accessibility: Option<String>,
}

impl ClueLocation {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("this location")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviousClue {
    pub text: String,
}

/// Optional player overrides sent with a clue request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileHints {
    pub success_rate:         Option<f64>,
    pub preferred_clue_types: Vec<ClueType>,
    pub learning_style:       Option<String>,
    pub cultural_context:     Option<String>,
    pub avg_solving_time:     Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClueRequest {
    pub hunt_theme:     String,
    pub difficulty:     String,
    pub player_level:   u32,
    pub location_data:  ClueLocation,
    #[serde(default)]
    pub previous_clues: Vec<PreviousClue>,
    #[serde(default)]
    pub player_profile: Option<ProfileHints>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub level:                u32,
    pub success_rate:         f64,
    pub preferred_clue_types: Vec<ClueType>,
    pub learning_style:       String,
    pub cultural_context:     String,
    pub avg_solving_time:     f64,
}

impl PlayerProfile {
    pub fn from_request(level: u32, hints: Option<&ProfileHints>) -> Self {
        let hints = hints.cloned().unwrap_or_default();
        Self {
            level,
            success_rate:         hints.success_rate.unwrap_or(0.5),
            preferred_clue_types: hints.preferred_clue_types,
            learning_style:       hints.learning_style.unwrap_or_else(|| "visual".into()),
            cultural_context:     hints.cultural_context.unwrap_or_else(|| "neutral".into()),
            avg_solving_time:     hints.avg_solving_time.unwrap_or(180.0),
        }
    }
}

// ── Clue types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueType {
    Riddle,
    Puzzle,
    Visual,
    Audio,
    AugmentedReality,
    Cryptographic,
}

impl fmt::Display for ClueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ClueType::Riddle           => "riddle",
            ClueType::Puzzle           => "puzzle",
            ClueType::Visual           => "visual",
            ClueType::Audio            => "audio",
            ClueType::AugmentedReality => "augmented_reality",
            ClueType::Cryptographic    => "cryptographic",
        };
        write!(f, "{}", s)
    }
}

impl ClueType {
    /// Beginners get riddles, mid levels puzzles, then learning style decides.
    pub fn select(player: &PlayerProfile) -> Self {
        if player.level < 3 {
            ClueType::Riddle
        } else if player.level < 6 {
            ClueType::Puzzle
        } else {
            match player.learning_style.as_str() {
                "visual"   => ClueType::Visual,
                "auditory" => ClueType::Audio,
                _          => ClueType::Puzzle,
            }
        }
    }

    /// Deterministic clue used when no provider returns a variant.
    pub fn fallback_text(&self) -> &'static str {
        match self {
            ClueType::Riddle           => "Look for the ancient marker where shadows meet light.",
            ClueType::Puzzle           => "Solve the pattern: follow the path less traveled.",
            ClueType::Visual           => "Find the symbol that points to hidden treasures.",
            ClueType::Audio            => "Listen for the echoes of forgotten stories.",
            ClueType::AugmentedReality => "Reveal what's hidden in plain sight.",
            ClueType::Cryptographic    => "Decode the message in the stones.",
        }
    }
}

// ── Location analysis ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LocationAnalysis {
    pub landmarks:               Vec<String>,
    pub historical_significance: String,
    pub cultural_elements:       String,
    pub natural_features:        Vec<String>,
    pub accessibility:           String,
    pub complexity:              f64,
}

impl LocationAnalysis {
    pub fn of(loc: &ClueLocation) -> Self {
        let landmarks = if loc.landmarks.is_empty() {
            vec!["unknown".to_string()]
        } else {
            loc.landmarks.clone()
        };

        // Mean of the signals the location actually carries.
        let signals = [
            (!loc.landmarks.is_empty()).then(|| (loc.landmarks.len() as f64 / 5.0).min(1.0)),
            (!loc.features.is_empty()).then(|| (loc.features.len() as f64 / 5.0).min(1.0)),
            loc.history.as_ref().filter(|h| !h.is_empty()).map(|_| 0.8),
            loc.culture.as_ref().filter(|c| !c.is_empty()).map(|_| 0.6),
        ];
        let present: Vec<f64> = signals.into_iter().flatten().collect();
        let complexity = if present.is_empty() {
            0.1
        } else {
            (present.iter().sum::<f64>() / present.len() as f64).clamp(0.1, 1.0)
        };

        Self {
            landmarks,
            historical_significance: loc.history.clone()
                .unwrap_or_else(|| "No historical data available".into()),
            cultural_elements: loc.culture.clone()
                .unwrap_or_else(|| "General cultural context".into()),
            natural_features: loc.features.clone(),
            accessibility: loc.accessibility.clone().unwrap_or_else(|| "unknown".into()),
            complexity,
        }
    }
}

// ── Generated clue ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoProof {
    pub hash:                String,
    pub hmac:                String,
    pub timestamp:           String,
    pub location_commitment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedClue {
    pub text:                 String,
    pub clue_type:            ClueType,
    /// Provider that produced the winning variant: openai, gemini or fallback.
    pub source:               String,
    pub difficulty:           f64,
    pub length:               usize,
    pub quality_score:        f64,
    pub generation_timestamp: String,
    pub model_used:           String,
    pub crypto_proof:         Option<CryptoProof>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(level: u32, style: &str) -> PlayerProfile {
        PlayerProfile {
            learning_style: style.into(),
            ..PlayerProfile::from_request(level, None)
        }
    }

    #[test]
    fn profile_defaults() {
        let p = PlayerProfile::from_request(4, None);
        assert_eq!(p.success_rate, 0.5);
        assert_eq!(p.learning_style, "visual");
        assert_eq!(p.cultural_context, "neutral");
        assert_eq!(p.avg_solving_time, 180.0);
    }

    #[test]
    fn clue_type_selection() {
        assert_eq!(ClueType::select(&profile(1, "auditory")), ClueType::Riddle);
        assert_eq!(ClueType::select(&profile(5, "visual")), ClueType::Puzzle);
        assert_eq!(ClueType::select(&profile(8, "visual")), ClueType::Visual);
        assert_eq!(ClueType::select(&profile(8, "auditory")), ClueType::Audio);
        assert_eq!(ClueType::select(&profile(8, "kinesthetic")), ClueType::Puzzle);
    }

    #[test]
    fn empty_location_is_simple() {
        let a = LocationAnalysis::of(&ClueLocation::default());
        assert_eq!(a.landmarks, vec!["unknown"]);
        assert_eq!(a.complexity, 0.1);
    }

    #[test]
    fn rich_location_is_more_complex() {
        let loc = ClueLocation {
            landmarks: vec!["clock tower".into(), "fountain".into()],
            history:   Some("Founded 1820".into()),
            ..Default::default()
        };
        let a = LocationAnalysis::of(&loc);
        assert!((a.complexity - 0.6).abs() < 1e-9);
    }

    #[test]
    fn clue_type_serializes_snake_case() {
        let s = serde_json::to_string(&ClueType::AugmentedReality).unwrap();
        assert_eq!(s, "\"augmented_reality\"");
    }
}
