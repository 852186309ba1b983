// huntwarden/src/config.rs
//
// Runtime configuration groups. Every knob is a long flag with an environment
// variable fallback so the same binary runs under systemd, docker-compose or
// a bare shell:
//
//   OPENAI_API_KEY / GEMINI_API_KEY          LLM credentials (optional)
//   DEFAULT_OPENAI_MODEL / DEFAULT_GEMINI_MODEL
//   MAX_TOKENS / TEMPERATURE / REQUEST_TIMEOUT
//   CLUE_SECRET_KEY / CACHE_TTL / MAX_CLUE_LENGTH / MIN_CLUE_QUALITY
//   VERIFICATION_THRESHOLD / IMPOSSIBLE_SPEED_KMH / UNNATURAL_SPEED_MPS
//
// Redis settings live next to the persistence code in redis_state.rs.

use clap::Args;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLUE_SECRET: &str = "default-secret-key";

// ── Anti-cheat scoring ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Location confidence required to mark a fix verified.
    #[arg(long, env = "VERIFICATION_THRESHOLD", default_value_t = 0.7)]
    pub verification_threshold: f64,

    /// Teleport cutoff for fraud and plausibility checks.
    #[arg(long, env = "IMPOSSIBLE_SPEED_KMH", default_value_t = 500.0)]
    pub impossible_speed_kmh: f64,

    /// Per-segment cutoff for movement naturalness (≈180 km/h).
    #[arg(long, env = "UNNATURAL_SPEED_MPS", default_value_t = 50.0)]
    pub unnatural_speed_mps: f64,

    /// Daily multiplicative decay applied to a stored trust score.
    #[arg(long, env = "TRUST_DECAY", default_value_t = 0.95)]
    pub trust_decay: f64,

    /// Weight of the fresh score when blending with the decayed prior.
    #[arg(long, env = "TRUST_HISTORY_BLEND", default_value_t = 0.7)]
    pub history_blend: f64,

    /// Fraud risk above which a suspicious-activity record is written.
    #[arg(long, env = "SUSPICIOUS_RISK_THRESHOLD", default_value_t = 0.7)]
    pub suspicious_risk_threshold: f64,

    #[arg(long, default_value_t = 100)]
    pub forest_trees: usize,

    #[arg(long, default_value_t = 256)]
    pub forest_sample_size: usize,

    /// Seed for baseline synthesis and tree construction.
    #[arg(long, env = "MODEL_SEED", default_value_t = 42)]
    pub model_seed: u64,

    #[arg(long, default_value_t = 0.5)]
    pub cluster_eps: f64,

    #[arg(long, default_value_t = 5)]
    pub cluster_min_samples: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            verification_threshold:    0.7,
            impossible_speed_kmh:      500.0,
            unnatural_speed_mps:       50.0,
            trust_decay:               0.95,
            history_blend:             0.7,
            suspicious_risk_threshold: 0.7,
            forest_trees:              100,
            forest_sample_size:        256,
            model_seed:                42,
            cluster_eps:               0.5,
            cluster_min_samples:       5,
        }
    }
}

// ── LLM providers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct LlmConfig {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[arg(long, env = "GEMINI_BASE_URL",
          default_value = "https://generativelanguage.googleapis.com/v1beta")]
    pub gemini_base_url: String,

    #[arg(long, env = "DEFAULT_OPENAI_MODEL", default_value = "gpt-4")]
    pub openai_model: String,

    #[arg(long, env = "DEFAULT_GEMINI_MODEL", default_value = "gemini-pro")]
    pub gemini_model: String,

    #[arg(long, env = "MAX_TOKENS", default_value_t = 150)]
    pub max_tokens: u32,

    #[arg(long, env = "TEMPERATURE", default_value_t = 0.8)]
    pub temperature: f32,

    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key:       None,
            gemini_api_key:       None,
            openai_base_url:      "https://api.openai.com/v1".to_string(),
            gemini_base_url:      "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_model:         "gpt-4".to_string(),
            gemini_model:         "gemini-pro".to_string(),
            max_tokens:           150,
            temperature:          0.8,
            request_timeout_secs: 30,
        }
    }
}

// ── Clue generation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct ClueConfig {
    /// HMAC key for clue integrity proofs.
    #[arg(long, env = "CLUE_SECRET_KEY", default_value = DEFAULT_CLUE_SECRET,
          hide_env_values = true)]
    #[serde(skip_serializing)]
    pub clue_secret_key: String,

    #[arg(long, env = "CACHE_TTL", default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    #[arg(long, env = "MAX_CLUE_LENGTH", default_value_t = 200)]
    pub max_clue_length: usize,

    /// Variants scoring below this are logged as low quality.
    #[arg(long, env = "MIN_CLUE_QUALITY", default_value_t = 0.6)]
    pub min_clue_quality: f64,

    /// OpenAI variants requested per clue.
    #[arg(long, env = "CLUE_VARIANTS", default_value_t = 3)]
    pub num_variants: usize,
}

impl Default for ClueConfig {
    fn default() -> Self {
        Self {
            clue_secret_key:  DEFAULT_CLUE_SECRET.to_string(),
            cache_ttl_secs:   3600,
            max_clue_length:  200,
            min_clue_quality: 0.6,
            num_variants:     3,
        }
    }
}
