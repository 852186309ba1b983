// huntwarden/src/clue/scoring.rs
//
// Heuristic clue quality scoring.
//
// Weight distribution (sum = 1.00):
//   Difficulty match       0.30  estimated vs ideal difficulty for the player
//   Engagement             0.20  questions, exclamations, mystery vocabulary
//   Uniqueness             0.20  word-Jaccard distance from the last 5 clues
//   Cultural sensitivity   0.15  penalises sensitive vocabulary
//   Exploration            0.15  exploration verbs
//
// Keyword scans use Aho-Corasick automata, ASCII case-insensitive: one pass
// per text regardless of keyword count.

use std::collections::HashSet;
use std::sync::OnceLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::clue::text::word_jaccard;
use crate::clue::types::{PlayerProfile, PreviousClue};

pub const W_DIFFICULTY:  f64 = 0.30;
pub const W_ENGAGEMENT:  f64 = 0.20;
pub const W_UNIQUENESS:  f64 = 0.20;
pub const W_CULTURAL:    f64 = 0.15;
pub const W_EXPLORATION: f64 = 0.15;

const UNIQUENESS_WINDOW: usize = 5;

const MYSTERY_WORDS:     &[&str] = &["mystery", "secret", "hidden", "discover"];
const SENSITIVE_WORDS:   &[&str] = &["sacred", "holy", "religious"];
const EXPLORATION_WORDS: &[&str] = &["find", "discover", "explore", "search", "look", "seek"];

static MYSTERY_AC:     OnceLock<AhoCorasick> = OnceLock::new();
static SENSITIVE_AC:   OnceLock<AhoCorasick> = OnceLock::new();
static EXPLORATION_AC: OnceLock<AhoCorasick> = OnceLock::new();

fn automaton(cell: &'static OnceLock<AhoCorasick>, words: &[&str]) -> &'static AhoCorasick {
    cell.get_or_init(|| {
        AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::Standard)
            .build(words)
            .expect("keyword automaton build failed")
    })
}

/// Number of distinct keywords from the automaton found in `text`.
fn distinct_hits(ac: &AhoCorasick, text: &str) -> usize {
    ac.find_overlapping_iter(text)
        .map(|m| m.pattern().as_usize())
        .collect::<HashSet<_>>()
        .len()
}

// ── Components ────────────────────────────────────────────────────────────────

pub fn ideal_difficulty(player: &PlayerProfile) -> f64 {
    let base = player.level as f64 / 10.0;
    (base + (player.success_rate - 0.5) * 0.2).clamp(0.1, 0.9)
}

/// Text-complexity proxy scaled by player level.
pub fn estimate_difficulty(text: &str, level: u32) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    let n = words.len();
    let avg_len = words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / n.max(1) as f64;
    let complexity = (n as f64 * 0.3 + avg_len * 0.7) / 20.0;
    (complexity * (level as f64 / 5.0)).clamp(0.1, 0.9)
}

pub fn engagement(text: &str) -> f64 {
    let mut score = 0.5;
    if text.contains('?') { score += 0.2; }
    if text.contains('!') { score += 0.1; }
    if distinct_hits(automaton(&MYSTERY_AC, MYSTERY_WORDS), text) > 0 { score += 0.2; }
    f64::min(score, 1.0)
}

pub fn uniqueness(text: &str, previous: &[PreviousClue]) -> f64 {
    let start = previous.len().saturating_sub(UNIQUENESS_WINDOW);
    let sims: Vec<f64> = previous[start..].iter()
        .filter(|p| !p.text.is_empty())
        .map(|p| word_jaccard(text, &p.text))
        .collect();
    if sims.is_empty() { return 1.0; }
    1.0 - sims.iter().sum::<f64>() / sims.len() as f64
}

pub fn cultural_fit(text: &str) -> f64 {
    if distinct_hits(automaton(&SENSITIVE_AC, SENSITIVE_WORDS), text) > 0 { 0.3 } else { 0.9 }
}

pub fn exploration(text: &str) -> f64 {
    let hits = distinct_hits(automaton(&EXPLORATION_AC, EXPLORATION_WORDS), text);
    f64::min(1.0, hits as f64 * 0.3)
}

/// Weighted quality in [0.1, 1.0].
pub fn quality(text: &str, difficulty: f64, player: &PlayerProfile, previous: &[PreviousClue]) -> f64 {
    let difficulty_match = 1.0 - (difficulty - ideal_difficulty(player)).abs();
    let score = difficulty_match     * W_DIFFICULTY
        + engagement(text)           * W_ENGAGEMENT
        + uniqueness(text, previous) * W_UNIQUENESS
        + cultural_fit(text)         * W_CULTURAL
        + exploration(text)          * W_EXPLORATION;
    score.clamp(0.1, 1.0)
}
