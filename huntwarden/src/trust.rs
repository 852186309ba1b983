// huntwarden/src/trust.rs
//
// Trust aggregator: six weighted components into one [0,1] trust value.
//
// Weight distribution (sum = 1.00):
//   BehaviorConsistency    0.25  timing CV, result repetition, movement
//   LocationVerification   0.20  prior GPS trust / plausibility / spoofing
//   HistoricalPerformance  0.20  success rate, account age, achievements
//   SocialBehavior         0.15  collaboration, reports, feedback
//   DeviceReputation       0.10  device + connection + location stability
//   TemporalPatterns       0.10  regular hours, session/frequency regularity
//
// Temporal state: the previous {score, timestamp} per player is decayed by
// 0.95^days and blended with the fresh score. Everything else is stateless.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::events::{PlayerData, TrustLevel};
use crate::geo::{clamp01, coefficient_of_variation, mean, round4, variance};
use crate::state::store::{PlayerStore, TrustSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustComponent {
    BehaviorConsistency,
    LocationVerification,
    HistoricalPerformance,
    SocialBehavior,
    DeviceReputation,
    TemporalPatterns,
}

// Component weights: must sum to 1.0
pub const WEIGHTS: &[(TrustComponent, f64)] = &[
    (TrustComponent::BehaviorConsistency,   0.25),
    (TrustComponent::LocationVerification,  0.20),
    (TrustComponent::HistoricalPerformance, 0.20),
    (TrustComponent::SocialBehavior,        0.15),
    (TrustComponent::DeviceReputation,      0.10),
    (TrustComponent::TemporalPatterns,      0.10),
];

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Outcome of an earlier location check, as reported by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationEvidence {
    pub gps_trust:             Option<f64>,
    pub movement_plausibility: Option<f64>,
    pub spoofing_indicators:   Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationResults {
    pub location: LocationEvidence,
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TrustResult {
    pub trust_score:      f64,
    pub trust_level:      TrustLevel,
    pub component_scores: BTreeMap<TrustComponent, f64>,
    pub confidence:       f64,
    pub recommendations:  Vec<String>,
    /// Weighted component score before blending with history.
    pub current_score:    f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decayed_prior:    Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_last:  Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrustHistoryEntry {
    pub date:        DateTime<Utc>,
    pub trust_score: f64,
    pub trust_level: String,
}

impl From<TrustSnapshot> for TrustHistoryEntry {
    fn from(s: TrustSnapshot) -> Self {
        Self { date: s.timestamp, trust_score: s.score, trust_level: s.level }
    }
}

// ── Components ────────────────────────────────────────────────────────────────

fn behavior_consistency(p: &PlayerData) -> f64 {
    let mut parts = Vec::with_capacity(3);

    if p.solving_times.len() > 2 {
        let cv = if mean(&p.solving_times) > 0.0 { coefficient_of_variation(&p.solving_times) } else { 1.0 };
        parts.push((1.0 - cv).max(0.0));
    }
    if !p.success_pattern.is_empty() {
        let unique: std::collections::HashSet<String> =
            p.success_pattern.iter().map(|v| v.to_string()).collect();
        parts.push(1.0 - unique.len() as f64 / p.success_pattern.len() as f64);
    }
    parts.push(p.movement_consistency.unwrap_or(0.7));

    if parts.is_empty() { 0.5 } else { mean(&parts) }
}

fn location_trust(v: &VerificationResults) -> f64 {
    let loc = &v.location;
    let spoof_penalty = (1.0 - loc.spoofing_indicators.len() as f64 * 0.2).max(0.1);
    mean(&[
        loc.gps_trust.unwrap_or(0.5),
        loc.movement_plausibility.unwrap_or(0.5),
        spoof_penalty,
    ])
}

fn historical_performance(p: &PlayerData) -> f64 {
    let success   = p.success_rate.unwrap_or(0.5);
    let longevity = 0.7 + (p.account_age_days.unwrap_or(1.0) / 100.0).min(0.3);

    let hours = p.total_play_time.unwrap_or(1.0) / 3600.0;
    let density = if hours > 0.0 {
        (p.achievements.unwrap_or(0.0) / hours).min(1.0)
    } else {
        0.0
    };
    mean(&[success, longevity, density])
}

fn social_behavior(p: &PlayerData) -> f64 {
    let reports  = p.reports_received.unwrap_or(0) as f64;
    let feedback = p.positive_feedback.unwrap_or(0) as f64;
    mean(&[
        p.collaboration_score.unwrap_or(0.5),
        p.communication_quality.unwrap_or(0.5),
        1.0 - (reports * 0.1).min(0.5),
        0.8 + (feedback * 0.05).min(0.2),
    ])
}

fn device_reputation(p: &PlayerData) -> f64 {
    mean(&[
        p.device_consistency.unwrap_or(0.8),
        p.connection_stability.unwrap_or(0.7),
        p.location_consistency.unwrap_or(0.6),
    ])
}

fn temporal_patterns(p: &PlayerData) -> f64 {
    let hours = if p.usual_playing_hours.unwrap_or(true) { 0.9 } else { 0.5 };
    mean(&[
        hours,
        p.session_length_consistency.unwrap_or(0.7),
        p.play_frequency_consistency.unwrap_or(0.6),
    ])
}

/// `prior × decay^days`, days floored at zero.
pub fn decay_prior(prior: f64, days: i64, decay: f64) -> f64 {
    prior * decay.powi(days.max(0) as i32)
}

fn confidence(scores: &[f64]) -> f64 {
    if scores.len() < 2 { return 0.5; }
    let consistency = 1.0 - (variance(scores) * 5.0).min(1.0);
    let sufficiency = (scores.len() as f64 / WEIGHTS.len() as f64).min(1.0);
    (consistency + sufficiency) / 2.0
}

fn recommendations(c: &BTreeMap<TrustComponent, f64>) -> Vec<String> {
    let get = |k| c.get(&k).copied().unwrap_or(0.0);
    let mut out = Vec::new();
    if get(TrustComponent::BehaviorConsistency) < 0.7 {
        out.push("Improve behavior consistency".to_string());
    }
    if get(TrustComponent::LocationVerification) < 0.6 {
        out.push("Verify location accuracy".to_string());
    }
    if get(TrustComponent::SocialBehavior) < 0.5 {
        out.push("Engage in positive social interactions".to_string());
    }
    if get(TrustComponent::DeviceReputation) < 0.6 {
        out.push("Maintain consistent device usage".to_string());
    }
    out
}

// ── Scorer ────────────────────────────────────────────────────────────────────

pub struct TrustScorer {
    decay: f64,
    blend: f64,
}

impl TrustScorer {
    pub fn new(cfg: &ScoringConfig) -> Self {
        Self { decay: cfg.trust_decay, blend: cfg.history_blend.clamp(0.0, 1.0) }
    }

    /// Stateless weighted score over the six components.
    pub fn components(&self, p: &PlayerData, v: &VerificationResults) -> BTreeMap<TrustComponent, f64> {
        WEIGHTS.iter()
            .map(|(c, _)| {
                let s = match c {
                    TrustComponent::BehaviorConsistency   => behavior_consistency(p),
                    TrustComponent::LocationVerification  => location_trust(v),
                    TrustComponent::HistoricalPerformance => historical_performance(p),
                    TrustComponent::SocialBehavior        => social_behavior(p),
                    TrustComponent::DeviceReputation      => device_reputation(p),
                    TrustComponent::TemporalPatterns      => temporal_patterns(p),
                };
                (*c, round4(clamp01(s)))
            })
            .collect()
    }

    pub fn calculate(&self, store: &PlayerStore, p: &PlayerData, v: &VerificationResults) -> TrustResult {
        self.calculate_at(store, p, v, Utc::now())
    }

    /// Score, decay-blend against the stored prior, and record.
    pub fn calculate_at(
        &self,
        store: &PlayerStore,
        p:     &PlayerData,
        v:     &VerificationResults,
        now:   DateTime<Utc>,
    ) -> TrustResult {
        let components = self.components(p, v);
        let current: f64 = WEIGHTS.iter()
            .map(|(c, w)| components.get(c).copied().unwrap_or(0.0) * w)
            .sum();
        let current = clamp01(current);

        let (final_score, decayed_prior, days) = match p.player_id.as_deref() {
            Some(id) => {
                let mut outcome = (current, None, None);
                let recorded = store.update_trust(id, now, |prior| {
                    outcome = self.blend_prior(current, prior, now);
                    (round4(outcome.0), TrustLevel::from_score(outcome.0).to_string())
                });
                debug!(player_id = id, score = recorded, "trust recorded");
                outcome
            }
            None => (current, None, None),
        };

        let level  = TrustLevel::from_score(final_score);
        let scores: Vec<f64> = components.values().copied().collect();

        TrustResult {
            trust_score:      round4(final_score),
            trust_level:      level,
            recommendations:  recommendations(&components),
            confidence:       round4(confidence(&scores)),
            component_scores: components,
            current_score:    round4(current),
            decayed_prior,
            days_since_last:  days,
        }
    }

    /// Blend `current` against the prior decayed by whole elapsed days.
    fn blend_prior(
        &self,
        current: f64,
        prior:   Option<(f64, DateTime<Utc>)>,
        now:     DateTime<Utc>,
    ) -> (f64, Option<f64>, Option<i64>) {
        match prior {
            Some((last, at)) => {
                let days    = (now - at).num_days().max(0);
                let decayed = decay_prior(last, days, self.decay);
                let blended = self.blend * current + (1.0 - self.blend) * decayed;
                (clamp01(blended), Some(round4(decayed)), Some(days))
            }
            None => (current, None, None),
        }
    }

    /// Recorded scores within the last `days`, oldest first.
    pub fn history(&self, store: &PlayerStore, player_id: &str, days: i64) -> Vec<TrustHistoryEntry> {
        let since = Utc::now() - Duration::days(days.max(0));
        store.trust_history(player_id, since).into_iter().map(Into::into).collect()
    }
}
