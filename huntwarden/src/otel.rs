// huntwarden/src/otel.rs
//
// In-process metrics registry, rendered in Prometheus text exposition format
// at GET /metrics and summarised by GET /system-stats.
//
// Metrics exposed:
//
//   huntwarden_verifications_total               Counter  comprehensive verifications
//   huntwarden_verification_level_total{level}   Counter  outcomes by verification level
//   huntwarden_check_mean_score{check}           Gauge    mean score per verification check
//   huntwarden_trust_score{le}                   Histogram composite trust distribution
//   huntwarden_location_verifications_total      Counter
//   huntwarden_behavior_analyses_total           Counter
//   huntwarden_anomalies_total                   Counter  analyses flagged as outliers
//   huntwarden_trust_calculations_total          Counter
//   huntwarden_fraud_analyses_total              Counter
//   huntwarden_suspicious_total                  Counter  fraud analyses above the risk threshold
//   huntwarden_clue_generations_total            Counter
//   huntwarden_clue_cache_hits_total             Counter
//   huntwarden_llm_failures_total                Counter  provider calls that fell back
//   huntwarden_npc_conversations_total           Counter
//   huntwarden_players_tracked                   Gauge    players seen by the store
//   huntwarden_trust_records                     Gauge
//   huntwarden_behavior_profiles                 Gauge

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::{CheckSignal, VerificationLevel};
use crate::state::store::PlayerStore;

// ── Metrics registry ──────────────────────────────────────────────────────────

pub struct HuntwardenMetrics {
    pub verifications:          AtomicU64,
    pub level_low:              AtomicU64,
    pub level_medium:           AtomicU64,
    pub level_high:             AtomicU64,
    pub level_extreme:          AtomicU64,
    pub location_verifications: AtomicU64,
    pub behavior_analyses:      AtomicU64,
    pub anomalies:              AtomicU64,
    pub trust_calculations:     AtomicU64,
    pub fraud_analyses:         AtomicU64,
    pub suspicious:             AtomicU64,
    pub clue_generations:       AtomicU64,
    pub clue_cache_hits:        AtomicU64,
    pub llm_failures:           AtomicU64,
    pub npc_conversations:      AtomicU64,
    /// Per-check score sums + counts for mean score export
    pub check_score_sum: Mutex<HashMap<String, (f64, u64)>>,
    /// Trust score buckets (0.0, 0.1], (0.1, 0.2], ... (0.9, 1.0]; not cumulative
    pub trust_buckets: [AtomicU64; 10],
    /// Sum of recorded trust scores in millionths
    pub trust_sum_micros: AtomicU64,
}

impl HuntwardenMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            verifications:          AtomicU64::new(0),
            level_low:              AtomicU64::new(0),
            level_medium:           AtomicU64::new(0),
            level_high:             AtomicU64::new(0),
            level_extreme:          AtomicU64::new(0),
            location_verifications: AtomicU64::new(0),
            behavior_analyses:      AtomicU64::new(0),
            anomalies:              AtomicU64::new(0),
            trust_calculations:     AtomicU64::new(0),
            fraud_analyses:         AtomicU64::new(0),
            suspicious:             AtomicU64::new(0),
            clue_generations:       AtomicU64::new(0),
            clue_cache_hits:        AtomicU64::new(0),
            llm_failures:           AtomicU64::new(0),
            npc_conversations:      AtomicU64::new(0),
            check_score_sum:        Mutex::new(HashMap::new()),
            trust_buckets:          Default::default(),
            trust_sum_micros:       AtomicU64::new(0),
        })
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    pub fn record_verification(&self, level: VerificationLevel, trust: f64, checks: &[CheckSignal]) {
        Self::incr(&self.verifications);
        match level {
            VerificationLevel::Low     => Self::incr(&self.level_low),
            VerificationLevel::Medium  => Self::incr(&self.level_medium),
            VerificationLevel::High    => Self::incr(&self.level_high),
            VerificationLevel::Extreme => Self::incr(&self.level_extreme),
        }
        let trust  = trust.clamp(0.0, 1.0);
        let bucket = ((trust * 10.0).ceil() as usize).saturating_sub(1).min(9);
        self.trust_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.trust_sum_micros.fetch_add((trust * 1e6).round() as u64, Ordering::Relaxed);

        let mut map = self.check_score_sum.lock();
        for sig in checks {
            let entry = map.entry(sig.kind.to_string()).or_insert((0.0, 0));
            entry.0 += sig.score;
            entry.1 += 1;
        }
    }

    /// Cache hit rate over all clue generation requests.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = Self::get(&self.clue_generations);
        if total == 0 { return 0.0; }
        Self::get(&self.clue_cache_hits) as f64 / total as f64
    }

    /// Render metrics in Prometheus text exposition format.
    pub fn prometheus_text(&self, store: &PlayerStore) -> String {
        let mut out = String::with_capacity(4096);

        macro_rules! counter {
            ($name:expr, $help:expr, $val:expr) => {
                out.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} counter\n{} {}\n",
                    $name, $help, $name, $name, $val
                ));
            };
        }
        macro_rules! gauge {
            ($name:expr, $help:expr, $val:expr) => {
                out.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} gauge\n{} {}\n",
                    $name, $help, $name, $name, $val
                ));
            };
        }

        counter!(
            "huntwarden_verifications_total",
            "Comprehensive verifications completed",
            Self::get(&self.verifications)
        );

        out.push_str("# HELP huntwarden_verification_level_total Verifications by required level\n");
        out.push_str("# TYPE huntwarden_verification_level_total counter\n");
        for (level, c) in [
            ("low", &self.level_low),
            ("medium", &self.level_medium),
            ("high", &self.level_high),
            ("extreme", &self.level_extreme),
        ] {
            out.push_str(&format!(
                "huntwarden_verification_level_total{{level=\"{}\"}} {}\n",
                level, Self::get(c)
            ));
        }

        counter!("huntwarden_location_verifications_total", "Location verifications", Self::get(&self.location_verifications));
        counter!("huntwarden_behavior_analyses_total", "Behavior analyses", Self::get(&self.behavior_analyses));
        counter!("huntwarden_anomalies_total", "Behavior analyses flagged as outliers", Self::get(&self.anomalies));
        counter!("huntwarden_trust_calculations_total", "Trust score calculations", Self::get(&self.trust_calculations));
        counter!("huntwarden_fraud_analyses_total", "Fraud pattern analyses", Self::get(&self.fraud_analyses));
        counter!("huntwarden_suspicious_total", "Fraud analyses above the risk threshold", Self::get(&self.suspicious));
        counter!("huntwarden_clue_generations_total", "Clue generation requests", Self::get(&self.clue_generations));
        counter!("huntwarden_clue_cache_hits_total", "Clue requests served from cache", Self::get(&self.clue_cache_hits));
        counter!("huntwarden_llm_failures_total", "LLM calls that failed and fell back", Self::get(&self.llm_failures));
        counter!("huntwarden_npc_conversations_total", "NPC conversation turns", Self::get(&self.npc_conversations));

        gauge!("huntwarden_players_tracked", "Players seen by the store", store.n_players());
        gauge!("huntwarden_trust_records", "Players with trust history", store.n_trust_records());
        gauge!("huntwarden_behavior_profiles", "Players with behavior profiles", store.n_profiles());

        out.push_str("# HELP huntwarden_check_mean_score Mean score per verification check\n");
        out.push_str("# TYPE huntwarden_check_mean_score gauge\n");
        {
            let map = self.check_score_sum.lock();
            let mut checks: Vec<_> = map.iter().collect();
            checks.sort_by(|a, b| a.0.cmp(b.0));
            for (check, (sum, count)) in checks {
                let mean = if *count > 0 { sum / *count as f64 } else { 0.0 };
                out.push_str(&format!(
                    "huntwarden_check_mean_score{{check=\"{}\"}} {:.4}\n",
                    check, mean
                ));
            }
        }

        out.push_str("# HELP huntwarden_trust_score Composite trust distribution\n");
        out.push_str("# TYPE huntwarden_trust_score histogram\n");
        let mut cumulative = 0u64;
        for (i, bucket) in self.trust_buckets.iter().enumerate() {
            cumulative += bucket.load(Ordering::Relaxed);
            out.push_str(&format!(
                "huntwarden_trust_score_bucket{{le=\"{:.1}\"}} {}\n",
                (i + 1) as f64 * 0.1,
                cumulative
            ));
        }
        out.push_str(&format!("huntwarden_trust_score_bucket{{le=\"+Inf\"}} {}\n", cumulative));
        out.push_str(&format!(
            "huntwarden_trust_score_sum {:.4}\n",
            self.trust_sum_micros.load(Ordering::Relaxed) as f64 / 1e6
        ));
        out.push_str(&format!("huntwarden_trust_score_count {}\n", cumulative));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CheckKind;
    use chrono::Utc;

    #[test]
    fn renders_counters_and_buckets() {
        let m = HuntwardenMetrics::new();
        let sig = CheckSignal {
            kind:       CheckKind::Behavior,
            player_id:  "p".into(),
            score:      0.8,
            confidence: 0.9,
            evidence:   Vec::new(),
            detail:     serde_json::Value::Null,
            timestamp:  Utc::now(),
        };
        m.record_verification(VerificationLevel::Low, 1.0, &[sig]);
        HuntwardenMetrics::incr(&m.clue_generations);
        HuntwardenMetrics::incr(&m.clue_generations);
        HuntwardenMetrics::incr(&m.clue_cache_hits);

        let text = m.prometheus_text(&PlayerStore::new());
        assert!(text.contains("huntwarden_verifications_total 1\n"));
        assert!(text.contains("huntwarden_verification_level_total{level=\"low\"} 1\n"));
        assert!(text.contains("huntwarden_check_mean_score{check=\"behavior\"} 0.8000\n"));
        assert!(text.contains("huntwarden_trust_score_bucket{le=\"1.0\"} 1\n"));
        assert_eq!(m.cache_hit_rate(), 0.5);
    }

    #[test]
    fn trust_histogram_is_cumulative() {
        let m = HuntwardenMetrics::new();
        for trust in [0.05, 0.55, 1.0] {
            m.record_verification(VerificationLevel::Low, trust, &[]);
        }

        let text = m.prometheus_text(&PlayerStore::new());
        assert!(text.contains("# TYPE huntwarden_trust_score histogram\n"));
        assert!(text.contains("huntwarden_trust_score_bucket{le=\"0.1\"} 1\n"));
        assert!(text.contains("huntwarden_trust_score_bucket{le=\"0.5\"} 1\n"));
        assert!(text.contains("huntwarden_trust_score_bucket{le=\"0.6\"} 2\n"));
        assert!(text.contains("huntwarden_trust_score_bucket{le=\"1.0\"} 3\n"));
        assert!(text.contains("huntwarden_trust_score_bucket{le=\"+Inf\"} 3\n"));
        assert!(text.contains("huntwarden_trust_score_sum 1.6000\n"));
        assert!(text.contains("huntwarden_trust_score_count 3\n"));
    }
}
