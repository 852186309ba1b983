// huntwarden/src/eval/mod.rs
//
// Offline evaluation over a labeled player dataset.
//
//   1. Load labeled JSONL records
//   2. Run the anomaly scorer and fraud matcher on every record, in order,
//      against a fresh store (so multi-account indexes build up as they would live)
//   3. Compute global and per-pattern precision / recall / F1 / FPR
//   4. Emit a markdown report and a JSON summary
//
// Dataset format (one JSON object per line):
//   { "player_data": {...}, "game_context": {...}, "label": "bot_ring_7" or null }
//
// A non-null label marks a known cheater (positive class).
//
// Run:
//   huntwarden --mode eval --path labeled_players.jsonl
//   huntwarden --mode eval --path labeled_players.jsonl --eval-threshold 0.6

pub mod report;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::anomaly::AnomalyDetector;
use crate::config::ScoringConfig;
use crate::events::{GameContext, PlayerData};
use crate::fraud::FraudDetector;
use crate::state::store::PlayerStore;

pub const ANOMALY_ROW: &str = "behavior_anomaly";
const HISTOGRAM_BINS: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabeledRecord {
    pub player_data:  PlayerData,
    pub game_context: GameContext,
    pub label:        Option<String>,
}

// ── Confusion counts ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct Confusion {
    pub tp:  u64,
    pub fp:  u64,
    pub tn:  u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
}

impl Confusion {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true,  true)  => self.tp  += 1,
            (true,  false) => self.fp  += 1,
            (false, true)  => self.fn_ += 1,
            (false, false) => self.tn  += 1,
        }
    }

    pub fn precision(&self) -> f64 {
        let denom = self.tp + self.fp;
        if denom == 0 { 1.0 } else { self.tp as f64 / denom as f64 }
    }

    pub fn recall(&self) -> f64 {
        let denom = self.tp + self.fn_;
        if denom == 0 { 0.0 } else { self.tp as f64 / denom as f64 }
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    pub fn fpr(&self) -> f64 {
        let denom = self.fp + self.tn;
        if denom == 0 { 0.0 } else { self.fp as f64 / denom as f64 }
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct EvalResult {
    pub n_records:   usize,
    pub n_positive:  usize,
    pub n_negative:  usize,
    pub threshold:   f64,
    pub global:      Confusion,
    /// One row per fraud pattern plus the behavior-anomaly flag.
    pub per_pattern: BTreeMap<String, Confusion>,
    pub risk_levels: BTreeMap<String, u64>,
    /// Combined risk per record with its label, in dataset order.
    pub scored:      Vec<(f64, bool)>,
}

impl EvalResult {
    /// Risk histogram in 0.1-wide bins: (bin lower bound, count).
    pub fn histogram(&self) -> Vec<(f64, usize)> {
        let mut bins = vec![0usize; HISTOGRAM_BINS];
        for (score, _) in &self.scored {
            let i = ((score * HISTOGRAM_BINS as f64) as usize).min(HISTOGRAM_BINS - 1);
            bins[i] += 1;
        }
        bins.into_iter().enumerate()
            .map(|(i, c)| (i as f64 / HISTOGRAM_BINS as f64, c))
            .collect()
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

pub struct Evaluator {
    threshold: f64,
    detector:  AnomalyDetector,
    fraud:     FraudDetector,
}

impl Evaluator {
    pub fn new(cfg: &ScoringConfig, threshold: f64) -> Result<Self> {
        Ok(Self {
            threshold,
            detector: AnomalyDetector::new(cfg)?,
            fraud:    FraudDetector::new(cfg),
        })
    }

    pub async fn run_dataset(&self, path: &Path) -> Result<EvalResult> {
        let content = tokio::fs::read_to_string(path).await?;
        let records = parse_dataset(&content);
        info!("Loaded {} labeled records from {}", records.len(), path.display());
        Ok(self.evaluate(&records))
    }

    pub fn evaluate(&self, records: &[LabeledRecord]) -> EvalResult {
        let store = PlayerStore::new();

        let n_records  = records.len();
        let n_positive = records.iter().filter(|r| r.label.is_some()).count();

        let mut global      = Confusion::default();
        let mut per_pattern = BTreeMap::<String, Confusion>::new();
        let mut risk_levels = BTreeMap::<String, u64>::new();
        let mut scored      = Vec::with_capacity(n_records);

        for rec in records {
            store.ingest(&rec.player_data, Utc::now());

            let anomaly = self.detector.detect(&rec.player_data);
            let fraud   = self.fraud.analyze(&store, &rec.player_data, &rec.game_context);
            let actual  = rec.label.is_some();

            for spec in crate::fraud::CATALOG {
                per_pattern.entry(spec.pattern.to_string()).or_default()
                    .record(fraud.is_detected(spec.pattern), actual);
            }
            per_pattern.entry(ANOMALY_ROW.to_string()).or_default()
                .record(anomaly.is_anomaly, actual);

            let risk = fraud.overall_risk_score.max(anomaly.risk_score);
            global.record(risk >= self.threshold, actual);
            *risk_levels.entry(anomaly.risk_level.to_string()).or_default() += 1;
            scored.push((risk, actual));
        }

        EvalResult {
            n_records,
            n_positive,
            n_negative: n_records - n_positive,
            threshold:  self.threshold,
            global,
            per_pattern,
            risk_levels,
            scored,
        }
    }
}

fn parse_dataset(content: &str) -> Vec<LabeledRecord> {
    content.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| match serde_json::from_str::<LabeledRecord>(l) {
            Ok(r)  => Some(r),
            Err(e) => { warn!("Eval dataset parse error: {}", e); None }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fraud::FraudPattern;

    fn cheater(id: &str) -> LabeledRecord {
        let line = format!(
            r#"{{"player_data": {{"player_id": "{id}", "solving_times": [2, 3, 2, 3, 2],
                "success_rate": 1.0, "hint_usage_rate": 0.0,
                "interaction_patterns": {{"click_intervals": [0.1, 0.1, 0.1, 0.1, 0.1],
                                          "movement_patterns": {{"perfect_linearity": true}}}}}},
                "label": "bot_ring"}}"#
        );
        serde_json::from_str(&line).unwrap()
    }

    fn honest(id: &str) -> LabeledRecord {
        LabeledRecord {
            player_data: PlayerData {
                player_id:        Some(id.into()),
                avg_solving_time: Some(160.0),
                solving_times:    vec![150.0, 190.0, 120.0, 210.0, 170.0],
                success_rate:     Some(0.6),
                hint_usage_rate:  Some(0.3),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn confusion_metrics() {
        let c = Confusion { tp: 8, fp: 2, tn: 18, fn_: 2 };
        assert!((c.precision() - 0.8).abs() < 1e-12);
        assert!((c.recall() - 0.8).abs() < 1e-12);
        assert!((c.f1() - 0.8).abs() < 1e-12);
        assert!((c.fpr() - 0.1).abs() < 1e-12);

        let empty = Confusion::default();
        assert_eq!(empty.precision(), 1.0);
        assert_eq!(empty.recall(), 0.0);
        assert_eq!(empty.f1(), 0.0);
    }

    #[test]
    fn dataset_parsing_skips_bad_lines() {
        let data = "{\"player_data\": {\"player_id\": \"a\"}, \"label\": null}\n\nnot json\n{\"label\": \"x\"}\n";
        let recs = parse_dataset(data);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].label.is_none());
        assert_eq!(recs[1].label.as_deref(), Some("x"));
    }

    #[test]
    fn evaluation_counts_every_record() {
        let ev = Evaluator::new(&ScoringConfig::default(), 0.5).unwrap();
        let records = vec![cheater("c1"), honest("h1"), cheater("c2"), honest("h2")];
        let r = ev.evaluate(&records);

        assert_eq!(r.n_records, 4);
        assert_eq!(r.n_positive, 2);
        assert_eq!(r.n_negative, 2);
        let g = r.global;
        assert_eq!(g.tp + g.fp + g.tn + g.fn_, 4);
        assert_eq!(r.scored.len(), 4);
        assert_eq!(r.histogram().iter().map(|(_, c)| c).sum::<usize>(), 4);

        let speed = r.per_pattern[&FraudPattern::SpeedHacking.to_string()];
        assert_eq!(speed.tp + speed.fp + speed.tn + speed.fn_, 4);
        assert!(r.per_pattern.contains_key(ANOMALY_ROW));
        assert_eq!(r.risk_levels.values().sum::<u64>(), 4);
    }
}
