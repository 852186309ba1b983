// huntwarden/src/anomaly/mod.rs
//
// Behavior/anomaly scorer.
//
// Two isolation forests are trained at start-up on a synthetic population of
// legitimate players (uniform draws inside each feature's baseline range):
//
//   activity model   14 dims, contamination 0.10: /analyze-behavior
//   behavior model    9 dims, contamination 0.05: comprehensive verification
//
// The outlier threshold is the (1 − contamination) quantile of the training
// scores, so roughly that share of legitimate-looking players is flagged.
// Flagged players get a coarse label from a few features (speed, success,
// movement, hints) and a risk level.

pub mod cluster;
pub mod features;
pub mod forest;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::ScoringConfig;
use crate::events::{PlayerData, RiskLevel};
use crate::geo::{mean, round4};
use crate::state::store::{BehaviorSnapshot, PlayerStore};

use cluster::Label;
use features::{Schema, ACTIVITY_FEATURES, BEHAVIOR_FEATURES};
use forest::IsolationForest;

const BASELINE_POPULATION: usize = 2048;
const NEUTRAL_SCORE:       f64   = 0.5;
const MIN_CLUSTER_PLAYERS: usize = 10;
const TREND_WINDOW:        usize = 10;
const TREND_MIN_POINTS:    usize = 5;

// ── Labels ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Normal,
    UnnaturalSpeed,
    PerfectMovement,
    LowHintHighSuccess,
    ExtremelyFastSolving,
    BehavioralShift,
    DetectionFailed,
}

impl AnomalyType {
    fn risk_multiplier(self) -> f64 {
        match self {
            Self::UnnaturalSpeed       => 0.8,
            Self::PerfectMovement      => 0.9,
            Self::LowHintHighSuccess   => 0.7,
            Self::ExtremelyFastSolving => 0.85,
            Self::BehavioralShift      => 0.5,
            Self::Normal               => 0.3,
            Self::DetectionFailed      => 0.0,
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Normal               => "normal",
            Self::UnnaturalSpeed       => "unnatural_speed",
            Self::PerfectMovement      => "perfect_movement",
            Self::LowHintHighSuccess   => "low_hint_high_success",
            Self::ExtremelyFastSolving => "extremely_fast_solving",
            Self::BehavioralShift      => "behavioral_shift",
            Self::DetectionFailed      => "detection_failed",
        };
        write!(f, "{}", s)
    }
}

/// Nested threshold label over activity features.
pub fn classify(features: &[f64]) -> AnomalyType {
    let solving  = features[features::IDX_SOLVING_TIME];
    let success  = features[features::IDX_SUCCESS_RATE];
    let movement = features[features::IDX_MOVEMENT];
    let hints    = features[features::IDX_HINT_USAGE];

    if solving < 30.0 && success > 0.9 {
        AnomalyType::UnnaturalSpeed
    } else if movement > 0.95 && success > 0.95 {
        AnomalyType::PerfectMovement
    } else if hints < 0.1 && success > 0.9 {
        AnomalyType::LowHintHighSuccess
    } else if solving < 20.0 {
        AnomalyType::ExtremelyFastSolving
    } else {
        AnomalyType::BehavioralShift
    }
}

// ── Model ─────────────────────────────────────────────────────────────────────

/// One trained forest plus its outlier threshold.
pub struct BehaviorModel {
    schema:    Schema,
    forest:    IsolationForest,
    threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelScore {
    pub score:      f64,
    pub is_outlier: bool,
    pub confidence: f64,
}

impl BehaviorModel {
    pub fn train(schema: Schema, contamination: f64, cfg: &ScoringConfig, seed: u64) -> Option<Self> {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let population: Vec<Vec<f64>> = (0..BASELINE_POPULATION)
            .map(|_| {
                schema.iter()
                    .map(|f| {
                        let (lo, hi) = f.baseline;
                        if hi > lo { rng.gen_range(lo..=hi) } else { lo }
                    })
                    .collect()
            })
            .collect();

        let forest = IsolationForest::fit(&population, cfg.forest_trees, cfg.forest_sample_size, &mut rng)?;

        let mut scores: Vec<f64> = population.iter().map(|x| forest.score(x)).collect();
        scores.sort_by(|a, b| a.total_cmp(b));
        let q = ((1.0 - contamination.clamp(0.0, 0.5)) * (scores.len() - 1) as f64).round() as usize;
        let threshold = scores[q.min(scores.len() - 1)];

        Some(Self { schema, forest, threshold })
    }

    pub fn schema(&self) -> Schema { self.schema }
    pub fn threshold(&self) -> f64 { self.threshold }

    /// `None` when a feature is non-finite.
    pub fn score(&self, x: &[f64]) -> Option<ModelScore> {
        if x.len() != self.forest.dims() || x.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let score = self.forest.score(x);
        Some(ModelScore {
            score,
            is_outlier: score > self.threshold,
            confidence: ((score - self.threshold).abs() * 4.0).min(1.0),
        })
    }
}

// ── Reports ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AnomalyReport {
    pub anomaly_score: f64,
    pub is_anomaly:    bool,
    pub confidence:    f64,
    pub anomaly_type:  AnomalyType,
    pub risk_score:    f64,
    pub risk_level:    RiskLevel,
    pub features:      Map<String, Value>,
    pub timestamp:     DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendKind {
    InsufficientData,
    Stable,
    IncreasingRisk,
    ImprovingBehavior,
    SlightChange,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehaviorTrend {
    pub trend:           TrendKind,
    pub confidence:      f64,
    pub trend_magnitude: f64,
    pub data_points:     usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehaviorCluster {
    pub cluster_id:   usize,
    pub player_count: usize,
    pub players:      Vec<String>,
    pub centroid:     Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterReport {
    pub clusters:       Vec<BehaviorCluster>,
    pub outliers:       Vec<String>,
    pub total_clusters: usize,
    pub outlier_count:  usize,
}

// ── Detector ──────────────────────────────────────────────────────────────────

pub struct AnomalyDetector {
    activity:    BehaviorModel,
    behavior:    BehaviorModel,
    eps:         f64,
    min_samples: usize,
}

impl AnomalyDetector {
    pub fn new(cfg: &ScoringConfig) -> anyhow::Result<Self> {
        let activity = BehaviorModel::train(ACTIVITY_FEATURES, 0.10, cfg, cfg.model_seed)
            .ok_or_else(|| anyhow::anyhow!("activity baseline is empty"))?;
        let behavior = BehaviorModel::train(BEHAVIOR_FEATURES, 0.05, cfg, cfg.model_seed.wrapping_add(1))
            .ok_or_else(|| anyhow::anyhow!("behavior baseline is empty"))?;

        info!(
            activity_threshold = round4(activity.threshold()),
            behavior_threshold = round4(behavior.threshold()),
            trees = cfg.forest_trees,
            "anomaly models trained"
        );
        Ok(Self { activity, behavior, eps: cfg.cluster_eps, min_samples: cfg.cluster_min_samples })
    }

    /// Score one player record against the activity model.
    pub fn detect(&self, player: &PlayerData) -> AnomalyReport {
        let x   = features::extract(ACTIVITY_FEATURES, player);
        let now = Utc::now();

        let Some(s) = self.activity.score(&x) else {
            warn!(player_id = %player.id(), "anomaly detection failed: non-finite features");
            return AnomalyReport {
                anomaly_score: NEUTRAL_SCORE,
                is_anomaly:    false,
                confidence:    0.0,
                anomaly_type:  AnomalyType::DetectionFailed,
                risk_score:    0.0,
                risk_level:    RiskLevel::Minimal,
                features:      Map::new(),
                timestamp:     now,
            };
        };

        let anomaly_type = if s.is_outlier { classify(&x) } else { AnomalyType::Normal };
        let risk_score   = (s.score * anomaly_type.risk_multiplier()).clamp(0.0, 1.0);

        AnomalyReport {
            anomaly_score: round4(s.score),
            is_anomaly:    s.is_outlier,
            confidence:    round4(s.confidence),
            anomaly_type,
            risk_score:    round4(risk_score),
            risk_level:    RiskLevel::from_score(risk_score),
            features:      features::named(ACTIVITY_FEATURES, &x),
            timestamp:     now,
        }
    }

    /// Behavior-model score for comprehensive verification; neutral on failure.
    pub fn behavior_score(&self, player: &PlayerData) -> ModelScore {
        let x = features::extract(BEHAVIOR_FEATURES, player);
        self.behavior.score(&x).unwrap_or_else(|| {
            warn!(player_id = %player.id(), "behavior scoring failed: non-finite features");
            ModelScore { score: NEUTRAL_SCORE, is_outlier: false, confidence: 0.0 }
        })
    }

    pub fn update_profile(&self, store: &PlayerStore, player_id: &str, report: &AnomalyReport) -> usize {
        store.push_behavior(player_id, BehaviorSnapshot {
            score:        report.anomaly_score,
            anomaly_type: report.anomaly_type.to_string(),
            is_anomaly:   report.is_anomaly,
            timestamp:    report.timestamp,
        })
    }

    pub fn behavior_trend(&self, store: &PlayerStore, player_id: &str) -> BehaviorTrend {
        trend_of(&store.behavior_scores(player_id))
    }

    /// DBSCAN over standardised activity vectors. Needs ≥ 10 players.
    pub fn cluster(&self, players: &[PlayerData]) -> ClusterReport {
        if players.len() < MIN_CLUSTER_PLAYERS {
            return ClusterReport::default();
        }

        let raw: Vec<Vec<f64>> = players.iter()
            .map(|p| features::extract(ACTIVITY_FEATURES, p))
            .collect();
        let labels = cluster::dbscan(&cluster::standardize(&raw), self.eps, self.min_samples);

        let mut clusters: Vec<BehaviorCluster> = Vec::new();
        let mut outliers = Vec::new();

        for (i, label) in labels.iter().enumerate() {
            let id = players[i].id().to_string();
            match label {
                Label::Noise => outliers.push(id),
                Label::Cluster(c) => {
                    if clusters.len() <= *c {
                        clusters.push(BehaviorCluster {
                            cluster_id:   *c,
                            player_count: 0,
                            players:      Vec::new(),
                            centroid:     Map::new(),
                        });
                    }
                    clusters[*c].players.push(id);
                    clusters[*c].player_count += 1;
                }
            }
        }

        // Centroids in raw feature units
        for c in clusters.iter_mut() {
            let members: Vec<&Vec<f64>> = labels.iter().enumerate()
                .filter(|(_, l)| **l == Label::Cluster(c.cluster_id))
                .map(|(i, _)| &raw[i])
                .collect();
            let centre: Vec<f64> = (0..ACTIVITY_FEATURES.len())
                .map(|d| round4(mean(&members.iter().map(|m| m[d]).collect::<Vec<_>>())))
                .collect();
            c.centroid = features::named(ACTIVITY_FEATURES, &centre);
        }

        ClusterReport {
            total_clusters: clusters.len(),
            outlier_count:  outliers.len(),
            clusters,
            outliers,
        }
    }
}

/// Trend over the last ten anomaly scores: first half vs second half.
pub fn trend_of(scores: &[f64]) -> BehaviorTrend {
    if scores.len() < TREND_MIN_POINTS {
        return BehaviorTrend {
            trend:           TrendKind::InsufficientData,
            confidence:      0.0,
            trend_magnitude: 0.0,
            data_points:     scores.len(),
        };
    }

    let recent = &scores[scores.len().saturating_sub(TREND_WINDOW)..];
    let half   = recent.len() / 2;
    let delta  = mean(&recent[half..]) - mean(&recent[..half]);

    let (trend, confidence) = if delta.abs() < 0.1 {
        (TrendKind::Stable, 0.7)
    } else if delta > 0.2 {
        (TrendKind::IncreasingRisk, delta.abs().min(0.9))
    } else if delta < -0.2 {
        (TrendKind::ImprovingBehavior, delta.abs().min(0.9))
    } else {
        (TrendKind::SlightChange, 0.5)
    };

    BehaviorTrend {
        trend,
        confidence:      round4(confidence),
        trend_magnitude: round4(delta),
        data_points:     scores.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn detector() -> &'static AnomalyDetector {
        static DET: OnceLock<AnomalyDetector> = OnceLock::new();
        DET.get_or_init(|| AnomalyDetector::new(&ScoringConfig::default()).unwrap())
    }

    fn cheater(id: &str) -> PlayerData {
        PlayerData {
            player_id:           Some(id.into()),
            avg_solving_time:    Some(8.0),
            time_variance:       Some(0.5),
            success_rate:        Some(1.0),
            movement_efficiency: Some(0.99),
            hint_usage_rate:     Some(0.0),
            retry_frequency:     Some(0.0),
            failure_recovery_time: Some(5.0),
            ..Default::default()
        }
    }

    #[test]
    fn cheater_is_flagged_and_labelled() {
        let r = detector().detect(&cheater("c1"));
        assert!(r.is_anomaly, "score={}", r.anomaly_score);
        assert_eq!(r.anomaly_type, AnomalyType::UnnaturalSpeed);
        assert!(r.risk_score <= 1.0 && r.risk_score >= 0.0);
    }

    #[test]
    fn typical_player_is_not_flagged() {
        let p = PlayerData {
            avg_solving_time:     Some(240.0),
            time_variance:        Some(80.0),
            session_duration_avg: Some(2000.0),
            success_rate:         Some(0.55),
            unusual_movements:    Some(1.0),
            device_consistency:   Some(0.9),
            connection_stability: Some(0.85),
            ..Default::default()
        };
        let r = detector().detect(&p);
        assert!(!r.is_anomaly, "score={}", r.anomaly_score);
        assert_eq!(r.anomaly_type, AnomalyType::Normal);
        assert!(r.anomaly_score < detector().detect(&cheater("c2")).anomaly_score);
    }

    #[test]
    fn classification_order() {
        let mut f = features::extract(ACTIVITY_FEATURES, &PlayerData::default());
        f[features::IDX_SOLVING_TIME] = 15.0;
        assert_eq!(classify(&f), AnomalyType::ExtremelyFastSolving);
        f[features::IDX_SUCCESS_RATE] = 0.97;
        assert_eq!(classify(&f), AnomalyType::UnnaturalSpeed);
        f[features::IDX_SOLVING_TIME] = 200.0;
        f[features::IDX_MOVEMENT]     = 0.99;
        assert_eq!(classify(&f), AnomalyType::PerfectMovement);
    }

    #[test]
    fn trend_windows() {
        assert_eq!(trend_of(&[0.5; 4]).trend, TrendKind::InsufficientData);
        assert_eq!(trend_of(&[0.5; 8]).trend, TrendKind::Stable);

        let rising = [0.3, 0.3, 0.3, 0.3, 0.3, 0.7, 0.7, 0.7, 0.7, 0.7];
        let t = trend_of(&rising);
        assert_eq!(t.trend, TrendKind::IncreasingRisk);
        assert!((t.confidence - 0.4).abs() < 1e-9);

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert_eq!(trend_of(&falling).trend, TrendKind::ImprovingBehavior);

        let slight = [0.4, 0.4, 0.4, 0.55, 0.55, 0.55];
        assert_eq!(trend_of(&slight).trend, TrendKind::SlightChange);
    }

    #[test]
    fn profile_updates_feed_trend() {
        let store = PlayerStore::new();
        let det = detector();
        for _ in 0..6 {
            let r = det.detect(&cheater("c3"));
            det.update_profile(&store, "c3", &r);
        }
        let t = det.behavior_trend(&store, "c3");
        assert_eq!(t.data_points, 6);
        assert_eq!(t.trend, TrendKind::Stable);
    }

    #[test]
    fn bot_farm_clusters_together() {
        let mut players: Vec<PlayerData> = (0..6).map(|i| cheater(&format!("bot{i}"))).collect();
        for i in 0..6 {
            players.push(PlayerData {
                player_id:            Some(format!("human{i}")),
                avg_solving_time:     Some(100.0 + 55.0 * i as f64),
                session_duration_avg: Some(700.0 + 450.0 * i as f64),
                success_rate:         Some(0.3 + 0.1 * i as f64),
                hint_usage_rate:      Some(0.55 - 0.08 * i as f64),
                movement_efficiency:  Some(0.35 + 0.09 * i as f64),
                ..Default::default()
            });
        }
        let report = detector().cluster(&players);
        assert_eq!(report.total_clusters, 1);
        assert_eq!(report.clusters[0].player_count, 6);
        assert!(report.clusters[0].players.iter().all(|p| p.starts_with("bot")));
        assert_eq!(report.outlier_count, 6);
    }

    #[test]
    fn too_few_players_to_cluster() {
        let players: Vec<PlayerData> = (0..9).map(|i| cheater(&format!("b{i}"))).collect();
        assert_eq!(detector().cluster(&players).total_clusters, 0);
    }
}
