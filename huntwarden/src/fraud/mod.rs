// huntwarden/src/fraud/mod.rs
//
// Fraud pattern matcher.
//
// Each catalog pattern is scored independently from additive threshold
// checks, clamped to [0,1]. A pattern is detected when its score reaches the
// catalog threshold. Overall risk is the weight-normalised mean of all five
// scores. There is no cross-pattern correlation.
//
// Multi-account and collusion checks consult the store (device/IP reverse
// indexes, social graph) in addition to whatever the caller put in the game
// context, so repeated requests accumulate evidence.

pub mod catalog;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ScoringConfig;
use crate::events::{GameContext, PlayerData};
use crate::geo::{
    clamp01, coefficient_of_variation, impossible_segments, mean, point_is_rounded, round4,
    rounded_ratio, std_dev, GeoPoint,
};
use crate::state::store::{PatternDetection, PlayerStore, SuspiciousActivity};

pub use catalog::{FraudPattern, PatternSpec, CATALOG};

const GPS_ACCURACY_LIMIT_M: f64 = 1000.0;
const RAPID_SUCCESSION_S:   f64 = 60.0;

#[derive(Debug, Clone, Serialize)]
pub struct Mitigation {
    pub pattern: FraudPattern,
    pub action:  &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudReport {
    pub player_id:          String,
    pub overall_risk_score: f64,
    pub detected_patterns:  Vec<FraudPattern>,
    pub pattern_scores:     BTreeMap<FraudPattern, f64>,
    pub evidence:           BTreeMap<FraudPattern, Vec<String>>,
    pub recommendations:    Vec<String>,
    pub mitigations:        Vec<Mitigation>,
    pub confidence:         f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicious_activity_id: Option<String>,
    pub timestamp:          DateTime<Utc>,
}

impl FraudReport {
    pub fn is_detected(&self, p: FraudPattern) -> bool {
        self.detected_patterns.contains(&p)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternStats {
    pub total_detections:      usize,
    pub recent_detections_24h: usize,
    pub detection_rate:        f64,   // per hour over the last 24h
}

// ── Pattern checks ────────────────────────────────────────────────────────────

fn speed_hacking(p: &PlayerData) -> (f64, Vec<String>) {
    let mut score    = 0.0;
    let mut evidence = Vec::new();

    let avg = p.mean_solving_time();
    if let Some(avg) = avg {
        if avg < 20.0      { score += 0.8; evidence.push(format!("extreme_solve_speed:{avg:.1}s")); }
        else if avg < 40.0 { score += 0.5; evidence.push(format!("fast_solve_speed:{avg:.1}s")); }
    }

    let success = p.success_rate.unwrap_or(0.5);
    let fast    = avg.map(|a| a < 40.0).unwrap_or(false);
    if success > 0.95 && (p.solving_times.len() > 5 || fast) {
        score += 0.3;
        evidence.push(format!("near_perfect_success:{:.0}%", success * 100.0));
    }
    (clamp01(score), evidence)
}

fn track(p: &PlayerData) -> &[GeoPoint] {
    let loc = &p.location_data;
    if loc.movement_history.is_empty() { &loc.locations } else { &loc.movement_history }
}

fn location_spoofing(p: &PlayerData, impossible_kmh: f64) -> (f64, Vec<String>) {
    let mut score    = 0.0;
    let mut evidence = Vec::new();
    let loc   = &p.location_data;
    let track = track(p);

    let jumps = impossible_segments(track, impossible_kmh);
    if !jumps.is_empty() {
        score += 0.6;
        let fastest = jumps.iter().map(|(_, v)| *v).fold(0.0, f64::max);
        evidence.push(format!("impossible_movements:{}(max {fastest:.0}km/h)", jumps.len()));
    }

    let mut issues = loc.gps_issues.clone();
    if let Some(acc) = loc.gps_accuracy.filter(|a| *a > GPS_ACCURACY_LIMIT_M) {
        issues.push(format!("poor_accuracy:{acc:.0}m"));
    }
    if !track.is_empty() && rounded_ratio(track) > 0.5 {
        let n = track.iter().filter(|pt| point_is_rounded(pt)).count();
        issues.push(format!("rounded_coordinates:{n}/{}", track.len()));
    }
    if !issues.is_empty() {
        score += 0.4;
        evidence.push(format!("gps_inconsistencies:{}", issues.join(",")));
    }

    if loc.is_mock_provider {
        score += 0.8;
        evidence.push("mock_location_provider".into());
    }
    (clamp01(score), evidence)
}

fn multiple_accounts(p: &PlayerData, ctx: &GameContext, store: &PlayerStore) -> (f64, Vec<String>) {
    let mut score    = 0.0;
    let mut evidence = Vec::new();
    let id = p.id();

    if let Some(fp) = p.device_fingerprint.as_deref().filter(|s| !s.is_empty()) {
        let known  = store.players_with_device(fp);
        let others = known.iter().filter(|o| o.as_str() != id).count();
        let in_ctx = ctx.similar_devices.iter().any(|d| d == fp);
        if in_ctx || others > 0 {
            score += 0.5;
            let accounts = ctx.similar_devices.len().max(others + 1);
            evidence.push(format!("shared_device:{accounts}_accounts"));
        }
    }

    if let Some(ip) = p.ip_address.as_deref().filter(|s| !s.is_empty()) {
        let from_ctx   = ctx.accounts_per_ip.get(ip).copied().unwrap_or(0) as usize;
        let from_store = store.players_with_ip(ip).len();
        let accounts   = from_ctx.max(from_store);
        if accounts > 3 {
            score += 0.4;
            evidence.push(format!("shared_ip:{accounts}_accounts"));
        }
    }

    let similarity = if ctx.similar_players.is_empty() {
        0.0
    } else {
        (ctx.similar_players.len() as f64 * 0.1).min(0.9)
    };
    if similarity > 0.8 {
        score += 0.3;
        evidence.push(format!("behavioral_similarity:{:.0}%", similarity * 100.0));
    }
    (clamp01(score), evidence)
}

fn timing_consistency(times: &[f64]) -> f64 {
    if times.len() < 2 || mean(times) == 0.0 { return 0.0; }
    (1.0 - coefficient_of_variation(times)).max(0.0)
}

fn has_mechanical_interaction(p: &PlayerData) -> bool {
    let ip = &p.interaction_patterns;
    (ip.click_intervals.len() > 3 && std_dev(&ip.click_intervals) < 0.1)
        || ip.movement_patterns.perfect_linearity
}

/// Mean gap between recent solves below a minute.
fn rapid_succession(p: &PlayerData) -> Option<f64> {
    let mut ts = p.recent_solve_times.clone();
    if ts.len() < 2 { return None; }
    ts.sort_by(f64::total_cmp);
    let gaps: Vec<f64> = ts.windows(2).map(|w| w[1] - w[0]).collect();
    let avg = mean(&gaps);
    (avg < RAPID_SUCCESSION_S).then_some(avg)
}

fn automation(p: &PlayerData) -> (f64, Vec<String>) {
    let mut score    = 0.0;
    let mut evidence = Vec::new();

    if p.solving_times.len() > 5 {
        let c = timing_consistency(&p.solving_times);
        if c > 0.9 {
            score += 0.7;
            evidence.push(format!("scripted_timing:{c:.2}"));
        }
    }

    let efficiency = p.movement_efficiency.unwrap_or(0.0);
    if efficiency > 0.98 {
        score += 0.6;
        evidence.push(format!("perfect_movement_efficiency:{efficiency:.3}"));
    }

    if has_mechanical_interaction(p) {
        score += 0.5;
        evidence.push("mechanical_interaction".into());
    }

    let success = p.success_rate.unwrap_or(0.5);
    if let Some(avg) = p.mean_solving_time().filter(|a| *a < 30.0) {
        if success > 0.95 {
            score += 0.3;
            evidence.push(format!("superhuman_accuracy:{:.0}%@{avg:.1}s", success * 100.0));
        }
    }

    if let Some(gap) = rapid_succession(p) {
        evidence.push(format!("rapid_succession:{gap:.1}s"));
    }
    (clamp01(score), evidence)
}

fn collaborative(p: &PlayerData, ctx: &GameContext, store: &PlayerStore) -> (f64, Vec<String>) {
    let mut score    = 0.0;
    let mut evidence = Vec::new();

    let comms = &p.communication_patterns;
    if comms.message_frequency > 10.0 && comms.solution_sharing > 5.0 {
        score += 0.5;
        evidence.push(format!(
            "information_sharing:msgs={:.0},shares={:.0}",
            comms.message_frequency, comms.solution_sharing
        ));
    }

    if p.player_id.as_ref().map(|id| ctx.coordinated_actions.contains(id)).unwrap_or(false) {
        score += 0.4;
        evidence.push("coordinated_solves".into());
    }

    let (degree, density) = store.social_stats(p.id());
    let connections = degree.max(p.social_connections.len());
    if connections > 10 && density > 0.8 {
        score += 0.3;
        evidence.push(format!("dense_social_cluster:{connections}@{density:.2}"));
    }
    (clamp01(score), evidence)
}

// ── Detector ──────────────────────────────────────────────────────────────────

pub struct FraudDetector {
    impossible_kmh:       f64,
    suspicious_threshold: f64,
}

impl FraudDetector {
    pub fn new(cfg: &ScoringConfig) -> Self {
        Self {
            impossible_kmh:       cfg.impossible_speed_kmh,
            suspicious_threshold: cfg.suspicious_risk_threshold,
        }
    }

    /// Score one pattern without touching pattern history.
    pub fn score_pattern(
        &self,
        pattern: FraudPattern,
        p:       &PlayerData,
        ctx:     &GameContext,
        store:   &PlayerStore,
    ) -> (f64, Vec<String>) {
        match pattern {
            FraudPattern::SpeedHacking          => speed_hacking(p),
            FraudPattern::LocationSpoofing      => location_spoofing(p, self.impossible_kmh),
            FraudPattern::MultipleAccounts      => multiple_accounts(p, ctx, store),
            FraudPattern::AutomationDetection   => automation(p),
            FraudPattern::CollaborativeCheating => collaborative(p, ctx, store),
        }
    }

    pub fn analyze(&self, store: &PlayerStore, p: &PlayerData, ctx: &GameContext) -> FraudReport {
        self.analyze_at(store, p, ctx, Utc::now())
    }

    pub fn analyze_at(
        &self,
        store: &PlayerStore,
        p:     &PlayerData,
        ctx:   &GameContext,
        now:   DateTime<Utc>,
    ) -> FraudReport {
        let mut pattern_scores = BTreeMap::new();
        let mut evidence       = BTreeMap::new();
        let mut detected       = Vec::new();

        for spec in CATALOG {
            let (score, ev) = self.score_pattern(spec.pattern, p, ctx, store);
            pattern_scores.insert(spec.pattern, round4(score));
            if score >= spec.threshold {
                detected.push(spec.pattern);
                evidence.insert(spec.pattern, ev);
            }
        }

        let total_w: f64 = CATALOG.iter().map(|s| s.weight).sum();
        let overall = CATALOG.iter()
            .map(|s| pattern_scores.get(&s.pattern).copied().unwrap_or(0.0) * s.weight)
            .sum::<f64>() / total_w;

        let mut recommendations: Vec<String> =
            detected.iter().map(|d| d.spec().recommendation.to_string()).collect();
        if recommendations.is_empty() {
            recommendations.push("No immediate action required".into());
        }
        let mitigations = detected.iter()
            .map(|d| Mitigation { pattern: *d, action: d.spec().mitigation })
            .collect();

        let points     = p.solving_times.len() + track(p).len();
        let confidence = (points as f64 / 20.0).min(1.0);

        let id = p.id().to_string();
        if !detected.is_empty() {
            store.record_patterns(PatternDetection {
                player_id:    id.clone(),
                patterns:     detected.iter().map(|d| d.to_string()).collect(),
                overall_risk: round4(overall),
                timestamp:    now,
            });
        }

        let suspicious_activity_id = (overall > self.suspicious_threshold).then(|| {
            let activity_id = format!("{:x}", md5::compute(format!("{id}:{}", now.to_rfc3339())));
            warn!(player_id = %id, risk = overall, patterns = ?detected, "suspicious activity logged");
            store.log_suspicious(SuspiciousActivity {
                activity_id:       activity_id.clone(),
                player_id:         id.clone(),
                risk_score:        round4(overall),
                detected_patterns: detected.iter().map(|d| d.to_string()).collect(),
                timestamp:         now,
            });
            activity_id
        });

        if !detected.is_empty() {
            info!(player_id = %id, risk = overall, patterns = ?detected, "fraud patterns detected");
        }

        FraudReport {
            player_id:          id,
            overall_risk_score: round4(overall),
            detected_patterns:  detected,
            pattern_scores,
            evidence,
            recommendations,
            mitigations,
            confidence:         round4(confidence),
            suspicious_activity_id,
            timestamp:          now,
        }
    }

    /// Detection counts per pattern over the retained global log.
    pub fn pattern_statistics(&self, store: &PlayerStore) -> BTreeMap<FraudPattern, PatternStats> {
        let now    = Utc::now();
        let all    = store.detections_since(DateTime::<Utc>::MIN_UTC);
        let cutoff = now - Duration::hours(24);

        let mut out = BTreeMap::new();
        for pattern in FraudPattern::ALL {
            let name = pattern.to_string();
            let hits: Vec<&PatternDetection> =
                all.iter().filter(|d| d.patterns.iter().any(|p| *p == name)).collect();
            if hits.is_empty() { continue; }
            let recent = hits.iter().filter(|d| d.timestamp >= cutoff).count();
            out.insert(pattern, PatternStats {
                total_detections:      hits.len(),
                recent_detections_24h: recent,
                detection_rate:        round4(recent as f64 / 24.0),
            });
        }
        out
    }
}
