// huntwarden/src/engine/fusion.rs
//
// Weighted signal fusion for comprehensive verification.
//
// Weight distribution across 5 checks (sum = 1.00):
//   Behavior   0.35  isolation forest + learning trajectory
//   Location   0.25  GPS quality, movement plausibility, spoofing
//   Device     0.15  consistency + fingerprint sharing
//   Temporal   0.15  playing-hours regularity
//   Social     0.10  reputation + network density
//
// Composite is clamped to [0.1, 1.0] and rounded to 4 dp. Missing checks are
// dropped and the remaining weights renormalised.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::events::{CheckKind, CheckSignal, VerificationLevel, VerificationRequest};
use crate::geo::round4;
use crate::trust::{LocationEvidence, VerificationResults};

// Signal weights: must sum to 1.0
pub const WEIGHTS: &[(CheckKind, f64)] = &[
    (CheckKind::Behavior, 0.35),
    (CheckKind::Location, 0.25),
    (CheckKind::Device,   0.15),
    (CheckKind::Temporal, 0.15),
    (CheckKind::Social,   0.10),
];

const FLOOR:                  f64 = 0.1;
const HIGH_BEHAVIOR_ANOMALY:  f64 = 0.7;
const WEAK_LOCATION:          f64 = 0.6;
const RESTRICT_BELOW:         f64 = 0.4;

#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub request_id:         String,
    pub player_id:          String,
    pub trust_score:        f64,
    pub verification_level: VerificationLevel,
    pub check_scores:       BTreeMap<String, f64>,
    pub risk_factors:       Vec<String>,
    pub recommendations:    Vec<String>,
    pub evidence:           Vec<String>,
    pub checks:             Vec<CheckSignal>,
    pub timestamp:          DateTime<Utc>,
}

impl VerificationOutcome {
    /// Location findings in the shape the trust aggregator consumes.
    pub fn location_evidence(&self) -> VerificationResults {
        let detail = self.checks.iter()
            .find(|c| c.kind == CheckKind::Location)
            .map(|c| &c.detail);
        let num = |k: &str| detail.and_then(|d| d.get(k)).and_then(|v| v.as_f64());
        VerificationResults {
            location: LocationEvidence {
                gps_trust:             num("gps_trust"),
                movement_plausibility: num("movement_plausibility"),
                spoofing_indicators:   detail
                    .and_then(|d| d.get("spoofing_indicators"))
                    .and_then(|v| serde_json::from_value(v.clone()).ok())
                    .unwrap_or_default(),
            },
        }
    }
}

pub struct FusionEngine;

impl FusionEngine {
    pub fn new() -> Self { Self }

    pub fn fuse(&self, req: &VerificationRequest, signals: Vec<CheckSignal>) -> VerificationOutcome {
        let sig_map: HashMap<CheckKind, &CheckSignal> = signals.iter().map(|s| (s.kind, s)).collect();

        let mut composite = 0.0;
        let mut total_w   = 0.0;
        let mut scores    = BTreeMap::new();
        for (kind, weight) in WEIGHTS {
            if let Some(s) = sig_map.get(kind) {
                composite += s.score * weight;
                total_w   += weight;
                scores.insert(kind.to_string(), s.score);
            }
        }
        let composite = if total_w > 0.0 { composite / total_w } else { FLOOR };
        let composite = round4(composite.clamp(FLOOR, 1.0));

        let detail_f64 = |k: CheckKind, key: &str| {
            sig_map.get(&k).and_then(|s| s.detail.get(key)).and_then(|v| v.as_f64())
        };
        let detail_str = |k: CheckKind, key: &str| {
            sig_map.get(&k).and_then(|s| s.detail.get(key)).and_then(|v| v.as_str()).map(str::to_string)
        };

        let high_anomaly = detail_f64(CheckKind::Behavior, "anomaly_score")
            .map(|a| a > HIGH_BEHAVIOR_ANOMALY).unwrap_or(false);
        let concerning = detail_str(CheckKind::Behavior, "learning_trajectory").as_deref() == Some("concerning");
        let spoofing = sig_map.get(&CheckKind::Location)
            .map(|s| !s.evidence.is_empty()).unwrap_or(false);
        let shared_device = sig_map.get(&CheckKind::Device)
            .and_then(|s| s.detail.get("shared_device"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let mut risk_factors = Vec::new();
        if high_anomaly  { risk_factors.push("high_behavior_anomaly".to_string()); }
        if spoofing      { risk_factors.push("location_spoofing_suspected".to_string()); }
        if concerning    { risk_factors.push("suspicious_learning_pattern".to_string()); }
        if shared_device { risk_factors.push("shared_device".to_string()); }

        let mut recommendations = Vec::new();
        if scores.get("location").map(|s| *s < WEAK_LOCATION).unwrap_or(false) {
            recommendations.push("additional_location_verification".to_string());
        }
        if composite < RESTRICT_BELOW {
            recommendations.push("temporary_restriction".to_string());
            recommendations.push("manual_review".to_string());
        }
        if high_anomaly || concerning {
            recommendations.push("behavior_monitoring".to_string());
        }

        let evidence: Vec<String> = signals.iter()
            .flat_map(|s| s.evidence.iter().map(move |e| format!("{}:{}", s.kind, e)))
            .take(10)
            .collect();

        VerificationOutcome {
            request_id:         req.request_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
            player_id:          req.player_data.id().to_string(),
            trust_score:        composite,
            verification_level: VerificationLevel::from_trust(composite),
            check_scores:       scores,
            risk_factors,
            recommendations,
            evidence,
            checks:             signals,
            timestamp:          Utc::now(),
        }
    }
}

impl Default for FusionEngine { fn default() -> Self { Self::new() } }
