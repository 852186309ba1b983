// huntwarden/src/fraud/catalog.rs
//
// Static catalog of named cheat signatures. Read-only after compile.
//
//   pattern                  threshold  weight  mitigation
//   speed_hacking              0.80      0.90   throttle_submissions
//   location_spoofing          0.70      0.80   require_additional_verification
//   multiple_accounts          0.60      0.70   link_accounts_for_review
//   automation_detection       0.75      0.85   require_captcha_verification
//   collaborative_cheating     0.65      0.60   monitor_social_interactions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudPattern {
    SpeedHacking,
    LocationSpoofing,
    MultipleAccounts,
    AutomationDetection,
    CollaborativeCheating,
}

pub struct PatternSpec {
    pub pattern:        FraudPattern,
    pub threshold:      f64,
    pub weight:         f64,
    pub description:    &'static str,
    pub indicators:     &'static [&'static str],
    pub mitigation:     &'static str,
    pub recommendation: &'static str,
}

pub const CATALOG: &[PatternSpec] = &[
    PatternSpec {
        pattern:        FraudPattern::SpeedHacking,
        threshold:      0.80,
        weight:         0.90,
        description:    "Solving clues unrealistically fast",
        indicators:     &["avg_solving_time < 30", "success_rate > 0.95"],
        mitigation:     "throttle_submissions",
        recommendation: "Monitor solving times and implement rate limiting",
    },
    PatternSpec {
        pattern:        FraudPattern::LocationSpoofing,
        threshold:      0.70,
        weight:         0.80,
        description:    "Fake location data",
        indicators:     &["impossible_movements", "gps_inconsistencies", "mock_provider"],
        mitigation:     "require_additional_verification",
        recommendation: "Require additional location verification",
    },
    PatternSpec {
        pattern:        FraudPattern::MultipleAccounts,
        threshold:      0.60,
        weight:         0.70,
        description:    "Multiple accounts from same user",
        indicators:     &["same_device_id", "shared_ip", "similar_behavior"],
        mitigation:     "link_accounts_for_review",
        recommendation: "Investigate device and IP patterns",
    },
    PatternSpec {
        pattern:        FraudPattern::AutomationDetection,
        threshold:      0.75,
        weight:         0.85,
        description:    "Bot-like behavior patterns",
        indicators:     &["consistent_timing", "perfect_precision", "mechanical_interaction"],
        mitigation:     "require_captcha_verification",
        recommendation: "Implement CAPTCHA or behavioral challenges",
    },
    PatternSpec {
        pattern:        FraudPattern::CollaborativeCheating,
        threshold:      0.65,
        weight:         0.60,
        description:    "Group cheating patterns",
        indicators:     &["information_sharing", "coordinated_solves", "dense_social_cluster"],
        mitigation:     "monitor_social_interactions",
        recommendation: "Monitor social interactions and solution sharing",
    },
];

impl FraudPattern {
    pub const ALL: [FraudPattern; 5] = [
        Self::SpeedHacking,
        Self::LocationSpoofing,
        Self::MultipleAccounts,
        Self::AutomationDetection,
        Self::CollaborativeCheating,
    ];

    pub fn spec(self) -> &'static PatternSpec {
        // CATALOG is declared in ALL order
        &CATALOG[self as usize]
    }
}

impl std::fmt::Display for FraudPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpeedHacking          => write!(f, "speed_hacking"),
            Self::LocationSpoofing      => write!(f, "location_spoofing"),
            Self::MultipleAccounts      => write!(f, "multiple_accounts"),
            Self::AutomationDetection   => write!(f, "automation_detection"),
            Self::CollaborativeCheating => write!(f, "collaborative_cheating"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_matches_enum() {
        for p in FraudPattern::ALL {
            assert_eq!(p.spec().pattern, p);
        }
        assert_eq!(CATALOG.len(), FraudPattern::ALL.len());
    }

    #[test]
    fn display_matches_serde_name() {
        for p in FraudPattern::ALL {
            let json = serde_json::to_value(p).unwrap();
            assert_eq!(json.as_str().unwrap(), p.to_string());
        }
    }
}
