// huntwarden/src/workers/behavior.rs
//
// Behavior worker: schema-B isolation forest + learning trajectory.
//
// The forest score is mapped onto an anomaly level in [0,1] using how far it
// sits from the outlier threshold, then inverted into a trust contribution.
// A player whose solving times climb steeply ("concerning") loses 30 %.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::anomaly::AnomalyDetector;
use crate::events::{CheckKind, CheckSignal, VerificationRequest};
use crate::geo::{linear_slope, round4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trajectory {
    RapidLearner,
    Improving,
    Stable,
    SlightImprovement,
    Concerning,
}

impl Trajectory {
    /// Slope is seconds per solve; negative means getting faster.
    pub fn from_slope(slope: f64) -> Self {
        if slope < -10.0 { Self::RapidLearner }
        else if slope < -2.0 { Self::Improving }
        else if slope.abs() <= 2.0 { Self::Stable }
        else if slope > 10.0 { Self::Concerning }
        else { Self::SlightImprovement }
    }
}

pub async fn analyze(req: &VerificationRequest, detector: &AnomalyDetector) -> CheckSignal {
    let player = &req.player_data;
    let m = detector.behavior_score(player);

    let anomaly = if m.is_outlier { 0.5 + 0.5 * m.confidence } else { 0.5 * (1.0 - m.confidence) };
    let slope      = linear_slope(&player.solving_times);
    let trajectory = Trajectory::from_slope(slope);

    let mut score    = (1.0 - anomaly).max(0.0);
    let mut evidence = Vec::new();
    if m.is_outlier {
        evidence.push(format!("behavior_outlier:{:.3}", m.score));
    }
    if trajectory == Trajectory::Concerning {
        score *= 0.7;
        evidence.push(format!("concerning_trajectory:{slope:+.1}s/solve"));
    }

    CheckSignal {
        kind:       CheckKind::Behavior,
        player_id:  player.id().to_string(),
        score:      round4(score),
        confidence: round4(m.confidence),
        evidence,
        detail: json!({
            "anomaly_score":       round4(anomaly),
            "model_score":         round4(m.score),
            "is_outlier":          m.is_outlier,
            "learning_trajectory": trajectory,
            "trajectory_slope":    round4(slope),
        }),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trajectory_bands() {
        assert_eq!(Trajectory::from_slope(-15.0), Trajectory::RapidLearner);
        assert_eq!(Trajectory::from_slope(-5.0),  Trajectory::Improving);
        assert_eq!(Trajectory::from_slope(1.5),   Trajectory::Stable);
        assert_eq!(Trajectory::from_slope(-2.0),  Trajectory::Stable);
        assert_eq!(Trajectory::from_slope(6.0),   Trajectory::SlightImprovement);
        assert_eq!(Trajectory::from_slope(12.0),  Trajectory::Concerning);
    }
}
