// huntwarden/src/workers/temporal.rs
//
// Temporal worker: playing-hours regularity.
//
// Session start hours are treated as angles on a 24 h clock. Regularity is the
// share of sessions within ±2 h of the circular mean hour; a player who always
// starts around the same time scores 1.0. Without hour samples the reported
// `usual_playing_hours` flag stands in (0.9 / 0.5). Mostly-overnight play
// (00:00–05:59) costs 10 %.

use std::f64::consts::TAU;

use chrono::Utc;
use serde_json::json;

use crate::events::{CheckKind, CheckSignal, VerificationRequest};
use crate::geo::{mean, round4};

const BAND_HOURS: f64 = 2.0;

fn circular_mean_hour(hours: &[u32]) -> f64 {
    let (s, c) = hours.iter().fold((0.0, 0.0), |(s, c), h| {
        let a = (*h % 24) as f64 / 24.0 * TAU;
        (s + a.sin(), c + a.cos())
    });
    (s.atan2(c).rem_euclid(TAU)) / TAU * 24.0
}

fn clock_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % 24.0;
    d.min(24.0 - d)
}

/// Share of hours within ±2 h of their circular mean.
pub fn hour_regularity(hours: &[u32]) -> f64 {
    if hours.is_empty() { return 0.0; }
    let m = circular_mean_hour(hours);
    let close = hours.iter().filter(|h| clock_distance((**h % 24) as f64, m) <= BAND_HOURS).count();
    close as f64 / hours.len() as f64
}

pub async fn analyze(req: &VerificationRequest) -> CheckSignal {
    let player = &req.player_data;
    let hours  = &player.session_start_hours;

    let regularity = if hours.len() >= 3 {
        hour_regularity(hours)
    } else if player.usual_playing_hours.unwrap_or(true) {
        0.9
    } else {
        0.5
    };

    let mut evidence = Vec::new();
    let mut score = mean(&[
        regularity,
        player.session_length_consistency.unwrap_or(0.7),
        player.play_frequency_consistency.unwrap_or(0.6),
    ]);

    if regularity < 0.5 {
        evidence.push(format!("irregular_hours:{regularity:.2}"));
    }
    let night = hours.iter().filter(|h| **h % 24 < 6).count();
    if !hours.is_empty() && night * 2 > hours.len() {
        score *= 0.9;
        evidence.push(format!("overnight_sessions:{}/{}", night, hours.len()));
    }

    CheckSignal {
        kind:       CheckKind::Temporal,
        player_id:  player.id().to_string(),
        score:      round4(score.clamp(0.0, 1.0)),
        confidence: if hours.is_empty() { 0.3 } else { (hours.len() as f64 / 10.0).min(1.0) },
        evidence,
        detail: json!({
            "hour_regularity": round4(regularity),
            "sessions":        hours.len(),
        }),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_evenings_wrap_midnight() {
        assert_eq!(hour_regularity(&[23, 0, 1, 23, 22]), 1.0);
        assert!(hour_regularity(&[0, 6, 12, 18]) < 0.5);
    }

    #[tokio::test]
    async fn overnight_bot_schedule_is_penalised() {
        let mut req = VerificationRequest::default();
        req.player_data.session_start_hours = vec![3, 3, 3, 3, 3];
        let s = analyze(&req).await;
        // mean(1.0, 0.7, 0.6) × 0.9
        assert!((s.score - round4(0.69)).abs() < 1e-9);
        assert!(s.evidence.iter().any(|e| e.starts_with("overnight_sessions")));
    }
}
