// huntwarden/src/workers/location.rs
//
// Location authenticity worker.
//
//   gps_trust              fix quality from reported accuracy
//   movement_plausibility  1 − 0.3 per segment above the impossible speed
//   spoofing indicators    mock provider, teleports, rounded fixes, VPN/proxy
//
// Score = mean(gps_trust, movement_plausibility, max(0.1, 1 − 0.2·indicators)),
// the same shape the trust aggregator expects for its location component.

use chrono::Utc;
use serde_json::json;

use crate::events::{CheckKind, CheckSignal, VerificationRequest};
use crate::geo::{impossible_segments, mean, point_is_rounded, round4, rounded_ratio};

pub async fn analyze(req: &VerificationRequest, impossible_kmh: f64) -> CheckSignal {
    let player = &req.player_data;
    let gps    = &req.location_data.gps;
    let track  = &player.location_data.movement_history;

    let accuracy = gps.accuracy.or(player.location_data.gps_accuracy);
    let gps_trust = match accuracy {
        Some(a) if a < 10.0  => 1.0,
        Some(a) if a < 50.0  => 0.8,
        Some(a) if a < 100.0 => 0.6,
        Some(_)              => 0.3,
        None                 => 0.5,
    };

    let jumps = impossible_segments(track, impossible_kmh);
    let plausibility = (1.0 - 0.3 * jumps.len() as f64).max(0.0);

    let mut indicators: Vec<String> = Vec::new();
    if gps.is_mock_provider || player.location_data.is_mock_provider {
        indicators.push("mock_location_provider".into());
    }
    if !jumps.is_empty() {
        indicators.push(format!("impossible_movement:{}", jumps.len()));
    }
    let rounded_fix = gps.point().map(|p| point_is_rounded(&p)).unwrap_or(false);
    if rounded_fix || (!track.is_empty() && rounded_ratio(track) > 0.5) {
        indicators.push("rounded_coordinates".into());
    }
    if req.location_data.ip.is_vpn || req.location_data.ip.is_proxy {
        indicators.push("vpn_or_proxy".into());
    }

    let spoof = (1.0 - 0.2 * indicators.len() as f64).max(0.1);
    let score = mean(&[gps_trust, plausibility, spoof]);

    let confidence = if gps.has_fix() || !track.is_empty() { 0.9 } else { 0.3 };

    CheckSignal {
        kind:       CheckKind::Location,
        player_id:  player.id().to_string(),
        score:      round4(score),
        confidence,
        evidence:   indicators.clone(),
        detail: json!({
            "gps_trust":             gps_trust,
            "movement_plausibility": round4(plausibility),
            "spoofing_indicators":   indicators,
            "track_points":          track.len(),
        }),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    #[tokio::test]
    async fn clean_precise_fix_scores_high() {
        let mut req = VerificationRequest::default();
        req.location_data.gps.latitude  = Some(35.658_581);
        req.location_data.gps.longitude = Some(139.745_433);
        req.location_data.gps.accuracy  = Some(6.0);
        let s = analyze(&req, 500.0).await;
        assert_eq!(s.score, 1.0);
        assert!(s.evidence.is_empty());
    }

    #[tokio::test]
    async fn teleport_and_mock_are_indicators() {
        let mut req = VerificationRequest::default();
        req.player_data.location_data.is_mock_provider = true;
        req.player_data.location_data.movement_history = vec![
            GeoPoint::new(35.658_581, 139.745_433, 0.0),
            GeoPoint::new(48.858_370, 2.294_481, 30.0),
        ];
        let s = analyze(&req, 500.0).await;
        assert_eq!(s.evidence.len(), 2);
        // mean(0.5, 0.7, 0.6)
        assert!((s.score - 0.6).abs() < 1e-9);
        assert_eq!(s.detail["spoofing_indicators"].as_array().unwrap().len(), 2);
    }
}
