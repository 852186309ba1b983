// huntwarden/src/location/movement.rs
//
// Naturalness of a movement track. Starts at 1.0 and is multiplied down:
//   × 0.5 per segment faster than the unnatural-speed limit (m/s)
//   × 0.7 for a straight line (bearing variance < 10, ≥ 4 fixes)
//   × 0.8 for repetition (duplicate-fix ratio > 0.3, ≥ 6 fixes)
// Natural ⇔ result ≥ 0.6. Fewer than 3 fixes is inconclusive (0.5, natural).

use std::collections::HashSet;

use serde::Serialize;

use crate::geo::{initial_bearing_deg, speed_mps, variance, GeoPoint};

const MIN_POINTS:          usize = 3;
const STRAIGHT_MIN_POINTS: usize = 4;
const REPEAT_MIN_POINTS:   usize = 6;

#[derive(Debug, Clone, Serialize)]
pub struct MovementAnalysis {
    pub natural_movement: bool,
    pub confidence:       f64,
    pub issues:           Vec<String>,
    pub data_points:      usize,
}

fn is_straight_line(points: &[GeoPoint]) -> bool {
    if points.len() < STRAIGHT_MIN_POINTS { return false; }
    let bearings: Vec<f64> = points.windows(2).map(|w| initial_bearing_deg(&w[0], &w[1])).collect();
    variance(&bearings) < 10.0
}

fn is_repetitive(points: &[GeoPoint]) -> bool {
    if points.len() < REPEAT_MIN_POINTS { return false; }
    let unique: HashSet<(u64, u64)> = points.iter().map(|p| (p.lat.to_bits(), p.lon.to_bits())).collect();
    1.0 - unique.len() as f64 / points.len() as f64 > 0.3
}

pub fn verify_movement(points: &[GeoPoint], unnatural_mps: f64) -> MovementAnalysis {
    if points.len() < MIN_POINTS {
        return MovementAnalysis {
            natural_movement: true,
            confidence:       0.5,
            issues:           vec!["Insufficient movement data".into()],
            data_points:      points.len(),
        };
    }

    let mut score  = 1.0;
    let mut issues = Vec::new();

    for w in points.windows(2) {
        if let Some(v) = speed_mps(&w[0], &w[1]).filter(|v| *v > unnatural_mps) {
            issues.push(format!("Unnatural movement speed: {v:.1}m/s"));
            score *= 0.5;
        }
    }
    if is_straight_line(points) {
        issues.push("Suspiciously straight movement pattern".into());
        score *= 0.7;
    }
    if is_repetitive(points) {
        issues.push("Repetitive movement patterns detected".into());
        score *= 0.8;
    }

    MovementAnalysis {
        natural_movement: score >= 0.6,
        confidence:       score,
        issues,
        data_points:      points.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_track_is_inconclusive() {
        let r = verify_movement(&[GeoPoint::new(1.0, 1.0, 0.0)], 50.0);
        assert!(r.natural_movement);
        assert_eq!(r.confidence, 0.5);
    }

    #[test]
    fn straight_walk_is_penalised_once() {
        // Due north, ~111 m per minute
        let pts: Vec<GeoPoint> = (0..5)
            .map(|i| GeoPoint::new(10.0 + i as f64 * 0.001, 20.0, i as f64 * 60.0))
            .collect();
        let r = verify_movement(&pts, 50.0);
        assert!((r.confidence - 0.7).abs() < 1e-12);
        assert!(r.natural_movement);
    }

    #[test]
    fn teleport_and_loop() {
        let a = GeoPoint::new(10.0, 20.0, 0.0);
        let b = GeoPoint::new(10.5, 20.5, 10.0);
        let pts = vec![a, b, GeoPoint { timestamp: 20.0, ..a }];
        let r = verify_movement(&pts, 50.0);
        // two segments of ~78 km in 10 s
        assert!((r.confidence - 0.25).abs() < 1e-12);
        assert!(!r.natural_movement);
        assert_eq!(r.issues.len(), 2);
    }

    #[test]
    fn duplicates_flag_repetition() {
        let base = [(0.0, 0.0), (0.001, 0.0), (0.001, 0.001), (0.0, 0.001)];
        let pts: Vec<GeoPoint> = (0..8)
            .map(|i| {
                let (dy, dx) = base[i % 4];
                GeoPoint::new(10.0 + dy, 20.0 + dx, i as f64 * 120.0)
            })
            .collect();
        assert!(is_repetitive(&pts));
        assert!(!is_straight_line(&pts));
    }
}
