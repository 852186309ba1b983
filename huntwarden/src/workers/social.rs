// huntwarden/src/workers/social.rs
//
// Social worker: reputation signals plus the player's position in the
// declared social graph. A large, near-complete neighbourhood is the shape
// of a coordinated ring; coordinated actions reported by the backend halve
// the score outright.

use chrono::Utc;
use serde_json::json;

use crate::events::{CheckKind, CheckSignal, VerificationRequest};
use crate::geo::{mean, round4};
use crate::state::store::PlayerStore;

const RING_MIN_DEGREE:  usize = 10;
const RING_MIN_DENSITY: f64   = 0.8;

pub async fn analyze(req: &VerificationRequest, store: &PlayerStore) -> CheckSignal {
    let player = &req.player_data;
    let id     = player.id();

    let reports = player.reports_received.unwrap_or(0) as f64;
    let mut score = mean(&[
        player.collaboration_score.unwrap_or(0.5),
        player.communication_quality.unwrap_or(0.5),
        1.0 - (reports * 0.1).min(0.5),
    ]);
    let mut evidence = Vec::new();

    let (degree, density) = store.social_stats(id);
    if degree > RING_MIN_DEGREE && density > RING_MIN_DENSITY {
        score *= 0.6;
        evidence.push(format!("dense_cluster:{degree}@{density:.2}"));
    }
    if req.game_context.coordinated_actions.iter().any(|a| a == id) {
        score *= 0.5;
        evidence.push("coordinated_actions".into());
    }

    CheckSignal {
        kind:       CheckKind::Social,
        player_id:  id.to_string(),
        score:      round4(score.clamp(0.0, 1.0)),
        confidence: if degree > 0 { 0.7 } else { 0.4 },
        evidence,
        detail: json!({
            "connections":     degree,
            "network_density": round4(density),
        }),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PlayerData;

    #[tokio::test]
    async fn complete_ring_is_penalised() {
        let store = PlayerStore::new();
        let now = Utc::now();
        let members: Vec<String> = (0..12).map(|i| format!("r{i}")).collect();
        for m in &members {
            store.ingest(&PlayerData {
                player_id:          Some(m.clone()),
                social_connections: members.iter().filter(|o| *o != m).cloned().collect(),
                ..Default::default()
            }, now);
        }
        let mut req = VerificationRequest::default();
        req.player_data.player_id = Some("r0".into());
        let s = analyze(&req, &store).await;
        // mean(0.5, 0.5, 1.0) × 0.6
        assert!((s.score - 0.4).abs() < 1e-9);
        assert_eq!(s.detail["connections"], json!(11));
    }

    #[tokio::test]
    async fn isolated_player_keeps_reputation_score() {
        let store = PlayerStore::new();
        let mut req = VerificationRequest::default();
        req.player_data.collaboration_score = Some(0.9);
        req.player_data.communication_quality = Some(0.9);
        let s = analyze(&req, &store).await;
        assert!((s.score - round4(2.8 / 3.0)).abs() < 1e-9);
        assert!(s.evidence.is_empty());
    }
}
