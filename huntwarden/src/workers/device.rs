// huntwarden/src/workers/device.rs
//
// Device worker: reported device/connection consistency, discounted when the
// fingerprint or IP is shared with other accounts in the store.

use chrono::Utc;
use serde_json::json;

use crate::events::{CheckKind, CheckSignal, VerificationRequest};
use crate::geo::{mean, round4};
use crate::state::store::PlayerStore;

pub async fn analyze(req: &VerificationRequest, store: &PlayerStore) -> CheckSignal {
    let player = &req.player_data;
    let id     = player.id();

    let mut score = mean(&[
        player.device_consistency.unwrap_or(0.8),
        player.connection_stability.unwrap_or(0.7),
    ]);
    let mut evidence = Vec::new();

    let fingerprint = player.device_fingerprint.as_deref().filter(|s| !s.is_empty());
    let others_on_device = fingerprint
        .map(|fp| store.players_with_device(fp).iter().filter(|o| o.as_str() != id).count())
        .unwrap_or(0);
    let in_context = fingerprint
        .map(|fp| req.game_context.similar_devices.iter().any(|d| d == fp))
        .unwrap_or(false);

    let shared = others_on_device > 0 || in_context;
    if shared {
        score *= (1.0 - 0.2 * others_on_device.max(1) as f64).max(0.3);
        evidence.push(format!("shared_device:{}_other_accounts", others_on_device.max(1)));
    }

    let ip_accounts = player.ip_address.as_deref()
        .filter(|s| !s.is_empty())
        .map(|ip| store.players_with_ip(ip).len())
        .unwrap_or(0);
    if ip_accounts > 3 {
        score *= 0.8;
        evidence.push(format!("crowded_ip:{ip_accounts}_accounts"));
    }

    CheckSignal {
        kind:       CheckKind::Device,
        player_id:  id.to_string(),
        score:      round4(score.clamp(0.0, 1.0)),
        confidence: if fingerprint.is_some() { 0.8 } else { 0.4 },
        evidence,
        detail: json!({
            "shared_device":    shared,
            "accounts_on_device": others_on_device + usize::from(fingerprint.is_some()),
            "accounts_on_ip":   ip_accounts,
        }),
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PlayerData;

    #[tokio::test]
    async fn shared_fingerprint_is_discounted() {
        let store = PlayerStore::new();
        let now = Utc::now();
        for id in ["main", "alt1", "alt2"] {
            store.ingest(&PlayerData {
                player_id:          Some(id.into()),
                device_fingerprint: Some("fp-9".into()),
                ..Default::default()
            }, now);
        }
        let mut req = VerificationRequest::default();
        req.player_data.player_id = Some("main".into());
        req.player_data.device_fingerprint = Some("fp-9".into());
        req.player_data.device_consistency = Some(1.0);
        req.player_data.connection_stability = Some(1.0);

        let s = analyze(&req, &store).await;
        assert!((s.score - 0.6).abs() < 1e-9);
        assert_eq!(s.detail["shared_device"], json!(true));
        assert_eq!(s.detail["accounts_on_device"], json!(3));
    }

    #[tokio::test]
    async fn unknown_device_uses_defaults() {
        let store = PlayerStore::new();
        let s = analyze(&VerificationRequest::default(), &store).await;
        assert!((s.score - 0.75).abs() < 1e-9);
        assert_eq!(s.confidence, 0.4);
    }
}
