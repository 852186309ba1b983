// huntwarden/src/location/mod.rs
//
// Multi-signal location verifier.
//
// Five independent checks run concurrently and are combined with static
// weights into one confidence:
//
//   GPS 0.40 · WiFi 0.25 · Cell 0.20 · Bluetooth 0.10 · IP 0.05
//
// Verified ⇔ confidence ≥ verification threshold (0.7 by default).

pub mod checks;
pub mod movement;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::events::LocationData;
use crate::geo::{round4, GeoPoint};

pub use checks::MethodResult;
pub use movement::{verify_movement, MovementAnalysis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMethod {
    Gps,
    Wifi,
    Cell,
    Bluetooth,
    Ip,
}

pub const WEIGHTS: &[(LocationMethod, f64)] = &[
    (LocationMethod::Gps,       0.40),
    (LocationMethod::Wifi,      0.25),
    (LocationMethod::Cell,      0.20),
    (LocationMethod::Bluetooth, 0.10),
    (LocationMethod::Ip,        0.05),
];

#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    pub verified:             bool,
    pub overall_confidence:   f64,
    pub verification_methods: BTreeMap<LocationMethod, MethodResult>,
    pub risk_factors:         Vec<String>,
    pub recommendations:      Vec<String>,
    pub timestamp:            DateTime<Utc>,
}

impl LocationReport {
    pub fn method(&self, m: LocationMethod) -> Option<&MethodResult> {
        self.verification_methods.get(&m)
    }
}

fn detail_bool(r: Option<&MethodResult>, key: &str) -> bool {
    r.and_then(|r| r.detail.get(key)).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn detail_count(r: Option<&MethodResult>, key: &str) -> u64 {
    r.and_then(|r| r.detail.get(key)).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn risk_factors(methods: &BTreeMap<LocationMethod, MethodResult>) -> Vec<String> {
    let gps  = methods.get(&LocationMethod::Gps);
    let wifi = methods.get(&LocationMethod::Wifi);
    let ip   = methods.get(&LocationMethod::Ip);

    let mut out = Vec::new();
    if gps.map(|g| g.confidence).unwrap_or(0.0) < 0.3 {
        out.push("low_gps_confidence".to_string());
    }
    if gps.map(|g| g.issues.iter().any(|i| i.to_lowercase().contains("mock"))).unwrap_or(false) {
        out.push("mock_location_detected".to_string());
    }
    if detail_count(wifi, "network_count") == 0 {
        out.push("no_wifi_networks".to_string());
    }
    if detail_bool(ip, "is_vpn")   { out.push("vpn_usage".to_string()); }
    if detail_bool(ip, "is_proxy") { out.push("proxy_usage".to_string()); }
    out
}

fn recommendations(methods: &BTreeMap<LocationMethod, MethodResult>) -> Vec<String> {
    let gps  = methods.get(&LocationMethod::Gps);
    let wifi = methods.get(&LocationMethod::Wifi);
    let ip   = methods.get(&LocationMethod::Ip);

    let mut out = Vec::new();
    if gps.map(|g| g.confidence).unwrap_or(0.0) < 0.6 {
        out.push("Improve GPS signal by moving to open area".to_string());
    }
    if detail_count(wifi, "network_count") < 3 {
        out.push("Connect to more WiFi networks for better accuracy".to_string());
    }
    if detail_bool(ip, "is_vpn") {
        out.push("Disable VPN for more accurate location verification".to_string());
    }
    if out.is_empty() {
        out.push("Location verification is strong".to_string());
    }
    out
}

pub struct LocationVerifier {
    threshold:     f64,
    unnatural_mps: f64,
}

impl LocationVerifier {
    pub fn new(cfg: &ScoringConfig) -> Self {
        Self {
            threshold:     cfg.verification_threshold,
            unnatural_mps: cfg.unnatural_speed_mps,
        }
    }

    pub async fn verify(&self, data: &LocationData) -> LocationReport {
        let (gps, wifi, cell, bt, ip) = tokio::join!(
            checks::gps(data),
            checks::wifi(data),
            checks::cell(data),
            checks::bluetooth(data),
            checks::ip(data),
        );

        let methods: BTreeMap<LocationMethod, MethodResult> = [
            (LocationMethod::Gps,       gps),
            (LocationMethod::Wifi,      wifi),
            (LocationMethod::Cell,      cell),
            (LocationMethod::Bluetooth, bt),
            (LocationMethod::Ip,        ip),
        ].into_iter().collect();

        let confidence: f64 = WEIGHTS.iter()
            .map(|(m, w)| methods.get(m).map(|r| r.confidence).unwrap_or(0.0) * w)
            .sum();
        let confidence = round4(confidence.clamp(0.0, 1.0));

        debug!(confidence, "location verified");

        LocationReport {
            verified:             confidence >= self.threshold,
            overall_confidence:   confidence,
            risk_factors:         risk_factors(&methods),
            recommendations:      recommendations(&methods),
            verification_methods: methods,
            timestamp:            Utc::now(),
        }
    }

    pub fn verify_movement(&self, history: &[GeoPoint]) -> MovementAnalysis {
        verify_movement(history, self.unnatural_mps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CellTower, WifiNetwork};
    use serde_json::json;

    fn verifier() -> LocationVerifier { LocationVerifier::new(&ScoringConfig::default()) }

    fn strong() -> LocationData {
        let mut d = LocationData::default();
        d.gps.latitude        = Some(51.500_729);
        d.gps.longitude       = Some(-0.124_625);
        d.gps.accuracy        = Some(4.0);
        d.gps.satellite_count = 14;
        d.gps.signal_strength = Some(-60.0);
        d.gps.altitude        = Some(20.0);
        d.wifi.networks = (0..6)
            .map(|i| WifiNetwork { ssid: format!("net{i}"), signal_strength: -55.0 })
            .collect();
        d.cell.towers = (0..3)
            .map(|_| CellTower { provider: "o2".into(), signal_strength: -70.0 })
            .collect();
        d.bluetooth.devices = vec![json!(1), json!(2), json!(3)];
        d.ip.address = "198.51.100.4".into();
        d.ip.latitude = Some(51.51);
        d.ip.longitude = Some(-0.13);
        d
    }

    #[test]
    fn weights_sum_to_one() {
        let total: f64 = WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn all_signals_strong_is_verified() {
        let r = verifier().verify(&strong()).await;
        assert!(r.verified, "confidence={}", r.overall_confidence);
        assert!(r.risk_factors.is_empty());
        assert_eq!(r.recommendations, vec!["Location verification is strong".to_string()]);
        assert_eq!(r.verification_methods.len(), 5);
    }

    #[tokio::test]
    async fn empty_request_is_unverified_with_risks() {
        let r = verifier().verify(&LocationData::default()).await;
        assert_eq!(r.overall_confidence, 0.0);
        assert!(!r.verified);
        assert!(r.risk_factors.contains(&"low_gps_confidence".to_string()));
        assert!(r.risk_factors.contains(&"no_wifi_networks".to_string()));
    }

    #[tokio::test]
    async fn vpn_and_mock_are_reported() {
        let mut d = strong();
        d.gps.is_mock_provider = true;
        d.ip.is_vpn = true;
        let r = verifier().verify(&d).await;
        assert!(r.risk_factors.contains(&"mock_location_detected".to_string()));
        assert!(r.risk_factors.contains(&"vpn_usage".to_string()));
        assert!(!r.verified);
    }
}
