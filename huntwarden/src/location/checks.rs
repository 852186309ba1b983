// huntwarden/src/location/checks.rs
//
// One async check per location signal. Each reads only its own slice of the
// request and returns a confidence in [0,1] plus the issues it saw; none of
// them share state, so the verifier can join them freely.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::events::LocationData;
use crate::geo::{haversine_m, mean, GeoPoint};

const KNOWN_SSIDS: &[&str] = &["HomeNetwork", "OfficeWiFi", "PublicWiFi"];
const IP_MATCH_RADIUS_M: f64 = 50_000.0;

#[derive(Debug, Clone, Serialize)]
pub struct MethodResult {
    pub verified:   bool,
    pub confidence: f64,
    pub issues:     Vec<String>,
    #[serde(flatten)]
    pub detail:     Map<String, Value>,
}

impl MethodResult {
    fn new(confidence: f64, min_verified: f64, issues: Vec<String>, detail: Value) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            verified: confidence >= min_verified,
            confidence,
            issues,
            detail: match detail { Value::Object(m) => m, _ => Map::new() },
        }
    }

    fn absent(issue: &str, detail: Value) -> Self {
        Self::new(0.0, 1.0, vec![issue.to_string()], detail)
    }
}

// ── GPS ───────────────────────────────────────────────────────────────────────

pub async fn gps(data: &LocationData) -> MethodResult {
    let g = &data.gps;
    if !g.has_fix() {
        return MethodResult::absent("No GPS fix", json!({ "satellite_count": g.satellite_count }));
    }

    let mut conf   = 0.0;
    let mut issues = Vec::new();

    let accuracy = g.accuracy.unwrap_or(0.0);
    if accuracy < 10.0       { conf += 0.4; }
    else if accuracy < 50.0  { conf += 0.3; }
    else if accuracy < 100.0 { conf += 0.2; }
    else {
        conf += 0.1;
        issues.push(format!("Poor GPS accuracy: {accuracy}m"));
    }

    let sats = g.satellite_count;
    if sats >= 10     { conf += 0.3; }
    else if sats >= 5 { conf += 0.2; }
    else {
        conf += 0.1;
        issues.push(format!("Low satellite count: {sats}"));
    }

    let signal = g.signal_strength.unwrap_or(-1.0);
    if signal > -80.0       { conf += 0.2; }
    else if signal > -100.0 { conf += 0.1; }
    else { issues.push(format!("Weak GPS signal: {signal}dBm")); }

    if g.is_mock_provider {
        issues.push("Mock location provider detected".into());
        conf *= 0.1;
    }

    if g.altitude.map(|a| (-100.0..=9000.0).contains(&a)).unwrap_or(false) {
        conf += 0.1;
    }

    MethodResult::new(conf, 0.6, issues, json!({
        "accuracy_meters": accuracy,
        "satellite_count": sats,
        "signal_strength": signal,
    }))
}

// ── WiFi ──────────────────────────────────────────────────────────────────────

pub async fn wifi(data: &LocationData) -> MethodResult {
    let nets = &data.wifi.networks;
    if nets.is_empty() {
        return MethodResult::absent("No WiFi networks detected", json!({ "network_count": 0 }));
    }

    let mut conf   = 0.0;
    let mut issues = Vec::new();

    let n = nets.len();
    conf += if n >= 5 { 0.4 } else if n >= 3 { 0.3 } else { 0.2 };

    let signals: Vec<f64> = nets.iter().map(|w| w.signal_strength).collect();
    let avg = mean(&signals);
    if avg > -60.0      { conf += 0.3; }
    else if avg > -70.0 { conf += 0.2; }
    else if avg > -80.0 { conf += 0.1; }

    let known = nets.iter().filter(|w| KNOWN_SSIDS.contains(&w.ssid.as_str())).count();
    if known > 0 {
        conf += 0.2;
        issues.push(format!("Found {known} known networks"));
    }

    // Clients without connection history are treated as stable
    if data.wifi.stable.unwrap_or(true) {
        conf += 0.1;
    }

    MethodResult::new(conf, 0.5, issues, json!({
        "network_count":       n,
        "known_networks":      known,
        "avg_signal_strength": avg,
    }))
}

// ── Cell ──────────────────────────────────────────────────────────────────────

pub async fn cell(data: &LocationData) -> MethodResult {
    let towers = &data.cell.towers;
    if towers.is_empty() {
        return MethodResult::absent("No cell towers detected", json!({ "tower_count": 0 }));
    }

    let n = towers.len();
    let mut conf = if n >= 3 { 0.5 } else if n >= 2 { 0.3 } else { 0.1 };

    for t in towers {
        if t.signal_strength > -80.0      { conf += 0.1; }
        else if t.signal_strength > -90.0 { conf += 0.05; }
    }

    let providers: std::collections::HashSet<&str> =
        towers.iter().map(|t| t.provider.as_str()).collect();
    if n >= 2 && providers.len() <= 2 {
        conf += 0.2;
    }

    MethodResult::new(f64::min(conf, 0.8), 0.4, Vec::new(), json!({ "tower_count": n }))
}

// ── Bluetooth ─────────────────────────────────────────────────────────────────

pub async fn bluetooth(data: &LocationData) -> MethodResult {
    let n = data.bluetooth.devices.len();
    if n == 0 {
        return MethodResult::absent("No Bluetooth devices detected", json!({ "device_count": 0 }));
    }
    let conf = if n >= 3 { 0.6 } else if n >= 2 { 0.4 } else { 0.2 };
    MethodResult::new(conf, 0.4, Vec::new(), json!({ "device_count": n }))
}

// ── IP ────────────────────────────────────────────────────────────────────────

pub async fn ip(data: &LocationData) -> MethodResult {
    let ip = &data.ip;
    if ip.address.is_empty() {
        return MethodResult::absent("No IP address provided", json!({}));
    }

    let mut issues = Vec::new();
    let mut conf = if ip.is_vpn || ip.is_proxy {
        issues.push("VPN or proxy detected".to_string());
        0.1
    } else {
        0.5
    };

    let ip_point = ip.latitude.zip(ip.longitude).map(|(lat, lon)| GeoPoint::new(lat, lon, 0.0));
    let mut distance = None;
    if let (Some(a), Some(b)) = (ip_point, data.gps.point()) {
        let d = haversine_m(&a, &b);
        if d < IP_MATCH_RADIUS_M {
            conf += 0.3;
        } else {
            issues.push(format!("IP location mismatch: {d:.0}m"));
            conf *= 0.5;
        }
        distance = Some(d.round());
    }

    MethodResult::new(conf, 0.4, issues, json!({
        "ip_address":       ip.address,
        "is_vpn":           ip.is_vpn,
        "is_proxy":         ip.is_proxy,
        "gps_distance_m":   distance,
    }))
}
