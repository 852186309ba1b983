// huntwarden/src/events.rs
//
// Shared domain types flowing through Huntwarden.
//
// Player records arrive as loosely-shaped JSON from the game backend. Every
// field is optional on the wire; each scorer applies its own read-time default
// (the same field can default differently in different heuristics), so the
// numeric features are `Option<f64>` rather than pre-defaulted values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

// ── Player record ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerData {
    pub player_id: Option<String>,

    // Timing
    pub avg_solving_time:       Option<f64>,
    pub avg_clue_solving_time:  Option<f64>,
    pub time_variance:          Option<f64>,
    pub solving_times:          Vec<f64>,
    pub recent_solve_times:     Vec<f64>,   // unix seconds of recent solves
    pub time_between_clues:     Option<f64>,
    pub session_duration_avg:   Option<f64>,
    pub failure_recovery_time:  Option<f64>,

    // Performance
    pub success_rate:             Option<f64>,
    pub success_pattern:          Vec<serde_json::Value>,
    pub streak_consistency:       Option<f64>,
    pub streak_length:            Option<f64>,
    pub hint_usage_rate:          Option<f64>,
    pub retry_frequency:          Option<f64>,
    pub exploration_thoroughness: Option<f64>,
    pub account_age_days:         Option<f64>,
    pub achievements:             Option<f64>,
    pub total_play_time:          Option<f64>,   // seconds

    // Movement
    pub movement_efficiency:   Option<f64>,
    pub movement_consistency:  Option<f64>,
    pub location_accuracy_avg: Option<f64>,
    pub location_accuracy:     Option<f64>,
    pub unusual_movements:     Option<f64>,
    pub location_data:         PlayerLocationData,

    // Device / network
    pub device_fingerprint:    Option<String>,
    pub ip_address:            Option<String>,
    pub device_consistency:    Option<f64>,
    pub connection_stability:  Option<f64>,
    pub location_consistency:  Option<f64>,

    // Temporal
    pub usual_playing_hours:        Option<bool>,
    pub session_length_consistency: Option<f64>,
    pub play_frequency_consistency: Option<f64>,
    pub session_start_hours:        Vec<u32>,   // 0–23, one per recent session

    // Social
    pub collaboration_score:    Option<f64>,
    pub communication_quality:  Option<f64>,
    pub reports_received:       Option<u32>,
    pub positive_feedback:      Option<u32>,
    pub social_connections:     Vec<String>,
    pub communication_patterns: CommunicationPatterns,
    pub interaction_patterns:   InteractionPatterns,
}

impl PlayerData {
    /// Store key for this player. Requests without a `player_id` all map to
    /// `"unknown"`, so anonymous callers share one profile, device index
    /// entry and trust record.
    pub fn id(&self) -> &str {
        self.player_id.as_deref().unwrap_or("unknown")
    }

    /// Mean of recorded solving times, falling back to the reported average.
    pub fn mean_solving_time(&self) -> Option<f64> {
        if !self.solving_times.is_empty() {
            return Some(crate::geo::mean(&self.solving_times));
        }
        self.avg_solving_time.or(self.avg_clue_solving_time)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerLocationData {
    pub is_mock_provider: bool,
    pub gps_accuracy:     Option<f64>,
    pub gps_issues:       Vec<String>,
    #[serde(alias = "location_history")]
    pub movement_history: Vec<GeoPoint>,
    /// Raw reported fixes used for coordinate-precision checks.
    pub locations:        Vec<GeoPoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationPatterns {
    pub message_frequency: f64,
    pub solution_sharing:  f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionPatterns {
    pub click_intervals:   Vec<f64>,
    pub movement_patterns: MovementPatterns,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementPatterns {
    pub perfect_linearity: bool,
}

// ── Game context ──────────────────────────────────────────────────────────────

/// Cross-player facts supplied by the game backend alongside a player record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameContext {
    pub hunt_id:             Option<String>,
    pub similar_devices:     Vec<String>,
    pub accounts_per_ip:     HashMap<String, u32>,
    pub similar_players:     Vec<String>,
    pub coordinated_actions: Vec<String>,
}

/// One comprehensive-verification / fraud-analysis request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationRequest {
    pub player_data:   PlayerData,
    pub location_data: LocationData,
    pub game_context:  GameContext,
    pub request_id:    Option<String>,
}

// ── Multi-signal location payload ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationData {
    pub gps:       GpsData,
    pub wifi:      WifiData,
    pub cell:      CellData,
    pub bluetooth: BluetoothData,
    pub ip:        IpData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsData {
    pub latitude:         Option<f64>,
    pub longitude:        Option<f64>,
    pub accuracy:         Option<f64>,   // metres
    pub satellite_count:  u32,
    pub signal_strength:  Option<f64>,   // dBm
    pub altitude:         Option<f64>,
    pub is_mock_provider: bool,
}

impl GpsData {
    pub fn point(&self) -> Option<GeoPoint> {
        Some(GeoPoint::new(self.latitude?, self.longitude?, 0.0))
    }

    pub fn has_fix(&self) -> bool {
        self.point().is_some() || self.accuracy.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiData {
    pub networks: Vec<WifiNetwork>,
    /// Set by the client when the association did not flap during the fix.
    pub stable:   Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiNetwork {
    #[serde(default)]
    pub ssid:            String,
    #[serde(default = "weak_signal")]
    pub signal_strength: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CellData {
    pub towers: Vec<CellTower>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellTower {
    #[serde(default)]
    pub provider:        String,
    #[serde(default = "weak_signal")]
    pub signal_strength: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothData {
    pub devices: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpData {
    pub address:   String,
    pub is_vpn:    bool,
    pub is_proxy:  bool,
    pub latitude:  Option<f64>,
    pub longitude: Option<f64>,
}

fn weak_signal() -> f64 { -100.0 }

// ── Comprehensive verification checks ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Behavior,
    Location,
    Device,
    Temporal,
    Social,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Behavior => write!(f, "behavior"),
            Self::Location => write!(f, "location"),
            Self::Device   => write!(f, "device"),
            Self::Temporal => write!(f, "temporal"),
            Self::Social   => write!(f, "social"),
        }
    }
}

/// Output of one comprehensive-verification check. `score` is a trust
/// contribution: 1.0 = fully consistent with a legitimate player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSignal {
    pub kind:        CheckKind,
    pub player_id:   String,
    pub score:       f64,
    pub confidence:  f64,
    pub evidence:    Vec<String>,
    /// Check-specific detail fields surfaced to the caller.
    pub detail:      serde_json::Value,
    pub timestamp:   DateTime<Utc>,
}

// ── Levels ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 { Self::High }
        else if score > 0.6 { Self::Medium }
        else if score > 0.4 { Self::Low }
        else { Self::Minimal }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::Low     => write!(f, "low"),
            Self::Medium  => write!(f, "medium"),
            Self::High    => write!(f, "high"),
        }
    }
}

/// How much extra verification a player should face, derived from composite trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    Low,
    Medium,
    High,
    Extreme,
}

impl VerificationLevel {
    pub fn from_trust(trust: f64) -> Self {
        if trust >= 0.8 { Self::Low }
        else if trust >= 0.6 { Self::Medium }
        else if trust >= 0.4 { Self::High }
        else { Self::Extreme }
    }
}

impl std::fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low     => write!(f, "low"),
            Self::Medium  => write!(f, "medium"),
            Self::High    => write!(f, "high"),
            Self::Extreme => write!(f, "extreme"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Excellent,
    High,
    Good,
    Fair,
    Low,
    Restricted,
}

impl TrustLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 { Self::Excellent }
        else if score >= 0.8 { Self::High }
        else if score >= 0.7 { Self::Good }
        else if score >= 0.6 { Self::Fair }
        else if score >= 0.4 { Self::Low }
        else { Self::Restricted }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent  => write!(f, "excellent"),
            Self::High       => write!(f, "high"),
            Self::Good       => write!(f, "good"),
            Self::Fair       => write!(f, "fair"),
            Self::Low        => write!(f, "low"),
            Self::Restricted => write!(f, "restricted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_players_share_one_key() {
        assert_eq!(PlayerData::default().id(), "unknown");
        let named = PlayerData { player_id: Some("p7".into()), ..Default::default() };
        assert_eq!(named.id(), "p7");
    }

    #[test]
    fn player_data_tolerates_sparse_and_unknown_fields() {
        let raw = serde_json::json!({
            "player_id": "p1",
            "success_rate": 0.8,
            "favourite_colour": "green",
            "location_data": { "location_history": [{"latitude": 1.0, "longitude": 2.0}] }
        });
        let p: PlayerData = serde_json::from_value(raw).unwrap();
        assert_eq!(p.id(), "p1");
        assert_eq!(p.success_rate, Some(0.8));
        assert_eq!(p.location_data.movement_history.len(), 1);
        assert!(p.hint_usage_rate.is_none());
    }

    #[test]
    fn mean_solving_time_prefers_samples() {
        let p = PlayerData {
            solving_times:    vec![10.0, 20.0],
            avg_solving_time: Some(500.0),
            ..Default::default()
        };
        assert_eq!(p.mean_solving_time(), Some(15.0));
    }

    #[test]
    fn level_boundaries() {
        assert_eq!(TrustLevel::from_score(0.9), TrustLevel::Excellent);
        assert_eq!(TrustLevel::from_score(0.39), TrustLevel::Restricted);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::Medium);
        assert_eq!(VerificationLevel::from_trust(0.4), VerificationLevel::High);
    }
}
