// huntwarden/src/state/store.rs
//
// Player state store, shared by every anti-cheat path.
// DashMap = sharded concurrent HashMap: safe across tokio worker threads
// without a global mutex.
//
// Holds:
//   - Trust history: latest {score, timestamp} per player + bounded snapshots
//   - Behavior profiles: bounded anomaly-score history per player
//   - Suspicious activity log: md5-keyed records for high-risk fraud results
//   - Pattern detections: per-player (100) + global (1000) bounded logs
//   - Reverse indexes: device fingerprint → players, IP → players
//   - Social graph: players as nodes, declared connections as edges
//
// The store is constructed once and injected (Arc) into every handler; Redis
// checkpointing (redis_state.rs) snapshots the durable parts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::PlayerData;

// ── Retention ─────────────────────────────────────────────────────────────────

pub const PROFILE_CAP:         usize = 100;
pub const TRUST_HISTORY_CAP:   usize = 100;
pub const PLAYER_PATTERN_CAP:  usize = 100;
pub const GLOBAL_PATTERN_CAP:  usize = 1000;
pub const SUSPICIOUS_CAP:      usize = 100;

const PROFILE_IDLE_DAYS:   i64 = 30;
const TRUST_RETAIN_DAYS:   i64 = 90;

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustSnapshot {
    pub score:     f64,
    pub level:     String,
    pub timestamp: DateTime<Utc>,
}

/// Most recent write wins for `last_*`; `history` keeps the tail for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub last_score:     f64,
    pub last_timestamp: DateTime<Utc>,
    pub history:        VecDeque<TrustSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorSnapshot {
    pub score:        f64,
    pub anomaly_type: String,
    pub is_anomaly:   bool,
    pub timestamp:    DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BehaviorProfile {
    pub player_id:  String,
    pub snapshots:  VecDeque<BehaviorSnapshot>,
    pub first_seen: DateTime<Utc>,
    pub last_seen:  DateTime<Utc>,
}

impl BehaviorProfile {
    fn new(player_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            player_id:  player_id.to_string(),
            snapshots:  VecDeque::new(),
            first_seen: now,
            last_seen:  now,
        }
    }

    pub fn scores(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.score).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    pub activity_id:       String,   // md5(player_id:timestamp)
    pub player_id:         String,
    pub risk_score:        f64,
    pub detected_patterns: Vec<String>,
    pub timestamp:         DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDetection {
    pub player_id:    String,
    pub patterns:     Vec<String>,
    pub overall_risk: f64,
    pub timestamp:    DateTime<Utc>,
}

// ── Social graph ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct SocialGraph {
    graph: UnGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl SocialGraph {
    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(ix) = self.index.get(id) { return *ix; }
        let ix = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), ix);
        ix
    }

    pub fn connect(&mut self, a: &str, b: &str) {
        if a == b { return; }
        let na = self.node(a);
        let nb = self.node(b);
        if !self.graph.contains_edge(na, nb) {
            self.graph.add_edge(na, nb, ());
        }
    }

    pub fn degree(&self, id: &str) -> usize {
        self.index.get(id).map(|ix| self.graph.neighbors(*ix).count()).unwrap_or(0)
    }

    /// Local clustering coefficient: realised edges among a player's
    /// neighbours over the k(k-1)/2 possible. 0 below two neighbours.
    pub fn neighbourhood_density(&self, id: &str) -> f64 {
        let Some(ix) = self.index.get(id) else { return 0.0 };
        let neigh: Vec<NodeIndex> = self.graph.neighbors(*ix).collect();
        let k = neigh.len();
        if k < 2 { return 0.0; }

        let mut links = 0usize;
        for (i, a) in neigh.iter().enumerate() {
            for b in &neigh[i + 1..] {
                if self.graph.contains_edge(*a, *b) { links += 1; }
            }
        }
        links as f64 / (k * (k - 1) / 2) as f64
    }

    pub fn n_nodes(&self) -> usize { self.graph.node_count() }
}

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct PlayerStore {
    trust:      DashMap<String, TrustRecord>,
    profiles:   DashMap<String, Arc<RwLock<BehaviorProfile>>>,
    suspicious: DashMap<String, VecDeque<SuspiciousActivity>>,

    player_patterns: DashMap<String, VecDeque<PatternDetection>>,
    global_patterns: Mutex<VecDeque<PatternDetection>>,

    // Reverse indexes: multi-account detection
    device_idx: DashMap<String, HashSet<String>>,   // fingerprint → player_ids
    ip_idx:     DashMap<String, HashSet<String>>,   // ip → player_ids

    social: RwLock<SocialGraph>,

    last_seen: DashMap<String, DateTime<Utc>>,

    pub total_verifications: AtomicU64,
    pub total_players:       AtomicU64,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self {
            trust:               DashMap::new(),
            profiles:            DashMap::new(),
            suspicious:          DashMap::new(),
            player_patterns:     DashMap::new(),
            global_patterns:     Mutex::new(VecDeque::new()),
            device_idx:          DashMap::new(),
            ip_idx:              DashMap::new(),
            social:              RwLock::new(SocialGraph::default()),
            last_seen:           DashMap::new(),
            total_verifications: AtomicU64::new(0),
            total_players:       AtomicU64::new(0),
        }
    }

    /// Ingest one player record: indexes and social edges.
    pub fn ingest(&self, player: &PlayerData, now: DateTime<Utc>) {
        let id = player.id().to_string();
        if self.last_seen.insert(id.clone(), now).is_none() {
            self.total_players.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(fp) = player.device_fingerprint.as_deref().filter(|s| !s.is_empty()) {
            self.device_idx.entry(fp.to_string()).or_default().insert(id.clone());
        }
        if let Some(ip) = player.ip_address.as_deref().filter(|s| !s.is_empty()) {
            self.ip_idx.entry(ip.to_string()).or_default().insert(id.clone());
        }
        if !player.social_connections.is_empty() {
            let mut g = self.social.write();
            for peer in &player.social_connections {
                g.connect(&id, peer);
            }
        }
    }

    // ── Trust ─────────────────────────────────────────────────────────────────

    pub fn prior_trust(&self, player_id: &str) -> Option<(f64, DateTime<Utc>)> {
        self.trust.get(player_id).map(|r| (r.last_score, r.last_timestamp))
    }

    pub fn record_trust(&self, player_id: &str, score: f64, level: &str, now: DateTime<Utc>) {
        self.update_trust(player_id, now, |_| (score, level.to_string()));
    }

    /// Read the prior, compute, and write back under one shard lock so
    /// concurrent updates for the same player serialise. `f` receives the
    /// prior `(score, timestamp)` and returns the new `(score, level)`.
    pub fn update_trust<F>(&self, player_id: &str, now: DateTime<Utc>, f: F) -> f64
    where
        F: FnOnce(Option<(f64, DateTime<Utc>)>) -> (f64, String),
    {
        match self.trust.entry(player_id.to_string()) {
            Entry::Occupied(mut slot) => {
                let rec = slot.get_mut();
                let (score, level) = f(Some((rec.last_score, rec.last_timestamp)));
                rec.last_score     = score;
                rec.last_timestamp = now;
                rec.history.push_back(TrustSnapshot { score, level, timestamp: now });
                while rec.history.len() > TRUST_HISTORY_CAP {
                    rec.history.pop_front();
                }
                score
            }
            Entry::Vacant(slot) => {
                let (score, level) = f(None);
                slot.insert(TrustRecord {
                    last_score:     score,
                    last_timestamp: now,
                    history:        VecDeque::from([TrustSnapshot { score, level, timestamp: now }]),
                });
                score
            }
        }
    }

    pub fn trust_history(&self, player_id: &str, since: DateTime<Utc>) -> Vec<TrustSnapshot> {
        self.trust.get(player_id)
            .map(|r| r.history.iter().filter(|s| s.timestamp >= since).cloned().collect())
            .unwrap_or_default()
    }

    pub fn trust_records(&self) -> Vec<(String, TrustRecord)> {
        self.trust.iter().map(|e| (e.key().clone(), e.value().clone())).collect()
    }

    pub fn restore_trust(&self, player_id: &str, record: TrustRecord) {
        self.trust.insert(player_id.to_string(), record);
    }

    // ── Behavior profiles ─────────────────────────────────────────────────────

    /// Append a snapshot, returning the profile length afterwards.
    pub fn push_behavior(&self, player_id: &str, snap: BehaviorSnapshot) -> usize {
        let profile = self.profiles
            .entry(player_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(BehaviorProfile::new(player_id, snap.timestamp))))
            .clone();

        let mut p = profile.write();
        p.last_seen = snap.timestamp;
        p.snapshots.push_back(snap);
        while p.snapshots.len() > PROFILE_CAP {
            p.snapshots.pop_front();
        }
        p.snapshots.len()
    }

    pub fn get_profile(&self, player_id: &str) -> Option<Arc<RwLock<BehaviorProfile>>> {
        self.profiles.get(player_id).map(|p| p.clone())
    }

    pub fn behavior_scores(&self, player_id: &str) -> Vec<f64> {
        self.get_profile(player_id).map(|p| p.read().scores()).unwrap_or_default()
    }

    // ── Suspicious activity ───────────────────────────────────────────────────

    pub fn log_suspicious(&self, activity: SuspiciousActivity) {
        let mut log = self.suspicious.entry(activity.player_id.clone()).or_default();
        log.push_back(activity);
        while log.len() > SUSPICIOUS_CAP {
            log.pop_front();
        }
    }

    pub fn suspicious_for(&self, player_id: &str) -> Vec<SuspiciousActivity> {
        self.suspicious.get(player_id).map(|l| l.iter().cloned().collect()).unwrap_or_default()
    }

    pub fn suspicious_records(&self) -> Vec<(String, Vec<SuspiciousActivity>)> {
        self.suspicious.iter()
            .map(|e| (e.key().clone(), e.value().iter().cloned().collect()))
            .collect()
    }

    pub fn restore_suspicious(&self, player_id: &str, records: Vec<SuspiciousActivity>) {
        self.suspicious.insert(player_id.to_string(), records.into_iter().collect());
    }

    pub fn n_suspicious(&self) -> usize {
        self.suspicious.iter().map(|e| e.value().len()).sum()
    }

    // ── Pattern detections ────────────────────────────────────────────────────

    pub fn record_patterns(&self, detection: PatternDetection) {
        {
            let mut hist = self.player_patterns.entry(detection.player_id.clone()).or_default();
            hist.push_back(detection.clone());
            while hist.len() > PLAYER_PATTERN_CAP {
                hist.pop_front();
            }
        }
        let mut global = self.global_patterns.lock();
        global.push_back(detection);
        while global.len() > GLOBAL_PATTERN_CAP {
            global.pop_front();
        }
    }

    pub fn detections_since(&self, since: DateTime<Utc>) -> Vec<PatternDetection> {
        self.global_patterns.lock().iter().filter(|d| d.timestamp >= since).cloned().collect()
    }

    pub fn player_detections(&self, player_id: &str) -> Vec<PatternDetection> {
        self.player_patterns.get(player_id).map(|h| h.iter().cloned().collect()).unwrap_or_default()
    }

    // ── Reverse index + graph queries ─────────────────────────────────────────

    pub fn players_with_device(&self, fingerprint: &str) -> HashSet<String> {
        self.device_idx.get(fingerprint).map(|s| s.clone()).unwrap_or_default()
    }

    pub fn players_with_ip(&self, ip: &str) -> HashSet<String> {
        self.ip_idx.get(ip).map(|s| s.clone()).unwrap_or_default()
    }

    /// (degree, neighbourhood density) in the declared social graph.
    pub fn social_stats(&self, player_id: &str) -> (usize, f64) {
        let g = self.social.read();
        (g.degree(player_id), g.neighbourhood_density(player_id))
    }

    pub fn n_players(&self) -> usize { self.last_seen.len() }
    pub fn n_profiles(&self) -> usize { self.profiles.len() }
    pub fn n_trust_records(&self) -> usize { self.trust.len() }
    pub fn n_social_nodes(&self) -> usize { self.social.read().n_nodes() }

    // ── Housekeeping ──────────────────────────────────────────────────────────

    /// Drop idle profiles and trust snapshots past retention.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let idle_cutoff  = now - Duration::days(PROFILE_IDLE_DAYS);
        let trust_cutoff = now - Duration::days(TRUST_RETAIN_DAYS);

        self.profiles.retain(|_, p| p.read().last_seen >= idle_cutoff);
        for mut rec in self.trust.iter_mut() {
            while rec.history.front().map(|s| s.timestamp < trust_cutoff).unwrap_or(false) {
                rec.history.pop_front();
            }
        }
        self.global_patterns.lock().retain(|d| d.timestamp >= trust_cutoff);
        debug!(profiles = self.profiles.len(), trust = self.trust.len(), "store sweep");
    }

    /// Periodic sweep, spawned once from main.
    pub async fn housekeeping_loop(self: Arc<Self>) {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(600)).await;
            self.sweep(Utc::now());
        }
    }
}

impl Default for PlayerStore { fn default() -> Self { Self::new() } }

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str) -> PlayerData {
        PlayerData { player_id: Some(id.into()), ..Default::default() }
    }

    #[test]
    fn device_index_links_accounts() {
        let store = PlayerStore::new();
        let now = Utc::now();
        for id in ["a", "b"] {
            let mut p = player(id);
            p.device_fingerprint = Some("dev-1".into());
            store.ingest(&p, now);
        }
        assert_eq!(store.players_with_device("dev-1").len(), 2);
        assert_eq!(store.n_players(), 2);
        assert_eq!(store.total_players.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn trust_history_is_bounded_and_latest_wins() {
        let store = PlayerStore::new();
        let t0 = Utc::now() - Duration::days(1);
        for i in 0..(TRUST_HISTORY_CAP + 20) {
            store.record_trust("p", i as f64 / 200.0, "fair", t0 + Duration::seconds(i as i64));
        }
        let (score, _) = store.prior_trust("p").unwrap();
        assert!((score - (TRUST_HISTORY_CAP + 19) as f64 / 200.0).abs() < 1e-12);
        assert_eq!(store.trust_history("p", t0).len(), TRUST_HISTORY_CAP);
    }

    #[test]
    fn triangle_has_full_density() {
        let mut g = SocialGraph::default();
        g.connect("a", "b");
        g.connect("a", "c");
        g.connect("b", "c");
        g.connect("b", "a");
        assert_eq!(g.degree("a"), 2);
        assert!((g.neighbourhood_density("a") - 1.0).abs() < 1e-12);

        g.connect("a", "d");
        assert!((g.neighbourhood_density("a") - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn global_pattern_log_is_capped() {
        let store = PlayerStore::new();
        let now = Utc::now();
        for i in 0..(GLOBAL_PATTERN_CAP + 5) {
            store.record_patterns(PatternDetection {
                player_id:    format!("p{}", i % 3),
                patterns:     vec!["speed_hacking".into()],
                overall_risk: 0.9,
                timestamp:    now,
            });
        }
        assert_eq!(store.detections_since(now - Duration::hours(1)).len(), GLOBAL_PATTERN_CAP);
        assert_eq!(store.player_detections("p0").len(), PLAYER_PATTERN_CAP);
    }
}
