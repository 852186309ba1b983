// huntwarden/src/api/anti_cheat.rs
//
// Anti-cheat endpoints. Every player record that passes through is ingested
// into the store first so device/IP indexes and the social graph stay current
// for later multi-account checks. Audit writes are spawned off the request path.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, to_value, Value};

use crate::api::AppState;
use crate::error::ServiceResult;
use crate::events::{LocationData, PlayerData, VerificationRequest};
use crate::geo::GeoPoint;
use crate::otel::HuntwardenMetrics;
use crate::trust::VerificationResults;
use crate::workers;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comprehensive-verification", post(comprehensive_verification))
        .route("/verify-location",            post(verify_location))
        .route("/analyze-behavior",           post(analyze_behavior))
        .route("/calculate-trust-score",      post(calculate_trust_score))
        .route("/detect-fraud-patterns",      post(detect_fraud_patterns))
        .route("/cluster-behavior-patterns",  post(cluster_behavior_patterns))
        .route("/trust-history/:player_id",   get(trust_history))
        .route("/system-stats",               get(system_stats))
}

// ── Request bodies ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    #[serde(default)]
    pub location_data:    LocationData,
    #[serde(default)]
    pub location_history: Vec<GeoPoint>,
}

#[derive(Debug, Deserialize)]
pub struct BehaviorBody {
    #[serde(default)]
    pub player_data:     PlayerData,
    /// Earlier records for the same player, oldest first. Scored into the
    /// profile before the current record.
    #[serde(default)]
    pub historical_data: Vec<PlayerData>,
}

#[derive(Debug, Deserialize)]
pub struct TrustBody {
    #[serde(default)]
    pub player_data:          PlayerData,
    #[serde(default)]
    pub verification_results: VerificationResults,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 { 30 }

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn comprehensive_verification(
    State(st): State<Arc<AppState>>,
    Json(req): Json<VerificationRequest>,
) -> ServiceResult<Json<Value>> {
    st.store.ingest(&req.player_data, Utc::now());
    st.store.total_verifications.fetch_add(1, Ordering::Relaxed);

    let signals = workers::run_all(&req, &st.store, &st.detector, &st.cfg).await;
    let outcome = st.fusion.fuse(&req, signals);
    st.metrics.record_verification(outcome.verification_level, outcome.trust_score, &outcome.checks);

    let body = json!({
        "status":          "success",
        "verification_id": outcome.request_id,
        "results":         to_value(&outcome)?,
    });

    let task_state = Arc::clone(&st);
    tokio::spawn(async move { task_state.audit.record_verification(&outcome).await; });

    Ok(Json(body))
}

async fn verify_location(
    State(st): State<Arc<AppState>>,
    Json(body): Json<LocationBody>,
) -> ServiceResult<Json<Value>> {
    HuntwardenMetrics::incr(&st.metrics.location_verifications);

    let report   = st.location.verify(&body.location_data).await;
    let movement = (!body.location_history.is_empty())
        .then(|| st.location.verify_movement(&body.location_history));

    Ok(Json(json!({
        "status":                "success",
        "location_verification": to_value(&report)?,
        "movement_analysis":     to_value(&movement)?,
    })))
}

async fn analyze_behavior(
    State(st): State<Arc<AppState>>,
    Json(body): Json<BehaviorBody>,
) -> ServiceResult<Json<Value>> {
    HuntwardenMetrics::incr(&st.metrics.behavior_analyses);

    let player    = &body.player_data;
    let player_id = player.id().to_string();
    st.store.ingest(player, Utc::now());

    for past in &body.historical_data {
        let report = st.detector.detect(past);
        st.detector.update_profile(&st.store, &player_id, &report);
    }

    let report = st.detector.detect(player);
    if report.is_anomaly {
        HuntwardenMetrics::incr(&st.metrics.anomalies);
    }
    st.detector.update_profile(&st.store, &player_id, &report);
    let trend = st.detector.behavior_trend(&st.store, &player_id);

    Ok(Json(json!({
        "status":           "success",
        "anomaly_analysis": to_value(&report)?,
        "behavior_trend":   to_value(&trend)?,
    })))
}

async fn calculate_trust_score(
    State(st): State<Arc<AppState>>,
    Json(body): Json<TrustBody>,
) -> ServiceResult<Json<Value>> {
    HuntwardenMetrics::incr(&st.metrics.trust_calculations);
    st.store.ingest(&body.player_data, Utc::now());

    let result = st.trust.calculate(&st.store, &body.player_data, &body.verification_results);

    Ok(Json(json!({
        "status":      "success",
        "trust_score": to_value(&result)?,
    })))
}

async fn detect_fraud_patterns(
    State(st): State<Arc<AppState>>,
    Json(req): Json<VerificationRequest>,
) -> ServiceResult<Json<Value>> {
    HuntwardenMetrics::incr(&st.metrics.fraud_analyses);
    st.store.ingest(&req.player_data, Utc::now());

    let report = st.fraud.analyze(&st.store, &req.player_data, &req.game_context);

    if let Some(activity_id) = report.suspicious_activity_id.as_deref() {
        HuntwardenMetrics::incr(&st.metrics.suspicious);
        let activity = st.store.suspicious_for(&report.player_id)
            .into_iter()
            .rev()
            .find(|a| a.activity_id == activity_id);
        if let Some(activity) = activity {
            let task_state = Arc::clone(&st);
            tokio::spawn(async move { task_state.audit.record_suspicious(&activity).await; });
        }
    }

    Ok(Json(json!({
        "status":         "success",
        "fraud_analysis": to_value(&report)?,
    })))
}

async fn cluster_behavior_patterns(
    State(st): State<Arc<AppState>>,
    Json(players): Json<Vec<PlayerData>>,
) -> ServiceResult<Json<Value>> {
    let report = st.detector.cluster(&players);

    Ok(Json(json!({
        "status":            "success",
        "clustering_result": to_value(&report)?,
    })))
}

async fn trust_history(
    State(st): State<Arc<AppState>>,
    Path(player_id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> ServiceResult<Json<Value>> {
    let history = st.trust.history(&st.store, &player_id, q.days);

    Ok(Json(json!({
        "status":        "success",
        "player_id":     player_id,
        "trust_history": to_value(&history)?,
    })))
}

async fn system_stats(State(st): State<Arc<AppState>>) -> ServiceResult<Json<Value>> {
    let m = &st.metrics;
    let stats = json!({
        "total_players":          st.store.n_players(),
        "total_verifications":    st.store.total_verifications.load(Ordering::Relaxed),
        "behavior_profiles":      st.store.n_profiles(),
        "trust_records":          st.store.n_trust_records(),
        "suspicious_activities":  st.store.n_suspicious(),
        "social_graph_nodes":     st.store.n_social_nodes(),
        "location_verifications": HuntwardenMetrics::get(&m.location_verifications),
        "behavior_analyses":      HuntwardenMetrics::get(&m.behavior_analyses),
        "anomalies_detected":     HuntwardenMetrics::get(&m.anomalies),
        "trust_calculations":     HuntwardenMetrics::get(&m.trust_calculations),
        "fraud_analyses":         HuntwardenMetrics::get(&m.fraud_analyses),
        "fraud_pattern_stats":    to_value(st.fraud.pattern_statistics(&st.store))?,
        "uptime_seconds":         st.started.elapsed().as_secs(),
        "timestamp":              Utc::now(),
    });

    Ok(Json(json!({ "status": "success", "system_stats": stats })))
}
