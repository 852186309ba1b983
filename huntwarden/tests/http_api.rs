// huntwarden/tests/http_api.rs
//
// End-to-end checks through the axum router with no network: LLM providers
// have no keys configured, so every generator takes its template path.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use huntwarden::api::{router, AppState, Service};
use huntwarden::clue::{MemoryCache, Providers};
use huntwarden::config::{ClueConfig, LlmConfig, ScoringConfig};
use huntwarden::engine::audit::AuditLog;

fn app(service: Service) -> Router {
    let llm = LlmConfig::default();
    let state = AppState::new(
        ScoringConfig::default(),
        llm.clone(),
        ClueConfig::default(),
        Providers::from_config(&llm).unwrap(),
        Arc::new(MemoryCache::new()),
        AuditLog::disabled(),
    ).unwrap();
    router(service, Arc::new(state))
}

async fn raw(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = raw(app, method, uri, body).await;
    (status, serde_json::from_str(&text).unwrap())
}

// ── Service shell ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_and_health_describe_the_mounted_service() {
    let app = app(Service::AntiCheat);

    let (status, body) = call(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "AI Anti-Cheat Service Running");

    let (_, health) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "anti_cheat");
    assert_eq!(health["components"]["anti_cheat"]["audit_log"], "disabled");
    assert!(health["components"].get("clue_generator").is_none());
}

#[tokio::test]
async fn unmounted_service_routes_are_not_found() {
    let app = app(Service::ClueGenerator);
    let (status, _) = raw(&app, Method::POST, "/verify-location", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, Method::GET, "/clue-stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_generations"], 0);
    assert_eq!(body["stats"]["cache_backend"], "memory");
}

#[tokio::test]
async fn metrics_are_exposed_as_prometheus_text() {
    let app = app(Service::All);
    call(&app, Method::POST, "/comprehensive-verification",
         Some(json!({ "player_data": { "player_id": "m1" } }))).await;

    let (status, text) = raw(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("# TYPE huntwarden_verifications_total counter"));
    assert!(text.contains("huntwarden_verifications_total 1\n"));
    assert!(text.contains("huntwarden_players_tracked 1\n"));
}

// ── Anti-cheat ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn comprehensive_verification_returns_fused_outcome() {
    let app = app(Service::AntiCheat);
    let (status, body) = call(&app, Method::POST, "/comprehensive-verification", Some(json!({
        "request_id": "req-1",
        "player_data": {
            "player_id": "p1",
            "solving_times": [120, 110, 100, 95, 90],
            "success_rate": 0.7,
            "device_fingerprint": "fp-1"
        }
    }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["verification_id"], "req-1");
    let trust = body["results"]["trust_score"].as_f64().unwrap();
    assert!((0.1..=1.0).contains(&trust));
    assert_eq!(body["results"]["checks"].as_array().unwrap().len(), 5);

    let (_, stats) = call(&app, Method::GET, "/system-stats", None).await;
    assert_eq!(stats["system_stats"]["total_verifications"], 1);
    assert_eq!(stats["system_stats"]["total_players"], 1);
}

#[tokio::test]
async fn verify_location_adds_movement_only_with_history() {
    let app = app(Service::AntiCheat);

    let (_, bare) = call(&app, Method::POST, "/verify-location", Some(json!({
        "location_data": { "gps": { "latitude": 51.5007, "longitude": -0.1246, "accuracy": 5.0 } }
    }))).await;
    assert!(bare["location_verification"]["overall_confidence"].is_number());
    assert!(bare["movement_analysis"].is_null());

    let (_, tracked) = call(&app, Method::POST, "/verify-location", Some(json!({
        "location_data": {},
        "location_history": [
            { "lat": 51.5000, "lon": -0.1200, "timestamp": 1000.0 },
            { "lat": 51.5010, "lon": -0.1210, "timestamp": 1060.0 },
            { "lat": 51.5021, "lon": -0.1205, "timestamp": 1120.0 }
        ]
    }))).await;
    assert_eq!(tracked["movement_analysis"]["data_points"], 3);
}

#[tokio::test]
async fn analyze_behavior_builds_profile_trend() {
    let app = app(Service::AntiCheat);
    let (status, body) = call(&app, Method::POST, "/analyze-behavior", Some(json!({
        "player_data": { "player_id": "b1", "avg_solving_time": 150, "success_rate": 0.6 },
        "historical_data": [
            { "player_id": "b1", "avg_solving_time": 160, "success_rate": 0.55 },
            { "player_id": "b1", "avg_solving_time": 155, "success_rate": 0.58 }
        ]
    }))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["anomaly_analysis"]["anomaly_score"].is_number());
    assert_eq!(body["behavior_trend"]["data_points"], 3);
}

#[tokio::test]
async fn trust_scores_are_recorded_in_history() {
    let app = app(Service::AntiCheat);
    let (_, calc) = call(&app, Method::POST, "/calculate-trust-score", Some(json!({
        "player_data": { "player_id": "t1", "account_age_days": 120, "success_rate": 0.6 }
    }))).await;
    let score = calc["trust_score"]["trust_score"].as_f64().unwrap();

    let (_, hist) = call(&app, Method::GET, "/trust-history/t1?days=7", None).await;
    assert_eq!(hist["player_id"], "t1");
    let entries = hist["trust_history"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["trust_score"].as_f64().unwrap(), score);

    let (_, none) = call(&app, Method::GET, "/trust-history/nobody", None).await;
    assert!(none["trust_history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn fraud_analysis_and_small_cluster_requests() {
    let app = app(Service::AntiCheat);
    let (status, body) = call(&app, Method::POST, "/detect-fraud-patterns", Some(json!({
        "player_data": { "player_id": "f1", "success_rate": 0.6 }
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fraud_analysis"]["player_id"], "f1");
    assert!(body["fraud_analysis"]["overall_risk_score"].is_number());

    let (_, clusters) = call(&app, Method::POST, "/cluster-behavior-patterns",
                             Some(json!([{ "player_id": "a" }, { "player_id": "b" }]))).await;
    assert_eq!(clusters["clustering_result"]["total_clusters"], 0);
}

// ── Clue generator ────────────────────────────────────────────────────────────

#[tokio::test]
async fn offline_clue_generation_falls_back_and_signs() {
    let app = app(Service::ClueGenerator);
    let request = json!({
        "hunt_theme": "pirate",
        "difficulty": "medium",
        "player_level": 2,
        "location_data": { "lat": 40.7128, "lon": -74.006, "name": "Harbour", "landmarks": ["lighthouse"] }
    });

    let (status, body) = call(&app, Method::POST, "/generate-clue", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clue"]["source"], "fallback");
    assert_eq!(body["clue"]["clue_type"], "riddle");
    let id = body["generation_id"].as_str().unwrap();
    assert_eq!(id.len(), 64);

    let (_, again) = call(&app, Method::POST, "/generate-clue", Some(request)).await;
    assert_eq!(again["generation_id"], id);

    let (_, stats) = call(&app, Method::GET, "/clue-stats", None).await;
    assert_eq!(stats["stats"]["cache_hits"], 1);
    assert_eq!(stats["stats"]["total_generations"], 1);
}

#[tokio::test]
async fn puzzle_narrative_and_difficulty_use_templates_offline() {
    let app = app(Service::ClueGenerator);

    let (_, puzzle) = call(&app, Method::POST, "/generate-puzzle", Some(json!({
        "puzzle_type": "cipher", "complexity": "hard", "theme": "space"
    }))).await;
    assert_eq!(puzzle["puzzle"]["source"], "template");
    assert_eq!(puzzle["puzzle"]["difficulty"], 0.8);

    let (_, story) = call(&app, Method::POST, "/build-narrative", Some(json!({
        "hunt_id": "h1", "theme": "jungle", "locations": ["gate", "bridge"]
    }))).await;
    assert_eq!(story["narrative"]["chapters"].as_array().unwrap().len(), 2);

    let (_, adj) = call(&app, Method::POST, "/adjust-difficulty", Some(json!({
        "player_level": 5, "success_rate": 0.3
    }))).await;
    assert_eq!(adj["adjustment"]["recommended_difficulty"], 0.4);
    assert_eq!(adj["adjustment"]["source"], "template");
}

// ── NPC guardian + world builder ──────────────────────────────────────────────

#[tokio::test]
async fn npc_remembers_conversations_and_searches_knowledge() {
    let app = app(Service::NpcGuardian);

    let (_, added) = call(&app, Method::POST, "/knowledge", Some(json!({
        "domain": "harbour", "facts": ["The lighthouse keeper hides the map."]
    }))).await;
    assert_eq!(added["fact_count"], 1);

    let (_, reply) = call(&app, Method::POST, "/conversation/Keeper", Some(json!({
        "player_id": "p9", "message": "Where is the lighthouse?"
    }))).await;
    assert_eq!(reply["status"], "success");
    assert_eq!(reply["npc_id"], "Keeper");
    assert_eq!(reply["source"], "fallback");
    assert!(reply["response"].as_str().unwrap().contains("hides the map"));

    let (_, mem) = call(&app, Method::GET, "/npc/Keeper/memories", None).await;
    assert_eq!(mem["memories"].as_array().unwrap().len(), 2);

    let (_, found) = call(&app, Method::GET, "/knowledge/search?q=LIGHTHOUSE", None).await;
    assert_eq!(found["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn world_builder_clamps_difficulty() {
    let app = app(Service::WorldBuilder);
    let (status, body) = call(&app, Method::POST, "/generate-location",
                              Some(json!({ "theme": "Medieval", "difficulty": 42 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["difficulty"], 10);
    assert_eq!(body["theme"], "medieval");
    assert_eq!(body["challenges"].as_array().unwrap().len(), 6);
}
