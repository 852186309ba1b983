// huntwarden/src/api/mod.rs
//
// HTTP surface. One binary serves any subset of the four services:
//
//   anti-cheat      verification, behavior, trust, fraud, clustering
//   clue-generator  clues, puzzles, narratives, difficulty
//   npc-guardian    dialogue, memories, knowledge base
//   world-builder   location generation
//
// Every service answers GET / and GET /health; GET /metrics is always mounted.
// Handlers return `{"status": "success", ...}` and map escaped errors to
// `500 {"detail": ...}` through ServiceError.

pub mod anti_cheat;
pub mod clue;
pub mod npc;
pub mod world;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use clap::ValueEnum;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::anomaly::AnomalyDetector;
use crate::clue::{ClueCache, ClueGenerator, Providers};
use crate::config::{ClueConfig, LlmConfig, ScoringConfig};
use crate::engine::audit::AuditLog;
use crate::engine::fusion::FusionEngine;
use crate::fraud::FraudDetector;
use crate::location::LocationVerifier;
use crate::npc::NpcGuardian;
use crate::otel::HuntwardenMetrics;
use crate::state::store::PlayerStore;
use crate::trust::TrustScorer;

// ── Service selection ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Service {
    All,
    AntiCheat,
    ClueGenerator,
    NpcGuardian,
    WorldBuilder,
}

impl Service {
    fn banner(self) -> &'static str {
        match self {
            Service::All           => "Huntwarden Services Running",
            Service::AntiCheat     => "AI Anti-Cheat Service Running",
            Service::ClueGenerator => "AI Clue Generator Service Running",
            Service::NpcGuardian   => "NPC Guardian Service Running",
            Service::WorldBuilder  => "World Builder Service Running",
        }
    }

    fn includes(self, other: Service) -> bool {
        self == Service::All || self == other
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Service::All           => "all",
            Service::AntiCheat     => "anti_cheat",
            Service::ClueGenerator => "clue_generator",
            Service::NpcGuardian   => "npc_guardian",
            Service::WorldBuilder  => "world_builder",
        };
        write!(f, "{}", s)
    }
}

// ── Shared state ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub cfg:      ScoringConfig,
    pub store:    Arc<PlayerStore>,
    pub detector: AnomalyDetector,
    pub trust:    TrustScorer,
    pub fraud:    FraudDetector,
    pub location: LocationVerifier,
    pub fusion:   FusionEngine,
    pub audit:    AuditLog,
    pub metrics:  Arc<HuntwardenMetrics>,
    pub clues:    ClueGenerator,
    pub npc:      NpcGuardian,
    pub started:  Instant,
}

impl AppState {
    /// Train the anomaly baselines and wire every engine to one store and
    /// one metrics registry.
    pub fn new(
        cfg:       ScoringConfig,
        llm:       LlmConfig,
        clue_cfg:  ClueConfig,
        providers: Providers,
        cache:     Arc<dyn ClueCache>,
        audit:     AuditLog,
    ) -> anyhow::Result<Self> {
        let metrics  = HuntwardenMetrics::new();
        let detector = AnomalyDetector::new(&cfg)?;
        let npc      = NpcGuardian::new(Arc::clone(&providers.openai), llm.clone(), Arc::clone(&metrics));
        let clues    = ClueGenerator::new(providers, cache, llm, clue_cfg, Arc::clone(&metrics));

        Ok(Self {
            store:    Arc::new(PlayerStore::new()),
            trust:    TrustScorer::new(&cfg),
            fraud:    FraudDetector::new(&cfg),
            location: LocationVerifier::new(&cfg),
            fusion:   FusionEngine::new(),
            started:  Instant::now(),
            detector,
            audit,
            metrics,
            clues,
            npc,
            cfg,
        })
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn router(service: Service, state: Arc<AppState>) -> Router {
    let mut app: Router<Arc<AppState>> = Router::new()
        .route("/", get(move || async move { Json(json!({ "status": service.banner() })) }))
        .route("/health", get(move |st: State<Arc<AppState>>| health(st, service)))
        .route("/metrics", get(metrics));

    if service.includes(Service::AntiCheat)     { app = app.merge(anti_cheat::routes()); }
    if service.includes(Service::ClueGenerator) { app = app.merge(clue::routes()); }
    if service.includes(Service::NpcGuardian)   { app = app.merge(npc::routes()); }
    if service.includes(Service::WorldBuilder)  { app = app.merge(world::routes()); }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(st): State<Arc<AppState>>, service: Service) -> Json<Value> {
    let mut components = serde_json::Map::new();

    if service.includes(Service::AntiCheat) {
        components.insert("anti_cheat".into(), json!({
            "anomaly_detector":  "ready",
            "trust_scorer":      "ready",
            "fraud_detector":    "ready",
            "location_verifier": "ready",
            "audit_log":         if st.audit.dir().is_some() { "enabled" } else { "disabled" },
            "players_tracked":   st.store.n_players(),
        }));
    }
    if service.includes(Service::ClueGenerator) {
        let configured = |key: &Option<String>| if key.is_some() { "configured" } else { "not_configured" };
        components.insert("clue_generator".into(), json!({
            "openai": configured(&st.clues.llm.openai_api_key),
            "gemini": configured(&st.clues.llm.gemini_api_key),
            "cache":  st.clues.stats().cache_backend,
        }));
    }
    if service.includes(Service::NpcGuardian) {
        components.insert("npc_guardian".into(), json!({
            "npcs_with_memory":  st.npc.memory.n_npcs(),
            "knowledge_domains": st.npc.knowledge.n_domains(),
        }));
    }
    if service.includes(Service::WorldBuilder) {
        components.insert("world_builder".into(), json!({ "catalog": "ready" }));
    }

    Json(json!({
        "status":         "healthy",
        "service":        service.to_string(),
        "uptime_seconds": st.started.elapsed().as_secs(),
        "components":     components,
    }))
}

async fn metrics(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        st.metrics.prometheus_text(&st.store),
    )
}
