// huntwarden/src/api/clue.rs
//
// Clue-generator endpoints. Generation never fails outright: provider and
// cache errors degrade to template output inside the generator.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, to_value, Value};

use crate::api::AppState;
use crate::clue::narrative::{DifficultyRequest, NarrativeRequest};
use crate::clue::puzzle::PuzzleRequest;
use crate::clue::ClueRequest;
use crate::error::ServiceResult;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-clue",     post(generate_clue))
        .route("/generate-puzzle",   post(generate_puzzle))
        .route("/build-narrative",   post(build_narrative))
        .route("/adjust-difficulty", post(adjust_difficulty))
        .route("/clue-stats",        get(clue_stats))
}

async fn generate_clue(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ClueRequest>,
) -> ServiceResult<Json<Value>> {
    let clue = st.clues.generate(&req).await;
    let generation_id = clue.crypto_proof.as_ref().map(|p| p.hash.clone());

    Ok(Json(json!({
        "status":        "success",
        "clue":          to_value(&clue)?,
        "generation_id": generation_id,
    })))
}

async fn generate_puzzle(
    State(st): State<Arc<AppState>>,
    Json(req): Json<PuzzleRequest>,
) -> ServiceResult<Json<Value>> {
    let puzzle = st.clues.generate_puzzle(&req).await;
    Ok(Json(json!({ "status": "success", "puzzle": to_value(&puzzle)? })))
}

async fn build_narrative(
    State(st): State<Arc<AppState>>,
    Json(req): Json<NarrativeRequest>,
) -> ServiceResult<Json<Value>> {
    let narrative = st.clues.build_narrative(&req).await;
    Ok(Json(json!({ "status": "success", "narrative": to_value(&narrative)? })))
}

async fn adjust_difficulty(
    State(st): State<Arc<AppState>>,
    Json(req): Json<DifficultyRequest>,
) -> ServiceResult<Json<Value>> {
    let adjustment = st.clues.adjust_difficulty(&req).await;
    Ok(Json(json!({ "status": "success", "adjustment": to_value(&adjustment)? })))
}

async fn clue_stats(State(st): State<Arc<AppState>>) -> ServiceResult<Json<Value>> {
    Ok(Json(json!({ "status": "success", "stats": to_value(st.clues.stats())? })))
}
