// huntwarden/src/api/world.rs

use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::api::AppState;
use crate::world::{generate_location, LocationRequest};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/generate-location", post(location))
}

async fn location(Json(req): Json<LocationRequest>) -> Json<Value> {
    let loc = generate_location(&req);
    info!(theme = %loc.theme, difficulty = loc.difficulty, "location generated");

    Json(json!({
        "status":     "success",
        "location":   loc.location,
        "theme":      loc.theme,
        "challenges": loc.challenges,
        "difficulty": loc.difficulty,
    }))
}
