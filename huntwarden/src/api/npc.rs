// huntwarden/src/api/npc.rs

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, to_value, Value};

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::npc::ConversationRequest;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversation/:npc_id",  post(conversation))
        .route("/npc/:npc_id/memories",  get(memories))
        .route("/knowledge",             post(add_knowledge))
        .route("/knowledge/search",      get(search_knowledge))
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeBody {
    pub domain: String,
    #[serde(default)]
    pub facts:  Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

async fn conversation(
    State(st): State<Arc<AppState>>,
    Path(npc_id): Path<String>,
    Json(req): Json<ConversationRequest>,
) -> ServiceResult<Json<Value>> {
    let reply = st.npc.converse(&npc_id, &req).await;

    let mut body = to_value(&reply)?;
    let obj = body.as_object_mut()
        .ok_or_else(|| ServiceError::Internal("conversation reply is not an object".into()))?;
    obj.insert("status".into(), json!("success"));
    Ok(Json(body))
}

async fn memories(
    State(st): State<Arc<AppState>>,
    Path(npc_id): Path<String>,
) -> ServiceResult<Json<Value>> {
    let entries = st.npc.memory.entries(&npc_id);
    Ok(Json(json!({
        "status":   "success",
        "npc_id":   npc_id,
        "memories": to_value(&entries)?,
    })))
}

async fn add_knowledge(
    State(st): State<Arc<AppState>>,
    Json(body): Json<KnowledgeBody>,
) -> ServiceResult<Json<Value>> {
    let total = st.npc.knowledge.add(&body.domain, body.facts);
    Ok(Json(json!({
        "status":     "success",
        "domain":     body.domain,
        "fact_count": total,
    })))
}

async fn search_knowledge(
    State(st): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> ServiceResult<Json<Value>> {
    let results = st.npc.knowledge.search(&q.q);
    Ok(Json(json!({
        "status":  "success",
        "query":   q.q,
        "results": results,
    })))
}
