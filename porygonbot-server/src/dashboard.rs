// Read-only JSON view over the in-memory chatter activity log.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use porygonbot_common::models::ChatterActivityRecord;
use porygonbot_core::cache::ActivityLog;

pub fn routes(activity: Arc<ActivityLog>) -> Router {
    Router::new()
        .route("/api/chatters", get(list_chatters))
        .route("/api/chatters/{username}", get(get_chatter))
        .with_state(activity)
}

async fn list_chatters(State(activity): State<Arc<ActivityLog>>) -> Json<Vec<ChatterActivityRecord>> {
    Json(activity.snapshot())
}

async fn get_chatter(
    State(activity): State<Arc<ActivityLog>>,
    Path(username): Path<String>,
) -> Response {
    match activity.get(&username) {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no activity recorded for {username}") })),
        )
            .into_response(),
    }
}
