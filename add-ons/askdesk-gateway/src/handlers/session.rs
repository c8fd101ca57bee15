use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

/// GET /api/session/:user_id/history – recent turns, oldest first.
pub(crate) async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    // inspection neither creates the session nor keeps it alive
    let Some(session) = state.policy.memory().peek(&user_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "session not found", "userId": user_id })),
        );
    };
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "userId": user_id,
            "turns": session.history,
            "apiCallCount": session.api_call_count,
        })),
    )
}

/// DELETE /api/session/:user_id – drops the session (logout, reset).
pub(crate) async fn clear(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<serde_json::Value> {
    let cleared = state.policy.memory().clear(&user_id);
    Json(serde_json::json!({ "userId": user_id, "cleared": cleared }))
}
