use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::routes::errors::masked_json;
use crate::state::AppState;

/// 清缓存并立刻重拉（上游列表异常或加载失败后的重试入口）
pub async fn refresh(State(state): State<AppState>) -> impl IntoResponse {
    state.catalog().invalidate().await;
    match state.catalog().load().await {
        Ok(list) => (StatusCode::OK, Json(json!({ "entries": list.len() }))).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            masked_json(&state, "基金列表加载失败", e),
        )
            .into_response(),
    }
}
