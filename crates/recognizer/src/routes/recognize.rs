use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::pipeline::{self, RecognizeError};
use crate::routes::errors::masked_json;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecognizeTextBody {
    pub fragments: Vec<String>,
}

/// 对已在端上识别出的原始片段跑解析与对账全流程
pub async fn recognize_text(
    State(state): State<AppState>,
    Json(body): Json<RecognizeTextBody>,
) -> impl IntoResponse {
    match pipeline::recognize_fragments(&body.fragments, state.catalog()).await {
        Ok(report) => (StatusCode::OK, Json(json!(report))).into_response(),
        Err(RecognizeError::Catalog(e)) => (
            StatusCode::BAD_GATEWAY,
            masked_json(&state, "基金列表加载失败", e),
        )
            .into_response(),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
