use axum::{Json, extract::Query, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::matcher;
use crate::routes::errors::masked_json;
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub limit: Option<usize>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let keyword = query.keyword.unwrap_or_default();
    if keyword.trim().is_empty() {
        return (StatusCode::OK, Json(json!({ "items": [] }))).into_response();
    }

    let list = match state.catalog().load().await {
        Ok(list) => list,
        Err(e) => {
            return (
                StatusCode::BAD_GATEWAY,
                masked_json(&state, "基金列表加载失败", e),
            )
                .into_response();
        }
    };

    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let items: Vec<_> = matcher::search_by_name(&keyword, limit, &list)
        .into_iter()
        .cloned()
        .collect();
    (StatusCode::OK, Json(json!({ "items": items }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub code: String,
}

/// 未匹配行的人工兜底：输入 6 位代码精确对账
pub async fn resolve(
    State(state): State<AppState>,
    Json(body): Json<ResolveBody>,
) -> impl IntoResponse {
    let code: String = body
        .code
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(6)
        .collect();
    if code.len() != 6 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "请输入6位基金代码" })),
        )
            .into_response();
    }

    let list = match state.catalog().load().await {
        Ok(list) => list,
        Err(e) => {
            return (
                StatusCode::BAD_GATEWAY,
                masked_json(&state, "基金列表加载失败", e),
            )
                .into_response();
        }
    };

    match list.iter().find(|e| e.fund_code == code) {
        Some(entry) => (StatusCode::OK, Json(json!(entry))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "未找到该代码的基金" })),
        )
            .into_response(),
    }
}
