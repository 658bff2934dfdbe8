use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub catalog_entries: usize,
    pub catalog_loaded_at: Option<DateTime<Utc>>,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (catalog_entries, catalog_loaded_at) = state.catalog().status().await;
    let body = HealthResponse {
        status: "ok",
        catalog_entries,
        catalog_loaded_at,
    };
    (StatusCode::OK, Json(body))
}
