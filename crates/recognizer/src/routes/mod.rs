use axum::Router;

use crate::state::AppState;

pub mod catalog;
pub mod errors;
pub mod funds;
pub mod health;
pub mod recognize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", axum::routing::get(health::health))
        .route("/api/funds/search", axum::routing::get(funds::search))
        .route("/api/funds/resolve", axum::routing::post(funds::resolve))
        .route(
            "/api/recognize/text",
            axum::routing::post(recognize::recognize_text),
        )
        .route(
            "/api/catalog/refresh",
            axum::routing::post(catalog::refresh),
        )
}
