use axum::Json;
use serde_json::json;
use std::fmt::Display;

use crate::state::AppState;

pub fn masked_message(state: &AppState, public_message: &'static str, err: impl Display) -> String {
    tracing::error!(error = %err, "internal error");
    if state.config().debug() {
        format!("{public_message}: {err}")
    } else {
        public_message.to_string()
    }
}

pub fn masked_json(
    state: &AppState,
    public_message: &'static str,
    err: impl Display,
) -> Json<serde_json::Value> {
    Json(json!({ "error": masked_message(state, public_message, err) }))
}
