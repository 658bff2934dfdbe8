pub mod catalog;
pub mod classify;
pub mod cleaner;
pub mod config;
pub mod matcher;
pub mod pipeline;
pub mod routes;
pub mod segment;
pub mod state;
pub mod vision;

use axum::Router;

pub fn app(state: state::AppState) -> Router {
    routes::router().with_state(state)
}
