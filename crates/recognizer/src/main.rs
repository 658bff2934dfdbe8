use std::net::SocketAddr;

use axum::http::HeaderValue;
use recognizer::{app, catalog::CatalogService, config::ConfigStore, state::AppState};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ConfigStore::load();
    let port = config.port();

    let catalog = match CatalogService::new(config.catalog_url()) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "创建 HTTP 客户端失败");
            std::process::exit(1);
        }
    };

    let state = AppState::new(config, catalog);

    // 启动时预热一次目录，失败不阻塞服务（首个请求会再触发拉取）
    {
        let state = state.clone();
        tokio::spawn(async move {
            match state.catalog().load().await {
                Ok(list) => tracing::info!(count = list.len(), "基金列表预热完成"),
                Err(e) => tracing::warn!(error = %e, "基金列表预热失败"),
            }
        });
    }

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_headers(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any);

    let app = app(state).layer(TraceLayer::new_for_http()).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "recognizer listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener");
    axum::serve(listener, app).await.expect("serve");
}
