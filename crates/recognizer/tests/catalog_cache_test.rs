use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{Router, http::StatusCode, routing::get};
use recognizer::catalog::CatalogService;

const CATALOG_JS: &str = r#"var r = [["005827","YFDLC","易方达蓝筹精选混合A","混合型","YFD"],
["008888","HXHJ","华夏黄金ETF联接C","指数型","HX"],
["16172","BAD","坏代码基金A","指数型","BAD"]];"#;

async fn spawn_catalog_server(
    hits: Arc<AtomicUsize>,
    delay: Duration,
    fail_first: bool,
) -> String {
    let app = Router::new().route(
        "/js/fundcode_search.js",
        get(move || {
            let hits = hits.clone();
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                if fail_first && n == 0 {
                    (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string())
                } else {
                    (StatusCode::OK, CATALOG_JS.to_string())
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
    format!("http://{addr}/js/fundcode_search.js")
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let hits = Arc::new(AtomicUsize::new(0));
    let url = spawn_catalog_server(hits.clone(), Duration::from_millis(200), false).await;
    let service = CatalogService::new(url).expect("service");

    let (a, b) = tokio::join!(service.load(), service.load());
    let a = a.expect("first load");
    let b = b.expect("second load");

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    // 5 位代码在解析时被过滤
    assert!(a.iter().all(|e| e.fund_code.len() == 6));
}

#[tokio::test]
async fn invalidate_forces_refetch() {
    let hits = Arc::new(AtomicUsize::new(0));
    let url = spawn_catalog_server(hits.clone(), Duration::ZERO, false).await;
    let service = CatalogService::new(url).expect("service");

    service.load().await.expect("first load");
    service.load().await.expect("cached load");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    service.invalidate().await;
    let (count, loaded_at) = service.status().await;
    assert_eq!(count, 0);
    assert!(loaded_at.is_none());

    service.load().await.expect("reload");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    let (count, loaded_at) = service.status().await;
    assert_eq!(count, 2);
    assert!(loaded_at.is_some());
}

#[tokio::test]
async fn failed_fetch_leaves_cache_empty_and_retries() {
    let hits = Arc::new(AtomicUsize::new(0));
    let url = spawn_catalog_server(hits.clone(), Duration::ZERO, true).await;
    let service = CatalogService::new(url).expect("service");

    assert!(service.load().await.is_err());
    let (count, _) = service.status().await;
    assert_eq!(count, 0);

    let list = service.load().await.expect("retry succeeds");
    assert_eq!(list.len(), 2);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
