use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{Router, routing::get};
use recognizer::catalog::CatalogService;
use recognizer::pipeline::{RecognizeError, recognize};
use recognizer::vision::{DetectorSession, FrameBuffer, ImageSource, OcrTimeouts, TextDetector};
use tokio::sync::mpsc;

const CATALOG_JS: &str =
    r#"var r = [["005827","YFDLC","易方达蓝筹精选混合A","混合型","YFD"]];"#;

async fn catalog_service() -> CatalogService {
    let app = Router::new().route("/js/fundcode_search.js", get(|| async { CATALOG_JS }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock");
    });
    CatalogService::new(format!("http://{addr}/js/fundcode_search.js")).expect("service")
}

struct StaticImage;

impl ImageSource for StaticImage {
    async fn acquire(&self, _image_path: &str) -> Result<FrameBuffer, String> {
        Ok(FrameBuffer {
            data: vec![0u8; 16],
            width: 2,
            height: 2,
        })
    }
}

struct BrokenImage;

impl ImageSource for BrokenImage {
    async fn acquire(&self, _image_path: &str) -> Result<FrameBuffer, String> {
        Ok(FrameBuffer {
            data: vec![0u8; 3],
            width: 2,
            height: 2,
        })
    }
}

struct ScriptedDetector {
    supported: bool,
    start_delay: Duration,
    fragments: Vec<String>,
    /// 发送完片段后不关通道，模拟引擎既不报错也不收尾
    stall: bool,
    released: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    fn new(fragments: &[&str]) -> Self {
        Self {
            supported: true,
            start_delay: Duration::ZERO,
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            stall: false,
            released: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct ScriptedSession {
    fragments: Vec<String>,
    stall: bool,
    released: Arc<AtomicUsize>,
}

impl TextDetector for ScriptedDetector {
    type Session = ScriptedSession;

    fn check_support(&self) -> Result<(), String> {
        if self.supported {
            Ok(())
        } else {
            Err("基础库版本过低".to_string())
        }
    }

    async fn start(&self) -> Result<ScriptedSession, String> {
        tokio::time::sleep(self.start_delay).await;
        Ok(ScriptedSession {
            fragments: self.fragments.clone(),
            stall: self.stall,
            released: self.released.clone(),
        })
    }
}

impl DetectorSession for ScriptedSession {
    fn run(&mut self, _frame: FrameBuffer) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        let fragments = self.fragments.clone();
        let stall = self.stall;
        tokio::spawn(async move {
            for fragment in fragments {
                let _ = tx.send(fragment).await;
            }
            if stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            drop(tx);
        });
        rx
    }

    fn release(self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn quick_timeouts() -> OcrTimeouts {
    OcrTimeouts {
        start: Duration::from_millis(100),
        result: Duration::from_millis(300),
    }
}

#[tokio::test]
async fn end_to_end_recognizes_a_holding_row() {
    let catalog = catalog_service().await;
    let detector = ScriptedDetector::new(&[
        "易方达蓝筹精选混合A",
        "10,193.48+500.00+12.34",
        "+1.23%",
    ]);
    let released = detector.released.clone();

    let report = recognize(&StaticImage, &detector, &catalog, "tmp://shot.jpg", quick_timeouts())
        .await
        .expect("report");

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].fund_code, "005827");
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsupported_capability_fails_fast() {
    let catalog = catalog_service().await;
    let mut detector = ScriptedDetector::new(&[]);
    detector.supported = false;

    let err = recognize(&StaticImage, &detector, &catalog, "tmp://shot.jpg", quick_timeouts())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::Unsupported(_)));
}

#[tokio::test]
async fn blank_image_reference_is_an_acquisition_error() {
    let catalog = catalog_service().await;
    let detector = ScriptedDetector::new(&[]);

    let err = recognize(&StaticImage, &detector, &catalog, "   ", quick_timeouts())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::Acquisition(_)));
}

#[tokio::test]
async fn frame_length_mismatch_is_an_acquisition_error() {
    let catalog = catalog_service().await;
    let detector = ScriptedDetector::new(&[]);

    let err = recognize(&BrokenImage, &detector, &catalog, "tmp://shot.jpg", quick_timeouts())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::Acquisition(_)));
}

#[tokio::test]
async fn slow_engine_startup_times_out() {
    let catalog = catalog_service().await;
    let mut detector = ScriptedDetector::new(&["易方达蓝筹精选混合A+1.23%"]);
    detector.start_delay = Duration::from_millis(500);

    let err = recognize(&StaticImage, &detector, &catalog, "tmp://shot.jpg", quick_timeouts())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::Engine(_)));
}

#[tokio::test]
async fn stalled_engine_proceeds_with_partial_fragments() {
    let catalog = catalog_service().await;
    let mut detector = ScriptedDetector::new(&[
        "易方达蓝筹精选混合A10,193.48+500.00+12.34+1.23%",
    ]);
    detector.stall = true;
    let released = detector.released.clone();

    let report = recognize(&StaticImage, &detector, &catalog, "tmp://shot.jpg", quick_timeouts())
        .await
        .expect("partial fragments still parse");

    assert_eq!(report.records.len(), 1);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn engine_returning_nothing_is_empty_recognition() {
    let catalog = catalog_service().await;
    let detector = ScriptedDetector::new(&[]);
    let released = detector.released.clone();

    let err = recognize(&StaticImage, &detector, &catalog, "tmp://shot.jpg", quick_timeouts())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::EmptyRecognition));
    // 失败路径同样要释放会话
    assert_eq!(released.load(Ordering::SeqCst), 1);
}
