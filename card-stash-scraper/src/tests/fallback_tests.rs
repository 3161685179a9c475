use super::*;
use crate::client::RequestGate;
use crate::error::ScrapeError;
use crate::render::{NoopRenderer, PageImage};
use async_trait::async_trait;
use card_stash_core::{AcquireConfig, AssetState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Clone, Default)]
struct FakeRenderer {
    images: Vec<PageImage>,
    snapshot: Vec<u8>,
    capture: Vec<u8>,
    opened: Arc<AtomicUsize>,
}

struct FakePage(FakeRenderer);

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn open(&self, _url: &str) -> Result<Box<dyn RenderedPage>, ScrapeError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage(self.clone())))
    }
}

#[async_trait]
impl RenderedPage for FakePage {
    async fn find_images(&mut self) -> Result<Vec<PageImage>, ScrapeError> {
        Ok(self.0.images.clone())
    }

    async fn snapshot_image(&mut self, _position: usize) -> Result<Vec<u8>, ScrapeError> {
        Ok(self.0.snapshot.clone())
    }

    async fn capture_page(&mut self) -> Result<Vec<u8>, ScrapeError> {
        Ok(self.0.capture.clone())
    }

    async fn close(self: Box<Self>) {}
}

fn fast_fetcher() -> AssetFetcher {
    let config = AcquireConfig {
        min_delay_secs: 0.0,
        max_delay_secs: 0.0,
        penalty_min_secs: 0.0,
        penalty_max_secs: 0.0,
        max_retries: 0,
        request_timeout_secs: 5,
        ..Default::default()
    };
    AssetFetcher::from_config(&config, Arc::new(RequestGate::new(Duration::ZERO))).unwrap()
}

fn asset(source: Option<&str>, page_url: Option<&str>) -> Asset {
    Asset {
        index: 0,
        id: "base1-58".to_string(),
        source: source.map(String::from),
        page_url: page_url.map(String::from),
        state: AssetState::Remote,
    }
}

#[tokio::test]
async fn nothing_to_try_is_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(NoopRenderer));
    let report = chain
        .run(
            &asset(None, Some("https://www.cardmarket.com/x")),
            &dir.path().join("a.jpg"),
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(report.outcome, ChainOutcome::Exhausted { last: None });
    assert!(report.attempts.is_empty());
}

#[tokio::test]
async fn page_capture_when_no_element_found() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.jpg");
    let renderer = FakeRenderer {
        capture: vec![1u8; 20_000],
        ..Default::default()
    };
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(renderer));

    let report = chain
        .run(&asset(None, Some("https://www.cardmarket.com/x")), &dest, &CancellationToken::new())
        .await;
    assert_eq!(
        report.outcome,
        ChainOutcome::Acquired {
            strategy: Strategy::PageCapture,
            bytes: 20_000
        }
    );
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 20_000);
}

#[tokio::test]
async fn small_page_capture_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.jpg");
    let renderer = FakeRenderer {
        capture: vec![1u8; 9_000],
        ..Default::default()
    };
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(renderer));

    let report = chain
        .run(&asset(None, Some("https://www.cardmarket.com/x")), &dest, &CancellationToken::new())
        .await;
    assert_eq!(report.outcome, ChainOutcome::Exhausted { last: None });
    assert!(!dest.exists());
}

#[tokio::test]
async fn element_snapshot_when_source_unusable() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.jpg");
    let renderer = FakeRenderer {
        images: vec![PageImage {
            position: 0,
            source: Some("data:image/gif;base64,R0lGOD".to_string()),
        }],
        snapshot: vec![2u8; 6_000],
        capture: vec![3u8; 50_000],
        ..Default::default()
    };
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(renderer));

    let report = chain
        .run(&asset(None, Some("https://www.cardmarket.com/x")), &dest, &CancellationToken::new())
        .await;
    assert_eq!(
        report.outcome,
        ChainOutcome::Acquired {
            strategy: Strategy::ElementExtract,
            bytes: 6_000
        }
    );
    assert_eq!(std::fs::read(&dest).unwrap(), vec![2u8; 6_000]);
}

#[tokio::test]
async fn element_source_is_fetched_with_page_referer() {
    let server = MockServer::start().await;
    let page_url = format!("{}/en/Pokemon/Products/Singles/Base-Set/Pikachu", server.uri());
    Mock::given(method("GET"))
        .and(path("/img/58.png"))
        .and(header("referer", page_url.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![9u8; 8_000]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.png");
    let renderer = FakeRenderer {
        images: vec![PageImage {
            position: 0,
            source: Some("/img/58.png".to_string()),
        }],
        ..Default::default()
    };
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(renderer));

    let report = chain
        .run(&asset(None, Some(&page_url)), &dest, &CancellationToken::new())
        .await;
    assert_eq!(
        report.outcome,
        ChainOutcome::Acquired {
            strategy: Strategy::ElementExtract,
            bytes: 8_000
        }
    );
}

#[tokio::test]
async fn direct_failure_falls_through_to_renderer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/58.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.png");
    let renderer = FakeRenderer {
        capture: vec![1u8; 12_000],
        ..Default::default()
    };
    let opened = renderer.opened.clone();
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(renderer));

    let source = format!("{}/58.png", server.uri());
    let report = chain
        .run(
            &asset(Some(&source), Some("https://www.cardmarket.com/x")),
            &dest,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert!(matches!(
        report.outcome,
        ChainOutcome::Acquired {
            strategy: Strategy::PageCapture,
            ..
        }
    ));
}

#[tokio::test]
async fn cancelled_chain_does_not_render() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = FakeRenderer {
        capture: vec![1u8; 20_000],
        ..Default::default()
    };
    let opened = renderer.opened.clone();
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(renderer));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = chain
        .run(&asset(None, Some("https://www.cardmarket.com/x")), &dir.path().join("a.jpg"), &cancel)
        .await;
    assert_eq!(report.outcome, ChainOutcome::Interrupted);
    assert_eq!(opened.load(Ordering::SeqCst), 0);
}

#[test]
fn relative_sources_resolve_against_page() {
    assert_eq!(
        resolve("https://www.cardmarket.com/en/Pokemon/x", "/img/a.png").as_deref(),
        Some("https://www.cardmarket.com/img/a.png")
    );
    assert_eq!(
        resolve("https://www.cardmarket.com/x", "https://cdn.example/a.png").as_deref(),
        Some("https://cdn.example/a.png")
    );
    assert_eq!(resolve("https://www.cardmarket.com/x", "data:image/png;base64,AA"), None);
}

#[tokio::test]
async fn storage_failure_stops_the_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/58.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![7u8; 4096]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("a.jpg");
    std::fs::create_dir(crate::fetch::temp_path(&dest)).unwrap();
    let renderer = FakeRenderer {
        capture: vec![1u8; 20_000],
        ..Default::default()
    };
    let opened = renderer.opened.clone();
    let chain = FallbackChain::new(fast_fetcher(), Arc::new(renderer));

    let source = format!("{}/58.png", server.uri());
    let report = chain
        .run(
            &asset(Some(&source), Some("https://www.cardmarket.com/x")),
            &dest,
            &CancellationToken::new(),
        )
        .await;
    assert!(matches!(report.outcome, ChainOutcome::StorageFailed(_)), "{:?}", report.outcome);
    assert_eq!(opened.load(Ordering::SeqCst), 0);
    assert!(!dest.exists());
}
