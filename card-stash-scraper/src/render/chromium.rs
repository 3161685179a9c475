//! Headless Chromium renderer using chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{IMAGE_SELECTORS, PageImage, PageRenderer, RenderedPage};
use crate::error::ScrapeError;

/// Time given to lazy images to load after scrolling them into view.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

fn render_error(context: &str, e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Render(format!("{}: {}", context, e))
}

pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    timeout: Duration,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance. Page loads are bounded by `timeout`.
    pub async fn launch(timeout: Duration) -> Result<Self, ScrapeError> {
        let config = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| render_error("invalid browser configuration", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| render_error("failed to launch Chromium", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        log::info!("Launched headless Chromium");
        Ok(Self {
            browser,
            handler,
            timeout,
        })
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>, ScrapeError> {
        let load = async {
            let page = self
                .browser
                .new_page(url)
                .await
                .map_err(|e| render_error("failed to open page", e))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| render_error("navigation failed", e))?;
            Ok::<Page, ScrapeError>(page)
        };

        let page = tokio::time::timeout(self.timeout, load)
            .await
            .map_err(|_| ScrapeError::Render(format!("timed out loading {}", url)))??;

        Ok(Box::new(ChromiumPage {
            page,
            images: Vec::new(),
        }))
    }
}

struct ChromiumPage {
    page: Page,
    images: Vec<Element>,
}

#[async_trait]
impl RenderedPage for ChromiumPage {
    async fn find_images(&mut self) -> Result<Vec<PageImage>, ScrapeError> {
        self.images.clear();
        for selector in IMAGE_SELECTORS {
            let found = self
                .page
                .find_elements(selector)
                .await
                .unwrap_or_default();
            if !found.is_empty() {
                self.images = found;
                break;
            }
        }

        let mut images = Vec::with_capacity(self.images.len());
        for (position, element) in self.images.iter().enumerate() {
            let src = element.attribute("src").await.ok().flatten();
            let source = match src.filter(|s| !s.trim().is_empty()) {
                Some(s) => Some(s),
                None => element.attribute("data-echo").await.ok().flatten(),
            };
            images.push(PageImage { position, source });
        }
        Ok(images)
    }

    async fn snapshot_image(&mut self, position: usize) -> Result<Vec<u8>, ScrapeError> {
        let element = self
            .images
            .get(position)
            .ok_or_else(|| ScrapeError::Render(format!("no image element at {}", position)))?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| render_error("scroll failed", e))?;
        tokio::time::sleep(SETTLE_DELAY).await;
        element
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| render_error("element snapshot failed", e))
    }

    async fn capture_page(&mut self) -> Result<Vec<u8>, ScrapeError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| render_error("page capture failed", e))
    }

    async fn close(self: Box<Self>) {
        let ChromiumPage { page, images } = *self;
        drop(images);
        if let Err(e) = page.close().await {
            log::debug!("Closing page failed: {}", e);
        }
    }
}
