//! Page rendering for the browser-based extraction strategies.
//!
//! [`PageRenderer`] opens a card page; [`RenderedPage`] exposes the few
//! operations the fallback chain needs: locating the card image elements,
//! snapshotting one of them, and capturing the whole page.

#[cfg(feature = "browser")]
pub mod chromium;

use async_trait::async_trait;

use crate::error::ScrapeError;

/// Selectors tried in order; the first one matching any element wins.
pub const IMAGE_SELECTORS: [&str; 3] = ["img.card-img", "img.lazy[data-echo]", ".card-image img"];

/// An image element found on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// Position among the matched elements.
    pub position: usize,
    /// `src`, or `data-echo` for lazily loaded images, as written in the page.
    pub source: Option<String>,
}

/// A browser engine able to open pages.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Whether pages can be opened at all.
    fn is_available(&self) -> bool {
        true
    }

    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>, ScrapeError>;
}

/// A loaded page.
#[async_trait]
pub trait RenderedPage: Send {
    /// Image elements for the first selector of [`IMAGE_SELECTORS`] that
    /// matches anything. Empty when none match.
    async fn find_images(&mut self) -> Result<Vec<PageImage>, ScrapeError>;

    /// PNG snapshot of the image at `position`.
    async fn snapshot_image(&mut self, position: usize) -> Result<Vec<u8>, ScrapeError>;

    /// PNG capture of the entire page.
    async fn capture_page(&mut self) -> Result<Vec<u8>, ScrapeError>;

    async fn close(self: Box<Self>);
}

/// Renderer used when no browser is configured; the render strategies are
/// skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

#[async_trait]
impl PageRenderer for NoopRenderer {
    fn is_available(&self) -> bool {
        false
    }

    async fn open(&self, _url: &str) -> Result<Box<dyn RenderedPage>, ScrapeError> {
        Err(ScrapeError::Render("no browser renderer configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_renderer_is_unavailable() {
        let renderer = NoopRenderer;
        assert!(!renderer.is_available());
        assert!(matches!(
            renderer.open("https://example.com").await,
            Err(ScrapeError::Render(_))
        ));
    }
}
