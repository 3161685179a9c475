//! Ordered acquisition strategies for one asset; the first success wins.
//!
//! 1. Direct download of the resolved source URI.
//! 2. Element extraction from the rendered card page: fetch each image
//!    element's URI, then fall back to snapshotting the element.
//! 3. Whole-page capture, only when no image element could be found.
//!
//! Later strategies capture more noise, so each needs a larger artifact to
//! be accepted.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use card_stash_core::{Asset, MIN_ASSET_BYTES};
use tokio_util::sync::CancellationToken;

use crate::classify::AttemptOutcome;
use crate::fetch::{Attempt, AssetFetcher, FetchOutcome, write_artifact};
use crate::render::{PageRenderer, RenderedPage};

/// Minimum size for a direct download.
pub const DIRECT_FLOOR: u64 = MIN_ASSET_BYTES;
/// Minimum size for an element URI fetch or element snapshot.
pub const ELEMENT_FLOOR: u64 = 5_000;
/// Minimum size for a whole-page capture.
pub const PAGE_FLOOR: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    ElementExtract,
    PageCapture,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::ElementExtract => write!(f, "element"),
            Strategy::PageCapture => write!(f, "page capture"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Acquired { strategy: Strategy, bytes: u64 },
    /// All applicable strategies failed. `last` is the final direct-fetch
    /// outcome, if a direct fetch ran.
    Exhausted { last: Option<AttemptOutcome> },
    /// The artifact could not be written; no strategy can succeed.
    StorageFailed(String),
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct ChainReport {
    pub outcome: ChainOutcome,
    /// Attempts of the direct strategy.
    pub attempts: Vec<Attempt>,
}

pub struct FallbackChain {
    fetcher: AssetFetcher,
    renderer: Arc<dyn PageRenderer>,
}

impl FallbackChain {
    pub fn new(fetcher: AssetFetcher, renderer: Arc<dyn PageRenderer>) -> Self {
        Self { fetcher, renderer }
    }

    /// Acquire `asset` into `dest`.
    pub async fn run(&self, asset: &Asset, dest: &Path, cancel: &CancellationToken) -> ChainReport {
        let mut attempts = Vec::new();
        let mut last = None;

        if let Some(source) = asset.source.as_deref() {
            let report = self.fetcher.fetch(source, dest, DIRECT_FLOOR, cancel).await;
            attempts = report.attempts;
            match report.outcome {
                FetchOutcome::Saved { bytes } => {
                    return ChainReport {
                        outcome: ChainOutcome::Acquired {
                            strategy: Strategy::Direct,
                            bytes,
                        },
                        attempts,
                    };
                }
                FetchOutcome::Interrupted => {
                    return ChainReport {
                        outcome: ChainOutcome::Interrupted,
                        attempts,
                    };
                }
                FetchOutcome::Exhausted {
                    last: AttemptOutcome::Storage(msg),
                } => {
                    return ChainReport {
                        outcome: ChainOutcome::StorageFailed(msg),
                        attempts,
                    };
                }
                FetchOutcome::Exhausted { last: outcome } => last = Some(outcome),
                FetchOutcome::AlreadyLocal => {}
            }
        }

        let outcome = match asset.page_url.as_deref() {
            Some(page_url) if self.renderer.is_available() => {
                if cancel.is_cancelled() {
                    ChainOutcome::Interrupted
                } else {
                    self.render_strategies(page_url, dest, cancel)
                        .await
                        .unwrap_or(ChainOutcome::Exhausted { last })
                }
            }
            _ => ChainOutcome::Exhausted { last },
        };
        ChainReport { outcome, attempts }
    }

    /// Strategies 2 and 3. `None` when none of them produced an artifact.
    async fn render_strategies(
        &self,
        page_url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Option<ChainOutcome> {
        let mut page = match self.renderer.open(page_url).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Could not render {}: {}", page_url, e);
                return None;
            }
        };
        let outcome = extract_from_page(page.as_mut(), &self.fetcher, page_url, dest, cancel).await;
        page.close().await;
        outcome
    }
}

async fn extract_from_page(
    page: &mut dyn RenderedPage,
    fetcher: &AssetFetcher,
    page_url: &str,
    dest: &Path,
    cancel: &CancellationToken,
) -> Option<ChainOutcome> {
    let images = match page.find_images().await {
        Ok(images) => images,
        Err(e) => {
            log::warn!("Image lookup failed on {}: {}", page_url, e);
            Vec::new()
        }
    };

    if images.is_empty() {
        log::info!("No image element on {}; capturing the page", page_url);
        let bytes = match page.capture_page().await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("{}", e);
                return None;
            }
        };
        return match write_artifact(dest, &bytes, PAGE_FLOOR).await {
            Ok(bytes) => Some(ChainOutcome::Acquired {
                strategy: Strategy::PageCapture,
                bytes,
            }),
            Err(AttemptOutcome::Storage(msg)) => Some(ChainOutcome::StorageFailed(msg)),
            Err(outcome) => {
                log::warn!("Page capture of {} rejected: {}", page_url, outcome);
                None
            }
        };
    }

    for image in &images {
        let Some(uri) = image.source.as_deref().and_then(|s| resolve(page_url, s)) else {
            continue;
        };
        let report = fetcher.fetch_once(&uri, dest, ELEMENT_FLOOR, page_url, cancel).await;
        match report.outcome {
            FetchOutcome::Saved { bytes } => {
                return Some(ChainOutcome::Acquired {
                    strategy: Strategy::ElementExtract,
                    bytes,
                });
            }
            FetchOutcome::Interrupted => return Some(ChainOutcome::Interrupted),
            FetchOutcome::Exhausted {
                last: AttemptOutcome::Storage(msg),
            } => return Some(ChainOutcome::StorageFailed(msg)),
            _ => {}
        }
    }

    for image in &images {
        if cancel.is_cancelled() {
            return Some(ChainOutcome::Interrupted);
        }
        let bytes = match page.snapshot_image(image.position).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("{}", e);
                continue;
            }
        };
        match write_artifact(dest, &bytes, ELEMENT_FLOOR).await {
            Ok(bytes) => {
                return Some(ChainOutcome::Acquired {
                    strategy: Strategy::ElementExtract,
                    bytes,
                });
            }
            Err(AttemptOutcome::Storage(msg)) => return Some(ChainOutcome::StorageFailed(msg)),
            Err(outcome) => log::warn!("Element snapshot on {} rejected: {}", page_url, outcome),
        }
    }
    None
}

/// Resolve an element source against the page it was found on.
fn resolve(page_url: &str, source: &str) -> Option<String> {
    let source = source.trim();
    if source.is_empty() || source.starts_with("data:") {
        return None;
    }
    let base = url::Url::parse(page_url).ok()?;
    base.join(source).ok().map(String::from)
}

#[cfg(test)]
#[path = "tests/fallback_tests.rs"]
mod tests;
