//! Resolution of a single card image: idempotence checks, denylist, the
//! fallback chain, and the terminal placeholder/denylist fallback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use card_stash_core::util::is_remote;
use card_stash_core::{AcquireConfig, Asset, AssetState, MIN_ASSET_BYTES, Record};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::classify::AttemptOutcome;
use crate::fallback::{ChainOutcome, FallbackChain, Strategy};
use crate::placeholder::PlaceholderPolicy;
use crate::registry::ProblemSources;

/// Why an asset was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a remote source nor a page to render.
    NoSource,
}

/// How one asset was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetResolution {
    /// Already resolved with a healthy artifact.
    Present,
    Downloaded { strategy: Strategy, file: String, bytes: u64 },
    /// The source is a known problem source; no request was made.
    Denylisted { source: String, placeholder: bool },
    /// Every strategy failed.
    Failed {
        source: Option<String>,
        last: Option<AttemptOutcome>,
        placeholder: bool,
    },
    /// The local artifact is missing and there is no source to re-fetch it from.
    Unrecoverable { reference: String },
    Skipped(SkipReason),
    /// Cancelled before completion; the record was not touched.
    Interrupted,
}

impl AssetResolution {
    /// Whether the placeholder was substituted.
    pub fn used_placeholder(&self) -> bool {
        matches!(
            self,
            AssetResolution::Denylisted { placeholder: true, .. }
                | AssetResolution::Failed { placeholder: true, .. }
        )
    }
}

/// Result for one card of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetOutcome {
    pub index: usize,
    pub id: String,
    pub resolution: AssetResolution,
}

/// Resolves the assets of records, one card at a time.
///
/// Shared by every worker of a run; the registry is behind a mutex and the
/// placeholder counter is atomic. Work on one artifact path is serialized,
/// so records that share a card id never write the same file at once.
pub struct AssetAcquirer {
    chain: FallbackChain,
    registry: Arc<Mutex<ProblemSources>>,
    placeholder: Arc<PlaceholderPolicy>,
    destinations: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    small_dir: PathBuf,
    link_prefix: String,
    update_in_place: bool,
}

impl AssetAcquirer {
    pub fn new(
        config: &AcquireConfig,
        chain: FallbackChain,
        registry: Arc<Mutex<ProblemSources>>,
        placeholder: Arc<PlaceholderPolicy>,
    ) -> Self {
        Self {
            chain,
            registry,
            placeholder,
            destinations: Mutex::new(HashMap::new()),
            small_dir: config.small_dir(),
            link_prefix: config.link_prefix.trim_end_matches('/').to_string(),
            update_in_place: config.update_in_place,
        }
    }

    pub fn placeholder(&self) -> &PlaceholderPolicy {
        &self.placeholder
    }

    /// Resolve card `index` of `record`.
    ///
    /// Returns `None` for cards that carry no image and no page.
    pub async fn acquire(
        &self,
        record: &mut Record,
        index: usize,
        cancel: &CancellationToken,
    ) -> Option<AssetOutcome> {
        let asset = record.asset(index, self.placeholder.link())?;
        let dest = self
            .small_dir
            .join(artifact_name(&asset.id, asset.source.as_deref()));
        let slot = self.destination_lock(&dest).await;
        let resolution = {
            let _held = slot.lock().await;
            self.resolve(record, &asset, cancel).await
        };
        Some(AssetOutcome {
            index,
            id: asset.id,
            resolution,
        })
    }

    async fn resolve(
        &self,
        record: &mut Record,
        asset: &Asset,
        cancel: &CancellationToken,
    ) -> AssetResolution {
        match &asset.state {
            AssetState::Placeholder => return AssetResolution::Present,
            AssetState::LocalPath(reference) => {
                let path = self.artifact_path(reference);
                if is_healthy(&path).await {
                    return AssetResolution::Present;
                }
                remove_corrupt(&path).await;
                if asset.source.is_none() {
                    log::warn!(
                        "{}: artifact {} is missing and no source is known",
                        record.name(),
                        path.display()
                    );
                    return AssetResolution::Unrecoverable {
                        reference: reference.clone(),
                    };
                }
                log::info!("{}: re-acquiring {}", record.name(), asset.id);
            }
            AssetState::Remote => {}
        }

        let source = asset.source.clone();
        if source.is_none() && asset.page_url.is_none() {
            log::info!("{}: no image source for {}", record.name(), asset.id);
            return AssetResolution::Skipped(SkipReason::NoSource);
        }

        if let Some(src) = source.as_deref() {
            if self.registry.lock().await.should_skip(src) {
                log::info!("Skipping known problem source {}", src);
                let placeholder = self.substitute(record, asset.index);
                return AssetResolution::Denylisted {
                    source: src.to_string(),
                    placeholder,
                };
            }
        }

        let file = artifact_name(&asset.id, source.as_deref());
        let dest = self.small_dir.join(&file);
        if let Ok(meta) = tokio::fs::metadata(&dest).await {
            if meta.len() > MIN_ASSET_BYTES {
                log::debug!("{} already exists", dest.display());
                self.update_reference(record, asset.index, &file, source.as_deref());
                return AssetResolution::Present;
            }
            remove_corrupt(&dest).await;
        }

        let report = self.chain.run(asset, &dest, cancel).await;
        match report.outcome {
            ChainOutcome::Acquired { strategy, bytes } => {
                log::info!("Downloaded {} via {} ({} bytes)", file, strategy, bytes);
                self.update_reference(record, asset.index, &file, source.as_deref());
                AssetResolution::Downloaded {
                    strategy,
                    file,
                    bytes,
                }
            }
            ChainOutcome::Interrupted => AssetResolution::Interrupted,
            ChainOutcome::StorageFailed(msg) => {
                log::error!(
                    "{}: could not store {}: {}; it will be retried next run",
                    record.name(),
                    file,
                    msg
                );
                AssetResolution::Failed {
                    source,
                    last: Some(AttemptOutcome::Storage(msg)),
                    placeholder: false,
                }
            }
            ChainOutcome::Exhausted { last } => {
                log::error!(
                    "{}: could not acquire {} after {} attempts",
                    record.name(),
                    asset.id,
                    report.attempts.len()
                );
                if let Some(src) = source.as_deref() {
                    if let Err(e) = self.registry.lock().await.record(src).await {
                        log::error!("{}", e);
                    }
                }
                let placeholder = self.substitute(record, asset.index);
                AssetResolution::Failed {
                    source,
                    last,
                    placeholder,
                }
            }
        }
    }

    /// The lock guarding work on `dest`.
    async fn destination_lock(&self, dest: &Path) -> Arc<Mutex<()>> {
        let mut destinations = self.destinations.lock().await;
        destinations.entry(dest.to_path_buf()).or_default().clone()
    }

    /// Filesystem path of a local document reference.
    fn artifact_path(&self, reference: &str) -> PathBuf {
        let reference = reference.trim();
        if let Some(rest) = reference
            .strip_prefix(self.link_prefix.as_str())
            .and_then(|r| r.strip_prefix('/'))
        {
            return self.small_dir.join(rest);
        }
        match Path::new(reference).file_name() {
            Some(name) => self.small_dir.join(name),
            None => self.small_dir.join(reference),
        }
    }

    fn update_reference(
        &self,
        record: &mut Record,
        index: usize,
        file: &str,
        source: Option<&str>,
    ) {
        if !self.update_in_place {
            return;
        }
        let link = if self.link_prefix.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.link_prefix, file)
        };
        record.set_image(index, &link, source.filter(|s| is_remote(s)));
    }

    fn substitute(&self, record: &mut Record, index: usize) -> bool {
        self.update_in_place && self.placeholder.apply(record, index)
    }
}

/// `<id>_small<ext>`, with the extension taken from the source URI path.
pub fn artifact_name(id: &str, source: Option<&str>) -> String {
    let ext = source
        .and_then(|s| url::Url::parse(s).ok())
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .filter(|e| !e.is_empty() && e.len() <= 5)
                .map(str::to_ascii_lowercase)
        })
        .unwrap_or_else(|| "jpg".to_string());
    format!("{}_small.{}", id, ext)
}

async fn is_healthy(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > MIN_ASSET_BYTES)
        .unwrap_or(false)
}

async fn remove_corrupt(path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        log::warn!("Removing corrupt artifact {}", path.display());
        if let Err(e) = tokio::fs::remove_file(path).await {
            log::error!("Could not remove {}: {}", path.display(), e);
        }
    }
}
