//! The asset fetcher: bounded, paced retries of a single image download.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use card_stash_core::AcquireConfig;
use card_stash_core::util::is_remote;
use reqwest::header::CONTENT_TYPE;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::classify::{AttemptOutcome, TransientKind, Verdict, classify_response};
use crate::client::{ImageClient, RequestGate};
use crate::error::ScrapeError;

/// One fetch try.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// 0-based attempt number.
    pub ordinal: u32,
    /// Backoff delay slept before the request.
    pub delay: Duration,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The reference is not a remote URI; nothing to do.
    AlreadyLocal,
    /// The artifact was written to the destination.
    Saved { bytes: u64 },
    /// Every attempt failed.
    Exhausted { last: AttemptOutcome },
    /// Cancelled before an attempt could complete.
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    pub attempts: Vec<Attempt>,
}

impl FetchReport {
    fn new(outcome: FetchOutcome, attempts: Vec<Attempt>) -> Self {
        Self { outcome, attempts }
    }
}

enum Step {
    Saved(u64),
    Failed(AttemptOutcome),
    Interrupted,
}

/// Downloads one remote image to a destination path.
///
/// Owns no persisted state. Retries transient failures up to `max_retries`
/// times with jittered exponential backoff; rate-limit responses add a
/// penalty wait on top.
#[derive(Clone)]
pub struct AssetFetcher {
    client: ImageClient,
    policy: BackoffPolicy,
    max_retries: u32,
}

impl AssetFetcher {
    pub fn new(client: ImageClient, policy: BackoffPolicy, max_retries: u32) -> Self {
        Self {
            client,
            policy,
            max_retries,
        }
    }

    pub fn from_config(
        config: &AcquireConfig,
        gate: Arc<RequestGate>,
    ) -> Result<Self, ScrapeError> {
        let client = ImageClient::new(config.request_timeout(), gate, config.referer.clone())?;
        Ok(Self::new(
            client,
            BackoffPolicy::from_config(config),
            config.max_retries,
        ))
    }

    /// Fetch `uri` into `dest` with the full retry budget.
    ///
    /// The artifact is accepted only if it is strictly larger than `floor`
    /// bytes.
    pub async fn fetch(
        &self,
        uri: &str,
        dest: &Path,
        floor: u64,
        cancel: &CancellationToken,
    ) -> FetchReport {
        self.run(uri, dest, floor, None, self.max_retries + 1, cancel)
            .await
    }

    /// A single attempt with no backoff delay, sent with `referer`.
    pub async fn fetch_once(
        &self,
        uri: &str,
        dest: &Path,
        floor: u64,
        referer: &str,
        cancel: &CancellationToken,
    ) -> FetchReport {
        self.run(uri, dest, floor, Some(referer), 1, cancel).await
    }

    async fn run(
        &self,
        uri: &str,
        dest: &Path,
        floor: u64,
        referer: Option<&str>,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> FetchReport {
        let uri = uri.trim();
        if !is_remote(uri) {
            return FetchReport::new(FetchOutcome::AlreadyLocal, Vec::new());
        }

        let mut attempts = Vec::new();
        if let Err(e) = url::Url::parse(uri) {
            let outcome = AttemptOutcome::Permanent(format!("invalid URI: {}", e));
            attempts.push(Attempt {
                ordinal: 0,
                delay: Duration::ZERO,
                outcome: outcome.clone(),
            });
            return FetchReport::new(FetchOutcome::Exhausted { last: outcome }, attempts);
        }

        let mut schedule = self.policy.schedule();
        let mut last = AttemptOutcome::Permanent("no attempt made".to_string());

        for ordinal in 0..max_attempts {
            let delay = if max_attempts > 1 {
                schedule.next_delay(&mut rand::rng())
            } else {
                Duration::ZERO
            };
            if !sleep_or_cancel(delay, cancel).await {
                return FetchReport::new(FetchOutcome::Interrupted, attempts);
            }

            let outcome = match self.attempt(uri, dest, floor, referer, cancel).await {
                Step::Saved(bytes) => {
                    attempts.push(Attempt {
                        ordinal,
                        delay,
                        outcome: AttemptOutcome::Success,
                    });
                    log::debug!("Downloaded {} ({} bytes)", uri, bytes);
                    return FetchReport::new(FetchOutcome::Saved { bytes }, attempts);
                }
                Step::Interrupted => return FetchReport::new(FetchOutcome::Interrupted, attempts),
                Step::Failed(outcome) => outcome,
            };

            log::warn!(
                "Attempt {}/{} for {} failed: {}",
                ordinal + 1,
                max_attempts,
                uri,
                outcome
            );
            attempts.push(Attempt {
                ordinal,
                delay,
                outcome: outcome.clone(),
            });

            if outcome.is_final() {
                last = outcome;
                break;
            }
            if outcome == AttemptOutcome::RateLimited && ordinal + 1 < max_attempts {
                let penalty = self.policy.penalty(ordinal, &mut rand::rng());
                log::warn!(
                    "Rate limited; waiting {:.1}s before retrying",
                    penalty.as_secs_f64()
                );
                if !sleep_or_cancel(penalty, cancel).await {
                    return FetchReport::new(FetchOutcome::Interrupted, attempts);
                }
            }
            last = outcome;
        }

        FetchReport::new(FetchOutcome::Exhausted { last }, attempts)
    }

    async fn attempt(
        &self,
        uri: &str,
        dest: &Path,
        floor: u64,
        referer: Option<&str>,
        cancel: &CancellationToken,
    ) -> Step {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Step::Interrupted,
            response = self.client.get(uri, referer) => response,
        };
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                return Step::Failed(AttemptOutcome::Transient(TransientKind::Network(
                    e.to_string(),
                )));
            }
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let verdict = classify_response(
            response.status().as_u16(),
            content_type.as_deref(),
            response.content_length(),
            floor,
        );
        if verdict != Verdict::Accept {
            return Step::Failed(verdict.into());
        }

        match stream_to_file(response, dest, floor).await {
            Ok(bytes) => Step::Saved(bytes),
            Err(outcome) => Step::Failed(outcome),
        }
    }
}

/// Sleep for `delay` unless cancelled first. Returns `false` on cancellation.
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// `<dest>.tmp`, next to the destination.
pub fn temp_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Stream the body to the temp file, check its size, then move it into
/// place. The temp file never outlives a failure.
async fn stream_to_file(
    mut response: reqwest::Response,
    dest: &Path,
    floor: u64,
) -> Result<u64, AttemptOutcome> {
    let tmp = temp_path(dest);
    let mut file = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| AttemptOutcome::Storage(format!("cannot create {}: {}", tmp.display(), e)))?;

    let mut written: u64 = 0;
    let streamed: Result<(), AttemptOutcome> = async {
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AttemptOutcome::Transient(TransientKind::Network(e.to_string())))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| AttemptOutcome::Storage(format!("write failed: {}", e)))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| AttemptOutcome::Storage(format!("flush failed: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| AttemptOutcome::Storage(format!("sync failed: {}", e)))
    }
    .await;
    drop(file);

    if let Err(outcome) = streamed {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(outcome);
    }
    finish_artifact(&tmp, dest, written, floor).await
}

/// Write `bytes` (a rendered snapshot) through the same temp-then-rename path.
pub async fn write_artifact(
    dest: &Path,
    bytes: &[u8],
    floor: u64,
) -> Result<u64, AttemptOutcome> {
    let tmp = temp_path(dest);
    let written = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await
    }
    .await;
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(AttemptOutcome::Storage(format!(
            "cannot write {}: {}",
            tmp.display(),
            e
        )));
    }
    finish_artifact(&tmp, dest, bytes.len() as u64, floor).await
}

async fn finish_artifact(
    tmp: &Path,
    dest: &Path,
    len: u64,
    floor: u64,
) -> Result<u64, AttemptOutcome> {
    if len <= floor {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(AttemptOutcome::Transient(TransientKind::Undersized(len)));
    }
    if let Err(e) = tokio::fs::rename(tmp, dest).await {
        let _ = tokio::fs::remove_file(tmp).await;
        return Err(AttemptOutcome::Storage(format!(
            "cannot move artifact to {}: {}",
            dest.display(),
            e
        )));
    }
    Ok(len)
}
