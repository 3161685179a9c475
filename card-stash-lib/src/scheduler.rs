//! Batched, cancellable acquisition over the records of a data directory.
//!
//! Records are split into batches. Inside a batch up to `workers` records are
//! processed concurrently, each owned by a single task that walks its cards
//! in order and saves the document when done. Batches are separated by a
//! jittered pause. Cancelling the token drains the run: no new record, batch
//! or attempt starts, and every record that changed is still saved.

use std::pin::pin;
use std::sync::Arc;

use card_stash_catalog::{CatalogStore, SaveOutcome, StoreError};
use card_stash_core::config::secs;
use card_stash_core::{AcquireConfig, RecordName};
use card_stash_scraper::{
    AssetAcquirer, AssetFetcher, AssetResolution, FallbackChain, NoopRenderer, PLACEHOLDER_FILE,
    PROBLEM_SOURCES_FILE, PageRenderer, PlaceholderPolicy, ProblemSources, RequestGate,
    sleep_or_cancel,
};
use futures::stream::{self, StreamExt};
use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::events::{AcquireEvent, RunState};
use crate::summary::{RecordSummary, RunSummary};

/// What became of one record of a batch.
enum RecordResult {
    Finished(RecordSummary),
    /// Load or save failed.
    Failed,
    /// Cancelled before any work was done.
    NotStarted,
}

/// The page renderer selected by `config.render`.
pub async fn launch_renderer(config: &AcquireConfig) -> Result<Arc<dyn PageRenderer>, RunError> {
    if !config.render {
        return Ok(Arc::new(NoopRenderer));
    }

    #[cfg(feature = "browser")]
    {
        let renderer =
            card_stash_scraper::ChromiumRenderer::launch(config.request_timeout()).await?;
        Ok(Arc::new(renderer))
    }

    #[cfg(not(feature = "browser"))]
    {
        log::warn!("Page rendering requested, but this build has no browser support");
        Ok(Arc::new(NoopRenderer))
    }
}

/// Run one acquisition pass.
///
/// With `filter` set only that record is processed. Fatal setup problems are
/// returned before the first batch starts; everything else is logged,
/// reported through `events` and counted in the summary.
pub async fn run_acquisition(
    config: &AcquireConfig,
    renderer: Arc<dyn PageRenderer>,
    filter: Option<&RecordName>,
    events: mpsc::UnboundedSender<AcquireEvent>,
    cancel: CancellationToken,
) -> Result<RunSummary, RunError> {
    let _ = events.send(AcquireEvent::StateChanged(RunState::Idle));
    config.validate()?;

    let store = CatalogStore::open(&config.data_dir)?;
    let names = match filter {
        Some(name) => {
            store.locate(name)?;
            vec![name.clone()]
        }
        None => store.list()?,
    };

    let small_dir = config.small_dir();
    std::fs::create_dir_all(&small_dir).map_err(|source| RunError::CreateDir {
        path: small_dir.clone(),
        source,
    })?;

    let registry = ProblemSources::load(
        config.image_dir.join(PROBLEM_SOURCES_FILE),
        config.skip_problem_sources,
    )?;
    if registry.is_enabled() {
        log::info!("Loaded {} known problem sources", registry.len());
    } else {
        log::info!("Problem-source skipping is off");
    }

    let placeholder = PlaceholderPolicy::prepare(
        &small_dir,
        config.link_for(PLACEHOLDER_FILE),
        config.placeholder_path.as_deref(),
        config.use_placeholder,
    );
    if placeholder.is_enabled() {
        log::info!("Placeholder image: {}", placeholder.path().display());
    } else {
        log::info!("Placeholder substitution is off");
    }
    let gate = Arc::new(RequestGate::new(config.min_request_interval()));
    let fetcher = AssetFetcher::from_config(config, gate)?;
    let acquirer = AssetAcquirer::new(
        config,
        FallbackChain::new(fetcher, renderer),
        Arc::new(Mutex::new(registry)),
        Arc::new(placeholder),
    );

    let batches: Vec<&[RecordName]> = names.chunks(config.batch_size).collect();
    let workers = config.effective_workers();
    log::info!(
        "Acquiring images for {} records in {} batches ({} workers)",
        names.len(),
        batches.len(),
        workers
    );
    let _ = events.send(AcquireEvent::StateChanged(RunState::Running));
    let _ = events.send(AcquireEvent::Planned {
        records: names.len(),
        batches: batches.len(),
    });

    let mut summary = RunSummary::default();
    let mut draining = false;
    for (i, batch) in batches.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let _ = events.send(AcquireEvent::BatchStarted {
            batch: i + 1,
            batches: batches.len(),
            records: batch.len(),
        });

        let mut work = pin!(
            stream::iter(batch.iter())
                .map(|name| process_record(&store, &acquirer, name, &events, &cancel))
                .buffer_unordered(workers)
                .collect::<Vec<RecordResult>>()
        );
        let results = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !draining => enter_draining(&events, &mut draining),
                results = &mut work => break results,
            }
        };

        for result in results {
            match result {
                RecordResult::Finished(record) => summary.add_record(&record),
                RecordResult::Failed => summary.add_error(),
                RecordResult::NotStarted => {}
            }
        }

        if i + 1 < batches.len() && !cancel.is_cancelled() {
            let pause = {
                let mut rng = rand::rng();
                secs(rng.random_range(config.pause_min_secs..=config.pause_max_secs))
            };
            log::info!("Batch {} done, pausing {:.1}s", i + 1, pause.as_secs_f64());
            let _ = events.send(AcquireEvent::Pausing { duration: pause });
            if !sleep_or_cancel(pause, &cancel).await {
                break;
            }
        }
    }

    summary.interrupted = cancel.is_cancelled();
    log::info!(
        "{} placeholder substitutions this run",
        acquirer.placeholder().substitutions()
    );
    if summary.interrupted {
        enter_draining(&events, &mut draining);
        log::warn!("Run interrupted; partial results were saved");
    } else {
        let _ = events.send(AcquireEvent::StateChanged(RunState::Completed));
    }
    let _ = events.send(AcquireEvent::Done);
    Ok(summary)
}

/// Announce the drain once.
fn enter_draining(events: &mpsc::UnboundedSender<AcquireEvent>, draining: &mut bool) {
    if *draining {
        return;
    }
    *draining = true;
    log::warn!("Draining: no new record or attempt will start");
    let _ = events.send(AcquireEvent::StateChanged(RunState::Draining));
}

/// Run a store call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("store task failed: {}", e)),
    }
}

/// Acquire every asset of one record, then save it.
///
/// The record is saved even when cancellation stops it halfway, so assets
/// that were already resolved are never lost.
async fn process_record(
    store: &CatalogStore,
    acquirer: &AssetAcquirer,
    name: &RecordName,
    events: &mpsc::UnboundedSender<AcquireEvent>,
    cancel: &CancellationToken,
) -> RecordResult {
    if cancel.is_cancelled() {
        return RecordResult::NotStarted;
    }

    let loaded = {
        let store = store.clone();
        let name = name.clone();
        blocking(move || store.load(&name)).await
    };
    let mut record = match loaded {
        Ok(record) => record,
        Err(message) => {
            log::error!("Skipping record {}: {}", name, message);
            let _ = events.send(AcquireEvent::RecordFailed {
                record: name.clone(),
                message,
            });
            return RecordResult::Failed;
        }
    };

    let assets = record.assets(acquirer.placeholder().link()).len();
    let _ = events.send(AcquireEvent::RecordStarted {
        record: name.clone(),
        assets,
    });

    let mut summary = RecordSummary::new(name.clone());
    for index in 0..record.cards().len() {
        if cancel.is_cancelled() {
            summary.interrupted = true;
            break;
        }
        let Some(outcome) = acquirer.acquire(&mut record, index, cancel).await else {
            continue;
        };
        summary.add(&outcome);
        if outcome.resolution == AssetResolution::Interrupted {
            break;
        }
        let _ = events.send(AcquireEvent::AssetResolved {
            record: name.clone(),
            outcome,
        });
    }

    let saved = {
        let store = store.clone();
        blocking(move || {
            let mut record = record;
            store.save(&mut record).map(|outcome| (record, outcome))
        })
        .await
    };
    match saved {
        Ok((record, SaveOutcome::Written { backup_created })) => {
            log::info!("Saved {}", record.path().display());
            summary.written = true;
            summary.backup_created = backup_created;
        }
        Ok((_, SaveOutcome::Unchanged)) => {}
        Err(message) => {
            log::error!("Could not save record {}: {}", name, message);
            let _ = events.send(AcquireEvent::RecordFailed {
                record: name.clone(),
                message,
            });
            return RecordResult::Failed;
        }
    }

    if summary.interrupted && summary.total == 0 && !summary.written {
        let _ = events.send(AcquireEvent::RecordCancelled {
            record: name.clone(),
        });
        return RecordResult::NotStarted;
    }
    let _ = events.send(AcquireEvent::RecordFinished(summary.clone()));
    RecordResult::Finished(summary)
}
