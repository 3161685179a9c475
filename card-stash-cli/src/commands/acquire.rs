use std::collections::HashMap;
use std::path::Path;

use card_stash_catalog::CatalogStore;
use card_stash_core::util::format_bytes_approx;
use card_stash_core::{AcquireConfig, RecordName};
use card_stash_lib::{AcquireEvent, RunState, RunSummary};
use card_stash_scraper::{AcquireLog, AssetResolution, LogEntry};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use tokio_util::sync::CancellationToken;

use crate::cli_types::AcquireArgs;
use crate::error::CliError;
use crate::spinner::SpinnerPool;

const PAUSE_KEY: &str = "\0pause";

/// Apply command-line overrides on top of the settings file.
fn apply_overrides(config: &mut AcquireConfig, args: &AcquireArgs) {
    if let Some(n) = args.batch_size {
        config.batch_size = n;
    }
    if let Some(secs) = args.batch_break {
        config.pause_min_secs = secs * 0.8;
        config.pause_max_secs = secs * 1.2;
    }
    if let Some(secs) = args.min_delay {
        config.min_delay_secs = secs;
    }
    if let Some(secs) = args.max_delay {
        config.max_delay_secs = secs;
    }
    if let Some(n) = args.max_retries {
        config.max_retries = n;
    }
    if let Some(n) = args.workers {
        config.workers = n;
    }
    if args.no_update {
        config.update_in_place = false;
    }
    if args.no_skip_problem_files {
        config.skip_problem_sources = false;
    }
    if args.no_placeholder {
        config.use_placeholder = false;
    }
    if let Some(path) = &args.placeholder_path {
        config.placeholder_path = Some(path.clone());
    }
    if args.render {
        config.render = true;
    }
}

/// Run the acquire command.
pub(crate) fn run_acquire(
    args: AcquireArgs,
    settings: Option<&Path>,
    quiet: bool,
) -> Result<(), CliError> {
    let mut config = super::load_config(settings, &args.dirs)?;
    apply_overrides(&mut config, &args);
    config
        .validate()
        .map_err(|e| CliError::config(e.to_string()))?;
    let filter = args.record.as_deref().map(RecordName::new);

    log::info!(
        "Acquiring images for records in: {}",
        config.data_dir.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    log::info!(
        "Images:   {}",
        config.small_dir().display().if_supports_color(Stdout, |t| t.dimmed()),
    );
    if !config.update_in_place {
        log::info!(
            "{}",
            "Record files will not be modified".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!("");

    let rt = tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))?;
    let (summary, acquire_log) = rt.block_on(acquire(&config, filter.as_ref(), quiet))?;

    print_summary(&summary);

    if !args.no_log && !acquire_log.is_empty() {
        let log_path = AcquireLog::default_path(&config.image_dir);
        match acquire_log.write_to_file(&log_path) {
            Ok(()) => log::info!(
                "  Log written to {}",
                log_path.display().if_supports_color(Stdout, |t| t.dimmed()),
            ),
            Err(e) => log::warn!("Warning: could not write acquire log: {}", e),
        }
    }

    if summary.interrupted {
        log::warn!(
            "{}",
            "Run interrupted; the summary covers completed work only."
                .if_supports_color(Stdout, |t| t.yellow()),
        );
    } else if config.update_in_place && !args.no_publish {
        let store = CatalogStore::open(&config.data_dir)?;
        super::publish::publish_and_report(&store, &args.output)?;
    }
    Ok(())
}

async fn acquire(
    config: &AcquireConfig,
    filter: Option<&RecordName>,
    quiet: bool,
) -> Result<(RunSummary, AcquireLog), CliError> {
    let renderer = card_stash_lib::launch_renderer(config).await?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!(
                "{} Shutdown requested; finishing in-flight work and saving records...",
                "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            );
            signal_token.cancel();
        }
    });

    let mut pool = SpinnerPool::new(config.effective_workers() + 1, quiet);
    let mut acquire_log = AcquireLog::new();
    let mut total_records = 0usize;
    let mut started = 0usize;
    let mut progress: HashMap<RecordName, (usize, usize, usize)> = HashMap::new();

    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel::<AcquireEvent>();
    let run = card_stash_lib::run_acquisition(config, renderer, filter, event_tx, cancel);

    let result = card_stash_lib::run_with_events(run, event_rx, |e| match e {
        AcquireEvent::Planned { records, batches } => {
            total_records = records;
            pool.println(&format!("{} records in {} batches", records, batches));
        }
        AcquireEvent::BatchStarted {
            batch,
            batches,
            records,
        } => {
            pool.release(PAUSE_KEY);
            pool.println(&format!(
                "{}",
                format!("Batch {}/{} ({} records)", batch, batches, records)
                    .if_supports_color(Stdout, |t| t.bold()),
            ));
        }
        AcquireEvent::RecordStarted { record, assets } => {
            started += 1;
            progress.insert(record.clone(), (started, 0, assets));
            pool.claim(
                record.as_str(),
                format!("[{}/{}] {} (0/{})", started, total_records, record, assets),
            );
        }
        AcquireEvent::AssetResolved { record, outcome } => {
            if let Some(entry) = progress.get_mut(&record) {
                entry.1 += 1;
                let detail = match &outcome.resolution {
                    AssetResolution::Downloaded { file, bytes, .. } => {
                        format!("{} ({})", file, format_bytes_approx(*bytes))
                    }
                    _ => outcome.id.clone(),
                };
                pool.update(
                    record.as_str(),
                    format!(
                        "[{}/{}] {} ({}/{}) {}",
                        entry.0, total_records, record, entry.1, entry.2, detail
                    ),
                );
            }
            if let Some(entry) = LogEntry::from_outcome(&record, &outcome) {
                acquire_log.add(entry);
            }
        }
        AcquireEvent::RecordFinished(summary) => {
            pool.release(summary.record.as_str());
            let mark = if summary.failed + summary.unrecoverable > 0 {
                format!("{}", "\u{2718}".if_supports_color(Stdout, |t| t.red()))
            } else {
                format!("{}", "\u{2714}".if_supports_color(Stdout, |t| t.green()))
            };
            pool.println(&format!(
                "  {} {}: {} downloaded, {} skipped, {} failed{}",
                mark,
                summary.record,
                summary.downloaded,
                summary.skipped,
                summary.failed,
                if summary.written { "" } else { " (unchanged)" },
            ));
        }
        AcquireEvent::RecordFailed { record, message } => {
            pool.release(record.as_str());
            pool.println(&format!(
                "  {} {}: {}",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                record,
                message,
            ));
            acquire_log.add(LogEntry::RecordError {
                record: record.to_string(),
                message,
            });
        }
        AcquireEvent::RecordCancelled { record } => pool.release(record.as_str()),
        AcquireEvent::Pausing { duration } => {
            pool.claim(
                PAUSE_KEY,
                format!("Pausing {:.0}s before the next batch", duration.as_secs_f64()),
            );
        }
        AcquireEvent::StateChanged(RunState::Draining) => {
            pool.println("Draining: waiting for in-flight downloads to finish");
        }
        AcquireEvent::StateChanged(_) | AcquireEvent::Done => {}
    })
    .await;

    pool.clear_all();
    Ok((result?, acquire_log))
}

fn print_summary(summary: &RunSummary) {
    log::info!("");
    log::info!("{}", "Summary:".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  {} {} images downloaded ({} total, {} skipped)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.downloaded,
        summary.total,
        summary.skipped,
    );
    log::info!(
        "  {} {} of {} records saved",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        summary.records_saved,
        summary.records,
    );
    if summary.failed > 0 {
        log::warn!(
            "  {} {} failed",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.failed,
        );
    }
    if summary.placeholder_used > 0 {
        log::warn!(
            "  {} {} placeholders used",
            "~".if_supports_color(Stdout, |t| t.yellow()),
            summary.placeholder_used,
        );
    }
    if summary.unrecoverable > 0 {
        log::warn!(
            "  {} {} missing images with no source to re-fetch from",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            summary.unrecoverable,
        );
    }
    if summary.record_errors > 0 {
        log::warn!(
            "  {} {} records could not be read or saved",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            summary.record_errors,
        );
    }
}
