use std::time::Duration;

use card_stash_core::RecordName;
use card_stash_scraper::AssetOutcome;

use crate::summary::RecordSummary;

/// Lifecycle of a run: `Idle -> Running -> (Draining | Completed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// Shutdown requested; in-flight work finishes and dirty records are saved.
    Draining,
    Completed,
}

/// Progress events emitted during a run, consumed by the CLI.
#[derive(Debug, Clone)]
pub enum AcquireEvent {
    StateChanged(RunState),
    /// Records found and how they were split.
    Planned { records: usize, batches: usize },
    BatchStarted {
        batch: usize,
        batches: usize,
        records: usize,
    },
    RecordStarted { record: RecordName, assets: usize },
    AssetResolved {
        record: RecordName,
        outcome: AssetOutcome,
    },
    /// A record finished; `summary.written` tells whether the document changed.
    RecordFinished(RecordSummary),
    /// The record could not be loaded or saved; the run continues.
    RecordFailed { record: RecordName, message: String },
    /// Cancelled after `RecordStarted` and before any asset resolved; not
    /// counted in the summary.
    RecordCancelled { record: RecordName },
    Pausing { duration: Duration },
    Done,
}
