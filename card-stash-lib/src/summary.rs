//! Per-record and per-run counters.

use card_stash_core::RecordName;
use card_stash_scraper::{AssetOutcome, AssetResolution};

/// Counters for one processed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub record: RecordName,
    /// Assets that reached a terminal resolution.
    pub total: usize,
    pub downloaded: usize,
    /// Already present, denylisted, or nothing to fetch.
    pub skipped: usize,
    pub failed: usize,
    pub placeholder_used: usize,
    pub unrecoverable: usize,
    /// Stopped by shutdown before every asset was resolved.
    pub interrupted: bool,
    /// The document was rewritten.
    pub written: bool,
    pub backup_created: bool,
}

impl RecordSummary {
    pub fn new(record: RecordName) -> Self {
        Self {
            record,
            total: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            placeholder_used: 0,
            unrecoverable: 0,
            interrupted: false,
            written: false,
            backup_created: false,
        }
    }

    /// Count one asset outcome. Interrupted assets only set the flag.
    pub fn add(&mut self, outcome: &AssetOutcome) {
        if outcome.resolution.used_placeholder() {
            self.placeholder_used += 1;
        }
        match &outcome.resolution {
            AssetResolution::Interrupted => {
                self.interrupted = true;
                return;
            }
            AssetResolution::Downloaded { .. } => self.downloaded += 1,
            AssetResolution::Present
            | AssetResolution::Denylisted { .. }
            | AssetResolution::Skipped(_) => self.skipped += 1,
            AssetResolution::Failed { .. } => self.failed += 1,
            AssetResolution::Unrecoverable { .. } => self.unrecoverable += 1,
        }
        self.total += 1;
    }
}

/// Aggregate counters of a run, covering completed work only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records that were loaded and processed.
    pub records: usize,
    pub records_saved: usize,
    /// Records skipped because they could not be loaded or saved.
    pub record_errors: usize,
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub placeholder_used: usize,
    pub unrecoverable: usize,
    /// The run was drained by a shutdown request.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn add_record(&mut self, record: &RecordSummary) {
        self.records += 1;
        if record.written {
            self.records_saved += 1;
        }
        self.total += record.total;
        self.downloaded += record.downloaded;
        self.skipped += record.skipped;
        self.failed += record.failed;
        self.placeholder_used += record.placeholder_used;
        self.unrecoverable += record.unrecoverable;
    }

    pub fn add_error(&mut self) {
        self.record_errors += 1;
    }
}
