use std::path::{Path, PathBuf};

use card_stash_core::RecordName;

use crate::acquire::{AssetOutcome, AssetResolution, SkipReason};
use crate::fallback::Strategy;

/// A single entry in the acquisition log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Downloaded {
        record: String,
        card: String,
        file: String,
        strategy: Strategy,
    },
    Present {
        record: String,
        card: String,
    },
    Denylisted {
        record: String,
        card: String,
        source: String,
        placeholder: bool,
    },
    Failed {
        record: String,
        card: String,
        source: Option<String>,
        reason: Option<String>,
        placeholder: bool,
    },
    Unrecoverable {
        record: String,
        card: String,
        reference: String,
    },
    Skipped {
        record: String,
        card: String,
        reason: String,
    },
    /// The record could not be loaded or saved.
    RecordError {
        record: String,
        message: String,
    },
}

impl LogEntry {
    /// Log entry for a resolved asset. Interrupted assets are not logged.
    pub fn from_outcome(record: &RecordName, outcome: &AssetOutcome) -> Option<Self> {
        let record = record.to_string();
        let card = outcome.id.clone();
        let entry = match &outcome.resolution {
            AssetResolution::Present => LogEntry::Present { record, card },
            AssetResolution::Downloaded { strategy, file, .. } => LogEntry::Downloaded {
                record,
                card,
                file: file.clone(),
                strategy: *strategy,
            },
            AssetResolution::Denylisted {
                source,
                placeholder,
            } => LogEntry::Denylisted {
                record,
                card,
                source: source.clone(),
                placeholder: *placeholder,
            },
            AssetResolution::Failed {
                source,
                last,
                placeholder,
            } => LogEntry::Failed {
                record,
                card,
                source: source.clone(),
                reason: last.as_ref().map(|l| l.to_string()),
                placeholder: *placeholder,
            },
            AssetResolution::Unrecoverable { reference } => LogEntry::Unrecoverable {
                record,
                card,
                reference: reference.clone(),
            },
            AssetResolution::Skipped(SkipReason::NoSource) => LogEntry::Skipped {
                record,
                card,
                reason: "no image source or page".to_string(),
            },
            AssetResolution::Interrupted => return None,
        };
        Some(entry)
    }
}

/// Collects acquisition results and writes a log file.
#[derive(Debug, Default)]
pub struct AcquireLog {
    entries: Vec<LogEntry>,
}

impl AcquireLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> LogSummary {
        let mut summary = LogSummary::default();
        for entry in &self.entries {
            match entry {
                LogEntry::Downloaded { strategy, .. } => {
                    summary.downloaded += 1;
                    match strategy {
                        Strategy::Direct => summary.by_direct += 1,
                        Strategy::ElementExtract => summary.by_element += 1,
                        Strategy::PageCapture => summary.by_page += 1,
                    }
                }
                LogEntry::Present { .. } => summary.present += 1,
                LogEntry::Denylisted { .. } => summary.denylisted += 1,
                LogEntry::Failed { .. } => summary.failed += 1,
                LogEntry::Unrecoverable { .. } => summary.unrecoverable += 1,
                LogEntry::Skipped { .. } => summary.skipped += 1,
                LogEntry::RecordError { .. } => summary.record_errors += 1,
            }
        }
        summary
    }

    /// `acquire-log-<YYYYmmdd-HHMMSS>.txt` inside `dir`.
    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join(format!(
            "acquire-log-{}.txt",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ))
    }

    /// Write the log to a file.
    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        use std::io::Write;

        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        let summary = self.summary();

        writeln!(file, "=== Acquire Log ===")?;
        writeln!(
            file,
            "Date: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file)?;
        writeln!(file, "--- Summary ---")?;
        writeln!(
            file,
            "Downloaded: {} (direct: {}, element: {}, page capture: {})",
            summary.downloaded, summary.by_direct, summary.by_element, summary.by_page
        )?;
        writeln!(file, "Already present: {}", summary.present)?;
        writeln!(file, "Denylisted: {}", summary.denylisted)?;
        writeln!(file, "Failed: {}", summary.failed)?;
        writeln!(file, "Unrecoverable: {}", summary.unrecoverable)?;
        writeln!(file, "Skipped: {}", summary.skipped)?;
        writeln!(file, "Record errors: {}", summary.record_errors)?;
        writeln!(file)?;
        writeln!(file, "--- Details ---")?;
        writeln!(file)?;

        for entry in &self.entries {
            match entry {
                LogEntry::Downloaded {
                    record,
                    card,
                    file: f,
                    strategy,
                } => {
                    writeln!(file, "[OK] {}/{} -> {} ({})", record, card, f, strategy)?;
                }
                LogEntry::Present { record, card } => {
                    writeln!(file, "[PRESENT] {}/{}", record, card)?;
                }
                LogEntry::Denylisted {
                    record,
                    card,
                    source,
                    placeholder,
                } => {
                    writeln!(file, "[DENYLISTED] {}/{}", record, card)?;
                    writeln!(file, "     Source: {}", source)?;
                    if *placeholder {
                        writeln!(file, "     Placeholder applied")?;
                    }
                }
                LogEntry::Failed {
                    record,
                    card,
                    source,
                    reason,
                    placeholder,
                } => {
                    writeln!(file, "[FAILED] {}/{}", record, card)?;
                    if let Some(source) = source {
                        writeln!(file, "     Source: {}", source)?;
                    }
                    if let Some(reason) = reason {
                        writeln!(file, "     Last error: {}", reason)?;
                    }
                    if *placeholder {
                        writeln!(file, "     Placeholder applied")?;
                    }
                }
                LogEntry::Unrecoverable {
                    record,
                    card,
                    reference,
                } => {
                    writeln!(
                        file,
                        "[UNRECOVERABLE] {}/{}: {} is missing",
                        record, card, reference
                    )?;
                }
                LogEntry::Skipped {
                    record,
                    card,
                    reason,
                } => {
                    writeln!(file, "[SKIPPED] {}/{}: {}", record, card, reason)?;
                }
                LogEntry::RecordError { record, message } => {
                    writeln!(file, "[ERROR] {}: {}", record, message)?;
                }
            }
        }

        file.flush()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub downloaded: usize,
    pub present: usize,
    pub denylisted: usize,
    pub failed: usize,
    pub unrecoverable: usize,
    pub skipped: usize,
    pub record_errors: usize,
    pub by_direct: usize,
    pub by_element: usize,
    pub by_page: usize,
}
