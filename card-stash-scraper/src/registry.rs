//! Problem-source registry: remote URIs that exhausted their retry budget.
//!
//! Persisted as a newline-delimited text file, read once at startup and
//! appended to as new failures happen, so an interrupted run never loses an
//! entry it already recorded.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::error::ScrapeError;

/// Default registry file name inside the image directory.
pub const PROBLEM_SOURCES_FILE: &str = "problem_urls.txt";

#[derive(Debug)]
pub struct ProblemSources {
    path: PathBuf,
    enabled: bool,
    entries: HashSet<String>,
}

impl ProblemSources {
    /// Load the registry at `path`. A missing file is an empty registry.
    /// When `enabled` is false the file is neither read nor written.
    pub fn load(path: impl Into<PathBuf>, enabled: bool) -> Result<Self, ScrapeError> {
        let path = path.into();
        let mut entries = HashSet::new();

        if enabled {
            match fs::read_to_string(&path) {
                Ok(text) => {
                    entries.extend(
                        text.lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                    );
                    log::info!("Loaded {} known problem sources to skip", entries.len());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(ScrapeError::Registry { path, source }),
            }
        }

        Ok(Self {
            path,
            enabled,
            entries,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `uri` must not be requested.
    pub fn should_skip(&self, uri: &str) -> bool {
        self.enabled && self.entries.contains(uri.trim())
    }

    /// Add `uri` and append it to the file before returning.
    ///
    /// Returns `Ok(false)` when disabled or already present.
    pub async fn record(&mut self, uri: &str) -> Result<bool, ScrapeError> {
        let uri = uri.trim();
        if !self.enabled || uri.is_empty() || self.entries.contains(uri) {
            return Ok(false);
        }

        let appended = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(format!("{}\n", uri).as_bytes()).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;
        if let Err(source) = appended {
            return Err(ScrapeError::Registry {
                path: self.path.clone(),
                source,
            });
        }

        self.entries.insert(uri.to_string());
        log::info!("Added {} to problem sources", uri);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_trimmed_entries_and_ignores_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROBLEM_SOURCES_FILE);
        fs::write(&path, "https://a.example/1.png\n\n  https://a.example/2.png  \n").unwrap();

        let registry = ProblemSources::load(&path, true).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.should_skip("https://a.example/2.png"));
        assert!(!registry.should_skip("https://a.example/3.png"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProblemSources::load(dir.path().join("nope.txt"), true).unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn record_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROBLEM_SOURCES_FILE);
        fs::write(&path, "https://a.example/1.png\n").unwrap();

        let mut registry = ProblemSources::load(&path, true).unwrap();
        assert!(registry.record("https://a.example/2.png").await.unwrap());
        assert!(!registry.record("https://a.example/2.png").await.unwrap());
        assert!(!registry.record("https://a.example/1.png").await.unwrap());

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "https://a.example/1.png\nhttps://a.example/2.png\n"
        );
        let reloaded = ProblemSources::load(&path, true).unwrap();
        assert!(reloaded.should_skip("https://a.example/2.png"));
    }

    #[tokio::test]
    async fn disabled_registry_never_skips_or_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROBLEM_SOURCES_FILE);
        fs::write(&path, "https://a.example/1.png\n").unwrap();

        let mut registry = ProblemSources::load(&path, false).unwrap();
        assert!(!registry.should_skip("https://a.example/1.png"));
        assert!(!registry.record("https://a.example/2.png").await.unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "https://a.example/1.png\n");
    }
}
