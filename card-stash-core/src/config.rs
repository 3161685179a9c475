//! Run configuration for an acquisition pass.
//!
//! Everything the pipeline needs is passed in explicitly through
//! [`AcquireConfig`]; nothing reads process-wide settings. Durations are
//! stored as fractional seconds so the struct maps directly onto the
//! `[acquire]` table of the settings file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum number of concurrent fetch workers inside a batch.
pub const MAX_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    /// Directory holding the record documents (`*.json`)
    pub data_dir: PathBuf,
    /// Base directory for images; artifacts go to `<image_dir>/small`
    pub image_dir: PathBuf,
    /// Prefix written into documents for local references
    pub link_prefix: String,
    /// Records per batch
    pub batch_size: usize,
    /// Inter-batch pause window
    pub pause_min_secs: f64,
    pub pause_max_secs: f64,
    /// Per-attempt delay window, scaled by `backoff_multiplier ^ attempt`
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub backoff_multiplier: f64,
    /// Extra wait after a rate-limit response, scaled by `2 ^ attempt`
    pub penalty_min_secs: f64,
    pub penalty_max_secs: f64,
    /// Global minimum spacing between any two requests
    pub min_request_interval_secs: f64,
    pub request_timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Concurrent record workers inside a batch (1..=4)
    pub workers: usize,
    pub use_placeholder: bool,
    /// Custom placeholder image to copy instead of generating one
    pub placeholder_path: Option<PathBuf>,
    pub skip_problem_sources: bool,
    /// Rewrite record documents with local references
    pub update_in_place: bool,
    pub referer: String,
    /// Enable the browser-based extraction strategies
    pub render: bool,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            image_dir: PathBuf::from("./images"),
            link_prefix: "images/small".to_string(),
            batch_size: 10,
            pause_min_secs: 24.0,
            pause_max_secs: 36.0,
            min_delay_secs: 2.0,
            max_delay_secs: 5.0,
            backoff_multiplier: 1.5,
            penalty_min_secs: 10.0,
            penalty_max_secs: 20.0,
            min_request_interval_secs: 1.0,
            request_timeout_secs: 15,
            max_retries: 3,
            workers: 1,
            use_placeholder: true,
            placeholder_path: None,
            skip_problem_sources: true,
            update_in_place: true,
            referer: "https://www.cardmarket.com/".to_string(),
            render: false,
        }
    }
}

impl AcquireConfig {
    /// Check windows and counts; called once before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        check_window("pause", self.pause_min_secs, self.pause_max_secs)?;
        check_window("delay", self.min_delay_secs, self.max_delay_secs)?;
        check_window("rate-limit penalty", self.penalty_min_secs, self.penalty_max_secs)?;
        check_window(
            "request interval",
            self.min_request_interval_secs,
            self.min_request_interval_secs,
        )?;
        if !(self.backoff_multiplier >= 1.0) || !self.backoff_multiplier.is_finite() {
            return Err(ConfigError::InvalidMultiplier(self.backoff_multiplier));
        }
        Ok(())
    }

    /// Directory the small artifacts are written to.
    pub fn small_dir(&self) -> PathBuf {
        self.image_dir.join("small")
    }

    /// Document reference for an artifact file name.
    pub fn link_for(&self, file_name: &str) -> String {
        let prefix = self.link_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", prefix, file_name)
        }
    }

    /// Worker count clamped to `1..=MAX_WORKERS`.
    pub fn effective_workers(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn min_request_interval(&self) -> Duration {
        secs(self.min_request_interval_secs)
    }
}

/// Convert fractional seconds to a `Duration`.
///
/// Negatives and NaN become zero; values past `Duration::MAX` saturate.
pub fn secs(value: f64) -> Duration {
    if !(value > 0.0) {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

fn check_window(name: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min >= 0.0) || !(max >= min) || !max.is_finite() {
        return Err(ConfigError::InvalidWindow { name, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AcquireConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_batch_size() {
        let config = AcquireConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBatchSize)));
    }

    #[test]
    fn rejects_inverted_delay_window() {
        let config = AcquireConfig {
            min_delay_secs: 5.0,
            max_delay_secs: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindow { name: "delay", .. })
        ));
    }

    #[test]
    fn rejects_shrinking_multiplier() {
        let config = AcquireConfig {
            backoff_multiplier: 0.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMultiplier(_))));
    }

    #[test]
    fn rejects_infinite_bounds() {
        let config: AcquireConfig = toml::from_str("max_delay_secs = inf\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindow { name: "delay", .. })
        ));

        let config: AcquireConfig = toml::from_str("pause_max_secs = inf\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindow { name: "pause", .. })
        ));

        let config: AcquireConfig = toml::from_str("backoff_multiplier = inf\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMultiplier(_))));

        let config: AcquireConfig = toml::from_str("penalty_min_secs = nan\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn secs_saturates() {
        assert_eq!(secs(1.5), Duration::from_millis(1500));
        assert_eq!(secs(-3.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(f64::INFINITY), Duration::MAX);
        assert_eq!(secs(1e300), Duration::MAX);
    }

    #[test]
    fn link_for_joins_prefix() {
        let mut config = AcquireConfig::default();
        assert_eq!(config.link_for("a_small.png"), "images/small/a_small.png");
        config.link_prefix = "cdn/img/".to_string();
        assert_eq!(config.link_for("a.png"), "cdn/img/a.png");
        config.link_prefix.clear();
        assert_eq!(config.link_for("a.png"), "a.png");
    }

    #[test]
    fn workers_are_clamped() {
        let mut config = AcquireConfig::default();
        config.workers = 0;
        assert_eq!(config.effective_workers(), 1);
        config.workers = 16;
        assert_eq!(config.effective_workers(), MAX_WORKERS);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AcquireConfig = toml::from_str("batch_size = 3\nmax_retries = 5\n").unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.min_delay_secs, 2.0);
        assert!(config.use_placeholder);
    }
}
