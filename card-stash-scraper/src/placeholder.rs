//! Placeholder image substituted for assets that cannot be acquired.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use card_stash_core::{MIN_ASSET_BYTES, Record};
use image::{ImageFormat, Rgb, RgbImage};

use crate::error::ScrapeError;

/// File name of the shared placeholder inside the small image directory.
pub const PLACEHOLDER_FILE: &str = "_placeholder.jpg";

#[derive(Debug)]
pub struct PlaceholderPolicy {
    enabled: bool,
    path: PathBuf,
    link: String,
    substitutions: AtomicUsize,
}

impl PlaceholderPolicy {
    /// Make sure the placeholder file exists in `small_dir`.
    ///
    /// A `custom` image is copied into place; otherwise a 1x1 JPEG is
    /// generated when no healthy placeholder exists yet. If the file cannot
    /// be created the policy is returned disabled.
    pub fn prepare(
        small_dir: &Path,
        link: impl Into<String>,
        custom: Option<&Path>,
        enabled: bool,
    ) -> Self {
        let path = small_dir.join(PLACEHOLDER_FILE);
        let mut policy = Self {
            enabled,
            path,
            link: link.into(),
            substitutions: AtomicUsize::new(0),
        };
        if !enabled {
            return policy;
        }

        if let Err(e) = policy.materialize(custom) {
            log::error!(
                "Could not create placeholder {}: {}; placeholders disabled",
                policy.path.display(),
                e
            );
            policy.enabled = false;
        }
        policy
    }

    /// A policy that never substitutes.
    pub fn disabled(small_dir: &Path, link: impl Into<String>) -> Self {
        Self::prepare(small_dir, link, None, false)
    }

    fn materialize(&self, custom: Option<&Path>) -> Result<(), ScrapeError> {
        if let Some(custom) = custom {
            if custom.is_file() {
                if custom != self.path.as_path() {
                    fs::copy(custom, &self.path)?;
                    log::info!("Using custom placeholder {}", custom.display());
                }
                return Ok(());
            }
            log::warn!(
                "Custom placeholder {} not found; generating one",
                custom.display()
            );
        }

        let healthy = fs::metadata(&self.path)
            .map(|m| m.len() > MIN_ASSET_BYTES)
            .unwrap_or(false);
        if !healthy {
            let pixel = RgbImage::from_pixel(1, 1, Rgb([204, 204, 204]));
            pixel.save_with_format(&self.path, ImageFormat::Jpeg)?;
            log::info!("Created placeholder {}", self.path.display());
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Document reference written for substituted assets.
    pub fn link(&self) -> &str {
        &self.link
    }

    /// Point card `index` of `record` at the placeholder, keeping the remote
    /// source as the card's origin.
    ///
    /// Returns whether the placeholder was applied.
    pub fn apply(&self, record: &mut Record, index: usize) -> bool {
        if !self.enabled {
            return false;
        }
        let origin = record.asset(index, &self.link).and_then(|a| a.source);
        record.set_image(index, &self.link, origin.as_deref());
        self.substitutions.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Number of substitutions made so far.
    pub fn substitutions(&self) -> usize {
        self.substitutions.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use card_stash_core::RecordName;

    const LINK: &str = "images/small/_placeholder.jpg";

    #[test]
    fn generates_a_valid_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let policy = PlaceholderPolicy::prepare(dir.path(), LINK, None, true);
        assert!(policy.is_enabled());

        let bytes = fs::read(policy.path()).unwrap();
        assert!(bytes.len() as u64 > MIN_ASSET_BYTES);
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1, 1));
    }

    #[test]
    fn copies_custom_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let custom = dir.path().join("mine.jpg");
        fs::write(&custom, vec![7u8; 500]).unwrap();
        let small = dir.path().join("small");
        fs::create_dir(&small).unwrap();

        let policy = PlaceholderPolicy::prepare(&small, LINK, Some(&custom), true);
        assert!(policy.is_enabled());
        assert_eq!(fs::read(policy.path()).unwrap(), vec![7u8; 500]);
    }

    #[test]
    fn unwritable_directory_disables_policy() {
        let dir = tempfile::tempdir().unwrap();
        let policy = PlaceholderPolicy::prepare(&dir.path().join("missing"), LINK, None, true);
        assert!(!policy.is_enabled());
    }

    #[test]
    fn apply_sets_small_and_large() {
        let dir = tempfile::tempdir().unwrap();
        let policy = PlaceholderPolicy::prepare(dir.path(), LINK, None, true);
        let mut record = Record::from_json(
            RecordName::new("pikachu"),
            dir.path().join("pikachu.json"),
            r#"{"data": [{"id": "a", "images": {"small": "https://x.example/a.png", "large": "https://x.example/a_hi.png"}}]}"#,
        )
        .unwrap();

        assert!(policy.apply(&mut record, 0));
        let images = record.cards()[0].images.as_ref().unwrap();
        assert_eq!(images.small.as_deref(), Some(LINK));
        assert_eq!(images.large.as_deref(), Some(LINK));
        assert_eq!(images.origin.as_deref(), Some("https://x.example/a.png"));
        assert_eq!(policy.substitutions(), 1);
        assert!(record.is_dirty());
    }

    #[test]
    fn disabled_policy_leaves_record_alone() {
        let dir = tempfile::tempdir().unwrap();
        let policy = PlaceholderPolicy::disabled(dir.path(), LINK);
        let mut record = Record::from_json(
            RecordName::new("pikachu"),
            dir.path().join("pikachu.json"),
            r#"[{"id": "a", "images": {"small": "https://x.example/a.png"}}]"#,
        )
        .unwrap();
        assert!(!policy.apply(&mut record, 0));
        assert!(!record.is_dirty());
        assert!(!policy.path().exists());
    }
}
