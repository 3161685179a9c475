//! On-disk record catalog: loading and saving record documents, scanning
//! for cards without images, and building the combined publication file.
//!
//! [`CatalogStore`] is the only component that writes record documents.
//! Saves are skipped for unchanged records, back up the original document
//! once, and replace the file via a temp-file rename.

pub mod error;
pub mod missing;
pub mod publish;
pub mod store;

pub use error::StoreError;
pub use missing::{MissingCard, MissingImages, scan_missing};
pub use publish::{PublishReport, publish};
pub use store::{CatalogStore, SaveOutcome, backup_path};
