//! Acquisition runs over a card-stash data directory.
//!
//! [`run_acquisition`] ties the catalog and the scraper together: it walks
//! the records in batches, resolves their images and saves every changed
//! document, reporting progress as [`AcquireEvent`]s.

pub mod async_util;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod settings;
pub mod summary;

pub use async_util::run_with_events;
pub use error::{RunError, SettingsError};
pub use events::{AcquireEvent, RunState};
pub use scheduler::{launch_renderer, run_acquisition};
pub use summary::{RecordSummary, RunSummary};
