pub mod acquire;
pub mod backoff;
pub mod classify;
pub mod client;
pub mod error;
pub mod fallback;
pub mod fetch;
pub mod log;
pub mod placeholder;
pub mod registry;
pub mod render;

pub use acquire::{AssetAcquirer, AssetOutcome, AssetResolution, SkipReason, artifact_name};
pub use backoff::{BackoffPolicy, BackoffSchedule};
pub use classify::{AttemptOutcome, TransientKind, Verdict, classify_response};
pub use client::{ImageClient, RequestGate, USER_AGENTS};
pub use error::ScrapeError;
pub use fallback::{ChainOutcome, ChainReport, FallbackChain, Strategy};
pub use fetch::{Attempt, AssetFetcher, FetchOutcome, FetchReport, sleep_or_cancel};
pub use log::{AcquireLog, LogEntry, LogSummary};
pub use placeholder::{PLACEHOLDER_FILE, PlaceholderPolicy};
pub use registry::{PROBLEM_SOURCES_FILE, ProblemSources};
pub use render::{NoopRenderer, PageImage, PageRenderer, RenderedPage};

#[cfg(feature = "browser")]
pub use render::chromium::ChromiumRenderer;
