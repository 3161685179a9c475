//! Shared data model for card-stash.
//!
//! A [`Record`] is one JSON document holding the cards of a single item
//! (e.g. every card for one Pokémon). Each card exposes at most one
//! [`Asset`]: the small image it references, which acquisition resolves from
//! a remote URI into a local path or a placeholder.

pub mod asset;
pub mod config;
pub mod error;
pub mod record;
pub mod util;

pub use asset::{Asset, AssetState, MIN_ASSET_BYTES, sanitize_id, sanitize_name};
pub use config::AcquireConfig;
pub use error::{ConfigError, DocumentError};
pub use record::{Card, CardImages, CardMarket, Record, RecordName};
