//! Ingestion and maintenance passes over the game catalog database.
//!
//! This crate owns the logic that ties providers to storage: organizing
//! unlinked listings into canonical records, manual linking and refresh,
//! collapsing duplicate listings, and cached record search.

pub mod dedup;
pub mod organize;
pub mod progress;
pub mod search;

pub use dedup::{DedupError, DedupStats, deduplicate};
pub use organize::{
    IngestError, LinkOutcome, OrganizeStats, link_listing, organize_listing, organize_unlinked,
    refresh_record,
};
pub use progress::{IngestProgress, LogProgress, SilentProgress};
pub use search::{SEARCH_TTL, search_records_cached};
