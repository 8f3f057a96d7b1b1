//! Collapse listings that point at the same content.
//!
//! Listings are grouped by content locator. In every group with more than
//! one member the earliest-created listing (lowest id on ties) survives; the
//! rest are deleted after every record referencing them has been repaired.
//! Running the pass again changes nothing.

use gamedb_db::{OperationError, operations, queries};
use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Database error: {0}")]
    Db(#[from] OperationError),
}

/// Statistics from a deduplication run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DedupStats {
    /// Locators held by more than one listing.
    pub groups: usize,
    pub listings_removed: usize,
    /// Records that lost at least one reference.
    pub records_repaired: usize,
}

pub fn deduplicate(conn: &Connection) -> Result<DedupStats, DedupError> {
    let mut stats = DedupStats::default();

    for group in queries::duplicate_locator_groups(conn)? {
        let Some((keep, removed)) = group.listing_ids.split_first() else {
            continue;
        };
        if removed.is_empty() {
            continue;
        }
        stats.groups += 1;
        log::debug!(
            "Locator {} held by {} listings, keeping {}",
            group.locator,
            group.listing_ids.len(),
            keep
        );

        for mut record in queries::records_referencing(conn, removed)? {
            if record.detach_listings(removed) > 0 {
                operations::save_record(conn, &mut record)?;
                stats.records_repaired += 1;
            }
        }
        stats.listings_removed += operations::delete_listings(conn, removed)?;
    }

    log::info!(
        "Deduplicated {} locators: removed {} listings, repaired {} records",
        stats.groups,
        stats.listings_removed,
        stats.records_repaired
    );
    Ok(stats)
}
