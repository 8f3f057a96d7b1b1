//! Ingestion: resolve listings to canonical records.
//!
//! Providers are tried in chain order. For each one the listing's title is
//! resolved to an id; if that id already belongs to a record the listing is
//! attached to it, otherwise a new record is built from the provider's
//! detail. Any provider failure along the way moves on to the next one.

use gamedb_catalog::{CanonicalRecord, Listing, Provider};
use gamedb_db::{OperationError, queries};
use gamedb_db::operations::save_record;
use gamedb_resolver::{Resolution, ResolveError, ResolverChain};
use rusqlite::Connection;
use thiserror::Error;

use crate::progress::IngestProgress;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Db(#[from] OperationError),
    #[error("Resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Listing {0} not found")]
    ListingNotFound(i64),
    #[error("Record {0} not found")]
    RecordNotFound(i64),
}

/// Where a listing ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new record was created for the listing.
    Created(i64),
    /// The listing joined an existing record.
    Attached(i64),
}

impl LinkOutcome {
    pub fn record_id(&self) -> i64 {
        match self {
            Self::Created(id) | Self::Attached(id) => *id,
        }
    }
}

/// Statistics from an organize pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OrganizeStats {
    pub processed: usize,
    pub created: usize,
    pub attached: usize,
    /// No provider recognized the title.
    pub unresolved: usize,
    /// A provider failed for a reason other than a miss.
    pub failed: usize,
}

/// Resolve one listing and link it to its canonical record.
///
/// Returns `NotFound` if every provider missed, otherwise the last provider
/// failure. Database errors stop the walk immediately.
pub async fn organize_listing(
    conn: &Connection,
    chain: &ResolverChain,
    listing: &Listing,
) -> Result<LinkOutcome, IngestError> {
    let title = if listing.raw_name.trim().is_empty() {
        &listing.name
    } else {
        &listing.raw_name
    };

    let mut last_error = None;
    for provider in chain.providers() {
        let external_id = match chain.resolve_with(provider, title).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => {
                log::debug!("{} has no match for '{}'", provider, title);
                continue;
            }
            Err(e) => {
                log::warn!("{} failed to resolve '{}': {}", provider, title, e);
                last_error = Some(e);
                continue;
            }
        };
        log::debug!("Resolved '{}' via {} (id {})", title, provider, external_id);

        let resolution = Resolution {
            provider,
            external_id,
        };
        match attach_resolved(conn, chain, listing.id, resolution).await {
            Err(IngestError::Resolve(e)) => {
                log::warn!(
                    "{} detail for '{}' (id {}) failed, trying next provider: {}",
                    provider,
                    title,
                    external_id,
                    e
                );
                if last_error.is_none() || !e.is_not_found() {
                    last_error = Some(e);
                }
            }
            other => return other,
        }
    }
    Err(last_error
        .unwrap_or_else(|| ResolveError::not_found(title.as_str()))
        .into())
}

/// Resolve every listing that has no record yet.
///
/// Per-listing resolution failures are logged and counted; database
/// failures abort the pass.
pub async fn organize_unlinked(
    conn: &Connection,
    chain: &ResolverChain,
    limit: Option<usize>,
    progress: &dyn IngestProgress,
) -> Result<OrganizeStats, IngestError> {
    let listings = queries::listings_without_record(conn, limit)?;
    let total = listings.len();
    let mut stats = OrganizeStats::default();

    progress.on_phase(&format!("Organizing {} unlinked listings", total));

    for (i, listing) in listings.iter().enumerate() {
        stats.processed += 1;
        match organize_listing(conn, chain, listing).await {
            Ok(LinkOutcome::Created(id)) => {
                log::debug!("Listing {} → new record {}", listing.id, id);
                stats.created += 1;
            }
            Ok(LinkOutcome::Attached(id)) => {
                log::debug!("Listing {} → existing record {}", listing.id, id);
                stats.attached += 1;
            }
            Err(IngestError::Resolve(e)) if e.is_not_found() => {
                log::info!("No provider recognized '{}'", listing.raw_name);
                stats.unresolved += 1;
            }
            Err(IngestError::Resolve(e)) => {
                log::warn!("Failed to organize listing {} ('{}'): {}", listing.id, listing.raw_name, e);
                stats.failed += 1;
            }
            Err(e) => return Err(e),
        }
        progress.on_listing(i + 1, total, &listing.name);
    }

    progress.on_complete(&format!(
        "Organized {} listings: {} new records, {} attached, {} unresolved, {} failed",
        stats.processed, stats.created, stats.attached, stats.unresolved, stats.failed
    ));
    Ok(stats)
}

/// Manually link a listing to `provider`'s `external_id`, bypassing title
/// resolution.
pub async fn link_listing(
    conn: &Connection,
    chain: &ResolverChain,
    listing_id: i64,
    provider: Provider,
    external_id: u64,
) -> Result<LinkOutcome, IngestError> {
    if queries::get_listing(conn, listing_id)?.is_none() {
        return Err(IngestError::ListingNotFound(listing_id));
    }
    let resolution = Resolution {
        provider,
        external_id,
    };
    attach_resolved(conn, chain, listing_id, resolution).await
}

/// Rebuild a record's metadata from `provider`'s `external_id`.
///
/// Listings and other providers' ids are kept.
pub async fn refresh_record(
    conn: &Connection,
    chain: &ResolverChain,
    record_id: i64,
    provider: Provider,
    external_id: u64,
) -> Result<CanonicalRecord, IngestError> {
    let mut record =
        queries::get_record(conn, record_id)?.ok_or(IngestError::RecordNotFound(record_id))?;
    let fragment = chain.fetch_detail(provider, external_id).await?;
    record.apply_fragment(fragment);
    record.set_external_id(provider, external_id);
    save_record(conn, &mut record)?;
    log::info!("Refreshed record {} from {} {}", record_id, provider, external_id);
    Ok(record)
}

async fn attach_resolved(
    conn: &Connection,
    chain: &ResolverChain,
    listing_id: i64,
    resolution: Resolution,
) -> Result<LinkOutcome, IngestError> {
    let Resolution {
        provider,
        external_id,
    } = resolution;

    if let Some(mut record) = queries::find_record_by_external_id(conn, provider, external_id)? {
        if record.attach_listing(listing_id) {
            save_record(conn, &mut record)?;
        }
        return Ok(LinkOutcome::Attached(record.id));
    }

    let fragment = chain.fetch_detail(provider, external_id).await?;
    let mut record = CanonicalRecord::from_fragment(fragment);
    record.set_external_id(provider, external_id);
    record.attach_listing(listing_id);
    let id = save_record(conn, &mut record)?;
    log::info!("Created record {} '{}' from {} {}", id, record.name, provider, external_id);
    Ok(LinkOutcome::Created(id))
}
