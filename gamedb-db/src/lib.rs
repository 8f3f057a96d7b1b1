//! SQLite persistence for listings and canonical records.
//!
//! Schema creation, upserts and the lookups the ingestion and dedup passes
//! depend on, backed by SQLite (via rusqlite with the bundled feature).

pub mod operations;
pub mod queries;
pub mod schema;

pub use operations::{OperationError, delete_listings, save_listing, save_record};
pub use queries::{
    LocatorGroup, RecordPage, duplicate_locator_groups, find_listing_by_url,
    find_record_by_external_id, get_listing, get_record, is_listing_crawled,
    is_listing_crawled_by_url, listings_without_record, record_id_for_listing,
    records_referencing, search_records,
};
pub use schema::{SchemaError, open_database, open_memory};
