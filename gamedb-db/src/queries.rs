//! Read queries over listings and canonical records.

use std::collections::BTreeSet;

use gamedb_catalog::{CanonicalRecord, Listing, Provider};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use crate::operations::OperationError;

const LISTING_COLUMNS: &str =
    "id, url, update_flag, raw_name, name, locator, size, author, created_at, updated_at";

const RECORD_COLUMNS: &str = "id, name, description, cover, aliases, developers, publishers,
     languages, screenshots, igdb_id, steam_id, gog_id, created_at, updated_at";

/// Listings sharing one content locator, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorGroup {
    pub locator: String,
    pub listing_ids: Vec<i64>,
}

/// One page of record search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<CanonicalRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

// ── Listing Lookups ─────────────────────────────────────────────────────────

pub fn get_listing(conn: &Connection, id: i64) -> Result<Option<Listing>, OperationError> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?1");
    conn.query_row(&sql, params![id], row_to_listing)
        .optional()
        .map_err(Into::into)
}

pub fn find_listing_by_url(conn: &Connection, url: &str) -> Result<Option<Listing>, OperationError> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE url = ?1");
    conn.query_row(&sql, params![url], row_to_listing)
        .optional()
        .map_err(Into::into)
}

/// Whether a listing with this source URL was already ingested.
pub fn is_listing_crawled_by_url(conn: &Connection, url: &str) -> Result<bool, OperationError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM listings WHERE url = ?1)",
        params![url],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Whether `author` already produced a listing with this update fingerprint.
pub fn is_listing_crawled(
    conn: &Connection,
    update_flag: &str,
    author: &str,
) -> Result<bool, OperationError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM listings WHERE update_flag = ?1 AND author = ?2)",
        params![update_flag, author],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Listings not linked to any canonical record, oldest first.
pub fn listings_without_record(
    conn: &Connection,
    limit: Option<usize>,
) -> Result<Vec<Listing>, OperationError> {
    let limit = limit.map_or(-1, |n| n as i64);
    let mut stmt = conn.prepare(&format!(
        "SELECT l.id, l.url, l.update_flag, l.raw_name, l.name, l.locator, l.size,
                l.author, l.created_at, l.updated_at
         FROM listings l
         LEFT JOIN record_listings rl ON rl.listing_id = l.id
         WHERE rl.listing_id IS NULL
         ORDER BY l.id LIMIT {limit}"
    ))?;
    let rows = stmt.query_map([], row_to_listing)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Non-empty locators held by more than one listing.
///
/// Within a group the listings are ordered by creation time, then id, so
/// the first id is the one to keep.
pub fn duplicate_locator_groups(conn: &Connection) -> Result<Vec<LocatorGroup>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT locator, id FROM listings
         WHERE locator IN (
             SELECT locator FROM listings
             WHERE locator != ''
             GROUP BY locator HAVING COUNT(*) > 1
         )
         ORDER BY locator, created_at, id",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut groups: Vec<LocatorGroup> = Vec::new();
    for row in rows {
        let (locator, id) = row?;
        match groups.last_mut() {
            Some(group) if group.locator == locator => group.listing_ids.push(id),
            _ => groups.push(LocatorGroup {
                locator,
                listing_ids: vec![id],
            }),
        }
    }
    Ok(groups)
}

// ── Record Lookups ──────────────────────────────────────────────────────────

pub fn get_record(conn: &Connection, id: i64) -> Result<Option<CanonicalRecord>, OperationError> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM canonical_records WHERE id = ?1");
    let record = conn.query_row(&sql, params![id], row_to_record).optional()?;
    record.map(|r| with_listings(conn, r)).transpose()
}

/// The record holding `provider`'s `external_id`, if any.
pub fn find_record_by_external_id(
    conn: &Connection,
    provider: Provider,
    external_id: u64,
) -> Result<Option<CanonicalRecord>, OperationError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM canonical_records WHERE {} = ?1",
        provider.id_column()
    );
    let record = conn
        .query_row(&sql, params![external_id], row_to_record)
        .optional()?;
    record.map(|r| with_listings(conn, r)).transpose()
}

/// The id of the record a listing is linked to.
pub fn record_id_for_listing(conn: &Connection, listing_id: i64) -> Result<Option<i64>, OperationError> {
    conn.query_row(
        "SELECT record_id FROM record_listings WHERE listing_id = ?1",
        params![listing_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(Into::into)
}

/// Records linked to any of `listing_ids`, ordered by record id.
pub fn records_referencing(
    conn: &Connection,
    listing_ids: &[i64],
) -> Result<Vec<CanonicalRecord>, OperationError> {
    let mut record_ids = BTreeSet::new();
    for &listing_id in listing_ids {
        if let Some(id) = record_id_for_listing(conn, listing_id)? {
            record_ids.insert(id);
        }
    }

    let mut records = Vec::with_capacity(record_ids.len());
    for id in record_ids {
        if let Some(record) = get_record(conn, id)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Search records by name or alias (case-insensitive substring).
///
/// `page` is 1-based; 0 is treated as 1. Results are sorted by name.
pub fn search_records(
    conn: &Connection,
    query: &str,
    page: usize,
    page_size: usize,
) -> Result<RecordPage, OperationError> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let pattern = format!("%{}%", escape_like(query.trim()));

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM canonical_records
         WHERE name LIKE ?1 ESCAPE '\\' OR aliases LIKE ?1 ESCAPE '\\'",
        params![pattern],
        |row| row.get(0),
    )?;
    let total = total as usize;

    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM canonical_records
         WHERE name LIKE ?1 ESCAPE '\\' OR aliases LIKE ?1 ESCAPE '\\'
         ORDER BY name COLLATE NOCASE, id
         LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(
        params![pattern, page_size as i64, ((page - 1) * page_size) as i64],
        row_to_record,
    )?;
    let records = rows
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|r| with_listings(conn, r))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RecordPage {
        records,
        page,
        page_size,
        total,
        total_pages: total.div_ceil(page_size),
    })
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ── Row Mapping Helpers ─────────────────────────────────────────────────────

fn with_listings(
    conn: &Connection,
    mut record: CanonicalRecord,
) -> Result<CanonicalRecord, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT listing_id FROM record_listings WHERE record_id = ?1 ORDER BY position",
    )?;
    let ids = stmt.query_map(params![record.id], |row| row.get(0))?;
    record.listing_ids = ids.collect::<Result<Vec<_>, _>>()?;
    Ok(record)
}

fn row_to_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        url: row.get(1)?,
        update_flag: row.get(2)?,
        raw_name: row.get(3)?,
        name: row.get(4)?,
        locator: row.get(5)?,
        size: row.get(6)?,
        author: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn json_list(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CanonicalRecord> {
    Ok(CanonicalRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        cover: row.get(3)?,
        aliases: json_list(row, 4)?,
        developers: json_list(row, 5)?,
        publishers: json_list(row, 6)?,
        languages: json_list(row, 7)?,
        screenshots: json_list(row, 8)?,
        igdb_id: row.get(9)?,
        steam_id: row.get(10)?,
        gog_id: row.get(11)?,
        listing_ids: Vec::new(),
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
