//! Write operations for listings and canonical records.

use gamedb_catalog::{CanonicalRecord, Listing, normalize_size};
use rusqlite::{Connection, ErrorCode, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
    #[error("Constraint violated: {0}")]
    Conflict(String),
    #[error("Malformed stored value: {0}")]
    Json(#[from] serde_json::Error),
}

/// Map UNIQUE/foreign-key failures to [`OperationError::Conflict`].
fn classify(e: rusqlite::Error) -> OperationError {
    if let rusqlite::Error::SqliteFailure(err, msg) = &e {
        if err.code == ErrorCode::ConstraintViolation {
            return OperationError::Conflict(msg.clone().unwrap_or_else(|| err.to_string()));
        }
    }
    OperationError::Sqlite(e)
}

// ── Listing Operations ──────────────────────────────────────────────────────

/// Insert a listing, or refresh the stored one with the same URL.
///
/// A re-crawl refreshes the titles, size and fingerprint. The locator is only
/// replaced by a non-empty value. Returns the listing's row id.
pub fn save_listing(conn: &Connection, listing: &Listing) -> Result<i64, OperationError> {
    conn.execute(
        "INSERT INTO listings (url, update_flag, raw_name, name, locator, size, author)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(url) DO UPDATE SET
             update_flag = COALESCE(excluded.update_flag, listings.update_flag),
             raw_name = excluded.raw_name,
             name = excluded.name,
             locator = CASE WHEN excluded.locator = '' THEN listings.locator
                            ELSE excluded.locator END,
             size = excluded.size,
             author = excluded.author,
             updated_at = datetime('now')",
        params![
            listing.url,
            listing.update_flag,
            listing.raw_name,
            listing.name,
            listing.locator,
            normalize_size(&listing.size),
            listing.author,
        ],
    )?;

    let id = conn.query_row(
        "SELECT id FROM listings WHERE url = ?1",
        params![listing.url],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Delete listings by id. Their record links go with them.
pub fn delete_listings(conn: &Connection, ids: &[i64]) -> Result<usize, OperationError> {
    let mut stmt = conn.prepare("DELETE FROM listings WHERE id = ?1")?;
    let mut deleted = 0;
    for id in ids {
        deleted += stmt.execute(params![id])?;
    }
    Ok(deleted)
}

// ── Record Operations ───────────────────────────────────────────────────────

/// Insert or update a canonical record and rewrite its listing links.
///
/// A record with `id == 0` is inserted and its new id written back. Listing
/// links follow `record.listing_ids` in order; a listing linked to another
/// record moves to this one.
pub fn save_record(conn: &Connection, record: &mut CanonicalRecord) -> Result<i64, OperationError> {
    let tx = conn.unchecked_transaction()?;

    let aliases = serde_json::to_string(&record.aliases)?;
    let developers = serde_json::to_string(&record.developers)?;
    let publishers = serde_json::to_string(&record.publishers)?;
    let languages = serde_json::to_string(&record.languages)?;
    let screenshots = serde_json::to_string(&record.screenshots)?;

    let id = if record.id == 0 {
        tx.execute(
            "INSERT INTO canonical_records (name, description, cover, aliases, developers,
                 publishers, languages, screenshots, igdb_id, steam_id, gog_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.name,
                record.description,
                record.cover,
                aliases,
                developers,
                publishers,
                languages,
                screenshots,
                record.igdb_id,
                record.steam_id,
                record.gog_id,
            ],
        )
        .map_err(classify)?;
        tx.last_insert_rowid()
    } else {
        let changed = tx
            .execute(
                "UPDATE canonical_records SET
                     name = ?2, description = ?3, cover = ?4, aliases = ?5, developers = ?6,
                     publishers = ?7, languages = ?8, screenshots = ?9,
                     igdb_id = ?10, steam_id = ?11, gog_id = ?12,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                params![
                    record.id,
                    record.name,
                    record.description,
                    record.cover,
                    aliases,
                    developers,
                    publishers,
                    languages,
                    screenshots,
                    record.igdb_id,
                    record.steam_id,
                    record.gog_id,
                ],
            )
            .map_err(classify)?;
        if changed == 0 {
            return Err(OperationError::NotFound {
                entity_type: "record".to_string(),
                id: record.id.to_string(),
            });
        }
        record.id
    };

    tx.execute(
        "DELETE FROM record_listings WHERE record_id = ?1",
        params![id],
    )?;
    {
        let mut link = tx.prepare(
            "INSERT INTO record_listings (listing_id, record_id, position)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(listing_id) DO UPDATE SET
                 record_id = excluded.record_id,
                 position = excluded.position",
        )?;
        for (position, listing_id) in record.listing_ids.iter().enumerate() {
            link.execute(params![listing_id, id, position as i64])
                .map_err(classify)?;
        }
    }

    tx.commit()?;
    record.id = id;
    Ok(id)
}
