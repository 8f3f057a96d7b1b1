//! Record search with a short-lived cached aggregate.

use std::time::Duration;

use gamedb_cache::CacheAside;
use gamedb_db::{OperationError, RecordPage, queries};
use rusqlite::Connection;

/// Search results go stale quickly as listings are organized.
pub const SEARCH_TTL: Duration = Duration::from_secs(10 * 60);

fn cache_key(query: &str, page: usize, page_size: usize) -> String {
    format!(
        "search_records:{}:{}:{}",
        query.trim().to_lowercase(),
        page.max(1),
        page_size.max(1)
    )
}

/// [`queries::search_records`] behind the cache.
pub async fn search_records_cached(
    conn: &Connection,
    cache: &CacheAside,
    query: &str,
    page: usize,
    page_size: usize,
) -> Result<RecordPage, OperationError> {
    let key = cache_key(query, page, page_size);
    if let Some(hit) = cache.get_json::<RecordPage>(&key).await {
        log::debug!("Search cache hit for {}", key);
        return Ok(hit);
    }

    let results = queries::search_records(conn, query, page, page_size)?;
    cache.set_json(&key, &results, SEARCH_TTL).await;
    Ok(results)
}
