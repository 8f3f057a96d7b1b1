use std::future::Future;

use async_trait::async_trait;
use gamedb_catalog::{Provider, RecordFragment};
use gamedb_fetch::FetchResponse;

use crate::error::ResolveError;

/// Re-fetches allowed when a provider returns a placeholder payload.
pub const MAX_EMPTY_RETRIES: u32 = 3;

/// A metadata catalog that can identify a title and describe it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Map a raw release title to this provider's id.
    async fn resolve_id(&self, raw_name: &str) -> Result<u64, ResolveError>;

    /// Assemble metadata for `external_id`.
    async fn fetch_detail(&self, external_id: u64) -> Result<RecordFragment, ResolveError>;
}

/// Run `fetch` until `is_empty` rejects its result, at most
/// [`MAX_EMPTY_RETRIES`] extra times.
pub(crate) async fn refetch_while_empty<T, F, Fut>(
    what: &str,
    mut fetch: F,
    is_empty: impl Fn(&T) -> bool,
) -> Result<T, ResolveError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ResolveError>>,
{
    for attempt in 0..=MAX_EMPTY_RETRIES {
        let value = fetch().await?;
        if !is_empty(&value) {
            return Ok(value);
        }
        log::debug!("{} returned a placeholder payload (attempt {})", what, attempt + 1);
    }
    Err(ResolveError::DataIntegrity(format!(
        "{} still empty after {} re-fetches",
        what, MAX_EMPTY_RETRIES
    )))
}

/// Map a non-success HTTP status from a session-authenticated API. A
/// rejection here means the credentials are bad.
pub(crate) fn check_session_status(resp: &FetchResponse, what: &str) -> Result<(), ResolveError> {
    match resp.status {
        401 | 403 => Err(ResolveError::Auth(format!("{} returned HTTP {}", what, resp.status))),
        _ => check_status(resp, what),
    }
}

/// Map a non-success HTTP status from a public API to the resolver's error
/// taxonomy.
pub(crate) fn check_status(resp: &FetchResponse, what: &str) -> Result<(), ResolveError> {
    match resp.status {
        s if (200..300).contains(&s) => Ok(()),
        404 => Err(ResolveError::not_found(what)),
        s if s >= 500 || s == 429 => Err(ResolveError::Transient(format!(
            "{} returned HTTP {}",
            what, s
        ))),
        s => Err(ResolveError::Permanent(format!("{} returned HTTP {}", what, s))),
    }
}

/// Protocol-relative image URLs (`//images...`) made absolute.
pub(crate) fn absolute_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        url.to_string()
    }
}

/// Append `items` to `out`, skipping empties and duplicates.
pub(crate) fn push_unique(out: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn response(status: u16) -> FetchResponse {
        FetchResponse {
            status,
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn test_refetch_stops_at_first_real_payload() {
        let calls = AtomicU32::new(0);
        let value = refetch_while_empty(
            "covers",
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok(if n < 2 { String::new() } else { "cover".to_string() })
            },
            |v: &String| v.is_empty(),
        )
        .await
        .unwrap();
        assert_eq!(value, "cover");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_refetch_is_bounded() {
        let calls = AtomicU32::new(0);
        let err = refetch_while_empty(
            "covers",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::<u8>::new())
            },
            |v: &Vec<u8>| v.is_empty(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolveError::DataIntegrity(_)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_EMPTY_RETRIES + 1);
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status(&response(200), "x").is_ok());
        assert!(check_status(&response(404), "x").unwrap_err().is_not_found());
        assert!(matches!(check_status(&response(403), "x"), Err(ResolveError::Permanent(_))));
        assert!(check_status(&response(503), "x").unwrap_err().is_transient());
        assert!(matches!(
            check_status(&response(400), "x"),
            Err(ResolveError::Permanent(_))
        ));
    }

    #[test]
    fn test_session_status_mapping() {
        assert!(check_session_status(&response(200), "x").is_ok());
        assert!(matches!(
            check_session_status(&response(401), "x"),
            Err(ResolveError::Auth(_))
        ));
        assert!(matches!(
            check_session_status(&response(403), "x"),
            Err(ResolveError::Auth(_))
        ));
        assert!(check_session_status(&response(404), "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("//images.igdb.com/a.jpg"),
            "https://images.igdb.com/a.jpg"
        );
        assert_eq!(absolute_url("https://x/y"), "https://x/y");
    }

    #[test]
    fn test_push_unique() {
        let mut out = vec!["a".to_string()];
        push_unique(&mut out, ["a".to_string(), String::new(), "b".to_string()]);
        assert_eq!(out, vec!["a", "b"]);
    }
}
