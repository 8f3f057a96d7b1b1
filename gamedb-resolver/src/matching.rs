//! Fuzzy title matching shared by every provider.
//!
//! A provider only has to turn a query into [`Candidate`]s; choosing the
//! winner, running the normalized second pass and converging variants on
//! their parent happen here.

use async_trait::async_trait;
use gamedb_catalog::{prepare_title, similarity, titles_equal};

use crate::error::ResolveError;

/// One search hit from a provider catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: u64,
    pub title: String,
    /// Set when this entry is a variant (edition, port, bundle) of another.
    pub parent_id: Option<u64>,
}

impl Candidate {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Option<u64>) -> Self {
        self.parent_id = parent_id.filter(|&p| p != 0);
        self
    }

    /// The id a match on this candidate resolves to.
    pub fn resolved_id(&self) -> u64 {
        self.parent_id.unwrap_or(self.id)
    }
}

/// A provider's title search.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>, ResolveError>;
}

/// Pick the candidate that best matches `query`.
///
/// An exact title (ignoring case and spacing) wins immediately. Otherwise the
/// highest similarity at or above `threshold` wins, the earliest candidate
/// keeping ties.
pub fn best_match<'a>(
    candidates: &'a [Candidate],
    query: &str,
    threshold: f64,
) -> Option<&'a Candidate> {
    let mut best: Option<(&Candidate, f64)> = None;
    for candidate in candidates {
        if titles_equal(&candidate.title, query) {
            return Some(candidate);
        }
        let score = similarity(&candidate.title, query);
        log::debug!(
            "Similarity '{}' vs '{}': {:.3}",
            query,
            candidate.title,
            score
        );
        if score >= threshold && best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }
    best.map(|(c, _)| c)
}

/// Resolve `raw_name` with the raw title, then once more with the normalized
/// title if the first pass finds nothing confident.
///
/// Search errors other than a miss are returned as-is; the second pass only
/// runs when the normalized title differs from the raw one.
pub async fn resolve_two_pass<S: CandidateSearch + ?Sized>(
    search: &S,
    raw_name: &str,
    threshold: f64,
) -> Result<u64, ResolveError> {
    let mut queries = vec![raw_name.trim().to_string()];
    let normalized = prepare_title(raw_name);
    if !normalized.is_empty() && !titles_equal(&normalized, raw_name) {
        queries.push(normalized);
    }

    for query in &queries {
        if query.is_empty() {
            continue;
        }
        let candidates = match search.search(query).await {
            Ok(c) => c,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        if let Some(hit) = best_match(&candidates, query, threshold) {
            log::debug!(
                "'{}' matched '{}' (id {}, resolves to {})",
                query,
                hit.title,
                hit.id,
                hit.resolved_id()
            );
            return Ok(hit.resolved_id());
        }
    }

    Err(ResolveError::not_found(raw_name))
}

#[cfg(test)]
#[path = "tests/matching_tests.rs"]
mod tests;
