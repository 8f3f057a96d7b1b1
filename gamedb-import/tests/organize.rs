use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use gamedb_catalog::{Listing, Provider, RecordFragment};
use gamedb_db::*;
use gamedb_import::*;
use gamedb_resolver::{IdentityProvider, ResolveError, ResolverChain};
use rusqlite::Connection;

/// Provider answering from a fixed title table.
struct FakeProvider {
    provider: Provider,
    ids: HashMap<&'static str, u64>,
    down_for: Vec<&'static str>,
    detail_fails: bool,
    detail_calls: Arc<AtomicUsize>,
}

impl FakeProvider {
    fn new(provider: Provider, ids: &[(&'static str, u64)]) -> Self {
        Self {
            provider,
            ids: ids.iter().copied().collect(),
            down_for: Vec::new(),
            detail_fails: false,
            detail_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn resolve_id(&self, raw_name: &str) -> Result<u64, ResolveError> {
        if self.down_for.iter().any(|d| *d == raw_name) {
            return Err(ResolveError::Transient("connection reset".into()));
        }
        self.ids
            .get(raw_name)
            .copied()
            .ok_or_else(|| ResolveError::not_found(raw_name))
    }

    async fn fetch_detail(&self, external_id: u64) -> Result<RecordFragment, ResolveError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.detail_fails {
            return Err(ResolveError::DataIntegrity(format!(
                "{} detail still empty",
                self.provider
            )));
        }
        Ok(RecordFragment {
            provider: Some(self.provider),
            external_id,
            name: format!("Game {external_id}"),
            description: Some("A game.".into()),
            developers: vec!["Studio".into()],
            ..RecordFragment::default()
        })
    }
}

fn chain(providers: Vec<FakeProvider>) -> ResolverChain {
    ResolverChain::new(
        providers
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn IdentityProvider>)
            .collect(),
    )
}

fn add_listing(conn: &Connection, url: &str, raw_name: &str) -> Listing {
    let id = save_listing(conn, &Listing::new(url, raw_name, raw_name, url, "source")).unwrap();
    get_listing(conn, id).unwrap().unwrap()
}

#[tokio::test]
async fn new_identity_creates_record() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![FakeProvider::new(Provider::Igdb, &[("Hades", 113)])]);
    let listing = add_listing(&conn, "https://a", "Hades");

    let outcome = organize_listing(&conn, &chain, &listing).await.unwrap();
    let LinkOutcome::Created(id) = outcome else {
        panic!("expected a new record, got {outcome:?}");
    };

    let record = get_record(&conn, id).unwrap().unwrap();
    assert_eq!(record.name, "Game 113");
    assert_eq!(record.igdb_id, Some(113));
    assert_eq!(record.developers, vec!["Studio"]);
    assert_eq!(record.listing_ids, vec![listing.id]);
}

#[tokio::test]
async fn known_identity_attaches_to_existing_record() {
    let conn = open_memory().unwrap();
    let igdb = FakeProvider::new(Provider::Igdb, &[("Hades", 113), ("HADES v1.2", 113)]);
    let detail_calls = igdb.detail_calls.clone();
    let chain = chain(vec![igdb]);

    let first = add_listing(&conn, "https://a", "Hades");
    let second = add_listing(&conn, "https://b", "HADES v1.2");

    let created = organize_listing(&conn, &chain, &first).await.unwrap();
    let attached = organize_listing(&conn, &chain, &second).await.unwrap();
    assert_eq!(attached, LinkOutcome::Attached(created.record_id()));

    let record = get_record(&conn, created.record_id()).unwrap().unwrap();
    assert_eq!(record.listing_ids, vec![first.id, second.id]);
    // Detail is only fetched for the record's creation.
    assert_eq!(detail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reorganizing_a_linked_listing_is_idempotent() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![FakeProvider::new(Provider::Steam, &[("Hades", 1145360)])]);
    let listing = add_listing(&conn, "https://a", "Hades");

    let id = organize_listing(&conn, &chain, &listing).await.unwrap().record_id();
    let again = organize_listing(&conn, &chain, &listing).await.unwrap();
    assert_eq!(again, LinkOutcome::Attached(id));
    assert_eq!(get_record(&conn, id).unwrap().unwrap().listing_ids, vec![listing.id]);
}

#[tokio::test]
async fn fallback_provider_identity_is_recorded() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![
        FakeProvider::new(Provider::Igdb, &[]),
        FakeProvider::new(Provider::Gog, &[("Hades", 1207658924)]),
    ]);
    let listing = add_listing(&conn, "https://a", "Hades");

    let id = organize_listing(&conn, &chain, &listing).await.unwrap().record_id();
    let record = get_record(&conn, id).unwrap().unwrap();
    assert_eq!(record.igdb_id, None);
    assert_eq!(record.gog_id, Some(1207658924));
}

#[tokio::test]
async fn unlinked_pass_counts_each_outcome() {
    let conn = open_memory().unwrap();
    let mut steam = FakeProvider::new(Provider::Steam, &[("Hades", 1), ("Hades GOTY", 1), ("Bastion", 2)]);
    steam.down_for = vec!["Transistor"];
    let chain = chain(vec![steam]);

    add_listing(&conn, "https://a", "Hades");
    add_listing(&conn, "https://b", "Hades GOTY");
    add_listing(&conn, "https://c", "Bastion");
    add_listing(&conn, "https://d", "Unknown Thing");
    add_listing(&conn, "https://e", "Transistor");

    let stats = organize_unlinked(&conn, &chain, None, &SilentProgress).await.unwrap();
    assert_eq!(
        stats,
        OrganizeStats {
            processed: 5,
            created: 2,
            attached: 1,
            unresolved: 1,
            failed: 1,
        }
    );

    // Only the two failures remain unlinked.
    let left: Vec<String> = listings_without_record(&conn, None)
        .unwrap()
        .into_iter()
        .map(|l| l.raw_name)
        .collect();
    assert_eq!(left, vec!["Unknown Thing", "Transistor"]);
}

#[tokio::test]
async fn detail_failure_falls_through_to_next_provider() {
    let conn = open_memory().unwrap();
    let mut igdb = FakeProvider::new(Provider::Igdb, &[("Hades", 113)]);
    igdb.detail_fails = true;
    let chain = chain(vec![igdb, FakeProvider::new(Provider::Steam, &[("Hades", 1145360)])]);
    let listing = add_listing(&conn, "https://a", "Hades");

    let outcome = organize_listing(&conn, &chain, &listing).await.unwrap();
    let LinkOutcome::Created(id) = outcome else {
        panic!("expected a new record, got {outcome:?}");
    };

    let record = get_record(&conn, id).unwrap().unwrap();
    assert_eq!(record.igdb_id, None);
    assert_eq!(record.steam_id, Some(1145360));
    assert_eq!(record.name, "Game 1145360");
    assert_eq!(record.listing_ids, vec![listing.id]);
}

#[tokio::test]
async fn detail_failure_on_last_provider_is_reported() {
    let conn = open_memory().unwrap();
    let mut igdb = FakeProvider::new(Provider::Igdb, &[("Hades", 113)]);
    igdb.detail_fails = true;
    let chain = chain(vec![igdb, FakeProvider::new(Provider::Steam, &[])]);
    let listing = add_listing(&conn, "https://a", "Hades");

    let err = organize_listing(&conn, &chain, &listing).await.unwrap_err();
    assert!(
        matches!(err, IngestError::Resolve(ResolveError::DataIntegrity(_))),
        "{err:?}"
    );
    assert_eq!(record_id_for_listing(&conn, listing.id).unwrap(), None);
}

#[tokio::test]
async fn known_identity_attaches_without_fetching_detail() {
    let conn = open_memory().unwrap();
    let healthy = chain(vec![FakeProvider::new(Provider::Igdb, &[("Hades", 113)])]);
    let first = add_listing(&conn, "https://a", "Hades");
    let id = organize_listing(&conn, &healthy, &first).await.unwrap().record_id();

    let mut igdb = FakeProvider::new(Provider::Igdb, &[("Hades", 113)]);
    igdb.detail_fails = true;
    let detail_calls = igdb.detail_calls.clone();
    let broken = chain(vec![igdb]);
    let second = add_listing(&conn, "https://b", "Hades");

    let outcome = organize_listing(&conn, &broken, &second).await.unwrap();
    assert_eq!(outcome, LinkOutcome::Attached(id));
    assert_eq!(detail_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unlinked_pass_counts_detail_failures_as_failed() {
    let conn = open_memory().unwrap();
    let mut igdb = FakeProvider::new(Provider::Igdb, &[("Hades", 113), ("Bastion", 7)]);
    igdb.detail_fails = true;
    let gog = FakeProvider::new(Provider::Gog, &[("Bastion", 1207664643)]);
    let chain = chain(vec![igdb, gog]);

    add_listing(&conn, "https://a", "Hades");
    add_listing(&conn, "https://b", "Bastion");
    add_listing(&conn, "https://c", "Unknown Thing");

    let stats = organize_unlinked(&conn, &chain, None, &SilentProgress).await.unwrap();
    assert_eq!(
        stats,
        OrganizeStats {
            processed: 3,
            created: 1,
            attached: 0,
            unresolved: 1,
            failed: 1,
        }
    );

    let bastion = find_record_by_external_id(&conn, Provider::Gog, 1207664643)
        .unwrap()
        .unwrap();
    assert_eq!(bastion.igdb_id, None);
}

#[tokio::test]
async fn unlinked_pass_honors_limit() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![FakeProvider::new(Provider::Igdb, &[("A", 1), ("B", 2)])]);
    add_listing(&conn, "https://a", "A");
    add_listing(&conn, "https://b", "B");

    let stats = organize_unlinked(&conn, &chain, Some(1), &SilentProgress).await.unwrap();
    assert_eq!(stats.processed, 1);
    assert_eq!(listings_without_record(&conn, None).unwrap().len(), 1);
}

#[tokio::test]
async fn link_listing_moves_it_to_the_chosen_identity() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![FakeProvider::new(Provider::Igdb, &[("Hades", 113)])]);
    let listing = add_listing(&conn, "https://a", "Hades");
    let wrong = organize_listing(&conn, &chain, &listing).await.unwrap().record_id();

    let outcome = link_listing(&conn, &chain, listing.id, Provider::Igdb, 558)
        .await
        .unwrap();
    let LinkOutcome::Created(right) = outcome else {
        panic!("expected a new record, got {outcome:?}");
    };

    assert_eq!(record_id_for_listing(&conn, listing.id).unwrap(), Some(right));
    assert!(get_record(&conn, wrong).unwrap().unwrap().listing_ids.is_empty());
    assert_eq!(get_record(&conn, right).unwrap().unwrap().igdb_id, Some(558));
}

#[tokio::test]
async fn link_unknown_listing_fails() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![FakeProvider::new(Provider::Igdb, &[])]);
    let err = link_listing(&conn, &chain, 42, Provider::Igdb, 1).await.unwrap_err();
    assert!(matches!(err, IngestError::ListingNotFound(42)));
}

#[tokio::test]
async fn link_to_unconfigured_provider_fails() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![FakeProvider::new(Provider::Igdb, &[])]);
    let listing = add_listing(&conn, "https://a", "Hades");

    let err = link_listing(&conn, &chain, listing.id, Provider::Gog, 1).await.unwrap_err();
    assert!(matches!(err, IngestError::Resolve(ResolveError::Config(_))), "{err:?}");
    assert_eq!(record_id_for_listing(&conn, listing.id).unwrap(), None);
}

#[tokio::test]
async fn refresh_record_keeps_listings_and_other_ids() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![
        FakeProvider::new(Provider::Igdb, &[("Hades", 113)]),
        FakeProvider::new(Provider::Steam, &[]),
    ]);
    let listing = add_listing(&conn, "https://a", "Hades");
    let id = organize_listing(&conn, &chain, &listing).await.unwrap().record_id();

    let refreshed = refresh_record(&conn, &chain, id, Provider::Steam, 1145360)
        .await
        .unwrap();
    assert_eq!(refreshed.name, "Game 1145360");

    let stored = get_record(&conn, id).unwrap().unwrap();
    assert_eq!(stored.name, "Game 1145360");
    assert_eq!(stored.igdb_id, Some(113));
    assert_eq!(stored.steam_id, Some(1145360));
    assert_eq!(stored.listing_ids, vec![listing.id]);
}

#[tokio::test]
async fn refresh_unknown_record_fails() {
    let conn = open_memory().unwrap();
    let chain = chain(vec![FakeProvider::new(Provider::Igdb, &[])]);
    let err = refresh_record(&conn, &chain, 7, Provider::Igdb, 1).await.unwrap_err();
    assert!(matches!(err, IngestError::RecordNotFound(7)));
}
