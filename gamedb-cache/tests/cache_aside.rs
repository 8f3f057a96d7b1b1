use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gamedb_cache::{CacheAside, CacheBackend, CacheError, MemoryCache, RedisConfig};

fn memory_store() -> (CacheAside, Arc<MemoryCache>) {
    let backend = Arc::new(MemoryCache::new());
    (CacheAside::new(backend.clone()), backend)
}

#[tokio::test]
async fn round_trip() {
    let (cache, _) = memory_store();
    cache.set("igdb_id:hades", "1113", Duration::from_secs(60)).await;
    assert_eq!(cache.get("igdb_id:hades").await.as_deref(), Some("1113"));
    assert_eq!(cache.get("igdb_id:celeste").await, None);
}

#[tokio::test]
async fn entries_expire() {
    let (cache, backend) = memory_store();
    cache.set("short", "v", Duration::from_millis(20)).await;
    assert!(cache.get("short").await.is_some());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(cache.get("short").await, None);
    assert_eq!(backend.len().await, 0);
}

#[tokio::test]
async fn second_call_is_served_from_cache() {
    let (cache, _) = memory_store();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let id: Result<u64, String> = cache
            .get_or_fetch("steam_id:hades", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1145360)
            })
            .await;
        assert_eq!(id.unwrap(), 1145360);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let (cache, backend) = memory_store();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        let result: Result<u64, String> = cache
            .get_or_fetch("gog_id:missing", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("not found".to_string())
            })
            .await;
        assert!(result.is_err());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(backend.len().await, 0);
}

#[tokio::test]
async fn undecodable_entry_is_a_miss() {
    let (cache, _) = memory_store();
    cache.set("igdb_game:1", "not json", Duration::from_secs(60)).await;

    let value: Result<Vec<String>, String> = cache
        .get_or_fetch("igdb_game:1", Duration::from_secs(60), || async {
            Ok(vec!["fresh".to_string()])
        })
        .await;
    assert_eq!(value.unwrap(), vec!["fresh".to_string()]);
    assert_eq!(cache.get("igdb_game:1").await.as_deref(), Some(r#"["fresh"]"#));
}

#[tokio::test]
async fn disabled_store_always_fetches() {
    let cache = CacheAside::disabled();
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let _: Result<u8, ()> = cache
            .get_or_fetch("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!cache.is_enabled());
}

struct BrokenBackend;

#[async_trait]
impl CacheBackend for BrokenBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(serde_json::from_str::<u8>("x").unwrap_err().into())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(serde_json::from_str::<u8>("x").unwrap_err().into())
    }
}

#[tokio::test]
async fn backend_errors_do_not_propagate() {
    let cache = CacheAside::new(Arc::new(BrokenBackend));
    let value: Result<String, ()> = cache
        .get_or_fetch("k", Duration::from_secs(60), || async { Ok("computed".to_string()) })
        .await;
    assert_eq!(value, Ok("computed".to_string()));
    assert_eq!(cache.get("k").await, None);
}

#[tokio::test]
async fn unreachable_redis_disables_cache() {
    // Nothing listens on this port.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = RedisConfig {
        host: "127.0.0.1".into(),
        port,
        password: None,
        db: 0,
    };
    let cache = CacheAside::connect(Some(&config)).await;
    assert!(!cache.is_enabled());
}

#[tokio::test]
async fn no_config_disables_cache() {
    assert!(!CacheAside::connect(None).await.is_enabled());
}
