//! Integration Tests for the cache backends
//!
//! Exercises both backends through the public store contract.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use value_cache::cache::{
    deep_copy, CacheStore, CacheStoreExt, FileBackend, MemoryCache, PersistentCache,
    ResourceHandle, Value, VolatileBackend,
};
use value_cache::error::CacheError;

// == Helper Types ==

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dummy {
    n: i64,
    s: String,
    d: DateTime<Utc>,
    a: Vec<serde_json::Value>,
    #[serde(rename = "_b")]
    b: i64,
}

impl Dummy {
    fn new(n: i64, s: &str, d: DateTime<Utc>, a: Vec<serde_json::Value>) -> Self {
        Self {
            n,
            s: s.to_string(),
            d,
            a,
            b: 0,
        }
    }

    fn set_b(&mut self, b: i64) {
        self.b = b;
    }

    fn get_b(&self) -> i64 {
        self.b
    }
}

fn dummy_record(date: DateTime<Utc>) -> Value {
    Value::record(
        "Dummy",
        [
            ("n", Value::from(1)),
            ("s", Value::from("2")),
            ("d", Value::from(date)),
            ("a", Value::from(vec![Value::from(1), Value::from("2")])),
            ("_b", Value::from(11)),
        ],
    )
}

fn sequence_len(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Sequence(items)) => items.len(),
        _ => 0,
    }
}

// == Round Trip Scenario ==

#[tokio::test]
async fn test_modify_record_after_set() {
    let cache = MemoryCache::global();
    let date = Utc::now();
    let mut original = dummy_record(date);

    cache.set("obj1", original.clone(), None).await.unwrap();

    *original.field_mut("_b").unwrap() = Value::from(22);
    *original.field_mut("n").unwrap() = Value::from(101);
    *original.field_mut("a").unwrap() = Value::Sequence(Vec::new());
    *original.field_mut("s").unwrap() = Value::from("");
    *original.field_mut("d").unwrap() = Value::from(Utc::now() + Duration::seconds(5));

    let stored = cache.get("obj1", false).await.unwrap().unwrap();
    assert_eq!(stored.field("n"), Some(&Value::from(1)));
    assert_eq!(stored.field("s"), Some(&Value::from("2")));
    assert_eq!(stored.field("d"), Some(&Value::from(date)));
    assert_eq!(sequence_len(stored.field("a")), 2);
    assert_eq!(stored.field("_b"), Some(&Value::from(11)));
    assert!(matches!(stored, Value::Record { ref type_name, .. } if type_name == "Dummy"));
}

#[tokio::test]
async fn test_modify_record_after_get() {
    let cache = MemoryCache::global();
    let date = Utc::now();
    cache.set("obj2", dummy_record(date), None).await.unwrap();

    let mut fetched = cache.get("obj2", false).await.unwrap().unwrap();
    *fetched.field_mut("_b").unwrap() = Value::from(22);
    *fetched.field_mut("n").unwrap() = Value::from(101);
    *fetched.field_mut("a").unwrap() = Value::Sequence(Vec::new());
    *fetched.field_mut("s").unwrap() = Value::from("");
    *fetched.field_mut("d").unwrap() = Value::from(Utc::now() + Duration::seconds(5));

    let again = cache.get("obj2", false).await.unwrap().unwrap();
    assert_eq!(again, dummy_record(date));
}

#[tokio::test]
async fn test_typed_round_trip() {
    let cache = MemoryCache::new();
    let date = Utc::now();
    let mut d = Dummy::new(1, "2", date, vec![1.into(), "2".into()]);
    d.set_b(11);

    cache.set_typed("typed", &d, None).await.unwrap();

    d.set_b(22);
    d.n = 101;
    d.a.clear();

    let d2: Dummy = cache.get_typed("typed", false).await.unwrap().unwrap();
    assert_eq!(d2.n, 1);
    assert_eq!(d2.s, "2");
    assert_eq!(d2.d, date);
    assert_eq!(d2.a.len(), 2);
    assert_eq!(d2.get_b(), 11);
}

#[tokio::test]
async fn test_typed_decode_mismatch_is_invalid_value() {
    let cache = MemoryCache::new();
    cache.set("n", Value::from("not a struct"), None).await.unwrap();

    let result = cache.get_typed::<Dummy>("n", false).await;
    assert!(matches!(result, Err(CacheError::InvalidValue(_))));
}

// == Expiry ==

#[tokio::test]
async fn test_expiry_on_both_backends() {
    let memory = MemoryCache::new();
    let persistent = PersistentCache::new(VolatileBackend::new());
    let stores: [&dyn CacheStore; 2] = [&memory, &persistent];

    for store in stores {
        let soon = Utc::now() + Duration::milliseconds(200);
        store.set("short", Value::from("v"), Some(soon)).await.unwrap();
        store.set("forever", Value::from("v"), None).await.unwrap();

        assert_eq!(store.get("short", false).await.unwrap(), Some(Value::from("v")));

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        assert_eq!(store.get("short", false).await.unwrap(), None, "{}", store.name());
        assert_eq!(store.get("forever", false).await.unwrap(), Some(Value::from("v")));
    }
}

// == Persistence ==

#[tokio::test]
async fn test_file_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let date = Utc::now();

    {
        let cache = PersistentCache::new(FileBackend::open(dir.path()).await.unwrap());
        cache.set("record", dummy_record(date), None).await.unwrap();
        cache
            .set("gone", Value::from(1), Some(Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();
    }

    let cache = PersistentCache::new(FileBackend::open(dir.path()).await.unwrap());
    assert_eq!(cache.get("record", false).await.unwrap(), Some(dummy_record(date)));
    assert_eq!(cache.get("gone", false).await.unwrap(), None);

    cache.remove("record").await.unwrap();
    assert_eq!(cache.get("record", false).await.unwrap(), None);
}

#[tokio::test]
async fn test_persistent_read_isolation() {
    let cache = PersistentCache::new(VolatileBackend::new());
    cache.set("obj", dummy_record(Utc::now()), None).await.unwrap();

    let mut first = cache.get("obj", false).await.unwrap().unwrap();
    *first.field_mut("_b").unwrap() = Value::from(22);

    let second = cache.get("obj", false).await.unwrap().unwrap();
    assert_eq!(second.field("_b"), Some(&Value::from(11)));
}

// == Error Cases ==

#[tokio::test]
async fn test_unsupported_type() {
    let handle = Value::Handle(ResourceHandle::new("callback", |x: i32| x + 1));

    assert!(matches!(deep_copy(&handle), Err(CacheError::UnsupportedType(_))));
    assert!(matches!(
        MemoryCache::new().set("fn", handle.clone(), None).await,
        Err(CacheError::UnsupportedType(_))
    ));
    assert!(matches!(
        PersistentCache::new(VolatileBackend::new())
            .set("fn", handle, None)
            .await,
        Err(CacheError::InvalidValue(_))
    ));
}

#[tokio::test]
async fn test_empty_key_on_persistent_cache() {
    let cache = PersistentCache::new(VolatileBackend::new());

    assert!(matches!(cache.set("", Value::Null, None).await, Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.get("", false).await, Err(CacheError::InvalidKey(_))));
    assert!(matches!(cache.remove("").await, Err(CacheError::InvalidKey(_))));
    assert!(cache.backend().keys().await.is_empty());
}

// == Concurrency ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_last_one_wins() {
    let cache = Arc::new(MemoryCache::new());

    let writers: Vec<_> = (0..32)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.set("slot", Value::from(i), None).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    assert_eq!(cache.len().await, 1);
    match cache.get("slot", false).await.unwrap() {
        Some(Value::Integer(n)) => assert!((0..32).contains(&n)),
        other => panic!("unexpected slot content: {other:?}"),
    }
}

async fn count_remove_after_winners(cache: Arc<dyn CacheStore>) -> usize {
    cache.set("token", Value::from("t"), None).await.unwrap();

    let readers: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get("token", true).await })
        })
        .collect();

    let mut winners = 0;
    for reader in readers {
        if reader.await.unwrap().unwrap().is_some() {
            winners += 1;
        }
    }
    winners
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remove_after_hands_value_to_one_reader() {
    let cache = Arc::new(MemoryCache::new());

    assert_eq!(count_remove_after_winners(cache.clone()).await, 1);
    assert!(cache.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_persistent_remove_after_hands_value_to_one_reader() {
    let cache = Arc::new(PersistentCache::new(VolatileBackend::new()));

    assert_eq!(count_remove_after_winners(cache.clone()).await, 1);
    assert!(cache.backend().keys().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_remove_after_hands_value_to_one_reader() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(PersistentCache::new(FileBackend::open(dir.path()).await.unwrap()));

    assert_eq!(count_remove_after_winners(cache.clone()).await, 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

// == Long Keys ==

#[tokio::test]
async fn test_long_key_on_file_backend() {
    let dir = tempfile::tempdir().unwrap();
    let cache = PersistentCache::new(FileBackend::open(dir.path()).await.unwrap());
    let key = "k".repeat(130);

    cache.set(&key, Value::from(1), None).await.unwrap();
    cache.set(&"k".repeat(131), Value::from(2), None).await.unwrap();

    assert_eq!(cache.get(&key, false).await.unwrap(), Some(Value::from(1)));
    assert_eq!(cache.get(&key, true).await.unwrap(), Some(Value::from(1)));
    assert_eq!(cache.get(&key, false).await.unwrap(), None);
    assert_eq!(
        cache.get(&"k".repeat(131), false).await.unwrap(),
        Some(Value::from(2))
    );
}
