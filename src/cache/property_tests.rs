//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key derivation and read-through semantics over
//! arbitrary inputs.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheKey, CacheStore, ListScope, ManualClock, MemoryBackend, PageQuery};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 1_000;
const TEST_TTL: Duration = Duration::from_secs(300);
const TEST_TIMEOUT: Duration = Duration::from_millis(500);

// == Strategies ==
/// Generates namespaces as used by domain services
fn namespace_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}".prop_map(|s| s)
}

/// Generates free text, separators and escape characters included
fn search_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 :%]{0,24}".prop_map(|s| s)
}

fn query_strategy() -> impl Strategy<Value = PageQuery> {
    (1u32..50, 1u32..100, search_strategy())
        .prop_map(|(page, page_size, search)| PageQuery::new(page, page_size, search.trim()))
}

fn scope_strategy() -> impl Strategy<Value = ListScope> {
    prop_oneof![
        Just(ListScope::All),
        Just(ListScope::Active),
        Just(ListScope::Trashed),
    ]
}

fn memory_store() -> CacheStore {
    CacheStore::new(
        Arc::new(MemoryBackend::new(TEST_MAX_ENTRIES)),
        TEST_TTL,
        TEST_TIMEOUT,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Equal parameters always derive the same key.
    #[test]
    fn prop_key_derivation_is_idempotent(
        namespace in namespace_strategy(),
        scope in scope_strategy(),
        query in query_strategy(),
        id in any::<i64>(),
        secondary in search_strategy()
    ) {
        prop_assert_eq!(
            CacheKey::list(&namespace, scope, &query),
            CacheKey::list(&namespace, scope, &query.clone())
        );
        prop_assert_eq!(CacheKey::by_id(&namespace, id), CacheKey::by_id(&namespace, id));
        prop_assert_eq!(
            CacheKey::by_key(&namespace, &secondary),
            CacheKey::by_key(&namespace, &secondary)
        );
    }

    // Parameter tuples that differ in any field derive different keys.
    #[test]
    fn prop_distinct_list_queries_never_collide(
        namespace in namespace_strategy(),
        scope_a in scope_strategy(),
        scope_b in scope_strategy(),
        query_a in query_strategy(),
        query_b in query_strategy()
    ) {
        let same_inputs = scope_a == scope_b && query_a.normalized() == query_b.normalized();
        let key_a = CacheKey::list(&namespace, scope_a, &query_a);
        let key_b = CacheKey::list(&namespace, scope_b, &query_b);
        prop_assert_eq!(same_inputs, key_a == key_b);
    }

    #[test]
    fn prop_distinct_secondary_keys_never_collide(
        namespace in namespace_strategy(),
        a in search_strategy(),
        b in search_strategy()
    ) {
        let key_a = CacheKey::by_key(&namespace, &a);
        let key_b = CacheKey::by_key(&namespace, &b);
        prop_assert_eq!(a == b, key_a == key_b);
    }

    // Storing then reading (before expiry) yields the stored value.
    #[test]
    fn prop_read_through_roundtrip(id in any::<i32>(), value in "[a-zA-Z0-9 ]{0,64}") {
        let store = memory_store();
        let key = CacheKey::by_id("prop", id);

        let read = tokio_test::block_on(async {
            store.set(&key, &value, None).await;
            store.get::<String>(&key).await
        });
        prop_assert_eq!(read, Some(value));
    }

    // After a delete the key reads as a miss.
    #[test]
    fn prop_delete_removes_entry(id in any::<i32>(), value in "[a-zA-Z0-9 ]{0,64}") {
        let store = memory_store();
        let key = CacheKey::by_id("prop", id);

        let read = tokio_test::block_on(async {
            store.set(&key, &value, None).await;
            store.delete(&key).await;
            store.get::<String>(&key).await
        });
        prop_assert_eq!(read, None);
    }
}

// Separate block with fewer cases for the clock-driven expiry property
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_ttl_expiration_behavior(ttl_secs in 1u64..3_600, id in any::<i32>()) {
        let clock = Arc::new(ManualClock::new(1_000));
        let backend = Arc::new(MemoryBackend::with_clock(TEST_MAX_ENTRIES, clock.clone()));
        let store = CacheStore::new(backend, TEST_TTL, TEST_TIMEOUT);
        let key = CacheKey::by_id("prop", id);
        let ttl = Duration::from_secs(ttl_secs);

        let before = tokio_test::block_on(async {
            store.set(&key, &id, Some(ttl)).await;
            store.get::<i32>(&key).await
        });
        prop_assert_eq!(before, Some(id));

        clock.advance(ttl);
        let after = tokio_test::block_on(store.get::<i32>(&key));
        prop_assert_eq!(after, None);
    }
}
