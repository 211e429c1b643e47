// Integration tests for alias swaps and handle lifetime

use crate::common::{locations, memory_services, sample_records};
use metaportal::core::error::IndexError;
use metaportal::core::search::QueryPlan;
use metaportal::core::storage::IndexStore;
use metaportal::core::types::FieldSelector;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_swap_invalidates_sessions_of_target_only() {
    let fixture = memory_services(8);
    let store = &fixture.store;
    store.build("main_v1", &sample_records("main", 3)).unwrap();
    store.build("main_v2", &sample_records("main", 4)).unwrap();
    store.build("side_v1", &sample_records("side", 2)).unwrap();

    let admin = &fixture.services.admin;
    admin.trigger_reindex("main", &locations(&["main_v1"])).unwrap();
    admin.trigger_reindex("side", &locations(&["side_v1"])).unwrap();

    let search = &fixture.services.search;
    let plan = QueryPlan::new().all_of("title", "survey");
    let main = search
        .search("main", &plan, FieldSelector::identifier_only())
        .unwrap();
    let side = search
        .search("side", &plan, FieldSelector::identifier_only())
        .unwrap();
    assert_eq!(fixture.services.cache.len(), 2);

    admin.trigger_reindex("main", &locations(&["main_v2"])).unwrap();

    assert!(!main.session().is_live());
    assert!(side.session().is_live());
    assert_eq!(fixture.services.cache.len(), 1);
    assert_eq!(search.search("main", &plan, FieldSelector::identifier_only()).unwrap().size(), 4);
}

#[test]
fn test_old_index_closed_once_after_last_reader() {
    let fixture = memory_services(8);
    let store = &fixture.store;
    store.build("main_v1", &sample_records("main", 3)).unwrap();
    store.build("main_v2", &sample_records("main", 3)).unwrap();
    let admin = &fixture.services.admin;
    admin.trigger_reindex("main", &locations(&["main_v1"])).unwrap();

    let plan = QueryPlan::new().all_of("title", "survey");
    let first = fixture
        .services
        .search
        .search("main", &plan, FieldSelector::identifier_only())
        .unwrap();
    let second = fixture
        .services
        .search
        .search("main", &plan, FieldSelector::identifier_only())
        .unwrap();

    admin.trigger_reindex("main", &locations(&["main_v2"])).unwrap();
    assert_eq!(store.close_count("main_v1"), 0);

    drop(first);
    assert_eq!(store.close_count("main_v1"), 0);
    drop(second);
    assert_eq!(store.close_count("main_v1"), 1);
    assert_eq!(store.live_count("main_v1"), 0);
}

/// Capacity 1: A is evicted by B, then the target is swapped. Both go
/// stale even though only B was still cached.
#[test]
fn test_swap_invalidates_evicted_sessions() {
    let fixture = memory_services(1);
    let store = &fixture.store;
    store.build("main_v1", &sample_records("harbor", 3)).unwrap();
    store.build("main_v2", &sample_records("harbor", 2)).unwrap();
    let admin = &fixture.services.admin;
    admin.trigger_reindex("main", &locations(&["main_v1"])).unwrap();

    let search = &fixture.services.search;
    let selector = FieldSelector::identifier_only();
    let harbor = QueryPlan::new().all_of("title", "harbor");
    let a = search.search("main", &harbor, selector.clone()).unwrap();
    let b = search
        .search("main", &QueryPlan::new().all_of("title", "survey"), selector.clone())
        .unwrap();
    assert!(!fixture.services.cache.contains(a.session().fingerprint()));

    admin.trigger_reindex("main", &locations(&["main_v2"])).unwrap();

    assert!(matches!(a.get(0), Err(IndexError::StaleSession(_))));
    assert!(matches!(b.get(0), Err(IndexError::StaleSession(_))));
    let page = search.page("main", &harbor, &selector, 0, None).unwrap();
    assert_eq!(page.total, 2);
}

/// N sessions on the old index, released in shuffled order around a swap
#[test]
fn test_distinct_sessions_released_in_any_order() {
    let fixture = memory_services(8);
    let store = &fixture.store;
    store.build("main_v1", &sample_records("main", 5)).unwrap();
    store.build("main_v2", &sample_records("main", 5)).unwrap();
    let services = &fixture.services;
    services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();

    let mut cursors: Vec<_> = ["main", "survey", "0", "1", "2", "3"]
        .iter()
        .map(|word| {
            let plan = QueryPlan::new().all_of("title", word);
            Some(
                services
                    .search
                    .search("main", &plan, FieldSelector::identifier_only())
                    .unwrap(),
            )
        })
        .collect();
    assert_eq!(store.search_count("main_v1"), 6);

    // Two readers finish before the swap, the rest after it
    cursors[4].take();
    cursors[1].take();
    services
        .admin
        .trigger_reindex("main", &locations(&["main_v2"]))
        .unwrap();
    assert!(services.cache.is_empty());

    for i in [3, 0, 5] {
        cursors[i].take();
        assert_eq!(store.close_count("main_v1"), 0);
        let err = services
            .admin
            .check_and_optionally_repair("main_v1", true)
            .unwrap_err();
        assert!(err.is_conflict());
    }

    cursors[2].take();
    assert_eq!(store.close_count("main_v1"), 1);
    assert_eq!(store.live_count("main_v1"), 0);
    assert!(services
        .admin
        .check_and_optionally_repair("main_v1", true)
        .is_ok());
}

#[test]
fn test_failed_swap_keeps_serving_old_mapping() {
    let fixture = memory_services(8);
    let store = &fixture.store;
    store.build("main_v1", &sample_records("main", 3)).unwrap();
    store.build("main_v2", &sample_records("main", 5)).unwrap();
    let admin = &fixture.services.admin;
    admin.trigger_reindex("main", &locations(&["main_v1"])).unwrap();

    let plan = QueryPlan::new().all_of("title", "survey");
    let cursor = fixture
        .services
        .search
        .search("main", &plan, FieldSelector::identifier_only())
        .unwrap();

    store.set_fail_open("main_v2", true);
    let err = admin
        .trigger_reindex("main", &locations(&["main_v2"]))
        .unwrap_err();
    assert!(matches!(err, IndexError::OpenFailed { .. }));

    // Nothing was invalidated and the old mapping still answers
    assert!(cursor.session().is_live());
    assert!(cursor.get(2).is_ok());
    assert_eq!(
        fixture.services.aliases.resolve("main").unwrap().locations(),
        locations(&["main_v1"])
    );
}

#[test]
fn test_swap_to_unknown_location_fails() {
    let fixture = memory_services(8);
    let err = fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["nowhere"]))
        .unwrap_err();
    assert!(matches!(err, IndexError::OpenFailed { .. }));
    assert!(fixture.services.aliases.targets().is_empty());
}

/// Readers never observe a partially built entry while swaps run
#[test]
fn test_concurrent_resolve_during_swaps() {
    let fixture = memory_services(8);
    let store = &fixture.store;
    for loc in ["a", "b", "c", "d"] {
        store.build(loc, &sample_records(loc, 1)).unwrap();
    }
    let aliases = fixture.services.aliases.clone();
    aliases.swap("main", &locations(&["a", "b"])).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let swapper = {
        let (aliases, stop) = (aliases.clone(), stop.clone());
        thread::spawn(move || {
            let mut swaps = 0usize;
            loop {
                let next = if swaps % 2 == 0 { ["c", "d"] } else { ["a", "b"] };
                aliases.swap("main", &locations(&next)).unwrap();
                swaps += 1;
                if stop.load(Ordering::SeqCst) {
                    return swaps;
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let aliases = aliases.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    let entry = aliases.resolve("main").unwrap();
                    let locs = entry.locations();
                    assert!(
                        locs == ["a", "b"] || locs == ["c", "d"],
                        "mixed mapping {locs:?}"
                    );
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::SeqCst);
    assert!(swapper.join().unwrap() > 0);
    drop(aliases);

    // Only the table's current entry keeps indexes open
    let live: usize = ["a", "b", "c", "d"].iter().map(|l| store.live_count(l)).sum();
    assert_eq!(live, 2);
    for loc in ["a", "b", "c", "d"] {
        assert_eq!(store.open_count(loc), store.close_count(loc) + store.live_count(loc));
    }
}
