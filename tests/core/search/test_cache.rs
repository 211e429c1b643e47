// Integration tests for the session cache

use crate::common::{locations, memory_services, sample_records, CountingExecutor};
use metaportal::core::search::{QueryPlan, SearchSession};
use metaportal::core::storage::IndexStore;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn plan(word: &str) -> QueryPlan {
    QueryPlan::new().all_of("title", word)
}

#[test]
fn test_cache_never_exceeds_capacity() {
    let fixture = memory_services(3);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", 10))
        .unwrap();
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();

    let executor = CountingExecutor::new(fixture.services.aliases.clone());
    let cache = &fixture.services.cache;
    for i in 0..10 {
        let plan = plan(&i.to_string());
        let fp = plan.fingerprint("main");
        cache
            .get_or_create(&fp, || executor.run(&fp, &plan))
            .unwrap();
        assert!(cache.len() <= 3);
    }
    assert_eq!(cache.len(), 3);
    assert_eq!(executor.calls(), 10);
}

#[test]
fn test_same_fingerprint_same_session() {
    let fixture = memory_services(4);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", 3))
        .unwrap();
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();

    let executor = CountingExecutor::new(fixture.services.aliases.clone());
    let cache = &fixture.services.cache;

    // Logically identical plans normalize to the same fingerprint
    let first_plan = QueryPlan::new().all_of("title", "survey  harbor");
    let second_plan = QueryPlan::new().all_of("title", "harbor survey");
    let fp1 = first_plan.fingerprint("main");
    let fp2 = second_plan.fingerprint("main");
    assert_eq!(fp1, fp2);

    let a = cache
        .get_or_create(&fp1, || executor.run(&fp1, &first_plan))
        .unwrap();
    let b = cache
        .get_or_create(&fp2, || executor.run(&fp2, &second_plan))
        .unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(executor.calls(), 1);
}

#[test]
fn test_single_flight_on_cold_cache() {
    let fixture = memory_services(4);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", 5))
        .unwrap();
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();
    fixture
        .store
        .set_search_delay(Some(Duration::from_millis(100)));

    let executor = CountingExecutor::new(fixture.services.aliases.clone());
    let cache = fixture.services.cache.clone();
    let plan = plan("harbor");
    let fp = plan.fingerprint("main");

    const THREADS: usize = 8;
    let barrier = Arc::new(Barrier::new(THREADS));
    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = cache.clone();
            let executor = executor.clone();
            let barrier = barrier.clone();
            let plan = plan.clone();
            let fp = fp.clone();
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_create(&fp, || executor.run(&fp, &plan))
                    .unwrap()
            })
        })
        .collect();

    let sessions: Vec<Arc<SearchSession>> =
        workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(executor.calls(), 1);
    assert_eq!(fixture.store.search_count("main_v1"), 1);
    for session in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], session));
    }
}

#[test]
fn test_failed_execution_fails_all_waiters() {
    let fixture = memory_services(4);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", 5))
        .unwrap();
    // A damaged segment makes every search on the index fail
    fixture.store.corrupt_segment("main_v1", 0);
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();
    fixture
        .store
        .set_search_delay(Some(Duration::from_millis(100)));

    let executor = CountingExecutor::new(fixture.services.aliases.clone());
    let cache = fixture.services.cache.clone();
    let plan = plan("harbor");
    let fp = plan.fingerprint("main");

    let barrier = Arc::new(Barrier::new(4));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let (cache, executor, barrier) = (cache.clone(), executor.clone(), barrier.clone());
            let (plan, fp) = (plan.clone(), fp.clone());
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_create(&fp, || executor.run(&fp, &plan)).is_err()
            })
        })
        .collect();

    for worker in workers {
        assert!(worker.join().unwrap());
    }
    assert_eq!(executor.calls(), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_different_fingerprints_do_not_wait_on_each_other() {
    let fixture = memory_services(4);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", 5))
        .unwrap();
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();
    fixture
        .store
        .set_search_delay(Some(Duration::from_millis(200)));

    let executor = CountingExecutor::new(fixture.services.aliases.clone());
    let cache = fixture.services.cache.clone();

    let start = std::time::Instant::now();
    let workers: Vec<_> = ["harbor", "survey", "1"]
        .into_iter()
        .map(|word| {
            let (cache, executor) = (cache.clone(), executor.clone());
            let plan = plan(word);
            thread::spawn(move || {
                let fp = plan.fingerprint("main");
                cache.get_or_create(&fp, || executor.run(&fp, &plan)).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(executor.calls(), 3);
    // Three serialized executions would take at least 600ms
    assert!(start.elapsed() < Duration::from_millis(550));
}

/// Capacity 2, queries A, B, C: A is evicted, B and C are served from the cache
#[test]
fn test_capacity_two_evicts_oldest() {
    let fixture = memory_services(2);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", 5))
        .unwrap();
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();

    let executor = CountingExecutor::new(fixture.services.aliases.clone());
    let cache = &fixture.services.cache;
    let run = |word: &str| {
        let plan = plan(word);
        let fp = plan.fingerprint("main");
        cache
            .get_or_create(&fp, || executor.run(&fp, &plan))
            .unwrap()
    };

    let a = run("harbor");
    let b = run("survey");
    let c = run("1");
    assert_eq!(executor.calls(), 3);
    assert!(!cache.contains(a.fingerprint()));

    assert!(Arc::ptr_eq(&b, &run("survey")));
    assert!(Arc::ptr_eq(&c, &run("1")));
    assert_eq!(executor.calls(), 3);
    assert_eq!(cache.len(), 2);
}

/// Capacity 2, queries A, B, A, C: B is evicted and re-executed, A is not
#[test]
fn test_capacity_two_eviction_scenario() {
    let fixture = memory_services(2);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", 5))
        .unwrap();
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();

    let executor = CountingExecutor::new(fixture.services.aliases.clone());
    let cache = &fixture.services.cache;
    let run = |word: &str| {
        let plan = plan(word);
        let fp = plan.fingerprint("main");
        cache
            .get_or_create(&fp, || executor.run(&fp, &plan))
            .unwrap()
    };

    let a = run("harbor");
    let b = run("survey");
    let a_again = run("harbor");
    assert!(Arc::ptr_eq(&a, &a_again));
    assert_eq!(executor.calls(), 2);

    run("1");
    assert_eq!(executor.calls(), 3);
    assert!(cache.contains(a.fingerprint()));
    assert!(!cache.contains(b.fingerprint()));

    // B was evicted, so it executes again
    let b_again = run("survey");
    assert!(!Arc::ptr_eq(&b, &b_again));
    assert_eq!(executor.calls(), 4);
    // The evicted session stays readable for whoever still holds it
    assert!(b.is_live());
}
