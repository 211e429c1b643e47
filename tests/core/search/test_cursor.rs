// Integration tests for result cursors and pagination

use crate::common::{locations, memory_services, record, sample_records, MemoryFixture};
use metaportal::core::error::IndexError;
use metaportal::core::search::QueryPlan;
use metaportal::core::storage::IndexStore;
use metaportal::core::types::FieldSelector;

fn fixture_with_main(records: usize) -> MemoryFixture {
    let fixture = memory_services(8);
    fixture
        .store
        .build("main_v1", &sample_records("harbor", records))
        .unwrap();
    fixture
        .services
        .admin
        .trigger_reindex("main", &locations(&["main_v1"]))
        .unwrap();
    fixture
}

#[test]
fn test_get_every_position_in_range() {
    let fixture = fixture_with_main(12);
    let selector = fixture
        .services
        .fields
        .selector(&["title", "year"], false)
        .unwrap();
    let cursor = fixture
        .services
        .search
        .search("main", &QueryPlan::new().all_of("title", "survey"), selector)
        .unwrap();

    assert_eq!(cursor.size(), 12);
    for i in 0..cursor.size() {
        let item = cursor.get(i).unwrap();
        assert!(item.identifier.starts_with("oai:harbor:"));
        assert!(item.fields.contains_key("title"));
        assert!(item.fields.contains_key("year"));
        assert!(!item.fields.contains_key("creator"));
        assert!(item.xml.is_none());
    }
    assert!(matches!(
        cursor.get(12),
        Err(IndexError::OutOfRange { index: 12, size: 12 })
    ));
    assert!(matches!(
        cursor.get(usize::MAX),
        Err(IndexError::OutOfRange { .. })
    ));
}

#[test]
fn test_empty_session() {
    let fixture = fixture_with_main(3);
    let cursor = fixture
        .services
        .search
        .search(
            "main",
            &QueryPlan::new().all_of("title", "volcano"),
            FieldSelector::identifier_only(),
        )
        .unwrap();

    assert_eq!(cursor.size(), 0);
    assert!(matches!(
        cursor.get(0),
        Err(IndexError::OutOfRange { index: 0, size: 0 })
    ));
    assert!(cursor.iter().next().is_none());
}

#[test]
fn test_repeated_search_reuses_session() {
    let fixture = fixture_with_main(3);
    let search = &fixture.services.search;
    let plan = QueryPlan::new().all_of("title", "survey");

    let first = search
        .search("main", &plan, FieldSelector::identifier_only())
        .unwrap();
    drop(first);
    let second = search
        .search("main", &plan, FieldSelector::identifier_only())
        .unwrap();

    assert_eq!(second.size(), 3);
    assert_eq!(fixture.store.search_count("main_v1"), 1);
}

#[test]
fn test_payload_and_non_stored_field_selection() {
    let fixture = fixture_with_main(2);
    let fields = &fixture.services.fields;

    let err = fields.selector(&["notes"], false).unwrap_err();
    assert!(matches!(err, IndexError::InvalidQueryField { .. }));
    let err = fields.selector(&["missing"], false).unwrap_err();
    assert!(err.is_bad_request());

    let cursor = fixture
        .services
        .search
        .search(
            "main",
            &QueryPlan::new().all_of("title", "harbor 0"),
            fields.selector(&["creator"], true).unwrap(),
        )
        .unwrap();
    assert_eq!(cursor.size(), 1);
    let item = cursor.get(0).unwrap();
    assert_eq!(item.fields["creator"].len(), 1);
    assert!(item.xml.as_deref().unwrap_or("").contains("<record>"));
    assert_eq!(item.score, 1.0);
}

/// Page 1 from the old index, swap, page 2: the stale cursor refuses to
/// read and the service re-executes against the new index.
#[test]
fn test_swap_mid_pagination() {
    let fixture = fixture_with_main(25);
    fixture
        .store
        .build(
            "main_v2",
            &[
                record("oai:new:1", "harbor survey revised", "Survey Office", 2001.0),
                record("oai:new:2", "harbor survey annex", "Survey Office", 2002.0),
            ],
        )
        .unwrap();

    let services = &fixture.services;
    let plan = QueryPlan::new().all_of("title", "survey");
    let selector = FieldSelector::identifier_only();

    let first = services.search.page("main", &plan, &selector, 0, Some(10)).unwrap();
    assert_eq!(first.total, 25);
    assert_eq!(first.items.len(), 10);

    let cursor = services.search.search("main", &plan, selector.clone()).unwrap();
    assert!(cursor.get(10).is_ok());

    services
        .admin
        .trigger_reindex("main", &locations(&["main_v2"]))
        .unwrap();

    // The cursor still holds the old index open but never reads it again
    assert!(matches!(cursor.get(10), Err(IndexError::StaleSession(_))));
    assert_eq!(fixture.store.live_count("main_v1"), 1);

    // A page request transparently runs against the new mapping
    let second = services.search.page("main", &plan, &selector, 0, Some(10)).unwrap();
    assert_eq!(second.total, 2);
    assert!(second
        .items
        .iter()
        .all(|item| item.identifier.starts_with("oai:new:")));

    // Releasing the last reader closes the old index exactly once
    drop(cursor);
    assert_eq!(fixture.store.live_count("main_v1"), 0);
    assert_eq!(fixture.store.close_count("main_v1"), 1);
}

#[test]
fn test_page_past_end_is_out_of_range() {
    let fixture = fixture_with_main(5);
    let plan = QueryPlan::new().all_of("title", "survey");
    let selector = FieldSelector::identifier_only();
    let search = &fixture.services.search;

    assert!(search.page("main", &plan, &selector, 5, None).unwrap().items.is_empty());
    let err = search.page("main", &plan, &selector, 6, None).unwrap_err();
    assert!(matches!(err, IndexError::OutOfRange { index: 6, size: 5 }));
}
