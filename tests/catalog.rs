//! Catalog and Query Integration Tests
//!
//! Store bookkeeping, snapshot isolation, and search/sort behavior.

use std::sync::Arc;

use bytes::Bytes;
use ipcs::core::ManualClock;
use ipcs::library::NewContent;
use ipcs::{query, CatalogError, CatalogStore, ContentKind, NewEntry, Query, SortDirection, SortKey};

fn store_with_clock() -> (CatalogStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    (CatalogStore::with_clock(Box::new(clock.clone())), clock)
}

fn image(title: &str, name: &str, len: usize) -> NewEntry {
    NewEntry::upload(
        title,
        name,
        NewContent::Image {
            data: Bytes::from(vec![7u8; len]),
            media_type: mime::IMAGE_PNG,
        },
    )
}

fn titles(entries: &[&ipcs::ContentEntry]) -> Vec<String> {
    entries.iter().map(|e| e.title().to_string()).collect()
}

#[test]
fn test_sort_by_date_and_title() {
    let (mut store, clock) = store_with_clock();
    store.insert(NewEntry::text("A", "first")).unwrap();
    clock.advance(1_000);
    store.insert(NewEntry::text("B", "second")).unwrap();

    let snapshot = store.snapshot();

    let by_date = Query::new().sort(SortKey::CreatedAt, SortDirection::Descending);
    assert_eq!(titles(&query(&snapshot, &by_date)), vec!["B", "A"]);

    let by_title = Query::new().sort(SortKey::Title, SortDirection::Ascending);
    assert_eq!(titles(&query(&snapshot, &by_title)), vec!["A", "B"]);
}

#[test]
fn test_timestamps_strictly_increase_on_a_frozen_clock() {
    let (mut store, _clock) = store_with_clock();
    let first = store.insert(NewEntry::text("One", "1")).unwrap();
    let second = store.insert(NewEntry::text("Two", "2")).unwrap();

    let a = store.get(first).unwrap().created_at_millis();
    let b = store.get(second).unwrap().created_at_millis();
    assert!(b > a);
    assert!(second > first);
}

#[test]
fn test_search_matches_title_or_name_case_insensitively() {
    let (mut store, _clock) = store_with_clock();
    store.insert(NewEntry::text("Q3 Report", "numbers")).unwrap();
    store.insert(image("Holiday", "REPORT_cover.png", 10)).unwrap();
    store.insert(image("Cat", "cat.png", 10)).unwrap();

    let snapshot = store.snapshot();
    let found = query(&snapshot, &Query::new().search("report"));
    assert_eq!(titles(&found), vec!["Q3 Report", "Holiday"]);

    let none = query(&snapshot, &Query::new().search("dog"));
    assert!(none.is_empty());

    let all = query(&snapshot, &Query::new());
    assert_eq!(all.len(), 3);
}

#[test]
fn test_kind_filter() {
    let (mut store, _clock) = store_with_clock();
    store.insert(NewEntry::text("Notes", "n")).unwrap();
    store.insert(image("Photo", "p.png", 4)).unwrap();

    let snapshot = store.snapshot();
    let images = query(&snapshot, &Query::new().kind(ContentKind::Image));
    assert_eq!(titles(&images), vec!["Photo"]);
}

#[test]
fn test_equal_keys_keep_snapshot_order() {
    let (mut store, _clock) = store_with_clock();
    store.insert(image("First", "1.png", 100)).unwrap();
    store.insert(image("Second", "2.png", 100)).unwrap();
    store.insert(image("Small", "3.png", 1)).unwrap();

    let snapshot = store.snapshot();
    let asc = Query::new().sort(SortKey::Size, SortDirection::Ascending);
    assert_eq!(titles(&query(&snapshot, &asc)), vec!["Small", "First", "Second"]);

    let desc = Query::new().sort(SortKey::Size, SortDirection::Descending);
    assert_eq!(titles(&query(&snapshot, &desc)), vec!["First", "Second", "Small"]);
}

#[test]
fn test_query_is_pure() {
    let (mut store, _clock) = store_with_clock();
    store.insert(NewEntry::text("beta", "b")).unwrap();
    store.insert(NewEntry::text("Alpha", "a")).unwrap();

    let snapshot = store.snapshot();
    let params = Query::new().sort(SortKey::Title, SortDirection::Ascending);

    let first = titles(&query(&snapshot, &params));
    let second = titles(&query(&snapshot, &params));
    assert_eq!(first, second);
    assert_eq!(first, vec!["Alpha", "beta"]);

    let original: Vec<String> = snapshot.iter().map(|e| e.title().to_string()).collect();
    assert_eq!(original, vec!["beta", "Alpha"]);
}

#[test]
fn test_snapshot_survives_removal() {
    let (mut store, _clock) = store_with_clock();
    let id = store.insert(image("Kept", "k.png", 8)).unwrap();

    let before = store.snapshot();
    let removed = store.remove(id).unwrap();
    assert_eq!(removed.title(), "Kept");

    assert_eq!(before.len(), 1);
    assert!(store.snapshot().is_empty());
    assert!(matches!(store.get(id), Err(CatalogError::NotFound(_))));
}

#[test]
fn test_ids_are_not_reused() {
    let (mut store, _clock) = store_with_clock();
    let first = store.insert(NewEntry::text("One", "1")).unwrap();
    store.remove(first).unwrap();
    let second = store.insert(NewEntry::text("Two", "2")).unwrap();

    assert_ne!(first, second);
}

#[test]
fn test_clear_releases_every_handle() {
    let (mut store, _clock) = store_with_clock();
    store.insert(image("A", "a.png", 3)).unwrap();
    store.insert(image("B", "b.png", 3)).unwrap();
    store.insert(NewEntry::text("T", "t")).unwrap();
    assert_eq!(store.resource_stats().live, 2);

    assert_eq!(store.clear(), 3);
    assert!(store.is_empty());
    assert_eq!(store.resource_stats().live, 0);
}
