//! Search and sort over a catalog snapshot.
//!
//! Queries are pure: the same snapshot and parameters always produce the
//! same order, and the snapshot is never modified. Sorting is stable, so
//! entries that compare equal keep their snapshot order in both directions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::catalog::Snapshot;
use crate::domain::{ContentEntry, ContentKind};

/// Key to order entries by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Commit time
    #[default]
    CreatedAt,

    /// Title, case-insensitive
    Title,

    /// Size in bytes
    Size,

    /// Canonical kind name
    Kind,
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "created_at" | "created-at" | "date" => Ok(SortKey::CreatedAt),
            "title" => Ok(SortKey::Title),
            "size" | "size_bytes" => Ok(SortKey::Size),
            "kind" | "type" => Ok(SortKey::Kind),
            _ => anyhow::bail!("Unknown sort key: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl std::str::FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => anyhow::bail!("Unknown sort direction: {}", s),
        }
    }
}

/// Query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Case-insensitive substring matched against title and original name
    #[serde(default)]
    pub search: String,

    /// Only keep entries of this kind
    #[serde(default)]
    pub kind: Option<ContentKind>,

    #[serde(default)]
    pub sort_key: SortKey,

    #[serde(default)]
    pub direction: SortDirection,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn sort(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.direction = direction;
        self
    }

    /// Run this query against a snapshot
    pub fn run<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a ContentEntry> {
        query(snapshot, self)
    }
}

/// Filter and order a snapshot
pub fn query<'a>(snapshot: &'a Snapshot, params: &Query) -> Vec<&'a ContentEntry> {
    let needle = params.search.to_lowercase();

    let mut results: Vec<&ContentEntry> = snapshot
        .iter()
        .filter(|entry| params.kind.map_or(true, |kind| entry.kind() == kind))
        .filter(|entry| {
            needle.is_empty()
                || entry.title().to_lowercase().contains(&needle)
                || entry.original_name().to_lowercase().contains(&needle)
        })
        .collect();

    // Vec::sort_by is stable; direction flips the comparison, not the list
    results.sort_by(|a, b| {
        let ordering = compare(params.sort_key, a, b);
        match params.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });

    results
}

fn compare(key: SortKey, a: &ContentEntry, b: &ContentEntry) -> Ordering {
    match key {
        SortKey::CreatedAt => a.created_at_millis().cmp(&b.created_at_millis()),
        SortKey::Title => compare_titles(a.title(), b.title()),
        SortKey::Size => a.size_bytes().cmp(&b.size_bytes()),
        SortKey::Kind => a.kind().name().cmp(b.kind().name()),
    }
}

/// Case-insensitive first, raw string as the tie-breaker
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::core::clock::ManualClock;
    use crate::library::catalog::{CatalogStore, NewContent, NewEntry};

    fn store_with(entries: Vec<NewEntry>) -> CatalogStore {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut store = CatalogStore::with_clock(Box::new(clock.clone()));
        for entry in entries {
            store.insert(entry).unwrap();
            clock.advance(10);
        }
        store
    }

    fn generic(title: &str, name: &str, len: usize) -> NewEntry {
        NewEntry::upload(
            title,
            name,
            NewContent::Generic {
                data: Bytes::from(vec![0u8; len]),
                media_type: None,
            },
        )
    }

    fn titles(results: &[&ContentEntry]) -> Vec<String> {
        results.iter().map(|e| e.title().to_string()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let store = store_with(vec![
            NewEntry::text("Q3 Report", "numbers"),
            NewEntry::text("Holiday", "beach"),
        ]);
        let snapshot = store.snapshot();

        let results = Query::new().search("REPORT").run(&snapshot);
        assert_eq!(titles(&results), vec!["Q3 Report"]);

        let results = Query::new().search("rep").run(&snapshot);
        assert_eq!(titles(&results), vec!["Q3 Report"]);
    }

    #[test]
    fn test_search_matches_original_name() {
        let store = store_with(vec![generic("Scan", "invoice-2024.pdf", 3)]);
        let snapshot = store.snapshot();

        assert_eq!(Query::new().search("INVOICE").run(&snapshot).len(), 1);
        assert!(Query::new().search("receipt").run(&snapshot).is_empty());
    }

    #[test]
    fn test_empty_search_keeps_all() {
        let store = store_with(vec![NewEntry::text("a", "x"), NewEntry::text("b", "y")]);
        assert_eq!(Query::new().run(&store.snapshot()).len(), 2);
    }

    #[test]
    fn test_sort_by_size_is_stable() {
        let store = store_with(vec![
            generic("first", "1.bin", 5),
            generic("big", "2.bin", 50),
            generic("second", "3.bin", 5),
        ]);
        let snapshot = store.snapshot();

        let asc = Query::new()
            .sort(SortKey::Size, SortDirection::Ascending)
            .run(&snapshot);
        assert_eq!(titles(&asc), vec!["first", "second", "big"]);

        let desc = Query::new()
            .sort(SortKey::Size, SortDirection::Descending)
            .run(&snapshot);
        assert_eq!(titles(&desc), vec!["big", "first", "second"]);
    }

    #[test]
    fn test_sort_by_kind_name() {
        let store = store_with(vec![
            NewEntry::text("note", "x"),
            generic("blob", "b.bin", 1),
        ]);
        let snapshot = store.snapshot();
        let results = Query::new()
            .sort(SortKey::Kind, SortDirection::Ascending)
            .run(&snapshot);

        // "file" < "text"
        assert_eq!(titles(&results), vec!["blob", "note"]);
    }

    #[test]
    fn test_sort_title_ignores_case() {
        let store = store_with(vec![
            NewEntry::text("banana", "x"),
            NewEntry::text("Apple", "x"),
            NewEntry::text("cherry", "x"),
        ]);
        let snapshot = store.snapshot();
        let results = Query::new()
            .sort(SortKey::Title, SortDirection::Ascending)
            .run(&snapshot);

        assert_eq!(titles(&results), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn test_kind_filter() {
        let store = store_with(vec![NewEntry::text("note", "x"), generic("blob", "b.bin", 1)]);
        let snapshot = store.snapshot();
        let results = Query::new().kind(ContentKind::Generic).run(&snapshot);
        assert_eq!(titles(&results), vec!["blob"]);
    }

    #[test]
    fn test_sort_key_from_str() {
        assert_eq!("date".parse::<SortKey>().unwrap(), SortKey::CreatedAt);
        assert_eq!("size".parse::<SortKey>().unwrap(), SortKey::Size);
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Descending);
        assert!("colour".parse::<SortKey>().is_err());
    }
}
