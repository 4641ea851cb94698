// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;

fn identity(server: &str, path: &str) -> RemoteIdentity {
    RemoteIdentity::new(server, path)
}

fn snapshot(entries: &[(&str, &str, &str)]) -> HashMap<RemoteIdentity, String> {
    entries
        .iter()
        .map(|(server, path, content)| (identity(server, path), content.to_string()))
        .collect()
}

#[test]
fn identical_snapshot_yields_empty_diff() {
    let mut cache = FileCache::default();
    cache.insert(identity("home", "a.js"), "1".to_string());

    let diff = cache.diff(&snapshot(&[("home", "a.js", "1")]));
    assert!(diff.is_empty());
}

#[test]
fn new_remote_file_appears_in_modified() {
    let cache = FileCache::default();

    let diff = cache.diff(&snapshot(&[("home", "a.js", "1")]));
    assert_eq!(diff.modified.get(&identity("home", "a.js")), Some(&"1".to_string()));
    assert!(diff.removed.is_empty());
}

#[test]
fn changed_content_appears_in_modified() {
    let mut cache = FileCache::default();
    cache.insert(identity("home", "a.js"), "1".to_string());

    let diff = cache.diff(&snapshot(&[("home", "a.js", "2")]));
    assert_eq!(diff.modified.get(&identity("home", "a.js")), Some(&"2".to_string()));
    assert!(diff.removed.is_empty());
}

#[test]
fn missing_entry_appears_in_removed() {
    let mut cache = FileCache::default();
    cache.insert(identity("home", "a.js"), "1".to_string());
    cache.insert(identity("home", "b.js"), "2".to_string());

    let diff = cache.diff(&snapshot(&[("home", "a.js", "1")]));
    assert!(diff.modified.is_empty());
    assert_eq!(diff.removed.get(&identity("home", "b.js")), Some(&"2".to_string()));
}

#[test]
fn same_path_on_different_servers_is_distinct() {
    let mut cache = FileCache::default();
    cache.insert(identity("alpha", "a.js"), "1".to_string());

    let diff = cache.diff(&snapshot(&[("beta", "a.js", "1")]));
    assert_eq!(diff.modified.len(), 1);
    assert_eq!(diff.removed.len(), 1);
    assert!(diff.modified.contains_key(&identity("beta", "a.js")));
    assert!(diff.removed.contains_key(&identity("alpha", "a.js")));
}

#[test]
fn replace_swaps_cache_wholesale() {
    let mut cache = FileCache::default();
    cache.insert(identity("home", "a.js"), "1".to_string());
    cache.insert(identity("home", "b.js"), "2".to_string());

    cache.replace(snapshot(&[("home", "c.js", "3")]));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&identity("home", "c.js")), Some("3"));
    assert_eq!(cache.get(&identity("home", "a.js")), None);
}

#[test]
fn remove_drops_single_entry() {
    let mut cache = FileCache::default();
    cache.insert(identity("home", "a.js"), "1".to_string());
    cache.insert(identity("home", "b.js"), "2".to_string());

    cache.remove(&identity("home", "a.js"));

    assert_eq!(cache.len(), 1);
    assert!(cache.get(&identity("home", "a.js")).is_none());
    assert!(!cache.is_empty());
}
