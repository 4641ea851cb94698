// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use std::path::Path;

#[test]
fn display_uses_canonical_form() {
    let identity = RemoteIdentity::new("home", "scripts/hack.js");
    assert_eq!(identity.to_string(), "home://scripts/hack.js");
}

#[test]
fn parses_canonical_form() {
    let identity: RemoteIdentity = "alpha://a.js".parse().unwrap();
    assert_eq!(identity.server, "alpha");
    assert_eq!(identity.path, "a.js");
}

#[test]
fn parses_nested_remote_path() {
    let identity: RemoteIdentity = "n00dles://lib/util.js".parse().unwrap();
    assert_eq!(identity.server, "n00dles");
    assert_eq!(identity.path, "lib/util.js");
}

#[test]
fn rejects_missing_separator() {
    assert!("just-a-path".parse::<RemoteIdentity>().is_err());
}

#[test]
fn rejects_empty_server_or_path() {
    assert!("://a.js".parse::<RemoteIdentity>().is_err());
    assert!("home://".parse::<RemoteIdentity>().is_err());
}

#[test]
fn round_trips_through_string() {
    let identity = RemoteIdentity::new("alpha", "deep/nested/file.txt");
    let parsed: RemoteIdentity = identity.to_string().parse().unwrap();
    assert_eq!(parsed, identity);
}

#[test]
fn from_local_path_splits_server_segment() {
    let root = Path::new("/mirror");
    let identity =
        RemoteIdentity::from_local_path(root, Path::new("/mirror/home/sub/a.js")).unwrap();
    assert_eq!(identity, RemoteIdentity::new("home", "sub/a.js"));
}

#[test]
fn from_local_path_handles_single_segment_remote_path() {
    let root = Path::new("/mirror");
    let identity = RemoteIdentity::from_local_path(root, Path::new("/mirror/alpha/a.js")).unwrap();
    assert_eq!(identity, RemoteIdentity::new("alpha", "a.js"));
}

#[test]
fn from_local_path_rejects_entries_directly_in_root() {
    let root = Path::new("/mirror");
    // A file in the root has no server segment to recover.
    assert!(RemoteIdentity::from_local_path(root, Path::new("/mirror/a.js")).is_none());
}

#[test]
fn from_local_path_rejects_root_itself() {
    let root = Path::new("/mirror");
    assert!(RemoteIdentity::from_local_path(root, root).is_none());
}

#[test]
fn from_local_path_rejects_paths_outside_root() {
    let root = Path::new("/mirror");
    assert!(RemoteIdentity::from_local_path(root, Path::new("/elsewhere/home/a.js")).is_none());
}

#[test]
fn local_path_mirrors_server_layout() {
    let root = Path::new("/mirror");
    let identity = RemoteIdentity::new("home", "sub/a.js");
    assert_eq!(
        identity.local_path(root),
        Path::new("/mirror/home/sub/a.js")
    );
}

#[test]
fn local_path_round_trips_with_from_local_path() {
    let root = Path::new("/mirror");
    let identity = RemoteIdentity::new("alpha", "lib/util.js");
    let recovered = RemoteIdentity::from_local_path(root, &identity.local_path(root)).unwrap();
    assert_eq!(recovered, identity);
}
