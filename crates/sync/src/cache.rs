// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The per-mirror content cache and snapshot diffing.
//!
//! The cache holds "what we last observed remotely": content keyed by
//! remote identity. Reconciliation diffs a fresh remote snapshot
//! against it, then replaces it wholesale.

use std::collections::HashMap;

use tether_core::RemoteIdentity;

/// Last-known remote content, keyed by namespaced identity.
///
/// Mutated only by the engine that owns it, never by callers.
#[derive(Debug, Default)]
pub struct FileCache {
    files: HashMap<RemoteIdentity, String>,
}

/// Outcome of comparing a fresh remote snapshot against the cache.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Diff {
    /// Present in the snapshot with content differing from the cache,
    /// including identities the cache has never seen.
    pub modified: HashMap<RemoteIdentity, String>,
    /// Present in the cache but absent from the snapshot.
    pub removed: HashMap<RemoteIdentity, String>,
}

impl Diff {
    /// True when the snapshot matched the cache exactly.
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.removed.is_empty()
    }
}

impl FileCache {
    /// Records one observed remote content.
    pub fn insert(&mut self, identity: RemoteIdentity, content: String) {
        self.files.insert(identity, content);
    }

    /// Drops one entry, if present.
    pub fn remove(&mut self, identity: &RemoteIdentity) {
        self.files.remove(identity);
    }

    /// Returns the last-observed content for an identity.
    pub fn get(&self, identity: &RemoteIdentity) -> Option<&str> {
        self.files.get(identity).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over all cached entries.
    pub fn iter(&self) -> impl Iterator<Item = (&RemoteIdentity, &str)> {
        self.files.iter().map(|(identity, content)| (identity, content.as_str()))
    }

    /// Compares a fresh remote snapshot against the cache.
    pub fn diff(&self, snapshot: &HashMap<RemoteIdentity, String>) -> Diff {
        let mut diff = Diff::default();

        for (identity, content) in snapshot {
            if self.files.get(identity) != Some(content) {
                diff.modified.insert(identity.clone(), content.clone());
            }
        }

        for (identity, content) in &self.files {
            if !snapshot.contains_key(identity) {
                diff.removed.insert(identity.clone(), content.clone());
            }
        }

        diff
    }

    /// Replaces the whole cache with a fresh snapshot.
    pub fn replace(&mut self, snapshot: HashMap<RemoteIdentity, String>) {
        self.files = snapshot;
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
