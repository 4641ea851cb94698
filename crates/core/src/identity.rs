// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical `server://path` identities for remotely stored files.
//!
//! A remote identity names one file across the whole system: the server
//! holding it and its path relative to that server's root. The local
//! mirror layout encodes the same information as `<root>/server/path`,
//! so identities can be recovered from local paths and vice versa.

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifies one file across the local tree and all remote servers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// Name of the server holding the file. Opaque string.
    pub server: String,
    /// Path relative to the server root. Forward slashes regardless of
    /// host OS.
    pub path: String,
}

impl RemoteIdentity {
    /// Creates an identity from a server name and remote path.
    pub fn new(server: impl Into<String>, path: impl Into<String>) -> Self {
        RemoteIdentity {
            server: server.into(),
            path: path.into(),
        }
    }

    /// Recovers an identity from a path under a mirror root.
    ///
    /// The first path segment below the root is the server name, the
    /// rest is the remote path: `<root>/home/sub/a.js` becomes
    /// `home://sub/a.js`. Returns `None` for the root itself, for paths
    /// outside the root, and for entries directly in the root (which
    /// have no server segment).
    pub fn from_local_path(root: &Path, path: &Path) -> Option<Self> {
        let rel = path.strip_prefix(root).ok()?;
        let mut segments = rel.components().filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        });

        let server = segments.next()?.to_string();
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            return None;
        }

        Some(RemoteIdentity {
            server,
            path: rest.join("/"),
        })
    }

    /// Returns the location this identity maps to under a mirror root.
    pub fn local_path(&self, root: &Path) -> PathBuf {
        let mut out = root.join(&self.server);
        for segment in self.path.split('/') {
            out.push(segment);
        }
        out
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.server, self.path)
    }
}

impl FromStr for RemoteIdentity {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        let (server, path) = s
            .split_once("://")
            .ok_or_else(|| Error::InvalidIdentity(s.to_string()))?;
        if server.is_empty() || path.is_empty() {
            return Err(Error::InvalidIdentity(s.to_string()));
        }
        Ok(RemoteIdentity::new(server, path))
    }
}
