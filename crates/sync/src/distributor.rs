// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-way broadcast of local files to a server set.
//!
//! The distributor watches a directory and pushes every added or
//! changed file to all its servers, under the file's path relative to
//! the watched root. No cache, no reconciliation, and deletions are
//! ignored: removing a local file leaves the remote copies in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use tether_core::{Error, Result};
use tether_rpc::RpcClient;

use crate::selector::ServerSelector;
use crate::watcher::{watch_dir, DirWatcher, WatchOptions};

/// A live one-way binding from a local directory to a server set.
pub struct Distributor {
    inner: Arc<DistributorInner>,
    _watcher: DirWatcher,
    task: JoinHandle<()>,
}

struct DistributorInner {
    rpc: RpcClient,
    root: PathBuf,
    servers: Vec<String>,
}

impl Distributor {
    /// Builds a distributor and starts watching immediately.
    ///
    /// Fails with `PreconditionFailed` when no connection has been
    /// accepted yet. The selector is resolved here, once.
    pub async fn create(
        rpc: RpcClient,
        root: impl Into<PathBuf>,
        selector: ServerSelector,
        options: WatchOptions,
    ) -> Result<Distributor> {
        if !rpc.is_connected() {
            return Err(Error::PreconditionFailed(
                "distributor requires an accepted connection".to_string(),
            ));
        }

        let servers = selector.resolve(&rpc).await?;
        let root = root.into();
        info!("distributing {} to [{}]", root.display(), servers.join(", "));

        let (watcher, mut events) = watch_dir(&root, &options, None)?;
        let inner = Arc::new(DistributorInner { rpc, root, servers });

        let task = {
            let inner = inner.clone();
            tokio::spawn(async move {
                while let Some(path) = events.recv().await {
                    if let Err(e) = inner.distribute_file(&path).await {
                        warn!("failed to distribute {}: {}", path.display(), e);
                    }
                }
            })
        };

        Ok(Distributor {
            inner,
            _watcher: watcher,
            task,
        })
    }

    /// The resolved server list this distributor pushes to.
    pub fn servers(&self) -> &[String] {
        &self.inner.servers
    }

    /// Stops watching and pushing. In-flight pushes are not cancelled.
    pub fn dispose(&self) {
        self.task.abort();
    }
}

impl Drop for Distributor {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl DistributorInner {
    /// Pushes one file to every server, in parallel.
    async fn distribute_file(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Ok(());
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return Ok(());
        };
        let filename = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");
        if filename.is_empty() {
            return Ok(());
        }

        let content = tokio::fs::read_to_string(path).await?;
        info!("distributing {} to [{}]", filename, self.servers.join(", "));

        let pushes = self
            .servers
            .iter()
            .map(|server| self.rpc.push_file(server, &filename, &content));
        for (server, outcome) in self.servers.iter().zip(join_all(pushes).await) {
            if let Err(e) = outcome {
                warn!("failed to push {} to {}: {}", filename, server, e);
            }
        }

        Ok(())
    }
}
