// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bidirectional mirror between a local directory and a server set.
//!
//! Remote-to-local: a 500 ms poll fetches every bound server's files,
//! diffs them against the cache, and applies the result to disk.
//! Local-to-remote: a filesystem watcher pushes user edits back out.
//! The two directions are kept from chasing each other by a busy flag:
//! reconciliation passes never overlap, and watcher events raised while
//! a pass is writing are discarded at arrival.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use tether_core::{Error, RemoteIdentity, Result};
use tether_rpc::RpcClient;

use crate::cache::FileCache;
use crate::selector::ServerSelector;
use crate::watcher::{watch_dir, DirWatcher, WatchOptions};

/// Interval between reconciliation passes.
const RECONCILE_INTERVAL: Duration = Duration::from_millis(500);

/// A live mirror binding one local directory to a set of servers.
///
/// Lifecycle: [`Mirror::create`] → [`init_cache`](Mirror::init_cache) →
/// one eager [`reconcile`](Mirror::reconcile) (or straight to
/// [`watch`](Mirror::watch), whose poll loop runs one immediately) →
/// [`dispose`](Mirror::dispose).
pub struct Mirror {
    inner: Arc<MirrorInner>,
    watcher: Option<DirWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

struct MirrorInner {
    rpc: RpcClient,
    root: PathBuf,
    servers: Vec<String>,
    options: WatchOptions,
    cache: Mutex<FileCache>,
    /// Busy flag: set while a reconciliation pass runs. Watch events
    /// arriving while it is set are the engine's own writes.
    syncing: Arc<AtomicBool>,
}

impl Mirror {
    /// Builds a mirror binding `root` to the selector's servers.
    ///
    /// Fails with `PreconditionFailed` when no connection has been
    /// accepted yet. The selector is resolved here, once.
    pub async fn create(
        rpc: RpcClient,
        root: impl Into<PathBuf>,
        selector: ServerSelector,
        options: WatchOptions,
    ) -> Result<Mirror> {
        if !rpc.is_connected() {
            return Err(Error::PreconditionFailed(
                "mirror requires an accepted connection".to_string(),
            ));
        }

        let servers = selector.resolve(&rpc).await?;
        let root = root.into();
        info!("creating mirror [{}] => {}", servers.join(", "), root.display());

        Ok(Mirror {
            inner: Arc::new(MirrorInner {
                rpc,
                root,
                servers,
                options,
                cache: Mutex::new(FileCache::default()),
                syncing: Arc::new(AtomicBool::new(false)),
            }),
            watcher: None,
            tasks: Vec::new(),
        })
    }

    /// The resolved server list this mirror is bound to.
    pub fn servers(&self) -> &[String] {
        &self.inner.servers
    }

    /// The local directory this mirror is bound to.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Seeds the cache from the files already on disk under the root.
    ///
    /// Assumes the local layout mirrors `server/path` exactly: the
    /// first segment below the root names the server. Entries directly
    /// in the root are skipped.
    pub async fn init_cache(&self) -> Result<()> {
        self.inner.init_cache().await
    }

    /// Runs one fetch-diff-apply pass bringing local state in line with
    /// remote state. A pass already in progress makes this a no-op.
    pub async fn reconcile(&self) -> Result<()> {
        self.inner.reconcile().await
    }

    /// Pushes every cached file to its server, seeding the remote from
    /// local state instead of pulling. The usual alternative to the
    /// first reconciliation when the local tree is the source of truth.
    pub async fn push_all(&self) -> Result<()> {
        self.inner.push_all().await
    }

    /// Starts the remote poll loop and the local-change watcher.
    ///
    /// Idempotent: calling it again while watching does nothing.
    pub fn watch(&mut self) -> Result<()> {
        if !self.tasks.is_empty() {
            return Ok(());
        }

        let inner = self.inner.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(RECONCILE_INTERVAL);
            loop {
                ticks.tick().await;
                if let Err(e) = inner.reconcile().await {
                    warn!("reconciliation failed: {}", e);
                }
            }
        }));

        let (watcher, mut events) = watch_dir(
            &self.inner.root,
            &self.inner.options,
            Some(self.inner.syncing.clone()),
        )?;
        self.watcher = Some(watcher);

        let inner = self.inner.clone();
        self.tasks.push(tokio::spawn(async move {
            while let Some(path) = events.recv().await {
                if let Err(e) = inner.handle_local_event(&path).await {
                    warn!("failed to sync local change {}: {}", path.display(), e);
                }
            }
        }));

        Ok(())
    }

    /// Stops the poll loop, the watcher, and the event handler.
    /// In-flight remote calls are not cancelled.
    pub fn dispose(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.watcher = None;
    }
}

impl Drop for Mirror {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl MirrorInner {
    async fn init_cache(&self) -> Result<()> {
        info!("initialising file cache for [{}]", self.servers.join(", "));

        let mut cache = self.cache.lock().await;
        for entry in walkdir::WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(identity) = RemoteIdentity::from_local_path(&self.root, entry.path()) else {
                continue;
            };
            // Non-text files (and files racing a deletion) are skipped,
            // not fatal to the whole mirror.
            let content = match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("skipping unreadable file {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            cache.insert(identity, content);
        }
        Ok(())
    }

    /// Pushes the whole cache out to the servers, in parallel.
    /// Individual failures are logged and do not abort the rest.
    async fn push_all(&self) -> Result<()> {
        let entries: Vec<(RemoteIdentity, String)> = {
            let cache = self.cache.lock().await;
            cache
                .iter()
                .map(|(identity, content)| (identity.clone(), content.to_string()))
                .collect()
        };
        info!(
            "pushing {} files to [{}]",
            entries.len(),
            self.servers.join(", ")
        );

        let pushes = entries.iter().map(|(identity, content)| async move {
            self.rpc
                .push_file(&identity.server, &identity.path, content)
                .await
                .map_err(|e| (identity, e))
        });
        for outcome in join_all(pushes).await {
            if let Err((identity, e)) = outcome {
                warn!("failed to push {}: {}", identity, e);
            }
        }

        Ok(())
    }

    /// Fetches the current content of every bound server.
    ///
    /// A server whose listing fails is skipped for this pass and
    /// retried on the next tick; the rest of the pass proceeds.
    async fn fetch_remote_listings(&self) -> Vec<(&str, Option<Vec<tether_core::FileEntry>>)> {
        let mut listings = Vec::with_capacity(self.servers.len());

        for server in &self.servers {
            let files = match self.rpc.get_all_files(server).await {
                Ok(files) => Some(files),
                Err(e) => {
                    let partial = Error::PartialFetch {
                        server: server.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", partial);
                    None
                }
            };
            listings.push((server.as_str(), files));
        }

        listings
    }

    async fn reconcile(&self) -> Result<()> {
        if self.syncing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Released on every exit path, including errors, so a failed
        // pass cannot deadlock future ticks.
        let _guard = SyncingGuard(&self.syncing);

        let span = info_span!("reconcile", root = %self.root.display());
        async {
            let listings = self.fetch_remote_listings().await;

            let diff = {
                let mut cache = self.cache.lock().await;
                let mut snapshot = HashMap::new();
                for (server, files) in listings {
                    match files {
                        Some(files) => {
                            for entry in files {
                                snapshot.insert(
                                    RemoteIdentity::new(server, entry.filename),
                                    entry.content,
                                );
                            }
                        }
                        // A failed listing carries last-observed state
                        // forward, so a transient fault is not mistaken
                        // for mass deletion.
                        None => {
                            for (identity, content) in
                                cache.iter().filter(|(i, _)| i.server == server)
                            {
                                snapshot.insert(identity.clone(), content.to_string());
                            }
                        }
                    }
                }
                let diff = cache.diff(&snapshot);
                cache.replace(snapshot);
                diff
            };

            if !diff.is_empty() {
                let mut servers: Vec<&str> = diff
                    .modified
                    .keys()
                    .chain(diff.removed.keys())
                    .map(|identity| identity.server.as_str())
                    .collect();
                servers.sort_unstable();
                servers.dedup();
                info!("remote change detected, syncing files with [{}]", servers.join(", "));
            }

            for (identity, content) in &diff.modified {
                if let Err(e) = self.write_local(identity, content).await {
                    warn!("failed to write {}: {}", identity, e);
                }
            }
            for identity in diff.removed.keys() {
                if let Err(e) = self.remove_local(identity).await {
                    warn!("failed to delete {}: {}", identity, e);
                }
            }

            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn write_local(&self, identity: &RemoteIdentity, content: &str) -> Result<()> {
        let path = identity.local_path(&self.root);
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&path, content).await?;
        info!("wrote file {} to {}", identity, path.display());
        Ok(())
    }

    async fn remove_local(&self, identity: &RemoteIdentity) -> Result<()> {
        let path = identity.local_path(&self.root);
        if !path.exists() {
            return Ok(());
        }
        tokio::fs::remove_file(&path).await?;
        if let Some(parent) = path.parent() {
            remove_dir_if_empty(parent, &self.root).await?;
        }
        info!("deleted file {}", identity);
        Ok(())
    }

    /// Handles one raw filesystem event under the mirror root.
    async fn handle_local_event(&self, path: &Path) -> Result<()> {
        let exists = path.exists();
        if exists && !path.is_file() {
            return Ok(());
        }
        let Some(identity) = RemoteIdentity::from_local_path(&self.root, path) else {
            return Ok(());
        };

        let span = info_span!("local_change", file = %identity);
        async {
            let remote = self.rpc.get_file(&identity.server, &identity.path).await.ok();

            if !exists && remote.is_none() {
                // Already absent on both sides.
                return Ok(());
            }

            if exists {
                let content = tokio::fs::read_to_string(path).await?;
                if remote.as_deref() == Some(content.as_str()) {
                    // A touch without a content change; nothing to push.
                    return Ok(());
                }

                info!("local change detected, syncing files with [{}]", identity.server);
                self.rpc
                    .push_file(&identity.server, &identity.path, &content)
                    .await?;
                self.cache.lock().await.insert(identity.clone(), content);
                info!("wrote file {} to {}", path.display(), identity);
            } else {
                info!("local change detected, syncing files with [{}]", identity.server);
                self.rpc.delete_file(&identity.server, &identity.path).await?;
                self.cache.lock().await.remove(&identity);
                if let Some(parent) = path.parent() {
                    remove_dir_if_empty(parent, &self.root).await?;
                }
                info!("deleted file {}", identity);
            }

            Ok(())
        }
        .instrument(span)
        .await
    }
}

struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Removes `dir` once it no longer contains any entries.
///
/// The mirror root itself is never removed, even when the last
/// server-prefix directory under it empties out.
pub(crate) async fn remove_dir_if_empty(dir: &Path, root: &Path) -> Result<()> {
    if dir == root || !dir.starts_with(root) || !dir.exists() {
        return Ok(());
    }
    let mut entries = tokio::fs::read_dir(dir).await?;
    if entries.next_entry().await?.is_none() {
        tokio::fs::remove_dir(dir).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod tests;
