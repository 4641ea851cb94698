// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Directory watching built on notify, with a polling fallback for
//! hosts where native events are unreliable (network mounts, WSL).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use tether_core::{Error, Result};

/// Watch configuration shared by mirrors and distributors.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Poll the filesystem instead of relying on native events.
    pub use_polling: bool,
    /// Scan interval when `use_polling` is set.
    pub poll_interval: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            use_polling: false,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Live watcher handle; dropping it stops event delivery.
pub(crate) enum DirWatcher {
    Native(RecommendedWatcher),
    Polling(PollWatcher),
}

impl DirWatcher {
    fn watch(&mut self, path: &Path) -> Result<()> {
        let outcome = match self {
            DirWatcher::Native(watcher) => watcher.watch(path, RecursiveMode::Recursive),
            DirWatcher::Polling(watcher) => watcher.watch(path, RecursiveMode::Recursive),
        };
        outcome.map_err(|e| Error::Watch(e.to_string()))
    }
}

/// Starts watching `path` recursively.
///
/// Paths from create/modify/remove events are delivered on the returned
/// channel. While `suppress` is set, events are discarded at arrival,
/// so writes performed by a reconciliation pass never come back around
/// disguised as local edits.
pub(crate) fn watch_dir(
    path: &Path,
    options: &WatchOptions,
    suppress: Option<Arc<AtomicBool>>,
) -> Result<(DirWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let handler = move |outcome: notify::Result<Event>| {
        let event = match outcome {
            Ok(event) => event,
            Err(e) => {
                warn!("watch error: {}", e);
                return;
            }
        };
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }
        if let Some(flag) = &suppress {
            if flag.load(Ordering::SeqCst) {
                return;
            }
        }
        for path in event.paths {
            let _ = tx.send(path);
        }
    };

    let mut watcher = if options.use_polling {
        let config = notify::Config::default().with_poll_interval(options.poll_interval);
        DirWatcher::Polling(
            PollWatcher::new(handler, config).map_err(|e| Error::Watch(e.to_string()))?,
        )
    } else {
        DirWatcher::Native(
            RecommendedWatcher::new(handler, notify::Config::default())
                .map_err(|e| Error::Watch(e.to_string()))?,
        )
    };

    watcher.watch(path)?;
    Ok((watcher, rx))
}
