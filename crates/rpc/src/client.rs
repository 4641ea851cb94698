// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The RPC client: id generation, pending-request tracking, timeouts,
//! and typed wrappers for the remote file-store operations.
//!
//! Correlation is by id alone. Concurrent calls are fully independent;
//! there is no head-of-line blocking, and completion order may differ
//! from issue order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use tether_core::protocol::{FileEntry, Request, Response, ServerInfo, RESERVED_ID_MAX};
use tether_core::{Error, Result};

/// Default deadline for a response to an outbound request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type Responder = oneshot::Sender<Result<Value>>;

/// Handle to the RPC correlation layer.
///
/// Cheap to clone; all clones share the pending-request table and the
/// single connection slot.
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Next request id. Starts above the reserved range and only ever
    /// increases, so an id never reappears.
    next_id: AtomicU64,
    /// Outstanding requests keyed by id. Unbounded; each entry is
    /// independently keyed, so any number of calls may be in flight.
    pending: Mutex<HashMap<u64, Responder>>,
    /// The single connection slot.
    slot: Mutex<Slot>,
    /// Fired exactly once per accepted connection.
    connected_tx: broadcast::Sender<()>,
    timeout: Duration,
}

#[derive(Default)]
struct Slot {
    /// Set from the handshake callback, before the sender exists, so
    /// concurrent upgrade attempts cannot both win.
    claimed: bool,
    sender: Option<mpsc::UnboundedSender<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RpcClient {
    /// Creates a client with the default 10 second response deadline.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom response deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        let (connected_tx, _) = broadcast::channel(16);
        RpcClient {
            inner: Arc::new(ClientInner {
                next_id: AtomicU64::new(RESERVED_ID_MAX + 1),
                pending: Mutex::new(HashMap::new()),
                slot: Mutex::new(Slot::default()),
                connected_tx,
                timeout,
            }),
        }
    }

    /// Whether a connection is currently accepted and open.
    pub fn is_connected(&self) -> bool {
        lock(&self.inner.slot).sender.is_some()
    }

    /// Subscribes to the client-connected event.
    pub fn subscribe_connected(&self) -> broadcast::Receiver<()> {
        self.inner.connected_tx.subscribe()
    }

    /// Claims the connection slot for an incoming handshake.
    ///
    /// Returns false when a connection is already live; the caller must
    /// then reject the handshake.
    pub(crate) fn try_claim_connection(&self) -> bool {
        let mut slot = lock(&self.inner.slot);
        if slot.claimed {
            false
        } else {
            slot.claimed = true;
            true
        }
    }

    /// Installs the outbound sender for a freshly accepted connection.
    pub(crate) fn attach_connection(&self, sender: mpsc::UnboundedSender<String>) {
        lock(&self.inner.slot).sender = Some(sender);
    }

    pub(crate) fn notify_connected(&self) {
        let _ = self.inner.connected_tx.send(());
    }

    /// Releases the connection slot and fails every pending request, so
    /// callers do not sit out the full timeout on a dead connection.
    pub(crate) fn release_connection(&self) {
        {
            let mut slot = lock(&self.inner.slot);
            slot.claimed = false;
            slot.sender = None;
        }
        let responders: Vec<Responder> = lock(&self.inner.pending)
            .drain()
            .map(|(_, responder)| responder)
            .collect();
        for responder in responders {
            let _ = responder.send(Err(Error::ConnectionClosed));
        }
    }

    /// Routes one inbound message to its pending request.
    ///
    /// Messages that do not parse, or whose id has no pending entry
    /// (e.g. a late arrival after timeout), are dropped.
    pub(crate) fn route_response(&self, raw: &str) {
        let response = match Response::from_json(raw) {
            Ok(response) => response,
            Err(e) => {
                debug!("discarding unparseable inbound message: {}", e);
                return;
            }
        };

        let responder = lock(&self.inner.pending).remove(&response.id);
        let Some(responder) = responder else {
            debug!(id = response.id, "dropping response with no pending request");
            return;
        };

        let outcome = match response.error {
            Some(error) => Err(Error::Remote(error)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
        let _ = responder.send(outcome);
    }

    /// Issues one request and awaits its correlated response.
    ///
    /// Fails with `NoConnection` when no connection is accepted, with
    /// `Timeout` when no response arrives within the deadline (the
    /// pending entry is purged so a late response is dropped), and with
    /// `Remote` when the response carries an error payload.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let sender = lock(&self.inner.slot)
            .sender
            .clone()
            .ok_or(Error::NoConnection)?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let json = Request::new(id, method, params).to_json()?;

        let (tx, rx) = oneshot::channel();
        lock(&self.inner.pending).insert(id, tx);

        if sender.send(json).is_err() {
            lock(&self.inner.pending).remove(&id);
            return Err(Error::NoConnection);
        }

        match tokio::time::timeout(self.inner.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                lock(&self.inner.pending).remove(&id);
                Err(Error::Timeout(id))
            }
        }
    }

    /// Fetches the generated type-definition document.
    pub async fn get_definition_file(&self) -> Result<String> {
        let result = self.call("getDefinitionFile", None).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Pushes a file's full content to a named server.
    pub async fn push_file(&self, server: &str, filename: &str, content: &str) -> Result<()> {
        self.call(
            "pushFile",
            Some(json!({
                "filename": filename,
                "content": content,
                "server": server,
            })),
        )
        .await?;
        Ok(())
    }

    /// Fetches one file's content from a named server.
    pub async fn get_file(&self, server: &str, filename: &str) -> Result<String> {
        let result = self
            .call(
                "getFile",
                Some(json!({ "filename": filename, "server": server })),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Lists the file names on a server.
    pub async fn get_file_names(&self, server: &str) -> Result<Vec<String>> {
        let result = self
            .call("getFileNames", Some(json!({ "server": server })))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Fetches every file (name and content) on a server.
    pub async fn get_all_files(&self, server: &str) -> Result<Vec<FileEntry>> {
        let result = self
            .call("getAllFiles", Some(json!({ "server": server })))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Deletes a file on a named server.
    pub async fn delete_file(&self, server: &str, filename: &str) -> Result<()> {
        self.call(
            "deleteFile",
            Some(json!({ "filename": filename, "server": server })),
        )
        .await?;
        Ok(())
    }

    /// Computes the resource cost of a file on a server.
    pub async fn calculate_ram(&self, server: &str, filename: &str) -> Result<f64> {
        let result = self
            .call(
                "calculateRam",
                Some(json!({ "filename": filename, "server": server })),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Enumerates all known servers with their attributes.
    pub async fn get_all_servers(&self) -> Result<Vec<ServerInfo>> {
        let result = self.call("getAllServers", None).await?;
        Ok(serde_json::from_value(result)?)
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
