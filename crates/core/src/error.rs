// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tether operations.

use thiserror::Error;

/// All possible errors across the RPC and sync layers.
///
/// RPC-level errors always surface to the immediate caller. Errors hit
/// during background reconciliation or watch handling are logged and
/// absorbed by the loops that own them.
#[derive(Debug, Error)]
pub enum Error {
    /// A call was attempted while no connection is accepted.
    #[error("no open connection")]
    NoConnection,

    /// No response arrived within the request deadline.
    #[error("request {0} timed out")]
    Timeout(u64),

    /// The connection dropped while a response was outstanding.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// The response carried an error payload from the remote.
    #[error("remote error: {0}")]
    Remote(serde_json::Value),

    /// A mirror or distributor was built before any connection was
    /// accepted.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// One server's listing failed during a pass spanning multiple
    /// servers. Its files are omitted from the pass and retried on the
    /// next tick.
    #[error("listing failed for server '{server}': {reason}")]
    PartialFetch { server: String, reason: String },

    /// Not a valid `server://path` identity.
    #[error("invalid remote identity: '{0}'")]
    InvalidIdentity(String),

    /// Not a valid server selector.
    #[error("invalid server selector: '{0}'")]
    InvalidSelector(String),

    /// WebSocket transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Filesystem watcher setup or runtime failure.
    #[error("watch error: {0}")]
    Watch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tether operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
