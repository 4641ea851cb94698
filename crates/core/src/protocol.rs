// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC-flavored wire envelopes and payload shapes.
//!
//! Requests carry a protocol version tag, a strictly increasing id, a
//! method name, and optional params. Responses echo the id with either
//! a `result` or an `error` payload; correlation is by id alone, so
//! responses may arrive in any order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version tag stamped on every outbound request.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Highest id reserved for handshake use by the peer. Request ids
/// issued by the client start above this.
pub const RESERVED_ID_MAX: u64 = 1;

/// Outbound request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Creates a request stamped with the protocol version.
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Request {
            jsonrpc: PROTOCOL_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Serializes the request to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a request from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Inbound response envelope.
///
/// Exactly one of `result` and `error` is expected to be set; a message
/// carrying an `error` field routes to the caller's reject path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    /// Creates a success response.
    pub fn result(id: u64, result: Value) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    pub fn error(id: u64, error: Value) -> Self {
        Response {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Serializes the response to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a response from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// One file in a `getAllFiles` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub content: String,
}

/// A server descriptor from `getAllServers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub hostname: String,
    pub has_admin_rights: bool,
    pub purchased_by_player: bool,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
