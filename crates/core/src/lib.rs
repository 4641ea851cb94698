// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-core: Shared protocol types for the tether file mirror.
//!
//! This crate provides the wire envelopes, remote file identities, and
//! error taxonomy used by both the RPC layer and the sync engines.

pub mod error;
pub mod identity;
pub mod protocol;

pub use error::{Error, Result};
pub use identity::RemoteIdentity;
pub use protocol::{FileEntry, Request, Response, ServerInfo, PROTOCOL_VERSION};
