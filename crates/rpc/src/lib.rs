// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-rpc: Request/response correlation over one WebSocket connection.
//!
//! The remote end dials in to us, so this crate runs a WebSocket
//! *server* that acts as the RPC *caller*: it accepts a single
//! connection, multiplexes logically-concurrent requests over it by id,
//! and exposes the remote file-store operations as typed methods.

pub mod channel;
pub mod client;

pub use channel::{listen, serve};
pub use client::{RpcClient, DEFAULT_TIMEOUT};
