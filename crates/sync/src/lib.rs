// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-sync: Mirror and distribution engines.
//!
//! A [`Mirror`] keeps one local directory and a set of remote servers
//! content-identical in both directions without feedback loops; a
//! [`Distributor`] is its one-way sibling, pushing local adds and
//! changes to a server set with no caching or deletion handling.

pub mod cache;
pub mod distributor;
pub mod mirror;
pub mod selector;
pub mod watcher;

pub use cache::{Diff, FileCache};
pub use distributor::Distributor;
pub use mirror::Mirror;
pub use selector::ServerSelector;
pub use watcher::WatchOptions;
