// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server-set selection for mirrors and distributors.

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;

use std::str::FromStr;

use tether_core::protocol::ServerInfo;
use tether_core::{Error, Result};
use tether_rpc::RpcClient;

/// How a mirror or distributor picks its target servers.
///
/// The dynamic variants are resolved once, at construction time, via a
/// `getAllServers` call; the resulting list is then fixed for the
/// lifetime of the binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerSelector {
    /// A fixed list of server names, used as-is.
    Explicit(Vec<String>),
    /// Every server the connected client has admin rights on.
    All,
    /// Admin-rights servers owned by the local actor.
    Owned,
    /// Admin-rights servers not owned by the local actor.
    NotOwned,
}

impl ServerSelector {
    /// Resolves the selector into a concrete server list.
    pub async fn resolve(&self, rpc: &RpcClient) -> Result<Vec<String>> {
        match self {
            ServerSelector::Explicit(list) => Ok(list.clone()),
            _ => {
                let servers = rpc.get_all_servers().await?;
                Ok(self.filter(&servers))
            }
        }
    }

    fn filter(&self, servers: &[ServerInfo]) -> Vec<String> {
        servers
            .iter()
            .filter(|s| s.has_admin_rights)
            .filter(|s| match self {
                ServerSelector::Owned => s.purchased_by_player,
                ServerSelector::NotOwned => !s.purchased_by_player,
                _ => true,
            })
            .map(|s| s.hostname.clone())
            .collect()
    }
}

impl FromStr for ServerSelector {
    type Err = Error;

    /// Parses `all`, `own`, `other`, or a comma-separated server list.
    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        match s.trim() {
            "" => Err(Error::InvalidSelector(s.to_string())),
            "all" => Ok(ServerSelector::All),
            "own" => Ok(ServerSelector::Owned),
            "other" => Ok(ServerSelector::NotOwned),
            list => {
                let servers: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                if servers.is_empty() {
                    return Err(Error::InvalidSelector(s.to_string()));
                }
                Ok(ServerSelector::Explicit(servers))
            }
        }
    }
}
