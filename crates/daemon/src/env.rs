// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

/// Where the RPC service listens.
#[derive(Debug, Clone)]
pub enum RpcListenAddr {
    /// Unix-domain socket path. The remote client reaches it through the
    /// SSH server's Unix-socket forwarding.
    Unix(PathBuf),
    /// TCP address, e.g. `0.0.0.0:50051`.
    Tcp(String),
}

/// Default RPC socket path.
pub const DEFAULT_RPC_SOCKET: &str = "/eleven/agent/rpc.sock";

/// Default TCP address when `AGENT_RPC_PROTO=tcp`.
pub const DEFAULT_RPC_TCP_ADDR: &str = "0.0.0.0:50051";

/// RPC listen configuration: `AGENT_RPC_PROTO` (`unix` | `tcp`) and
/// `AGENT_RPC_ADDR`. Defaults to the Unix socket.
pub fn rpc_listen_addr() -> RpcListenAddr {
    let proto = std::env::var("AGENT_RPC_PROTO").unwrap_or_default();
    let addr = std::env::var("AGENT_RPC_ADDR").ok();

    if proto == "tcp" {
        RpcListenAddr::Tcp(addr.unwrap_or_else(|| DEFAULT_RPC_TCP_ADDR.to_string()))
    } else {
        RpcListenAddr::Unix(PathBuf::from(
            addr.unwrap_or_else(|| DEFAULT_RPC_SOCKET.to_string()),
        ))
    }
}

/// SSH listen address (`AGENT_SSH_ADDR`, default `0.0.0.0:2200`).
pub fn ssh_listen_addr() -> String {
    std::env::var("AGENT_SSH_ADDR").unwrap_or_else(|_| "0.0.0.0:2200".to_string())
}

/// Deadline for a connected client to send its request frame.
pub fn ipc_timeout() -> Duration {
    std::env::var("AGENT_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Cadence of the two reconciliation tickers.
pub fn reconcile_interval() -> Duration {
    Duration::from_millis(400)
}
