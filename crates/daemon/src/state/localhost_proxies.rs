// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port-forward reconciler.
//!
//! Maintains a bijection between loopback listeners on served ports and
//! reverse TCP proxies bound to the outbound interface. The registry is
//! owned by the reconciler task; nothing else touches it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use agent_core::config::{load_config_if_exists, ConfigError};

use crate::network::{self, LoopbackListener, NetworkError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Live proxies keyed by the listener's `host:port` literal.
#[derive(Default)]
pub struct LocalhostProxies {
    proxies: HashMap<String, ProxyHandle>,
}

struct ProxyHandle {
    done: CancellationToken,
}

/// Run the reconciliation ticker for the life of the process.
pub async fn run_reconciler(config_path: PathBuf) {
    let mut registry = LocalhostProxies::default();
    let mut interval = tokio::time::interval(crate::env::reconcile_interval());

    loop {
        interval.tick().await;
        if let Err(e) = registry.reconcile(&config_path).await {
            warn!(error = %e, "localhost proxies reconciliation failed");
        }
    }
}

impl LocalhostProxies {
    /// One reconciliation pass: observed loopback listeners on served
    /// ports vs live proxies.
    pub async fn reconcile(&mut self, config_path: &Path) -> Result<(), ReconcileError> {
        let served_ports = load_config_if_exists(config_path)?
            .map(|config| config.served_ports)
            .unwrap_or_default();

        let sockets = network::open_tcp_sockets()?;
        let listeners = network::served_loopback_listeners(&sockets, &served_ports);

        self.apply(listeners).await;
        Ok(())
    }

    async fn apply(&mut self, listeners: BTreeMap<String, LoopbackListener>) {
        let current: BTreeSet<String> = self.proxies.keys().cloned().collect();
        let desired: BTreeSet<String> = listeners.keys().cloned().collect();
        let (to_stop, to_start) = diff_keys(&current, &desired);

        for key in to_stop {
            if let Some(handle) = self.proxies.remove(&key) {
                // The accept loop observes the token and closes its
                // listener; the registry entry is gone immediately.
                handle.done.cancel();
            }
        }

        for key in to_start {
            let Some(listener) = listeners.get(&key) else { continue };
            match start_proxy(listener).await {
                Ok(done) => {
                    self.proxies.insert(key, ProxyHandle { done });
                }
                Err(e) => {
                    warn!(listener = %key, error = %e, "failed to start localhost proxy");
                }
            }
        }
    }
}

/// Keys to stop (live but no longer observed) and to start (observed but
/// not live).
pub(crate) fn diff_keys(
    current: &BTreeSet<String>,
    desired: &BTreeSet<String>,
) -> (Vec<String>, Vec<String>) {
    let to_stop = current.difference(desired).cloned().collect();
    let to_start = desired.difference(current).cloned().collect();
    (to_stop, to_start)
}

/// Bind a proxy on the outbound interface and hand it to an accept loop.
async fn start_proxy(listener: &LoopbackListener) -> std::io::Result<CancellationToken> {
    let ip = network::outbound_ip()?;
    let bind_addr = SocketAddr::new(ip, listener.port);
    let tcp_listener = TcpListener::bind(bind_addr).await?;

    let done = CancellationToken::new();
    tokio::spawn(accept_loop(tcp_listener, listener.target_addr(), done.clone()));

    Ok(done)
}

async fn accept_loop(listener: TcpListener, target_addr: String, done: CancellationToken) {
    loop {
        tokio::select! {
            _ = done.cancelled() => return,
            accepted = listener.accept() => {
                let (inbound, _) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(target = %target_addr, error = %e, "proxy accept failed");
                        continue;
                    }
                };
                tokio::spawn(forward_conn(inbound, target_addr.clone()));
            }
        }
    }
}

/// Splice one accepted connection with the loopback target. The first
/// error on either direction tears the pair down.
async fn forward_conn(mut inbound: TcpStream, target_addr: String) {
    let mut outbound = match TcpStream::connect(&target_addr).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(target = %target_addr, error = %e, "proxy dial failed");
            return;
        }
    };

    if let Err(e) = tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await {
        debug!(target = %target_addr, error = %e, "proxy connection closed with error");
    }
}

#[cfg(test)]
#[path = "localhost_proxies_tests.rs"]
mod tests;
