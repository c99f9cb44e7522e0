// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel TCP state scraping and outbound-IP discovery.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not read /proc/net/tcp: {0}")]
    Proc(#[from] procfs::ProcError),
}

/// One row of `/proc/net/tcp{,6}`, reduced to what the agent needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSocket {
    pub local_addr: SocketAddr,
    pub inode: u64,
    pub listening: bool,
}

/// A loopback listener selected for proxying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackListener {
    /// Dialable host literal; IPv6 addresses are bracket-wrapped.
    pub host: String,
    pub port: u16,
}

impl LoopbackListener {
    /// Registry key: the literal `host:port`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Loopback address to dial when forwarding a connection.
    pub fn target_addr(&self) -> String {
        self.key()
    }
}

/// Snapshot the kernel's IPv4 + IPv6 TCP sockets.
pub fn open_tcp_sockets() -> Result<Vec<TcpSocket>, NetworkError> {
    let mut entries = procfs::net::tcp()?;
    entries.extend(procfs::net::tcp6()?);

    Ok(entries
        .into_iter()
        .map(|entry| TcpSocket {
            local_addr: entry.local_address,
            inode: entry.inode,
            listening: matches!(entry.state, procfs::net::TcpState::Listen),
        })
        .collect())
}

/// Inodes of every current TCP socket, the baseline for "opened a new
/// listener" readiness detection.
pub fn tcp_socket_inodes() -> Result<HashSet<u64>, NetworkError> {
    Ok(open_tcp_sockets()?.into_iter().map(|socket| socket.inode).collect())
}

/// Select the loopback listeners whose port is declared served, keyed by
/// `host:port`.
pub fn served_loopback_listeners(
    sockets: &[TcpSocket],
    served_ports: &BTreeSet<String>,
) -> BTreeMap<String, LoopbackListener> {
    let mut listeners = BTreeMap::new();

    for socket in sockets {
        if !socket.listening || !socket.local_addr.ip().is_loopback() {
            continue;
        }

        let port = socket.local_addr.port();
        if !served_ports.contains(&port.to_string()) {
            continue;
        }

        let host = match socket.local_addr.ip() {
            IpAddr::V4(ip) => ip.to_string(),
            IpAddr::V6(ip) => format!("[{ip}]"),
        };

        let listener = LoopbackListener { host, port };
        listeners.insert(listener.key(), listener);
    }

    listeners
}

/// The primary egress address: connect a UDP socket so the kernel picks
/// the route, then read the chosen local address. No packet is sent.
pub fn outbound_ip() -> std::io::Result<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
