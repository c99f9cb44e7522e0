// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::net::{Ipv4Addr, Ipv6Addr};

use super::*;

fn socket(addr: &str, port: u16, listening: bool, inode: u64) -> TcpSocket {
    let ip: IpAddr = addr.parse().unwrap();
    TcpSocket { local_addr: SocketAddr::new(ip, port), inode, listening }
}

fn served(ports: &[&str]) -> BTreeSet<String> {
    ports.iter().map(|p| p.to_string()).collect()
}

#[test]
fn selects_only_served_loopback_listeners() {
    let sockets = vec![
        socket("127.0.0.1", 3000, true, 1),
        // Served but not listening
        socket("127.0.0.1", 4000, false, 2),
        // Listening but bound to all interfaces
        socket("0.0.0.0", 3000, true, 3),
        // Listening on loopback but not served
        socket("127.0.0.1", 5000, true, 4),
    ];

    let listeners = served_loopback_listeners(&sockets, &served(&["3000", "4000"]));

    assert_eq!(listeners.len(), 1);
    assert_eq!(
        listeners.get("127.0.0.1:3000"),
        Some(&LoopbackListener { host: "127.0.0.1".to_string(), port: 3000 })
    );
}

#[test]
fn ipv6_loopback_is_bracket_wrapped() {
    let sockets = vec![TcpSocket {
        local_addr: SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 8080),
        inode: 9,
        listening: true,
    }];

    let listeners = served_loopback_listeners(&sockets, &served(&["8080"]));

    let listener = listeners.get("[::1]:8080").unwrap();
    assert_eq!(listener.host, "[::1]");
    assert_eq!(listener.target_addr(), "[::1]:8080");
}

#[test]
fn dual_stack_listeners_get_distinct_keys() {
    let sockets = vec![
        socket("127.0.0.1", 8080, true, 1),
        TcpSocket {
            local_addr: SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 8080),
            inode: 2,
            listening: true,
        },
    ];

    let listeners = served_loopback_listeners(&sockets, &served(&["8080"]));
    assert_eq!(listeners.len(), 2);
}

#[test]
fn other_loopback_addresses_count_as_loopback() {
    let sockets = vec![socket("127.0.0.53", 9000, true, 1)];

    let listeners = served_loopback_listeners(&sockets, &served(&["9000"]));
    assert!(listeners.contains_key("127.0.0.53:9000"));
}

#[test]
fn empty_served_set_selects_nothing() {
    let sockets = vec![socket("127.0.0.1", 3000, true, 1)];
    assert!(served_loopback_listeners(&sockets, &BTreeSet::new()).is_empty());
}

#[test]
fn non_loopback_v4_is_ignored() {
    let sockets = vec![TcpSocket {
        local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 3000),
        inode: 1,
        listening: true,
    }];
    assert!(served_loopback_listeners(&sockets, &served(&["3000"])).is_empty());
}
