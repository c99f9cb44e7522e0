// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde round-trips for every protocol variant, plus binding-shape
//! properties the reverse-proxy builder relies on.

use indexmap::IndexMap;
use proptest::prelude::*;

use super::wire::{decode, encode};
use super::*;

fn s() -> String {
    String::new()
}

fn all_requests() -> Vec<Request> {
    vec![
        Request::InitInstance {
            env_name: s(),
            env_name_slug: s(),
            user_email: s(),
            user_full_name: s(),
            repositories: vec![Repository { owner: s(), name: s() }],
        },
        Request::InstallRuntimes { runtimes: IndexMap::new() },
        Request::ReconcileServedPortsState { served_ports: ServedPorts::new() },
        Request::CheckDomainReachability {
            served_ports: ServedPorts::new(),
            domain: s(),
            unique_id: s(),
        },
        Request::TryToStartLongRunningProcess { cwd: s(), cmd: s() },
    ]
}

fn all_replies() -> Vec<Reply> {
    vec![
        Reply::LogLine { line: s() },
        Reply::LogLineHeader { line: s() },
        Reply::Heartbeat,
        Reply::GithubPublicKey { content: s() },
        Reply::Ok,
        Reply::StartError { output: s(), message: s() },
        Reply::Error { message: s() },
    ]
}

#[test]
fn every_request_round_trips() {
    for request in all_requests() {
        let frame = encode(&request).unwrap();
        let decoded: Request = decode(&frame[4..]).unwrap();
        assert_eq!(decoded, request);
    }
}

#[test]
fn every_reply_round_trips() {
    for reply in all_replies() {
        let frame = encode(&reply).unwrap();
        let decoded: Reply = decode(&frame[4..]).unwrap();
        assert_eq!(decoded, reply);
    }
}

#[test]
fn install_runtimes_preserves_insertion_order() {
    let mut runtimes = IndexMap::new();
    runtimes.insert("rust".to_string(), "1.78".to_string());
    runtimes.insert("go".to_string(), "latest".to_string());
    runtimes.insert("clang".to_string(), "17".to_string());

    let request = Request::InstallRuntimes { runtimes: runtimes.clone() };
    let frame = encode(&request).unwrap();
    let decoded: Request = decode(&frame[4..]).unwrap();

    match decoded {
        Request::InstallRuntimes { runtimes: decoded_runtimes } => {
            let order: Vec<&String> = decoded_runtimes.keys().collect();
            assert_eq!(order, vec!["rust", "go", "clang"]);
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn binding_type_serializes_lowercase() {
    let json = serde_json::to_value(Binding::domain("api.example.com", true)).unwrap();
    assert_eq!(json["type"], "domain");

    let json = serde_json::to_value(Binding::port("8080")).unwrap();
    assert_eq!(json["type"], "port");
    assert_eq!(json["redirect_to_https"], false);
}

proptest! {
    #[test]
    fn arbitrary_bindings_round_trip(
        value in "[a-z0-9.]{1,24}",
        is_domain in any::<bool>(),
        redirect in any::<bool>(),
    ) {
        let binding = if is_domain {
            Binding::domain(value, redirect)
        } else {
            Binding::port(value)
        };

        let json = serde_json::to_string(&binding).unwrap();
        let decoded: Binding = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(decoded, binding);
    }

    #[test]
    fn served_ports_keys_iterate_lexicographically(
        ports in prop::collection::btree_set("[0-9]{2,5}", 0..8)
    ) {
        let served: ServedPorts = ports
            .iter()
            .map(|p| (p.clone(), vec![Binding::port(p.clone())]))
            .collect();

        let keys: Vec<&String> = served.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }
}
