// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario tests for the admin-API document builder. Expected documents
//! are written out in full: the collaborator consumes them verbatim, so
//! shape regressions must be loud.

use serde_json::{json, Value};

use agent_wire::{Binding, ServedPorts};

use super::*;

fn served(entries: &[(&str, Vec<Binding>)]) -> ServedPorts {
    entries.iter().map(|(port, bindings)| (port.to_string(), bindings.clone())).collect()
}

fn build(ports: &ServedPorts) -> Value {
    serde_json::to_value(Config::from_served_ports(ports)).unwrap()
}

fn empty_document() -> Value {
    json!({"apps": {"http": {"servers": {}}}})
}

fn proxy_route(hosts: &[&str], port: &str) -> Value {
    json!({
        "match": [{"host": hosts}],
        "handle": [{
            "handler": "reverse_proxy",
            "upstreams": [{"dial": format!("127.0.0.1:{port}")}]
        }]
    })
}

#[test]
fn no_served_ports() {
    assert_eq!(build(&ServedPorts::new()), empty_document());
}

#[test]
fn self_port_binding_contributes_nothing() {
    let ports = served(&[("8080", vec![Binding::port("8080")])]);
    assert_eq!(build(&ports), empty_document());
}

#[test]
fn domain_with_redirect_to_https() {
    let ports = served(&[("8080", vec![Binding::domain("api.domain.com", true)])]);

    assert_eq!(
        build(&ports),
        json!({
            "apps": {"http": {"servers": {
                "https-domains": {
                    "listen": [":443"],
                    "routes": [proxy_route(&["api.domain.com"], "8080")]
                }
            }}}
        })
    );
}

#[test]
fn domain_without_redirect_serves_both_ports() {
    let ports = served(&[("8080", vec![Binding::domain("api.domain.com", false)])]);

    assert_eq!(
        build(&ports),
        json!({
            "apps": {"http": {"servers": {
                "https-domains": {
                    "listen": [":443"],
                    "routes": [proxy_route(&["api.domain.com"], "8080")]
                },
                "http-domains": {
                    "listen": [":80"],
                    "routes": [proxy_route(&["api.domain.com"], "8080")]
                }
            }}}
        })
    );
}

#[test]
fn mixed_ports_and_domains() {
    let ports = served(&[
        ("4000", vec![Binding::domain("c.domain.com", false)]),
        ("6000", vec![Binding::port("6000")]),
        (
            "8080",
            vec![Binding::domain("a.domain.com", false), Binding::domain("b.domain.com", true)],
        ),
        (
            "11000",
            vec![Binding::port("11000"), Binding::port("8000"), Binding::port("2000")],
        ),
    ]);

    assert_eq!(
        build(&ports),
        json!({
            "apps": {"http": {"servers": {
                "https-domains": {
                    "listen": [":443"],
                    "routes": [
                        proxy_route(&["c.domain.com"], "4000"),
                        proxy_route(&["a.domain.com", "b.domain.com"], "8080"),
                    ]
                },
                "http-domains": {
                    "listen": [":80"],
                    "routes": [
                        proxy_route(&["c.domain.com"], "4000"),
                        proxy_route(&["a.domain.com"], "8080"),
                    ]
                },
                "port-11000": {
                    "listen": [":8000", ":2000"],
                    "routes": [{
                        "handle": [{
                            "handler": "reverse_proxy",
                            "upstreams": [{"dial": "127.0.0.1:11000"}]
                        }]
                    }]
                }
            }}}
        })
    );
}

#[test]
fn domain_probe_route_is_appended_without_touching_https() {
    let ports = served(&[("8080", vec![Binding::domain("api.domain.com", true)])]);
    let mut config = Config::from_served_ports(&ports);

    config.add_domain_probe_route("test.domain.sh", "unique-id");

    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        json!({
            "apps": {"http": {"servers": {
                "https-domains": {
                    "listen": [":443"],
                    "routes": [proxy_route(&["api.domain.com"], "8080")]
                },
                "http-domains": {
                    "listen": [":80"],
                    "routes": [{
                        "match": [{"host": ["test.domain.sh"]}],
                        "handle": [{"handler": "static_response", "body": "unique-id"}]
                    }]
                }
            }}}
        })
    );
}

#[test]
fn probe_route_on_empty_document_creates_http_server() {
    let mut config = Config::from_served_ports(&ServedPorts::new());
    config.add_domain_probe_route("test.domain.sh", "uid");

    let json = serde_json::to_value(&config).unwrap();
    assert_eq!(json["apps"]["http"]["servers"]["http-domains"]["listen"], json!([":80"]));
}

#[test]
fn builder_is_deterministic() {
    let ports = served(&[
        ("3000", vec![Binding::domain("a.domain.com", false), Binding::port("9000")]),
        ("8080", vec![Binding::domain("b.domain.com", true)]),
    ]);

    let first = serde_json::to_string(&Config::from_served_ports(&ports)).unwrap();
    let second = serde_json::to_string(&Config::from_served_ports(&ports)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn document_round_trips_through_serde() {
    let ports = served(&[(
        "3000",
        vec![Binding::domain("a.domain.com", false), Binding::port("9000")],
    )]);
    let config = Config::from_served_ports(&ports);

    let decoded: Config =
        serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
    assert_eq!(decoded, config);
}
