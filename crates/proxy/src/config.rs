// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure builder for the reverse-proxy admin-API document.
//!
//! The output must be deterministic for a given input: servers live in a
//! `BTreeMap` and input ports are iterated lexicographically (the wire
//! model is a `BTreeMap` keyed by port string), so the same served-port
//! set always serializes to byte-equal JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use agent_wire::{Binding, BindingType, ServedPorts};

const HTTPS_DOMAINS_SERVER: &str = "https-domains";
const HTTP_DOMAINS_SERVER: &str = "http-domains";
const PORT_SERVER_PREFIX: &str = "port-";
const REVERSE_PROXY_HANDLER: &str = "reverse_proxy";
const STATIC_RESPONSE_HANDLER: &str = "static_response";

/// Admin-API document: a single HTTP app with named servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub apps: Apps,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apps {
    pub http: HttpApp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpApp {
    pub servers: BTreeMap<String, Server>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub listen: Vec<String>,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<Matcher>,
    pub handle: Vec<Handler>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    pub host: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handler {
    pub handler: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub upstreams: Vec<Upstream>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub dial: String,
}

/// Per-port partition of bindings into the three server groups.
struct PortBindings {
    /// Domain bindings; served on 443.
    https_domains: Vec<String>,
    /// Domain bindings without HTTPS redirect; also served on 80.
    http_domains: Vec<String>,
    /// Alternate-port listen specs (`:<port>`). A port bound to itself is
    /// skipped: the user's own listener already serves it directly.
    alt_ports: Vec<String>,
}

impl PortBindings {
    fn partition(port: &str, bindings: &[Binding]) -> Self {
        let mut https_domains = Vec::new();
        let mut http_domains = Vec::new();
        let mut alt_ports = Vec::new();

        for binding in bindings {
            match binding.binding_type {
                BindingType::Domain => {
                    https_domains.push(binding.value.clone());
                    if !binding.redirect_to_https {
                        http_domains.push(binding.value.clone());
                    }
                }
                BindingType::Port => {
                    if binding.value != port {
                        alt_ports.push(format!(":{}", binding.value));
                    }
                }
            }
        }

        Self { https_domains, http_domains, alt_ports }
    }
}

impl Config {
    /// Translate the served-port model into the admin-API document.
    pub fn from_served_ports(ports: &ServedPorts) -> Self {
        let mut servers: BTreeMap<String, Server> = BTreeMap::new();

        for (port, bindings) in ports {
            let groups = PortBindings::partition(port, bindings);

            if !groups.https_domains.is_empty() {
                servers
                    .entry(HTTPS_DOMAINS_SERVER.to_string())
                    .or_insert_with(|| Server { listen: vec![":443".to_string()], routes: vec![] })
                    .routes
                    .push(reverse_proxy_route(groups.https_domains, port));

                if !groups.http_domains.is_empty() {
                    servers
                        .entry(HTTP_DOMAINS_SERVER.to_string())
                        .or_insert_with(|| Server {
                            listen: vec![":80".to_string()],
                            routes: vec![],
                        })
                        .routes
                        .push(reverse_proxy_route(groups.http_domains, port));
                }
            }

            if !groups.alt_ports.is_empty() {
                servers.insert(
                    format!("{PORT_SERVER_PREFIX}{port}"),
                    Server {
                        listen: groups.alt_ports,
                        routes: vec![Route {
                            matchers: vec![],
                            handle: vec![reverse_proxy_handler(port)],
                        }],
                    },
                );
            }
        }

        Self { apps: Apps { http: HttpApp { servers } } }
    }

    /// Append a port-80 route answering `domain` with a static
    /// `unique_id` body, so an external prober can confirm the domain
    /// reaches this instance.
    pub fn add_domain_probe_route(&mut self, domain: &str, unique_id: &str) {
        self.apps
            .http
            .servers
            .entry(HTTP_DOMAINS_SERVER.to_string())
            .or_insert_with(|| Server { listen: vec![":80".to_string()], routes: vec![] })
            .routes
            .push(Route {
                matchers: vec![Matcher { host: vec![domain.to_string()] }],
                handle: vec![Handler {
                    handler: STATIC_RESPONSE_HANDLER.to_string(),
                    upstreams: vec![],
                    body: unique_id.to_string(),
                }],
            });
    }
}

fn reverse_proxy_route(hosts: Vec<String>, port: &str) -> Route {
    Route { matchers: vec![Matcher { host: hosts }], handle: vec![reverse_proxy_handler(port)] }
}

fn reverse_proxy_handler(port: &str) -> Handler {
    Handler {
        handler: REVERSE_PROXY_HANDLER.to_string(),
        upstreams: vec![Upstream { dial: format!("127.0.0.1:{port}") }],
        body: String::new(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
