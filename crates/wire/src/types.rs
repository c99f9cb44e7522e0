// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Served ports as they travel on the wire: port string -> bindings.
///
/// A `BTreeMap` so every consumer iterates ports lexicographically; the
/// reverse-proxy config builder's determinism depends on it.
pub type ServedPorts = BTreeMap<String, Vec<Binding>>;

/// How a served port is exposed to the Internet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingType {
    /// A public hostname; TLS terminates at the reverse proxy.
    Domain,
    /// A plain TCP proxy on an alternate port.
    Port,
}

/// One way in which a served port is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Hostname for `domain` bindings, port string for `port` bindings.
    pub value: String,
    #[serde(rename = "type")]
    pub binding_type: BindingType,
    /// For `domain` bindings: serve over 443 only (`true`) or over both
    /// 443 and 80 (`false`).
    #[serde(default)]
    pub redirect_to_https: bool,
}

impl Binding {
    pub fn domain(value: impl Into<String>, redirect_to_https: bool) -> Self {
        Self { value: value.into(), binding_type: BindingType::Domain, redirect_to_https }
    }

    pub fn port(value: impl Into<String>) -> Self {
        Self { value: value.into(), binding_type: BindingType::Port, redirect_to_https: false }
    }
}

/// A repository to clone during instance init.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}
