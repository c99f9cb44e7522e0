// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Served-ports reconciliation: regenerate the reverse-proxy document,
//! push it, then persist the declared port set.

use std::collections::BTreeSet;

use tokio::io::AsyncWrite;

use agent_core::config::{load_config, save_config};
use agent_core::paths;
use agent_proxy::{Api, Config};
use agent_wire::{BindingType, Reply, ServedPorts};

use super::{ReplyStream, RpcError};

/// The served-port set persisted in the agent config: every `port`-typed
/// binding value. These are the ports the port-forward reconciler
/// exposes on the outbound interface.
pub(crate) fn extract_served_ports(served_ports: &ServedPorts) -> BTreeSet<String> {
    let mut extracted = BTreeSet::new();

    for bindings in served_ports.values() {
        for binding in bindings {
            if binding.binding_type == BindingType::Port {
                extracted.insert(binding.value.clone());
            }
        }
    }

    extracted
}

/// First reserved port referenced by the request, if any: as a serving
/// port or as a `port`-typed binding value.
pub(crate) fn find_reserved_port(served_ports: &ServedPorts) -> Option<String> {
    for (port, bindings) in served_ports {
        if paths::RESERVED_PORTS.contains(&port.as_str()) {
            return Some(port.clone());
        }
        for binding in bindings {
            if binding.binding_type == BindingType::Port
                && paths::RESERVED_PORTS.contains(&binding.value.as_str())
            {
                return Some(binding.value.clone());
            }
        }
    }

    None
}

pub(crate) async fn handle<W>(
    served_ports: ServedPorts,
    stream: &ReplyStream<W>,
) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    if let Some(port) = find_reserved_port(&served_ports) {
        return Err(RpcError::ReservedPort(port));
    }

    let proxy_config = Config::from_served_ports(&served_ports);
    Api::new().load(&proxy_config).await?;

    let mut config = load_config(paths::AGENT_CONFIG_FILE)?;
    config.served_ports = extract_served_ports(&served_ports);
    save_config(paths::AGENT_CONFIG_FILE, &config)?;

    stream.send(&Reply::Ok).await?;
    Ok(())
}

#[cfg(test)]
#[path = "served_ports_tests.rs"]
mod tests;
