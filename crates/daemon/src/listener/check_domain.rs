// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain-reachability probe: rebuild the proxy document, add a port-80
//! static-response route for the probed domain, and push it. The agent
//! config is untouched.

use tokio::io::AsyncWrite;

use agent_proxy::{Api, Config};
use agent_wire::{Reply, ServedPorts};

use super::{ReplyStream, RpcError};

pub(crate) async fn handle<W>(
    served_ports: ServedPorts,
    domain: &str,
    unique_id: &str,
    stream: &ReplyStream<W>,
) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    let mut proxy_config = Config::from_served_ports(&served_ports);
    proxy_config.add_domain_probe_route(domain, unique_id);

    Api::new().load(&proxy_config).await?;

    stream.send(&Reply::Ok).await?;
    Ok(())
}
