// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Channel forwarding: local TCP, reverse TCP, and OpenSSH Unix-socket
//! channels.

use russh::server::{Handle, Msg};
use russh::Channel;
use tokio::io::{copy_bidirectional, AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// `direct-tcpip`: dial the requested host and splice.
pub(crate) async fn splice_direct_tcpip(channel: Channel<Msg>, host: String, port: u32) {
    match TcpStream::connect((host.as_str(), port as u16)).await {
        Ok(target) => splice(channel, target).await,
        Err(e) => {
            warn!(host, port, error = %e, "direct-tcpip dial failed");
        }
    }
}

/// `direct-streamlocal@openssh.com`: dial the named Unix socket and
/// splice.
pub(crate) async fn splice_unix_socket(channel: Channel<Msg>, socket_path: String) {
    match UnixStream::connect(&socket_path).await {
        Ok(target) => splice(channel, target).await,
        Err(e) => {
            warn!(socket_path, error = %e, "unix socket dial failed");
        }
    }
}

/// Accept loop for one `tcpip-forward` registration: every inbound
/// connection becomes a forwarded channel back to the client.
pub(crate) async fn run_reverse_forward(
    listener: TcpListener,
    handle: Handle,
    address: String,
    port: u32,
    done: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = done.cancelled() => return,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(address, port, error = %e, "reverse forward accept failed");
                        continue;
                    }
                };

                match handle
                    .channel_open_forwarded_tcpip(
                        address.clone(),
                        port,
                        peer.ip().to_string(),
                        u32::from(peer.port()),
                    )
                    .await
                {
                    Ok(channel) => {
                        tokio::spawn(splice(channel, stream));
                    }
                    Err(e) => {
                        warn!(address, port, error = ?e, "failed to open forwarded channel");
                    }
                }
            }
        }
    }
}

/// Bidirectionally copy between a channel and a local stream; the first
/// error on either side tears the pair down.
async fn splice<S>(channel: Channel<Msg>, mut target: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = channel.into_stream();
    if let Err(e) = copy_bidirectional(&mut stream, &mut target).await {
        debug!(error = %e, "forwarded connection closed with error");
    }
}
