// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RPC service: accepts connections on a Unix or TCP socket, reads one
//! request frame, and streams reply frames back.
//!
//! Handlers run in a per-connection task and stream their progress
//! through a shared [`ReplyStream`]; dispatch appends a terminal `Error`
//! frame when a handler fails.

mod check_domain;
mod init_instance;
mod install_runtimes;
mod long_running;
mod served_ports;

use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use agent_core::config::ConfigError;
use agent_proxy::ProxyError;
use agent_wire::{read_request, write_message, ProtocolError, Reply, Request};

use crate::env::RpcListenAddr;
use crate::state::{StartError, Supervisor};
use crate::workspace::WorkspaceError;

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub supervisor: Arc<Supervisor>,
}

/// Bound RPC listener.
pub enum RpcListener {
    Unix(UnixListener),
    Tcp(TcpListener),
}

/// Handler-level errors, surfaced to the client as a terminal `Error`
/// frame.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Start(#[from] StartError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected instance init script exit ({0})")]
    InitScriptFailed(std::process::ExitStatus),

    #[error("error installing {name}@{version} ({status})")]
    RuntimeInstallFailed { name: String, version: String, status: std::process::ExitStatus },

    #[error("unsupported runtime: {0}")]
    UnsupportedRuntime(String),

    #[error("port {0} is reserved and cannot be served")]
    ReservedPort(String),
}

/// Bind the RPC listener. A stale Unix socket file is removed first, and
/// the fresh one is restricted to the owner.
pub async fn bind(addr: &RpcListenAddr) -> std::io::Result<RpcListener> {
    match addr {
        RpcListenAddr::Unix(path) => {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }

            let listener = UnixListener::bind(path)?;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
            Ok(RpcListener::Unix(listener))
        }
        RpcListenAddr::Tcp(addr) => Ok(RpcListener::Tcp(TcpListener::bind(addr).await?)),
    }
}

/// Accept loop: one task per connection.
pub async fn serve(listener: RpcListener, ctx: Arc<ListenCtx>) {
    match listener {
        RpcListener::Unix(unix) => loop {
            match unix.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        handle_connection(reader, writer, &ctx).await;
                    });
                }
                Err(e) => error!(error = %e, "Unix accept error"),
            }
        },
        RpcListener::Tcp(tcp) => loop {
            match tcp.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "TCP connection");
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        handle_connection(reader, writer, &ctx).await;
                    });
                }
                Err(e) => error!(error = %e, "TCP accept error"),
            }
        },
    }
}

/// Streaming reply writer shared between a handler and its heartbeat
/// emitter. The lock serializes frames; the long-running-process handler
/// additionally relies on it to order the last beat before the terminal
/// frame.
pub(crate) struct ReplyStream<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for ReplyStream<W> {
    fn clone(&self) -> Self {
        Self { writer: Arc::clone(&self.writer) }
    }
}

impl<W: AsyncWrite + Unpin> ReplyStream<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer: Arc::new(Mutex::new(writer)) }
    }

    pub(crate) async fn send(&self, reply: &Reply) -> Result<(), ProtocolError> {
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, reply).await
    }

    /// The underlying writer lock, for callers that need to compose a
    /// check with a send atomically.
    pub(crate) fn writer(&self) -> &Arc<Mutex<W>> {
        &self.writer
    }
}

async fn handle_connection<R, W>(mut reader: R, writer: W, ctx: &ListenCtx)
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let request = match read_request(&mut reader, crate::env::ipc_timeout()).await {
        Ok(request) => request,
        Err(ProtocolError::ConnectionClosed) => {
            debug!("client disconnected before sending a request");
            return;
        }
        Err(e) => {
            debug!(error = %e, "failed to read request");
            return;
        }
    };

    info!(request = request_name(&request), "received request");

    let stream = ReplyStream::new(writer);
    if let Err(e) = dispatch(request, ctx, &stream).await {
        error!(error = %e, "request handler failed");
        let _ = stream.send(&Reply::Error { message: e.to_string() }).await;
    }
}

fn request_name(request: &Request) -> &'static str {
    match request {
        Request::InitInstance { .. } => "InitInstance",
        Request::InstallRuntimes { .. } => "InstallRuntimes",
        Request::ReconcileServedPortsState { .. } => "ReconcileServedPortsState",
        Request::CheckDomainReachability { .. } => "CheckDomainReachability",
        Request::TryToStartLongRunningProcess { .. } => "TryToStartLongRunningProcess",
    }
}

async fn dispatch<W>(
    request: Request,
    ctx: &ListenCtx,
    stream: &ReplyStream<W>,
) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    match request {
        Request::InitInstance {
            env_name,
            env_name_slug,
            user_email,
            user_full_name,
            repositories,
        } => {
            init_instance::handle(
                init_instance::Params {
                    env_name,
                    env_name_slug,
                    user_email,
                    user_full_name,
                    repositories,
                },
                stream,
            )
            .await
        }

        Request::InstallRuntimes { runtimes } => {
            install_runtimes::handle(runtimes, stream).await
        }

        Request::ReconcileServedPortsState { served_ports } => {
            served_ports::handle(served_ports, stream).await
        }

        Request::CheckDomainReachability { served_ports, domain, unique_id } => {
            check_domain::handle(served_ports, &domain, &unique_id, stream).await
        }

        Request::TryToStartLongRunningProcess { cwd, cmd } => {
            long_running::handle(cwd, cmd, ctx, stream).await
        }
    }
}
