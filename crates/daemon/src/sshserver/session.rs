// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session dispatch: shell (with and without PTY) and exec, plus the
//! forwarding entry points.
//!
//! All sessions run as the developer user via sudo. The non-PTY shell
//! streams stdin line by line so the code-server invocation of the remote
//! editor can be rewritten to install the declared extensions.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use russh::keys::PublicKey;
use russh::server::{Auth, Handle, Handler, Msg, Server, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use agent_core::config::load_config_if_exists;
use agent_core::paths;

use super::auth::Authenticator;
use super::{forward, SshError};

/// Per-connection server factory.
pub struct SshServer {
    authenticator: Arc<Authenticator>,
    config_path: PathBuf,
}

impl SshServer {
    pub fn new(authenticator: Arc<Authenticator>, config_path: PathBuf) -> Self {
        Self { authenticator, config_path }
    }
}

impl Server for SshServer {
    type Handler = ClientHandler;

    fn new_client(&mut self, _peer_addr: Option<SocketAddr>) -> ClientHandler {
        ClientHandler {
            authenticator: Arc::clone(&self.authenticator),
            config_path: self.config_path.clone(),
            username: String::new(),
            channels: HashMap::new(),
            pty_params: HashMap::new(),
            resize_senders: HashMap::new(),
            forwards: HashMap::new(),
        }
    }
}

struct PtyParams {
    term: String,
    cols: u16,
    rows: u16,
}

/// Handler for one client connection.
pub struct ClientHandler {
    authenticator: Arc<Authenticator>,
    config_path: PathBuf,
    /// Authenticated username; set before any channel opens.
    username: String,
    channels: HashMap<ChannelId, Channel<Msg>>,
    pty_params: HashMap<ChannelId, PtyParams>,
    resize_senders: HashMap<ChannelId, mpsc::UnboundedSender<(u16, u16)>>,
    /// Reverse-forward listeners keyed by (address, port).
    forwards: HashMap<(String, u32), CancellationToken>,
}

impl Handler for ClientHandler {
    type Error = SshError;

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        match self.authenticator.is_authorized(user, public_key) {
            Ok(true) => {
                self.username = user.to_string();
                Ok(Auth::Accept)
            }
            Ok(false) => Ok(reject()),
            Err(e) => {
                warn!(error = %e, user, "public key authorization failed");
                Ok(reject())
            }
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        self.channels.insert(channel.id(), channel);
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        self.pty_params.insert(
            channel,
            PtyParams {
                term: term.to_string(),
                cols: col_width as u16,
                rows: row_height as u16,
            },
        );
        session.channel_success(channel)?;
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel_id: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let Some(channel) = self.channels.remove(&channel_id) else {
            session.channel_failure(channel_id)?;
            return Ok(());
        };

        let handle = session.handle();
        let username = self.username.clone();

        if let Some(pty) = self.pty_params.remove(&channel_id) {
            let (resize_tx, resize_rx) = mpsc::unbounded_channel();
            self.resize_senders.insert(channel_id, resize_tx);
            tokio::spawn(async move {
                let result = run_pty_shell(channel, username, pty, resize_rx).await;
                finish(&handle, channel_id, result).await;
            });
        } else {
            let extensions = declared_extensions(&self.config_path);
            tokio::spawn(async move {
                let result = run_shell(channel, handle.clone(), username, extensions).await;
                finish(&handle, channel_id, result).await;
            });
        }

        session.channel_success(channel_id)?;
        Ok(())
    }

    async fn exec_request(
        &mut self,
        channel_id: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let Some(channel) = self.channels.remove(&channel_id) else {
            session.channel_failure(channel_id)?;
            return Ok(());
        };

        let handle = session.handle();
        let username = self.username.clone();
        let command_line = String::from_utf8_lossy(data).into_owned();

        tokio::spawn(async move {
            let result = run_exec(channel, handle.clone(), username, command_line).await;
            finish(&handle, channel_id, result).await;
        });

        session.channel_success(channel_id)?;
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(tx) = self.resize_senders.get(&channel) {
            let _ = tx.send((col_width as u16, row_height as u16));
        }
        Ok(())
    }

    async fn channel_open_direct_tcpip(
        &mut self,
        channel: Channel<Msg>,
        host_to_connect: &str,
        port_to_connect: u32,
        _originator_address: &str,
        _originator_port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        // Local forwarding is permitted unconditionally.
        tokio::spawn(forward::splice_direct_tcpip(
            channel,
            host_to_connect.to_string(),
            port_to_connect,
        ));
        Ok(true)
    }

    async fn channel_open_direct_streamlocal(
        &mut self,
        channel: Channel<Msg>,
        socket_path: &str,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        // The tunnel by which the remote client reaches the agent's own
        // Unix-domain RPC endpoint.
        tokio::spawn(forward::splice_unix_socket(channel, socket_path.to_string()));
        Ok(true)
    }

    async fn tcpip_forward(
        &mut self,
        address: &str,
        port: &mut u32,
        session: &mut Session,
    ) -> Result<bool, Self::Error> {
        // Reverse forwarding is permitted unconditionally.
        let bind_host = if address.is_empty() { "0.0.0.0" } else { address };
        let listener = TcpListener::bind((bind_host, *port as u16)).await?;
        if *port == 0 {
            *port = u32::from(listener.local_addr()?.port());
        }

        let done = CancellationToken::new();
        self.forwards.insert((address.to_string(), *port), done.clone());

        tokio::spawn(forward::run_reverse_forward(
            listener,
            session.handle(),
            address.to_string(),
            *port,
            done,
        ));

        Ok(true)
    }

    async fn cancel_tcpip_forward(
        &mut self,
        address: &str,
        port: u32,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        if let Some(done) = self.forwards.remove(&(address.to_string(), port)) {
            done.cancel();
        }
        Ok(true)
    }
}

impl Drop for ClientHandler {
    fn drop(&mut self) {
        for done in self.forwards.values() {
            done.cancel();
        }
    }
}

fn reject() -> Auth {
    Auth::Reject { proceed_with_methods: None, partial_success: false }
}

/// Editor extensions declared in the agent config; absent or unreadable
/// config means none.
fn declared_extensions(config_path: &std::path::Path) -> Vec<String> {
    match load_config_if_exists(config_path) {
        Ok(Some(config)) => config.workspace.vscode.extensions,
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(error = %e, "could not load config for extension rewrite");
            Vec::new()
        }
    }
}

/// `sudo --set-home --login --user <username> [args…]`.
fn session_command(username: &str, args: &[&str]) -> Command {
    let mut command = Command::new("sudo");
    command.args(["--set-home", "--login", "--user", username]);
    command.args(args);
    command
}

/// Report the session result to the peer and close the channel.
async fn finish(handle: &Handle, channel: ChannelId, result: Result<(), SshError>) {
    let exit_status = match result {
        Ok(()) => 0,
        Err(e) => {
            warn!(error = %e, "SSH session error");
            1
        }
    };

    let _ = handle.exit_status_request(channel, exit_status).await;
    let _ = handle.eof(channel).await;
    let _ = handle.close(channel).await;
}

/// Rewrites the remote editor's bootstrap so that `--start-server` also
/// installs the declared extensions. Armed once a `code-server` line has
/// been seen.
pub(crate) struct StdinRewriter {
    extensions: Vec<String>,
    seen_code_server: bool,
}

impl StdinRewriter {
    pub(crate) fn new(extensions: Vec<String>) -> Self {
        Self { extensions, seen_code_server: false }
    }

    pub(crate) fn rewrite_line(&mut self, line: &str) -> String {
        if self.extensions.is_empty() {
            return line.to_string();
        }

        if line.contains("code-server") {
            self.seen_code_server = true;
        }

        if self.seen_code_server && line.contains("--start-server") {
            let install_flags = self
                .extensions
                .iter()
                .map(|extension| format!("--install-extension {extension}"))
                .collect::<Vec<_>>()
                .join(" ");
            return line.replace("--start-server", &format!("--start-server {install_flags}"));
        }

        line.to_string()
    }
}

/// Non-PTY shell: line-streamed stdin, bulk stdout/stderr.
async fn run_shell(
    channel: Channel<Msg>,
    handle: Handle,
    username: String,
    extensions: Vec<String>,
) -> Result<(), SshError> {
    let channel_id = channel.id();

    let mut command = session_command(&username, &[]);
    command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn()?;

    let stdin = child.stdin.take().ok_or(SshError::Pipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(SshError::Pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(SshError::Pipe("stderr"))?;

    let reader = BufReader::new(channel.into_stream());
    let stdin_task =
        tokio::spawn(pump_shell_stdin(reader, stdin, StdinRewriter::new(extensions)));

    let stdout_task = tokio::spawn(pump_to_channel(stdout, handle.clone(), channel_id));
    let stderr_task = tokio::spawn(pump_to_channel(stderr, handle, channel_id));

    // Wait only after both output pipes have drained.
    let _ = stdout_task.await;
    let _ = stderr_task.await;
    let status = child.wait().await?;
    stdin_task.abort();

    if !status.success() {
        return Err(SshError::NonZeroExit(status.code().unwrap_or(-1)));
    }
    Ok(())
}

async fn pump_shell_stdin<R>(
    mut reader: BufReader<R>,
    mut stdin: tokio::process::ChildStdin,
    mut rewriter: StdinRewriter,
) where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let rewritten = rewriter.rewrite_line(&line);
                if stdin.write_all(rewritten.as_bytes()).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn pump_to_channel<R>(mut pipe: R, handle: Handle, channel: ChannelId)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if handle.data(channel, CryptoVec::from_slice(&buf[..n])).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Exec: stdio bound to the channel, wait on the OS process.
async fn run_exec(
    channel: Channel<Msg>,
    handle: Handle,
    username: String,
    command_line: String,
) -> Result<(), SshError> {
    if command_line.is_empty() {
        return Err(SshError::EmptyCommand);
    }

    let channel_id = channel.id();

    let mut command =
        session_command(&username, &[paths::USER_SHELL, "-l", "-c", &command_line]);
    command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn()?;

    let mut stdin = child.stdin.take().ok_or(SshError::Pipe("stdin"))?;
    let stdout = child.stdout.take().ok_or(SshError::Pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(SshError::Pipe("stderr"))?;

    let stdin_task = tokio::spawn(async move {
        let mut reader = channel.into_stream();
        let _ = tokio::io::copy(&mut reader, &mut stdin).await;
    });

    let stdout_task = tokio::spawn(pump_to_channel(stdout, handle.clone(), channel_id));
    let stderr_task = tokio::spawn(pump_to_channel(stderr, handle, channel_id));

    // Wait on the process, not on the stdio pumps: the peer may never
    // close the channel's stdin.
    let status = child.wait().await?;

    let _ = stdout_task.await;
    let _ = stderr_task.await;
    stdin_task.abort();

    if !status.success() {
        return Err(SshError::NonZeroExit(status.code().unwrap_or(-1)));
    }
    Ok(())
}

/// PTY shell: `sudo login -f <user>` on a PTY pair, bytes copied both
/// ways, window-change requests applied to the master.
async fn run_pty_shell(
    channel: Channel<Msg>,
    username: String,
    params: PtyParams,
    mut resize_rx: mpsc::UnboundedReceiver<(u16, u16)>,
) -> Result<(), SshError> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows: params.rows,
            cols: params.cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| SshError::Pty(e.to_string()))?;

    let mut command = CommandBuilder::new("sudo");
    command.args(["login", "-f", &username]);
    command.env("TERM", &params.term);

    let mut child =
        pair.slave.spawn_command(command).map_err(|e| SshError::Pty(e.to_string()))?;
    drop(pair.slave);

    let mut pty_reader =
        pair.master.try_clone_reader().map_err(|e| SshError::Pty(e.to_string()))?;
    let mut pty_writer = pair.master.take_writer().map_err(|e| SshError::Pty(e.to_string()))?;
    let master = pair.master;

    let stream = channel.into_stream();
    let (mut chan_read, mut chan_write) = tokio::io::split(stream);

    // PTY output -> channel. The master reader is blocking; bridge it
    // through a bounded queue.
    let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(32);
    let read_task = tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; 4096];
        loop {
            match std::io::Read::read(&mut pty_reader, &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if out_tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    let out_task = tokio::spawn(async move {
        while let Some(chunk) = out_rx.recv().await {
            if chan_write.write_all(&chunk).await.is_err() {
                break;
            }
        }
    });

    // Channel input -> PTY.
    let (in_tx, in_rx) = std::sync::mpsc::channel::<Vec<u8>>();
    let write_task = tokio::task::spawn_blocking(move || {
        while let Ok(chunk) = in_rx.recv() {
            if std::io::Write::write_all(&mut pty_writer, &chunk).is_err() {
                break;
            }
        }
    });
    let in_task = tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        loop {
            match chan_read.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if in_tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Hold the master here so the PTY stays open for the child's
    // lifetime; apply window changes as they arrive.
    let mut child_wait = tokio::task::spawn_blocking(move || child.wait());
    let status = loop {
        tokio::select! {
            status = &mut child_wait => break status,
            resize = resize_rx.recv() => {
                if let Some((cols, rows)) = resize {
                    let size = PtySize { rows, cols, pixel_width: 0, pixel_height: 0 };
                    if let Err(e) = master.resize(size) {
                        debug!(error = %e, "PTY resize failed");
                    }
                }
            }
        }
    };

    drop(master);
    let _ = out_task.await;
    let _ = read_task.await;
    in_task.abort();
    let _ = write_task.await;

    let status = status
        .map_err(|e| SshError::Pty(e.to_string()))?
        .map_err(|e| SshError::Pty(e.to_string()))?;
    if !status.success() {
        return Err(SshError::NonZeroExit(status.exit_code() as i32));
    }
    Ok(())
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
