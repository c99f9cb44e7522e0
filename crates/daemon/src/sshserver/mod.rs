// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded SSH server: public-key auth, shell/exec sessions, TCP and
//! Unix-socket forwarding.
//!
//! The server holds no state beyond its authorization material; sessions
//! consult the agent config only to learn the declared editor extensions.

mod auth;
mod forward;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use russh::server::Server as _;
use thiserror::Error;

pub use auth::{Authenticator, AuthorizedUser};
pub use session::SshServer;

#[derive(Debug, Error)]
pub enum SshError {
    #[error("failed to load host key: {0}")]
    HostKey(#[source] russh::keys::Error),

    #[error(transparent)]
    Ssh(#[from] russh::Error),

    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PTY error: {0}")]
    Pty(String),

    #[error("{0} pipe unavailable")]
    Pipe(&'static str),

    #[error("expected command, got nothing")]
    EmptyCommand,

    #[error("the command returned a non-zero ({0}) exit code")]
    NonZeroExit(i32),
}

/// Run the SSH server until it fails. A missing host key or an occupied
/// listen address is fatal to the whole agent.
pub async fn run(
    listen_addr: &str,
    host_key_path: PathBuf,
    authorized_users: Vec<AuthorizedUser>,
    config_path: PathBuf,
) -> Result<(), SshError> {
    let host_key =
        russh::keys::load_secret_key(&host_key_path, None).map_err(SshError::HostKey)?;

    let config = russh::server::Config {
        keys: vec![host_key],
        ..Default::default()
    };

    let mut server = SshServer::new(Arc::new(Authenticator::new(authorized_users)), config_path);
    server.run_on_address(Arc::new(config), listen_addr).await?;

    Ok(())
}
