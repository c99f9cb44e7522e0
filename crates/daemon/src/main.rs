// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `agent` binary: the daemon by default, or the `forever` client helper.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use agent_core::paths;
use agent_daemon::sshserver::{self, AuthorizedUser};
use agent_daemon::state::{localhost_proxies, Supervisor};
use agent_daemon::{env, forever, listener};

#[derive(Parser)]
#[command(name = "agent", about = "In-instance development environment agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Manage a long-running command in the current directory
    Forever {
        /// Command words to run, or "stop"
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Some(Command::Forever { args }) => forever::run(args).await,
        None => run_daemon().await,
    }
}

async fn run_daemon() -> anyhow::Result<()> {
    // Logs are collected by journald, which prefixes its own timestamps.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .without_time()
        .init();

    let config_path = PathBuf::from(paths::AGENT_CONFIG_FILE);

    let rpc_addr = env::rpc_listen_addr();
    let supervisor = Arc::new(Supervisor::new(config_path.clone()));
    let ctx = Arc::new(listener::ListenCtx { supervisor: Arc::clone(&supervisor) });

    let rpc_listener = listener::bind(&rpc_addr).await.context("failed to bind RPC listener")?;
    info!(addr = ?rpc_addr, "RPC service listening");
    tokio::spawn(listener::serve(rpc_listener, ctx));

    info!("reconciling localhost proxies state");
    tokio::spawn(localhost_proxies::run_reconciler(config_path.clone()));

    info!("reconciling long running processes state");
    tokio::spawn(Supervisor::run_reconciler(Arc::clone(&supervisor)));

    let authorized_users = vec![AuthorizedUser {
        username: paths::USER_NAME.to_string(),
        authorized_keys_path: PathBuf::from(paths::AUTHORIZED_KEYS_FILE),
    }];

    let ssh_addr = env::ssh_listen_addr();
    info!(addr = %ssh_addr, "SSH server listening");
    sshserver::run(
        &ssh_addr,
        PathBuf::from(paths::SSH_HOST_KEY_FILE),
        authorized_users,
        config_path,
    )
    .await
    .context("SSH server failed")
}
