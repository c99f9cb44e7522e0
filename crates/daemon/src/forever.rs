// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side helper behind `agent forever`.
//!
//! `stop` edits the config directly; the supervisor's next tick kills
//! the group. Anything else is joined into a command and driven through
//! the `TryToStartLongRunningProcess` stream.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};

use agent_core::config::{load_config, save_config};
use agent_core::{paths, AgentConfig};
use agent_wire::{read_message, write_message, Reply, Request};

use crate::env::{self, RpcListenAddr};

pub async fn run(args: Vec<String>) -> Result<()> {
    if args.is_empty() {
        println!("Forever: usage: \"agent forever {{<command>|stop}}\"");
        return Ok(());
    }

    let cwd = std::env::current_dir()?;

    if args[0] == "stop" {
        stop(&cwd)?;
        println!("Forever: command stopped");
        return Ok(());
    }

    start(&cwd, args.join(" ")).await?;
    println!("Forever: command started. Run \"agent forever stop\" in the current path to stop.");
    Ok(())
}

/// Refuse to start when the directory already declares a command. The
/// config is left untouched.
pub(crate) fn ensure_not_running(config: &AgentConfig, cwd: &Path) -> Result<()> {
    if let Some(cmd) = config.long_running_processes.get(cwd) {
        bail!("\"{cmd}\" is already running in current path. Run \"agent forever stop\" first.");
    }
    Ok(())
}

fn stop(cwd: &Path) -> Result<()> {
    let mut config = load_config(paths::AGENT_CONFIG_FILE)?;

    if config.long_running_processes.remove(cwd).is_none() {
        bail!("no command to stop in current path");
    }

    save_config(paths::AGENT_CONFIG_FILE, &config)?;
    Ok(())
}

async fn start(cwd: &Path, cmd: String) -> Result<()> {
    let config = load_config(paths::AGENT_CONFIG_FILE)?;
    ensure_not_running(&config, cwd)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("Forever: waiting for command to listen on a port");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = try_to_start(cwd, cmd).await;
    spinner.finish_and_clear();

    result
}

async fn try_to_start(cwd: &Path, cmd: String) -> Result<()> {
    let request = Request::TryToStartLongRunningProcess {
        cwd: cwd.display().to_string(),
        cmd,
    };

    match env::rpc_listen_addr() {
        RpcListenAddr::Unix(path) => {
            let mut stream = UnixStream::connect(&path).await?;
            exchange(&mut stream, &request).await
        }
        RpcListenAddr::Tcp(addr) => {
            let mut stream = TcpStream::connect(&addr).await?;
            exchange(&mut stream, &request).await
        }
    }
}

/// Drive the stream to its terminal frame.
async fn exchange<S>(stream: &mut S, request: &Request) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_message(stream, request).await?;

    loop {
        let reply: Reply = read_message(stream).await?;
        match reply {
            Reply::Heartbeat | Reply::LogLine { .. } | Reply::LogLineHeader { .. } => continue,
            Reply::Ok => return Ok(()),
            Reply::StartError { output, message } => {
                if !output.is_empty() {
                    println!("{output}");
                }
                return Err(anyhow!(message));
            }
            Reply::Error { message } => return Err(anyhow!(message)),
            Reply::GithubPublicKey { .. } => {
                return Err(anyhow!("unexpected reply from agent"));
            }
        }
    }
}

#[cfg(test)]
#[path = "forever_tests.rs"]
mod tests;
