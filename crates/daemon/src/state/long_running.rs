// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-running-process supervisor ("forever").
//!
//! An idempotent reconciler keeping the declared background commands
//! alive, plus the start-and-wait-for-readiness path used by the RPC
//! service. Three actors touch the registry (reconciler tick, per-process
//! waiter, start-and-wait); one mutex guards the map, never held across
//! a subprocess call. Each process gets a done token created at
//! registration; cancelling it is the only way the supervisor stops a
//! process, and the waiter task answers by signalling the whole process
//! group.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::{getpgid, Pid};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use agent_core::config::{load_config, load_config_if_exists, save_config, ConfigError};
use agent_core::paths;

use crate::network::{self, NetworkError};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to inspect process group: {0}")]
    ProcessGroup(#[from] nix::Error),

    #[error("client stopped listening while the command was starting")]
    ClientGone,
}

/// Result of the start-and-wait-for-readiness path.
#[derive(Debug)]
pub enum StartOutcome {
    /// The command opened a new listener and was adopted by the
    /// supervisor.
    Ready,
    /// The command exited before becoming ready.
    Exited { output: String, message: String },
}

struct ProcessEntry {
    id: u64,
    cmd: String,
    done: CancellationToken,
}

/// Supervisor registry shared by the reconciler ticker and the RPC
/// start path.
pub struct Supervisor {
    config_path: PathBuf,
    processes: Mutex<HashMap<PathBuf, ProcessEntry>>,
    next_id: AtomicU64,
}

impl Supervisor {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path, processes: Mutex::new(HashMap::new()), next_id: AtomicU64::new(0) }
    }

    /// Run the reconciliation ticker for the life of the process.
    pub async fn run_reconciler(self: Arc<Self>) {
        let mut interval = tokio::time::interval(crate::env::reconcile_interval());

        loop {
            interval.tick().await;

            let declared = match load_config_if_exists(&self.config_path) {
                Ok(config) => {
                    config.map(|c| c.long_running_processes).unwrap_or_default()
                }
                Err(e) => {
                    warn!(error = %e, "could not load config for process reconciliation");
                    continue;
                }
            };

            self.reconcile(&declared);
        }
    }

    /// One reconciliation pass over the declared `dir -> cmd` mapping.
    pub fn reconcile(self: &Arc<Self>, declared: &BTreeMap<PathBuf, String>) {
        let mut processes = self.processes.lock();

        // Stop processes that were undeclared or whose command changed.
        let stale: Vec<PathBuf> = processes
            .iter()
            .filter(|(wd, entry)| declared.get(*wd) != Some(&entry.cmd))
            .map(|(wd, _)| wd.clone())
            .collect();
        for wd in stale {
            if let Some(entry) = processes.remove(&wd) {
                entry.done.cancel();
            }
        }

        // Start declared processes that are not running.
        for (wd, cmd) in declared {
            if processes.contains_key(wd) {
                continue;
            }

            let mut command = build_command(wd, cmd);
            command.stdout(Stdio::null()).stderr(Stdio::null());
            let child = match command.spawn() {
                Ok(child) => child,
                Err(e) => {
                    warn!(wd = %wd.display(), cmd = %cmd, error = %e, "failed to start process");
                    continue;
                }
            };

            let entry = self.new_entry(cmd.clone());
            self.spawn_waiter(wd.clone(), entry.id, entry.done.clone(), child, None);
            processes.insert(wd.clone(), entry);
        }
    }

    /// Start a command and wait until it opens a new TCP listener, then
    /// persist it into the config and adopt it.
    ///
    /// `client_gone` is cancelled by the RPC layer when a heartbeat write
    /// fails; the command is then killed and the error surfaced.
    pub async fn start_and_wait_ready(
        self: &Arc<Self>,
        wd: PathBuf,
        cmd_string: String,
        client_gone: CancellationToken,
    ) -> Result<StartOutcome, StartError> {
        let initial_inodes = network::tcp_socket_inodes()?;

        let mut command = build_command(&wd, &cmd_string);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn().map_err(StartError::Spawn)?;
        let pid = child.id();

        // stdout and stderr share one capture buffer.
        let output = Arc::new(Mutex::new(Vec::new()));
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(capture_output(stdout, Arc::clone(&output)));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(capture_output(stderr, Arc::clone(&output)));
        }

        let entry = self.new_entry(cmd_string.clone());
        let done = entry.done.clone();
        let (exit_tx, exit_rx) = oneshot::channel();
        self.spawn_waiter(wd.clone(), entry.id, done.clone(), child, Some(exit_tx));

        tokio::select! {
            status = exit_rx => {
                let message = match status {
                    Ok(status) => format!("unexpected command exit ({status})"),
                    Err(_) => "unexpected command exit".to_string(),
                };
                let output = String::from_utf8_lossy(&output.lock()).into_owned();
                Ok(StartOutcome::Exited { output, message })
            }

            result = wait_until_ready(pid, initial_inodes, Arc::clone(&output)) => {
                if let Err(e) = result {
                    done.cancel();
                    return Err(e);
                }

                let mut config = load_config(&self.config_path)?;
                config.long_running_processes.insert(wd.clone(), cmd_string);

                let mut processes = self.processes.lock();
                save_config(&self.config_path, &config)?;
                processes.insert(wd, entry);

                Ok(StartOutcome::Ready)
            }

            _ = client_gone.cancelled() => {
                done.cancel();
                Err(StartError::ClientGone)
            }
        }
    }

    fn new_entry(&self, cmd: String) -> ProcessEntry {
        ProcessEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            cmd,
            done: CancellationToken::new(),
        }
    }

    /// Watch one child: a cancelled done token kills the whole group; an
    /// exit on its own clears the registry entry and reports upstream.
    fn spawn_waiter(
        self: &Arc<Self>,
        wd: PathBuf,
        entry_id: u64,
        done: CancellationToken,
        mut child: Child,
        exit_tx: Option<oneshot::Sender<std::process::ExitStatus>>,
    ) {
        let supervisor = Arc::clone(self);

        tokio::spawn(async move {
            // The select only decides which side won; `child` is touched
            // again afterwards, once the racing wait future is gone.
            let exited = tokio::select! {
                _ = done.cancelled() => None,
                status = child.wait() => Some(status),
            };

            match exited {
                None => {
                    if let Some(pid) = child.id() {
                        if let Err(e) = kill_process_group(pid) {
                            warn!(wd = %wd.display(), error = %e, "failed to kill process group");
                        }
                    }
                    // Reap so the group does not linger as a zombie.
                    let _ = child.wait().await;
                }

                Some(status) => {
                    {
                        let mut processes = supervisor.processes.lock();
                        // Only clear our own registration; the directory
                        // may have been re-declared with a new process.
                        if processes.get(&wd).is_some_and(|entry| entry.id == entry_id) {
                            processes.remove(&wd);
                        }
                    }
                    done.cancel();

                    match status {
                        Ok(status) => {
                            warn!(wd = %wd.display(), %status, "unexpected process exit");
                            if let Some(tx) = exit_tx {
                                let _ = tx.send(status);
                            }
                        }
                        Err(e) => {
                            warn!(wd = %wd.display(), error = %e, "failed to wait on process");
                        }
                    }
                }
            }
        });
    }
}

/// `<shell> -i -c <cmd>` in `wd`, in its own process group so the whole
/// tree is reachable with one signal.
fn build_command(wd: &Path, cmd: &str) -> Command {
    let mut command = Command::new(paths::USER_SHELL);
    command
        .arg("-i")
        .arg("-c")
        .arg(cmd)
        .current_dir(wd)
        .stdin(Stdio::null())
        .process_group(0);
    command
}

fn kill_process_group(pid: u32) -> nix::Result<()> {
    let pgid = getpgid(Some(Pid::from_raw(pid as i32)))?;
    killpg(pgid, Signal::SIGINT)
}

async fn capture_output<R>(mut pipe: R, buffer: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncReadExt + Unpin,
{
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.lock().extend_from_slice(&chunk[..n]),
        }
    }
}

/// Poll once per second until the command's process group opens a TCP
/// listener that was not in the pre-spawn snapshot.
///
/// The group-sleep streak is computed alongside and reset whenever the
/// group runs or produces output; it is telemetry only and does not gate
/// readiness.
async fn wait_until_ready(
    pid: Option<u32>,
    initial_inodes: std::collections::HashSet<u64>,
    output: Arc<Mutex<Vec<u8>>>,
) -> Result<(), StartError> {
    let Some(pid) = pid else {
        // The child was reaped before the first probe.
        return Err(StartError::ProcessGroup(nix::errno::Errno::ESRCH));
    };
    let pid = pid as i32;
    let pgid = getpgid(Some(Pid::from_raw(pid)))?;

    let mut opened_listener = false;
    let mut sleep_streak = 0u32;
    let mut last_output_len = output.lock().len();

    loop {
        let group_sleeping = is_group_sleeping(pid, pgid.as_raw())?;

        if !opened_listener {
            opened_listener = network::open_tcp_sockets()?
                .iter()
                .any(|socket| socket.listening && !initial_inodes.contains(&socket.inode));
        }

        if group_sleeping {
            sleep_streak += 1;
        } else {
            sleep_streak = 0;
        }

        let output_len = output.lock().len();
        if output_len != last_output_len {
            last_output_len = output_len;
            sleep_streak = 0;
        }

        debug!(sleep_streak, opened_listener, "readiness probe");

        if opened_listener {
            return Ok(());
        }

        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}

/// Whether the spawned process and every process in its group are in
/// state `S`.
fn is_group_sleeping(pid: i32, pgid: i32) -> Result<bool, StartError> {
    for process in procfs::process::all_processes().map_err(NetworkError::Proc)? {
        let Ok(process) = process else { continue };
        // Processes may vanish between the listing and the stat read.
        let Ok(stat) = process.stat() else { continue };

        if stat.pid != pid && stat.pgrp != pgid {
            continue;
        }

        if stat.state != 'S' {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
#[path = "long_running_tests.rs"]
mod tests;
