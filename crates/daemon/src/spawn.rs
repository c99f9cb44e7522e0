// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared subprocess plumbing for the streaming RPC handlers.
//!
//! The spawn discipline is identical across endpoints: obtain the output
//! pipes before starting, drain each pipe with its own reader task, and
//! only `wait()` once both readers have hit EOF; waiting earlier leaves
//! the pipe-close order undefined.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tempfile::TempPath;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// An embedded shell script materialized as an executable temp file.
///
/// The file is removed when the value is dropped.
pub(crate) struct EmbeddedScript {
    path: TempPath,
}

impl EmbeddedScript {
    /// Write `contents` to a temp file and mark it executable.
    ///
    /// The file must be closed before the chmod + exec: executing a file
    /// that is still open for writing fails with "text file busy".
    pub(crate) fn materialize(prefix: &str, contents: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new().prefix(prefix).tempfile()?;
        file.write_all(contents.as_bytes())?;

        let path = file.into_temp_path();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o700))?;

        Ok(Self { path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/tmp"))
    }
}

/// A child process whose merged stdout/stderr is consumed line by line.
pub(crate) struct StreamedCommand {
    child: Child,
    lines: mpsc::Receiver<String>,
    readers: Vec<JoinHandle<()>>,
}

/// Spawn `command` with piped output and line-reader tasks attached.
pub(crate) fn spawn_streaming(mut command: Command) -> std::io::Result<StreamedCommand> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command.spawn()?;

    let (tx, lines) = mpsc::channel(64);
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_line_reader(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_line_reader(stderr, tx));
    }

    Ok(StreamedCommand { child, lines, readers })
}

impl StreamedCommand {
    /// Next output line, from either pipe. `None` once both pipes are
    /// drained. Line order is preserved per pipe; interleaving between
    /// stdout and stderr is not ordered.
    pub(crate) async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Join the reader tasks, then reap the child.
    pub(crate) async fn wait(mut self) -> std::io::Result<ExitStatus> {
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        self.child.wait().await
    }
}

fn spawn_line_reader<R>(pipe: R, tx: mpsc::Sender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
