// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime installation: one embedded installer script per runtime,
//! streamed and failed fast, then the workspace runtimes are persisted.

use indexmap::IndexMap;
use tokio::io::AsyncWrite;
use tokio::process::Command;

use agent_core::config::{load_config, save_config};
use agent_core::paths;
use agent_wire::Reply;

use super::{ReplyStream, RpcError};
use crate::scripts;
use crate::spawn::{spawn_streaming, EmbeddedScript};

/// Requested runtimes in install order: insertion order, with `ruby`
/// moved last. The ruby installer rewrites shell rc files and must apply
/// after every other PATH change.
pub(crate) fn install_order(runtimes: &IndexMap<String, String>) -> Vec<(String, String)> {
    let mut ordered = Vec::with_capacity(runtimes.len());
    let mut ruby = None;

    for (name, version) in runtimes {
        if name == "ruby" {
            ruby = Some((name.clone(), version.clone()));
            continue;
        }
        ordered.push((name.clone(), version.clone()));
    }

    if let Some(ruby) = ruby {
        ordered.push(ruby);
    }

    ordered
}

pub(crate) async fn handle<W>(
    runtimes: IndexMap<String, String>,
    stream: &ReplyStream<W>,
) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    for (name, version) in install_order(&runtimes) {
        stream
            .send(&Reply::LogLineHeader { line: format!("Installing {name}@{version}") })
            .await?;

        let script_source = scripts::runtime_install_script(&name)
            .ok_or_else(|| RpcError::UnsupportedRuntime(name.clone()))?;
        let script = EmbeddedScript::materialize("eleven_install_runtime_", script_source)?;

        let mut command = Command::new(script.path());
        command
            .current_dir(script.dir())
            // Installers like nvm and rvm append their setup lines to the
            // config file of $SHELL. The inherited value still points at
            // the pre-bootstrap shell, so it is forced here.
            .env("SHELL", paths::USER_SHELL)
            .env("RUNTIME_VERSION", &version);

        let mut streamed = spawn_streaming(command)?;
        while let Some(line) = streamed.next_line().await {
            stream.send(&Reply::LogLine { line }).await?;
        }

        let status = streamed.wait().await?;
        if !status.success() {
            return Err(RpcError::RuntimeInstallFailed { name, version, status });
        }
    }

    let mut config = load_config(paths::AGENT_CONFIG_FILE)?;
    config.workspace.set_runtimes(runtimes.into_iter().collect());
    save_config(paths::AGENT_CONFIG_FILE, &config)?;

    Ok(())
}

#[cfg(test)]
#[path = "install_runtimes_tests.rs"]
mod tests;
