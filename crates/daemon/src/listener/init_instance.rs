// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First-boot provisioning: run the embedded bootstrap script, stream
//! its output, return the generated GitHub deploy key, then prepare the
//! workspace.

use tokio::io::AsyncWrite;
use tokio::process::Command;

use agent_core::paths;
use agent_core::AgentConfig;
use agent_wire::{Reply, Repository};

use super::{ReplyStream, RpcError};
use crate::spawn::{spawn_streaming, EmbeddedScript};
use crate::{scripts, workspace};

pub(crate) struct Params {
    pub env_name: String,
    pub env_name_slug: String,
    pub user_email: String,
    pub user_full_name: String,
    pub repositories: Vec<Repository>,
}

pub(crate) async fn handle<W>(params: Params, stream: &ReplyStream<W>) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    let script = EmbeddedScript::materialize("eleven_init_script_", scripts::INIT_INSTANCE)?;

    let mut command = Command::new(script.path());
    command
        .current_dir(script.dir())
        .env("ELEVEN_CONFIG_DIR_PATH", paths::CONFIG_DIR)
        .env("VSCODE_CONFIG_DIR_PATH", paths::VSCODE_CONFIG_DIR)
        .env("ENV_NAME_SLUG", &params.env_name_slug)
        .env("GITHUB_USER_EMAIL", &params.user_email)
        .env("USER_FULL_NAME", &params.user_full_name);

    let mut streamed = spawn_streaming(command)?;
    while let Some(line) = streamed.next_line().await {
        stream.send(&Reply::LogLine { line }).await?;
    }

    let status = streamed.wait().await?;
    if !status.success() {
        return Err(RpcError::InitScriptFailed(status));
    }

    let public_key = std::fs::read_to_string(paths::GITHUB_PUBLIC_KEY_FILE)?;
    stream.send(&Reply::GithubPublicKey { content: public_key }).await?;

    let mut config = AgentConfig::default();
    workspace::prepare(&mut config, &params.env_name, &params.repositories).await?;

    Ok(())
}
