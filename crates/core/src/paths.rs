// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed filesystem layout and network contract of the instance.
//!
//! Everything here is part of the platform contract: the bootstrap script
//! creates these paths, the remote client assumes them, and the SSH server
//! reads key material from them.

use std::path::PathBuf;

use crate::slug::slugify;

/// Root of all agent-managed configuration.
pub const CONFIG_DIR: &str = "/eleven";

/// Directory holding the agent configuration document.
pub const AGENT_CONFIG_DIR: &str = "/eleven/agent";

/// The agent configuration document (mode 0600).
pub const AGENT_CONFIG_FILE: &str = "/eleven/agent/config.json";

/// Directory holding generated editor workspace descriptors.
pub const VSCODE_CONFIG_DIR: &str = "/eleven/vscode";

/// The single developer user served by this agent.
pub const USER_NAME: &str = "eleven";

/// Home directory of the developer user.
pub const USER_HOME_DIR: &str = "/home/eleven";

/// Login shell of the developer user, set by the bootstrap script.
pub const USER_SHELL: &str = "/usr/bin/zsh";

/// Workspace subtree where repositories are cloned.
pub const WORKSPACE_DIR: &str = "/home/eleven/workspace";

/// SSH host key used by the embedded SSH server.
pub const SSH_HOST_KEY_FILE: &str = "/home/eleven/.ssh/eleven-ssh-server-host-key";

/// Authorized keys accepted for the developer user.
pub const AUTHORIZED_KEYS_FILE: &str = "/home/eleven/.ssh/authorized_keys";

/// GitHub deploy public key generated by the bootstrap script.
pub const GITHUB_PUBLIC_KEY_FILE: &str = "/home/eleven/.ssh/eleven-github.pub";

/// Ports owned by the platform; they can never be declared as served ports.
///
/// 22 is the distribution sshd, 2200 the embedded SSH server, 80/443 the
/// reverse proxy, 2019 its admin API.
pub const RESERVED_PORTS: &[&str] = &["22", "2200", "80", "443", "2019"];

/// Path of the editor workspace descriptor for an environment.
pub fn vscode_workspace_file(env_name: &str) -> PathBuf {
    PathBuf::from(VSCODE_CONFIG_DIR).join(format!("{}.code-workspace", slugify(env_name)))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
