// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace preparation: clear the workspace, clone the requested
//! repositories (or create a placeholder directory), and emit the editor
//! workspace descriptor.

mod git;

use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use agent_core::config::{save_config, ConfigError};
use agent_core::vscode::{VsCodeWorkspaceConfig, VsCodeWorkspaceFolder};
use agent_core::workspace::Repository;
use agent_core::{paths, slugify, system, AgentConfig};

pub(crate) use git::clone_github_repo;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to prepare workspace directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("error while cloning the repository \"{repo}\".\n\n{details}")]
    Clone { repo: String, details: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Prepare the workspace for an environment.
///
/// Called after a successful instance init, and again after a partial
/// failure; clearing the workspace first keeps it idempotent.
pub async fn prepare(
    config: &mut AgentConfig,
    env_name: &str,
    repositories: &[agent_wire::Repository],
) -> Result<(), WorkspaceError> {
    let mut descriptor = VsCodeWorkspaceConfig::default();

    system::remove_dir_content(paths::WORKSPACE_DIR)?;

    if repositories.is_empty() {
        let placeholder = create_placeholder_dir(env_name)?;
        descriptor.folders = vec![VsCodeWorkspaceFolder { path: placeholder.clone() }];
        config.workspace.root_dir_path = placeholder;
    } else {
        let owners = distinct_owner_count(repositories);

        for repository in repositories {
            let dir = repo_dir_path(repository, owners);
            clone_github_repo(&repository.owner, &repository.name, &dir).await?;

            config.workspace.repositories.push(Repository {
                owner: repository.owner.clone(),
                name: repository.name.clone(),
                root_dir_path: dir.clone(),
            });
            descriptor.folders.push(VsCodeWorkspaceFolder { path: dir });
        }

        config.workspace.root_dir_path = if repositories.len() == 1 {
            config.workspace.repositories[0].root_dir_path.clone()
        } else {
            PathBuf::from(paths::WORKSPACE_DIR)
        };
    }

    descriptor.save(paths::vscode_workspace_file(env_name))?;
    save_config(paths::AGENT_CONFIG_FILE, config)?;

    Ok(())
}

/// Clone destination for a repository.
///
/// With a single contributing owner the repository name is enough; with
/// several, the owner disambiguates.
pub(crate) fn repo_dir_path(repository: &agent_wire::Repository, distinct_owners: usize) -> PathBuf {
    let dir_name = if distinct_owners > 1 {
        slugify(&format!("{}-{}", repository.owner, repository.name))
    } else {
        slugify(&repository.name)
    };

    Path::new(paths::WORKSPACE_DIR).join(dir_name)
}

pub(crate) fn distinct_owner_count(repositories: &[agent_wire::Repository]) -> usize {
    repositories
        .iter()
        .map(|repository| repository.owner.as_str())
        .collect::<HashSet<_>>()
        .len()
}

fn create_placeholder_dir(env_name: &str) -> Result<PathBuf, WorkspaceError> {
    let dir = Path::new(paths::WORKSPACE_DIR).join(slugify(env_name));
    std::fs::create_dir(&dir)?;
    std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o775))?;
    Ok(dir)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
