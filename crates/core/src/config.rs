// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent configuration document and its on-disk store.
//!
//! The document is the single piece of desired state shared by the RPC
//! handlers (writers) and the two reconcilers (readers). A process-wide
//! RW lock keeps reads concurrent and writes exclusive; combined with the
//! single-syscall write this makes partial documents unobservable from
//! within the process.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::system;
use crate::workspace::WorkspaceConfig;

/// Desired state of the instance, persisted as a single JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Workspace layout: repositories, runtimes, editor extensions.
    pub workspace: WorkspaceConfig,
    /// Ports currently declared reachable through the reverse proxy.
    pub served_ports: BTreeSet<String>,
    /// Declared background commands, keyed by absolute working directory.
    /// At most one command per directory.
    pub long_running_processes: BTreeMap<PathBuf, String>,
}

/// Config store errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read agent config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write agent config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed agent config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize agent config: {0}")]
    Serialize(#[source] serde_json::Error),
}

// Shared for reads, exclusive for writes. Guards the file, not the
// in-memory documents (every caller owns its own deserialized copy).
static CONFIG_LOCK: RwLock<()> = RwLock::new(());

/// Load the agent config, failing if the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<AgentConfig, ConfigError> {
    let path = path.as_ref();
    let _guard = CONFIG_LOCK.read();

    let contents = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_slice(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the agent config if the file exists; `None` before first init.
pub fn load_config_if_exists(path: impl AsRef<Path>) -> Result<Option<AgentConfig>, ConfigError> {
    let path = path.as_ref();

    let exists = system::file_exists(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if exists {
        load_config(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Serialize and persist the agent config with mode 0600.
pub fn save_config(path: impl AsRef<Path>, config: &AgentConfig) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let _guard = CONFIG_LOCK.write();

    let contents = serde_json::to_vec(config).map_err(ConfigError::Serialize)?;

    system::write_file_0600(path, &contents).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
