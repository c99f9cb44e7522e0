// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace section of the agent configuration document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::vscode;

/// A repository cloned into the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub root_dir_path: PathBuf,
}

/// Editor-facing subsection: extensions derived from the runtimes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsCode {
    pub extensions: Vec<String>,
}

/// Workspace layout persisted in the agent config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Cloned repositories, in clone order.
    pub repositories: Vec<Repository>,
    /// Installed language runtimes (`name -> version`). Never null: an
    /// empty mapping when unset.
    pub runtimes: BTreeMap<String, String>,
    pub vscode: VsCode,
    /// The directory an editor should open: the workspace root
    /// (multi-repo), the single repository's root (one-repo), or the
    /// placeholder directory (zero-repo).
    pub root_dir_path: PathBuf,
}

impl WorkspaceConfig {
    /// Replace the runtimes mapping and rederive the editor extensions.
    ///
    /// Extensions are never stored independently: they are always a pure
    /// function of the runtimes, in the extension table's order.
    pub fn set_runtimes(&mut self, runtimes: BTreeMap<String, String>) {
        self.vscode.extensions = vscode::extensions_for_runtimes(&runtimes);
        self.runtimes = runtimes;
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
