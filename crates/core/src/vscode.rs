// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Editor workspace descriptor (`.code-workspace`) and the runtime ->
//! extension table.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::system;

/// Extensions installed for each supported runtime.
///
/// Declaration order is the derivation order of
/// `workspace.vscode.extensions`.
pub const RUNTIME_EXTENSIONS: &[(&str, &[&str])] = &[
    ("go", &["golang.go"]),
    ("ruby", &["rebornix.Ruby"]),
    ("rust", &["rust-lang.rust-analyzer"]),
    ("python", &["ms-python.python"]),
    ("java", &["vscjava.vscode-java-pack"]),
    ("clang", &["ms-vscode.cpptools-extension-pack"]),
    ("docker", &["ms-azuretools.vscode-docker"]),
];

/// Derive the editor extensions for a set of installed runtimes.
pub fn extensions_for_runtimes(runtimes: &BTreeMap<String, String>) -> Vec<String> {
    let mut extensions = Vec::new();
    for (runtime, runtime_extensions) in RUNTIME_EXTENSIONS {
        if runtimes.contains_key(*runtime) {
            extensions.extend(runtime_extensions.iter().map(|e| e.to_string()));
        }
    }
    extensions
}

/// One folder entry in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsCodeWorkspaceFolder {
    pub path: PathBuf,
}

/// The `.code-workspace` document handed to the remote editor.
///
/// Schema: <https://code.visualstudio.com/docs/editor/multi-root-workspaces#_workspace-file-schema>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsCodeWorkspaceConfig {
    pub folders: Vec<VsCodeWorkspaceFolder>,
    pub settings: serde_json::Map<String, serde_json::Value>,
}

impl Default for VsCodeWorkspaceConfig {
    fn default() -> Self {
        let settings = json!({
            "remote.autoForwardPorts": true,
            "remote.restoreForwardedPorts": true,
            // Detect opened ports from /proc rather than by parsing
            // terminal output.
            "remote.autoForwardPortsSource": "process",
            // RVM warns when the editor reorders $PATH in the integrated
            // terminal, so pass the login-shell value through untouched.
            "terminal.integrated.env.linux": { "PATH": "${env:PATH}" },
            // The remote server must listen on a TCP port: socket
            // listeners are not reachable through the agent.
            "remote.SSH.remoteServerListenOnSocket": false,
            "remote.downloadExtensionsLocally": false,
        });

        let settings = match settings {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        Self { folders: Vec::new(), settings }
    }
}

impl VsCodeWorkspaceConfig {
    /// Serialize and write the descriptor with mode 0600.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let contents = serde_json::to_vec(self).map_err(io::Error::other)?;
        system::write_file_0600(path, &contents)
    }
}

#[cfg(test)]
#[path = "vscode_tests.rs"]
mod tests;
