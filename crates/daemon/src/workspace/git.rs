// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository cloning with retries.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use super::WorkspaceError;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_INTERVAL: Duration = Duration::from_secs(4);

pub(crate) fn github_git_url(owner: &str, name: &str) -> String {
    format!("git@github.com:{owner}/{name}.git")
}

/// Clone `owner/name` into `clone_dir`.
///
/// A freshly provisioned deploy key is not always usable immediately on
/// the VCS side, so failures are retried a few times at a fixed interval.
/// The last failure is the one reported.
pub(crate) async fn clone_github_repo(
    owner: &str,
    name: &str,
    clone_dir: &Path,
) -> Result<(), WorkspaceError> {
    let url = github_git_url(owner, name);
    let mut last_error = WorkspaceError::Clone {
        repo: format!("{owner}/{name}"),
        details: String::new(),
    };

    for attempt in 1..=MAX_ATTEMPTS {
        let output = Command::new("git")
            .args(["clone", "--quiet", &url])
            .arg(clone_dir)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                last_error = WorkspaceError::Clone {
                    repo: format!("{owner}/{name}"),
                    details: format!("{}\n\n{}", collapse_lines(&stderr), output.status),
                };
            }
            Err(e) => {
                last_error = WorkspaceError::Clone {
                    repo: format!("{owner}/{name}"),
                    details: e.to_string(),
                };
            }
        }

        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    Err(last_error)
}

/// Flatten multi-line git stderr into one line for the error message.
fn collapse_lines(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
