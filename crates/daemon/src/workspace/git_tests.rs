// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn git_url_targets_github_over_ssh() {
    assert_eq!(github_git_url("acme", "api"), "git@github.com:acme/api.git");
}

#[test]
fn collapse_lines_flattens_git_stderr() {
    let stderr = "ERROR: Repository not found.\n\nfatal: Could not read from remote repository.\n";
    assert_eq!(
        collapse_lines(stderr),
        "ERROR: Repository not found. fatal: Could not read from remote repository."
    );
}

#[test]
fn collapse_lines_trims_indentation() {
    assert_eq!(collapse_lines("  a\n   b  \n"), "a b");
}

#[test]
fn collapse_lines_of_empty_output_is_empty() {
    assert_eq!(collapse_lines(""), "");
}
