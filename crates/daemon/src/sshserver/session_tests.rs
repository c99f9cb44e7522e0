// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn extensions() -> Vec<String> {
    vec!["golang.go".to_string(), "rust-lang.rust-analyzer".to_string()]
}

#[test]
fn lines_before_code_server_pass_through() {
    let mut rewriter = StdinRewriter::new(extensions());

    let line = "echo --start-server\n";
    assert_eq!(rewriter.rewrite_line(line), line);
}

#[test]
fn start_server_is_rewritten_after_code_server_was_seen() {
    let mut rewriter = StdinRewriter::new(extensions());

    let first = rewriter.rewrite_line("exec ~/.vscode-server/bin/abc/code-server \\\n");
    assert_eq!(first, "exec ~/.vscode-server/bin/abc/code-server \\\n");

    let second = rewriter.rewrite_line("--start-server --port 0\n");
    assert_eq!(
        second,
        "--start-server --install-extension golang.go \
--install-extension rust-lang.rust-analyzer --port 0\n"
    );
}

#[test]
fn rewrite_applies_to_every_following_start_server_line() {
    let mut rewriter = StdinRewriter::new(vec!["golang.go".to_string()]);

    rewriter.rewrite_line("code-server\n");
    let first = rewriter.rewrite_line("--start-server\n");
    let second = rewriter.rewrite_line("--start-server\n");

    assert_eq!(first, "--start-server --install-extension golang.go\n");
    assert_eq!(second, first);
}

#[test]
fn same_line_code_server_invocation_is_rewritten() {
    let mut rewriter = StdinRewriter::new(vec!["golang.go".to_string()]);

    let line = "code-server --start-server --port 0\n";
    assert_eq!(
        rewriter.rewrite_line(line),
        "code-server --start-server --install-extension golang.go --port 0\n"
    );
}

#[test]
fn no_declared_extensions_disables_the_rewrite() {
    let mut rewriter = StdinRewriter::new(Vec::new());

    rewriter.rewrite_line("code-server\n");
    let line = "--start-server\n";
    assert_eq!(rewriter.rewrite_line(line), line);
}

#[test]
fn unrelated_lines_are_untouched() {
    let mut rewriter = StdinRewriter::new(extensions());

    rewriter.rewrite_line("code-server\n");
    let line = "ls -la\n";
    assert_eq!(rewriter.rewrite_line(line), line);
}

#[test]
fn session_command_runs_as_the_user_via_sudo() {
    let command = session_command("eleven", &["/usr/bin/zsh", "-l", "-c", "ls"]);
    let command = command.as_std();

    assert_eq!(command.get_program(), "sudo");
    let args: Vec<_> = command.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
    assert_eq!(
        args,
        vec!["--set-home", "--login", "--user", "eleven", "/usr/bin/zsh", "-l", "-c", "ls"]
    );
}
