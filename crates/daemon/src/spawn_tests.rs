// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeSet;
use std::os::unix::fs::PermissionsExt;

use tokio::process::Command;

use super::*;

#[test]
fn materialized_script_is_executable_and_cleaned_up() {
    let script = EmbeddedScript::materialize("agent_test_script_", "#!/bin/sh\nexit 0\n").unwrap();
    let path = script.path().to_path_buf();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o700);
    assert!(path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("agent_test_script_")));

    drop(script);
    assert!(!path.exists());
}

#[tokio::test]
async fn streams_both_pipes_and_waits_for_exit() {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg("echo out-line; echo err-line 1>&2; exit 3");

    let mut streamed = spawn_streaming(command).unwrap();

    let mut lines = BTreeSet::new();
    while let Some(line) = streamed.next_line().await {
        lines.insert(line);
    }
    // Interleaving between the pipes is unordered; only membership holds.
    assert_eq!(lines, BTreeSet::from(["out-line".to_string(), "err-line".to_string()]));

    let status = streamed.wait().await.unwrap();
    assert_eq!(status.code(), Some(3));
}

#[tokio::test]
async fn per_pipe_line_order_is_preserved() {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg("echo one; echo two; echo three");

    let mut streamed = spawn_streaming(command).unwrap();
    let mut lines = Vec::new();
    while let Some(line) = streamed.next_line().await {
        lines.push(line);
    }

    assert_eq!(lines, vec!["one", "two", "three"]);
    assert!(streamed.wait().await.unwrap().success());
}

#[tokio::test]
async fn embedded_script_runs_from_its_temp_path() {
    let script =
        EmbeddedScript::materialize("agent_test_exec_", "#!/bin/sh\necho ran-from-script\n")
            .unwrap();

    let mut command = Command::new(script.path());
    command.current_dir(script.dir());

    let mut streamed = spawn_streaming(command).unwrap();
    assert_eq!(streamed.next_line().await.as_deref(), Some("ran-from-script"));
    assert!(streamed.wait().await.unwrap().success());
}
